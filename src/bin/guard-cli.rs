use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "db-guard-cli")]
#[command(about = "Operator CLI for the database guard", long_about = None)]
struct Cli {
    #[arg(short, long, env = "DB_GUARD_URL", default_value = "http://localhost:8080")]
    url: String,

    /// Admin API key, sent as a bearer token.
    #[arg(short, long, env = "DB_GUARD_API_KEY", default_value = "")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Liveness probe
    Live,
    /// Readiness probe (runs checks)
    Ready,
    /// Full diagnostic status (runs checks)
    Status,
    /// List circuit breakers
    Breakers,
    /// Force a circuit breaker closed
    Reset {
        /// Resource name, e.g. primary_database
        resource: String,
    },
    /// Connection pool snapshot
    Pool,
    /// Latest background health result
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if !cli.key.is_empty() {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
        );
    }

    let (method, path) = match &cli.command {
        Commands::Live => (Method::GET, "/health/live".to_string()),
        Commands::Ready => (Method::GET, "/health/ready".to_string()),
        Commands::Status => (Method::GET, "/health/status".to_string()),
        Commands::Breakers => (Method::GET, "/admin/breakers".to_string()),
        Commands::Reset { resource } => (Method::POST, format!("/admin/breakers/{}/reset", resource)),
        Commands::Pool => (Method::GET, "/admin/pool".to_string()),
        Commands::Health => (Method::GET, "/admin/health".to_string()),
    };

    let res = client
        .request(method, format!("{}{}", cli.url.trim_end_matches('/'), path))
        .headers(headers)
        .send()
        .await?;

    let ok = print_response(res).await?;
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

/// Print the body; health endpoints answer 503 with a useful document.
async fn print_response(res: reqwest::Response) -> Result<bool, Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) if !text.is_empty() => println!("{}", text),
        Err(_) => {}
    }

    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
    }
    Ok(status.is_success())
}
