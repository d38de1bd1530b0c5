//! Against a real PostgreSQL: `DATABASE_URL=postgres://... cargo test -- --ignored`

use std::time::Duration;

use db_guard::config::load_from_env;
use db_guard::health::HealthStatus;
use db_guard::resilience::profiles::{NORMAL, QUICK};
use db_guard::resilience::ErrorKind;
use db_guard::Services;

fn services() -> Services {
    let config = load_from_env().expect("valid configuration from environment");
    Services::build(config).unwrap()
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_query_through_executor() {
    let services = services();
    let pool = &*services.pool;

    let executed = services
        .executor
        .execute(QUICK, || async move {
            let mut conn = pool.acquire().await?;
            sqlx::query_scalar::<_, i32>("SELECT 41 + 1").fetch_one(&mut *conn).await
        })
        .await
        .unwrap();

    assert_eq!(executed.value, 42);
    assert_eq!(executed.outcome.attempts, 1);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_statement_error_is_query_failure() {
    let services = services();
    let pool = &*services.pool;

    let err = services
        .executor
        .execute(NORMAL, || async move {
            let mut conn = pool.acquire().await?;
            sqlx::query("SELECT * FROM no_such_table").execute(&mut *conn).await
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::QueryFailure));
    assert_eq!(services.executor.breaker().consecutive_failures(), 0);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_statement_timeout_is_timeout() {
    let services = services();
    let pool = &*services.pool;

    let err = services
        .executor
        .execute(QUICK, || async move {
            let mut conn = pool.acquire().await?;
            sqlx::query("SELECT pg_sleep(3)").execute(&mut *conn).await
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::Timeout));
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_readiness_when_database_up() {
    let services = services();

    let readiness = services.aggregator.readiness(Duration::from_secs(3)).await;

    assert!(readiness.ready);
    assert_eq!(readiness.detail.checks["database"].status, HealthStatus::Healthy);
}
