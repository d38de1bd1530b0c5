//! Timeout enforcement.
//!
//! # Responsibilities
//! - Race a future against a deadline
//! - Report how long the caller actually waited
//!
//! # Design Decisions
//! - Uses Tokio's timer; no polling
//! - Cancellation is advisory: the losing future is dropped, which ends our
//!   wait, but a statement already sent to the server may still run there.
//!   Reclaiming that connection is the pool's job.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Result of a deadline race.
#[derive(Debug)]
pub enum Deadline<T> {
    Completed { output: T, elapsed: Duration },
    TimedOut { elapsed: Duration },
}

impl<T> Deadline<T> {
    pub fn elapsed(&self) -> Duration {
        match self {
            Deadline::Completed { elapsed, .. } | Deadline::TimedOut { elapsed } => *elapsed,
        }
    }
}

/// Await `fut` for at most `limit`.
pub async fn with_deadline<F>(limit: Duration, fut: F) -> Deadline<F::Output>
where
    F: Future,
{
    let start = Instant::now();
    match tokio::time::timeout(limit, fut).await {
        Ok(output) => Deadline::Completed {
            output,
            elapsed: start.elapsed(),
        },
        Err(_) => Deadline::TimedOut {
            elapsed: start.elapsed(),
        },
    }
}
