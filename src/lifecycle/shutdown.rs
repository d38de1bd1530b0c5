//! Shutdown coordination.

use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that the server and every background
/// monitor subscribe to.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of tasks still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Wait for `tasks` to finish, abandoning them after `deadline`.
    ///
    /// Returns false when the deadline was hit.
    pub async fn drain(tasks: Vec<JoinHandle<()>>, deadline: Duration) -> bool {
        match tokio::time::timeout(deadline, join_all(tasks)).await {
            Ok(results) => {
                for result in results {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "Background task ended abnormally");
                    }
                }
                true
            }
            Err(_) => {
                tracing::warn!(deadline = ?deadline, "Background tasks did not stop in time");
                false
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_reaches_every_subscriber() {
        let shutdown = Shutdown::new();
        let tasks: Vec<_> = (0..3)
            .map(|_| {
                let mut rx = shutdown.subscribe();
                tokio::spawn(async move {
                    let _ = rx.recv().await;
                })
            })
            .collect();
        assert_eq!(shutdown.receiver_count(), 3);

        shutdown.trigger();
        assert!(Shutdown::drain(tasks, Duration::from_secs(1)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_gives_up_after_deadline() {
        let stuck = tokio::spawn(std::future::pending::<()>());
        assert!(!Shutdown::drain(vec![stuck], Duration::from_secs(5)).await);
    }
}
