//! Circuit breaker behaviour observed through the query executor.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Barrier;

use db_guard::resilience::profiles::QUICK;
use db_guard::resilience::{CircuitState, ErrorKind, ExecuteError};

mod common;
use common::{executor, ScriptedWork, Step, TestError};

const OPEN_FOR: Duration = Duration::from_secs(30);

#[tokio::test(start_paused = true)]
async fn test_five_connection_failures_open_the_circuit() {
    let exec = executor(5, OPEN_FOR);
    let work = ScriptedWork::always(Step::Connection);

    for _ in 0..5 {
        let err = exec.execute(QUICK, || work.run()).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::ConnectionFailure));
    }
    assert_eq!(exec.breaker().state(), CircuitState::Open);

    let start = tokio::time::Instant::now();
    let err = exec.execute(QUICK, || work.run()).await.unwrap_err();

    assert!(matches!(err, ExecuteError::CircuitOpen { .. }));
    assert!(start.elapsed() < Duration::from_millis(1));
    assert_eq!(work.calls(), 5, "rejected call must not reach the database");
    let outcome = err.outcome().unwrap();
    assert_eq!(outcome.attempts, 0);
    assert!(!outcome.succeeded);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_until_open_duration_elapses() {
    let exec = executor(5, OPEN_FOR);
    let work = ScriptedWork::new(vec![Step::Connection; 5].into_iter().chain([Step::Ok]).collect());

    for _ in 0..5 {
        let _ = exec.execute(QUICK, || work.run()).await;
    }

    tokio::time::advance(OPEN_FOR - Duration::from_millis(1)).await;
    let err = exec.execute(QUICK, || work.run()).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::CircuitOpen));

    tokio::time::advance(Duration::from_millis(1)).await;
    let executed = exec.execute(QUICK, || work.run()).await.unwrap();
    assert_eq!(executed.outcome.attempts, 1);
    assert_eq!(exec.breaker().state(), CircuitState::Closed);
    assert_eq!(exec.breaker().consecutive_failures(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_probe_restarts_open_timer() {
    let exec = executor(5, OPEN_FOR);
    let work = ScriptedWork::always(Step::Connection);
    for _ in 0..5 {
        let _ = exec.execute(QUICK, || work.run()).await;
    }

    tokio::time::advance(OPEN_FOR).await;
    let err = exec.execute(QUICK, || work.run()).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::ConnectionFailure));
    assert_eq!(exec.breaker().state(), CircuitState::Open);

    tokio::time::advance(OPEN_FOR - Duration::from_secs(1)).await;
    let err = exec.execute(QUICK, || work.run()).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::CircuitOpen));
    assert_eq!(work.calls(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_query_failures_never_trip() {
    let exec = executor(2, OPEN_FOR);
    let work = ScriptedWork::always(Step::Query);

    for _ in 0..10 {
        let err = exec.execute(QUICK, || work.run()).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::QueryFailure));
    }
    assert_eq!(exec.breaker().state(), CircuitState::Closed);
    assert_eq!(exec.breaker().consecutive_failures(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_one_probe_under_concurrent_load() {
    const CALLERS: usize = 16;

    let exec = executor(1, Duration::from_millis(50));
    let tripping = ScriptedWork::always(Step::Connection);
    let _ = exec.execute(QUICK, || tripping.run()).await;
    assert_eq!(exec.breaker().state(), CircuitState::Open);

    tokio::time::sleep(Duration::from_millis(80)).await;

    let reached = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(CALLERS));
    let mut handles = Vec::with_capacity(CALLERS);
    for _ in 0..CALLERS {
        let exec = exec.clone();
        let reached = Arc::clone(&reached);
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            exec.execute(QUICK, || {
                let reached = Arc::clone(&reached);
                async move {
                    reached.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    Ok::<_, TestError>(())
                }
            })
            .await
        }));
    }

    let mut succeeded = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(ExecuteError::CircuitOpen { .. }) => rejected += 1,
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(rejected, CALLERS - 1);
    assert_eq!(reached.load(Ordering::SeqCst), 1);
    assert_eq!(exec.breaker().state(), CircuitState::Closed);
}
