//! Typed failures surfaced by the query executor.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Requested profile name is not registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown timeout profile '{0}'")]
pub struct UnknownProfile(pub String);

/// Distinguishable failure kinds, as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The unit of work did not complete within the profile timeout.
    Timeout,
    /// Rejected without touching the database.
    CircuitOpen,
    /// The database was reached but the connection or transport failed.
    ConnectionFailure,
    /// The database answered, the statement itself failed.
    QueryFailure,
}

impl ErrorKind {
    /// Infra failures feed the circuit breaker; query failures do not.
    pub fn is_infra(self) -> bool {
        matches!(self, ErrorKind::Timeout | ErrorKind::ConnectionFailure)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::CircuitOpen => "circuit_open",
            ErrorKind::ConnectionFailure => "connection_failure",
            ErrorKind::QueryFailure => "query_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a unit-of-work error should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Connection,
    Query,
}

/// Implemented by error types a unit of work may return.
pub trait Classify {
    fn failure_class(&self) -> FailureClass;
}

/// Summary of one `execute` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionOutcome {
    pub succeeded: bool,
    /// Attempts that actually reached the unit of work.
    pub attempts: u32,
    pub elapsed_ms: u64,
    pub error_kind: Option<ErrorKind>,
}

impl ExecutionOutcome {
    pub(crate) fn success(attempts: u32, elapsed: Duration) -> Self {
        Self {
            succeeded: true,
            attempts,
            elapsed_ms: elapsed.as_millis() as u64,
            error_kind: None,
        }
    }

    pub(crate) fn failure(kind: ErrorKind, attempts: u32, elapsed: Duration) -> Self {
        Self {
            succeeded: false,
            attempts,
            elapsed_ms: elapsed.as_millis() as u64,
            error_kind: Some(kind),
        }
    }
}

/// Error returned by [`QueryExecutor::execute`](crate::resilience::QueryExecutor::execute).
#[derive(Debug, Error)]
pub enum ExecuteError<E> {
    #[error(transparent)]
    UnknownProfile(#[from] UnknownProfile),

    #[error("circuit open for '{resource}', call rejected")]
    CircuitOpen {
        resource: String,
        attempts: u32,
        elapsed: Duration,
    },

    #[error("query exceeded {timeout:?} on each of {attempts} attempt(s)")]
    Timeout {
        timeout: Duration,
        attempts: u32,
        elapsed: Duration,
    },

    #[error("connection failure after {attempts} attempt(s): {source}")]
    ConnectionFailure {
        #[source]
        source: E,
        attempts: u32,
        elapsed: Duration,
    },

    #[error("query failed: {source}")]
    QueryFailure {
        #[source]
        source: E,
        attempts: u32,
        elapsed: Duration,
    },
}

impl<E> ExecuteError<E> {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ExecuteError::UnknownProfile(_) => None,
            ExecuteError::CircuitOpen { .. } => Some(ErrorKind::CircuitOpen),
            ExecuteError::Timeout { .. } => Some(ErrorKind::Timeout),
            ExecuteError::ConnectionFailure { .. } => Some(ErrorKind::ConnectionFailure),
            ExecuteError::QueryFailure { .. } => Some(ErrorKind::QueryFailure),
        }
    }

    /// Outcome of the failed call, `None` if no profile could be resolved.
    pub fn outcome(&self) -> Option<ExecutionOutcome> {
        let (attempts, elapsed) = match self {
            ExecuteError::UnknownProfile(_) => return None,
            ExecuteError::CircuitOpen { attempts, elapsed, .. }
            | ExecuteError::Timeout { attempts, elapsed, .. }
            | ExecuteError::ConnectionFailure { attempts, elapsed, .. }
            | ExecuteError::QueryFailure { attempts, elapsed, .. } => (*attempts, *elapsed),
        };
        let kind = self.kind()?;
        Some(ExecutionOutcome::failure(kind, attempts, elapsed))
    }

    /// True for failures worth retrying later (busy or unreachable).
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            Some(ErrorKind::CircuitOpen | ErrorKind::Timeout | ErrorKind::ConnectionFailure)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn test_infra_classification() {
        assert!(ErrorKind::Timeout.is_infra());
        assert!(ErrorKind::ConnectionFailure.is_infra());
        assert!(!ErrorKind::QueryFailure.is_infra());
        assert!(!ErrorKind::CircuitOpen.is_infra());
    }

    #[test]
    fn test_outcome_from_error() {
        let err: ExecuteError<Boom> = ExecuteError::ConnectionFailure {
            source: Boom,
            attempts: 2,
            elapsed: Duration::from_millis(1_250),
        };
        let outcome = err.outcome().unwrap();
        assert!(!outcome.succeeded);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.elapsed_ms, 1_250);
        assert_eq!(outcome.error_kind, Some(ErrorKind::ConnectionFailure));
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "connection failure after 2 attempt(s): boom");
    }

    #[test]
    fn test_unknown_profile_has_no_outcome() {
        let err: ExecuteError<Boom> = UnknownProfile("nope".into()).into();
        assert!(err.kind().is_none());
        assert!(err.outcome().is_none());
        assert!(!err.is_transient());
    }
}
