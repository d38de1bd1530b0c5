//! Mapping sqlx errors onto connection vs. query failures.
//!
//! Connection: anything where the database could not be reached or the
//! transport broke, including server-side SQLSTATEs that mean the session
//! is gone. Query: the server answered and rejected the statement.

use sqlx::error::DatabaseError;

use crate::resilience::error::{Classify, FailureClass};

/// SQLSTATE codes that describe a lost or refused session.
fn is_connection_sqlstate(code: &str) -> bool {
    // class 08: connection exception
    code.starts_with("08")
        // admin_shutdown, crash_shutdown, cannot_connect_now
        || matches!(code, "57P01" | "57P02" | "57P03")
        // too_many_connections
        || code == "53300"
}

fn classify_database(err: &dyn DatabaseError) -> FailureClass {
    match err.code() {
        Some(code) if is_connection_sqlstate(&code) => FailureClass::Connection,
        _ => FailureClass::Query,
    }
}

impl Classify for sqlx::Error {
    fn failure_class(&self) -> FailureClass {
        match self {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => FailureClass::Connection,
            sqlx::Error::Database(db) => classify_database(db.as_ref()),
            _ => FailureClass::Query,
        }
    }
}
