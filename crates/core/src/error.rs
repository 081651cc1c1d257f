//! Database error taxonomy.
//!
//! All failures crossing the pool boundary are converted into the closed
//! [`DbError`] enum here, so the layers above match on variants instead of
//! driver error strings.

use std::time::Duration;

/// Error type for database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The caller's deadline elapsed before the operation settled. The
    /// underlying operation may still be running detached.
    #[error("operation timed out after {0:?}")]
    DeadlineExceeded(Duration),
    /// An established connection dropped mid-operation.
    #[error("database connection lost")]
    ConnectionLost,
    /// The database server could not be reached.
    #[error("cannot connect to the database")]
    ConnectionRefused,
    /// The server or pool is out of connections.
    #[error("too many database connections")]
    TooManyConnections,
    /// The server cancelled the statement (statement_timeout or socket timeout).
    #[error("database query timed out")]
    QueryTimeout,
    /// Credential failure; retrying will not help.
    #[error("database authentication failed")]
    AuthFailed,
    /// Anything we do not recognize.
    #[error("unexpected database error: {0}")]
    Unknown(String),
}

impl DbError {
    /// Classify a driver error at the pool boundary.
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(io) => match io.kind() {
                std::io::ErrorKind::ConnectionRefused => DbError::ConnectionRefused,
                std::io::ErrorKind::TimedOut => DbError::QueryTimeout,
                _ => DbError::ConnectionLost,
            },
            sqlx::Error::PoolTimedOut => DbError::TooManyConnections,
            sqlx::Error::PoolClosed => DbError::ConnectionLost,
            sqlx::Error::Database(db) => match db.code().as_deref() {
                // 53300 too_many_connections
                Some("53300") => DbError::TooManyConnections,
                // 57014 query_canceled (statement_timeout)
                Some("57014") => DbError::QueryTimeout,
                // 28xxx invalid_authorization_specification / invalid_password
                Some(code) if code.starts_with("28") => DbError::AuthFailed,
                // 08001 sqlclient_unable_to_establish_sqlconnection
                Some("08001") | Some("08004") => DbError::ConnectionRefused,
                // 08003 connection_does_not_exist, 08006 connection_failure
                Some(code) if code.starts_with("08") => DbError::ConnectionLost,
                _ => DbError::Unknown(db.message().to_string()),
            },
            other => DbError::Unknown(other.to_string()),
        }
    }

    /// Whether this failure is expected to clear on its own.
    ///
    /// Note the executor retries every failure uniformly regardless; this
    /// classification feeds the response mapping, not the retry loop.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DbError::ConnectionLost
                | DbError::ConnectionRefused
                | DbError::TooManyConnections
                | DbError::QueryTimeout
        )
    }

    /// Stable machine-readable code for response payloads.
    pub fn error_code(&self) -> &'static str {
        match self {
            DbError::ConnectionLost => "DB_CONNECTION_LOST",
            DbError::TooManyConnections => "DB_TOO_MANY_CONNECTIONS",
            DbError::ConnectionRefused => "DB_CONNECTION_REFUSED",
            DbError::QueryTimeout | DbError::DeadlineExceeded(_) => "DB_TIMEOUT",
            DbError::AuthFailed => "DB_AUTH_ERROR",
            DbError::Unknown(_) => "DB_GENERIC_ERROR",
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        DbError::from_sqlx(err)
    }
}
