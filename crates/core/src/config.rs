//! Environment-driven database configuration.
//!
//! Connection parameters come either from a single `DATABASE_URL` or from
//! the discrete `DB_HOST`/`DB_PORT`/`DB_USER`/`DB_PASSWORD`/`DB_NAME`
//! variables. Pool sizing and TLS are keyed off `APP_ENV`.

use std::time::Duration;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {name}: {value}")]
    InvalidVar { name: &'static str, value: String },
}

/// Connection pool configuration for the shared database pool.
///
/// The pool is bounded: once `max_connections` are checked out, further
/// acquires wait up to `acquire_timeout` and then fail instead of queueing
/// indefinitely.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Postgres connection URL.
    pub url: String,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
    /// How long an acquire may wait for a free connection.
    pub acquire_timeout: Duration,
    /// Server-side statement timeout applied to every query.
    pub statement_timeout: Duration,
    /// Idle connections are reaped after this long.
    pub idle_timeout: Duration,
    /// Require TLS on the database connection (production).
    pub require_tls: bool,
}

impl DbConfig {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let production = std::env::var("APP_ENV")
            .map(|v| v == "production")
            .unwrap_or(false);

        let url = match std::env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => url_from_parts()?,
        };

        let default_max = if production { 8 } else { 5 };
        let max_connections = match std::env::var("DB_MAX_CONNECTIONS") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar {
                name: "DB_MAX_CONNECTIONS",
                value: raw,
            })?,
            Err(_) => default_max,
        };

        Ok(Self {
            url,
            max_connections,
            acquire_timeout: Duration::from_secs(20),
            statement_timeout: Duration::from_secs(15),
            idle_timeout: Duration::from_secs(300),
            require_tls: production,
        })
    }
}

fn url_from_parts() -> Result<String, ConfigError> {
    let host = std::env::var("DB_HOST").map_err(|_| ConfigError::MissingVar("DB_HOST"))?;
    let port = std::env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
    let user = std::env::var("DB_USER").map_err(|_| ConfigError::MissingVar("DB_USER"))?;
    let password =
        std::env::var("DB_PASSWORD").map_err(|_| ConfigError::MissingVar("DB_PASSWORD"))?;
    let name = std::env::var("DB_NAME").map_err(|_| ConfigError::MissingVar("DB_NAME"))?;

    Ok(format!(
        "postgres://{}:{}@{}:{}/{}",
        user, password, host, port, name
    ))
}
