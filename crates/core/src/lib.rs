//! Core services for the missing-hours dashboard backend:
//! database configuration and pool lifecycle, the database error
//! taxonomy, the retrying query executor, the timed-operation wrapper,
//! and the ranked missing-hours report queries.

pub mod config;
pub mod db;
pub mod error;
pub mod reports;
pub mod retry;
pub mod timeout;
