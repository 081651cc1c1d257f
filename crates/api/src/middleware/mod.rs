//! API middleware modules

pub mod db_error;

pub use db_error::*;
