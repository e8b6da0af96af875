//! Durable run history for reward searches: append-only run and search
//! logs, a derived stats log and a plain-text error log.

pub mod error;
pub mod error_log;
pub mod factory;
pub mod migrate;
pub mod stats;
pub mod store;
pub mod types;

pub use error::StorageError;
