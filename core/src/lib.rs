//! Completion tracking and per-account orchestration for daily reward
//! searches.
//!
//! Search execution and notification delivery are collaborators behind the
//! [`executor::SearchExecutor`] and [`notify::Notifier`] traits; everything
//! durable goes through `rewards_history`.

pub mod clock;
pub mod completion;
pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod notify;
pub mod pacing;
pub mod quota;
pub mod session;

pub use completion::CompletionState;
pub use completion::CompletionTracker;
pub use config::Account;
pub use config::Config;
pub use error::ConfigError;
pub use error::RunError;
pub use error::SearchError;
