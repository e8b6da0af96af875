use std::path::PathBuf;

use rewards_history::StorageError;
use thiserror::Error;

use crate::session::RunReport;

/// Missing or invalid configuration. Fatal before any account is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {0} does not exist; create it or pass --config")]
    Missing(PathBuf),

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no accounts configured")]
    NoAccounts,

    #[error("category {category} references variant {variant} with no quota")]
    UnknownVariant { category: String, variant: String },

    #[error("category {0} has no variants")]
    EmptyCategory(String),

    #[error("unknown search category: {0}")]
    UnknownCategory(String),

    #[error("invalid delay range {min}..={max} seconds")]
    InvalidDelay { min: u64, max: u64 },

    #[error("retry policy needs at least one attempt")]
    InvalidRetry,
}

/// Failure reported by the search-execution collaborator for one unit,
/// with whatever raw output it produced before failing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// Transient; the unit may be retried.
    #[error("recoverable search failure: {reason}")]
    Recoverable { reason: String, log: Vec<String> },
    #[error("unrecoverable search failure: {reason}")]
    Fatal { reason: String, log: Vec<String> },
}

impl SearchError {
    pub fn recoverable(reason: impl Into<String>) -> Self {
        SearchError::Recoverable {
            reason: reason.into(),
            log: Vec::new(),
        }
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        SearchError::Fatal {
            reason: reason.into(),
            log: Vec::new(),
        }
    }

    /// Attach raw execution output.
    pub fn with_log(mut self, lines: Vec<String>) -> Self {
        match &mut self {
            SearchError::Recoverable { log, .. } | SearchError::Fatal { log, .. } => *log = lines,
        }
        self
    }

    pub fn reason(&self) -> &str {
        match self {
            SearchError::Recoverable { reason, .. } | SearchError::Fatal { reason, .. } => reason,
        }
    }

    pub fn log(&self) -> &[String] {
        match self {
            SearchError::Recoverable { log, .. } | SearchError::Fatal { log, .. } => log,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, SearchError::Fatal { .. })
    }
}

/// Why a single account's run did not finish normally.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("{category} aborted: {reason}")]
    Aborted {
        category: String,
        reason: String,
        report: Box<RunReport>,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
