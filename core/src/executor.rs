use std::path::PathBuf;

use crate::config::Account;
use crate::error::SearchError;

/// Already-validated execution flags forwarded to the collaborator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionOptions {
    pub headless: bool,
    pub no_sandbox: bool,
    pub use_cookies: bool,
    pub driver: Option<PathBuf>,
    pub trends_geo: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    pub success: bool,
    /// Reward point total after the search, when the collaborator knows it.
    pub points: Option<u64>,
    /// Raw execution log lines, kept for the error log.
    pub log: Vec<String>,
}

impl SearchOutcome {
    pub fn succeeded(points: Option<u64>) -> Self {
        Self {
            success: true,
            points,
            log: Vec::new(),
        }
    }
}

/// Performs one search unit for an account. How the search is physically
/// carried out is up to the implementation.
pub trait SearchExecutor {
    /// Current point total, used as the run's starting balance.
    fn balance(
        &mut self,
        _account: &Account,
        _options: &ExecutionOptions,
    ) -> Result<Option<u64>, SearchError> {
        Ok(None)
    }

    fn search(
        &mut self,
        account: &Account,
        category: &str,
        variant: &str,
        options: &ExecutionOptions,
    ) -> Result<SearchOutcome, SearchError>;
}
