use crate::error::Result;
use crate::types::History;
use crate::types::RunEntry;
use crate::types::SearchEvent;

/// Durable, append-only record of runs and search attempts, partitioned by
/// account identifier.
pub trait HistoryStore: Send + Sync {
    /// History for one account. Missing backing files yield an empty history.
    fn load(&self, account: &str) -> Result<History>;
    fn append_run(&self, entry: &RunEntry) -> Result<()>;
    fn append_search(&self, event: &SearchEvent) -> Result<()>;
    fn latest_run_summary(&self, account: &str) -> Result<Option<RunEntry>>;
    /// History for every account.
    fn load_all(&self) -> Result<History>;
    /// Append the records of `history` not already stored, returning how many
    /// were written. Importing the same history twice writes nothing new.
    fn import(&self, history: &History) -> Result<usize>;
}

pub mod jsonl;
#[cfg(feature = "sqlite")]
pub mod sqlite;
