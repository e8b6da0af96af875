use std::path::Path;
use std::path::PathBuf;

use crate::error::Result;
use crate::error::StorageError;
use crate::store::HistoryStore;
use crate::store::jsonl::JsonlHistoryStore;

#[cfg(feature = "sqlite")]
use crate::store::sqlite::SqliteHistoryStore;

pub const SQLITE_FILE: &str = "history.db";

/// Backend selection for history persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Jsonl,
    #[cfg(feature = "sqlite")]
    Sqlite,
}

/// Choose backend using env `REWARDS_HISTORY_BACKEND` if present: `sqlite` or `jsonl`.
/// Defaults to JSONL; if `sqlite` is requested but not compiled in, falls back to JSONL.
pub fn choose_backend_from_env() -> Backend {
    let v = std::env::var("REWARDS_HISTORY_BACKEND").unwrap_or_default();
    match v.as_str() {
        #[cfg(feature = "sqlite")]
        "sqlite" | "SQLITE" => Backend::Sqlite,
        _ => Backend::Jsonl,
    }
}

/// Build a history store inside `log_dir`.
/// The SQLite path can be overridden via env `REWARDS_HISTORY_DB`.
pub fn open_store(log_dir: &Path, backend: Option<Backend>) -> Result<Box<dyn HistoryStore>> {
    std::fs::create_dir_all(log_dir).map_err(|e| StorageError::io(log_dir, e))?;
    let be = backend.unwrap_or_else(choose_backend_from_env);
    Ok(match be {
        Backend::Jsonl => Box::new(JsonlHistoryStore::new(log_dir)),
        #[cfg(feature = "sqlite")]
        Backend::Sqlite => {
            let path = std::env::var("REWARDS_HISTORY_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|_| log_dir.join(SQLITE_FILE));
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
            }
            Box::new(SqliteHistoryStore::new(path))
        }
    })
}

/// Files written under `log_dir` by the default layout.
#[derive(Debug, Clone)]
pub struct LogLayout {
    pub dir: PathBuf,
    pub stats: PathBuf,
    pub errors: PathBuf,
}

impl LogLayout {
    pub fn new<P: AsRef<Path>>(log_dir: P) -> Self {
        let dir = log_dir.as_ref().to_path_buf();
        Self {
            stats: dir.join(crate::stats::STATS_LOG),
            errors: dir.join(crate::error_log::ERROR_LOG),
            dir,
        }
    }
}
