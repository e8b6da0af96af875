use std::collections::HashSet;
use std::path::Path;

use crate::error::Result;
use crate::error::StorageError;

/// Rewrite a JSONL log, dropping blank, unparseable and exact duplicate
/// lines. Returns `(read, written)` line counts.
pub fn compact_jsonl(input: &Path, output: &Path) -> Result<(usize, usize)> {
    let data = match std::fs::read(input) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(StorageError::io(input, e)),
    };
    let mut seen = HashSet::new();
    let mut out = String::new();
    let mut read = 0usize;
    let mut written = 0usize;
    for line in data.split(|b| *b == b'\n') {
        let line = line.trim_ascii();
        if line.is_empty() {
            continue;
        }
        read += 1;
        let Ok(v) = serde_json::from_slice::<serde_json::Value>(line) else {
            tracing::warn!(line = read, "compact: dropping unparseable record");
            continue;
        };
        let normalized = serde_json::to_string(&v)?;
        if seen.insert(normalized.clone()) {
            out.push_str(&normalized);
            out.push('\n');
            written += 1;
        }
    }
    if let Some(dir) = output.parent() {
        std::fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
    }
    std::fs::write(output, out).map_err(|e| StorageError::io(output, e))?;
    Ok((read, written))
}

/// Copy the JSONL run and search logs found in `log_dir` into a SQLite
/// database file. Returns the count of newly imported records; records the
/// database already holds are skipped, so rerunning a migration adds nothing.
#[cfg(feature = "sqlite")]
pub fn migrate_jsonl_to_sqlite(log_dir: &Path, sqlite_path: &Path) -> Result<usize> {
    use crate::store::HistoryStore;
    use crate::store::jsonl::JsonlHistoryStore;
    use crate::store::sqlite::SqliteHistoryStore;

    let history = JsonlHistoryStore::new(log_dir).load_all()?;
    SqliteHistoryStore::new(sqlite_path).import(&history)
}

#[cfg(not(feature = "sqlite"))]
pub fn migrate_jsonl_to_sqlite(_log_dir: &Path, _sqlite_path: &Path) -> Result<usize> {
    Err(StorageError::InvalidValue(
        "sqlite backend not compiled; enable with `--features rewards-history/sqlite`".to_string(),
    ))
}
