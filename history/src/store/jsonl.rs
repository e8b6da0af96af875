use std::fs::OpenOptions;
use std::fs::create_dir_all;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::*;
use crate::error::StorageError;

pub const RUN_LOG: &str = "run.jsonl";
pub const SEARCH_LOG: &str = "search.jsonl";

/// JSONL-backed history. Runs and search events live in two files, each
/// line one record tagged with its account.
#[derive(Debug, Clone)]
pub struct JsonlHistoryStore {
    runs_path: PathBuf,
    searches_path: PathBuf,
}

impl JsonlHistoryStore {
    /// Store rooted at `log_dir`, using the default file names.
    pub fn new<P: AsRef<Path>>(log_dir: P) -> Self {
        let dir = log_dir.as_ref();
        Self::with_paths(dir.join(RUN_LOG), dir.join(SEARCH_LOG))
    }

    pub fn with_paths<P: AsRef<Path>, Q: AsRef<Path>>(runs: P, searches: Q) -> Self {
        Self {
            runs_path: runs.as_ref().to_path_buf(),
            searches_path: searches.as_ref().to_path_buf(),
        }
    }

    pub fn runs_path(&self) -> &Path {
        &self.runs_path
    }

    pub fn searches_path(&self) -> &Path {
        &self.searches_path
    }
}

impl HistoryStore for JsonlHistoryStore {
    fn load(&self, account: &str) -> Result<History> {
        let mut history = self.load_all()?;
        history.runs.retain(|r| r.account == account);
        history.searches.retain(|e| e.account == account);
        Ok(history)
    }

    fn append_run(&self, entry: &RunEntry) -> Result<()> {
        append_record(&self.runs_path, entry)
    }

    fn append_search(&self, event: &SearchEvent) -> Result<()> {
        append_record(&self.searches_path, event)
    }

    fn latest_run_summary(&self, account: &str) -> Result<Option<RunEntry>> {
        let runs: Vec<RunEntry> = read_records(&self.runs_path)?;
        Ok(runs.into_iter().rev().find(|r| r.account == account))
    }

    fn load_all(&self) -> Result<History> {
        Ok(History {
            runs: read_records(&self.runs_path)?,
            searches: read_records(&self.searches_path)?,
        })
    }

    fn import(&self, history: &History) -> Result<usize> {
        let existing = self.load_all()?;
        let mut written = 0;
        for run in history.runs.iter().filter(|r| !existing.runs.contains(r)) {
            self.append_run(run)?;
            written += 1;
        }
        for event in history
            .searches
            .iter()
            .filter(|e| !existing.searches.contains(e))
        {
            self.append_search(event)?;
            written += 1;
        }
        Ok(written)
    }
}

/// Append one record as a single newline-terminated line and flush it to
/// disk. A torn tail left by an earlier crash is cut off first so the new
/// record always starts on its own line.
pub(crate) fn append_record<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    if let Some(dir) = path.parent() {
        create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
    }
    let mut f = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
        .map_err(|e| StorageError::io(path, e))?;
    repair_torn_tail(&mut f).map_err(|e| StorageError::io(path, e))?;
    f.write_all(line.as_bytes())
        .and_then(|()| f.sync_data())
        .map_err(|e| StorageError::io(path, e))
}

fn repair_torn_tail(f: &mut std::fs::File) -> std::io::Result<()> {
    let len = f.metadata()?.len();
    if len == 0 {
        return Ok(());
    }
    let mut last = [0u8; 1];
    f.seek(SeekFrom::End(-1))?;
    f.read_exact(&mut last)?;
    if last[0] == b'\n' {
        return Ok(());
    }
    let mut data = Vec::with_capacity(len as usize);
    f.seek(SeekFrom::Start(0))?;
    f.read_to_end(&mut data)?;
    let keep = data
        .iter()
        .rposition(|b| *b == b'\n')
        .map(|pos| pos as u64 + 1)
        .unwrap_or(0);
    tracing::warn!(
        dropped_bytes = len - keep,
        "history: truncating torn record at end of log"
    );
    f.set_len(keep)
}

/// Read every record of a JSONL file. A missing file is empty history. Only
/// newline-terminated lines are records: an unterminated tail is a torn write
/// (whatever bytes it holds) and is skipped, matching what the next append
/// cuts off. A terminated line that fails to parse is corruption.
pub(crate) fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let data = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::io(path, e)),
    };
    let mut out = Vec::new();
    for (idx, raw) in data.split_inclusive(|b| *b == b'\n').enumerate() {
        let Some(body) = raw.strip_suffix(b"\n") else {
            tracing::warn!(path = %path.display(), "history: ignoring torn final record");
            continue;
        };
        if body.trim_ascii().is_empty() {
            continue;
        }
        match serde_json::from_slice::<T>(body) {
            Ok(record) => out.push(record),
            Err(source) => {
                return Err(StorageError::Corrupt {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    source,
                });
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RunOutcome;
    use chrono::TimeZone;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn event(account: &str, variant: &str) -> SearchEvent {
        SearchEvent {
            timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
            account: account.to_string(),
            category: "both".to_string(),
            variant: variant.to_string(),
            success: true,
            points: None,
        }
    }

    #[test]
    fn missing_files_load_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlHistoryStore::new(dir.path().join("logs"));
        assert!(store.load("a@example.com").unwrap().is_empty());
        assert!(store.latest_run_summary("a@example.com").unwrap().is_none());
    }

    #[test]
    fn torn_tail_is_skipped_on_load_and_cut_before_append() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlHistoryStore::new(dir.path());
        store.append_search(&event("a", "desktop")).unwrap();
        {
            let mut f = OpenOptions::new()
                .append(true)
                .open(store.searches_path())
                .unwrap();
            f.write_all(br#"{"timestamp":"2025-03-01T09:"#).unwrap();
        }
        assert_eq!(store.load("a").unwrap().searches.len(), 1);

        store.append_search(&event("a", "mobile")).unwrap();
        let variants: Vec<String> = store
            .load("a")
            .unwrap()
            .searches
            .into_iter()
            .map(|e| e.variant)
            .collect();
        assert_eq!(variants, vec!["desktop".to_string(), "mobile".to_string()]);
    }

    #[test]
    fn unterminated_tail_is_never_counted_even_when_it_parses() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlHistoryStore::new(dir.path());
        store.append_search(&event("a", "desktop")).unwrap();
        {
            let mut f = OpenOptions::new()
                .append(true)
                .open(store.searches_path())
                .unwrap();
            let line = serde_json::to_string(&event("a", "mobile")).unwrap();
            f.write_all(line.as_bytes()).unwrap();
        }
        assert_eq!(store.load("a").unwrap().searches.len(), 1);

        store.append_search(&event("a", "edge")).unwrap();
        let variants: Vec<String> = store
            .load("a")
            .unwrap()
            .searches
            .into_iter()
            .map(|e| e.variant)
            .collect();
        assert_eq!(variants, vec!["desktop".to_string(), "edge".to_string()]);
    }

    #[test]
    fn torn_tail_inside_multibyte_character_does_not_block_loads() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlHistoryStore::new(dir.path());
        store.append_search(&event("b@example.com", "desktop")).unwrap();
        {
            let mut f = OpenOptions::new()
                .append(true)
                .open(store.searches_path())
                .unwrap();
            let line = serde_json::to_string(&event("jos\u{e9}@example.com", "mobile")).unwrap();
            let cut = line.find('\u{e9}').unwrap() + 1;
            f.write_all(&line.as_bytes()[..cut]).unwrap();
        }
        assert_eq!(store.load("b@example.com").unwrap().searches.len(), 1);
        assert!(store.load("jos\u{e9}@example.com").unwrap().is_empty());

        store
            .append_search(&event("jos\u{e9}@example.com", "mobile"))
            .unwrap();
        assert_eq!(
            store.load("jos\u{e9}@example.com").unwrap().searches.len(),
            1
        );
        assert_eq!(store.load_all().unwrap().searches.len(), 2);
    }

    #[test]
    fn import_skips_records_already_present() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlHistoryStore::new(dir.path());
        let history = History {
            runs: Vec::new(),
            searches: vec![event("a", "desktop"), event("a", "mobile")],
        };
        assert_eq!(store.import(&history).unwrap(), 2);
        assert_eq!(store.import(&history).unwrap(), 0);
        assert_eq!(store.load("a").unwrap().searches.len(), 2);
    }

    #[test]
    fn terminated_garbage_line_is_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlHistoryStore::new(dir.path());
        store.append_search(&event("a", "desktop")).unwrap();
        {
            let mut f = OpenOptions::new()
                .append(true)
                .open(store.searches_path())
                .unwrap();
            f.write_all(b"not json\n").unwrap();
        }
        store.append_search(&event("a", "mobile")).unwrap();
        match store.load("a") {
            Err(StorageError::Corrupt { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected corruption, got {other:?}"),
        }
    }

    #[test]
    fn latest_run_summary_is_scoped_to_account() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlHistoryStore::new(dir.path());
        for (account, summary) in [("a", "first"), ("b", "other"), ("a", "second")] {
            store
                .append_run(&RunEntry {
                    timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap(),
                    account: account.to_string(),
                    category: "both".to_string(),
                    outcome: RunOutcome::Done,
                    summary: summary.to_string(),
                    searches: 0,
                    initial_points: None,
                    final_points: None,
                })
                .unwrap();
        }
        let latest = store.latest_run_summary("a").unwrap().unwrap();
        assert_eq!(latest.summary, "second");
    }
}
