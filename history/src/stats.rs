//! Derived points summary per account, kept in its own log so it can be
//! rewritten or aggregated without touching raw history.

use std::path::Path;
use std::path::PathBuf;

use chrono::DateTime;
use chrono::Utc;

use crate::error::Result;
use crate::store::jsonl::append_record;
use crate::store::jsonl::read_records;
use crate::types::StatsEntry;
use crate::types::StatsTotals;

pub const STATS_LOG: &str = "stats.jsonl";

#[derive(Debug, Clone)]
pub struct StatsLog {
    path: PathBuf,
}

impl StatsLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one summary line for `account`. Callers treat failures as
    /// non-fatal.
    pub fn add_entry_and_write(
        &self,
        at: DateTime<Utc>,
        account: &str,
        summary: &str,
        initial_points: Option<u64>,
        final_points: Option<u64>,
    ) -> Result<StatsEntry> {
        let entry = StatsEntry {
            timestamp: at,
            account: account.to_string(),
            summary: summary.to_string(),
            initial_points,
            final_points,
        };
        append_record(&self.path, &entry)?;
        Ok(entry)
    }

    pub fn entries(&self, account: &str) -> Result<Vec<StatsEntry>> {
        let mut all: Vec<StatsEntry> = read_records(&self.path)?;
        all.retain(|e| e.account == account);
        Ok(all)
    }

    pub fn totals(&self, account: &str) -> Result<StatsTotals> {
        let entries = self.entries(account)?;
        Ok(StatsTotals {
            runs: entries.len(),
            points_earned: entries.iter().filter_map(StatsEntry::earned).sum(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn totals_sum_earned_points_per_account() {
        let dir = tempfile::tempdir().unwrap();
        let log = StatsLog::new(dir.path().join(STATS_LOG));
        let at = Utc.with_ymd_and_hms(2025, 4, 15, 9, 0, 0).unwrap();
        log.add_entry_and_write(at, "a", "run 1", Some(100), Some(150))
            .unwrap();
        log.add_entry_and_write(at, "b", "run 1", Some(0), Some(999))
            .unwrap();
        log.add_entry_and_write(at, "a", "run 2", Some(150), None)
            .unwrap();
        log.add_entry_and_write(at, "a", "run 3", Some(150), Some(180))
            .unwrap();
        assert_eq!(log.entries("a").unwrap()[0].timestamp, at);

        let totals = log.totals("a").unwrap();
        assert_eq!(
            totals,
            StatsTotals {
                runs: 3,
                points_earned: 80
            }
        );
        assert_eq!(log.entries("nobody").unwrap().len(), 0);
    }
}
