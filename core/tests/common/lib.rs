#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use chrono::DateTime;
use chrono::TimeZone;
use chrono::Utc;
use rewards_core::SearchError;
use rewards_core::clock::Clock;
use rewards_core::clock::Sleeper;
use rewards_core::completion::CompletionTracker;
use rewards_core::config::Account;
use rewards_core::config::DayBoundary;
use rewards_core::executor::ExecutionOptions;
use rewards_core::executor::SearchExecutor;
use rewards_core::executor::SearchOutcome;
use rewards_core::quota::QuotaTable;
use rewards_history::error_log::ErrorLog;
use rewards_history::factory::LogLayout;
use rewards_history::stats::StatsLog;
use rewards_history::store::jsonl::JsonlHistoryStore;
use tempfile::TempDir;

/// Noon UTC on the fixed test day.
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 15, 12, 0, 0).unwrap()
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Clone, Default)]
pub struct RecordingSleeper(Arc<Mutex<Vec<Duration>>>);

impl RecordingSleeper {
    pub fn recorded(&self) -> Vec<Duration> {
        self.0.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.0.lock().unwrap().push(duration);
    }
}

/// Small quotas so tests stay readable: desktop 3, mobile 2, edge 0.
pub fn small_quotas() -> QuotaTable {
    let v = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    QuotaTable {
        targets: BTreeMap::from([
            ("desktop".to_string(), 3),
            ("mobile".to_string(), 2),
            ("edge".to_string(), 0),
        ]),
        categories: BTreeMap::from([
            ("desktop".to_string(), v(&["desktop"])),
            ("mobile".to_string(), v(&["mobile"])),
            ("edge".to_string(), v(&["edge"])),
            ("both".to_string(), v(&["desktop", "mobile"])),
        ]),
    }
}

/// Log directory plus everything the orchestrator needs, all rooted in a
/// temp dir that lives as long as the fixture.
pub struct Fixture {
    pub dir: TempDir,
    pub store: JsonlHistoryStore,
    pub tracker: CompletionTracker,
    pub error_log: ErrorLog,
    pub stats: StatsLog,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let layout = LogLayout::new(dir.path());
        Self {
            store: JsonlHistoryStore::new(dir.path()),
            tracker: CompletionTracker::new(small_quotas(), DayBoundary::Utc),
            error_log: ErrorLog::new(&layout.errors),
            stats: StatsLog::new(&layout.stats),
            dir,
        }
    }

    pub fn error_log_contents(&self) -> String {
        std::fs::read_to_string(self.error_log.path()).unwrap_or_default()
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

pub fn account(email: &str) -> Account {
    Account::new(email, "secret")
}

/// Scripted collaborator: per-account queues of results, falling back to a
/// default once a queue is drained. Counts every search call.
pub struct ScriptedExecutor {
    scripts: HashMap<String, VecDeque<Result<SearchOutcome, SearchError>>>,
    fallback: HashMap<String, Result<SearchOutcome, SearchError>>,
    pub calls: Vec<(String, String, String)>,
    pub balance: Option<u64>,
    points: u64,
}

impl ScriptedExecutor {
    /// Every search succeeds and adds 5 points.
    pub fn always_succeeds() -> Self {
        Self {
            scripts: HashMap::new(),
            fallback: HashMap::new(),
            calls: Vec::new(),
            balance: Some(100),
            points: 100,
        }
    }

    pub fn script(
        mut self,
        account: &str,
        results: Vec<Result<SearchOutcome, SearchError>>,
    ) -> Self {
        self.scripts
            .insert(account.to_string(), results.into_iter().collect());
        self
    }

    pub fn fail_always(mut self, account: &str, err: SearchError) -> Self {
        self.fallback.insert(account.to_string(), Err(err));
        self
    }

    pub fn calls_for(&self, account: &str) -> usize {
        self.calls.iter().filter(|(a, _, _)| a == account).count()
    }
}

impl SearchExecutor for ScriptedExecutor {
    fn balance(
        &mut self,
        _account: &Account,
        _options: &ExecutionOptions,
    ) -> Result<Option<u64>, SearchError> {
        Ok(self.balance)
    }

    fn search(
        &mut self,
        account: &Account,
        category: &str,
        variant: &str,
        _options: &ExecutionOptions,
    ) -> Result<SearchOutcome, SearchError> {
        self.calls.push((
            account.email.clone(),
            category.to_string(),
            variant.to_string(),
        ));
        if let Some(next) = self
            .scripts
            .get_mut(&account.email)
            .and_then(VecDeque::pop_front)
        {
            return next;
        }
        if let Some(res) = self.fallback.get(&account.email) {
            return res.clone();
        }
        self.points += 5;
        Ok(SearchOutcome {
            success: true,
            points: Some(self.points),
            log: vec![format!("searched {variant} for {}", account.email)],
        })
    }
}
