//! Per-account search session.
//!
//! ```text
//! Init -> ComputingOutstanding -> ExecutingCategory(c) -> Done
//!                      |                  |
//!                      +-> Done           +-> Aborted
//! ```
//!
//! Every successful unit is appended to the search log before the in-memory
//! completion state advances, so whatever was flushed before a crash is
//! exactly what the next run recomputes.

use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;
use rewards_history::StorageError;
use rewards_history::error_log::ErrorLog;
use rewards_history::store::HistoryStore;
use rewards_history::types::RunEntry;
use rewards_history::types::RunOutcome;
use rewards_history::types::SearchEvent;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::clock::Clock;
use crate::clock::Sleeper;
use crate::clock::SystemClock;
use crate::clock::ThreadSleeper;
use crate::completion::CompletionState;
use crate::completion::CompletionTracker;
use crate::config::Account;
use crate::config::RetryPolicy;
use crate::error::ConfigError;
use crate::error::RunError;
use crate::executor::ExecutionOptions;
use crate::executor::SearchExecutor;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Init,
    ComputingOutstanding,
    ExecutingCategory(String),
    Done,
    Aborted(String),
}

/// What one account's run did, handed back to the account loop.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub account: String,
    pub category: String,
    pub outcome: RunOutcome,
    /// Successful searches performed during this run.
    pub searches: u32,
    pub initial_points: Option<u64>,
    pub final_points: Option<u64>,
    pub completion: CompletionState,
    /// Raw collaborator log lines plus retry notes.
    pub log: Vec<String>,
}

impl RunReport {
    fn new(account: &str, category: &str, completion: CompletionState) -> Self {
        Self {
            account: account.to_string(),
            category: category.to_string(),
            outcome: RunOutcome::Done,
            searches: 0,
            initial_points: None,
            final_points: None,
            completion,
            log: Vec::new(),
        }
    }

    pub fn is_category_completed(&self) -> bool {
        self.completion.is_search_type_completed(&self.category)
    }

    pub fn summary(&self) -> String {
        format!(
            "{} {}: {} searches, {}",
            self.category,
            self.outcome.as_str(),
            self.searches,
            self.completion.describe(&self.category)
        )
    }

    /// Lines for the stats log and reward notifications.
    pub fn stats_lines(&self) -> Vec<String> {
        let fmt_points = |p: Option<u64>| p.map_or_else(|| "?".to_string(), |n| n.to_string());
        let mut lines = vec![
            format!("category: {}", self.category),
            format!("searches: {}", self.searches),
            format!(
                "points: {} -> {}",
                fmt_points(self.initial_points),
                fmt_points(self.final_points)
            ),
        ];
        if let (Some(init), Some(fin)) = (self.initial_points, self.final_points) {
            lines.push(format!("earned: {}", fin.saturating_sub(init)));
        }
        lines
    }
}

enum Halt {
    Aborted(String),
    Storage(StorageError),
}

impl From<StorageError> for Halt {
    fn from(e: StorageError) -> Self {
        Halt::Storage(e)
    }
}

/// Runs one requested category for one account against the history store.
pub struct Orchestrator<'a> {
    store: &'a dyn HistoryStore,
    tracker: &'a CompletionTracker,
    error_log: &'a ErrorLog,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        store: &'a dyn HistoryStore,
        tracker: &'a CompletionTracker,
        error_log: &'a ErrorLog,
    ) -> Self {
        Self {
            store,
            tracker,
            error_log,
            retry: RetryPolicy::default(),
            clock: Arc::new(SystemClock),
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn store(&self) -> &'a dyn HistoryStore {
        self.store
    }

    pub fn error_log(&self) -> &'a ErrorLog {
        self.error_log
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Completion for `account` as of now, straight from persisted history.
    pub fn current_completion(&self, account: &str) -> Result<CompletionState, StorageError> {
        let history = self.store.load(account)?;
        let today = self.tracker.boundary().date_of(self.clock.now());
        Ok(self
            .tracker
            .compute_outstanding(account, &history.searches, today))
    }

    pub fn run(
        &self,
        account: &Account,
        category: &str,
        executor: &mut dyn SearchExecutor,
        options: &ExecutionOptions,
    ) -> Result<RunReport, RunError> {
        let mut machine = SessionState::Init;
        let variants = self
            .tracker
            .quotas()
            .variants(category)
            .ok_or_else(|| ConfigError::UnknownCategory(category.to_string()))?
            .to_vec();

        self.advance(&mut machine, SessionState::ComputingOutstanding, account);
        let state = self.current_completion(&account.email)?;
        let mut report = RunReport::new(&account.email, category, state);

        if report.is_category_completed() {
            info!(account = %account.email, "{category} already completed");
            report.outcome = RunOutcome::AlreadyCompleted;
            self.advance(&mut machine, SessionState::Done, account);
            self.finish(&report)?;
            return Ok(report);
        }

        self.advance(
            &mut machine,
            SessionState::ExecutingCategory(category.to_string()),
            account,
        );
        report.initial_points = match executor.balance(account, options) {
            Ok(points) => points,
            Err(e) => {
                warn!(account = %account.email, "could not read starting balance: {e}");
                None
            }
        };
        report.final_points = report.initial_points;

        match self.execute_category(account, category, &variants, executor, options, &mut report) {
            Ok(()) => {
                report.outcome = RunOutcome::Done;
                self.advance(&mut machine, SessionState::Done, account);
                self.finish(&report)?;
                Ok(report)
            }
            Err(Halt::Aborted(reason)) => {
                report.outcome = RunOutcome::Aborted;
                self.advance(&mut machine, SessionState::Aborted(reason.clone()), account);
                self.finish(&report)?;
                Err(RunError::Aborted {
                    category: category.to_string(),
                    reason,
                    report: Box::new(report),
                })
            }
            Err(Halt::Storage(e)) => {
                let header = format!("{} {category} storage failure: {e}", account.email);
                if let Err(log_err) = self.error_log.record(self.clock.now(), &header, &report.log)
                {
                    warn!("failed to write error log: {log_err}");
                }
                Err(RunError::Storage(e))
            }
        }
    }

    fn advance(&self, machine: &mut SessionState, next: SessionState, account: &Account) {
        debug!(account = %account.email, from = ?machine, to = ?next, "session transition");
        *machine = next;
    }

    fn execute_category(
        &self,
        account: &Account,
        category: &str,
        variants: &[String],
        executor: &mut dyn SearchExecutor,
        options: &ExecutionOptions,
        report: &mut RunReport,
    ) -> Result<(), Halt> {
        for variant in variants {
            loop {
                self.roll_over_day(account, report)?;
                if report.completion.remaining(variant) == 0 {
                    break;
                }
                self.execute_unit(account, category, variant, executor, options, report)?;
            }
        }
        Ok(())
    }

    /// A run that crosses the day boundary continues against the new day's
    /// quotas, rebuilt from the log, instead of crediting the old day.
    fn roll_over_day(&self, account: &Account, report: &mut RunReport) -> Result<(), Halt> {
        let today = self.tracker.boundary().date_of(self.clock.now());
        if today != report.completion.date() {
            info!(account = %account.email, %today, "day boundary crossed, recomputing completion");
            let history = self.store.load(&account.email)?;
            report.completion =
                self.tracker
                    .compute_outstanding(&account.email, &history.searches, today);
        }
        Ok(())
    }

    /// One search unit, retried on recoverable failures.
    fn execute_unit(
        &self,
        account: &Account,
        category: &str,
        variant: &str,
        executor: &mut dyn SearchExecutor,
        options: &ExecutionOptions,
        report: &mut RunReport,
    ) -> Result<(), Halt> {
        let attempts = self.retry.max_attempts.max(1);
        let mut last_reason = String::new();
        for attempt in 1..=attempts {
            match executor.search(account, category, variant, options) {
                Ok(outcome) => {
                    report.log.extend(outcome.log.iter().cloned());
                    if outcome.points.is_some() {
                        report.final_points = outcome.points;
                    }
                    self.store.append_search(&SearchEvent {
                        timestamp: self.clock.now(),
                        account: account.email.clone(),
                        category: category.to_string(),
                        variant: variant.to_string(),
                        success: outcome.success,
                        points: outcome.points,
                    })?;
                    if outcome.success {
                        report.completion = report.completion.record_success(category, variant);
                        report.searches += 1;
                        return Ok(());
                    }
                    last_reason = format!("{variant} search did not register");
                }
                Err(err) => {
                    self.store.append_search(&SearchEvent {
                        timestamp: self.clock.now(),
                        account: account.email.clone(),
                        category: category.to_string(),
                        variant: variant.to_string(),
                        success: false,
                        points: None,
                    })?;
                    report.log.extend(err.log().iter().cloned());
                    report.log.push(format!("{variant} attempt {attempt}: {err}"));
                    if err.is_fatal() {
                        return Err(Halt::Aborted(format!("{variant}: {}", err.reason())));
                    }
                    last_reason = err.reason().to_string();
                }
            }
            if attempt < attempts {
                warn!(
                    account = %account.email,
                    variant,
                    attempt,
                    "search attempt failed, retrying: {last_reason}"
                );
                self.sleeper
                    .sleep(Duration::from_secs(self.retry.backoff_secs));
            }
        }
        Err(Halt::Aborted(format!(
            "{variant}: gave up after {attempts} attempts: {last_reason}"
        )))
    }

    /// Terminal bookkeeping shared by `Done` and `Aborted`.
    fn finish(&self, report: &RunReport) -> Result<(), StorageError> {
        let now = self.clock.now();
        self.store.append_run(&RunEntry {
            timestamp: now,
            account: report.account.clone(),
            category: report.category.clone(),
            outcome: report.outcome,
            summary: report.summary(),
            searches: report.searches,
            initial_points: report.initial_points,
            final_points: report.final_points,
        })?;
        if report.is_category_completed() {
            info!(account = %report.account, "{}", report.summary());
        } else {
            warn!(account = %report.account, "incomplete: {}", report.summary());
            let header = format!("{} {}", report.account, report.summary());
            if let Err(e) = self.error_log.record(now, &header, &report.log) {
                warn!("failed to write error log: {e}");
            }
        }
        Ok(())
    }
}
