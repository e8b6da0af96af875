use std::sync::Arc;

use rand::Rng;
use rewards_history::stats::StatsLog;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::clock::Sleeper;
use crate::clock::ThreadSleeper;
use crate::config::Account;
use crate::error::RunError;
use crate::executor::ExecutionOptions;
use crate::executor::SearchExecutor;
use crate::notify::Notifiers;
use crate::pacing::PacingPolicy;
use crate::session::Orchestrator;
use crate::session::RunReport;

#[derive(Debug)]
pub enum AccountStatus {
    Completed(RunReport),
    Aborted {
        category: String,
        reason: String,
        report: Box<RunReport>,
    },
    Failed(String),
}

#[derive(Debug)]
pub struct AccountResult {
    pub account: String,
    pub status: AccountStatus,
}

impl AccountResult {
    pub fn is_success(&self) -> bool {
        matches!(self.status, AccountStatus::Completed(_))
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub accounts: Vec<AccountResult>,
}

impl BatchReport {
    pub fn failures(&self) -> impl Iterator<Item = &AccountResult> {
        self.accounts.iter().filter(|r| !r.is_success())
    }

    pub fn result_for(&self, account: &str) -> Option<&AccountResult> {
        self.accounts.iter().find(|r| r.account == account)
    }
}

/// Runs every account in turn. One account failing never stops the batch.
pub struct AccountLoop<'a> {
    orchestrator: &'a Orchestrator<'a>,
    stats: &'a StatsLog,
    notifiers: &'a Notifiers,
    pacing: PacingPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl<'a> AccountLoop<'a> {
    pub fn new(
        orchestrator: &'a Orchestrator<'a>,
        stats: &'a StatsLog,
        notifiers: &'a Notifiers,
        pacing: PacingPolicy,
    ) -> Self {
        Self {
            orchestrator,
            stats,
            notifiers,
            pacing,
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn run_batch<R: Rng>(
        &self,
        accounts: &[Account],
        category: &str,
        executor: &mut dyn SearchExecutor,
        options: &ExecutionOptions,
        rng: &mut R,
    ) -> BatchReport {
        let mut batch = BatchReport::default();
        for account in self.pacing.order(accounts, rng) {
            info!("start rewarding for {}", account.email);
            let status = self.process_account(&account, category, executor, options);
            batch.accounts.push(AccountResult {
                account: account.email.clone(),
                status,
            });

            let delay = self.pacing.next_delay(rng);
            info!("sleeping {}s before next account", delay.as_secs());
            self.sleeper.sleep(delay);
        }
        batch
    }

    fn process_account(
        &self,
        account: &Account,
        category: &str,
        executor: &mut dyn SearchExecutor,
        options: &ExecutionOptions,
    ) -> AccountStatus {
        match self.orchestrator.run(account, category, executor, options) {
            Ok(report) => {
                self.after_run(&report);
                AccountStatus::Completed(report)
            }
            Err(RunError::Aborted {
                category,
                reason,
                report,
            }) => {
                error!(account = %account.email, "{category} aborted: {reason}");
                self.after_run(&report);
                self.notifiers.send_message(&format!(
                    "Rewarding for {} aborted during {category}: {reason}",
                    account.email
                ));
                AccountStatus::Aborted {
                    category,
                    reason,
                    report,
                }
            }
            Err(e) => {
                error!(account = %account.email, "run failed: {e}");
                let header = format!("{} {category} failed: {e}", account.email);
                if let Err(log_err) = self.orchestrator.error_log().record(
                    self.orchestrator.now(),
                    &header,
                    &[],
                ) {
                    warn!(account = %account.email, "failed to write error log: {log_err}");
                }
                self.notifiers
                    .send_message(&format!("Rewarding for {} failed: {e}", account.email));
                AccountStatus::Failed(e.to_string())
            }
        }
    }

    fn after_run(&self, report: &RunReport) {
        let fmt_points = |p: Option<u64>| p.map_or_else(|| "?".to_string(), |n| n.to_string());
        info!(
            "initial: {} final: {}",
            fmt_points(report.initial_points),
            fmt_points(report.final_points)
        );
        self.notifiers.send_message(&format!(
            "End of rewarding for {}\nInitial: {} Final: {}",
            report.account,
            fmt_points(report.initial_points),
            fmt_points(report.final_points)
        ));

        let lines = report.stats_lines();
        if let Err(e) = self.stats.add_entry_and_write(
            self.orchestrator.now(),
            &report.account,
            &lines.join("; "),
            report.initial_points,
            report.final_points,
        ) {
            warn!(account = %report.account, "failed to write stats: {e}");
        }

        match self.orchestrator.store().latest_run_summary(&report.account) {
            Ok(Some(run)) => {
                self.notifiers
                    .send_reward_message(&lines, &run.summary, &report.account);
            }
            Ok(None) => {}
            Err(e) => warn!(account = %report.account, "failed to read last run: {e}"),
        }
    }
}
