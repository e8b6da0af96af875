use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::Args;
use rewards_core::Account;
use rewards_core::CompletionTracker;
use rewards_core::Config;
use rewards_core::ConfigError;
use rewards_core::driver::AccountLoop;
use rewards_core::driver::AccountStatus;
use rewards_core::driver::BatchReport;
use rewards_core::executor::ExecutionOptions;
use rewards_core::notify::Notifiers;
use rewards_core::session::Orchestrator;
use rewards_history::error_log::ErrorLog;
use rewards_history::factory;
use rewards_history::factory::LogLayout;
use rewards_history::stats::StatsLog;

use crate::executor::CommandExecutor;
use crate::notify::CommandNotifier;
use crate::notify::LogNotifier;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Category to complete (e.g. desktop, mobile, edge, both, all).
    #[arg(long = "search-type", default_value = "both")]
    pub search_type: String,

    /// Run a single account instead of the configured list.
    #[arg(short, long, requires = "password")]
    pub email: Option<String>,

    #[arg(short, long, requires = "email")]
    pub password: Option<String>,

    /// Run the browser without a visible window.
    #[arg(long)]
    pub headless: bool,

    /// Disable the browser sandbox.
    #[arg(long)]
    pub nosandbox: bool,

    /// Reuse saved session cookies.
    #[arg(long)]
    pub cookies: bool,

    /// Path to the browser driver binary.
    #[arg(long)]
    pub driver: Option<PathBuf>,

    /// Region used to pick trending search terms.
    #[arg(long = "google-trends-geo")]
    pub google_trends_geo: Option<String>,
}

impl RunArgs {
    fn options(&self) -> ExecutionOptions {
        ExecutionOptions {
            headless: self.headless,
            no_sandbox: self.nosandbox,
            use_cookies: self.cookies,
            driver: self.driver.clone(),
            trends_geo: self.google_trends_geo.clone(),
        }
    }
}

fn load_config(path: &Path, log_dir: Option<PathBuf>) -> Result<Config, ConfigError> {
    let mut config = Config::load(path)?;
    if let Some(dir) = log_dir {
        config.log_dir = dir;
    }
    Ok(config)
}

/// Execute one batch over every account. Per-account failures are reported
/// but do not make the command fail.
pub fn run(
    config_path: &Path,
    log_dir: Option<PathBuf>,
    args: RunArgs,
) -> anyhow::Result<BatchReport> {
    let mut config = load_config(config_path, log_dir)?;
    if let (Some(email), Some(password)) = (&args.email, &args.password) {
        config.accounts = vec![Account::new(email.clone(), password.clone())];
    }
    config.validate()?;
    if config.quotas.variants(&args.search_type).is_none() {
        return Err(ConfigError::UnknownCategory(args.search_type.clone()).into());
    }
    let search_command = config
        .search_command
        .clone()
        .context("config is missing `search_command`")?;

    let store = factory::open_store(&config.log_dir, None)?;
    let layout = LogLayout::new(&config.log_dir);
    let tracker = CompletionTracker::new(config.quotas.clone(), config.day_boundary);
    let error_log = ErrorLog::new(&layout.errors);
    let stats = StatsLog::new(&layout.stats);
    let orchestrator =
        Orchestrator::new(store.as_ref(), &tracker, &error_log).with_retry(config.retry);

    let mut notifiers = Notifiers::new(vec![Box::new(LogNotifier)]);
    if let Some(spec) = config.notify_command.clone() {
        notifiers.push(Box::new(CommandNotifier::new(spec)));
    }

    let mut executor = CommandExecutor::new(search_command);
    let driver = AccountLoop::new(&orchestrator, &stats, &notifiers, config.pacing);
    let batch = driver.run_batch(
        &config.accounts,
        &args.search_type,
        &mut executor,
        &args.options(),
        &mut rand::rng(),
    );

    for result in &batch.accounts {
        match &result.status {
            AccountStatus::Completed(report) => {
                println!("{}: {}", result.account, report.summary());
            }
            AccountStatus::Aborted { report, .. } => {
                println!("{}: {}", result.account, report.summary());
            }
            AccountStatus::Failed(err) => println!("{}: failed: {err}", result.account),
        }
    }
    Ok(batch)
}

/// Print today's completion for `account` straight from the search log.
pub fn status(
    config_path: &Path,
    log_dir: Option<PathBuf>,
    account: &str,
    search_type: Option<&str>,
) -> anyhow::Result<()> {
    let config = match load_config(config_path, log_dir.clone()) {
        Ok(c) => c,
        Err(ConfigError::Missing(_)) => Config {
            log_dir: log_dir.unwrap_or_else(|| Config::default().log_dir),
            ..Config::default()
        },
        Err(e) => return Err(e.into()),
    };
    config.quotas.validate()?;
    let store = factory::open_store(&config.log_dir, None)?;
    let tracker = CompletionTracker::new(config.quotas.clone(), config.day_boundary);
    let today = config.day_boundary.date_of(Utc::now());
    let history = store.load(account)?;
    let state = tracker.compute_outstanding(account, &history.searches, today);

    let categories: Vec<&str> = match search_type {
        Some(c) => {
            if config.quotas.variants(c).is_none() {
                return Err(ConfigError::UnknownCategory(c.to_string()).into());
            }
            vec![c]
        }
        None => config.quotas.category_names().collect(),
    };
    println!("{account} on {today}");
    for category in categories {
        let label = if state.is_search_type_completed(category) {
            "completed"
        } else {
            "pending"
        };
        println!("  {category}: {label} ({})", state.describe(category));
    }
    Ok(())
}
