use std::path::Path;
use std::path::PathBuf;

use clap::Parser;
use rewards_history::factory;
use rewards_history::factory::LogLayout;
use rewards_history::stats::StatsLog;

/// CLI for run history inspection and maintenance.
#[derive(Debug, Parser)]
pub struct HistoryCli {
    #[command(subcommand)]
    pub cmd: HistoryCommand,
}

/// History subcommands.
#[derive(Debug, clap::Subcommand)]
pub enum HistoryCommand {
    /// Print the most recent run entry for an account.
    Last {
        #[arg(long)]
        account: String,
    },
    /// List every run entry for an account.
    Runs {
        #[arg(long)]
        account: String,
    },
    /// Show accumulated points statistics for an account.
    Stats {
        #[arg(long)]
        account: String,
    },
    /// Rewrite a JSONL log without blank, broken or duplicate lines.
    Compact {
        /// Input JSONL file to compact
        #[arg(long)]
        input: PathBuf,
        /// Output JSONL file to write results
        #[arg(long)]
        output: PathBuf,
    },
    /// Copy the JSONL run and search logs into a SQLite database.
    Migrate {
        /// Path to the destination SQLite database file
        #[arg(long)]
        sqlite: PathBuf,
    },
}

/// Execute the history command against the logs in `log_dir`.
pub fn run(cli: HistoryCli, log_dir: &Path) -> anyhow::Result<()> {
    match cli.cmd {
        HistoryCommand::Compact { input, output } => {
            let (read, written) = rewards_history::migrate::compact_jsonl(&input, &output)?;
            println!("Read {read} entries, wrote {written} entries");
        }
        HistoryCommand::Migrate { sqlite } => {
            let n = rewards_history::migrate::migrate_jsonl_to_sqlite(log_dir, &sqlite)?;
            println!("Migrated {n} entries");
        }
        HistoryCommand::Stats { account } => {
            let stats = StatsLog::new(LogLayout::new(log_dir).stats);
            let totals = stats.totals(&account)?;
            println!(
                "{account}: {} runs, {} points earned",
                totals.runs, totals.points_earned
            );
        }
        HistoryCommand::Last { account } => {
            let store = factory::open_store(log_dir, None)?;
            match store.latest_run_summary(&account)? {
                Some(run) => println!("{}", serde_json::to_string(&run)?),
                None => println!("no runs recorded for {account}"),
            }
        }
        HistoryCommand::Runs { account } => {
            let store = factory::open_store(log_dir, None)?;
            for run in store.load(&account)?.runs {
                println!("{} {}", run.timestamp.to_rfc3339(), run.summary);
            }
        }
    }
    Ok(())
}
