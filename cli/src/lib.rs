pub mod executor;
pub mod history;
pub mod notify;
pub mod run;

use std::path::PathBuf;

use clap::Parser;
use rewards_core::config::DEFAULT_CONFIG_PATH;

/// Daily reward searches with resumable, per-account progress tracking.
#[derive(Debug, Parser)]
#[command(name = "rewards", version, about)]
pub struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Directory for history, stats and error logs (overrides the config file).
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Run the requested search category for every configured account.
    Run(run::RunArgs),
    /// Show today's completion for one account.
    Status {
        #[arg(long)]
        account: String,
        /// Only show this category.
        #[arg(long = "search-type")]
        search_type: Option<String>,
    },
    /// Inspect or maintain the history logs.
    History(history::HistoryCli),
    /// Print a shell completion script.
    Completion {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
