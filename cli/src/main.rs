use clap::CommandFactory;
use clap::Parser;
use rewards_cli::Cli;
use rewards_cli::Command;
use rewards_core::ConfigError;
use rewards_core::config::DEFAULT_LOG_DIR;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output on stdout stays machine readable.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => {
            let batch = rewards_cli::run::run(&cli.config, cli.log_dir, args)?;
            let failed = batch.failures().count();
            if failed > 0 {
                tracing::warn!("{failed} of {} accounts did not finish", batch.accounts.len());
            }
        }
        Command::Status {
            account,
            search_type,
        } => {
            rewards_cli::run::status(&cli.config, cli.log_dir, &account, search_type.as_deref())?;
        }
        Command::History(history) => {
            let log_dir = match cli.log_dir {
                Some(dir) => dir,
                None => match rewards_core::Config::load(&cli.config) {
                    Ok(config) => config.log_dir,
                    Err(ConfigError::Missing(_)) => PathBuf::from(DEFAULT_LOG_DIR),
                    Err(e) => return Err(e.into()),
                },
            };
            rewards_cli::history::run(history, &log_dir)?;
        }
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
        }
    }
    Ok(())
}
