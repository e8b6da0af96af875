use std::process::Command;

use rewards_core::Account;
use rewards_core::SearchError;
use rewards_core::config::CommandSpec;
use rewards_core::executor::ExecutionOptions;
use rewards_core::executor::SearchExecutor;
use rewards_core::executor::SearchOutcome;
use serde::Deserialize;

/// Exit status a search program uses to ask for a retry (EX_TEMPFAIL).
pub const EXIT_RETRY: i32 = 75;

/// Env var carrying the account password, kept off the command line.
pub const PASSWORD_ENV: &str = "REWARDS_PASSWORD";

#[derive(Debug, Deserialize)]
struct ReportLine {
    success: bool,
    #[serde(default)]
    points: Option<u64>,
    #[serde(default)]
    log: Vec<String>,
}

/// Delegates each search to an external program. The program reports on
/// its last stdout line as `{"success": bool, "points": n, "log": [..]}`.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    spec: CommandSpec,
}

impl CommandExecutor {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }

    fn invoke(
        &self,
        account: &Account,
        extra: &[&str],
        options: &ExecutionOptions,
    ) -> Result<SearchOutcome, SearchError> {
        let program = &self.spec.program;
        let mut cmd = Command::new(program);
        cmd.args(&self.spec.args)
            .arg("--email")
            .arg(&account.email)
            .args(extra)
            .env(PASSWORD_ENV, &account.password);
        if options.headless {
            cmd.arg("--headless");
        }
        if options.no_sandbox {
            cmd.arg("--no-sandbox");
        }
        if options.use_cookies {
            cmd.arg("--cookies");
        }
        if let Some(driver) = &options.driver {
            cmd.arg("--driver").arg(driver);
        }
        if let Some(geo) = &options.trends_geo {
            cmd.arg("--trends-geo").arg(geo);
        }

        let output = cmd.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SearchError::fatal(format!("search program {program} not found"))
            } else {
                SearchError::recoverable(format!("failed to spawn {program}: {e}"))
            }
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut lines: Vec<&str> = stdout.lines().filter(|l| !l.trim().is_empty()).collect();
        let last = lines.pop().unwrap_or_default();
        let mut log: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
        log.extend(stderr.lines().map(str::to_string));

        match output.status.code() {
            Some(0) => {}
            code => {
                let reason = format!("{program} exited with {}: {last}", output.status);
                if !last.is_empty() {
                    log.push(last.to_string());
                }
                let err = if matches!(code, Some(EXIT_RETRY) | None) {
                    SearchError::recoverable(reason)
                } else {
                    SearchError::fatal(reason)
                };
                return Err(err.with_log(log));
            }
        }

        let report: ReportLine = match serde_json::from_str(last.trim()) {
            Ok(report) => report,
            Err(e) => {
                log.push(last.to_string());
                return Err(SearchError::recoverable(format!(
                    "unreadable report from {program}: {e}"
                ))
                .with_log(log));
            }
        };
        log.extend(report.log);
        Ok(SearchOutcome {
            success: report.success,
            points: report.points,
            log,
        })
    }
}

impl SearchExecutor for CommandExecutor {
    fn balance(
        &mut self,
        account: &Account,
        options: &ExecutionOptions,
    ) -> Result<Option<u64>, SearchError> {
        Ok(self.invoke(account, &["--balance"], options)?.points)
    }

    fn search(
        &mut self,
        account: &Account,
        category: &str,
        variant: &str,
        options: &ExecutionOptions,
    ) -> Result<SearchOutcome, SearchError> {
        self.invoke(
            account,
            &["--category", category, "--variant", variant],
            options,
        )
    }
}
