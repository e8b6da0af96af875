use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use chrono::DateTime;
use chrono::Local;
use chrono::NaiveDate;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigError;
use crate::pacing::PacingPolicy;
use crate::quota::QuotaTable;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.json";
pub const DEFAULT_LOG_DIR: &str = "logs";

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub email: String,
    pub password: String,
}

impl Account {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Which midnight starts a new reward day.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayBoundary {
    /// Midnight in the host's local timezone.
    #[default]
    Local,
    Utc,
}

impl DayBoundary {
    pub fn date_of(&self, ts: DateTime<Utc>) -> NaiveDate {
        match self {
            DayBoundary::Local => ts.with_timezone(&Local).date_naive(),
            DayBoundary::Utc => ts.date_naive(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_secs() -> u64 {
    5
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_secs: default_backoff_secs(),
        }
    }
}

/// External program plus fixed leading arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "user", default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub quotas: QuotaTable,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default)]
    pub day_boundary: DayBoundary,
    #[serde(default)]
    pub pacing: PacingPolicy,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub search_command: Option<CommandSpec>,
    #[serde(default)]
    pub notify_command: Option<CommandSpec>,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_DIR)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            quotas: QuotaTable::default(),
            log_dir: default_log_dir(),
            day_boundary: DayBoundary::default(),
            pacing: PacingPolicy::default(),
            retry: RetryPolicy::default(),
            search_command: None,
            notify_command: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::Missing(path.to_path_buf()));
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check everything a batch relies on before touching any account.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.accounts.is_empty() {
            return Err(ConfigError::NoAccounts);
        }
        self.quotas.validate()?;
        self.pacing.validate()?;
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidRetry);
        }
        Ok(())
    }
}
