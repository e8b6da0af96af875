//! Account ordering and inter-account delay. Both are randomized on purpose
//! so consecutive invocations never share an ordering or timing pattern.

use std::time::Duration;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Deserialize;
use serde::Serialize;

use crate::config::Account;
use crate::error::ConfigError;

/// Inclusive range, in seconds, for the pause after each account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl Default for DelayRange {
    fn default() -> Self {
        Self {
            min_secs: 30,
            max_secs: 300,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingPolicy {
    #[serde(default = "default_shuffle")]
    pub shuffle_accounts: bool,
    #[serde(default)]
    pub delay: DelayRange,
}

fn default_shuffle() -> bool {
    true
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            shuffle_accounts: default_shuffle(),
            delay: DelayRange::default(),
        }
    }
}

impl PacingPolicy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.delay.min_secs > self.delay.max_secs {
            return Err(ConfigError::InvalidDelay {
                min: self.delay.min_secs,
                max: self.delay.max_secs,
            });
        }
        Ok(())
    }

    /// Processing order for one invocation.
    pub fn order<R: Rng>(&self, accounts: &[Account], rng: &mut R) -> Vec<Account> {
        let mut out = accounts.to_vec();
        if self.shuffle_accounts {
            out.shuffle(rng);
        }
        out
    }

    pub fn next_delay<R: Rng>(&self, rng: &mut R) -> Duration {
        let DelayRange { min_secs, max_secs } = self.delay;
        if min_secs >= max_secs {
            return Duration::from_secs(min_secs);
        }
        Duration::from_secs(rng.random_range(min_secs..=max_secs))
    }
}
