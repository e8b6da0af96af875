use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// How a run for one account ended.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Done,
    AlreadyCompleted,
    Aborted,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Done => "done",
            RunOutcome::AlreadyCompleted => "already_completed",
            RunOutcome::Aborted => "aborted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "done" => Some(RunOutcome::Done),
            "already_completed" => Some(RunOutcome::AlreadyCompleted),
            "aborted" => Some(RunOutcome::Aborted),
            _ => None,
        }
    }
}

/// One record per executed run, written once the run terminates.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunEntry {
    pub timestamp: DateTime<Utc>,
    pub account: String,
    pub category: String,
    pub outcome: RunOutcome,
    pub summary: String,
    #[serde(default)]
    pub searches: u32,
    #[serde(default)]
    pub initial_points: Option<u64>,
    #[serde(default)]
    pub final_points: Option<u64>,
}

/// One record per search attempt. Only successful events count toward
/// daily completion; failed ones are kept for the audit trail.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchEvent {
    pub timestamp: DateTime<Utc>,
    pub account: String,
    pub category: String,
    pub variant: String,
    pub success: bool,
    #[serde(default)]
    pub points: Option<u64>,
}

/// Persisted history in the order records were committed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct History {
    pub runs: Vec<RunEntry>,
    pub searches: Vec<SearchEvent>,
}

impl History {
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty() && self.searches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.runs.len() + self.searches.len()
    }
}

/// Derived per-run points summary kept apart from the raw history.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatsEntry {
    pub timestamp: DateTime<Utc>,
    pub account: String,
    pub summary: String,
    #[serde(default)]
    pub initial_points: Option<u64>,
    #[serde(default)]
    pub final_points: Option<u64>,
}

impl StatsEntry {
    /// Points gained during the run, when both totals are known.
    pub fn earned(&self) -> Option<u64> {
        match (self.initial_points, self.final_points) {
            (Some(init), Some(fin)) => Some(fin.saturating_sub(init)),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsTotals {
    pub runs: usize,
    pub points_earned: u64,
}
