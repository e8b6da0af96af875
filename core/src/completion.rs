//! Daily completion, derived from the day's search events.
//!
//! `CompletionState` is never persisted. It is rebuilt from the search log at
//! the start of every run and advanced in memory as searches succeed, and
//! both paths go through the same saturating increment, so replaying the log
//! after a crash lands on the state the interrupted run had reached.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rewards_history::types::SearchEvent;

use crate::config::DayBoundary;
use crate::quota::QuotaTable;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub done: u32,
    pub target: u32,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.done >= self.target
    }

    pub fn remaining(&self) -> u32 {
        self.target.saturating_sub(self.done)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionState {
    account: String,
    date: NaiveDate,
    progress: BTreeMap<String, Progress>,
    categories: BTreeMap<String, Vec<String>>,
}

impl CompletionState {
    fn empty(account: &str, date: NaiveDate, quotas: &QuotaTable) -> Self {
        Self {
            account: account.to_string(),
            date,
            progress: quotas
                .targets
                .iter()
                .map(|(variant, target)| {
                    (
                        variant.clone(),
                        Progress {
                            done: 0,
                            target: *target,
                        },
                    )
                })
                .collect(),
            categories: quotas.categories.clone(),
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn progress(&self, variant: &str) -> Option<Progress> {
        self.progress.get(variant).copied()
    }

    pub fn remaining(&self, variant: &str) -> u32 {
        self.progress(variant).map(|p| p.remaining()).unwrap_or(0)
    }

    /// A category is complete only when every one of its variants is.
    /// Unknown categories are never complete.
    pub fn is_search_type_completed(&self, category: &str) -> bool {
        match self.categories.get(category) {
            Some(variants) => variants
                .iter()
                .all(|v| self.progress(v).is_none_or(|p| p.is_complete())),
            None => false,
        }
    }

    pub fn outstanding_variants(&self, category: &str) -> Vec<String> {
        self.categories
            .get(category)
            .map(|variants| {
                variants
                    .iter()
                    .filter(|v| self.remaining(v) > 0)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// State with one more completed unit for `variant`. Saturates at the
    /// variant's target; unknown variants leave the state unchanged.
    pub fn record_success(&self, category: &str, variant: &str) -> Self {
        let mut next = self.clone();
        if !next.apply_success(variant) {
            tracing::debug!(category, variant, "ignoring success for variant without quota");
        }
        next
    }

    fn apply_success(&mut self, variant: &str) -> bool {
        match self.progress.get_mut(variant) {
            Some(p) => {
                p.done = p.done.saturating_add(1).min(p.target);
                true
            }
            None => false,
        }
    }

    /// Human readable progress for one category, e.g. `desktop 30/30, mobile 4/20`.
    pub fn describe(&self, category: &str) -> String {
        let Some(variants) = self.categories.get(category) else {
            return format!("unknown category {category}");
        };
        variants
            .iter()
            .map(|v| match self.progress(v) {
                Some(p) => format!("{v} {}/{}", p.done, p.target),
                None => format!("{v} ?"),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Derives completion for one account and day from raw search events.
#[derive(Clone, Debug)]
pub struct CompletionTracker {
    quotas: QuotaTable,
    boundary: DayBoundary,
}

impl CompletionTracker {
    pub fn new(quotas: QuotaTable, boundary: DayBoundary) -> Self {
        Self { quotas, boundary }
    }

    pub fn quotas(&self) -> &QuotaTable {
        &self.quotas
    }

    pub fn boundary(&self) -> DayBoundary {
        self.boundary
    }

    pub fn compute_outstanding(
        &self,
        account: &str,
        events: &[SearchEvent],
        reference_date: NaiveDate,
    ) -> CompletionState {
        let mut state = CompletionState::empty(account, reference_date, &self.quotas);
        for event in events.iter().filter(|e| {
            e.success && e.account == account && self.boundary.date_of(e.timestamp) == reference_date
        }) {
            state.apply_success(&event.variant);
        }
        state
    }
}
