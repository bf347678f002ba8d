//! Transfer statistics tracking
//!
//! Aggregates every [`TransferOutcome`] the coordinator produces. Duration
//! figures cover executed transfers only; rejected requests never ran and
//! would drag the minimum to zero.

use crate::coordinator::{TransferCategory, TransferOutcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// Aggregate transfer statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Outcomes that needed at least one apply retry
    pub retried: u64,
    /// Requests turned away by the lock or cooldown
    pub rejected: u64,
    pub avg_duration_ms: f64,
    pub min_duration_ms: Option<u64>,
    pub max_duration_ms: Option<u64>,
    pub by_category: BTreeMap<TransferCategory, u64>,
    /// Executed (non-rejected) transfers backing the duration figures
    pub executed: u64,
}

impl Statistics {
    /// Fraction of requests that succeeded (0.0 when none recorded)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.succeeded as f64 / self.total as f64
        }
    }

    /// One-line summary for logs and status displays
    pub fn display_string(&self) -> String {
        format!(
            "{} transfers, {} succeeded, {} failed, {} retried, {} rejected, avg {:.1} ms",
            self.total, self.succeeded, self.failed, self.retried, self.rejected, self.avg_duration_ms
        )
    }

    fn record(&mut self, outcome: &TransferOutcome) {
        self.total += 1;
        if outcome.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        if outcome.retry_count > 0 {
            self.retried += 1;
        }
        *self.by_category.entry(outcome.category).or_insert(0) += 1;

        if outcome.category.is_rejection() {
            self.rejected += 1;
            return;
        }

        let duration = outcome.duration_ms;
        self.executed += 1;
        self.avg_duration_ms += (duration as f64 - self.avg_duration_ms) / self.executed as f64;
        self.min_duration_ms = Some(self.min_duration_ms.map_or(duration, |min| min.min(duration)));
        self.max_duration_ms = Some(self.max_duration_ms.map_or(duration, |max| max.max(duration)));
    }
}

/// Thread-safe statistics container shared by coordinator instances
#[derive(Debug, Default)]
pub struct StatisticsTracker {
    inner: Mutex<Statistics>,
}

impl StatisticsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one outcome into the running aggregates
    pub fn record(&self, outcome: &TransferOutcome) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(outcome);
    }

    /// Copy of the current aggregates
    pub fn snapshot(&self) -> Statistics {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
