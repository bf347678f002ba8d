//! Process-wide coordinator state
//!
//! One [`CoordinatorState`] is constructed by the host and shared (`Arc`) by
//! every coordinator instance, so independent call sites contend for the same
//! lock and feed the same statistics. The lock is a binary flag plus a cooldown
//! window; it is never held across an `.await`.

use crate::coordinator::outcome::{TransferCategory, TransferOutcome};
use crate::statistics::{Statistics, StatisticsTracker};
use quill_common::config::BridgeSettings;
use quill_common::time::{duration_to_millis, millis_to_duration};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// Lock state guarding transfer execution
#[derive(Debug, Clone)]
pub struct MutexState {
    pub busy: bool,
    /// Only ever moves forward
    pub last_operation_end: Option<Instant>,
    pub cooldown: Duration,
    pub current_operation_id: Option<Uuid>,
}

impl MutexState {
    fn new(cooldown: Duration) -> Self {
        Self {
            busy: false,
            last_operation_end: None,
            cooldown,
            current_operation_id: None,
        }
    }

    fn cooldown_remaining(&self, now: Instant) -> Duration {
        match self.last_operation_end {
            Some(end) => self.cooldown.saturating_sub(now.saturating_duration_since(end)),
            None => Duration::ZERO,
        }
    }
}

/// Public view of the lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutexStatus {
    pub busy: bool,
    /// 0 when a request would be admitted now; the full cooldown while busy
    pub ms_until_next_allowed: u64,
    pub current_operation_id: Option<Uuid>,
}

/// Why a request was not admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Busy { operation_id: Option<Uuid> },
    Cooldown { remaining: Duration },
}

impl Rejection {
    pub fn category(&self) -> TransferCategory {
        match self {
            Rejection::Busy { .. } => TransferCategory::MutexBusy,
            Rejection::Cooldown { .. } => TransferCategory::CooldownActive,
        }
    }

    pub fn diagnostic(&self) -> String {
        match self {
            Rejection::Busy {
                operation_id: Some(id),
            } => format!("transfer {} already in progress", id),
            Rejection::Busy { operation_id: None } => "transfer already in progress".to_string(),
            Rejection::Cooldown { remaining } => format!(
                "cooldown active, next transfer allowed in {} ms",
                duration_to_millis(*remaining)
            ),
        }
    }
}

/// Lock plus statistics, shared by all coordinators of one host
#[derive(Debug)]
pub struct CoordinatorState {
    mutex: Mutex<MutexState>,
    statistics: StatisticsTracker,
}

impl CoordinatorState {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            mutex: Mutex::new(MutexState::new(cooldown)),
            statistics: StatisticsTracker::new(),
        }
    }

    /// Shared state using `bridge.cooldown_ms`
    pub fn from_settings(settings: &BridgeSettings) -> Arc<Self> {
        Arc::new(Self::new(millis_to_duration(settings.cooldown_ms)))
    }

    /// Admit a request: set busy and hand out a fresh operation id
    ///
    /// Rejection leaves the state untouched.
    pub fn try_acquire(self: &Arc<Self>) -> Result<OperationLease, Rejection> {
        let now = Instant::now();
        let mut state = self.lock();

        if state.busy {
            return Err(Rejection::Busy {
                operation_id: state.current_operation_id,
            });
        }

        let remaining = state.cooldown_remaining(now);
        if !remaining.is_zero() {
            return Err(Rejection::Cooldown { remaining });
        }

        let operation_id = Uuid::new_v4();
        state.busy = true;
        state.current_operation_id = Some(operation_id);
        debug!(%operation_id, "Transfer lock acquired");

        Ok(OperationLease {
            state: Arc::clone(self),
            operation_id,
            released: false,
        })
    }

    pub fn mutex_status(&self) -> MutexStatus {
        let now = Instant::now();
        let state = self.lock();

        let ms_until_next_allowed = if state.busy {
            duration_to_millis(state.cooldown)
        } else {
            // Round up so a non-zero remainder never reads as "allowed now"
            let remaining = state.cooldown_remaining(now);
            let whole = duration_to_millis(remaining);
            if remaining > Duration::from_millis(whole) {
                whole + 1
            } else {
                whole
            }
        };

        MutexStatus {
            busy: state.busy,
            ms_until_next_allowed,
            current_operation_id: state.current_operation_id,
        }
    }

    /// Copy of the raw lock state
    pub fn mutex_state(&self) -> MutexState {
        self.lock().clone()
    }

    pub fn statistics(&self) -> Statistics {
        self.statistics.snapshot()
    }

    pub(crate) fn record(&self, outcome: &TransferOutcome) {
        self.statistics.record(outcome);
    }

    fn release(&self, operation_id: Uuid) {
        let now = Instant::now();
        let mut state = self.lock();

        if state.current_operation_id != Some(operation_id) {
            debug!(%operation_id, "Stale lease released, lock owned elsewhere");
            return;
        }

        state.busy = false;
        state.current_operation_id = None;
        state.last_operation_end = Some(match state.last_operation_end {
            Some(previous) => previous.max(now),
            None => now,
        });
        debug!(%operation_id, "Transfer lock released, cooldown started");
    }

    fn lock(&self) -> MutexGuard<'_, MutexState> {
        self.mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Proof of holding the transfer lock
///
/// Dropping the lease releases the lock and starts the cooldown, so a request
/// future dropped mid-transfer cannot leave the bridge busy.
#[derive(Debug)]
pub struct OperationLease {
    state: Arc<CoordinatorState>,
    operation_id: Uuid,
    released: bool,
}

impl OperationLease {
    pub fn operation_id(&self) -> Uuid {
        self.operation_id
    }

    /// Release the lock now
    pub fn release(mut self) {
        self.released = true;
        self.state.release(self.operation_id);
    }
}

impl Drop for OperationLease {
    fn drop(&mut self) {
        if !self.released {
            self.state.release(self.operation_id);
        }
    }
}
