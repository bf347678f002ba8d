//! Destination Accessor
//!
//! Resolves update capabilities on the Form domain, which may still be
//! hydrating when a transfer starts.
//!
//! # Operations
//! - [`DestinationAccessor::await_readiness`]: poll for the hydration flag or an
//!   essential update function (exponential backoff 50ms ×1.5, capped at 200ms,
//!   bounded by the hydration wait, default 3000ms)
//! - [`DestinationAccessor::resolve_capabilities`]: read the callable handles up
//!   to `resolve_attempts` times (spacing 100ms, 150ms, ...), stopping early once
//!   `update_field` or `update_content` is present
//!
//! Neither operation fails: absence of capabilities is reported as an empty
//! [`CapabilityRecord`].
//!
//! Resolved records are turned into an [`UpdatePlan`], the discriminated update
//! shape the coordinator applies: full-replace preferred over compound setters,
//! compound preferred over per-field updates.

use crate::domains::{
    CapabilityRecord, FormDomain, ReplaceAllFn, SetCompletedFn, UpdateContentFn, UpdateFieldFn,
};
use crate::utils::retry::{poll_until, retry_with_policy, Backoff, RetryPolicy};
use quill_common::config::BridgeSettings;
use quill_common::time::millis_to_duration;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Update shape chosen for a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdatePath {
    /// Whole record written by `replace_all`
    FullReplace,
    /// `update_content` plus `set_completed`
    Compound,
    /// One `update_field` call per field
    PerField,
}

/// Update handles selected from a capability record
#[derive(Clone)]
pub enum UpdatePlan {
    FullReplace {
        replace_all: ReplaceAllFn,
    },
    Compound {
        update_content: UpdateContentFn,
        set_completed: Option<SetCompletedFn>,
        /// Fallback for the completion flag when `set_completed` is absent
        update_field: Option<UpdateFieldFn>,
    },
    PerField {
        update_field: UpdateFieldFn,
    },
}

impl UpdatePlan {
    /// Pick the preferred update shape, or None without any update handle
    pub fn from_record(record: &CapabilityRecord) -> Option<Self> {
        if let Some(replace_all) = &record.replace_all {
            return Some(UpdatePlan::FullReplace {
                replace_all: Arc::clone(replace_all),
            });
        }

        if let Some(update_content) = &record.update_content {
            return Some(UpdatePlan::Compound {
                update_content: Arc::clone(update_content),
                set_completed: record.set_completed.clone(),
                update_field: record.update_field.clone(),
            });
        }

        record.update_field.as_ref().map(|update_field| UpdatePlan::PerField {
            update_field: Arc::clone(update_field),
        })
    }

    pub fn path(&self) -> UpdatePath {
        match self {
            UpdatePlan::FullReplace { .. } => UpdatePath::FullReplace,
            UpdatePlan::Compound { .. } => UpdatePath::Compound,
            UpdatePlan::PerField { .. } => UpdatePath::PerField,
        }
    }
}

impl std::fmt::Debug for UpdatePlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("UpdatePlan").field(&self.path()).finish()
    }
}

/// Timing policy for readiness polling and capability resolution
#[derive(Debug, Clone, PartialEq)]
pub struct AccessorPolicy {
    pub readiness_wait: Duration,
    pub readiness_backoff: Backoff,
    pub resolution: RetryPolicy,
}

impl AccessorPolicy {
    pub fn from_settings(settings: &BridgeSettings) -> Self {
        Self {
            readiness_wait: millis_to_duration(settings.hydration_wait_ms),
            readiness_backoff: Backoff::Exponential {
                initial: millis_to_duration(settings.hydration_initial_backoff_ms),
                factor: settings.hydration_backoff_factor,
                cap: millis_to_duration(settings.hydration_max_backoff_ms),
            },
            resolution: RetryPolicy::new(
                settings.resolve_attempts,
                Backoff::Linear {
                    base: millis_to_duration(settings.resolve_spacing_ms),
                    step: millis_to_duration(settings.resolve_spacing_step_ms),
                },
            ),
        }
    }
}

impl Default for AccessorPolicy {
    fn default() -> Self {
        Self::from_settings(&BridgeSettings::default())
    }
}

#[derive(Debug, Error)]
#[error("no essential update capability (available: {available:?})")]
struct MissingEssential {
    available: Vec<&'static str>,
}

/// Resolves capabilities on a (possibly hydrating) Form domain
pub struct DestinationAccessor {
    form: Arc<dyn FormDomain>,
    policy: AccessorPolicy,
}

impl DestinationAccessor {
    pub fn new(form: Arc<dyn FormDomain>, policy: AccessorPolicy) -> Self {
        Self { form, policy }
    }

    pub fn policy(&self) -> &AccessorPolicy {
        &self.policy
    }

    pub fn form(&self) -> Arc<dyn FormDomain> {
        Arc::clone(&self.form)
    }

    /// Wait up to the configured hydration wait for the Form domain
    pub async fn await_readiness(&self) -> bool {
        self.await_readiness_within(self.policy.readiness_wait).await
    }

    /// Wait up to `max_wait` for the hydration flag or an essential update function
    pub async fn await_readiness_within(&self, max_wait: Duration) -> bool {
        let ready = poll_until("form_readiness", max_wait, &self.policy.readiness_backoff, || {
            self.probe_hydrated() || self.probe_capabilities().has_essential()
        })
        .await;

        if !ready {
            warn!(
                max_wait_ms = max_wait.as_millis() as u64,
                "Form domain not ready within hydration wait"
            );
        }
        ready
    }

    /// Resolve the currently callable handles, retrying until an essential one appears
    ///
    /// Returns an empty record once attempts are exhausted.
    pub async fn resolve_capabilities(&self) -> CapabilityRecord {
        let report = retry_with_policy("resolve_capabilities", &self.policy.resolution, |attempt| {
            let record = self.probe_capabilities();
            async move {
                debug!(attempt, available = ?record.available(), "Capability probe");
                if record.has_essential() {
                    Ok(record)
                } else {
                    Err(MissingEssential {
                        available: record.available(),
                    })
                }
            }
        })
        .await;

        match report.result {
            Ok(record) => record,
            Err(e) => {
                warn!(attempts = report.attempts, "Capability resolution failed: {}", e);
                CapabilityRecord::empty()
            }
        }
    }

    fn probe_hydrated(&self) -> bool {
        catch_unwind(AssertUnwindSafe(|| self.form.is_hydrated())).unwrap_or(false)
    }

    fn probe_capabilities(&self) -> CapabilityRecord {
        catch_unwind(AssertUnwindSafe(|| self.form.capabilities())).unwrap_or_else(|_| {
            warn!("Form domain panicked while exposing capabilities");
            CapabilityRecord::empty()
        })
    }
}
