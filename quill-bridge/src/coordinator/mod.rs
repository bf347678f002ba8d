//! Transfer Coordinator (the bridge)
//!
//! Moves the assembled editor document into the Form domain once per request.
//!
//! # State Progression
//! IDLE → ACQUIRING → EXECUTING → VALIDATING → COOLDOWN → IDLE
//!
//! - **ACQUIRING**: rejected immediately (`MUTEX_BUSY` / `COOLDOWN_ACTIVE`) when
//!   another transfer holds the lock or the cooldown window is still open
//! - **EXECUTING**: extract → assemble → await hydration → resolve capabilities
//!   → apply (retried with linear backoff)
//! - **VALIDATING**: read the form back and score it
//! - **COOLDOWN**: lock released, `last_operation_end` stamped
//!
//! `request_transfer` never fails: every problem becomes a [`TransferOutcome`]
//! with a category and diagnostic.

mod apply;
mod outcome;
mod state;

pub use apply::{apply_plan, invoke, ApplyReport};
pub use outcome::{TransferCategory, TransferFailure, TransferOutcome};
pub use state::{CoordinatorState, MutexState, MutexStatus, OperationLease, Rejection};

use crate::accessor::{AccessorPolicy, DestinationAccessor, UpdatePlan};
use crate::assembler;
use crate::domains::{CapabilityRecord, EditorDomain, FormDomain};
use crate::events::{TransferEvent, TransferEventBus};
use crate::extractor;
use crate::scorer::ValidationScorer;
use crate::statistics::Statistics;
use crate::utils::retry::{retry_with_policy, Backoff, RetryPolicy};
use quill_common::config::BridgeSettings;
use quill_common::time::{duration_to_millis, millis_to_duration};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Result of the VALIDATING step
#[derive(Debug, Clone, PartialEq, Eq)]
enum Validation {
    Scored(u8),
    Unverifiable(String),
}

/// Everything EXECUTING + VALIDATING produced
#[derive(Debug)]
struct Execution {
    validation: Validation,
    retry_count: u32,
    report: ApplyReport,
}

/// Mutex-guarded orchestrator moving the editor document into the form
pub struct TransferCoordinator {
    state: Arc<CoordinatorState>,
    editor: Arc<dyn EditorDomain>,
    accessor: DestinationAccessor,
    scorer: ValidationScorer,
    apply_policy: RetryPolicy,
    pass_threshold: u8,
    tolerant_mode: bool,
    events: Option<TransferEventBus>,
}

impl TransferCoordinator {
    /// Create a coordinator over shared state
    ///
    /// # Arguments
    /// * `settings` - Bridge settings (validated here)
    /// * `state` - Lock + statistics shared by every coordinator of the host
    /// * `editor` - Upstream Editor domain
    /// * `form` - Downstream Form domain
    pub fn new(
        settings: &BridgeSettings,
        state: Arc<CoordinatorState>,
        editor: Arc<dyn EditorDomain>,
        form: Arc<dyn FormDomain>,
    ) -> quill_common::Result<Self> {
        settings.validate()?;

        Ok(Self {
            state,
            editor,
            accessor: DestinationAccessor::new(form, AccessorPolicy::from_settings(settings)),
            scorer: ValidationScorer::new(settings.prefix_check_len),
            apply_policy: RetryPolicy::new(
                settings.max_retry_attempts,
                Backoff::linear(millis_to_duration(settings.retry_delay_ms)),
            ),
            pass_threshold: settings.pass_threshold,
            tolerant_mode: settings.tolerant_mode,
            events: None,
        })
    }

    /// Publish transfer events on `bus`
    pub fn with_event_bus(mut self, bus: TransferEventBus) -> Self {
        self.events = Some(bus);
        self
    }

    /// Replace the accessor timing policy
    pub fn with_accessor_policy(mut self, policy: AccessorPolicy) -> Self {
        self.accessor = DestinationAccessor::new(self.accessor.form(), policy);
        self
    }

    /// Lock view: busy flag and time until the next request is admitted
    pub fn mutex_state(&self) -> MutexStatus {
        self.state.mutex_status()
    }

    /// Copy of the shared statistics
    pub fn statistics(&self) -> Statistics {
        self.state.statistics()
    }

    pub fn state(&self) -> &Arc<CoordinatorState> {
        &self.state
    }

    /// Run one transfer, or reject it immediately
    pub async fn request_transfer(&self) -> TransferOutcome {
        let lease = match self.state.try_acquire() {
            Ok(lease) => lease,
            Err(rejection) => return self.reject(rejection),
        };

        let operation_id = lease.operation_id();
        let started = Instant::now();
        self.emit(TransferEvent::TransferStarted {
            operation_id,
            timestamp: quill_common::time::now(),
        });

        let result = self
            .execute()
            .instrument(info_span!("transfer", %operation_id))
            .await;

        let duration_ms = duration_to_millis(started.elapsed());
        lease.release();

        let outcome = match result {
            Ok(execution) => self.finish(operation_id, duration_ms, execution),
            Err(failure) => self.fail(operation_id, duration_ms, failure),
        };

        self.state.record(&outcome);
        self.emit(TransferEvent::TransferCompleted {
            outcome: outcome.clone(),
        });
        outcome
    }

    /// EXECUTING + VALIDATING
    async fn execute(&self) -> Result<Execution, TransferFailure> {
        let data = extractor::extract(self.editor.as_ref()).ok_or(TransferFailure::UpstreamUnavailable)?;

        let document = assembler::assemble(&data);
        let expected_completed = !document.trim().is_empty();
        debug!(
            document_chars = document.chars().count(),
            from_cache = !data.cached_content.is_empty(),
            "Document assembled"
        );

        if !self.accessor.await_readiness().await {
            debug!("Proceeding to capability resolution without readiness signal");
        }

        let record = self.accessor.resolve_capabilities().await;
        let plan = UpdatePlan::from_record(&record).ok_or(TransferFailure::DownstreamUnavailable {
            attempts: self.accessor.policy().resolution.max_attempts,
        })?;
        debug!(path = ?plan.path(), available = ?record.available(), "Update plan selected");

        let report = retry_with_policy("apply_form_update", &self.apply_policy, |attempt| {
            let result = apply_plan(&plan, &document, expected_completed);
            if let Err(e) = &result {
                warn!(attempt, "Form update attempt failed: {:#}", e);
            }
            async move { result }
        })
        .await;

        let retry_count = report.retries();
        let attempts = report.attempts;
        let applied = report
            .result
            .map_err(|source| TransferFailure::UpdateFailed { attempts, source })?;

        let validation = self.validate(&record, &document, expected_completed);

        Ok(Execution {
            validation,
            retry_count,
            report: applied,
        })
    }

    /// Score a fresh read-back of the Form domain
    fn validate(&self, record: &CapabilityRecord, document: &str, expected_completed: bool) -> Validation {
        let Some(read_snapshot) = &record.read_snapshot else {
            return Validation::Unverifiable("form domain exposes no read_snapshot".to_string());
        };

        match invoke("read_snapshot", || read_snapshot()) {
            Ok(snapshot) => Validation::Scored(self.scorer.score(document, expected_completed, &snapshot)),
            Err(e) => Validation::Unverifiable(format!("read-back failed: {:#}", e)),
        }
    }

    fn finish(&self, operation_id: Uuid, duration_ms: u64, execution: Execution) -> TransferOutcome {
        let Execution {
            validation,
            retry_count,
            report,
        } = execution;

        let partial_update = report.is_partial();
        let (score, passed) = match &validation {
            Validation::Scored(score) => (*score, *score >= self.pass_threshold),
            Validation::Unverifiable(_) => (0, false),
        };
        let success = passed || self.tolerant_mode;

        let (category, diagnostic) = match validation {
            Validation::Unverifiable(reason) => (TransferCategory::ValidationUnverifiable, Some(reason)),
            Validation::Scored(score) if !passed => (
                TransferCategory::ValidationBelowThreshold,
                Some(format!(
                    "validation score {} below threshold {}",
                    score, self.pass_threshold
                )),
            ),
            Validation::Scored(_) if partial_update => (
                TransferCategory::PartialUpdate,
                Some(format!(
                    "updated {} of {} fields, missing {:?}",
                    report.fields_updated.len(),
                    report.fields_updated.len() + report.missing_fields().len(),
                    report.missing_fields()
                )),
            ),
            Validation::Scored(_) => (TransferCategory::Transferred, None),
        };

        if success {
            info!(
                %operation_id,
                score,
                %category,
                retry_count,
                duration_ms,
                tolerant = self.tolerant_mode,
                "Transfer complete"
            );
        } else {
            warn!(%operation_id, score, %category, retry_count, duration_ms, "Transfer failed validation");
        }

        TransferOutcome {
            success,
            score,
            category,
            retry_count,
            duration_ms,
            operation_id: Some(operation_id),
            timestamp: quill_common::time::now(),
            diagnostic,
            update_path: Some(report.path),
            partial_update,
        }
    }

    fn fail(&self, operation_id: Uuid, duration_ms: u64, failure: TransferFailure) -> TransferOutcome {
        let category = failure.category();
        let retry_count = match &failure {
            TransferFailure::UpdateFailed { attempts, .. } => attempts.saturating_sub(1),
            _ => 0,
        };
        warn!(%operation_id, %category, duration_ms, "Transfer aborted: {}", failure);

        TransferOutcome {
            success: false,
            score: 0,
            category,
            retry_count,
            duration_ms,
            operation_id: Some(operation_id),
            timestamp: quill_common::time::now(),
            diagnostic: Some(failure.to_string()),
            update_path: None,
            partial_update: false,
        }
    }

    fn reject(&self, rejection: Rejection) -> TransferOutcome {
        let category = rejection.category();
        let status = self.state.mutex_status();
        debug!(%category, ms_until_next_allowed = status.ms_until_next_allowed, "Transfer rejected");

        let outcome = TransferOutcome::rejected(category, rejection.diagnostic());
        self.state.record(&outcome);
        self.emit(TransferEvent::TransferRejected {
            category,
            ms_until_next_allowed: status.ms_until_next_allowed,
            timestamp: outcome.timestamp,
        });
        outcome
    }

    fn emit(&self, event: TransferEvent) {
        if let Some(bus) = &self.events {
            if bus.emit(event).is_err() {
                debug!("No subscribers for transfer event");
            }
        }
    }
}
