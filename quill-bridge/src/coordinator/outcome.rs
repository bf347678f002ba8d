//! Transfer outcome and failure taxonomy

use crate::accessor::UpdatePath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Outcome category of a transfer request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferCategory {
    /// Document written and validated
    Transferred,
    /// Validated, but not every targeted field could be written
    PartialUpdate,
    /// Editor domain unreadable
    UpstreamUnavailable,
    /// No update capability resolvable on the Form domain
    DownstreamUnavailable,
    /// Read-back score under the pass threshold
    ValidationBelowThreshold,
    /// No read-back available; score defaults to 0
    ValidationUnverifiable,
    /// Another transfer holds the lock
    MutexBusy,
    /// Previous transfer ended less than `cooldown_ms` ago
    CooldownActive,
    /// Update calls kept failing or panicking
    InternalException,
}

impl TransferCategory {
    /// Rejected at acquisition, never executed
    pub fn is_rejection(self) -> bool {
        matches!(self, TransferCategory::MutexBusy | TransferCategory::CooldownActive)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransferCategory::Transferred => "TRANSFERRED",
            TransferCategory::PartialUpdate => "PARTIAL_UPDATE",
            TransferCategory::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            TransferCategory::DownstreamUnavailable => "DOWNSTREAM_UNAVAILABLE",
            TransferCategory::ValidationBelowThreshold => "VALIDATION_BELOW_THRESHOLD",
            TransferCategory::ValidationUnverifiable => "VALIDATION_UNVERIFIABLE",
            TransferCategory::MutexBusy => "MUTEX_BUSY",
            TransferCategory::CooldownActive => "COOLDOWN_ACTIVE",
            TransferCategory::InternalException => "INTERNAL_EXCEPTION",
        }
    }
}

impl fmt::Display for TransferCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one `request_transfer()` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOutcome {
    pub success: bool,
    /// Validation score 0-100 (0 when never validated)
    pub score: u8,
    pub category: TransferCategory,
    /// Apply attempts beyond the first
    pub retry_count: u32,
    pub duration_ms: u64,
    /// None for requests rejected before acquiring the lock
    pub operation_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
    /// Human-readable detail for failures and partial updates
    pub diagnostic: Option<String>,
    pub update_path: Option<UpdatePath>,
    pub partial_update: bool,
}

impl TransferOutcome {
    /// Outcome for a request turned away at acquisition
    pub fn rejected(category: TransferCategory, diagnostic: String) -> Self {
        Self {
            success: false,
            score: 0,
            category,
            retry_count: 0,
            duration_ms: 0,
            operation_id: None,
            timestamp: quill_common::time::now(),
            diagnostic: Some(diagnostic),
            update_path: None,
            partial_update: false,
        }
    }
}

/// Failure that aborts execution before validation
#[derive(Debug, Error)]
pub enum TransferFailure {
    #[error("editor domain unavailable")]
    UpstreamUnavailable,

    #[error("no update capability on form domain after {attempts} resolution attempts")]
    DownstreamUnavailable { attempts: u32 },

    #[error("form update failed after {attempts} attempts: {source:#}")]
    UpdateFailed {
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },
}

impl TransferFailure {
    pub fn category(&self) -> TransferCategory {
        match self {
            TransferFailure::UpstreamUnavailable => TransferCategory::UpstreamUnavailable,
            TransferFailure::DownstreamUnavailable { .. } => TransferCategory::DownstreamUnavailable,
            TransferFailure::UpdateFailed { .. } => TransferCategory::InternalException,
        }
    }
}
