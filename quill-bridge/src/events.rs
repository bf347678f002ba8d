//! Transfer events
//!
//! The bridge never renders anything. Hosts that show toasts or banners
//! subscribe to the [`TransferEventBus`] and react to the structured events.

use crate::coordinator::{TransferCategory, TransferOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events emitted by the transfer coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum TransferEvent {
    /// Lock acquired, execution starting
    TransferStarted {
        operation_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Request turned away by the lock or cooldown
    TransferRejected {
        category: TransferCategory,
        ms_until_next_allowed: u64,
        timestamp: DateTime<Utc>,
    },

    /// Execution finished (successfully or not)
    TransferCompleted { outcome: TransferOutcome },
}

/// Broadcast channel for [`TransferEvent`]s
#[derive(Debug, Clone)]
pub struct TransferEventBus {
    tx: broadcast::Sender<TransferEvent>,
}

impl TransferEventBus {
    /// Creates a new bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<TransferEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)`, or `Err` when nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: TransferEvent,
    ) -> Result<usize, broadcast::error::SendError<TransferEvent>> {
        self.tx.send(event)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
