//! # Quill Bridge
//!
//! Moves the content of a block-structured editor (ordered containers holding
//! paragraph blocks) into a flat form record, one guarded transfer at a time.
//!
//! **Pipeline:**
//! 1. [`extractor::extract`] snapshots the Editor domain
//! 2. [`assembler::assemble`] flattens it into a heading-separated document
//! 3. [`accessor::DestinationAccessor`] waits for the Form domain to hydrate and
//!    resolves its update functions
//! 4. [`coordinator::TransferCoordinator`] applies the document under a
//!    process-wide lock with cooldown, retries failed updates, reads the form
//!    back and scores it with [`scorer::ValidationScorer`]
//!
//! Every request returns a [`TransferOutcome`]; hosts that want live
//! notifications subscribe to a [`events::TransferEventBus`].

pub mod accessor;
pub mod assembler;
pub mod coordinator;
pub mod domains;
pub mod events;
pub mod extractor;
pub mod memory;
pub mod models;
pub mod scorer;
pub mod statistics;
pub mod utils;

pub use accessor::{AccessorPolicy, DestinationAccessor, UpdatePath, UpdatePlan};
pub use coordinator::{
    CoordinatorState, MutexStatus, TransferCategory, TransferCoordinator, TransferOutcome,
};
pub use domains::{CapabilityRecord, EditorDomain, FieldValue, FormDomain, FormField, FormSnapshot};
pub use events::{TransferEvent, TransferEventBus};
pub use models::{Container, ContentCounts, ExtractedEditorData, ParagraphBlock};
pub use scorer::ValidationScorer;
pub use statistics::Statistics;
