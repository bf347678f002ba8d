//! Editor and Form domain contracts
//!
//! The bridge reads from an **Editor domain** (containers + paragraphs) and
//! writes into a **Form domain** (the submission record). Both live in the host
//! application; the bridge only sees these traits.
//!
//! The Form domain may still be hydrating when a transfer starts, so its update
//! functions are exposed as a [`CapabilityRecord`] of optional handles that is
//! re-read on demand rather than as fixed trait methods.

use crate::models::{Container, ParagraphBlock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Upstream authoring state
pub trait EditorDomain: Send + Sync {
    /// Containers in editor order
    fn containers(&self) -> anyhow::Result<Vec<Container>>;

    /// All paragraph blocks, assigned or not
    fn paragraphs(&self) -> anyhow::Result<Vec<ParagraphBlock>>;

    /// Canonical document already produced by the editor (may be empty)
    fn cached_document(&self) -> anyhow::Result<String>;
}

/// Downstream submission state
pub trait FormDomain: Send + Sync {
    /// Explicit readiness flag set once the store finished initializing
    fn is_hydrated(&self) -> bool;

    /// Handles that are callable right now
    fn capabilities(&self) -> CapabilityRecord;
}

/// Fields of the Form domain the bridge writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormField {
    Content,
    IsCompleted,
}

impl FormField {
    /// Every field a transfer targets
    pub const ALL: [FormField; 2] = [FormField::Content, FormField::IsCompleted];
}

/// Value written to a single form field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
}

/// Form record as read back from (or written wholesale into) the Form domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSnapshot {
    pub content: String,
    pub is_completed: bool,
}

pub type UpdateFieldFn = Arc<dyn Fn(FormField, FieldValue) -> anyhow::Result<()> + Send + Sync>;
pub type UpdateContentFn = Arc<dyn Fn(String) -> anyhow::Result<()> + Send + Sync>;
pub type SetCompletedFn = Arc<dyn Fn(bool) -> anyhow::Result<()> + Send + Sync>;
pub type ReplaceAllFn = Arc<dyn Fn(FormSnapshot) -> anyhow::Result<()> + Send + Sync>;
pub type ReadSnapshotFn = Arc<dyn Fn() -> anyhow::Result<FormSnapshot> + Send + Sync>;

/// Update/read handles resolved from the Form domain; any subset may be absent
#[derive(Clone, Default)]
pub struct CapabilityRecord {
    pub update_field: Option<UpdateFieldFn>,
    pub update_content: Option<UpdateContentFn>,
    pub set_completed: Option<SetCompletedFn>,
    pub replace_all: Option<ReplaceAllFn>,
    pub read_snapshot: Option<ReadSnapshotFn>,
}

impl CapabilityRecord {
    /// Record with every handle absent
    pub fn empty() -> Self {
        Self::default()
    }

    /// `update_field` or `update_content` present
    pub fn has_essential(&self) -> bool {
        self.update_field.is_some() || self.update_content.is_some()
    }

    /// No handle present at all
    pub fn is_empty(&self) -> bool {
        self.update_field.is_none()
            && self.update_content.is_none()
            && self.set_completed.is_none()
            && self.replace_all.is_none()
            && self.read_snapshot.is_none()
    }

    /// Names of the handles present, for logging
    pub fn available(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.update_field.is_some() {
            names.push("update_field");
        }
        if self.update_content.is_some() {
            names.push("update_content");
        }
        if self.set_completed.is_some() {
            names.push("set_completed");
        }
        if self.replace_all.is_some() {
            names.push("replace_all");
        }
        if self.read_snapshot.is_some() {
            names.push("read_snapshot");
        }
        names
    }
}

impl fmt::Debug for CapabilityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRecord")
            .field("available", &self.available())
            .finish()
    }
}
