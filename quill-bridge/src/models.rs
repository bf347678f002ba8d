//! Editor domain data model
//!
//! Containers are named, ordered sections; paragraph blocks are the authoring
//! units placed into them. A paragraph is **assigned** when it names a
//! container and has non-blank content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Named, ordered section of the post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: String,
    pub name: String,
    pub order: i64,
    pub created_at: DateTime<Utc>,
}

impl Container {
    pub fn new(id: impl Into<String>, name: impl Into<String>, order: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            order,
            created_at: quill_common::time::now(),
        }
    }
}

/// Authoring unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphBlock {
    pub id: String,
    pub content: String,
    /// Owning container (None = not yet placed)
    pub container_id: Option<String>,
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Source paragraph when this block is a copy
    pub original_id: Option<String>,
}

impl ParagraphBlock {
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        container_id: Option<&str>,
        order: i64,
    ) -> Self {
        let now = quill_common::time::now();
        Self {
            id: id.into(),
            content: content.into(),
            container_id: container_id.map(str::to_string),
            order,
            created_at: now,
            updated_at: now,
            original_id: None,
        }
    }

    /// Placed in a container and carrying non-blank content
    pub fn is_assigned(&self) -> bool {
        self.container_id.is_some() && !self.content.trim().is_empty()
    }
}

/// Summary counts computed during extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentCounts {
    pub containers: usize,
    pub paragraphs: usize,
    pub assigned: usize,
    pub unassigned: usize,
    /// Characters across assigned paragraphs' trimmed content
    pub total_content_length: usize,
}

/// Snapshot of the Editor domain taken for one transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedEditorData {
    pub containers: Vec<Container>,
    pub paragraphs: Vec<ParagraphBlock>,
    pub assigned_paragraphs: Vec<ParagraphBlock>,
    pub counts: ContentCounts,
    /// Canonical document already produced by the editor (may be empty)
    pub cached_content: String,
}
