//! Source Extractor
//!
//! Reads the Editor domain into an [`ExtractedEditorData`] snapshot. Never
//! fails loudly: any read error (or a panic inside the editor store) yields
//! `None`, which the coordinator reports as upstream unavailable.

use crate::domains::EditorDomain;
use crate::models::{ContentCounts, ExtractedEditorData, ParagraphBlock};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

/// Snapshot the Editor domain
pub fn extract(editor: &dyn EditorDomain) -> Option<ExtractedEditorData> {
    match catch_unwind(AssertUnwindSafe(|| read_editor(editor))) {
        Ok(Ok(data)) => {
            debug!(
                containers = data.counts.containers,
                paragraphs = data.counts.paragraphs,
                assigned = data.counts.assigned,
                unassigned = data.counts.unassigned,
                content_length = data.counts.total_content_length,
                cached = !data.cached_content.is_empty(),
                "Editor data extracted"
            );
            Some(data)
        }
        Ok(Err(e)) => {
            warn!("Editor domain unreadable: {:#}", e);
            None
        }
        Err(_) => {
            warn!("Editor domain panicked during read");
            None
        }
    }
}

fn read_editor(editor: &dyn EditorDomain) -> anyhow::Result<ExtractedEditorData> {
    let containers = editor.containers()?;
    let paragraphs = editor.paragraphs()?;
    let cached_content = editor.cached_document()?;

    let (assigned_paragraphs, unassigned): (Vec<ParagraphBlock>, Vec<ParagraphBlock>) =
        paragraphs.iter().cloned().partition(ParagraphBlock::is_assigned);

    let total_content_length = assigned_paragraphs
        .iter()
        .map(|p| p.content.trim().chars().count())
        .sum();

    let counts = ContentCounts {
        containers: containers.len(),
        paragraphs: paragraphs.len(),
        assigned: assigned_paragraphs.len(),
        unassigned: unassigned.len(),
        total_content_length,
    };

    Ok(ExtractedEditorData {
        containers,
        paragraphs,
        assigned_paragraphs,
        counts,
        cached_content,
    })
}
