//! Document Assembler
//!
//! Flattens extracted editor data into one markdown document. Pure: output
//! depends only on the input snapshot.
//!
//! # Layout
//! ```text
//! ## <container name>
//!
//! <paragraph>
//!
//! <paragraph>
//!
//! ## <next container name>
//! ...
//! ```
//! - Containers ordered by `order` (stable, ties keep editor order)
//! - Paragraphs ordered by `order` within their container (stable)
//! - Containers without assigned paragraphs are skipped
//! - Paragraphs whose container does not exist are dropped

use crate::models::{ExtractedEditorData, ParagraphBlock};

/// Heading marker emitted before each container name
pub const HEADING_PREFIX: &str = "## ";

/// Assemble the document, preferring a non-empty cached canonical document
pub fn assemble(data: &ExtractedEditorData) -> String {
    if !data.cached_content.is_empty() {
        return data.cached_content.clone();
    }
    assemble_fresh(data)
}

/// Assemble from containers and paragraphs, ignoring any cached document
pub fn assemble_fresh(data: &ExtractedEditorData) -> String {
    let mut containers: Vec<_> = data.containers.iter().collect();
    containers.sort_by_key(|c| c.order);

    let sections: Vec<String> = containers
        .into_iter()
        .filter_map(|container| {
            let mut paragraphs: Vec<&ParagraphBlock> = data
                .assigned_paragraphs
                .iter()
                .filter(|p| p.container_id.as_deref() == Some(container.id.as_str()))
                .filter(|p| !p.content.trim().is_empty())
                .collect();

            if paragraphs.is_empty() {
                return None;
            }
            paragraphs.sort_by_key(|p| p.order);

            let body = paragraphs
                .iter()
                .map(|p| p.content.trim())
                .collect::<Vec<_>>()
                .join("\n\n");

            Some(format!("{}{}\n\n{}", HEADING_PREFIX, container.name, body))
        })
        .collect();

    sections.join("\n\n").trim_end().to_string()
}
