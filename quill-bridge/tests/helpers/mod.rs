//! Shared fixtures for bridge integration tests

#![allow(dead_code)]

use quill_bridge::domains::{CapabilityRecord, FieldValue, FormDomain, FormField, FormSnapshot};
use quill_bridge::memory::{CapabilityMask, InMemoryEditor, InMemoryForm};
use quill_bridge::models::{Container, ParagraphBlock};
use quill_bridge::{CoordinatorState, EditorDomain, TransferCoordinator};
use quill_common::config::BridgeSettings;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Document assembled from [`sample_editor`]
pub const SAMPLE_DOCUMENT: &str =
    "## Intro\n\nOpening line.\n\n## Body\n\nFirst body paragraph.\n\nSecond body paragraph.";

/// Defaults with short delays so tests do not wait on production timings
pub fn fast_settings() -> BridgeSettings {
    BridgeSettings {
        cooldown_ms: 0,
        max_retry_attempts: 3,
        retry_delay_ms: 10,
        hydration_wait_ms: 200,
        hydration_initial_backoff_ms: 5,
        hydration_backoff_factor: 1.5,
        hydration_max_backoff_ms: 20,
        resolve_attempts: 3,
        resolve_spacing_ms: 5,
        resolve_spacing_step_ms: 5,
        ..BridgeSettings::default()
    }
}

/// Two containers (declared out of order), three assigned paragraphs, one loose
pub fn sample_editor() -> Arc<InMemoryEditor> {
    Arc::new(InMemoryEditor::new(
        vec![
            Container::new("c-body", "Body", 1),
            Container::new("c-intro", "Intro", 0),
        ],
        vec![
            ParagraphBlock::new("p2", "Second body paragraph.", Some("c-body"), 1),
            ParagraphBlock::new("p1", "Opening line.", Some("c-intro"), 0),
            ParagraphBlock::new("p3", "First body paragraph.", Some("c-body"), 0),
            ParagraphBlock::new("p4", "Loose idea", None, 0),
        ],
    ))
}

/// Editor whose cached document is `document`
pub fn cached_editor(document: &str) -> Arc<InMemoryEditor> {
    let editor = InMemoryEditor::new(Vec::new(), Vec::new());
    editor.set_cached_document(document);
    Arc::new(editor)
}

pub fn masked_form(mask: CapabilityMask) -> Arc<InMemoryForm> {
    Arc::new(InMemoryForm::with_mask(mask))
}

/// Coordinator with its own state built from `settings`
pub fn coordinator(
    settings: &BridgeSettings,
    editor: Arc<dyn EditorDomain>,
    form: Arc<dyn FormDomain>,
) -> TransferCoordinator {
    TransferCoordinator::new(settings, CoordinatorState::from_settings(settings), editor, form)
        .expect("valid settings")
}

/// Form whose `replace_all` fails a fixed number of times before succeeding
pub struct FlakyForm {
    pub inner: InMemoryForm,
    failures_left: Arc<AtomicU32>,
}

impl FlakyForm {
    pub fn failing(times: u32) -> Self {
        Self {
            inner: InMemoryForm::new(),
            failures_left: Arc::new(AtomicU32::new(times)),
        }
    }

    pub fn always_failing() -> Self {
        Self::failing(u32::MAX)
    }
}

impl FormDomain for FlakyForm {
    fn is_hydrated(&self) -> bool {
        true
    }

    fn capabilities(&self) -> CapabilityRecord {
        let mut record = self.inner.capabilities();
        if let Some(replace_all) = record.replace_all.take() {
            let failures_left = Arc::clone(&self.failures_left);
            record.replace_all = Some(Arc::new(move |snapshot: FormSnapshot| -> anyhow::Result<()> {
                let remaining = failures_left.load(Ordering::SeqCst);
                if remaining > 0 {
                    failures_left.store(remaining - 1, Ordering::SeqCst);
                    anyhow::bail!("store not accepting writes");
                }
                replace_all(snapshot)
            }));
        }
        record
    }
}

/// Form that accepts every write but always reads back `readback`
pub struct FixedReadbackForm {
    pub inner: InMemoryForm,
    readback: FormSnapshot,
}

impl FixedReadbackForm {
    pub fn new(readback: FormSnapshot) -> Self {
        Self {
            inner: InMemoryForm::new(),
            readback,
        }
    }
}

impl FormDomain for FixedReadbackForm {
    fn is_hydrated(&self) -> bool {
        true
    }

    fn capabilities(&self) -> CapabilityRecord {
        let mut record = self.inner.capabilities();
        let readback = self.readback.clone();
        record.read_snapshot = Some(Arc::new(move || -> anyhow::Result<FormSnapshot> {
            Ok(readback.clone())
        }));
        record
    }
}

/// Form whose only update handle panics
pub struct PanickingForm;

impl FormDomain for PanickingForm {
    fn is_hydrated(&self) -> bool {
        true
    }

    fn capabilities(&self) -> CapabilityRecord {
        CapabilityRecord {
            update_field: Some(Arc::new(|_: FormField, _: FieldValue| -> anyhow::Result<()> {
                panic!("reducer exploded")
            })),
            ..CapabilityRecord::empty()
        }
    }
}
