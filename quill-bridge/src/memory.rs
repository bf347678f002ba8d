//! In-memory Editor and Form domains
//!
//! Reference implementations of [`EditorDomain`] and [`FormDomain`] for hosts
//! without a reactive store, and for tests. [`InMemoryForm`] can simulate lazy
//! hydration and expose any subset of its update functions.

use crate::domains::{
    CapabilityRecord, EditorDomain, FieldValue, FormDomain, FormField, FormSnapshot,
};
use crate::models::{Container, ParagraphBlock};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;

/// Editor domain held in memory
#[derive(Debug, Default)]
pub struct InMemoryEditor {
    containers: RwLock<Vec<Container>>,
    paragraphs: RwLock<Vec<ParagraphBlock>>,
    cached_document: RwLock<String>,
    unavailable: AtomicBool,
}

impl InMemoryEditor {
    pub fn new(containers: Vec<Container>, paragraphs: Vec<ParagraphBlock>) -> Self {
        Self {
            containers: RwLock::new(containers),
            paragraphs: RwLock::new(paragraphs),
            ..Self::default()
        }
    }

    pub fn set_cached_document(&self, document: impl Into<String>) {
        *self.cached_document.write().unwrap_or_else(PoisonError::into_inner) = document.into();
    }

    pub fn push_paragraph(&self, paragraph: ParagraphBlock) {
        self.paragraphs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(paragraph);
    }

    /// Make every read fail (simulates an unmounted store)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> anyhow::Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            anyhow::bail!("editor store unavailable");
        }
        Ok(())
    }
}

impl EditorDomain for InMemoryEditor {
    fn containers(&self) -> anyhow::Result<Vec<Container>> {
        self.check_available()?;
        Ok(self.containers.read().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn paragraphs(&self) -> anyhow::Result<Vec<ParagraphBlock>> {
        self.check_available()?;
        Ok(self.paragraphs.read().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn cached_document(&self) -> anyhow::Result<String> {
        self.check_available()?;
        Ok(self.cached_document.read().unwrap_or_else(PoisonError::into_inner).clone())
    }
}

/// Which handles an [`InMemoryForm`] exposes once hydrated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityMask {
    pub update_field: bool,
    pub update_content: bool,
    pub set_completed: bool,
    pub replace_all: bool,
    pub read_snapshot: bool,
}

impl CapabilityMask {
    pub fn all() -> Self {
        Self {
            update_field: true,
            update_content: true,
            set_completed: true,
            replace_all: true,
            read_snapshot: true,
        }
    }

    pub fn none() -> Self {
        Self {
            update_field: false,
            update_content: false,
            set_completed: false,
            replace_all: false,
            read_snapshot: false,
        }
    }
}

impl Default for CapabilityMask {
    fn default() -> Self {
        Self::all()
    }
}

/// Form domain held in memory
#[derive(Debug)]
pub struct InMemoryForm {
    state: Arc<Mutex<FormSnapshot>>,
    mask: CapabilityMask,
    hydrated_at: Mutex<Option<Instant>>,
    writes: Arc<AtomicUsize>,
}

impl Default for InMemoryForm {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryForm {
    /// Hydrated form exposing every handle
    pub fn new() -> Self {
        Self::with_mask(CapabilityMask::all())
    }

    /// Hydrated form exposing only the masked handles
    pub fn with_mask(mask: CapabilityMask) -> Self {
        Self {
            state: Arc::new(Mutex::new(FormSnapshot::default())),
            mask,
            hydrated_at: Mutex::new(None),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Form that exposes nothing until `delay` has elapsed
    pub fn hydrating_for(delay: Duration) -> Self {
        let form = Self::new();
        *form.hydrated_at.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now() + delay);
        form
    }

    /// Finish hydration immediately
    pub fn mark_hydrated(&self) {
        *self.hydrated_at.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Current record
    pub fn snapshot(&self) -> FormSnapshot {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of successful write calls across all handles
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Overwrite the record directly (simulates another writer)
    pub fn set_snapshot(&self, snapshot: FormSnapshot) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }
}

impl FormDomain for InMemoryForm {
    fn is_hydrated(&self) -> bool {
        match *self.hydrated_at.lock().unwrap_or_else(PoisonError::into_inner) {
            Some(at) => Instant::now() >= at,
            None => true,
        }
    }

    fn capabilities(&self) -> CapabilityRecord {
        if !self.is_hydrated() {
            return CapabilityRecord::empty();
        }

        let mut record = CapabilityRecord::empty();

        if self.mask.update_field {
            let state = Arc::clone(&self.state);
            let writes = Arc::clone(&self.writes);
            record.update_field = Some(Arc::new(move |field: FormField, value: FieldValue| -> anyhow::Result<()> {
                let mut form = state.lock().unwrap_or_else(PoisonError::into_inner);
                match (field, value) {
                    (FormField::Content, FieldValue::Text(text)) => form.content = text,
                    (FormField::IsCompleted, FieldValue::Flag(flag)) => form.is_completed = flag,
                    (field, value) => {
                        anyhow::bail!("field {:?} cannot hold value {:?}", field, value)
                    }
                }
                writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
        }

        if self.mask.update_content {
            let state = Arc::clone(&self.state);
            let writes = Arc::clone(&self.writes);
            record.update_content = Some(Arc::new(move |content: String| -> anyhow::Result<()> {
                state.lock().unwrap_or_else(PoisonError::into_inner).content = content;
                writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
        }

        if self.mask.set_completed {
            let state = Arc::clone(&self.state);
            let writes = Arc::clone(&self.writes);
            record.set_completed = Some(Arc::new(move |flag: bool| -> anyhow::Result<()> {
                state.lock().unwrap_or_else(PoisonError::into_inner).is_completed = flag;
                writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
        }

        if self.mask.replace_all {
            let state = Arc::clone(&self.state);
            let writes = Arc::clone(&self.writes);
            record.replace_all = Some(Arc::new(move |snapshot: FormSnapshot| -> anyhow::Result<()> {
                *state.lock().unwrap_or_else(PoisonError::into_inner) = snapshot;
                writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
        }

        if self.mask.read_snapshot {
            let state = Arc::clone(&self.state);
            record.read_snapshot = Some(Arc::new(move || -> anyhow::Result<FormSnapshot> {
                Ok(state.lock().unwrap_or_else(PoisonError::into_inner).clone())
            }));
        }

        record
    }
}
