//! Applying an assembled document to the Form domain
//!
//! Capability handles belong to the host and may fail or panic; every call goes
//! through [`invoke`] so both surface as errors the coordinator can retry.

use crate::accessor::{UpdatePath, UpdatePlan};
use crate::domains::{FieldValue, FormField, FormSnapshot};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Fields written by one apply step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    pub path: UpdatePath,
    pub fields_updated: Vec<FormField>,
}

impl ApplyReport {
    /// Some targeted field had no handle to write it
    pub fn is_partial(&self) -> bool {
        self.fields_updated.len() < FormField::ALL.len()
    }

    pub fn missing_fields(&self) -> Vec<FormField> {
        FormField::ALL
            .into_iter()
            .filter(|field| !self.fields_updated.contains(field))
            .collect()
    }
}

/// Write `document` and the completion flag using the chosen plan
pub fn apply_plan(plan: &UpdatePlan, document: &str, completed: bool) -> anyhow::Result<ApplyReport> {
    let mut fields_updated = Vec::with_capacity(FormField::ALL.len());

    match plan {
        UpdatePlan::FullReplace { replace_all } => {
            let snapshot = FormSnapshot {
                content: document.to_string(),
                is_completed: completed,
            };
            invoke("replace_all", || replace_all(snapshot))?;
            fields_updated.extend(FormField::ALL);
        }
        UpdatePlan::Compound {
            update_content,
            set_completed,
            update_field,
        } => {
            invoke("update_content", || update_content(document.to_string()))?;
            fields_updated.push(FormField::Content);

            if let Some(set_completed) = set_completed {
                invoke("set_completed", || set_completed(completed))?;
                fields_updated.push(FormField::IsCompleted);
            } else if let Some(update_field) = update_field {
                invoke("update_field", || {
                    update_field(FormField::IsCompleted, FieldValue::Flag(completed))
                })?;
                fields_updated.push(FormField::IsCompleted);
            }
        }
        UpdatePlan::PerField { update_field } => {
            invoke("update_field", || {
                update_field(FormField::Content, FieldValue::Text(document.to_string()))
            })?;
            fields_updated.push(FormField::Content);

            invoke("update_field", || {
                update_field(FormField::IsCompleted, FieldValue::Flag(completed))
            })?;
            fields_updated.push(FormField::IsCompleted);
        }
    }

    Ok(ApplyReport {
        path: plan.path(),
        fields_updated,
    })
}

/// Call a host-provided handle, converting a panic into an error
pub fn invoke<T>(name: &str, call: impl FnOnce() -> anyhow::Result<T>) -> anyhow::Result<T> {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result.map_err(|e| e.context(format!("form capability `{}` failed", name))),
        Err(payload) => Err(anyhow::anyhow!(
            "form capability `{}` panicked: {}",
            name,
            panic_message(payload.as_ref())
        )),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
