//! End-to-end transfer tests against in-memory domains

mod helpers;

use helpers::*;
use quill_bridge::domains::FormSnapshot;
use quill_bridge::memory::{CapabilityMask, InMemoryEditor, InMemoryForm};
use quill_bridge::{TransferCategory, TransferEvent, TransferEventBus, UpdatePath};
use quill_common::config::BridgeSettings;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_transfer_writes_assembled_document() {
    let form = Arc::new(InMemoryForm::new());
    let coordinator = coordinator(&fast_settings(), sample_editor(), form.clone());

    let outcome = coordinator.request_transfer().await;

    assert!(outcome.success, "unexpected outcome: {:?}", outcome);
    assert_eq!(outcome.category, TransferCategory::Transferred);
    assert_eq!(outcome.score, 100);
    assert_eq!(outcome.retry_count, 0);
    assert_eq!(outcome.update_path, Some(UpdatePath::FullReplace));
    assert!(!outcome.partial_update);
    assert!(outcome.operation_id.is_some());
    assert!(outcome.diagnostic.is_none());

    let written = form.snapshot();
    assert_eq!(written.content, SAMPLE_DOCUMENT);
    assert!(written.is_completed);

    let status = coordinator.mutex_state();
    assert!(!status.busy);
    assert!(status.current_operation_id.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_cached_document_is_transferred_verbatim() {
    let editor = sample_editor();
    editor.set_cached_document("## Canonical\n\nFrom the editor cache.");
    let form = Arc::new(InMemoryForm::new());
    let coordinator = coordinator(&fast_settings(), editor, form.clone());

    let outcome = coordinator.request_transfer().await;

    assert!(outcome.success);
    assert_eq!(form.snapshot().content, "## Canonical\n\nFrom the editor cache.");
}

#[tokio::test(start_paused = true)]
async fn test_empty_editor_transfers_empty_document() {
    let form = Arc::new(InMemoryForm::new());
    form.set_snapshot(FormSnapshot {
        content: "stale".to_string(),
        is_completed: true,
    });
    let editor = Arc::new(InMemoryEditor::new(Vec::new(), Vec::new()));
    let coordinator = coordinator(&fast_settings(), editor, form.clone());

    let outcome = coordinator.request_transfer().await;

    assert!(outcome.success);
    assert_eq!(outcome.score, 100);
    assert_eq!(form.snapshot(), FormSnapshot::default());
}

#[tokio::test(start_paused = true)]
async fn test_cooldown_rejects_then_admits() {
    let settings = BridgeSettings {
        cooldown_ms: 1000,
        ..fast_settings()
    };
    let coordinator = coordinator(&settings, sample_editor(), Arc::new(InMemoryForm::new()));

    assert!(coordinator.request_transfer().await.success);

    let rejected = coordinator.request_transfer().await;
    assert!(!rejected.success);
    assert_eq!(rejected.category, TransferCategory::CooldownActive);
    assert_eq!(rejected.score, 0);
    assert!(rejected.operation_id.is_none());
    assert!(rejected
        .diagnostic
        .as_deref()
        .is_some_and(|d| d.starts_with("cooldown active")));

    let status = coordinator.mutex_state();
    assert!(!status.busy);
    assert!(status.ms_until_next_allowed > 0 && status.ms_until_next_allowed <= 1000);

    tokio::time::advance(Duration::from_millis(1000)).await;
    assert_eq!(coordinator.mutex_state().ms_until_next_allowed, 0);

    let admitted = coordinator.request_transfer().await;
    assert!(admitted.success);
    assert_eq!(admitted.category, TransferCategory::Transferred);
}

#[tokio::test(start_paused = true)]
async fn test_missing_capabilities_is_downstream_unavailable() {
    let form = masked_form(CapabilityMask {
        set_completed: true,
        read_snapshot: true,
        ..CapabilityMask::none()
    });
    let coordinator = coordinator(&fast_settings(), sample_editor(), form.clone());

    let outcome = coordinator.request_transfer().await;

    assert!(!outcome.success);
    assert_eq!(outcome.category, TransferCategory::DownstreamUnavailable);
    assert_eq!(outcome.score, 0);
    assert!(outcome.update_path.is_none());
    assert_eq!(form.write_count(), 0);
    assert!(!coordinator.mutex_state().busy);
}

#[tokio::test(start_paused = true)]
async fn test_form_that_never_hydrates_is_downstream_unavailable() {
    let form = Arc::new(InMemoryForm::hydrating_for(Duration::from_secs(60)));
    let coordinator = coordinator(&fast_settings(), sample_editor(), form.clone());

    let outcome = coordinator.request_transfer().await;

    assert_eq!(outcome.category, TransferCategory::DownstreamUnavailable);
    // Readiness wait (200ms) bounds the time spent before resolution
    assert!(outcome.duration_ms >= 200);
    assert_eq!(form.write_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_hydrating_form_is_awaited() {
    let form = Arc::new(InMemoryForm::hydrating_for(Duration::from_millis(100)));
    let coordinator = coordinator(&fast_settings(), sample_editor(), form.clone());

    let outcome = coordinator.request_transfer().await;

    assert!(outcome.success);
    assert!(outcome.duration_ms >= 100);
    assert_eq!(form.snapshot().content, SAMPLE_DOCUMENT);
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_editor_is_upstream_unavailable() {
    let editor = sample_editor();
    editor.set_unavailable(true);
    let form = Arc::new(InMemoryForm::new());
    let coordinator = coordinator(&fast_settings(), editor, form.clone());

    let outcome = coordinator.request_transfer().await;

    assert!(!outcome.success);
    assert_eq!(outcome.category, TransferCategory::UpstreamUnavailable);
    assert_eq!(form.write_count(), 0);
    assert!(!coordinator.mutex_state().busy);
}

#[tokio::test(start_paused = true)]
async fn test_tolerant_mode_accepts_low_score() {
    let settings = BridgeSettings {
        tolerant_mode: true,
        ..fast_settings()
    };
    // 50-char document read back as 10 unrelated chars with the wrong flag
    let form = Arc::new(FixedReadbackForm::new(FormSnapshot {
        content: "x".repeat(10),
        is_completed: false,
    }));
    let coordinator = coordinator(&settings, cached_editor(&"a".repeat(50)), form);

    let outcome = coordinator.request_transfer().await;

    assert!(outcome.success);
    assert_eq!(outcome.score, 10);
    assert_eq!(outcome.category, TransferCategory::ValidationBelowThreshold);
}

#[tokio::test(start_paused = true)]
async fn test_low_score_fails_validation() {
    let form = Arc::new(FixedReadbackForm::new(FormSnapshot {
        content: "x".repeat(10),
        is_completed: false,
    }));
    let coordinator = coordinator(&fast_settings(), cached_editor(&"a".repeat(50)), form.clone());

    let outcome = coordinator.request_transfer().await;

    assert!(!outcome.success);
    assert_eq!(outcome.score, 10);
    assert_eq!(outcome.category, TransferCategory::ValidationBelowThreshold);
    assert_eq!(
        outcome.diagnostic.as_deref(),
        Some("validation score 10 below threshold 60")
    );
    // The write itself went through
    assert_eq!(form.inner.snapshot().content, "a".repeat(50));
}

#[tokio::test(start_paused = true)]
async fn test_missing_read_back_is_unverifiable() {
    let form = masked_form(CapabilityMask {
        read_snapshot: false,
        ..CapabilityMask::all()
    });
    let coordinator = coordinator(&fast_settings(), sample_editor(), form.clone());

    let outcome = coordinator.request_transfer().await;

    assert!(!outcome.success);
    assert_eq!(outcome.score, 0);
    assert_eq!(outcome.category, TransferCategory::ValidationUnverifiable);
    assert_eq!(form.snapshot().content, SAMPLE_DOCUMENT);
}

#[tokio::test(start_paused = true)]
async fn test_failed_writes_are_retried() {
    let form = Arc::new(FlakyForm::failing(2));
    let coordinator = coordinator(&fast_settings(), sample_editor(), form.clone());

    let outcome = coordinator.request_transfer().await;

    assert!(outcome.success);
    assert_eq!(outcome.retry_count, 2);
    // Linear backoff: 10ms + 20ms
    assert!(outcome.duration_ms >= 30);
    assert_eq!(form.inner.snapshot().content, SAMPLE_DOCUMENT);
    assert_eq!(coordinator.statistics().retried, 1);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_are_internal_exception() {
    let form = Arc::new(FlakyForm::always_failing());
    let coordinator = coordinator(&fast_settings(), sample_editor(), form.clone());

    let outcome = coordinator.request_transfer().await;

    assert!(!outcome.success);
    assert_eq!(outcome.category, TransferCategory::InternalException);
    assert_eq!(outcome.retry_count, 2);
    let diagnostic = outcome.diagnostic.unwrap_or_default();
    assert!(diagnostic.contains("after 3 attempts"), "{}", diagnostic);
    assert!(diagnostic.contains("store not accepting writes"), "{}", diagnostic);
    assert_eq!(form.inner.write_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_handle_releases_lock() {
    let coordinator = coordinator(&fast_settings(), sample_editor(), Arc::new(PanickingForm));

    let outcome = coordinator.request_transfer().await;

    assert!(!outcome.success);
    assert_eq!(outcome.category, TransferCategory::InternalException);
    assert!(outcome
        .diagnostic
        .as_deref()
        .is_some_and(|d| d.contains("panicked: reducer exploded")));

    let status = coordinator.mutex_state();
    assert!(!status.busy);
    assert_eq!(status.ms_until_next_allowed, 0);

    // Lock is usable again
    let again = coordinator.request_transfer().await;
    assert_eq!(again.category, TransferCategory::InternalException);
}

#[tokio::test(start_paused = true)]
async fn test_missing_flag_setter_is_partial_update() {
    let form = masked_form(CapabilityMask {
        update_content: true,
        read_snapshot: true,
        ..CapabilityMask::none()
    });
    let coordinator = coordinator(&fast_settings(), sample_editor(), form.clone());

    let outcome = coordinator.request_transfer().await;

    // Content matches (70), completion flag never written (0)
    assert!(outcome.success);
    assert_eq!(outcome.score, 70);
    assert_eq!(outcome.category, TransferCategory::PartialUpdate);
    assert_eq!(outcome.update_path, Some(UpdatePath::Compound));
    assert!(outcome.partial_update);
    assert!(outcome
        .diagnostic
        .as_deref()
        .is_some_and(|d| d.contains("IsCompleted")));
}

#[tokio::test(start_paused = true)]
async fn test_per_field_path() {
    let form = masked_form(CapabilityMask {
        update_field: true,
        read_snapshot: true,
        ..CapabilityMask::none()
    });
    let coordinator = coordinator(&fast_settings(), sample_editor(), form.clone());

    let outcome = coordinator.request_transfer().await;

    assert!(outcome.success);
    assert_eq!(outcome.update_path, Some(UpdatePath::PerField));
    assert_eq!(form.write_count(), 2);
    assert!(form.snapshot().is_completed);
}

#[tokio::test(start_paused = true)]
async fn test_events_are_published() {
    let settings = BridgeSettings {
        cooldown_ms: 1000,
        ..fast_settings()
    };
    let bus = TransferEventBus::new(16);
    let mut rx = bus.subscribe();
    let coordinator = coordinator(&settings, sample_editor(), Arc::new(InMemoryForm::new()))
        .with_event_bus(bus);

    let outcome = coordinator.request_transfer().await;
    let operation_id = outcome.operation_id.unwrap();

    match rx.try_recv().unwrap() {
        TransferEvent::TransferStarted { operation_id: id, .. } => assert_eq!(id, operation_id),
        other => panic!("expected TransferStarted, got {:?}", other),
    }
    match rx.try_recv().unwrap() {
        TransferEvent::TransferCompleted { outcome: published } => assert_eq!(published, outcome),
        other => panic!("expected TransferCompleted, got {:?}", other),
    }

    coordinator.request_transfer().await;
    match rx.try_recv().unwrap() {
        TransferEvent::TransferRejected {
            category,
            ms_until_next_allowed,
            ..
        } => {
            assert_eq!(category, TransferCategory::CooldownActive);
            assert!(ms_until_next_allowed > 0);
        }
        other => panic!("expected TransferRejected, got {:?}", other),
    }
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_statistics_track_outcomes() {
    let settings = BridgeSettings {
        cooldown_ms: 1000,
        ..fast_settings()
    };
    let coordinator = coordinator(&settings, sample_editor(), Arc::new(InMemoryForm::new()));

    coordinator.request_transfer().await;
    coordinator.request_transfer().await;

    let stats = coordinator.statistics();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.succeeded, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.executed, 1);
    assert_eq!(stats.by_category.get(&TransferCategory::Transferred), Some(&1));
    assert_eq!(stats.by_category.get(&TransferCategory::CooldownActive), Some(&1));
    assert!((stats.success_rate() - 0.5).abs() < f64::EPSILON);
}

#[test]
fn test_invalid_settings_rejected_at_construction() {
    let settings = BridgeSettings {
        pass_threshold: 101,
        ..fast_settings()
    };
    let result = quill_bridge::TransferCoordinator::new(
        &settings,
        quill_bridge::CoordinatorState::from_settings(&settings),
        sample_editor(),
        Arc::new(InMemoryForm::new()),
    );
    assert!(result.is_err());
}
