//! Integration tests for the per-device stream registry
//!
//! These tests exercise the registry lifecycle against the mock backend,
//! which keeps per-device open/close accounting.

use camlink_capture::{
    mock::{MOCK_HEIGHT, MOCK_WIDTH},
    CaptureError, MockBackend, StreamConfig, StreamRegistry,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn fast_config() -> StreamConfig {
    StreamConfig {
        poll_interval: Duration::from_millis(1),
        failure_threshold: 5,
    }
}

fn registry_with(backend: MockBackend) -> StreamRegistry {
    StreamRegistry::new(Arc::new(backend), fast_config())
}

fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

// ============================================================================
// STALE ID HANDLING
// ============================================================================

#[test]
fn test_operations_on_never_started_ids_yield_unknown_stream() {
    let registry = registry_with(MockBackend::new(&[0, 1]));

    for device_id in [0, 3, 42] {
        assert!(matches!(
            registry.capture_from_stream(device_id),
            Err(CaptureError::UnknownStream { device_id: id, .. }) if id == device_id
        ));
        assert!(matches!(
            registry.stop_stream(device_id),
            Err(CaptureError::UnknownStream { device_id: id, .. }) if id == device_id
        ));
    }
}

#[test]
fn test_start_on_absent_device_inserts_nothing() {
    let registry = registry_with(MockBackend::new(&[]));

    assert!(matches!(
        registry.start_stream(0),
        Err(CaptureError::DeviceUnavailable { device_id: 0, .. })
    ));
    // No dangling entry for the failed open.
    assert!(registry.active_streams().is_empty());
    assert!(matches!(
        registry.stop_stream(0),
        Err(CaptureError::UnknownStream { .. })
    ));
}

// ============================================================================
// IDEMPOTENT START
// ============================================================================

#[test]
fn test_double_start_acquires_a_single_handle() {
    let backend = MockBackend::new(&[0]);
    let counters = backend.counters();
    let registry = registry_with(backend);

    let first = registry.start_stream(0).unwrap();
    assert!(!first.already_running);

    let second = registry.start_stream(0).unwrap();
    assert!(second.already_running);
    assert_eq!(second.info, first.info);

    assert_eq!(counters.opens(0), 1);
    assert_eq!(registry.active_streams(), vec![0]);
}

// ============================================================================
// STREAMED CAPTURE
// ============================================================================

#[test]
fn test_no_frame_yet_then_frame_within_bounded_wait() {
    let backend = MockBackend::new(&[0]).with_first_read_delay(Duration::from_millis(300));
    let registry = registry_with(backend);

    registry.start_stream(0).unwrap();
    // The worker is still inside its first read.
    assert!(matches!(
        registry.capture_from_stream(0),
        Err(CaptureError::NoFrameYet { device_id: 0 })
    ));

    assert!(wait_for(|| registry.capture_from_stream(0).is_ok()));
    let frame = registry.capture_from_stream(0).unwrap();
    assert_eq!(frame.width, MOCK_WIDTH);
    assert_eq!(frame.height, MOCK_HEIGHT);
    assert_eq!(frame.data.len(), frame.expected_len());
}

#[test]
fn test_stop_closes_the_source_and_forgets_the_id() {
    let backend = MockBackend::new(&[0]);
    let counters = backend.counters();
    let registry = registry_with(backend);

    registry.start_stream(0).unwrap();
    assert!(wait_for(|| registry.capture_from_stream(0).is_ok()));

    registry.stop_stream(0).unwrap();
    assert_eq!(counters.closes(0), 1);
    assert!(matches!(
        registry.capture_from_stream(0),
        Err(CaptureError::UnknownStream { device_id: 0, .. })
    ));
}

// ============================================================================
// AUTO-STOP ON DEGRADED DEVICES
// ============================================================================

#[test]
fn test_stream_auto_stops_after_failure_threshold() {
    let backend = MockBackend::new(&[0]).with_read_budget(3);
    let counters = backend.counters();
    let registry = registry_with(backend);

    registry.start_stream(0).unwrap();

    // Reads fail once the budget is spent; the worker gives up past the
    // threshold and the registry entry disappears.
    assert!(wait_for(|| matches!(
        registry.capture_from_stream(0),
        Err(CaptureError::UnknownStream { .. })
    )));
    assert_eq!(counters.closes(0), 1);
    assert!(registry.active_streams().is_empty());
}

// ============================================================================
// ONE-SHOT CAPTURE
// ============================================================================

#[test]
fn test_oneshot_needs_no_stream_and_balances_open_close() {
    let backend = MockBackend::new(&[0]);
    let counters = backend.counters();
    let registry = registry_with(backend);

    let frame = registry.capture_oneshot(0).unwrap();
    assert_eq!(frame.width, MOCK_WIDTH);
    assert_eq!(counters.opens(0), 1);
    assert_eq!(counters.closes(0), 1);

    registry.capture_oneshot(0).unwrap();
    assert_eq!(counters.opens(0), 2);
    assert_eq!(counters.closes(0), 2);
}

#[test]
fn test_oneshot_is_independent_of_a_running_stream() {
    let backend = MockBackend::new(&[0]);
    let counters = backend.counters();
    let registry = registry_with(backend);

    registry.start_stream(0).unwrap();
    assert!(wait_for(|| registry.capture_from_stream(0).is_ok()));
    assert_eq!(counters.opens(0), 1);

    registry.capture_oneshot(0).unwrap();
    // One extra open/close pair; the stream's handle is untouched.
    assert_eq!(counters.opens(0), 2);
    assert_eq!(counters.closes(0), 1);
    assert!(registry.capture_from_stream(0).is_ok());

    registry.stop_stream(0).unwrap();
    assert_eq!(counters.closes(0), 2);
}

#[test]
fn test_oneshot_releases_the_handle_when_the_read_fails() {
    let backend = MockBackend::new(&[0]).with_read_budget(0);
    let counters = backend.counters();
    let registry = registry_with(backend);

    assert!(matches!(
        registry.capture_oneshot(0),
        Err(CaptureError::CaptureFailed { device_id: 0, .. })
    ));
    assert_eq!(counters.opens(0), 1);
    assert_eq!(counters.closes(0), 1);
}

// ============================================================================
// ISOLATION AND TEARDOWN
// ============================================================================

#[test]
fn test_failure_on_one_device_does_not_affect_others() {
    let backend = MockBackend::new(&[0, 1]);
    let registry = registry_with(backend);

    registry.start_stream(0).unwrap();
    registry.start_stream(1).unwrap();
    assert!(matches!(
        registry.start_stream(2),
        Err(CaptureError::DeviceUnavailable { .. })
    ));

    assert!(wait_for(|| registry.capture_from_stream(0).is_ok()));
    assert!(wait_for(|| registry.capture_from_stream(1).is_ok()));

    registry.stop_stream(0).unwrap();
    // Device 1 keeps streaming after device 0 is gone.
    assert!(registry.capture_from_stream(1).is_ok());
    assert_eq!(registry.active_streams(), vec![1]);
}

#[test]
fn test_shutdown_stops_every_stream() {
    let backend = MockBackend::new(&[0, 1, 2]);
    let counters = backend.counters();
    let registry = registry_with(backend);

    for device_id in 0..3 {
        registry.start_stream(device_id).unwrap();
    }
    registry.shutdown();

    for device_id in 0..3 {
        assert_eq!(counters.closes(device_id), 1);
    }
    assert!(registry.active_streams().is_empty());
}
