//! Hardware detection through the public profiler

use modelrouter::hardware::{FixedProbe, SystemProbe};
use modelrouter::{GpuKind, HardwareProfiler};
use std::sync::Arc;

#[test]
fn test_detect_twice_is_structurally_equal() {
    let profiler = HardwareProfiler::new(Arc::new(
        FixedProbe::with_ram_gb(32).with_gpu(GpuKind::Nvidia, 12),
    ));
    let first = profiler.detect();
    let second = profiler.detect();
    assert_eq!(first, second);
    assert_eq!(profiler.snapshot(), Some(second));
}

#[test]
fn test_subscribers_see_detection() {
    let profiler = HardwareProfiler::new(Arc::new(FixedProbe::with_ram_gb(8)));
    let rx = profiler.subscribe();
    assert!(rx.borrow().is_none());

    let profile = profiler.detect();
    assert_eq!(rx.borrow().as_ref(), Some(&profile));
    assert_eq!(profile.total_ram_gb(), Some(8.0));
    assert!(!profile.has_gpu());
}

#[test]
fn test_system_probe_detect_is_idempotent() {
    let profiler = HardwareProfiler::new(Arc::new(SystemProbe));
    let first = profiler.detect();
    let second = profiler.detect();
    assert_eq!(first, second);
    assert_eq!(profiler.snapshot(), Some(second));
}
