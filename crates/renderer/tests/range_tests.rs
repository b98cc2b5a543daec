//! Display range behavior as seen by range-control clients.

use renderer::{DisplayRangeController, Normalized, RangeError, RangePolicy};

// ============================================================================
// Slider workflow
// ============================================================================

#[test]
fn test_max_slider_then_rejected_min() {
    let mut controller = DisplayRangeController::initialize(0.0, 100.0, RangePolicy::Unclamped).unwrap();

    controller.set_max(50.0).unwrap();
    assert_eq!(controller.normalize(75.0), Normalized::Mapped(1.0));
    assert_eq!(controller.normalize(25.0), Normalized::Mapped(0.5));

    let before = controller.clone();
    assert!(controller.set_min(60.0).is_err());
    assert_eq!(controller, before);
    assert_eq!(controller.bounds(), (0.0, 50.0));
}

#[test]
fn test_rejection_is_idempotent() {
    let mut controller = DisplayRangeController::initialize(-5.0, 5.0, RangePolicy::Unclamped).unwrap();
    let before = controller.clone();
    for _ in 0..3 {
        assert!(controller.set_max(-5.0).is_err());
        assert!(controller.set_min(5.0).is_err());
        assert!(controller.set_range(1.0, 1.0).is_err());
    }
    assert_eq!(controller, before);
}

#[test]
fn test_slider_and_range_stay_in_sync() {
    let mut controller = DisplayRangeController::initialize(0.0, 2.0e-9, RangePolicy::Unclamped).unwrap();
    for step in 1..=20 {
        let fraction = step as f64 / 20.0;
        controller.set_max_from_fraction(fraction).unwrap();
        let back = controller.position_fraction();
        assert!((back - fraction).abs() < 1e-12, "{} vs {}", back, fraction);
    }
}

#[test]
fn test_zoom_into_outliers_needs_unclamped_policy() {
    let mut open = DisplayRangeController::initialize(0.0, 10.0, RangePolicy::Unclamped).unwrap();
    assert!(open.set_max(40.0).is_ok());
    assert_eq!(open.position_fraction(), 1.0);

    let mut clamped = DisplayRangeController::initialize(0.0, 10.0, RangePolicy::ClampToStats).unwrap();
    assert!(matches!(
        clamped.set_max(40.0),
        Err(RangeError::OutsideStats { value, .. }) if value == 40.0
    ));
    assert_eq!(clamped.bounds(), (0.0, 10.0));
}

// ============================================================================
// Normalization properties
// ============================================================================

#[test]
fn test_normalize_endpoints_for_many_ranges() {
    let ranges = [(0.0, 1.0), (-273.15, 60.0), (1e-12, 3e-10), (1000.0, 1e7)];
    for (min, max) in ranges {
        let controller = DisplayRangeController::initialize(min, max, RangePolicy::Unclamped).unwrap();
        assert_eq!(controller.normalize(min), Normalized::Mapped(0.0));
        assert_eq!(controller.normalize(max), Normalized::Mapped(1.0));
        assert_eq!(controller.normalize(f64::NAN), Normalized::Unmapped);
    }
}
