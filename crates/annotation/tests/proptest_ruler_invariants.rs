//! Property-based invariants for ruler layout and bound normalization.
//!
//! 1. Notch interval never increases as the zoom grows.
//! 2. Secondary cadence is `floor(10 / interval)`.
//! 3. Notches are evenly spaced and never pass the track end.
//! 4. Label fraction digits follow the zoom band.
//! 5. Normalized bounds are ordered and inside `[0, duration]`.

use annotation::ruler::{notch_interval_seconds, secondary_label_cadence};
use annotation::{format_label, normalize_bounds, notches};
use proptest::prelude::*;

fn density() -> impl Strategy<Value = f64> {
    prop_oneof![0.0001f64..2.0, 2.0f64..30.0, 30.0f64..5000.0]
}

fn fraction_len(label: &str) -> usize {
    label.split_once('.').map_or(0, |(_, fraction)| fraction.len())
}

proptest! {
    #[test]
    fn notch_interval_is_non_increasing(a in density(), b in density()) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(notch_interval_seconds(high) <= notch_interval_seconds(low));
    }

    #[test]
    fn secondary_cadence_targets_ten_seconds(px in density()) {
        let interval = notch_interval_seconds(px);
        prop_assert_eq!(secondary_label_cadence(px), (10.0 / interval).floor() as u32);
    }

    #[test]
    fn notches_stay_inside_the_track(duration in 0.1f64..600.0, px in 1.0f64..3000.0) {
        let interval = notch_interval_seconds(px);
        let laid_out: Vec<_> = notches(duration, px).collect();

        prop_assert!(!laid_out.is_empty());
        prop_assert_eq!(laid_out[0].seconds, 0.0);
        for (index, notch) in laid_out.iter().enumerate() {
            prop_assert_eq!(notch.seconds, index as f64 * interval);
            prop_assert!(notch.seconds <= duration + 1e-6);
        }
    }

    #[test]
    fn label_precision_follows_zoom_band(seconds in 0.0f64..59.0, px in density()) {
        let expected = if px >= 250.0 {
            2
        } else if px >= 25.0 {
            1
        } else {
            0
        };
        prop_assert_eq!(fraction_len(&format_label(seconds, px)), expected);
    }

    #[test]
    fn normalized_bounds_are_ordered_and_clamped(
        start in -100.0f64..100.0,
        end in -100.0f64..100.0,
        duration in 0.0f64..50.0,
    ) {
        let (low, high) = normalize_bounds(start, end, Some(duration));
        prop_assert!(0.0 <= low);
        prop_assert!(low <= high);
        prop_assert!(high <= duration);
    }
}

#[test]
fn coarsest_interval_is_reached_for_degenerate_density() {
    assert_eq!(notch_interval_seconds(0.0), notch_interval_seconds(-3.0));
    assert_eq!(notch_interval_seconds(f64::NAN), 30_720.0);
}
