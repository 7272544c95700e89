//! Timeline ruler policy: notch spacing, label cadence and label text as a
//! function of horizontal pixel density.
//!
//! Every function here is pure. The rendering surface asks for these values
//! whenever the zoom changes, so identical input must give identical output.

use crate::config::RulerStyle;

/// Densities at or below zero (or NaN) are evaluated as this value.
const MIN_PX_PER_SECOND: f64 = 1.0 / 1024.0;

const BASE_PX: f64 = 25.0;

/// How a notch should be drawn on the ruler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotchKind {
    Primary,
    Secondary,
    Plain,
}

impl NotchKind {
    /// Stroke colour under `style`. Unlabeled notches share the secondary colour.
    pub fn color(self, style: &RulerStyle) -> &str {
        match self {
            Self::Primary => &style.primary_color,
            Self::Secondary | Self::Plain => &style.secondary_color,
        }
    }

    pub fn font_color(self, style: &RulerStyle) -> Option<&str> {
        match self {
            Self::Primary => Some(&style.primary_font_color),
            Self::Secondary => Some(&style.secondary_font_color),
            Self::Plain => None,
        }
    }
}

/// One ruler tick mark.
#[derive(Debug, Clone, PartialEq)]
pub struct RulerNotch {
    pub seconds: f64,
    pub kind: NotchKind,
    /// Present for primary and secondary notches.
    pub label: Option<String>,
}

/// Formats a ruler label as `M:SS.frac`.
///
/// Minutes are suppressed below one minute. The fractional part has 0, 1 or
/// 2 digits as the zoom increases (`< 25`, `25..250`, `>= 250` px/s).
///
/// # Example
/// ```
/// use annotation::ruler::format_label;
///
/// assert_eq!(format_label(65.0, 5.0), "1:05");
/// assert_eq!(format_label(5.256, 300.0), "5.26");
/// ```
pub fn format_label(seconds: f64, px_per_second: f64) -> String {
    let seconds = if seconds.is_finite() {
        seconds.max(0.0)
    } else {
        0.0
    };
    let minutes = (seconds / 60.0).floor() as u64;
    let remainder = seconds % 60.0;

    let digits = fraction_digits(sanitize(px_per_second));
    let mut text = if digits == 0 {
        format!("{}", remainder.round() as u64)
    } else {
        format!("{remainder:.digits$}")
    };

    if minutes > 0 {
        let whole_digits = text.find('.').unwrap_or(text.len());
        if whole_digits < 2 {
            text.insert(0, '0');
        }
        return format!("{minutes}:{text}");
    }
    text
}

/// Returns the period between notches in seconds.
///
/// The result never increases as `px_per_second` grows.
pub fn notch_interval_seconds(px_per_second: f64) -> f64 {
    let px = sanitize(px_per_second);
    if px >= BASE_PX * 100.0 {
        0.01
    } else if px >= BASE_PX * 40.0 {
        0.025
    } else if px >= BASE_PX * 10.0 {
        0.1
    } else if px >= BASE_PX * 4.0 {
        0.25
    } else if px >= BASE_PX {
        1.0
    } else if px * 5.0 >= BASE_PX {
        5.0
    } else if px * 15.0 >= BASE_PX {
        15.0
    } else {
        coarse_span(px)
    }
}

/// Returns N such that every Nth notch is labeled in the primary style.
pub fn primary_label_cadence(px_per_second: f64) -> u32 {
    let px = sanitize(px_per_second);
    if px >= BASE_PX * 100.0 {
        10
    } else if px >= BASE_PX * 40.0 {
        4
    } else if px >= BASE_PX * 10.0 {
        10
    } else if px >= BASE_PX * 4.0 {
        4
    } else if px >= BASE_PX {
        1
    } else if px * 5.0 >= BASE_PX {
        5
    } else if px * 15.0 >= BASE_PX {
        15
    } else {
        coarse_span(px) as u32
    }
}

/// Returns N such that every Nth notch gets a secondary label, aiming at one
/// secondary label per ten seconds of track. Zero means no secondary labels.
pub fn secondary_label_cadence(px_per_second: f64) -> u32 {
    (10.0 / notch_interval_seconds(px_per_second)).floor() as u32
}

/// Lays out the notches of a track of `duration_seconds` at the given zoom,
/// lazily and in time order.
pub fn notches(duration_seconds: f64, px_per_second: f64) -> impl Iterator<Item = RulerNotch> {
    let interval = notch_interval_seconds(px_per_second);
    let primary = primary_label_cadence(px_per_second);
    let secondary = secondary_label_cadence(px_per_second);
    // Tolerate float drift so a notch landing exactly on the end is kept.
    let last_index = (duration_seconds.is_finite() && duration_seconds > 0.0)
        .then(|| (duration_seconds / interval + 1e-9).floor() as u64);

    last_index
        .into_iter()
        .flat_map(|last| 0..=last)
        .map(move |index| {
            let seconds = index as f64 * interval;
            let kind = if is_every(index, secondary) {
                NotchKind::Secondary
            } else if is_every(index, primary) {
                NotchKind::Primary
            } else {
                NotchKind::Plain
            };
            let label =
                (kind != NotchKind::Plain).then(|| format_label(seconds, px_per_second));
            RulerNotch {
                seconds,
                kind,
                label,
            }
        })
}

fn is_every(index: u64, cadence: u32) -> bool {
    cadence > 0 && index % u64::from(cadence) == 0
}

fn fraction_digits(px: f64) -> usize {
    if px >= BASE_PX * 10.0 {
        2
    } else if px >= BASE_PX {
        1
    } else {
        0
    }
}

fn coarse_span(px: f64) -> f64 {
    (0.5 / px).ceil() * 60.0
}

fn sanitize(px_per_second: f64) -> f64 {
    if px_per_second.is_nan() || px_per_second < MIN_PX_PER_SECOND {
        MIN_PX_PER_SECOND
    } else {
        px_per_second
    }
}

#[cfg(test)]
mod tests {
    use crate::config::RulerStyle;

    use super::{
        NotchKind, format_label, notch_interval_seconds, notches, primary_label_cadence,
        secondary_label_cadence,
    };

    #[test]
    fn format_label_matches_golden_values() {
        assert_eq!(format_label(65.0, 5.0), "1:05");
        assert_eq!(format_label(5.0, 5.0), "5");
        assert_eq!(format_label(5.256, 300.0), "5.26");
        assert_eq!(format_label(5.26, 30.0), "5.3");
        assert_eq!(format_label(125.5, 300.0), "2:05.50");
        assert_eq!(format_label(75.0, 30.0), "1:15.0");
    }

    #[test]
    fn format_label_clamps_negative_time_to_zero() {
        assert_eq!(format_label(-3.0, 5.0), "0");
    }

    #[test]
    fn notch_interval_follows_density_ladder() {
        let expected = [
            (3000.0, 0.01),
            (2500.0, 0.01),
            (1000.0, 0.025),
            (250.0, 0.1),
            (100.0, 0.25),
            (25.0, 1.0),
            (5.0, 5.0),
            (2.0, 15.0),
            (1.0, 60.0),
            (0.2, 180.0),
        ];
        for (px, interval) in expected {
            assert_eq!(notch_interval_seconds(px), interval, "px/s = {px}");
        }
    }

    #[test]
    fn label_cadences_follow_density_ladder() {
        assert_eq!(primary_label_cadence(2500.0), 10);
        assert_eq!(primary_label_cadence(1000.0), 4);
        assert_eq!(primary_label_cadence(250.0), 10);
        assert_eq!(primary_label_cadence(100.0), 4);
        assert_eq!(primary_label_cadence(25.0), 1);
        assert_eq!(primary_label_cadence(5.0), 5);
        assert_eq!(primary_label_cadence(2.0), 15);
        assert_eq!(primary_label_cadence(1.0), 60);

        assert_eq!(secondary_label_cadence(230.0), 40);
        assert_eq!(secondary_label_cadence(25.0), 10);
        assert_eq!(secondary_label_cadence(2.0), 0);
    }

    #[test]
    fn non_positive_density_uses_coarsest_branch() {
        assert_eq!(notch_interval_seconds(0.0), 30_720.0);
        assert_eq!(notch_interval_seconds(f64::NAN), 30_720.0);
        assert_eq!(notch_interval_seconds(-10.0), notch_interval_seconds(0.0));
    }

    #[test]
    fn notches_label_primary_and_secondary_ticks() {
        let ruler: Vec<_> = notches(2.0, 100.0).collect();

        assert_eq!(ruler.len(), 9);
        assert_eq!(ruler[0].kind, NotchKind::Secondary);
        assert_eq!(ruler[0].label.as_deref(), Some("0.0"));
        assert_eq!(ruler[1].kind, NotchKind::Plain);
        assert_eq!(ruler[1].label, None);
        assert_eq!(ruler[4].kind, NotchKind::Primary);
        assert_eq!(ruler[4].label.as_deref(), Some("1.0"));
        assert_eq!(ruler[8].seconds, 2.0);
    }

    #[test]
    fn notches_for_empty_track_are_empty() {
        assert_eq!(notches(0.0, 230.0).count(), 0);
        assert_eq!(notches(f64::INFINITY, 230.0).count(), 0);
    }

    #[test]
    fn notches_of_a_very_long_track_are_produced_lazily() {
        let head: Vec<f64> = notches(1e13, 3000.0)
            .take(3)
            .map(|notch| notch.seconds)
            .collect();

        assert_eq!(head, vec![0.0, 0.01, 0.02]);
    }

    #[test]
    fn notch_colors_follow_ruler_style() {
        let style = RulerStyle {
            primary_color: "red".to_owned(),
            secondary_color: "gray".to_owned(),
            primary_font_color: "#111".to_owned(),
            secondary_font_color: "#222".to_owned(),
        };

        assert_eq!(NotchKind::Primary.color(&style), "red");
        assert_eq!(NotchKind::Plain.color(&style), "gray");
        assert_eq!(NotchKind::Secondary.font_color(&style), Some("#222"));
        assert_eq!(NotchKind::Plain.font_color(&style), None);
    }
}
