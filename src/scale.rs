//! Map scale rounding policies.
//!
//! A scale here is the denominator of a `1:x` ratio: ground meters per page
//! meter. Rounding always goes *up*, so a rounded scale never makes the map
//! overflow the space it was computed for.

use num_traits::Float;

/// Human-friendly mantissas used by [`ScaleRounding::Nice`].
pub const NICE_STEPS: &[f64] = &[
    1.0, 1.25, 1.5, 1.75, 2.0, 2.5, 3.0, 3.5, 4.0, 4.5, 5.0, 6.0, 7.5, 8.0, 9.0, 10.0,
];

/// How to turn a raw required scale into the scale the map is printed at.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum ScaleRounding {
    /// Round up to the next of [`NICE_STEPS`] at the value's order of magnitude.
    /// `5263.2` becomes `6000`, `0.0123` becomes `0.0125`.
    #[default]
    Nice,
    /// Keep the raw scale.
    Any,
    /// Like [`Nice`](Self::Nice) with a caller-supplied ascending sequence of
    /// mantissas in `(0, 10]`. The sequence should end at `10.0`; values past the
    /// last step roll over to the next order of magnitude.
    Steps(&'static [f64]),
    /// Arbitrary function. Must return a value at least as large as its input;
    /// smaller results are clamped up to the input.
    Custom(fn(f64) -> f64),
}

impl ScaleRounding {
    /// Round `scale` according to this policy.
    ///
    /// For positive finite input the result is never below `scale`.
    /// Non-positive or non-finite input is returned unchanged.
    pub fn round(&self, scale: f64) -> f64 {
        if !(scale.is_finite() && scale > 0.0) {
            return scale;
        }
        let rounded = match *self {
            Self::Nice => round_to_steps(scale, NICE_STEPS),
            Self::Any => scale,
            Self::Steps(steps) => round_to_steps(scale, steps),
            Self::Custom(f) => {
                let r = f(scale);
                if r.is_nan() || r < scale {
                    log::warn!("scale rounding returned {r} for {scale}, keeping {scale}");
                }
                r
            }
        };
        // NaN from a custom policy also lands here.
        if rounded >= scale { rounded } else { scale }
    }
}

/// Round `scale` up to the smallest `step × 10^k` not below it, searching the
/// decades around `floor(log10(scale))`.
///
/// Candidates are built so that each is the nearest double to its decimal
/// value, which keeps the result on a step and the rounding idempotent.
fn round_to_steps(scale: f64, steps: &[f64]) -> f64 {
    let factor = Float::floor(Float::log10(scale)) as i32;
    (factor - 1..=factor + 1)
        .flat_map(|k| steps.iter().map(move |&s| step_value(s, k)))
        .find(|&candidate| candidate >= scale)
        .unwrap_or(scale)
}

fn step_value(step: f64, exp: i32) -> f64 {
    if exp >= 0 {
        step * Float::powi(10.0_f64, exp)
    } else {
        step / Float::powi(10.0_f64, -exp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nice_rounds_up_within_decade() {
        assert_eq!(ScaleRounding::Nice.round(5263.2), 6000.0);
        assert_eq!(ScaleRounding::Nice.round(1100.0), 1250.0);
        assert_eq!(ScaleRounding::Nice.round(7.0), 7.5);
        assert_eq!(ScaleRounding::Nice.round(9.5), 10.0);
    }

    #[test]
    fn nice_keeps_exact_steps() {
        assert_eq!(ScaleRounding::Nice.round(2500.0), 2500.0);
        assert_eq!(ScaleRounding::Nice.round(1.0), 1.0);
    }

    #[test]
    fn just_above_a_step_moves_to_the_next() {
        assert_eq!(ScaleRounding::Nice.round(6000.000001), 7500.0);
        assert_eq!(ScaleRounding::Nice.round(6000.0), 6000.0);
        assert_eq!(ScaleRounding::Nice.round(1000.0000001), 1250.0);
        assert_eq!(ScaleRounding::Nice.round(0.0125), 0.0125);
        assert_eq!(ScaleRounding::Nice.round(0.012500001), 0.015);
    }

    #[test]
    fn rounding_is_idempotent() {
        for raw in [0.0123, 0.7, 3.3, 47.0, 5263.2, 98765.4, 1.2e7] {
            let once = ScaleRounding::Nice.round(raw);
            assert!(once >= raw);
            assert_eq!(ScaleRounding::Nice.round(once), once, "{raw}");
        }
    }

    #[test]
    fn nice_below_one() {
        let r = ScaleRounding::Nice.round(0.0123);
        assert!((r - 0.0125).abs() < 1e-12, "{r}");
    }

    #[test]
    fn any_is_identity() {
        assert_eq!(ScaleRounding::Any.round(5263.2), 5263.2);
    }

    #[test]
    fn custom_steps() {
        const STEPS: &[f64] = &[1.0, 2.0, 5.0, 10.0];
        assert_eq!(ScaleRounding::Steps(STEPS).round(3000.0), 5000.0);
        assert_eq!(ScaleRounding::Steps(STEPS).round(6000.0), 10000.0);
    }

    #[test]
    fn short_steps_roll_over() {
        const STEPS: &[f64] = &[1.0, 5.0];
        assert_eq!(ScaleRounding::Steps(STEPS).round(600.0), 1000.0);
    }

    #[test]
    fn custom_below_input_is_clamped() {
        fn halve(x: f64) -> f64 {
            x / 2.0
        }
        assert_eq!(ScaleRounding::Custom(halve).round(1000.0), 1000.0);
    }

    #[test]
    fn custom_above_input_is_kept() {
        fn thousands(x: f64) -> f64 {
            (x / 1000.0).ceil() * 1000.0
        }
        assert_eq!(ScaleRounding::Custom(thousands).round(1234.0), 2000.0);
    }

    #[test]
    fn non_positive_passes_through() {
        assert_eq!(ScaleRounding::Nice.round(0.0), 0.0);
        assert_eq!(ScaleRounding::Nice.round(-5.0), -5.0);
        assert!(ScaleRounding::Nice.round(f64::NAN).is_nan());
    }
}
