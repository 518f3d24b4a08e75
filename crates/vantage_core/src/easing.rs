//! Blend curves
//!
//! A [`BlendCurve`] maps normalized blend time in `[0, 1]` to a blend weight.
//! The preset shapes are cubic Hermite segments from `(0, 0)` to `(1, 1)`
//! that differ only in their end tangents:
//!
//! | curve | start tangent | end tangent |
//! |---|---|---|
//! | `Linear` | 1 | 1 |
//! | `EaseInOut` | 0 | 0 |
//! | `EaseIn` | 1 | 0 |
//! | `EaseOut` | 0 | 1 |
//! | `HardIn` | 0 | 2 |
//! | `HardOut` | 2 | 0 |

use crate::error::{CurveError, Result};
use serde::{Deserialize, Serialize};

/// One key of a custom curve
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    pub time: f32,
    pub value: f32,
}

impl CurveKey {
    pub const fn new(time: f32, value: f32) -> Self {
        Self { time, value }
    }
}

/// Shape of a camera blend over normalized time
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendCurve {
    Linear,
    /// Ease out of the outgoing camera and into the incoming one
    EaseInOut,
    /// Linear out of the outgoing camera, ease into the incoming one
    EaseIn,
    /// Ease out of the outgoing camera, linear into the incoming one
    EaseOut,
    /// Ease out of the outgoing camera, hard into the incoming one
    HardIn,
    /// Hard out of the outgoing camera, ease into the incoming one
    HardOut,
    /// Piecewise-linear keys; build with [`BlendCurve::keyframes`]
    Keyframes(Vec<CurveKey>),
}

impl BlendCurve {
    /// Build a validated keyframed curve
    ///
    /// Keys must be finite with strictly increasing times. Evaluation
    /// clamps to the first/last key outside their range.
    pub fn keyframes(keys: Vec<CurveKey>) -> Result<Self> {
        if keys.len() < 2 {
            return Err(CurveError::TooFewKeys(keys.len()));
        }
        for (index, key) in keys.iter().enumerate() {
            if !key.time.is_finite() || !key.value.is_finite() {
                return Err(CurveError::NonFinite { index });
            }
            if index > 0 && key.time <= keys[index - 1].time {
                return Err(CurveError::Unordered { index });
            }
        }
        Ok(BlendCurve::Keyframes(keys))
    }

    /// Evaluate the curve at normalized time `t`
    pub fn evaluate(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            BlendCurve::Linear => t,
            BlendCurve::EaseInOut => hermite(t, 0.0, 0.0),
            BlendCurve::EaseIn => hermite(t, 1.0, 0.0),
            BlendCurve::EaseOut => hermite(t, 0.0, 1.0),
            BlendCurve::HardIn => hermite(t, 0.0, 2.0),
            BlendCurve::HardOut => hermite(t, 2.0, 0.0),
            BlendCurve::Keyframes(keys) => evaluate_keys(keys, t),
        }
    }
}

/// Cubic Hermite from (0, 0) to (1, 1) with the given end tangents
fn hermite(t: f32, m0: f32, m1: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;
    (t3 - 2.0 * t2 + t) * m0 + (-2.0 * t3 + 3.0 * t2) + (t3 - t2) * m1
}

fn evaluate_keys(keys: &[CurveKey], t: f32) -> f32 {
    let (first, last) = match (keys.first(), keys.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return t,
    };
    if t <= first.time {
        return first.value;
    }
    if t >= last.time {
        return last.value;
    }
    for pair in keys.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.time {
            let span = b.time - a.time;
            let f = if span > 0.0 { (t - a.time) / span } else { 1.0 };
            return a.value + (b.value - a.value) * f;
        }
    }
    last.value
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRESETS: [BlendCurve; 6] = [
        BlendCurve::Linear,
        BlendCurve::EaseInOut,
        BlendCurve::EaseIn,
        BlendCurve::EaseOut,
        BlendCurve::HardIn,
        BlendCurve::HardOut,
    ];

    #[test]
    fn test_presets_hit_endpoints() {
        for curve in PRESETS.iter() {
            assert!(curve.evaluate(0.0).abs() < 1e-6, "{curve:?}");
            assert!((curve.evaluate(1.0) - 1.0).abs() < 1e-6, "{curve:?}");
        }
    }

    #[test]
    fn test_presets_are_monotonic() {
        for curve in PRESETS.iter() {
            let mut prev = 0.0;
            for i in 1..=100 {
                let v = curve.evaluate(i as f32 / 100.0);
                assert!(v >= prev - 1e-6, "{curve:?} dips at {i}");
                prev = v;
            }
        }
    }

    #[test]
    fn test_shapes() {
        assert!((BlendCurve::EaseInOut.evaluate(0.5) - 0.5).abs() < 1e-6);
        assert!((BlendCurve::HardIn.evaluate(0.5) - 0.25).abs() < 1e-6);
        assert!((BlendCurve::HardOut.evaluate(0.5) - 0.75).abs() < 1e-6);
        // Clamped outside [0, 1]
        assert_eq!(BlendCurve::Linear.evaluate(2.0), 1.0);
        assert_eq!(BlendCurve::Linear.evaluate(-1.0), 0.0);
    }

    #[test]
    fn test_keyframes() {
        let curve = BlendCurve::keyframes(vec![
            CurveKey::new(0.0, 0.0),
            CurveKey::new(0.5, 0.8),
            CurveKey::new(1.0, 1.0),
        ])
        .unwrap();
        assert!((curve.evaluate(0.25) - 0.4).abs() < 1e-6);
        assert!((curve.evaluate(0.75) - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_keyframes_validation() {
        assert_eq!(
            BlendCurve::keyframes(vec![CurveKey::new(0.0, 0.0)]),
            Err(CurveError::TooFewKeys(1))
        );
        assert_eq!(
            BlendCurve::keyframes(vec![CurveKey::new(0.5, 0.0), CurveKey::new(0.5, 1.0)]),
            Err(CurveError::Unordered { index: 1 })
        );
        assert_eq!(
            BlendCurve::keyframes(vec![CurveKey::new(0.0, f32::NAN), CurveKey::new(1.0, 1.0)]),
            Err(CurveError::NonFinite { index: 0 })
        );
    }
}
