//! Camera state
//!
//! The pose and lens a camera produces each tick, plus the hints that tell
//! an output which fields it may write.

use crate::interpolate::{Interpolate, SphericalInterpolate};
use crate::math::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Lens parameters carried alongside the pose
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LensSettings {
    /// Vertical field of view in degrees
    pub field_of_view: f32,
    /// Half-height of the view volume for orthographic outputs
    pub orthographic_size: f32,
    pub near_clip: f32,
    pub far_clip: f32,
    /// Roll applied around the view axis, in degrees
    pub dutch: f32,
    pub orthographic: bool,
}

impl Default for LensSettings {
    fn default() -> Self {
        Self {
            field_of_view: 40.0,
            orthographic_size: 10.0,
            near_clip: 0.1,
            far_clip: 5000.0,
            dutch: 0.0,
            orthographic: false,
        }
    }
}

impl LensSettings {
    pub fn with_field_of_view(mut self, degrees: f32) -> Self {
        self.field_of_view = degrees;
        self
    }
}

impl Interpolate for LensSettings {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            field_of_view: Interpolate::lerp(&self.field_of_view, &other.field_of_view, t),
            orthographic_size: Interpolate::lerp(&self.orthographic_size, &other.orthographic_size, t),
            near_clip: Interpolate::lerp(&self.near_clip, &other.near_clip, t),
            far_clip: Interpolate::lerp(&self.far_clip, &other.far_clip, t),
            dutch: Interpolate::lerp(&self.dutch, &other.dutch, t),
            // Projection mode cannot be mixed; switch at the midpoint
            orthographic: if t < 0.5 {
                self.orthographic
            } else {
                other.orthographic
            },
        }
    }

    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.field_of_view.approx_eq(&other.field_of_view, epsilon)
            && self.orthographic_size.approx_eq(&other.orthographic_size, epsilon)
            && self.near_clip.approx_eq(&other.near_clip, epsilon)
            && self.far_clip.approx_eq(&other.far_clip, epsilon)
            && self.dutch.approx_eq(&other.dutch, epsilon)
            && self.orthographic == other.orthographic
    }
}

/// Per-field suppression flags
///
/// A set flag means the output must leave that field untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendHints {
    pub no_position: bool,
    pub no_orientation: bool,
    pub no_lens: bool,
}

impl BlendHints {
    pub const NONE: BlendHints = BlendHints {
        no_position: false,
        no_orientation: false,
        no_lens: false,
    };

    /// Flags shared by both sides survive a blend
    pub fn intersect(self, other: BlendHints) -> BlendHints {
        BlendHints {
            no_position: self.no_position && other.no_position,
            no_orientation: self.no_orientation && other.no_orientation,
            no_lens: self.no_lens && other.no_lens,
        }
    }
}

/// Everything a camera contributes to the final output in one tick
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraState {
    pub position: Vec3,
    pub orientation: Quat,
    pub lens: LensSettings,
    pub hints: BlendHints,
}

impl CameraState {
    /// State at a position with identity orientation and default lens
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_lens(mut self, lens: LensSettings) -> Self {
        self.lens = lens;
        self
    }

    pub fn with_hints(mut self, hints: BlendHints) -> Self {
        self.hints = hints;
        self
    }

    /// Blend two states by weight `t` (0 = `a`, 1 = `b`)
    ///
    /// When only one side suppresses a field, the other side's value is
    /// taken unblended.
    pub fn blend(a: &CameraState, b: &CameraState, t: f32) -> CameraState {
        let t = t.clamp(0.0, 1.0);
        let pick = |a_off: bool, b_off: bool| match (a_off, b_off) {
            (false, true) => Some(0.0),
            (true, false) => Some(1.0),
            _ => None,
        };

        let pos_t = pick(a.hints.no_position, b.hints.no_position).unwrap_or(t);
        let rot_t = pick(a.hints.no_orientation, b.hints.no_orientation).unwrap_or(t);
        let lens_t = pick(a.hints.no_lens, b.hints.no_lens).unwrap_or(t);

        CameraState {
            position: a.position.lerp(&b.position, pos_t),
            orientation: SphericalInterpolate::slerp(&a.orientation, &b.orientation, rot_t),
            lens: a.lens.lerp(&b.lens, lens_t),
            hints: a.hints.intersect(b.hints),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_endpoints() {
        let a = CameraState::at(Vec3::new(0.0, 1.0, 0.0));
        let b = CameraState::at(Vec3::new(4.0, 1.0, 0.0))
            .with_lens(LensSettings::default().with_field_of_view(60.0));

        let start = CameraState::blend(&a, &b, 0.0);
        assert_eq!(start.position, a.position);
        assert_eq!(start.lens.field_of_view, 40.0);

        let mid = CameraState::blend(&a, &b, 0.5);
        assert!((mid.position.x - 2.0).abs() < 1e-5);
        assert!((mid.lens.field_of_view - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_one_sided_hint_takes_other_value() {
        let hints = BlendHints {
            no_position: true,
            ..BlendHints::NONE
        };
        let a = CameraState::at(Vec3::new(0.0, 0.0, 0.0)).with_hints(hints);
        let b = CameraState::at(Vec3::new(10.0, 0.0, 0.0));

        let mid = CameraState::blend(&a, &b, 0.2);
        assert_eq!(mid.position, b.position);
        assert!(!mid.hints.no_position);
    }

    #[test]
    fn test_shared_hint_survives() {
        let hints = BlendHints {
            no_lens: true,
            ..BlendHints::NONE
        };
        let a = CameraState::default().with_hints(hints);
        let b = CameraState::default().with_hints(hints);
        assert!(CameraState::blend(&a, &b, 0.5).hints.no_lens);
    }

    #[test]
    fn test_state_from_toml() {
        let state: CameraState = toml::from_str(
            r#"
            position = [1.0, 2.0, 3.0]
            [lens]
            field_of_view = 55.0
            "#,
        )
        .unwrap();
        assert_eq!(state.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(state.lens.field_of_view, 55.0);
        assert_eq!(state.lens.near_clip, 0.1);
        assert_eq!(state.orientation, Quat::IDENTITY);
    }
}
