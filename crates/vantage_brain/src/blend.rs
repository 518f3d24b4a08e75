//! Blend state
//!
//! A [`BlendState`] is a timed interpolation from `cam_a` to `cam_b`. Either
//! side may itself be a blend, which is how an interrupted transition keeps
//! its in-flight pose: the old blend becomes the new blend's `cam_a`.

use crate::camera::CameraId;
use crate::registry::CameraRegistry;
use smallvec::SmallVec;
use vantage_core::{BlendCurve, CameraState};

/// One side of a blend
#[derive(Clone, Debug, PartialEq)]
pub enum BlendSource {
    Camera(CameraId),
    /// A blend frozen mid-flight, acting as a camera
    Blend(Box<BlendState>),
}

impl BlendSource {
    /// Camera id when this side is a plain camera
    pub fn camera(&self) -> Option<CameraId> {
        match self {
            BlendSource::Camera(id) => Some(*id),
            BlendSource::Blend(_) => None,
        }
    }

    /// Nested blend when this side is a blend
    pub fn blend(&self) -> Option<&BlendState> {
        match self {
            BlendSource::Camera(_) => None,
            BlendSource::Blend(blend) => Some(blend),
        }
    }

    pub fn uses(&self, camera: CameraId) -> bool {
        match self {
            BlendSource::Camera(id) => *id == camera,
            BlendSource::Blend(blend) => blend.uses(camera),
        }
    }

    pub fn is_valid(&self, registry: &CameraRegistry) -> bool {
        match self {
            BlendSource::Camera(id) => registry.is_valid(*id),
            BlendSource::Blend(blend) => blend.is_valid(registry),
        }
    }

    pub fn state(&self, registry: &CameraRegistry) -> Option<CameraState> {
        match self {
            BlendSource::Camera(id) => registry.state(*id).cloned(),
            BlendSource::Blend(blend) => blend.state(registry),
        }
    }

    fn label(&self, registry: &CameraRegistry) -> String {
        match self {
            BlendSource::Camera(id) => registry.name(*id).unwrap_or("(deleted)").to_string(),
            BlendSource::Blend(_) => "mid-blend".to_string(),
        }
    }

    fn collect_cameras(&self, out: &mut SmallVec<[CameraId; 4]>) {
        match self {
            BlendSource::Camera(id) => {
                if !out.contains(id) {
                    out.push(*id);
                }
            }
            BlendSource::Blend(blend) => blend.collect_cameras(out),
        }
    }
}

impl From<CameraId> for BlendSource {
    fn from(id: CameraId) -> Self {
        BlendSource::Camera(id)
    }
}

impl From<BlendState> for BlendSource {
    fn from(blend: BlendState) -> Self {
        BlendSource::Blend(Box::new(blend))
    }
}

/// Timed interpolation between two sources
///
/// A blend with no `cam_a` is settled on `cam_b`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlendState {
    pub cam_a: Option<BlendSource>,
    pub cam_b: Option<BlendSource>,
    /// `None` for a cut
    pub curve: Option<BlendCurve>,
    pub duration: f32,
    pub time_in_blend: f32,
}

impl BlendState {
    pub fn new(
        cam_a: Option<BlendSource>,
        cam_b: Option<BlendSource>,
        curve: Option<BlendCurve>,
        duration: f32,
        time_in_blend: f32,
    ) -> Self {
        Self {
            cam_a,
            cam_b,
            curve,
            duration,
            time_in_blend,
        }
    }

    /// Blend resting on a single camera
    pub fn settled(camera: Option<CameraId>) -> Self {
        Self {
            cam_b: camera.map(BlendSource::Camera),
            ..Self::default()
        }
    }

    pub fn is_settled(&self) -> bool {
        self.cam_a.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.cam_a.is_none() || self.time_in_blend >= self.duration
    }

    /// Drop the outgoing side and the timer
    pub fn collapse(&mut self) {
        self.cam_a = None;
        self.curve = None;
        self.duration = 0.0;
        self.time_in_blend = 0.0;
    }

    /// Weight of `cam_b`, in `[0, 1]`
    pub fn blend_weight(&self) -> f32 {
        match &self.curve {
            Some(curve) if self.duration > 0.0 && !self.is_complete() => {
                curve.evaluate(self.time_in_blend / self.duration).clamp(0.0, 1.0)
            }
            _ => 1.0,
        }
    }

    /// True if either side references a valid camera
    pub fn is_valid(&self, registry: &CameraRegistry) -> bool {
        self.cam_a.as_ref().is_some_and(|s| s.is_valid(registry))
            || self.cam_b.as_ref().is_some_and(|s| s.is_valid(registry))
    }

    pub fn uses(&self, camera: CameraId) -> bool {
        self.cam_a.as_ref().is_some_and(|s| s.uses(camera))
            || self.cam_b.as_ref().is_some_and(|s| s.uses(camera))
    }

    /// Incoming camera, following `cam_b` through nested blends
    ///
    /// Resolves to `None` when that camera is gone.
    pub fn terminal_camera(&self, registry: &CameraRegistry) -> Option<CameraId> {
        let mut source = self.cam_b.as_ref()?;
        loop {
            match source {
                BlendSource::Camera(id) => return registry.is_valid(*id).then_some(*id),
                BlendSource::Blend(blend) => source = blend.cam_b.as_ref()?,
            }
        }
    }

    /// Blended pose
    ///
    /// A missing or invalid side contributes nothing; with both sides
    /// missing there is no pose.
    pub fn state(&self, registry: &CameraRegistry) -> Option<CameraState> {
        let a = self.cam_a.as_ref().and_then(|s| s.state(registry));
        let b = self.cam_b.as_ref().and_then(|s| s.state(registry));
        match (a, b) {
            (Some(a), Some(b)) => Some(CameraState::blend(&a, &b, self.blend_weight())),
            (Some(state), None) | (None, Some(state)) => Some(state),
            (None, None) => None,
        }
    }

    /// Every camera referenced anywhere in the blend, without duplicates
    pub fn cameras(&self) -> SmallVec<[CameraId; 4]> {
        let mut out = SmallVec::new();
        self.collect_cameras(&mut out);
        out
    }

    fn collect_cameras(&self, out: &mut SmallVec<[CameraId; 4]>) {
        if let Some(a) = &self.cam_a {
            a.collect_cameras(out);
        }
        if let Some(b) = &self.cam_b {
            b.collect_cameras(out);
        }
    }

    /// Human-readable summary, e.g. `"Closeup 40% from Wide"`
    pub fn description(&self, registry: &CameraRegistry) -> String {
        let Some(b) = &self.cam_b else {
            return "(none)".to_string();
        };
        let mut text = b.label(registry);
        if let Some(a) = &self.cam_a {
            let percent = (self.blend_weight() * 100.0).round() as i32;
            text.push_str(&format!(" {}% from ", percent));
            text.push_str(&a.label(registry));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cameras::FixedCamera;
    use crate::camera::CameraDesc;
    use vantage_core::Vec3;

    fn registry_with(names: &[(&str, f32)]) -> (CameraRegistry, Vec<CameraId>) {
        let mut registry = CameraRegistry::new();
        let ids = names
            .iter()
            .map(|(name, x)| {
                registry.spawn(
                    Box::new(FixedCamera::new(*name, CameraState::at(Vec3::new(*x, 0.0, 0.0)))),
                    CameraDesc::default(),
                )
            })
            .collect();
        (registry, ids)
    }

    #[test]
    fn test_weight_and_completion() {
        let (_, ids) = registry_with(&[("A", 0.0), ("B", 10.0)]);
        let mut blend = BlendState::new(
            Some(ids[0].into()),
            Some(ids[1].into()),
            Some(BlendCurve::Linear),
            2.0,
            0.5,
        );
        assert!(!blend.is_complete());
        assert!((blend.blend_weight() - 0.25).abs() < 1e-6);

        blend.time_in_blend = 2.0;
        assert!(blend.is_complete());
        assert_eq!(blend.blend_weight(), 1.0);

        blend.curve = None;
        blend.time_in_blend = 0.5;
        assert_eq!(blend.blend_weight(), 1.0);
    }

    #[test]
    fn test_state_interpolates() {
        let (registry, ids) = registry_with(&[("A", 0.0), ("B", 10.0)]);
        let blend = BlendState::new(
            Some(ids[0].into()),
            Some(ids[1].into()),
            Some(BlendCurve::Linear),
            1.0,
            0.3,
        );
        let state = blend.state(&registry).unwrap();
        assert!((state.position.x - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_missing_side_contributes_nothing() {
        let (mut registry, ids) = registry_with(&[("A", 0.0), ("B", 10.0)]);
        let blend = BlendState::new(
            Some(ids[0].into()),
            Some(ids[1].into()),
            Some(BlendCurve::Linear),
            1.0,
            0.3,
        );
        registry.destroy(ids[0]);
        assert_eq!(blend.state(&registry).unwrap().position.x, 10.0);

        registry.destroy(ids[1]);
        assert!(blend.state(&registry).is_none());
        assert!(!blend.is_valid(&registry));
    }

    #[test]
    fn test_nested_terminal_and_uses() {
        let (mut registry, ids) = registry_with(&[("A", 0.0), ("B", 5.0), ("C", 10.0)]);
        let inner = BlendState::new(
            Some(ids[0].into()),
            Some(ids[1].into()),
            Some(BlendCurve::Linear),
            1.0,
            0.5,
        );
        let outer = BlendState::new(
            Some(ids[2].into()),
            Some(inner.into()),
            Some(BlendCurve::Linear),
            1.0,
            0.5,
        );
        assert_eq!(outer.terminal_camera(&registry), Some(ids[1]));
        assert!(outer.uses(ids[0]));
        assert_eq!(outer.cameras().len(), 3);

        registry.destroy(ids[1]);
        assert_eq!(outer.terminal_camera(&registry), None);
    }

    #[test]
    fn test_description() {
        let (registry, ids) = registry_with(&[("Wide", 0.0), ("Closeup", 10.0)]);
        let blend = BlendState::new(
            Some(ids[0].into()),
            Some(ids[1].into()),
            Some(BlendCurve::Linear),
            1.0,
            0.4,
        );
        assert_eq!(blend.description(&registry), "Closeup 40% from Wide");
        assert_eq!(BlendState::settled(Some(ids[0])).description(&registry), "Wide");
        assert_eq!(BlendState::default().description(&registry), "(none)");
    }
}
