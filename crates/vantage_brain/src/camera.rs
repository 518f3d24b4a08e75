//! Camera source contract
//!
//! A camera source is anything that can produce a [`CameraState`] each tick.
//! The registry owns sources as `Box<dyn VirtualCamera>` and hands out
//! [`CameraId`] keys; a key stops resolving once its camera is destroyed.

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use vantage_core::{CameraState, Vec3};

new_key_type! {
    /// Weak handle to a camera owned by a [`CameraRegistry`](crate::CameraRegistry)
    pub struct CameraId;
}

/// Which host callback drives an update
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateClock {
    /// Physics step
    Fixed,
    /// End of frame
    #[default]
    Late,
}

/// How often a camera is simulated while it is not live
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StandbyUpdate {
    /// Only while live
    Never,
    /// At most one standby camera per pass, in rotation
    #[default]
    RoundRobin,
    /// Every pass
    Always,
}

/// Registration attributes of a camera
#[derive(Clone, Debug, PartialEq)]
pub struct CameraDesc {
    pub priority: i32,
    /// Render layer, 0..31
    pub layer: u8,
    /// Owning rig, if this camera is a child
    pub parent: Option<CameraId>,
    pub standby: StandbyUpdate,
}

impl Default for CameraDesc {
    fn default() -> Self {
        Self {
            priority: 10,
            layer: 0,
            parent: None,
            standby: StandbyUpdate::RoundRobin,
        }
    }
}

impl CameraDesc {
    pub fn new(priority: i32) -> Self {
        Self {
            priority,
            ..Self::default()
        }
    }

    pub fn on_layer(mut self, layer: u8) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_parent(mut self, parent: CameraId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_standby(mut self, standby: StandbyUpdate) -> Self {
        self.standby = standby;
        self
    }

    /// Bit of this camera's layer in a culling mask
    pub fn layer_mask(&self) -> u32 {
        1u32 << (self.layer & 31)
    }
}

/// A source of camera poses
///
/// Only [`name`](VirtualCamera::name), [`state`](VirtualCamera::state) and
/// [`update_camera_state`](VirtualCamera::update_camera_state) are required.
pub trait VirtualCamera {
    fn name(&self) -> &str;

    /// State produced by the last update
    fn state(&self) -> &CameraState;

    /// False once the source can no longer produce a state
    fn is_valid(&self) -> bool {
        true
    }

    /// Whether `child` is currently live inside this rig
    ///
    /// With `dominant_only`, only the child with the greatest blend weight
    /// counts.
    fn is_live_child(&self, _child: CameraId, _dominant_only: bool) -> bool {
        false
    }

    /// Advance the source by `dt` seconds
    ///
    /// A negative `dt` means "no history": snap to the target.
    fn update_camera_state(&mut self, world_up: Vec3, dt: f32);

    /// Called when this camera becomes the active camera of a brain
    fn on_transition_from_camera(&mut self, _from: Option<CameraId>, _world_up: Vec3, _dt: f32) {}

    /// One-time initialization, run before the first update
    fn ensure_started(&mut self) {}

    /// Clock the tracked target moves on
    fn target_update_clock(&self) -> UpdateClock {
        UpdateClock::Late
    }
}
