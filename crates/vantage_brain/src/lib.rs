//! Vantage camera arbitration
//!
//! Many camera sources compete for one output. The [`CameraRegistry`] owns
//! them and keeps them sorted by priority; each [`Brain`] picks the
//! highest-priority camera its output can see, blends toward it, layers
//! externally authored overrides on top and pushes the final pose to a
//! [`CameraOutput`].
//!
//! # Features
//!
//! - **Priority arbitration**: highest priority wins, most recent activation
//!   breaks ties
//! - **Nested blends**: interrupting a blend keeps its in-flight pose
//! - **Override layers**: sequencers can drive a brain without touching
//!   camera priorities
//! - **Update scheduling**: cameras are simulated leaves first, at most once
//!   per tick, on the clock their targets move on
//! - **Blend table**: per camera-pair blends with `"*"` wildcards, loaded
//!   from TOML
//!
//! # Example
//!
//! ```
//! use vantage_brain::{Brain, BrainConfig, CameraDesc, CameraRegistry, FixedCamera, FrameTime};
//! use vantage_core::{CameraState, Vec3};
//!
//! let mut registry = CameraRegistry::new();
//! let wide = registry.spawn(
//!     Box::new(FixedCamera::new("Wide", CameraState::at(Vec3::new(0.0, 5.0, 10.0)))),
//!     CameraDesc::new(10),
//! );
//! let closeup = registry.spawn(
//!     Box::new(FixedCamera::new("Closeup", CameraState::at(Vec3::new(0.0, 1.5, 2.0)))),
//!     CameraDesc::new(5),
//! );
//!
//! let mut brain = Brain::new(&mut registry, BrainConfig::default());
//! brain.late_update(&mut registry, &FrameTime::new(1, 0.1, 0.1));
//! assert_eq!(brain.active_camera(&registry), Some(wide));
//!
//! registry.set_priority(closeup, 20);
//! brain.late_update(&mut registry, &FrameTime::new(2, 0.2, 0.1));
//! assert_eq!(brain.active_camera(&registry), Some(closeup));
//! assert!(brain.is_blending(&registry));
//! ```

pub mod blend;
pub mod brain;
pub mod camera;
pub mod cameras;
pub mod config;
pub mod error;
pub mod events;
pub mod frame_stack;
pub mod output;
pub mod registry;
pub mod time;

#[cfg(test)]
pub(crate) mod testing;

pub use blend::{BlendSource, BlendState};
pub use brain::Brain;
pub use camera::{CameraDesc, CameraId, StandbyUpdate, UpdateClock, VirtualCamera};
pub use cameras::FixedCamera;
pub use config::{
    blend_for, BlendDefinition, BlendStyle, BlendUpdateMethod, BrainConfig, CustomBlend, UpdateMethod,
    ANY_CAMERA,
};
pub use error::{ConfigError, Result};
pub use events::{BrainEvent, EventListener, EventListeners};
pub use frame_stack::{Frame, Frame0Transition, FrameStack};
pub use output::{CameraOutput, OutputPose, SharedOutput};
pub use registry::{BlendOverrideHook, BrainId, CameraRegistry, UpdateFilter};
pub use time::{FrameTime, SimClock, SimStep, TimeOverrides, DEFAULT_FIXED_DELTA_TIME};
