//! Vantage Core
//!
//! Value types shared by every Vantage crate:
//!
//! - **Math**: [`Vec3`] and [`Quat`] with the handful of operations camera
//!   blending needs
//! - **Camera state**: [`CameraState`], the pose + lens a camera produces each tick,
//!   with per-field [`BlendHints`]
//! - **Interpolation**: [`Interpolate`] / [`SphericalInterpolate`] for blending states
//! - **Blend curves**: [`BlendCurve`] easing shapes evaluated over `[0, 1]`
//!
//! # Example
//!
//! ```rust
//! use vantage_core::{BlendCurve, CameraState, Vec3};
//!
//! let a = CameraState::at(Vec3::new(0.0, 0.0, 0.0));
//! let b = CameraState::at(Vec3::new(10.0, 0.0, 0.0));
//!
//! let weight = BlendCurve::Linear.evaluate(0.25);
//! let mid = CameraState::blend(&a, &b, weight);
//! assert!((mid.position.x - 2.5).abs() < 1e-5);
//! ```

pub mod easing;
pub mod error;
pub mod interpolate;
pub mod math;
pub mod state;

pub use easing::{BlendCurve, CurveKey};
pub use error::{CurveError, Result};
pub use interpolate::{Interpolate, SphericalInterpolate};
pub use math::{Quat, Vec3};
pub use state::{BlendHints, CameraState, LensSettings};
