//! Interpolatable value types
//!
//! Traits for values that can be blended between two cameras.

use crate::math::{Quat, Vec3};

/// Trait for values that can be linearly interpolated
pub trait Interpolate: Clone {
    /// Linearly interpolate between self and other by factor t (0.0 to 1.0)
    fn lerp(&self, other: &Self, t: f32) -> Self;

    /// Check if two values are approximately equal
    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool;
}

/// Trait for values that use spherical interpolation (quaternions)
pub trait SphericalInterpolate: Clone {
    /// Spherically interpolate between self and other by factor t (0.0 to 1.0)
    fn slerp(&self, other: &Self, t: f32) -> Self;

    /// Check if two values are approximately equal
    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool;
}

impl Interpolate for f32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }

    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        (self - other).abs() < epsilon
    }
}

impl Interpolate for Vec3 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Vec3::new(
            Interpolate::lerp(&self.x, &other.x, t),
            Interpolate::lerp(&self.y, &other.y, t),
            Interpolate::lerp(&self.z, &other.z, t),
        )
    }

    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        Interpolate::approx_eq(&self.x, &other.x, epsilon)
            && Interpolate::approx_eq(&self.y, &other.y, epsilon)
            && Interpolate::approx_eq(&self.z, &other.z, epsilon)
    }
}

impl SphericalInterpolate for Quat {
    fn slerp(&self, other: &Self, t: f32) -> Self {
        Quat::slerp(self, *other, t)
    }

    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.angle_to(*other) < epsilon
    }
}
