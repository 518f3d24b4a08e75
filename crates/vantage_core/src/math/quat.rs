//! Quaternion for camera orientation

use super::Vec3;
use serde::{Deserialize, Serialize};

/// Quaternion for representing camera rotations
///
/// Quaternions avoid gimbal lock and interpolate smoothly, which is what
/// orientation blending between two cameras relies on.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    /// Identity quaternion (no rotation)
    pub const IDENTITY: Quat = Quat {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Create from axis-angle representation
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let len = axis.length();
        if len < 1e-6 {
            return Self::IDENTITY;
        }
        let (s, c) = (angle * 0.5).sin_cos();
        let axis = axis * (1.0 / len);
        Self::new(axis.x * s, axis.y * s, axis.z * s, c)
    }

    /// Create from yaw (around Y), pitch (around X) and roll (around Z), in radians
    ///
    /// Applied in Y, X, Z order, which keeps the horizon level for
    /// pure yaw/pitch camera rotations.
    pub fn from_euler_yxz(yaw: f32, pitch: f32, roll: f32) -> Self {
        let y = Self::from_axis_angle(Vec3::UP, yaw);
        let x = Self::from_axis_angle(Vec3::RIGHT, pitch);
        let z = Self::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), roll);
        y * x * z
    }

    /// Rotation whose forward (-Z) axis points along `forward`
    pub fn look_rotation(forward: Vec3, up: Vec3) -> Self {
        let back = (-forward).normalize();
        if back == Vec3::ZERO {
            return Self::IDENTITY;
        }
        let mut right = up.cross(back);
        if right.length() < 1e-6 {
            // forward is parallel to up
            let helper = if back.z.abs() < 0.9 {
                Vec3::new(0.0, 0.0, 1.0)
            } else {
                Vec3::RIGHT
            };
            right = helper.cross(back);
        }
        let right = right.normalize();
        let true_up = back.cross(right);

        let (m00, m01, m02) = (right.x, true_up.x, back.x);
        let (m10, m11, m12) = (right.y, true_up.y, back.y);
        let (m20, m21, m22) = (right.z, true_up.z, back.z);

        let trace = m00 + m11 + m22;
        let q = if trace > 0.0 {
            let s = 0.5 / (trace + 1.0).sqrt();
            Self::new((m21 - m12) * s, (m02 - m20) * s, (m10 - m01) * s, 0.25 / s)
        } else if m00 > m11 && m00 > m22 {
            let s = 2.0 * (1.0 + m00 - m11 - m22).sqrt();
            Self::new(0.25 * s, (m01 + m10) / s, (m02 + m20) / s, (m21 - m12) / s)
        } else if m11 > m22 {
            let s = 2.0 * (1.0 + m11 - m00 - m22).sqrt();
            Self::new((m01 + m10) / s, 0.25 * s, (m12 + m21) / s, (m02 - m20) / s)
        } else {
            let s = 2.0 * (1.0 + m22 - m00 - m11).sqrt();
            Self::new((m02 + m20) / s, (m12 + m21) / s, 0.25 * s, (m10 - m01) / s)
        };
        q.normalize()
    }

    pub fn normalize(&self) -> Self {
        let len = self.dot(*self).sqrt();
        if len < 1e-6 {
            return Self::IDENTITY;
        }
        let inv = 1.0 / len;
        Self::new(self.x * inv, self.y * inv, self.z * inv, self.w * inv)
    }

    /// Inverse for unit quaternions
    pub fn conjugate(&self) -> Self {
        Self::new(-self.x, -self.y, -self.z, self.w)
    }

    pub fn dot(&self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    /// Hamilton product
    pub fn multiply(&self, other: &Self) -> Self {
        Self {
            x: self.w * other.x + self.x * other.w + self.y * other.z - self.z * other.y,
            y: self.w * other.y - self.x * other.z + self.y * other.w + self.z * other.x,
            z: self.w * other.z + self.x * other.y - self.y * other.x + self.z * other.w,
            w: self.w * other.w - self.x * other.x - self.y * other.y - self.z * other.z,
        }
    }

    pub fn rotate_vec3(&self, v: Vec3) -> Vec3 {
        let qv = Self::new(v.x, v.y, v.z, 0.0);
        let r = self.multiply(&qv).multiply(&self.conjugate());
        Vec3::new(r.x, r.y, r.z)
    }

    /// Direction the rotation points a camera at
    pub fn forward(&self) -> Vec3 {
        self.rotate_vec3(Vec3::FORWARD)
    }

    /// Spherical linear interpolation along the shorter arc
    pub fn slerp(&self, other: Self, t: f32) -> Self {
        let mut cos_half = self.dot(other);
        let mut b = other;
        if cos_half < 0.0 {
            b = Self::new(-b.x, -b.y, -b.z, -b.w);
            cos_half = -cos_half;
        }

        // Nearly parallel: fall back to normalized lerp
        if cos_half > 0.9995 {
            return Self::new(
                self.x + t * (b.x - self.x),
                self.y + t * (b.y - self.y),
                self.z + t * (b.z - self.z),
                self.w + t * (b.w - self.w),
            )
            .normalize();
        }

        let half = cos_half.acos();
        let sin_half = (1.0 - cos_half * cos_half).sqrt();
        let ra = ((1.0 - t) * half).sin() / sin_half;
        let rb = (t * half).sin() / sin_half;

        Self::new(
            self.x * ra + b.x * rb,
            self.y * ra + b.y * rb,
            self.z * ra + b.z * rb,
            self.w * ra + b.w * rb,
        )
    }

    /// Angle between two rotations in radians
    pub fn angle_to(&self, other: Self) -> f32 {
        let d = self.dot(other).abs().min(1.0);
        2.0 * d.acos()
    }
}

impl std::ops::Mul for Quat {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        self.multiply(&rhs)
    }
}

impl From<[f32; 4]> for Quat {
    fn from(q: [f32; 4]) -> Self {
        Self::new(q[0], q[1], q[2], q[3])
    }
}

impl From<Quat> for [f32; 4] {
    fn from(q: Quat) -> Self {
        [q.x, q.y, q.z, q.w]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn assert_vec_eq(a: Vec3, b: Vec3) {
        assert!((a.x - b.x).abs() < 1e-4, "{a:?} != {b:?}");
        assert!((a.y - b.y).abs() < 1e-4, "{a:?} != {b:?}");
        assert!((a.z - b.z).abs() < 1e-4, "{a:?} != {b:?}");
    }

    #[test]
    fn test_identity_forward() {
        assert_vec_eq(Quat::IDENTITY.forward(), Vec3::FORWARD);
    }

    #[test]
    fn test_axis_angle_rotation() {
        let q = Quat::from_axis_angle(Vec3::UP, PI / 2.0);
        assert_vec_eq(q.rotate_vec3(Vec3::RIGHT), Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_look_rotation_points_forward() {
        let dir = Vec3::new(1.0, 0.0, -1.0).normalize();
        let q = Quat::look_rotation(dir, Vec3::UP);
        assert_vec_eq(q.forward(), dir);

        let identity = Quat::look_rotation(Vec3::FORWARD, Vec3::UP);
        assert!(identity.angle_to(Quat::IDENTITY) < 1e-3);
    }

    #[test]
    fn test_slerp_halfway() {
        let a = Quat::IDENTITY;
        let b = Quat::from_axis_angle(Vec3::UP, PI / 2.0);
        let mid = a.slerp(b, 0.5);
        assert!((mid.angle_to(a) - PI / 4.0).abs() < 1e-3);
        assert!((mid.angle_to(b) - PI / 4.0).abs() < 1e-3);
    }

    #[test]
    fn test_euler_yaw_matches_axis_angle() {
        let a = Quat::from_euler_yxz(0.3, 0.0, 0.0);
        let b = Quat::from_axis_angle(Vec3::UP, 0.3);
        assert!(a.angle_to(b) < 1e-4);
    }
}
