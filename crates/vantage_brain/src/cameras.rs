//! Built-in camera sources

use crate::camera::{UpdateClock, VirtualCamera};
use vantage_core::{CameraState, Vec3};

/// Camera with a fixed pose, optionally drifting at a constant velocity
#[derive(Clone, Debug)]
pub struct FixedCamera {
    name: String,
    state: CameraState,
    velocity: Vec3,
    clock: UpdateClock,
    valid: bool,
}

impl FixedCamera {
    pub fn new(name: impl Into<String>, state: CameraState) -> Self {
        Self {
            name: name.into(),
            state,
            velocity: Vec3::ZERO,
            clock: UpdateClock::Late,
            valid: true,
        }
    }

    /// Units per second added to the position on each update
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Clock reported to the adaptive update mode
    pub fn on_clock(mut self, clock: UpdateClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn set_state(&mut self, state: CameraState) {
        self.state = state;
    }

    /// Mark the camera as unable to produce a state
    pub fn invalidate(&mut self) {
        self.valid = false;
    }
}

impl VirtualCamera for FixedCamera {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> &CameraState {
        &self.state
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn update_camera_state(&mut self, _world_up: Vec3, dt: f32) {
        if dt > 0.0 {
            self.state.position = self.state.position + self.velocity * dt;
        }
    }

    fn target_update_clock(&self) -> UpdateClock {
        self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drift() {
        let mut camera = FixedCamera::new("drift", CameraState::at(Vec3::ZERO))
            .with_velocity(Vec3::new(2.0, 0.0, 0.0));
        camera.update_camera_state(Vec3::UP, 0.5);
        assert_eq!(camera.state().position, Vec3::new(1.0, 0.0, 0.0));

        // No history: stay put
        camera.update_camera_state(Vec3::UP, -1.0);
        assert_eq!(camera.state().position, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_invalidate() {
        let mut camera = FixedCamera::new("gone", CameraState::default());
        assert!(camera.is_valid());
        camera.invalidate();
        assert!(!camera.is_valid());
    }
}
