//! Scenario files
//!
//! A scenario describes a brain, a set of fixed cameras and a timeline of
//! actions:
//!
//! ```toml
//! [brain]
//! update_method = "late"
//! default_blend = { style = "ease_in_out", time = 1.0 }
//!
//! [run]
//! frame_rate = 30.0
//! duration = 3.0
//!
//! [[cameras]]
//! name = "Wide"
//! priority = 10
//! position = [0.0, 5.0, 10.0]
//! look_at = [0.0, 0.0, 0.0]
//!
//! [[actions]]
//! at = 1.0
//! action = "priority"
//! camera = "Wide"
//! priority = 30
//! ```

use anyhow::{Context, Result};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use vantage_brain::{BrainConfig, StandbyUpdate, UpdateClock};
use vantage_core::{CameraState, LensSettings, Quat, Vec3};

#[derive(Debug, Deserialize, Serialize)]
pub struct Scenario {
    #[serde(default)]
    pub brain: BrainConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub cameras: Vec<CameraConfig>,
    #[serde(default)]
    pub actions: Vec<TimedAction>,
}

/// Host loop settings
#[derive(Debug, Deserialize, Serialize)]
pub struct RunConfig {
    /// Rendered frames per second
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f32,
    /// Physics steps per second
    #[serde(default = "default_fixed_rate")]
    pub fixed_rate: f32,
    /// Simulated seconds
    #[serde(default = "default_duration")]
    pub duration: f32,
    #[serde(default = "default_time_scale")]
    pub time_scale: f32,
    /// Print every n-th frame
    #[serde(default = "default_print_every")]
    pub print_every: u32,
}

fn default_frame_rate() -> f32 {
    60.0
}

fn default_fixed_rate() -> f32 {
    50.0
}

fn default_duration() -> f32 {
    5.0
}

fn default_time_scale() -> f32 {
    1.0
}

fn default_print_every() -> u32 {
    1
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            fixed_rate: default_fixed_rate(),
            duration: default_duration(),
            time_scale: default_time_scale(),
            print_every: default_print_every(),
        }
    }
}

impl RunConfig {
    pub fn frame_count(&self) -> u64 {
        (self.duration * self.frame_rate).ceil().max(0.0) as u64
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CameraConfig {
    pub name: String,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub layer: u8,
    /// Name of the owning rig
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub standby: StandbyUpdate,
    /// Clock the camera's target moves on
    #[serde(default)]
    pub clock: UpdateClock,
    /// Whether the camera competes for priority from the start
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub look_at: Option<Vec3>,
    #[serde(default)]
    pub velocity: Vec3,
    #[serde(default)]
    pub lens: LensSettings,
}

fn default_priority() -> i32 {
    10
}

fn default_active() -> bool {
    true
}

impl CameraConfig {
    pub fn initial_state(&self) -> CameraState {
        let orientation = match self.look_at {
            Some(target) => Quat::look_rotation((target - self.position).normalize(), Vec3::UP),
            None => Quat::IDENTITY,
        };
        CameraState::at(self.position)
            .with_orientation(orientation)
            .with_lens(self.lens.clone())
    }
}

/// Action applied once simulated time reaches `at`
#[derive(Debug, Deserialize, Serialize)]
pub struct TimedAction {
    pub at: f32,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Activate {
        camera: String,
    },
    Deactivate {
        camera: String,
    },
    Priority {
        camera: String,
        priority: i32,
    },
    /// Push or update an override layer
    Override {
        /// Scenario-local layer id
        id: i32,
        #[serde(default)]
        from: Option<String>,
        #[serde(default)]
        to: Option<String>,
        #[serde(default = "default_weight")]
        weight: f32,
    },
    Release {
        id: i32,
    },
    Solo {
        camera: String,
    },
    Unsolo,
}

fn default_weight() -> f32 {
    1.0
}

impl Action {
    /// Camera names this action refers to
    fn cameras(&self) -> Vec<&str> {
        match self {
            Action::Activate { camera }
            | Action::Deactivate { camera }
            | Action::Priority { camera, .. }
            | Action::Solo { camera } => vec![camera.as_str()],
            Action::Override { from, to, .. } => {
                from.iter().chain(to.iter()).map(String::as_str).collect()
            }
            Action::Release { .. } | Action::Unsolo => Vec::new(),
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("Invalid scenario {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(content)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<()> {
        self.brain.validate()?;

        let run = &self.run;
        if !(run.frame_rate > 0.0 && run.fixed_rate > 0.0) {
            anyhow::bail!("frame_rate and fixed_rate must be positive");
        }
        if !(run.duration >= 0.0 && run.time_scale >= 0.0) {
            anyhow::bail!("duration and time_scale must not be negative");
        }

        let mut names = FxHashSet::default();
        for camera in &self.cameras {
            if camera.layer > 31 {
                anyhow::bail!("camera '{}' is on layer {}, expected 0..=31", camera.name, camera.layer);
            }
            if !names.insert(camera.name.as_str()) {
                anyhow::bail!("duplicate camera name '{}'", camera.name);
            }
        }
        for camera in &self.cameras {
            if let Some(parent) = &camera.parent {
                if !names.contains(parent.as_str()) {
                    anyhow::bail!("camera '{}' has unknown parent '{}'", camera.name, parent);
                }
            }
        }
        for timed in &self.actions {
            for name in timed.action.cameras() {
                if !names.contains(name) {
                    anyhow::bail!("action at {}s refers to unknown camera '{}'", timed.at, name);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
        [brain]
        update_method = "late"
        default_blend = { style = "linear", time = 1.0 }

        [run]
        frame_rate = 10.0
        duration = 2.0

        [[cameras]]
        name = "Wide"
        position = [0.0, 5.0, 10.0]
        look_at = [0.0, 0.0, 0.0]

        [[cameras]]
        name = "Closeup"
        priority = 5
        position = [0.0, 1.0, 2.0]

        [[actions]]
        at = 0.5
        action = "priority"
        camera = "Closeup"
        priority = 20

        [[actions]]
        at = 1.0
        action = "override"
        id = 1
        to = "Wide"
        weight = 0.5

        [[actions]]
        at = 1.5
        action = "unsolo"
    "#;

    #[test]
    fn test_parse_scenario() {
        let scenario = Scenario::from_toml_str(SCENARIO).unwrap();
        assert_eq!(scenario.run.frame_count(), 20);
        assert_eq!(scenario.run.fixed_rate, 50.0);
        assert_eq!(scenario.cameras.len(), 2);
        assert_eq!(scenario.cameras[0].priority, 10);
        assert!(scenario.cameras[0].active);
        assert_eq!(
            scenario.actions[0].action,
            Action::Priority {
                camera: "Closeup".to_string(),
                priority: 20
            }
        );
        assert_eq!(
            scenario.actions[1].action,
            Action::Override {
                id: 1,
                from: None,
                to: Some("Wide".to_string()),
                weight: 0.5
            }
        );
        assert_eq!(scenario.actions[2].action, Action::Unsolo);
    }

    #[test]
    fn test_look_at_orientation() {
        let scenario = Scenario::from_toml_str(SCENARIO).unwrap();
        let state = scenario.cameras[0].initial_state();
        let forward = state.orientation.forward();
        let expected = (Vec3::ZERO - Vec3::new(0.0, 5.0, 10.0)).normalize();
        assert!(forward.distance(expected) < 1e-4);
        assert_eq!(scenario.cameras[1].initial_state().orientation, Quat::IDENTITY);
    }

    #[test]
    fn test_rejects_unknown_camera() {
        let err = Scenario::from_toml_str(
            r#"
            [[cameras]]
            name = "A"

            [[actions]]
            at = 1.0
            action = "solo"
            camera = "B"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown camera 'B'"));
    }

    #[test]
    fn test_rejects_duplicates_and_bad_parents() {
        let err = Scenario::from_toml_str(
            r#"
            [[cameras]]
            name = "A"
            [[cameras]]
            name = "A"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));

        let err = Scenario::from_toml_str(
            r#"
            [[cameras]]
            name = "A"
            parent = "Rig"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown parent"));
    }

    #[test]
    fn test_demo_scenario_is_valid() {
        let scenario = Scenario::from_toml_str(include_str!("../../../demos/handoff.toml")).unwrap();
        assert_eq!(scenario.brain.custom_blends.len(), 3);
        assert_eq!(scenario.cameras.len(), 4);
        assert!(!scenario.cameras[3].active);
        assert_eq!(scenario.cameras[0].lens.field_of_view, 50.0);
        assert_eq!(scenario.run.frame_count(), 240);
    }

    #[test]
    fn test_rejects_bad_run_settings() {
        let err = Scenario::from_toml_str("[run]\nframe_rate = 0.0\n").unwrap_err();
        assert!(err.to_string().contains("positive"));
    }
}
