//! Brain configuration
//!
//! A brain is configured from TOML:
//!
//! ```toml
//! name = "main"
//! update_method = "smart"
//! blend_update_method = "late"
//!
//! [default_blend]
//! style = "ease_in_out"
//! time = 2.0
//!
//! [[custom_blends]]
//! from = "*"
//! to = "Closeup"
//! blend = { style = "cut" }
//! ```

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use vantage_core::{BlendCurve, CurveKey, Vec3};

/// Camera name that matches any camera in a custom blend entry
pub const ANY_CAMERA: &str = "*";

// =============================================================================
// Blend definitions
// =============================================================================

/// Shape of a transition between two cameras
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendStyle {
    /// Zero-length blend
    Cut,
    #[default]
    EaseInOut,
    EaseIn,
    EaseOut,
    HardIn,
    HardOut,
    Linear,
    /// Keyframed curve from [`BlendDefinition::custom_curve`]
    Custom,
}

/// Style and length of a blend
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlendDefinition {
    #[serde(default)]
    pub style: BlendStyle,
    /// Duration in seconds
    #[serde(default = "default_blend_time")]
    pub time: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_curve: Option<Vec<CurveKey>>,
}

fn default_blend_time() -> f32 {
    2.0
}

impl Default for BlendDefinition {
    fn default() -> Self {
        Self::new(BlendStyle::EaseInOut, default_blend_time())
    }
}

impl BlendDefinition {
    pub fn new(style: BlendStyle, time: f32) -> Self {
        Self {
            style,
            time,
            custom_curve: None,
        }
    }

    pub fn cut() -> Self {
        Self::new(BlendStyle::Cut, 0.0)
    }

    /// Keyframed blend; keys are validated when the curve is built
    pub fn custom(keys: Vec<CurveKey>, time: f32) -> Self {
        Self {
            style: BlendStyle::Custom,
            time,
            custom_curve: Some(keys),
        }
    }

    /// Curve for this blend, or `None` when it is a cut
    ///
    /// An invalid custom curve also yields `None`.
    pub fn curve(&self) -> Option<BlendCurve> {
        match self.style {
            BlendStyle::Cut => None,
            BlendStyle::EaseInOut => Some(BlendCurve::EaseInOut),
            BlendStyle::EaseIn => Some(BlendCurve::EaseIn),
            BlendStyle::EaseOut => Some(BlendCurve::EaseOut),
            BlendStyle::HardIn => Some(BlendCurve::HardIn),
            BlendStyle::HardOut => Some(BlendCurve::HardOut),
            BlendStyle::Linear => Some(BlendCurve::Linear),
            BlendStyle::Custom => self
                .custom_curve
                .as_ref()
                .and_then(|keys| BlendCurve::keyframes(keys.clone()).ok()),
        }
    }

    /// Blend length in seconds; cuts are always zero
    pub fn duration(&self) -> f32 {
        match self.style {
            BlendStyle::Cut => 0.0,
            _ => self.time.max(0.0),
        }
    }

    /// Whether this definition produces an actual blend
    pub fn is_blend(&self) -> bool {
        self.duration() > 0.0 && self.curve().is_some()
    }

    fn validate(&self, from: &str, to: &str) -> Result<()> {
        if !self.time.is_finite() || self.time < 0.0 {
            return Err(ConfigError::InvalidBlendTime {
                from: from.to_string(),
                to: to.to_string(),
                time: self.time,
            });
        }
        if self.style == BlendStyle::Custom {
            let keys = self.custom_curve.clone().ok_or_else(|| ConfigError::MissingCurve {
                from: from.to_string(),
                to: to.to_string(),
            })?;
            BlendCurve::keyframes(keys).map_err(|source| ConfigError::InvalidCurve {
                from: from.to_string(),
                to: to.to_string(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Blend used between two named cameras
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomBlend {
    /// Outgoing camera name, or `"*"`
    pub from: String,
    /// Incoming camera name, or `"*"`
    pub to: String,
    #[serde(default)]
    pub blend: BlendDefinition,
}

impl CustomBlend {
    pub fn new(from: impl Into<String>, to: impl Into<String>, blend: BlendDefinition) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            blend,
        }
    }
}

/// Pick the blend for a camera pair
///
/// Precedence: exact pair, then any-to-`to`, then `from`-to-any, then
/// any-to-any, then `default`. The first entry wins within each tier.
pub fn blend_for(
    blends: &[CustomBlend],
    from: &str,
    to: &str,
    default: &BlendDefinition,
) -> BlendDefinition {
    let mut any_to_me: Option<&BlendDefinition> = None;
    let mut me_to_any: Option<&BlendDefinition> = None;
    let mut any_to_any: Option<&BlendDefinition> = None;

    for entry in blends {
        if entry.from == from && entry.to == to {
            return entry.blend.clone();
        }
        if entry.from == ANY_CAMERA {
            if !to.is_empty() && entry.to == to {
                any_to_me.get_or_insert(&entry.blend);
            } else if entry.to == ANY_CAMERA {
                any_to_any.get_or_insert(&entry.blend);
            }
        } else if entry.to == ANY_CAMERA && entry.from == from {
            me_to_any.get_or_insert(&entry.blend);
        }
    }

    any_to_me
        .or(me_to_any)
        .or(any_to_any)
        .unwrap_or(default)
        .clone()
}

// =============================================================================
// Brain configuration
// =============================================================================

/// When cameras are simulated
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMethod {
    /// Physics step
    Fixed,
    /// End of frame
    Late,
    /// Per camera, on the clock its target moves on
    #[default]
    Smart,
    /// Only on explicit `manual_update` calls
    Manual,
}

/// When frame 0 advances and the pose is pushed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendUpdateMethod {
    Fixed,
    #[default]
    Late,
}

/// Per-output compositor settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrainConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub update_method: UpdateMethod,
    #[serde(default)]
    pub blend_update_method: BlendUpdateMethod,
    #[serde(default)]
    pub default_blend: BlendDefinition,
    #[serde(default)]
    pub custom_blends: Vec<CustomBlend>,
    /// Use unscaled time for camera updates
    #[serde(default)]
    pub ignore_time_scale: bool,
    /// Replaces [`Vec3::UP`] as the world up vector
    #[serde(default)]
    pub world_up: Option<Vec3>,
    /// Log the active camera or blend each time the pose is pushed
    #[serde(default)]
    pub show_debug_text: bool,
}

fn default_name() -> String {
    "brain".to_string()
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            update_method: UpdateMethod::default(),
            blend_update_method: BlendUpdateMethod::default(),
            default_blend: BlendDefinition::default(),
            custom_blends: Vec::new(),
            ignore_time_scale: false,
            world_up: None,
            show_debug_text: false,
        }
    }
}

impl BrainConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: BrainConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.default_blend.validate(ANY_CAMERA, ANY_CAMERA)?;
        for (index, entry) in self.custom_blends.iter().enumerate() {
            if entry.from.is_empty() || entry.to.is_empty() {
                return Err(ConfigError::EmptyCameraName(index));
            }
            entry.blend.validate(&entry.from, &entry.to)?;
        }
        Ok(())
    }

    pub fn with_default_blend(mut self, blend: BlendDefinition) -> Self {
        self.default_blend = blend;
        self
    }

    pub fn with_update_method(mut self, method: UpdateMethod) -> Self {
        self.update_method = method;
        self
    }

    pub fn with_blend_update_method(mut self, method: BlendUpdateMethod) -> Self {
        self.blend_update_method = method;
        self
    }

    pub fn with_custom_blend(mut self, blend: CustomBlend) -> Self {
        self.custom_blends.push(blend);
        self
    }

    /// Blend between two cameras by name, before any registry override
    pub fn lookup_blend(&self, from: &str, to: &str) -> BlendDefinition {
        blend_for(&self.custom_blends, from, to, &self.default_blend)
    }

    pub fn world_up(&self) -> Vec3 {
        self.world_up.unwrap_or(Vec3::UP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(time: f32) -> BlendDefinition {
        BlendDefinition::new(BlendStyle::Linear, time)
    }

    #[test]
    fn test_defaults() {
        let config = BrainConfig::default();
        assert_eq!(config.update_method, UpdateMethod::Smart);
        assert_eq!(config.blend_update_method, BlendUpdateMethod::Late);
        assert_eq!(config.default_blend.style, BlendStyle::EaseInOut);
        assert_eq!(config.default_blend.duration(), 2.0);
        assert_eq!(config.world_up(), Vec3::UP);
    }

    #[test]
    fn test_cut_has_no_curve() {
        let cut = BlendDefinition::new(BlendStyle::Cut, 3.0);
        assert!(cut.curve().is_none());
        assert_eq!(cut.duration(), 0.0);
        assert!(!cut.is_blend());
        assert!(linear(1.0).is_blend());
        assert!(!linear(0.0).is_blend());
    }

    #[test]
    fn test_wildcard_precedence() {
        let blends = vec![
            CustomBlend::new("*", "*", linear(4.0)),
            CustomBlend::new("A", "*", linear(3.0)),
            CustomBlend::new("*", "B", linear(2.0)),
            CustomBlend::new("A", "B", linear(1.0)),
        ];
        let default = BlendDefinition::cut();

        assert_eq!(blend_for(&blends, "A", "B", &default).time, 1.0);
        assert_eq!(blend_for(&blends, "C", "B", &default).time, 2.0);
        assert_eq!(blend_for(&blends, "A", "C", &default).time, 3.0);
        assert_eq!(blend_for(&blends, "C", "D", &default).time, 4.0);
        assert_eq!(blend_for(&blends[3..], "C", "D", &default), default);
    }

    #[test]
    fn test_first_entry_wins_within_tier() {
        let blends = vec![
            CustomBlend::new("*", "B", linear(2.0)),
            CustomBlend::new("*", "B", linear(5.0)),
        ];
        assert_eq!(blend_for(&blends, "A", "B", &BlendDefinition::cut()).time, 2.0);
    }

    #[test]
    fn test_parse_config() {
        let config = BrainConfig::from_toml_str(
            r#"
            name = "main"
            update_method = "late"
            show_debug_text = true
            world_up = [0.0, 0.0, 1.0]

            [default_blend]
            style = "linear"
            time = 0.5

            [[custom_blends]]
            from = "*"
            to = "Closeup"
            blend = { style = "cut" }

            [[custom_blends]]
            from = "Wide"
            to = "Tracking"

            [custom_blends.blend]
            style = "custom"
            time = 1.0
            custom_curve = [
                { time = 0.0, value = 0.0 },
                { time = 1.0, value = 1.0 },
            ]
            "#,
        )
        .unwrap();

        assert_eq!(config.name, "main");
        assert_eq!(config.update_method, UpdateMethod::Late);
        assert_eq!(config.world_up(), Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(config.lookup_blend("Wide", "Closeup").style, BlendStyle::Cut);
        assert_eq!(config.lookup_blend("Wide", "Other").time, 0.5);
        assert!(config.lookup_blend("Wide", "Tracking").curve().is_some());
    }

    #[test]
    fn test_rejects_bad_custom_curve() {
        let err = BrainConfig::from_toml_str(
            r#"
            [[custom_blends]]
            from = "A"
            to = "B"
            blend = { style = "custom", custom_curve = [{ time = 0.0, value = 0.0 }] }
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCurve { .. }));

        let err = BrainConfig::from_toml_str(
            r#"
            [[custom_blends]]
            from = "A"
            to = "B"
            blend = { style = "custom" }
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingCurve { .. }));
    }

    #[test]
    fn test_rejects_negative_time_and_empty_names() {
        let config = BrainConfig::default().with_default_blend(linear(-1.0));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBlendTime { .. })
        ));

        let config = BrainConfig::default().with_custom_blend(CustomBlend::new("", "B", linear(1.0)));
        assert!(matches!(config.validate(), Err(ConfigError::EmptyCameraName(0))));
    }

    #[test]
    fn test_parse_error() {
        let err = BrainConfig::from_toml_str("update_method = \"sometimes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
