use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors from loading or validating a [`DispatchConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Thresholds and radii shared by the snapshot builder and the dispatch modules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Trigger value above which a squeeze starts an interaction.
    pub trigger_on_value: f32,
    /// Trigger value below which a running interaction ends.
    pub trigger_off_value: f32,
    /// Trigger value at which the debounced click engages.
    pub click_on_value: f32,
    /// Trigger value below which the debounced click releases.
    pub click_off_value: f32,
    /// Maximum length of the hand ray.
    pub pick_max_distance: f32,
    /// Radius of the per-hand proximity query.
    pub nearby_search_radius: f32,
    pub near_grab_radius: f32,
    pub near_trigger_radius: f32,
    pub equip_radius: f32,
    pub haptic_strength: f32,
    pub haptic_duration_ms: f32,
    /// Thumbstick deflection beyond which the teleporter starts aiming.
    pub teleport_deadzone: f32,
    /// Steepest surface, in degrees from straight up, the avatar may land on.
    pub teleport_max_slope_degrees: f32,
    /// Height of the avatar root above its feet.
    pub avatar_foot_offset: f32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            trigger_on_value: 0.5,
            trigger_off_value: 0.1,
            click_on_value: 0.9,
            click_off_value: 0.8,
            pick_max_distance: 500.0,
            nearby_search_radius: 1.0,
            near_grab_radius: 0.15,
            near_trigger_radius: 0.15,
            equip_radius: 0.25,
            haptic_strength: 1.0,
            haptic_duration_ms: 13.0,
            teleport_deadzone: 0.15,
            teleport_max_slope_degrees: 70.0,
            avatar_foot_offset: 0.5,
        }
    }
}

impl DispatchConfig {
    /// Parse and validate a config from YAML. Missing keys take defaults.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: DispatchConfig = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = [
            ("trigger_on_value", self.trigger_on_value),
            ("trigger_off_value", self.trigger_off_value),
            ("click_on_value", self.click_on_value),
            ("click_off_value", self.click_off_value),
            ("haptic_strength", self.haptic_strength),
            ("teleport_deadzone", self.teleport_deadzone),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within 0.0..=1.0, got {value}"
                )));
            }
        }
        if self.trigger_off_value >= self.trigger_on_value {
            return Err(ConfigError::Invalid(format!(
                "trigger_off_value ({}) must be below trigger_on_value ({})",
                self.trigger_off_value, self.trigger_on_value
            )));
        }
        if self.click_off_value >= self.click_on_value {
            return Err(ConfigError::Invalid(format!(
                "click_off_value ({}) must be below click_on_value ({})",
                self.click_off_value, self.click_on_value
            )));
        }
        let radii = [
            ("pick_max_distance", self.pick_max_distance),
            ("nearby_search_radius", self.nearby_search_radius),
            ("near_grab_radius", self.near_grab_radius),
            ("near_trigger_radius", self.near_trigger_radius),
            ("equip_radius", self.equip_radius),
            ("haptic_duration_ms", self.haptic_duration_ms),
        ];
        for (name, value) in radii {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")));
            }
        }
        if !(self.teleport_max_slope_degrees > 0.0 && self.teleport_max_slope_degrees <= 90.0) {
            return Err(ConfigError::Invalid(format!(
                "teleport_max_slope_degrees must be within (0, 90], got {}",
                self.teleport_max_slope_degrees
            )));
        }
        if !self.avatar_foot_offset.is_finite() || self.avatar_foot_offset < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "avatar_foot_offset must be finite and non-negative, got {}",
                self.avatar_foot_offset
            )));
        }
        Ok(())
    }
}
