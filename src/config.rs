//! Simulation configuration
//!
//! Configuration is loaded from multiple sources with the following priority (lowest to highest):
//! 1. `config/default.toml` (version controlled)
//! 2. `config/user.toml` (gitignored, user overrides)
//! 3. Environment variables (`STRIDER_SECTION__KEY`)

use figment::{providers::{Env, Format, Toml}, Figment};
use serde::{Deserialize, Serialize};
use std::path::Path;
use strider_physics::Character;

/// Main simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Physics configuration
    #[serde(default)]
    pub physics: PhysicsConfig,
    /// Character tunables
    #[serde(default)]
    pub character: CharacterConfig,
    /// Debug configuration
    #[serde(default)]
    pub debug: DebugConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            physics: PhysicsConfig::default(),
            character: CharacterConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl SimConfig {
    /// Load configuration from default locations
    ///
    /// Priority (lowest to highest):
    /// 1. `config/default.toml`
    /// 2. `config/user.toml`
    /// 3. Environment variables (`STRIDER_*`)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific config directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        let default_path = config_dir.join("default.toml");
        let user_path = config_dir.join("user.toml");

        let mut figment = Figment::new();

        if default_path.exists() {
            figment = figment.merge(Toml::file(&default_path));
        }
        if user_path.exists() {
            figment = figment.merge(Toml::file(&user_path));
        }

        // Environment variables override everything
        // STRIDER_PHYSICS__GRAVITY=-5000 -> physics.gravity = -5000
        figment = figment.merge(Env::prefixed("STRIDER_").split("__"));

        figment.extract().map_err(ConfigError::from)
    }
}

/// Physics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Gravity acceleration (negative = down), units per second squared
    pub gravity: f32,
    /// Global speed multiplier applied to every requested speed
    pub speed_mult: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: -6000.0,
            speed_mult: 31.5,
        }
    }
}

/// Character movement tunables, applied on spawn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterConfig {
    /// Body half-width (sideways radius)
    pub radius_x: f32,
    /// Body half-depth (facing radius)
    pub radius_y: f32,
    /// Standing body height
    pub height: f32,
    /// Steps up to this height need no step animation
    pub min_step_up_height: f32,
    /// Largest height a step-up can absorb
    pub max_step_up_height: f32,
    /// Largest ledge height reachable by climbing
    pub max_climb_height: f32,
    /// Falls beyond this drop the character into free fall
    pub fall_down_height: f32,
    /// Floor-normal vertical component below which the surface slides
    pub critical_slant_z_component: f32,
    /// Cosine bound deciding when a correction is a wall hit
    pub critical_wall_component: f32,
    /// Water depth at which walking becomes wading
    pub wade_depth: f32,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            radius_x: 128.0,
            radius_y: 128.0,
            height: 512.0,
            min_step_up_height: 128.0,
            max_step_up_height: 256.0,
            max_climb_height: 1920.0,
            fall_down_height: 320.0,
            critical_slant_z_component: 0.810,
            critical_wall_component: 0.707,
            wade_depth: 256.0,
        }
    }
}

impl CharacterConfig {
    /// Apply these tunables to a character
    pub fn configure(&self, ch: &mut Character) {
        ch.min_step_up_height = self.min_step_up_height;
        ch.max_step_up_height = self.max_step_up_height;
        ch.max_climb_height = self.max_climb_height;
        ch.fall_down_height = self.fall_down_height;
        ch.critical_slant_z_component = self.critical_slant_z_component;
        ch.critical_wall_component = self.critical_wall_component;
        ch.wade_depth = self.wade_depth;
    }
}

/// Debug configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Configuration error
#[derive(Debug)]
pub struct ConfigError {
    message: String,
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError {
            message: e.to_string(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert_eq!(config.physics.gravity, -6000.0);
        assert_eq!(config.character.height, 512.0);
        assert_eq!(config.character.max_step_up_height, 256.0);
    }

    #[test]
    fn test_config_serialization() {
        let config = SimConfig::default();
        let toml = toml::to_string(&config).unwrap();
        assert!(toml.contains("gravity"));
        assert!(toml.contains("max_climb_height"));
    }

    #[test]
    fn test_configure_character() {
        let mut config = CharacterConfig::default();
        config.max_step_up_height = 300.0;
        let mut ch = Character::new(strider_math::Vec3::ZERO, 128.0, 128.0, 512.0);
        config.configure(&mut ch);
        assert_eq!(ch.max_step_up_height, 300.0);
    }
}
