//! Movement tuning and session configuration.
//!
//! All movement constants are per logical tick (the step has no `dt`). The
//! defaults are the tuning the Play experience shipped with; a JSON file can
//! override any subset of them.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_ENV_VAR: &str = "BLOX_PLAY_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "assets/config/play.json";

/// Health never exceeds this, whatever the config asks for.
pub const MAX_HEALTH: u32 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config JSON {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("config validation failed: {0}")]
    Invalid(String),
}

/// Debug overrides a player can toggle from the script console.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub fly: bool,
    pub noclip: bool,
    pub infinite_jump: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Added to vz every tick (negative is down).
    pub gravity: f32,
    /// Horizontal velocity multiplier applied every tick, in (0, 1).
    pub friction: f32,
    /// Velocity added per tick per held direction while grounded.
    pub move_accel: f32,
    /// Fraction of `move_accel` available while airborne.
    pub air_control: f32,
    pub sprint_multiplier: f32,
    pub jump_impulse: f32,
    pub max_horizontal_speed: f32,
    /// Terminal fall speed. Kept below the landing band height so a falling
    /// player cannot skip over a surface in one tick.
    pub max_fall_speed: f32,
    /// Horizontal margin added to each object's half-size.
    pub player_radius: f32,
    /// Used only for side collisions.
    pub player_height: f32,
    /// Landing band below an object's top surface.
    pub land_below: f32,
    /// Landing band above an object's top surface.
    pub land_above: f32,
    pub hazard_damage: u32,
    pub max_health: u32,
    /// Spawn and respawn height above the spawn object's centre.
    pub respawn_height: f32,
    /// Fall-through plane used when the world does not set its own.
    pub kill_z: f32,
    /// Vertical and horizontal speed while flying.
    pub fly_speed: f32,
    pub modifiers: Modifiers,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            gravity: -0.012,
            friction: 0.82,
            move_accel: 0.06,
            air_control: 0.8,
            sprint_multiplier: 1.8,
            jump_impulse: 0.42,
            max_horizontal_speed: 0.3,
            max_fall_speed: 1.2,
            player_radius: 0.45,
            player_height: 1.8,
            land_below: 0.5,
            land_above: 0.8,
            hazard_damage: 2,
            max_health: MAX_HEALTH,
            respawn_height: 5.0,
            kill_z: -15.0,
            fly_speed: 0.4,
            modifiers: Modifiers::default(),
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.friction > 0.0 && self.friction < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "friction must be in (0, 1), got {}",
                self.friction
            )));
        }
        if !self.gravity.is_finite() || self.gravity >= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "gravity must be negative, got {}",
                self.gravity
            )));
        }
        let positive = [
            ("move_accel", self.move_accel),
            ("jump_impulse", self.jump_impulse),
            ("max_horizontal_speed", self.max_horizontal_speed),
            ("max_fall_speed", self.max_fall_speed),
            ("sprint_multiplier", self.sprint_multiplier),
            ("fly_speed", self.fly_speed),
            ("player_height", self.player_height),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be > 0, got {value}"
                )));
            }
        }
        if self.player_radius < 0.0 || self.land_below < 0.0 || self.land_above < 0.0 {
            return Err(ConfigError::Invalid(
                "player_radius and landing band must not be negative".to_string(),
            ));
        }
        if !(1..=MAX_HEALTH).contains(&self.max_health) {
            return Err(ConfigError::Invalid(format!(
                "max_health must be in 1..={MAX_HEALTH}, got {}",
                self.max_health
            )));
        }
        if self.max_fall_speed > self.land_below + self.land_above {
            log::warn!(
                "max_fall_speed {} exceeds landing band {}; fast falls may pass through thin tops",
                self.max_fall_speed,
                self.land_below + self.land_above
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlayConfig {
    /// Logical ticks per second, independent of display refresh.
    pub tick_rate_hz: f64,
    /// Longest wall-clock frame the clock will catch up on, in seconds.
    pub max_accumulator: f64,
    pub controller: ControllerConfig,
}

impl Default for PlayConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60.0,
            max_accumulator: 0.25,
            controller: ControllerConfig::default(),
        }
    }
}

impl PlayConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tick_rate_hz.is_finite() || self.tick_rate_hz <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "tick_rate_hz must be > 0, got {}",
                self.tick_rate_hz
            )));
        }
        if !self.max_accumulator.is_finite() || self.max_accumulator <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "max_accumulator must be > 0, got {}",
                self.max_accumulator
            )));
        }
        self.controller.validate()
    }

    /// Resolve the config path from an explicit argument, then the
    /// `BLOX_PLAY_CONFIG` env var, then the default asset path. A missing file
    /// at the default path yields defaults; a missing explicit file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return load_config_from_path(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return load_config_from_path(Path::new(&path));
        }
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            load_config_from_path(default_path)
        } else {
            log::info!("No config at {}, using defaults", default_path.display());
            Ok(Self::default())
        }
    }
}

pub fn load_config_from_path(path: &Path) -> Result<PlayConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: PlayConfig = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}
