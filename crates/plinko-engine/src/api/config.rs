use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::api::error::ConfigError;
use crate::board::layout::BoardDimensions;
use crate::core::physics::ColliderMaterial;

/// Engine configuration. Every field has a default, so a JSON file only
/// needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Physics timestep in seconds, advanced once per frame (default: 1/60).
    pub fixed_dt: f32,
    pub board: BoardDimensions,
    pub physics: PhysicsTuning,
    pub spawn: SpawnConfig,
    pub effects: EffectLifetimes,
    pub stall: StallConfig,
    /// Seed for the spawn jitter. `None` seeds from the thread RNG.
    pub seed: Option<u64>,
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            board: BoardDimensions::default(),
            physics: PhysicsTuning::default(),
            spawn: SpawnConfig::default(),
            effects: EffectLifetimes::default(),
            stall: StallConfig::default(),
            seed: None,
        }
    }
}

/// Shapes and materials of the simulated bodies. Pegs damp horizontal drift;
/// balls are tuned to settle rather than bounce indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsTuning {
    /// Downward acceleration in units/s² (Y down).
    pub gravity: f32,
    pub peg_radius: f32,
    pub peg_material: ColliderMaterial,
    pub ball_radius: f32,
    pub ball_material: ColliderMaterial,
    /// Continuous air drag; 1.2/s matches a 2% velocity loss per 60 Hz step.
    pub ball_linear_damping: f32,
    pub wall_thickness: f32,
    pub divider_width: f32,
    pub sensor_height: f32,
    /// Sensor width as a fraction of the bucket width.
    pub sensor_width_fraction: f32,
}

impl PhysicsTuning {
    pub fn gravity_vec(&self) -> Vec2 {
        Vec2::new(0.0, self.gravity)
    }
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            gravity: 1800.0,
            peg_radius: 5.0,
            peg_material: ColliderMaterial::new(0.4, 0.5),
            ball_radius: 10.0,
            ball_material: ColliderMaterial::new(0.3, 0.1),
            ball_linear_damping: 1.2,
            wall_thickness: 20.0,
            divider_width: 4.0,
            sensor_height: 10.0,
            sensor_width_fraction: 0.9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    pub y: f32,
    /// Maximum horizontal offset applied to a new ball, either side.
    pub jitter: f32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            y: 20.0,
            jitter: 2.5,
        }
    }
}

/// How long each cosmetic effect lives, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectLifetimes {
    pub payout_label: f32,
    pub bucket_glow: f32,
    pub bucket_squash: f32,
}

impl Default for EffectLifetimes {
    fn default() -> Self {
        Self {
            payout_label: 1.5,
            bucket_glow: 1.0,
            bucket_squash: 0.2,
        }
    }
}

/// Recovery for balls that stop moving above the buckets.
///
/// On boards with many rows the gap between a side wall and the outermost
/// peg of a low row is narrower than a ball. A ball can come to rest there
/// and would otherwise never reach a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StallConfig {
    /// Frames a ball may stay within `radius` of one spot before it is nudged.
    pub frames: u32,
    pub radius: f32,
    /// Horizontal speed of the nudge toward the board center, units/s.
    /// Half of it is applied upward to lift the ball off its resting point.
    pub nudge_speed: f32,
}

impl Default for StallConfig {
    fn default() -> Self {
        Self {
            frames: 45,
            radius: 2.0,
            nudge_speed: 160.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_board_tuning() {
        let config = EngineConfig::default();
        assert!((config.fixed_dt - 1.0 / 60.0).abs() < 1e-6);
        assert_eq!(config.board.width, 600.0);
        assert_eq!(config.physics.peg_material.restitution, 0.4);
        assert_eq!(config.physics.ball_material.friction, 0.1);
        assert_eq!(config.spawn.jitter, 2.5);
        assert_eq!(config.effects.payout_label, 1.5);
        assert_eq!(config.stall.frames, 45);
        assert!(config.seed.is_none());
    }

    #[test]
    fn partial_json_overrides() {
        let json = r#"{
            "seed": 42,
            "spawn": { "jitter": 0.0 },
            "physics": { "gravity": 900.0 }
        }"#;
        let config = EngineConfig::from_json(json).unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.spawn.jitter, 0.0);
        assert_eq!(config.spawn.y, 20.0);
        assert_eq!(config.physics.gravity, 900.0);
        assert_eq!(config.physics.ball_radius, 10.0);
        assert_eq!(config.board, BoardDimensions::default());
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            EngineConfig::from_json(r#"{ "fixed_dt": "fast" }"#),
            Err(ConfigError::Parse(_))
        ));
    }
}
