//! Game tunables
//!
//! Every field defaults to the matching constant in [`crate::consts`]. A JSON
//! document may override any subset; missing keys keep their defaults.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;

/// Runtime configuration for one arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    // === Timing ===
    /// Seconds per tick (display refresh)
    pub frame_seconds: f64,
    /// Physics frames advanced per tick
    pub speed_multiplier: f32,
    /// Seconds a frozen ball stays frozen
    pub freeze_duration: f64,
    /// Seconds between victory and automatic restart
    pub victory_delay: f64,

    // === Canvas ===
    pub canvas_width: f32,
    pub canvas_height: f32,
    pub wall_thickness: f32,

    // === Ring ===
    pub ring_radius: f32,
    pub ring_segments: usize,
    /// Number of missing segments forming the gap
    pub ring_gap: usize,
    pub ring_thickness: f32,
    /// Radians per tick
    pub base_rotation_speed: f32,
    /// Seconds between random speed/direction redraws
    pub rotation_change_interval: f64,
    /// Probability of flipping direction at each redraw
    pub direction_flip_chance: f64,

    // === Balls ===
    pub ball_radius: f32,
    pub spawn_jitter: f32,
    pub spawn_speed_min: f32,
    pub spawn_speed_max: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    pub unfreeze_speed: f32,
    pub trail_length: usize,
    pub fall_margin: f32,

    // === Attract mode ===
    pub demo_ball_count: usize,
    pub demo_spawn_jitter: f32,
    pub demo_fall_margin: f32,
    pub demo_respawn_speed: f32,

    // === World ===
    pub gravity: f32,
    pub air_friction: f32,
    pub ball_restitution: f32,
    pub ball_friction: f32,
    pub ring_restitution: f32,
    pub ring_friction: f32,
    pub wall_restitution: f32,
    pub wall_friction: f32,

    // === Intake ===
    /// Gift id that freezes the sender's balls instead of spawning
    pub freeze_gift_id: u32,
    /// Cap on balls spawned by one like notice
    pub max_like_balls: u32,
    pub intake_capacity: usize,
    /// Owner credited for requests without an owner id
    pub default_owner_id: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            frame_seconds: FRAME_SECONDS,
            speed_multiplier: SPEED_MULTIPLIER,
            freeze_duration: FREEZE_DURATION,
            victory_delay: VICTORY_DELAY,

            canvas_width: CANVAS_WIDTH,
            canvas_height: CANVAS_HEIGHT,
            wall_thickness: WALL_THICKNESS,

            ring_radius: RING_RADIUS,
            ring_segments: RING_SEGMENTS,
            ring_gap: RING_GAP,
            ring_thickness: RING_THICKNESS,
            base_rotation_speed: BASE_ROTATION_SPEED,
            rotation_change_interval: ROTATION_CHANGE_INTERVAL,
            direction_flip_chance: DIRECTION_FLIP_CHANCE,

            ball_radius: BALL_RADIUS,
            spawn_jitter: SPAWN_JITTER,
            spawn_speed_min: SPAWN_SPEED_MIN,
            spawn_speed_max: SPAWN_SPEED_MAX,
            min_speed: MIN_SPEED,
            max_speed: MAX_SPEED,
            unfreeze_speed: UNFREEZE_SPEED,
            trail_length: TRAIL_LENGTH,
            fall_margin: FALL_MARGIN,

            demo_ball_count: DEMO_BALL_COUNT,
            demo_spawn_jitter: DEMO_SPAWN_JITTER,
            demo_fall_margin: DEMO_FALL_MARGIN,
            demo_respawn_speed: DEMO_RESPAWN_SPEED,

            gravity: GRAVITY,
            air_friction: AIR_FRICTION,
            ball_restitution: BALL_RESTITUTION,
            ball_friction: BALL_FRICTION,
            ring_restitution: RING_RESTITUTION,
            ring_friction: RING_FRICTION,
            wall_restitution: WALL_RESTITUTION,
            wall_friction: WALL_FRICTION,

            freeze_gift_id: FREEZE_GIFT_ID,
            max_like_balls: MAX_LIKE_BALLS,
            intake_capacity: INTAKE_CAPACITY,
            default_owner_id: DEFAULT_OWNER_ID.to_string(),
        }
    }
}

impl GameConfig {
    /// Parse a (possibly partial) JSON document and validate the result
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Center of the canvas, where the ring sits and balls spawn
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.canvas_width / 2.0, self.canvas_height / 2.0)
    }

    /// Gravity vector (+y is down on the canvas)
    pub fn gravity_vec(&self) -> Vec2 {
        Vec2::new(0.0, self.gravity)
    }

    /// Check every tunable against its usable range
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive_f64("frame_seconds", self.frame_seconds)?;
        positive("speed_multiplier", self.speed_multiplier)?;
        non_negative_f64("freeze_duration", self.freeze_duration)?;
        non_negative_f64("victory_delay", self.victory_delay)?;

        positive("canvas_width", self.canvas_width)?;
        positive("canvas_height", self.canvas_height)?;
        positive("wall_thickness", self.wall_thickness)?;

        positive("ring_radius", self.ring_radius)?;
        positive("ring_thickness", self.ring_thickness)?;
        if self.ring_segments < 2 {
            return Err(ConfigError::invalid("ring_segments", "need at least 2 segments"));
        }
        if self.ring_gap == 0 || self.ring_gap >= self.ring_segments {
            return Err(ConfigError::invalid(
                "ring_gap",
                format!("must be between 1 and {}", self.ring_segments - 1),
            ));
        }
        let ring_extent = self.ring_radius + self.ring_thickness;
        if ring_extent * 2.0 > self.canvas_width.min(self.canvas_height) {
            return Err(ConfigError::invalid("ring_radius", "ring does not fit the canvas"));
        }
        non_negative("base_rotation_speed", self.base_rotation_speed)?;
        positive_f64("rotation_change_interval", self.rotation_change_interval)?;
        probability("direction_flip_chance", self.direction_flip_chance)?;

        positive("ball_radius", self.ball_radius)?;
        if self.ball_radius * 2.0 >= self.ring_radius {
            return Err(ConfigError::invalid("ball_radius", "ball does not fit inside the ring"));
        }
        non_negative("spawn_jitter", self.spawn_jitter)?;
        positive("spawn_speed_min", self.spawn_speed_min)?;
        positive("spawn_speed_max", self.spawn_speed_max)?;
        if self.spawn_speed_min > self.spawn_speed_max {
            return Err(ConfigError::invalid(
                "spawn_speed_min",
                "must not exceed spawn_speed_max",
            ));
        }
        non_negative("min_speed", self.min_speed)?;
        positive("max_speed", self.max_speed)?;
        if self.min_speed >= self.max_speed {
            return Err(ConfigError::invalid("min_speed", "must be below max_speed"));
        }
        positive("unfreeze_speed", self.unfreeze_speed)?;
        non_negative("fall_margin", self.fall_margin)?;

        non_negative("demo_spawn_jitter", self.demo_spawn_jitter)?;
        non_negative("demo_fall_margin", self.demo_fall_margin)?;
        positive("demo_respawn_speed", self.demo_respawn_speed)?;

        if !self.gravity.is_finite() {
            return Err(ConfigError::invalid("gravity", "must be finite"));
        }
        non_negative("air_friction", self.air_friction)?;
        for (field, value) in [
            ("ball_restitution", self.ball_restitution),
            ("ball_friction", self.ball_friction),
            ("ring_restitution", self.ring_restitution),
            ("ring_friction", self.ring_friction),
            ("wall_restitution", self.wall_restitution),
            ("wall_friction", self.wall_friction),
        ] {
            probability(field, value as f64)?;
        }

        if self.intake_capacity == 0 {
            return Err(ConfigError::invalid("intake_capacity", "must be at least 1"));
        }
        if self.default_owner_id.trim().is_empty() {
            return Err(ConfigError::invalid("default_owner_id", "must not be empty"));
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be positive, got {}", value)))
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be >= 0, got {}", value)))
    }
}

fn positive_f64(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be positive, got {}", value)))
    }
}

fn non_negative_f64(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be >= 0, got {}", value)))
    }
}

fn probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be within [0, 1], got {}", value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        GameConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = GameConfig::from_json_str(r#"{ "ring_gap": 5, "victory_delay": 2.5 }"#).unwrap();
        assert_eq!(config.ring_gap, 5);
        assert_eq!(config.victory_delay, 2.5);
        assert_eq!(config.ring_segments, RING_SEGMENTS);
        assert_eq!(config.ball_radius, BALL_RADIUS);
    }

    #[test]
    fn test_gap_must_be_smaller_than_segment_count() {
        let err = GameConfig::from_json_str(r#"{ "ring_segments": 10, "ring_gap": 10 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "ring_gap", .. }));

        let err = GameConfig::from_json_str(r#"{ "ring_gap": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "ring_gap", .. }));
    }

    #[test]
    fn test_ring_must_fit_canvas() {
        let err = GameConfig::from_json_str(r#"{ "canvas_height": 300.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "ring_radius", .. }));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = GameConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = GameConfig::load("/definitely/not/here/ball_escape.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "freeze_duration": 2.0, "max_like_balls": 3 }}"#).unwrap();
        let config = GameConfig::load(file.path()).unwrap();
        assert_eq!(config.freeze_duration, 2.0);
        assert_eq!(config.max_like_balls, 3);
        assert_eq!(config.ring_gap, RING_GAP);
    }

    #[test]
    fn test_center_is_canvas_midpoint() {
        let config = GameConfig::default();
        assert_eq!(config.center(), Vec2::new(CANVAS_WIDTH / 2.0, CANVAS_HEIGHT / 2.0));
    }
}
