//! Ball Escape - audience-driven rotating ring arena
//!
//! Core modules:
//! - `sim`: Deterministic simulation (physics, ring, balls, round state, intake)
//! - `config`: Runtime tunables with JSON overrides
//! - `error`: Error types for config loading and the physics world

pub mod config;
pub mod error;
pub mod sim;

pub use config::GameConfig;
pub use error::{ConfigError, PhysicsError};
pub use sim::{GamePhase, GameSession, IntakeEvent, SessionEvent, SessionSnapshot, tick};

use glam::Vec2;

/// Default tunables (overridable through [`GameConfig`])
pub mod consts {
    /// Duration of one display frame (60 Hz)
    pub const FRAME_SECONDS: f64 = 1.0 / 60.0;
    /// Physics frames advanced per display frame
    pub const SPEED_MULTIPLIER: f32 = 2.0;

    /// Canvas (4:3)
    pub const CANVAS_WIDTH: f32 = 1280.0;
    pub const CANVAS_HEIGHT: f32 = 960.0;
    pub const WALL_THICKNESS: f32 = 50.0;

    /// Ring geometry
    pub const RING_RADIUS: f32 = 320.0;
    pub const RING_SEGMENTS: usize = 60;
    pub const RING_GAP: usize = 3;
    pub const RING_THICKNESS: f32 = 8.0;
    /// Segment length overshoot so neighbours overlap
    pub const RING_SEGMENT_OVERLAP: f32 = 1.1;

    /// Ring rotation (radians per tick)
    pub const BASE_ROTATION_SPEED: f32 = 0.005;
    /// Seconds between random speed/direction redraws
    pub const ROTATION_CHANGE_INTERVAL: f64 = 8.0;
    pub const DIRECTION_FLIP_CHANCE: f64 = 0.3;

    /// Ball defaults (px, px/frame)
    pub const BALL_RADIUS: f32 = 22.0;
    pub const SPAWN_JITTER: f32 = 40.0;
    pub const SPAWN_SPEED_MIN: f32 = 3.0;
    pub const SPAWN_SPEED_MAX: f32 = 6.0;
    pub const MIN_SPEED: f32 = 2.0;
    pub const MAX_SPEED: f32 = 40.0;
    pub const UNFREEZE_SPEED: f32 = 3.0;
    pub const TRAIL_LENGTH: usize = 15;
    /// Distance below the canvas where a ball counts as fallen
    pub const FALL_MARGIN: f32 = 100.0;

    /// Attract mode
    pub const DEMO_BALL_COUNT: usize = 5;
    pub const DEMO_SPAWN_JITTER: f32 = 50.0;
    pub const DEMO_FALL_MARGIN: f32 = 50.0;
    pub const DEMO_RESPAWN_SPEED: f32 = 4.0;

    /// World (px/frame^2 and per-frame damping)
    pub const GRAVITY: f32 = 0.055;
    pub const AIR_FRICTION: f32 = 0.0005;
    pub const BALL_RESTITUTION: f32 = 0.95;
    pub const BALL_FRICTION: f32 = 0.001;
    pub const RING_RESTITUTION: f32 = 0.8;
    pub const RING_FRICTION: f32 = 0.1;
    pub const WALL_RESTITUTION: f32 = 0.5;
    pub const WALL_FRICTION: f32 = 0.3;

    /// Round timing (seconds)
    pub const FREEZE_DURATION: f64 = 5.0;
    pub const VICTORY_DELAY: f64 = 5.0;

    /// Event intake
    pub const FREEZE_GIFT_ID: u32 = 5879;
    pub const MAX_LIKE_BALLS: u32 = 5;
    pub const INTAKE_CAPACITY: usize = 1024;
    /// Owner credited when a request carries no owner id
    pub const DEFAULT_OWNER_ID: &str = "unknown";
    /// Minimum ball speed for a contact to be reported as an impact
    pub const IMPACT_MIN_SPEED: f32 = 1.5;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Convert cartesian (x, y) to polar (r, theta)
#[inline]
pub fn cartesian_to_polar(pos: Vec2) -> (f32, f32) {
    (pos.length(), pos.y.atan2(pos.x))
}
