//! Outbound observations for the rendering and broadcast layer

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::arena::RingPose;
use super::ball::{Ball, BallId, Owner};
use super::physics::{BodyLabel, PhysicsWorld};
use super::round::{GamePhase, Winner};

/// Something the renderer or broadcaster should react to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SessionEvent {
    BallSpawned { ball: BallId, owner: Owner },
    /// A real ball fell out of the arena
    BallEliminated { ball: BallId, owner_id: String },
    BallsFrozen { owner_id: String, count: usize },
    BallUnfrozen { ball: BallId },
    /// A ball started touching a surface (particles, ripples, sounds)
    Impact {
        ball: BallId,
        point: Vec2,
        speed: f32,
        surface: BodyLabel,
    },
    Victory { winner: Winner },
    /// Round restarted; transient effects should be cleared
    Restarted,
}

/// One ball as seen by the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallSnapshot {
    pub id: BallId,
    pub owner: Owner,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Newest first
    pub trail: Vec<Vec2>,
    pub frozen: bool,
    pub demo: bool,
    pub avatar_loaded: bool,
}

impl BallSnapshot {
    /// None if the ball's body already left the world
    pub fn capture(ball: &Ball, world: &PhysicsWorld) -> Option<Self> {
        let body = world.body(ball.body)?;
        Some(Self {
            id: ball.id,
            owner: ball.owner.clone(),
            position: body.pos,
            velocity: body.vel,
            trail: ball.trail.clone(),
            frozen: ball.is_frozen(),
            demo: ball.demo,
            avatar_loaded: ball.avatar_loaded,
        })
    }
}

/// Full observable state after a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub tick: u64,
    pub clock: f64,
    pub phase: GamePhase,
    pub total_spawned: u32,
    /// Active balls in spawn order
    pub balls: Vec<BallSnapshot>,
    pub demo_balls: Vec<BallSnapshot>,
    /// None while the ring is torn down
    pub ring: Option<RingPose>,
    pub winner: Option<Winner>,
}

impl SessionSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
