//! Round lifecycle: attract → playing → victory → restarting → attract

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::ball::{Ball, BallId, Owner};

/// Current phase of the round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GamePhase {
    /// No real balls; filler balls cycle while waiting for input
    #[default]
    Attract,
    /// Real balls in motion
    Playing,
    /// A winner was declared; waiting for the restart deadline
    Victory,
    /// Transient cleanup between rounds
    Restarting,
}

impl GamePhase {
    /// Whether a spawn request is applied in this phase
    pub fn accepts_spawns(self) -> bool {
        matches!(self, GamePhase::Attract | GamePhase::Playing)
    }

    /// Whether the ring rotates in this phase
    pub fn rotates(self) -> bool {
        matches!(self, GamePhase::Attract | GamePhase::Playing)
    }
}

/// The winning ball, kept after its record leaves the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Winner {
    pub ball: BallId,
    pub owner: Owner,
    /// Last known position
    pub position: Vec2,
}

impl Winner {
    pub fn from_ball(ball: &Ball, position: Vec2) -> Self {
        Self {
            ball: ball.id,
            owner: ball.owner.clone(),
            position,
        }
    }
}

/// Round bookkeeping owned by the session
#[derive(Debug, Clone, Default)]
pub struct RoundState {
    pub phase: GamePhase,
    /// Real balls spawned since the last restart
    pub total_spawned: u32,
    /// Set only in `Victory`
    pub winner: Option<Winner>,
    /// Most recently known remaining ball
    pub last_survivor: Option<Winner>,
    /// Clock time of the automatic restart
    pub restart_deadline: Option<f64>,
    /// Winner body still to be detached from physics
    pub winner_pending_removal: bool,
}

impl RoundState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_spawn(&mut self) {
        self.total_spawned = self.total_spawned.saturating_add(1);
    }

    pub fn note_survivor(&mut self, survivor: Option<Winner>) {
        if survivor.is_some() {
            self.last_survivor = survivor;
        }
    }

    /// Decide whether this round has a winner
    ///
    /// `sole` is the only remaining ball when exactly one is active. A sole
    /// survivor wins when more than one ball was spawned; an empty arena is
    /// won by the remembered survivor once anything was spawned.
    pub fn evaluate_victory(&self, active: usize, sole: Option<Winner>) -> Option<Winner> {
        if self.phase != GamePhase::Playing {
            return None;
        }
        if active == 1 && self.total_spawned > 1 {
            return sole;
        }
        if active == 0 && self.total_spawned >= 1 {
            return self.last_survivor.clone();
        }
        None
    }

    /// Enter `Victory` and schedule the restart
    pub fn enter_victory(&mut self, winner: Winner, now: f64, delay: f64) {
        self.phase = GamePhase::Victory;
        self.winner = Some(winner);
        self.restart_deadline = Some(now + delay);
        self.winner_pending_removal = true;
    }

    pub fn restart_due(&self, now: f64) -> bool {
        self.restart_deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Clear round data ahead of a fresh `Attract` round
    pub fn reset(&mut self) {
        *self = Self {
            phase: GamePhase::Restarting,
            ..Self::default()
        };
    }
}
