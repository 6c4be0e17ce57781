//! Game session: the single owner of all arena state
//!
//! One session is one room. Every mutation goes through `&mut GameSession`,
//! either from [`super::tick`] or from the synchronous request methods below.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::arena::Arena;
use super::ball::{BallId, BallRegistry};
use super::intake::{EventQueue, FreezeRequest, IntakeEvent, NEON_COLORS, SpawnRequest, StreamNotice, parse_line};
use super::physics::{Body, BodyHandle, BodyLabel, PhysicsWorld};
use super::round::{GamePhase, RoundState, Winner};
use super::snapshot::{BallSnapshot, SessionEvent, SessionSnapshot};
use crate::config::GameConfig;
use crate::error::ConfigError;

/// Complete state of one arena
#[derive(Debug, Clone)]
pub struct GameSession {
    pub(super) config: GameConfig,
    pub(super) world: PhysicsWorld,
    pub(super) walls: Vec<BodyHandle>,
    /// None while torn down (victory)
    pub(super) arena: Option<Arena>,
    pub(super) balls: BallRegistry,
    pub(super) round: RoundState,
    pub(super) rng: Pcg32,
    seed: u64,
    /// Simulated seconds since creation
    pub(super) clock: f64,
    pub(super) time_ticks: u64,
    pub(super) intake: EventQueue,
    pub(super) events: Vec<SessionEvent>,
}

impl GameSession {
    /// Create a session in `Attract` with a fresh ring
    pub fn new(config: GameConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut world = PhysicsWorld::new(config.gravity_vec(), config.max_speed);
        let walls = build_walls(&mut world, &config)?;
        let arena = Arena::build(&mut world, &config, 0.0)
            .map_err(|err| ConfigError::invalid("ring_radius", err.to_string()))?;

        log::info!(
            "Session created (seed {}, ring {} segments, gap {})",
            seed,
            config.ring_segments,
            config.ring_gap
        );

        Ok(Self {
            intake: EventQueue::new(config.intake_capacity),
            config,
            world,
            walls,
            arena: Some(arena),
            balls: BallRegistry::new(),
            round: RoundState::new(),
            rng: Pcg32::seed_from_u64(seed),
            seed,
            clock: 0.0,
            time_ticks: 0,
            events: Vec::new(),
        })
    }

    // === Requests ===

    /// Spawn a ball for an audience member
    ///
    /// Dropped outside `Attract`/`Playing`. An empty owner id is credited to
    /// the configured default owner. The first real ball clears the
    /// attract-mode balls and starts play.
    pub fn spawn(&mut self, request: SpawnRequest) -> Option<BallId> {
        if !self.round.phase.accepts_spawns() {
            log::debug!(
                "Spawn for '{}' dropped during {:?}",
                request.owner_id,
                self.round.phase
            );
            return None;
        }
        let rng = &mut self.rng;
        let owner = request.into_owner(&self.config.default_owner_id, || {
            NEON_COLORS[rng.random_range(0..NEON_COLORS.len())].to_string()
        });

        let id = match self.balls.spawn(&mut self.world, &mut self.rng, &self.config, owner.clone()) {
            Ok(id) => id,
            Err(err) => {
                log::warn!("Spawn for '{}' failed: {}", owner.id, err);
                return None;
            }
        };

        if self.round.phase == GamePhase::Attract {
            self.balls.clear_demo(&mut self.world);
            self.round.phase = GamePhase::Playing;
            log::info!("First player joined, round started");
        }
        self.round.record_spawn();
        log::info!(
            "Ball {} spawned for {} ({} this round)",
            id,
            owner.display_name,
            self.round.total_spawned
        );
        self.events.push(SessionEvent::BallSpawned { ball: id, owner });
        Some(id)
    }

    /// Freeze every active ball of an owner; returns how many were frozen
    pub fn freeze(&mut self, owner_id: &str) -> usize {
        let count = self.balls.freeze(
            &mut self.world,
            owner_id,
            self.config.freeze_duration,
            self.clock,
        );
        if count > 0 {
            log::info!("Froze {} ball(s) of {}", count, owner_id);
            self.events.push(SessionEvent::BallsFrozen {
                owner_id: owner_id.to_string(),
                count,
            });
        } else {
            log::debug!("Freeze for '{}' matched no balls", owner_id);
        }
        count
    }

    /// Restart immediately, cancelling any pending victory delay
    pub fn reset(&mut self) {
        log::info!("Reset requested during {:?}", self.round.phase);
        self.restart();
    }

    /// Remove one active ball (idempotent); returns false if it was gone
    pub fn remove_ball(&mut self, id: BallId) -> bool {
        let survivor = self.newest_survivor();
        self.round.note_survivor(survivor);
        self.balls.remove(&mut self.world, id).is_some()
    }

    /// Apply a request right away
    pub fn apply(&mut self, event: IntakeEvent) {
        match event {
            IntakeEvent::SpawnRequest(request) => {
                self.spawn(request);
            }
            IntakeEvent::FreezeRequest(FreezeRequest { owner_id }) => {
                let owner_id = match owner_id.trim() {
                    "" => self.config.default_owner_id.clone(),
                    id => id.to_string(),
                };
                self.freeze(&owner_id);
            }
            IntakeEvent::ResetRequest => self.reset(),
        }
    }

    /// Queue a request for the next tick; false if the queue is full
    pub fn enqueue(&mut self, event: IntakeEvent) -> bool {
        self.intake.push(event)
    }

    /// Queue every request produced by a stream notice; returns how many were queued
    pub fn enqueue_notice(&mut self, notice: StreamNotice) -> usize {
        let requests = notice.into_requests(&self.config);
        self.push_all(requests)
    }

    /// Queue the requests carried by one JSON line; returns how many were queued
    pub fn enqueue_line(&mut self, line: &str) -> usize {
        let requests = parse_line(line, &self.config);
        self.push_all(requests)
    }

    fn push_all(&mut self, requests: Vec<IntakeEvent>) -> usize {
        let mut queued = 0;
        for event in requests {
            if self.intake.push(event) {
                queued += 1;
            }
        }
        queued
    }

    /// Record avatar availability for an owner's balls (cosmetic only)
    pub fn mark_avatar_loaded(&mut self, owner_id: &str, loaded: bool) -> usize {
        self.balls.mark_avatar_loaded(owner_id, loaded)
    }

    // === Round transitions ===

    pub(super) fn restart(&mut self) {
        self.round.reset();
        self.balls.clear(&mut self.world);
        if let Some(arena) = self.arena.take() {
            arena.teardown(&mut self.world);
        }
        self.events.push(SessionEvent::Restarted);

        match Arena::build(&mut self.world, &self.config, self.clock) {
            Ok(arena) => self.arena = Some(arena),
            Err(err) => log::warn!("Ring rebuild failed: {}", err),
        }
        self.round.phase = GamePhase::Attract;
        log::info!("Round restarted");
    }

    pub(super) fn declare_victory(&mut self, winner: Winner) {
        log::info!(
            "Winner: {} (ball {}, {} spawned)",
            winner.owner.display_name,
            winner.ball,
            self.round.total_spawned
        );
        if let Some(arena) = self.arena.take() {
            arena.teardown(&mut self.world);
        }
        self.events.push(SessionEvent::Victory {
            winner: winner.clone(),
        });
        self.round
            .enter_victory(winner, self.clock, self.config.victory_delay);
    }

    /// The most recently spawned active ball, as a winner candidate
    pub(super) fn newest_survivor(&self) -> Option<Winner> {
        let ball = self.balls.newest()?;
        let position = self.world.position(ball.body).unwrap_or(Vec2::ZERO);
        Some(Winner::from_ball(ball, position))
    }

    /// The only active ball, as a winner candidate
    pub(super) fn sole_survivor(&self) -> Option<Winner> {
        let ball = self.balls.sole()?;
        let position = self.world.position(ball.body).unwrap_or(Vec2::ZERO);
        Some(Winner::from_ball(ball, position))
    }

    // === Observation ===

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            tick: self.time_ticks,
            clock: self.clock,
            phase: self.round.phase,
            total_spawned: self.round.total_spawned,
            balls: self
                .balls
                .active()
                .filter_map(|ball| BallSnapshot::capture(ball, &self.world))
                .collect(),
            demo_balls: self
                .balls
                .demo()
                .iter()
                .filter_map(|ball| BallSnapshot::capture(ball, &self.world))
                .collect(),
            ring: self.arena.as_ref().map(Arena::pose),
            winner: self.round.winner.clone(),
        }
    }

    /// Take the events produced since the last call
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn phase(&self) -> GamePhase {
        self.round.phase
    }

    pub fn winner(&self) -> Option<&Winner> {
        self.round.winner.as_ref()
    }

    pub fn restart_deadline(&self) -> Option<f64> {
        self.round.restart_deadline
    }

    pub fn total_spawned(&self) -> u32 {
        self.round.total_spawned
    }

    pub fn active_count(&self) -> usize {
        self.balls.active_len()
    }

    pub fn demo_count(&self) -> usize {
        self.balls.demo_len()
    }

    pub fn balls(&self) -> &BallRegistry {
        &self.balls
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn arena(&self) -> Option<&Arena> {
        self.arena.as_ref()
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn time_ticks(&self) -> u64 {
        self.time_ticks
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn pending_requests(&self) -> usize {
        self.intake.len()
    }

    pub fn walls(&self) -> &[BodyHandle] {
        &self.walls
    }

    /// Teleport an active ball (tests and tooling)
    pub fn place_ball(&mut self, id: BallId, pos: Vec2, vel: Vec2) -> bool {
        let Some(ball) = self.balls.get(id) else {
            return false;
        };
        let body = ball.body;
        self.world.set_pose(body, pos, 0.0).is_ok() && self.world.set_velocity(body, vel).is_ok()
    }
}

/// Left, right and top boundaries; the bottom stays open
fn build_walls(world: &mut PhysicsWorld, config: &GameConfig) -> Result<Vec<BodyHandle>, ConfigError> {
    let (w, h, t) = (config.canvas_width, config.canvas_height, config.wall_thickness);
    let walls = [
        (Vec2::new(-t / 2.0, h / 2.0), Vec2::new(t / 2.0, h)),
        (Vec2::new(w + t / 2.0, h / 2.0), Vec2::new(t / 2.0, h)),
        (Vec2::new(w / 2.0, -t / 2.0), Vec2::new(w, t / 2.0)),
    ];
    walls
        .into_iter()
        .map(|(pos, half)| {
            let body = Body::static_box(BodyLabel::Wall, pos, half, 0.0)
                .with_material(config.wall_restitution, config.wall_friction);
            world
                .insert(body)
                .map_err(|err| ConfigError::invalid("canvas_width", err.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::tick;

    fn session() -> GameSession {
        GameSession::new(GameConfig::default(), 9).unwrap()
    }

    #[test]
    fn test_new_session_starts_in_attract() {
        let session = session();
        assert_eq!(session.phase(), GamePhase::Attract);
        assert_eq!(session.walls().len(), 3);
        let config = session.config();
        assert_eq!(
            session.world().body_count(),
            3 + config.ring_segments - config.ring_gap
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = GameConfig {
            ring_gap: 0,
            ..GameConfig::default()
        };
        assert!(GameSession::new(config, 1).is_err());
    }

    #[test]
    fn test_first_spawn_starts_round() {
        let mut session = session();
        let id = session.spawn(SpawnRequest::new("alice")).unwrap();
        assert_eq!(session.phase(), GamePhase::Playing);
        assert_eq!(session.total_spawned(), 1);
        assert_eq!(session.demo_count(), 0);

        let owner = &session.balls().get(id).unwrap().owner;
        assert_eq!(owner.display_name, "alice");
        assert!(NEON_COLORS.contains(&owner.color.as_str()));

        let events = session.drain_events();
        assert!(matches!(events.as_slice(), [SessionEvent::BallSpawned { ball, .. }] if *ball == id));
        assert!(session.drain_events().is_empty());
    }

    #[test]
    fn test_spawn_without_owner_credits_default() {
        let mut session = session();
        let id = session.spawn(SpawnRequest::new("")).unwrap();
        assert_eq!(session.phase(), GamePhase::Playing);
        assert_eq!(session.total_spawned(), 1);
        assert_eq!(session.balls().get(id).unwrap().owner.id, "unknown");

        // Anonymous gifts still spawn one ball per repeat
        assert_eq!(session.enqueue_line(r#"{"type":"gift","giftId":1,"repeatCount":2}"#), 2);
        tick(&mut session);
        assert_eq!(session.total_spawned(), 3);
        assert_eq!(session.balls().active().filter(|b| b.owner.id == "unknown").count(), 3);

        session.apply(IntakeEvent::FreezeRequest(FreezeRequest::default()));
        assert_eq!(session.balls().active().filter(|b| b.is_frozen()).count(), 3);
    }

    #[test]
    fn test_freeze_reports_count() {
        let mut session = session();
        session.spawn(SpawnRequest::new("alice"));
        session.spawn(SpawnRequest::new("alice"));
        session.spawn(SpawnRequest::new("bob"));
        session.drain_events();

        assert_eq!(session.freeze("alice"), 2);
        assert_eq!(session.freeze("nobody"), 0);
        let events = session.drain_events();
        assert_eq!(
            events,
            vec![SessionEvent::BallsFrozen {
                owner_id: "alice".into(),
                count: 2
            }]
        );
    }

    #[test]
    fn test_remove_ball_idempotent() {
        let mut session = session();
        let a = session.spawn(SpawnRequest::new("a")).unwrap();
        session.spawn(SpawnRequest::new("b")).unwrap();
        assert!(session.remove_ball(a));
        assert!(!session.remove_ball(a));
        assert_eq!(session.active_count(), 1);
    }

    #[test]
    fn test_reset_returns_to_attract_with_fresh_ring() {
        let mut session = session();
        session.spawn(SpawnRequest::new("a"));
        session.reset();
        assert_eq!(session.phase(), GamePhase::Attract);
        assert_eq!(session.active_count(), 0);
        assert_eq!(session.total_spawned(), 0);
        let arena = session.arena().unwrap();
        assert_eq!(arena.angle(), 0.0);
        assert_eq!(arena.direction(), 1.0);
        assert!(session.drain_events().contains(&SessionEvent::Restarted));
    }

    #[test]
    fn test_enqueue_line_routes_notices() {
        let mut session = session();
        let queued = session.enqueue_line(r#"{"type":"like","ownerId":"zed","likeCount":3}"#);
        assert_eq!(queued, 3);
        assert_eq!(session.pending_requests(), 3);
        assert_eq!(session.enqueue_line("garbage"), 0);
    }

    #[test]
    fn test_avatar_flag_is_cosmetic() {
        let mut session = session();
        let id = session.spawn(SpawnRequest::new("a")).unwrap();
        assert_eq!(session.mark_avatar_loaded("a", true), 1);
        assert!(session.balls().get(id).unwrap().avatar_loaded);
        assert_eq!(session.phase(), GamePhase::Playing);
    }
}
