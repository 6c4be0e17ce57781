//! Ball registry
//!
//! Owns every ball record and is the only writer of trails and freeze state.
//! Bodies are referenced by handle; the registry maps ball ids to records.

use std::collections::BTreeMap;
use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::physics::{Body, BodyHandle, PhysicsWorld};
use crate::config::GameConfig;
use crate::error::PhysicsError;

/// Stable ball identity (monotonic, so ordering by id is spawn order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BallId(pub u32);

impl std::fmt::Display for BallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The audience identity credited with a ball
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub id: String,
    pub display_name: String,
    pub avatar: Option<String>,
    /// CSS color string, e.g. `#ff00ff`
    pub color: String,
}

/// Freeze bookkeeping for one ball
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frozen {
    /// Velocity to restore (None if the ball was at rest)
    pub saved_velocity: Option<Vec2>,
    /// Clock time when the ball thaws
    pub until: f64,
}

/// A ball record
#[derive(Debug, Clone)]
pub struct Ball {
    pub id: BallId,
    pub owner: Owner,
    pub body: BodyHandle,
    /// Recent positions, newest first
    pub trail: Vec<Vec2>,
    pub frozen: Option<Frozen>,
    /// Attract-mode filler ball
    pub demo: bool,
    /// Avatar image available to the renderer (cosmetic only)
    pub avatar_loaded: bool,
}

impl Ball {
    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    fn record_trail(&mut self, pos: Vec2, capacity: usize) {
        self.trail.insert(0, pos);
        self.trail.truncate(capacity);
    }
}

/// Attract-mode names and colors
const DEMO_NAMES: [&str; 5] = ["Player1", "Gamer", "Star", "Lucky", "Winner"];
const DEMO_COLORS: [&str; 5] = ["#ff00ff", "#00ffff", "#ffff00", "#ff6600", "#00ff66"];

/// Uniformly random unit vector
pub fn random_direction<R: Rng>(rng: &mut R) -> Vec2 {
    Vec2::from_angle(rng.random_range(0.0..TAU))
}

/// Add a boost along `direction` so a slow velocity reaches `min_speed`
///
/// The boost is `min_speed - speed + 1` along the direction; if the sum still
/// falls short (direction opposed the motion) it is rescaled to `min_speed`.
pub fn boost_to_min_speed(vel: Vec2, min_speed: f32, direction: Vec2) -> Vec2 {
    let speed = vel.length();
    if speed >= min_speed {
        return vel;
    }
    let boosted = vel + direction * (min_speed - speed + 1.0);
    let boosted_speed = boosted.length();
    if boosted_speed >= min_speed {
        boosted
    } else if boosted_speed > 1e-6 {
        boosted * (min_speed / boosted_speed)
    } else {
        direction * min_speed
    }
}

/// Active balls, attract-mode balls and their auxiliary state
#[derive(Debug, Clone, Default)]
pub struct BallRegistry {
    active: BTreeMap<BallId, Ball>,
    demo: Vec<Ball>,
    next_id: u32,
}

impl BallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_ball_id(&mut self) -> BallId {
        self.next_id += 1;
        BallId(self.next_id)
    }

    fn make_body<R: Rng>(
        config: &GameConfig,
        rng: &mut R,
        jitter: f32,
        speed: f32,
    ) -> Body {
        let offset = if jitter > 0.0 {
            Vec2::new(rng.random_range(-jitter..jitter), rng.random_range(-jitter..jitter))
        } else {
            Vec2::ZERO
        };
        Body::circle(config.center() + offset, config.ball_radius)
            .with_material(config.ball_restitution, config.ball_friction)
            .with_air_friction(config.air_friction)
            .with_velocity(random_direction(rng) * speed)
    }

    fn spawn_speed<R: Rng>(config: &GameConfig, rng: &mut R) -> f32 {
        if config.spawn_speed_max > config.spawn_speed_min {
            rng.random_range(config.spawn_speed_min..config.spawn_speed_max)
        } else {
            config.spawn_speed_min
        }
    }

    /// Create a real ball near the center with a random velocity
    ///
    /// Phase gating lives in the session; this always spawns.
    pub fn spawn<R: Rng>(
        &mut self,
        world: &mut PhysicsWorld,
        rng: &mut R,
        config: &GameConfig,
        owner: Owner,
    ) -> Result<BallId, PhysicsError> {
        let speed = Self::spawn_speed(config, rng);
        let body = world.insert(Self::make_body(config, rng, config.spawn_jitter, speed))?;
        let id = self.next_ball_id();
        self.active.insert(
            id,
            Ball {
                id,
                owner,
                body,
                trail: Vec::with_capacity(config.trail_length),
                frozen: None,
                demo: false,
                avatar_loaded: false,
            },
        );
        Ok(id)
    }

    /// Detach a ball from physics and the registry (idempotent)
    pub fn remove(&mut self, world: &mut PhysicsWorld, id: BallId) -> Option<Ball> {
        let ball = self.active.remove(&id)?;
        world.remove(ball.body);
        Some(ball)
    }

    /// Fill the arena with attract-mode balls
    pub fn seed_demo<R: Rng>(&mut self, world: &mut PhysicsWorld, rng: &mut R, config: &GameConfig) {
        for i in 0..config.demo_ball_count {
            let speed = Self::spawn_speed(config, rng);
            let body = match world.insert(Self::make_body(config, rng, config.demo_spawn_jitter, speed)) {
                Ok(body) => body,
                Err(err) => {
                    log::warn!("Demo ball not created: {}", err);
                    continue;
                }
            };
            let id = self.next_ball_id();
            let name = DEMO_NAMES[i % DEMO_NAMES.len()];
            self.demo.push(Ball {
                id,
                owner: Owner {
                    id: format!("demo_{}", i),
                    display_name: name.to_string(),
                    avatar: None,
                    color: DEMO_COLORS[i % DEMO_COLORS.len()].to_string(),
                },
                body,
                trail: Vec::with_capacity(config.trail_length),
                frozen: None,
                demo: true,
                avatar_loaded: false,
            });
        }
        log::debug!("Seeded {} attract-mode balls", self.demo.len());
    }

    /// Remove every attract-mode ball
    pub fn clear_demo(&mut self, world: &mut PhysicsWorld) {
        for ball in self.demo.drain(..) {
            world.remove(ball.body);
        }
    }

    /// Remove every ball, real and demo
    pub fn clear(&mut self, world: &mut PhysicsWorld) {
        for (_, ball) in std::mem::take(&mut self.active) {
            world.remove(ball.body);
        }
        self.clear_demo(world);
    }

    /// Freeze every active ball owned by `owner_id`; returns how many froze
    pub fn freeze(&mut self, world: &mut PhysicsWorld, owner_id: &str, duration: f64, now: f64) -> usize {
        let mut count = 0;
        for ball in self.active.values_mut().filter(|b| b.owner.id == owner_id) {
            let until = now + duration;
            if let Some(frozen) = ball.frozen.as_mut() {
                // Already frozen: extend, keep the velocity saved before the first freeze
                frozen.until = frozen.until.max(until);
                count += 1;
                continue;
            }
            let Some(vel) = world.velocity(ball.body) else {
                continue;
            };
            if world.set_static(ball.body, true).is_err() {
                continue;
            }
            ball.frozen = Some(Frozen {
                saved_velocity: (vel.length() > 1e-6).then_some(vel),
                until,
            });
            count += 1;
        }
        count
    }

    /// Thaw every ball whose freeze deadline has passed; returns the thawed ids
    pub fn tick_frozen<R: Rng>(
        &mut self,
        world: &mut PhysicsWorld,
        rng: &mut R,
        now: f64,
        unfreeze_speed: f32,
    ) -> Vec<BallId> {
        let mut thawed = Vec::new();
        for ball in self.active.values_mut() {
            let Some(frozen) = ball.frozen else {
                continue;
            };
            if now < frozen.until {
                continue;
            }
            ball.frozen = None;
            let vel = frozen
                .saved_velocity
                .unwrap_or_else(|| random_direction(rng) * unfreeze_speed);
            let restored = world
                .set_static(ball.body, false)
                .and_then(|_| world.set_velocity(ball.body, vel));
            if let Err(err) = restored {
                log::warn!("Ball {} thawed without a body: {}", ball.id, err);
            }
            thawed.push(ball.id);
        }
        thawed
    }

    /// Remove real balls that dropped below `limit_y`; returns the removed balls
    pub fn tick_fallen(&mut self, world: &mut PhysicsWorld, limit_y: f32) -> Vec<Ball> {
        let fallen: Vec<BallId> = self
            .active
            .values()
            .filter(|ball| world.position(ball.body).is_some_and(|p| p.y > limit_y))
            .map(|ball| ball.id)
            .collect();
        fallen
            .into_iter()
            .filter_map(|id| self.remove(world, id))
            .collect()
    }

    /// Boost every slow, unfrozen ball (real and demo) up to `min_speed`
    pub fn tick_min_speed<R: Rng>(&mut self, world: &mut PhysicsWorld, rng: &mut R, min_speed: f32) {
        for ball in self.active.values().chain(self.demo.iter()) {
            if ball.is_frozen() {
                continue;
            }
            let Some(vel) = world.velocity(ball.body) else {
                continue;
            };
            if vel.length() < min_speed {
                let boosted = boost_to_min_speed(vel, min_speed, random_direction(rng));
                if let Err(err) = world.set_velocity(ball.body, boosted) {
                    log::warn!("Ball {} boost skipped: {}", ball.id, err);
                }
            }
        }
    }

    /// Send attract-mode balls that fell below `limit_y` back to the center
    pub fn recycle_demo<R: Rng>(
        &mut self,
        world: &mut PhysicsWorld,
        rng: &mut R,
        limit_y: f32,
        center: Vec2,
        jitter: f32,
        speed: f32,
    ) -> usize {
        let mut recycled = 0;
        for ball in &mut self.demo {
            if !world.position(ball.body).is_some_and(|p| p.y > limit_y) {
                continue;
            }
            let x = if jitter > 0.0 { rng.random_range(-jitter..jitter) } else { 0.0 };
            let pos = center + Vec2::new(x, 0.0);
            let vel = random_direction(rng) * speed;
            if world.set_pose(ball.body, pos, 0.0).is_ok() && world.set_velocity(ball.body, vel).is_ok() {
                ball.trail.clear();
                recycled += 1;
            }
        }
        recycled
    }

    /// Record the current position of every ball into its trail
    pub fn update_trails(&mut self, world: &PhysicsWorld, capacity: usize) {
        for ball in self.active.values_mut().chain(self.demo.iter_mut()) {
            if let Some(pos) = world.position(ball.body) {
                ball.record_trail(pos, capacity);
            }
        }
    }

    /// Set the avatar flag on every active ball of an owner
    pub fn mark_avatar_loaded(&mut self, owner_id: &str, loaded: bool) -> usize {
        let mut count = 0;
        for ball in self.active.values_mut().filter(|b| b.owner.id == owner_id) {
            ball.avatar_loaded = loaded;
            count += 1;
        }
        count
    }

    /// Ball (real or demo) that owns a physics body
    pub fn id_for_body(&self, body: BodyHandle) -> Option<BallId> {
        self.active
            .values()
            .chain(self.demo.iter())
            .find(|ball| ball.body == body)
            .map(|ball| ball.id)
    }

    pub fn get(&self, id: BallId) -> Option<&Ball> {
        self.active.get(&id)
    }

    /// Active balls in spawn order
    pub fn active(&self) -> impl Iterator<Item = &Ball> {
        self.active.values()
    }

    pub fn demo(&self) -> &[Ball] {
        &self.demo
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn demo_len(&self) -> usize {
        self.demo.len()
    }

    /// Most recently spawned active ball
    pub fn newest(&self) -> Option<&Ball> {
        self.active.values().next_back()
    }

    /// The only active ball, if exactly one remains
    pub fn sole(&self) -> Option<&Ball> {
        if self.active.len() == 1 {
            self.active.values().next()
        } else {
            None
        }
    }
}
