//! 2D rigid-body world
//!
//! Arcade-grade physics for circles (balls) and oriented boxes (walls and
//! ring segments). Bodies live in a generational slot arena so handles held by
//! the ball registry and the ring can never alias a recycled body:
//! - Removal detaches a body immediately; its slot is freed at the next step
//! - Dynamic bodies are integrated with substeps bounded by their radius
//! - Contact starts are reported once per touching pair

use std::collections::HashSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::PhysicsError;

/// Maximum substeps per step
pub const MAX_SUBSTEPS: usize = 8;
/// Largest accepted step, in frames (larger steps are clamped)
pub const MAX_STEP_DT: f32 = 4.0;

/// Stable reference to a body (slot index + generation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle {
    index: u32,
    generation: u32,
}

/// Collision geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Circle { radius: f32 },
    /// Oriented box, half extents along its local axes
    Box { half_extents: Vec2 },
}

/// What a body represents (used to classify contacts)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BodyLabel {
    Wall,
    Ring,
    Ball,
}

/// A rigid body
#[derive(Debug, Clone, Copy)]
pub struct Body {
    pub label: BodyLabel,
    pub shape: Shape,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Orientation (radians), only meaningful for boxes
    pub angle: f32,
    pub restitution: f32,
    pub friction: f32,
    /// Fraction of velocity lost per frame
    pub air_friction: f32,
    /// Static bodies never move on their own and have infinite mass
    pub is_static: bool,
}

impl Body {
    /// A dynamic ball
    pub fn circle(pos: Vec2, radius: f32) -> Self {
        Self {
            label: BodyLabel::Ball,
            shape: Shape::Circle { radius },
            pos,
            vel: Vec2::ZERO,
            angle: 0.0,
            restitution: 0.0,
            friction: 0.0,
            air_friction: 0.0,
            is_static: false,
        }
    }

    /// A static oriented box
    pub fn static_box(label: BodyLabel, pos: Vec2, half_extents: Vec2, angle: f32) -> Self {
        Self {
            label,
            shape: Shape::Box { half_extents },
            pos,
            vel: Vec2::ZERO,
            angle,
            restitution: 0.0,
            friction: 0.0,
            air_friction: 0.0,
            is_static: true,
        }
    }

    pub fn with_material(mut self, restitution: f32, friction: f32) -> Self {
        self.restitution = restitution;
        self.friction = friction;
        self
    }

    pub fn with_air_friction(mut self, air_friction: f32) -> Self {
        self.air_friction = air_friction;
        self
    }

    pub fn with_velocity(mut self, vel: Vec2) -> Self {
        self.vel = vel;
        self
    }

    fn is_dynamic_circle(&self) -> bool {
        !self.is_static && matches!(self.shape, Shape::Circle { .. })
    }

    fn radius(&self) -> Option<f32> {
        match self.shape {
            Shape::Circle { radius } => Some(radius),
            Shape::Box { .. } => None,
        }
    }
}

/// A pair that started touching during a step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// The dynamic ball involved
    pub ball: BodyHandle,
    /// The other body
    pub other: BodyHandle,
    pub other_label: BodyLabel,
    /// Contact point on the ball surface
    pub point: Vec2,
    /// Ball speed just before the contact was resolved
    pub speed: f32,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    body: Option<Body>,
    /// Removed but not yet freed (freed at the next step boundary)
    detached: bool,
}

/// Penetration between a circle and another shape
#[derive(Debug, Clone, Copy)]
struct Penetration {
    /// Unit normal pointing from the other body toward the circle
    normal: Vec2,
    depth: f32,
}

/// The simulation world
#[derive(Debug, Clone)]
pub struct PhysicsWorld {
    gravity: Vec2,
    max_speed: f32,
    slots: Vec<Slot>,
    free: Vec<u32>,
    pending_removal: Vec<BodyHandle>,
    touching: HashSet<(BodyHandle, BodyHandle)>,
}

impl PhysicsWorld {
    pub fn new(gravity: Vec2, max_speed: f32) -> Self {
        Self {
            gravity,
            max_speed,
            slots: Vec::new(),
            free: Vec::new(),
            pending_removal: Vec::new(),
            touching: HashSet::new(),
        }
    }

    /// Add a body, rejecting non-finite geometry and sanitizing velocity
    pub fn insert(&mut self, mut body: Body) -> Result<BodyHandle, PhysicsError> {
        if !body.pos.is_finite() {
            return Err(PhysicsError::NonFinite { what: "body position" });
        }
        if !body.angle.is_finite() {
            return Err(PhysicsError::NonFinite { what: "body angle" });
        }
        let size_ok = match body.shape {
            Shape::Circle { radius } => radius.is_finite() && radius > 0.0,
            Shape::Box { half_extents } => {
                half_extents.is_finite() && half_extents.x > 0.0 && half_extents.y > 0.0
            }
        };
        if !size_ok {
            return Err(PhysicsError::NonFinite { what: "body size" });
        }
        body.vel = if body.is_static {
            Vec2::ZERO
        } else {
            self.sanitize_velocity(body.vel)
        };

        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.body = Some(body);
                slot.detached = false;
                BodyHandle {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    body: Some(body),
                    detached: false,
                });
                BodyHandle { index, generation: 0 }
            }
        };
        Ok(handle)
    }

    /// Detach a body. Returns false if it was already removed (idempotent).
    pub fn remove(&mut self, handle: BodyHandle) -> bool {
        match self.slot_mut(handle) {
            Some(slot) => {
                slot.detached = true;
                self.pending_removal.push(handle);
                true
            }
            None => false,
        }
    }

    /// Whether the handle refers to a live body
    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.body(handle).is_some()
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation && !slot.detached)
            .and_then(|slot| slot.body.as_ref())
    }

    fn slot_mut(&mut self, handle: BodyHandle) -> Option<&mut Slot> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| {
                slot.generation == handle.generation && !slot.detached && slot.body.is_some()
            })
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.slot_mut(handle).and_then(|slot| slot.body.as_mut())
    }

    pub fn position(&self, handle: BodyHandle) -> Option<Vec2> {
        self.body(handle).map(|b| b.pos)
    }

    pub fn velocity(&self, handle: BodyHandle) -> Option<Vec2> {
        self.body(handle).map(|b| b.vel)
    }

    /// Set a body's velocity (non-finite becomes zero, magnitude is capped)
    pub fn set_velocity(&mut self, handle: BodyHandle, vel: Vec2) -> Result<(), PhysicsError> {
        let vel = self.sanitize_velocity(vel);
        let body = self.body_mut(handle).ok_or(PhysicsError::StaleHandle)?;
        if !body.is_static {
            body.vel = vel;
        }
        Ok(())
    }

    /// Teleport a body (used for ring segments and demo-ball recycling)
    pub fn set_pose(&mut self, handle: BodyHandle, pos: Vec2, angle: f32) -> Result<(), PhysicsError> {
        if !pos.is_finite() || !angle.is_finite() {
            return Err(PhysicsError::NonFinite { what: "pose" });
        }
        let body = self.body_mut(handle).ok_or(PhysicsError::StaleHandle)?;
        body.pos = pos;
        body.angle = angle;
        Ok(())
    }

    /// Make a body immovable (velocity zeroed) or mobile again
    pub fn set_static(&mut self, handle: BodyHandle, is_static: bool) -> Result<(), PhysicsError> {
        let body = self.body_mut(handle).ok_or(PhysicsError::StaleHandle)?;
        body.is_static = is_static;
        if is_static {
            body.vel = Vec2::ZERO;
        }
        Ok(())
    }

    pub fn is_static(&self, handle: BodyHandle) -> Option<bool> {
        self.body(handle).map(|b| b.is_static)
    }

    /// Number of live (attached) bodies
    pub fn body_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.body.is_some() && !slot.detached)
            .count()
    }

    /// Number of live dynamic bodies
    pub fn dynamic_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| !slot.detached)
            .filter_map(|slot| slot.body.as_ref())
            .filter(|body| !body.is_static)
            .count()
    }

    fn sanitize_velocity(&self, vel: Vec2) -> Vec2 {
        if !vel.is_finite() {
            log::warn!("Rejected non-finite velocity ({}, {})", vel.x, vel.y);
            return Vec2::ZERO;
        }
        let speed = vel.length();
        if speed > self.max_speed {
            vel * (self.max_speed / speed)
        } else {
            vel
        }
    }

    /// Free the slots of bodies removed since the last step
    fn flush_removals(&mut self) {
        for handle in self.pending_removal.drain(..) {
            let slot = &mut self.slots[handle.index as usize];
            if slot.generation == handle.generation && slot.body.is_some() {
                slot.body = None;
                slot.detached = false;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(handle.index);
            }
        }
        let slots = &self.slots;
        self.touching.retain(|(a, b)| {
            let live = |h: &BodyHandle| {
                slots
                    .get(h.index as usize)
                    .is_some_and(|s| s.generation == h.generation && s.body.is_some())
            };
            live(a) && live(b)
        });
    }

    fn handle_at(&self, index: usize) -> BodyHandle {
        BodyHandle {
            index: index as u32,
            generation: self.slots[index].generation,
        }
    }

    /// Advance the world by `dt` frames
    ///
    /// Returns the contacts that started during this step.
    pub fn step(&mut self, dt: f32) -> Result<Vec<Contact>, PhysicsError> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(PhysicsError::InvalidTimestep(dt));
        }
        let dt = if dt > MAX_STEP_DT {
            log::debug!("Clamping physics step {} -> {}", dt, MAX_STEP_DT);
            MAX_STEP_DT
        } else {
            dt
        };

        self.flush_removals();

        let dynamic: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.detached)
            .filter_map(|(i, slot)| slot.body.as_ref().map(|b| (i, b)))
            .filter(|(_, body)| body.is_dynamic_circle())
            .map(|(i, _)| i)
            .collect();

        // Substeps keep per-substep travel under half the smallest radius
        let mut max_travel = 0.0_f32;
        let mut min_radius = f32::MAX;
        for &i in &dynamic {
            if let Some(body) = &self.slots[i].body {
                max_travel = max_travel.max(body.vel.length() * dt);
                if let Some(r) = body.radius() {
                    min_radius = min_radius.min(r);
                }
            }
        }
        let substeps = if dynamic.is_empty() {
            1
        } else {
            ((max_travel / (min_radius * 0.5)).ceil() as usize).clamp(1, MAX_SUBSTEPS)
        };
        let h = dt / substeps as f32;

        let mut touching_now = HashSet::new();
        let mut contacts = Vec::new();

        for _ in 0..substeps {
            for &i in &dynamic {
                if let Some(body) = self.slots[i].body.as_mut() {
                    body.vel += self.gravity * h;
                    body.vel *= (1.0 - body.air_friction * h).max(0.0);
                    body.pos += body.vel * h;
                }
            }

            for &i in &dynamic {
                for j in 0..self.slots.len() {
                    if i == j || self.slots[j].detached {
                        continue;
                    }
                    let Some(other) = self.slots[j].body else {
                        continue;
                    };
                    // Dynamic pairs are resolved once, from the lower index
                    if other.is_dynamic_circle() && j < i {
                        continue;
                    }
                    let Some(ball) = self.slots[i].body else {
                        continue;
                    };
                    let Some(hit) = penetration(&ball, &other) else {
                        continue;
                    };

                    let speed = ball.vel.length();
                    let (ball, other) = resolve(ball, other, hit);
                    self.slots[i].body = Some(ball);
                    self.slots[j].body = Some(other);

                    let a = self.handle_at(i);
                    let b = self.handle_at(j);
                    let key = if a < b { (a, b) } else { (b, a) };
                    if touching_now.insert(key) && !self.touching.contains(&key) {
                        let radius = ball.radius().unwrap_or(0.0);
                        contacts.push(Contact {
                            ball: a,
                            other: b,
                            other_label: other.label,
                            point: ball.pos - hit.normal * radius,
                            speed,
                        });
                    }
                }
            }
        }

        self.touching = touching_now;
        Ok(contacts)
    }
}

/// Overlap between a circle and another body
fn penetration(ball: &Body, other: &Body) -> Option<Penetration> {
    let radius = ball.radius()?;
    match other.shape {
        Shape::Circle { radius: other_radius } => {
            let delta = ball.pos - other.pos;
            let dist = delta.length();
            let depth = radius + other_radius - dist;
            if depth <= 0.0 {
                return None;
            }
            let normal = if dist > 1e-6 { delta / dist } else { Vec2::Y };
            Some(Penetration { normal, depth })
        }
        Shape::Box { half_extents } => circle_box(ball.pos, radius, other.pos, half_extents, other.angle),
    }
}

/// Circle vs oriented box, computed in the box's local frame
fn circle_box(center: Vec2, radius: f32, box_pos: Vec2, half: Vec2, angle: f32) -> Option<Penetration> {
    let to_local = Vec2::from_angle(-angle);
    let to_world = Vec2::from_angle(angle);
    let local = to_local.rotate(center - box_pos);
    let clamped = local.clamp(-half, half);

    if clamped == local {
        // Center inside the box: push out along the shallowest axis
        let dx = half.x - local.x.abs();
        let dy = half.y - local.y.abs();
        let (normal, depth) = if dx < dy {
            (Vec2::new(sign(local.x), 0.0), dx + radius)
        } else {
            (Vec2::new(0.0, sign(local.y)), dy + radius)
        };
        return Some(Penetration {
            normal: to_world.rotate(normal),
            depth,
        });
    }

    let diff = local - clamped;
    let dist = diff.length();
    if dist >= radius {
        return None;
    }
    Some(Penetration {
        normal: to_world.rotate(diff / dist),
        depth: radius - dist,
    })
}

fn sign(v: f32) -> f32 {
    if v < 0.0 { -1.0 } else { 1.0 }
}

/// Push bodies apart and exchange normal momentum
fn resolve(mut ball: Body, mut other: Body, hit: Penetration) -> (Body, Body) {
    let n = hit.normal;
    let restitution = ball.restitution.max(other.restitution);
    let friction = ball.friction.min(other.friction);

    if other.is_dynamic_circle() {
        ball.pos += n * (hit.depth * 0.5);
        other.pos -= n * (hit.depth * 0.5);
        let closing = (ball.vel - other.vel).dot(n);
        if closing < 0.0 {
            let impulse = -(1.0 + restitution) * closing * 0.5;
            ball.vel += n * impulse;
            other.vel -= n * impulse;
        }
    } else {
        ball.pos += n * hit.depth;
        let normal_speed = ball.vel.dot(n);
        if normal_speed < 0.0 {
            ball.vel = reflect_velocity(ball.vel, n, restitution);
            let tangent = ball.vel - n * ball.vel.dot(n);
            ball.vel -= tangent * friction;
        }
    }
    (ball, other)
}

/// Reflect velocity off a surface with restitution `e`: v' = v - (1 + e)(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2, restitution: f32) -> Vec2 {
    velocity - (1.0 + restitution) * velocity.dot(normal) * normal
}
