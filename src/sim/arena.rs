//! Rotating ring arena
//!
//! The ring is `N` logical segments around a circle with the last `G` indices
//! never instantiated, which leaves the escape gap. Segment poses are
//! recomputed from (center, radius, angle, index) every tick, never
//! accumulated, so the ring cannot drift.

use std::f32::consts::{FRAC_PI_2, TAU};

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::physics::{Body, BodyHandle, BodyLabel, PhysicsWorld};
use crate::config::GameConfig;
use crate::consts::RING_SEGMENT_OVERLAP;
use crate::error::PhysicsError;
use crate::{cartesian_to_polar, normalize_angle, polar_to_cartesian};

/// One instantiated wall segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingSegment {
    /// Logical index around the circle (0 at the top)
    pub index: usize,
    pub body: BodyHandle,
}

/// Observable ring pose for the renderer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RingPose {
    pub center: Vec2,
    pub radius: f32,
    /// Accumulated rotation, normalized to [-π, π)
    pub angle: f32,
    pub segment_count: usize,
    pub gap: usize,
    /// Gap start angle (radians, normalized)
    pub gap_start: f32,
    /// Gap end angle (radians, normalized)
    pub gap_end: f32,
}

impl RingPose {
    /// Check if an angle around the center falls inside the gap
    pub fn gap_contains_angle(&self, theta: f32) -> bool {
        let theta = normalize_angle(theta);
        if self.gap_start <= self.gap_end {
            theta >= self.gap_start && theta <= self.gap_end
        } else {
            // Gap straddles ±π
            theta >= self.gap_start || theta <= self.gap_end
        }
    }

    /// Check if a canvas point lies in the gap's angular sector
    pub fn gap_contains_point(&self, point: Vec2) -> bool {
        let (_, theta) = cartesian_to_polar(point - self.center);
        self.gap_contains_angle(theta)
    }
}

/// Ring geometry and rotation dynamics
#[derive(Debug, Clone)]
pub struct Arena {
    center: Vec2,
    radius: f32,
    segment_count: usize,
    gap: usize,
    angle: f32,
    speed: f32,
    direction: f32,
    base_speed: f32,
    change_interval: f64,
    flip_chance: f64,
    last_change: f64,
    segments: Vec<RingSegment>,
}

impl Arena {
    /// Create a fresh ring and add its segments to the world
    pub fn build(world: &mut PhysicsWorld, config: &GameConfig, now: f64) -> Result<Self, PhysicsError> {
        let mut arena = Self {
            center: config.center(),
            radius: config.ring_radius,
            segment_count: config.ring_segments,
            gap: config.ring_gap,
            angle: 0.0,
            speed: config.base_rotation_speed,
            direction: 1.0,
            base_speed: config.base_rotation_speed,
            change_interval: config.rotation_change_interval,
            flip_chance: config.direction_flip_chance,
            last_change: now,
            segments: Vec::with_capacity(config.ring_segments - config.ring_gap),
        };

        let step = TAU / arena.segment_count as f32;
        let half_extents = Vec2::new(
            arena.radius * step * RING_SEGMENT_OVERLAP / 2.0,
            config.ring_thickness / 2.0,
        );

        for index in arena.solid_indices() {
            let theta = arena.segment_angle(index);
            let body = Body::static_box(
                BodyLabel::Ring,
                arena.center + polar_to_cartesian(arena.radius, theta),
                half_extents,
                theta + FRAC_PI_2,
            )
            .with_material(config.ring_restitution, config.ring_friction);
            match world.insert(body) {
                Ok(handle) => arena.segments.push(RingSegment { index, body: handle }),
                Err(err) => {
                    // Roll back the segments already inserted
                    for segment in arena.segments.drain(..) {
                        world.remove(segment.body);
                    }
                    return Err(err);
                }
            }
        }

        log::debug!(
            "Ring built: {} segments, gap {}, radius {}",
            arena.segments.len(),
            arena.gap,
            arena.radius
        );
        Ok(arena)
    }

    /// Logical indices that carry a wall (everything but the last `gap`)
    fn solid_indices(&self) -> std::ops::Range<usize> {
        0..self.segment_count - self.gap
    }

    /// Angle of a logical index with zero rotation (index 0 at the top)
    pub fn base_angle(&self, index: usize) -> f32 {
        index as f32 * (TAU / self.segment_count as f32) - FRAC_PI_2
    }

    /// Current angle of a logical index
    pub fn segment_angle(&self, index: usize) -> f32 {
        self.base_angle(index) + self.angle
    }

    /// Current centre point of a logical index
    pub fn segment_position(&self, index: usize) -> Vec2 {
        self.center + polar_to_cartesian(self.radius, self.segment_angle(index))
    }

    /// Advance rotation and push fresh segment poses into the world
    pub fn tick<R: Rng>(&mut self, world: &mut PhysicsWorld, rng: &mut R, now: f64) {
        if now - self.last_change > self.change_interval {
            self.last_change = now;
            if rng.random_bool(self.flip_chance) {
                self.direction = -self.direction;
            }
            self.speed = self.base_speed * (0.5 + rng.random::<f32>());
            log::debug!(
                "Ring rotation now {:.4} rad/tick, direction {}",
                self.speed,
                self.direction
            );
        }

        self.angle = normalize_angle(self.angle + self.speed * self.direction);
        self.sync_segments(world);
    }

    fn sync_segments(&self, world: &mut PhysicsWorld) {
        for segment in &self.segments {
            let theta = self.segment_angle(segment.index);
            let pos = self.center + polar_to_cartesian(self.radius, theta);
            if let Err(err) = world.set_pose(segment.body, pos, theta + FRAC_PI_2) {
                log::warn!("Ring segment {} not updated: {}", segment.index, err);
            }
        }
    }

    /// Remove every segment from the world
    pub fn teardown(self, world: &mut PhysicsWorld) {
        for segment in &self.segments {
            world.remove(segment.body);
        }
        log::debug!("Ring torn down ({} segments)", self.segments.len());
    }

    pub fn segments(&self) -> &[RingSegment] {
        &self.segments
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn direction(&self) -> f32 {
        self.direction
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn pose(&self) -> RingPose {
        let step = TAU / self.segment_count as f32;
        let gap_start = self.segment_angle(self.segment_count - self.gap);
        RingPose {
            center: self.center,
            radius: self.radius,
            angle: self.angle,
            segment_count: self.segment_count,
            gap: self.gap,
            gap_start: normalize_angle(gap_start),
            gap_end: normalize_angle(gap_start + self.gap as f32 * step),
        }
    }
}
