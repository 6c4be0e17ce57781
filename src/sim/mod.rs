//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only (simulated clock, no wall clock)
//! - Seeded RNG only
//! - Stable iteration order (balls by id, bodies by slot)
//! - No rendering or transport dependencies

pub mod arena;
pub mod ball;
pub mod intake;
pub mod physics;
pub mod round;
pub mod session;
pub mod snapshot;
pub mod tick;

pub use arena::{Arena, RingPose, RingSegment};
pub use ball::{Ball, BallId, BallRegistry, Frozen, Owner, boost_to_min_speed};
pub use intake::{
    EventQueue, FreezeRequest, GiftNotice, IntakeEvent, LikeNotice, NEON_COLORS, SpawnRequest,
    StreamNotice, parse_line,
};
pub use physics::{Body, BodyHandle, BodyLabel, Contact, PhysicsWorld, Shape, reflect_velocity};
pub use round::{GamePhase, RoundState, Winner};
pub use session::GameSession;
pub use snapshot::{BallSnapshot, SessionEvent, SessionSnapshot};
pub use tick::tick;
