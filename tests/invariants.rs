use std::f32::consts::{FRAC_PI_2, TAU};

use ball_escape::sim::{Arena, PhysicsWorld, SpawnRequest, boost_to_min_speed};
use ball_escape::{GameConfig, GameSession, tick};
use glam::Vec2;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_pcg::Pcg32;

/// Every solid segment sits at center + R·(cos θ, sin θ), θ = baseAngle(i) + rotation
fn assert_segments_on_circle(arena: &Arena, world: &PhysicsWorld, config: &GameConfig) {
    let n = config.ring_segments as f32;
    for segment in arena.segments() {
        let theta = segment.index as f32 * TAU / n - FRAC_PI_2 + arena.angle();
        let expected = config.center() + config.ring_radius * Vec2::new(theta.cos(), theta.sin());
        let actual = world.position(segment.body).expect("segment body alive");
        assert!(
            (actual - expected).length() < 1e-2,
            "segment {} drifted: {:?} vs {:?}",
            segment.index,
            actual,
            expected
        );
    }
}

#[test]
fn ring_does_not_drift_over_ten_thousand_ticks() {
    let mut session = GameSession::new(GameConfig::default(), 77).unwrap();
    for _ in 0..10_000 {
        tick(&mut session);
    }
    let config = session.config().clone();
    let arena = session.arena().expect("ring present in attract mode");
    assert_eq!(arena.segments().len(), config.ring_segments - config.ring_gap);
    assert_segments_on_circle(arena, session.world(), &config);
}

#[derive(Debug, Clone)]
enum Op {
    Spawn(u8),
    Remove(u8),
    Freeze(u8),
    Tick(u8),
    Reset,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..6).prop_map(Op::Spawn),
        2 => any::<u8>().prop_map(Op::Remove),
        1 => (0u8..6).prop_map(Op::Freeze),
        3 => (1u8..30).prop_map(Op::Tick),
        1 => Just(Op::Reset),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn segment_poses_recomputed(
        segments in 4usize..90,
        gap_frac in 0.01f32..0.5,
        ticks in 0usize..300,
        seed in any::<u64>(),
    ) {
        let gap = ((segments as f32 * gap_frac) as usize).clamp(1, segments - 1);
        let config = GameConfig {
            ring_segments: segments,
            ring_gap: gap,
            ..GameConfig::default()
        };
        let mut world = PhysicsWorld::new(Vec2::ZERO, config.max_speed);
        let mut arena = Arena::build(&mut world, &config, 0.0).unwrap();
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut now = 0.0;
        for _ in 0..ticks {
            now += 0.1;
            arena.tick(&mut world, &mut rng, now);
        }
        prop_assert_eq!(arena.segments().len(), segments - gap);
        assert_segments_on_circle(&arena, &world, &config);
    }

    #[test]
    fn active_count_bounded_by_spawned(ops in prop::collection::vec(op(), 1..40), seed in any::<u64>()) {
        let mut session = GameSession::new(GameConfig::default(), seed).unwrap();
        for op in ops {
            match op {
                Op::Spawn(owner) => {
                    session.spawn(SpawnRequest::new(format!("owner{}", owner)));
                }
                Op::Remove(pick) => {
                    let ids: Vec<_> = session.balls().active().map(|b| b.id).collect();
                    if !ids.is_empty() {
                        let id = ids[pick as usize % ids.len()];
                        prop_assert!(session.remove_ball(id));
                        prop_assert!(!session.remove_ball(id));
                    }
                }
                Op::Freeze(owner) => {
                    session.freeze(&format!("owner{}", owner));
                }
                Op::Tick(n) => {
                    for _ in 0..n {
                        tick(&mut session);
                    }
                }
                Op::Reset => session.reset(),
            }
            prop_assert!(session.active_count() <= session.total_spawned() as usize);
        }
    }

    #[test]
    fn boost_reaches_min_speed(
        vx in -1.99f32..1.99,
        vy in -1.99f32..1.99,
        angle in 0.0f32..TAU,
        min_speed in 0.5f32..5.0,
    ) {
        let vel = Vec2::new(vx, vy);
        prop_assume!(vel.length() < min_speed);
        let boosted = boost_to_min_speed(vel, min_speed, Vec2::from_angle(angle));
        prop_assert!(boosted.length() >= min_speed - 1e-3);
    }
}
