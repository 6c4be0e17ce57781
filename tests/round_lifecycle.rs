use ball_escape::sim::{BallId, SpawnRequest};
use ball_escape::{GameConfig, GamePhase, GameSession, IntakeEvent, SessionEvent, tick};
use glam::Vec2;

fn session(seed: u64) -> GameSession {
    GameSession::new(GameConfig::default(), seed).expect("default config is valid")
}

fn spawn(session: &mut GameSession, owner: &str) -> BallId {
    session
        .spawn(SpawnRequest::new(owner))
        .expect("spawn accepted while attract/playing")
}

fn run(session: &mut GameSession, ticks: usize) {
    for _ in 0..ticks {
        tick(session);
    }
}

#[test]
fn three_balls_two_removed_last_one_wins() {
    let mut session = session(1);
    let a = spawn(&mut session, "alice");
    let b = spawn(&mut session, "bob");
    let c = spawn(&mut session, "carol");

    assert!(session.remove_ball(a));
    assert!(session.remove_ball(b));
    tick(&mut session);

    assert_eq!(session.phase(), GamePhase::Victory);
    let winner = session.winner().expect("winner recorded");
    assert_eq!(winner.ball, c);
    assert_eq!(winner.owner.id, "carol");
    assert!(
        session
            .drain_events()
            .iter()
            .any(|e| matches!(e, SessionEvent::Victory { winner } if winner.ball == c))
    );
}

#[test]
fn single_ball_removed_is_remembered_as_winner() {
    let mut session = session(2);
    let only = spawn(&mut session, "solo");
    tick(&mut session);
    assert_eq!(session.phase(), GamePhase::Playing, "one ball alone is not a win");

    assert!(session.remove_ball(only));
    tick(&mut session);

    assert_eq!(session.phase(), GamePhase::Victory);
    assert_eq!(session.winner().map(|w| w.ball), Some(only));
}

#[test]
fn fallen_ball_decides_round() {
    let mut session = session(3);
    let a = spawn(&mut session, "a");
    let b = spawn(&mut session, "b");
    let below = session.config().canvas_height + session.config().fall_margin + 5.0;
    assert!(session.place_ball(a, Vec2::new(200.0, below), Vec2::new(0.0, 3.0)));

    tick(&mut session);

    assert_eq!(session.phase(), GamePhase::Victory);
    assert_eq!(session.winner().map(|w| w.ball), Some(b));
    let events = session.drain_events();
    assert!(events.iter().any(|e| matches!(e, SessionEvent::BallEliminated { ball, .. } if *ball == a)));
}

#[test]
fn remove_twice_is_noop() {
    let mut session = session(4);
    let a = spawn(&mut session, "a");
    spawn(&mut session, "b");
    spawn(&mut session, "c");
    assert!(session.remove_ball(a));
    let count = session.active_count();
    assert!(!session.remove_ball(a));
    assert_eq!(session.active_count(), count);
}

#[test]
fn freeze_round_trip_restores_velocity() {
    let mut session = session(5);
    let id = spawn(&mut session, "frosty");
    let body = session.balls().get(id).unwrap().body;
    let saved = session.world().velocity(body).unwrap();
    let pos = session.world().position(body).unwrap();

    assert_eq!(session.freeze("frosty"), 1);
    tick(&mut session);
    assert!(session.balls().get(id).unwrap().is_frozen());
    assert_eq!(session.world().velocity(body), Some(Vec2::ZERO));
    assert_eq!(session.world().position(body), Some(pos));

    let mut ticks = 1;
    while session.balls().get(id).unwrap().is_frozen() {
        tick(&mut session);
        ticks += 1;
        assert!(ticks < 400, "ball never thawed");
    }
    let duration_ticks = (session.config().freeze_duration / session.config().frame_seconds).round() as i64;
    assert!((ticks as i64 - duration_ticks).abs() <= 1);
    assert_eq!(session.world().velocity(body), Some(saved));
    assert!(
        session
            .drain_events()
            .iter()
            .any(|e| matches!(e, SessionEvent::BallUnfrozen { ball } if *ball == id))
    );
}

#[test]
fn reset_pre_empts_victory_timer() {
    let mut session = session(6);
    let a = spawn(&mut session, "a");
    spawn(&mut session, "b");
    session.remove_ball(a);
    tick(&mut session);
    assert_eq!(session.phase(), GamePhase::Victory);
    assert!(session.restart_deadline().is_some());
    session.drain_events();

    assert!(session.enqueue(IntakeEvent::ResetRequest));
    tick(&mut session);
    assert_eq!(session.phase(), GamePhase::Attract);
    assert!(session.restart_deadline().is_none());
    assert!(session.arena().is_some());

    // Well past the cancelled deadline: it must not fire
    let delay_ticks = (session.config().victory_delay / session.config().frame_seconds).round() as usize;
    run(&mut session, delay_ticks * 2);
    let restarts = session
        .drain_events()
        .into_iter()
        .filter(|e| *e == SessionEvent::Restarted)
        .count();
    assert_eq!(restarts, 1);
    assert_eq!(session.phase(), GamePhase::Attract);
}

#[test]
fn slow_ball_is_boosted_to_min_speed() {
    let mut session = session(7);
    let id = spawn(&mut session, "sleepy");
    let center = session.config().center();
    assert!(session.place_ball(id, center, Vec2::new(0.1, 0.0)));

    tick(&mut session);

    let body = session.balls().get(id).unwrap().body;
    let speed = session.world().velocity(body).unwrap().length();
    assert!(speed >= session.config().min_speed, "speed {} below threshold", speed);
}

#[test]
fn spawns_dropped_during_victory() {
    let mut session = session(8);
    let a = spawn(&mut session, "a");
    spawn(&mut session, "b");
    session.remove_ball(a);
    tick(&mut session);
    assert_eq!(session.phase(), GamePhase::Victory);

    let total = session.total_spawned();
    assert!(session.spawn(SpawnRequest::new("late")).is_none());
    assert_eq!(session.total_spawned(), total);
    assert_eq!(session.active_count(), 0);
}

#[test]
fn first_real_spawn_clears_attract_balls() {
    let mut session = session(9);
    run(&mut session, 30);
    assert_eq!(session.phase(), GamePhase::Attract);
    assert_eq!(session.demo_count(), session.config().demo_ball_count);

    spawn(&mut session, "first");
    assert_eq!(session.phase(), GamePhase::Playing);
    assert_eq!(session.demo_count(), 0);
    run(&mut session, 30);
    assert_eq!(session.demo_count(), 0, "no attract balls while playing");
}

#[test]
fn attract_balls_never_eliminated() {
    let mut session = session(10);
    run(&mut session, 3000);
    assert_eq!(session.phase(), GamePhase::Attract);
    assert_eq!(session.demo_count(), session.config().demo_ball_count);
    let limit = session.config().canvas_height + session.config().demo_fall_margin;
    for ball in session.snapshot().demo_balls {
        assert!(ball.position.y <= limit + session.config().max_speed * 2.0);
    }
}

#[test]
fn same_seed_same_game() {
    let mut first = session(42);
    let mut second = session(42);
    for s in [&mut first, &mut second] {
        run(s, 20);
        for i in 0..6 {
            s.enqueue(IntakeEvent::SpawnRequest(SpawnRequest::new(format!("user{}", i))));
        }
        run(s, 200);
        s.freeze("user2");
        run(s, 400);
    }
    assert_eq!(first.snapshot(), second.snapshot());
    assert_eq!(first.drain_events(), second.drain_events());
}

#[test]
fn snapshot_lists_balls_in_spawn_order() {
    let mut session = session(11);
    let ids: Vec<BallId> = ["x", "y", "z"].iter().map(|o| spawn(&mut session, o)).collect();
    tick(&mut session);
    let snapshot = session.snapshot();
    let listed: Vec<BallId> = snapshot.balls.iter().map(|b| b.id).collect();
    assert_eq!(listed, ids);
    assert_eq!(snapshot.phase, GamePhase::Playing);
    assert!(snapshot.ring.is_some());
    assert!(snapshot.balls.iter().all(|b| b.trail.len() == 1));
    assert!(snapshot.to_json().unwrap().contains("\"totalSpawned\":3"));
}

#[test]
fn gift_and_like_lines_drive_the_round() {
    let mut session = session(12);
    session.enqueue_line(r#"{"type":"gift","ownerId":"gina","displayName":"Gina","giftId":7,"repeatCount":2}"#);
    session.enqueue_line(r#"{"type":"like","ownerId":"hal","likeCount":12}"#);
    tick(&mut session);
    assert_eq!(session.total_spawned(), 2 + session.config().max_like_balls);

    let freeze_gift = format!(
        r#"{{"type":"gift","ownerId":"gina","giftId":{}}}"#,
        session.config().freeze_gift_id
    );
    session.enqueue_line(&freeze_gift);
    tick(&mut session);
    let frozen = session.balls().active().filter(|b| b.is_frozen()).count();
    assert_eq!(frozen, 2);
    assert!(session.balls().active().filter(|b| b.is_frozen()).all(|b| b.owner.id == "gina"));
}

#[test]
fn balls_escape_through_gap_until_one_remains() {
    for seed in [21, 22, 23] {
        let mut session = session(seed);
        let owners: Vec<String> = (0..6).map(|i| format!("racer{}", i)).collect();
        for owner in &owners {
            spawn(&mut session, owner);
        }
        session.drain_events();

        let mut eliminated = Vec::new();
        let mut ticks = 0;
        while session.phase() == GamePhase::Playing {
            tick(&mut session);
            ticks += 1;
            assert!(ticks < 20_000, "seed {}: no winner after {} ticks", seed, ticks);
            for event in session.drain_events() {
                if let SessionEvent::BallEliminated { ball, .. } = event {
                    eliminated.push(ball);
                }
            }
        }

        assert_eq!(session.phase(), GamePhase::Victory, "seed {}", seed);
        assert!(!eliminated.is_empty(), "seed {}: nobody fell out", seed);
        assert!(eliminated.len() <= owners.len());
        let winner = session.winner().expect("winner recorded");
        assert!(owners.contains(&winner.owner.id));
    }
}
