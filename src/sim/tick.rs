//! Fixed timestep simulation tick
//!
//! Advances a session by one display frame in a fixed order:
//! intake → restart deadline → physics → ring → attract seeding →
//! min-speed → demo recycling → frozen sweep → trails → fallen sweep →
//! victory check → winner removal.

use crate::consts::IMPACT_MIN_SPEED;

use super::physics::BodyLabel;
use super::round::GamePhase;
use super::session::GameSession;
use super::snapshot::SessionEvent;

/// Advance the session by one frame
pub fn tick(session: &mut GameSession) {
    session.time_ticks += 1;
    session.clock += session.config.frame_seconds;

    // Requests queued since the last tick
    for event in session.intake.drain() {
        session.apply(event);
    }

    if session.round.restart_due(session.clock) {
        log::info!("Victory delay elapsed");
        session.restart();
    }

    step_physics(session);

    let phase = session.round.phase;
    if phase.rotates() {
        if let Some(arena) = session.arena.as_mut() {
            arena.tick(&mut session.world, &mut session.rng, session.clock);
        }
    }

    // Attract mode keeps the arena lively until the first player arrives
    if phase == GamePhase::Attract && session.balls.active_len() == 0 && session.balls.demo_len() == 0 {
        session
            .balls
            .seed_demo(&mut session.world, &mut session.rng, &session.config);
    }

    session
        .balls
        .tick_min_speed(&mut session.world, &mut session.rng, session.config.min_speed);

    let center = session.config.center();
    session.balls.recycle_demo(
        &mut session.world,
        &mut session.rng,
        session.config.canvas_height + session.config.demo_fall_margin,
        center,
        session.config.demo_spawn_jitter,
        session.config.demo_respawn_speed,
    );

    let thawed = session.balls.tick_frozen(
        &mut session.world,
        &mut session.rng,
        session.clock,
        session.config.unfreeze_speed,
    );
    session
        .events
        .extend(thawed.into_iter().map(|ball| SessionEvent::BallUnfrozen { ball }));

    session
        .balls
        .update_trails(&session.world, session.config.trail_length);

    sweep_fallen(session);
    check_victory(session);
    remove_winner_body(session);
}

fn step_physics(session: &mut GameSession) {
    let contacts = match session.world.step(session.config.speed_multiplier) {
        Ok(contacts) => contacts,
        Err(err) => {
            log::warn!("Physics step skipped: {}", err);
            return;
        }
    };

    for contact in contacts {
        if contact.speed < IMPACT_MIN_SPEED {
            continue;
        }
        let Some(ball) = session.balls.id_for_body(contact.ball) else {
            continue;
        };
        session.events.push(SessionEvent::Impact {
            ball,
            point: contact.point,
            speed: contact.speed,
            surface: contact.other_label,
        });
        if contact.other_label == BodyLabel::Ring {
            log::trace!("Ball {} hit the ring at {:.1}", ball, contact.speed);
        }
    }
}

fn sweep_fallen(session: &mut GameSession) {
    let survivor = session.newest_survivor();
    session.round.note_survivor(survivor);

    let limit = session.config.canvas_height + session.config.fall_margin;
    for ball in session.balls.tick_fallen(&mut session.world, limit) {
        log::info!(
            "Ball {} of {} fell out ({} left)",
            ball.id,
            ball.owner.display_name,
            session.balls.active_len()
        );
        session.events.push(SessionEvent::BallEliminated {
            ball: ball.id,
            owner_id: ball.owner.id,
        });
    }
}

fn check_victory(session: &mut GameSession) {
    if session.round.phase != GamePhase::Playing {
        return;
    }
    let survivor = session.newest_survivor();
    session.round.note_survivor(survivor);

    let sole = session.sole_survivor();
    if let Some(winner) = session.round.evaluate_victory(session.balls.active_len(), sole) {
        session.declare_victory(winner);
    }
}

/// The winner leaves physics once victory is declared; the record stays in the round
fn remove_winner_body(session: &mut GameSession) {
    if session.round.phase != GamePhase::Victory || !session.round.winner_pending_removal {
        return;
    }
    session.round.winner_pending_removal = false;
    if let Some(winner) = session.round.winner.as_ref() {
        let id = winner.ball;
        session.balls.remove(&mut session.world, id);
    }
}
