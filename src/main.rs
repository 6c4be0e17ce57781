//! Ball Escape headless runner
//!
//! Reads inbound requests as JSON lines on stdin, runs the tick loop at the
//! frame rate and writes snapshots as JSON lines on stdout.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use ball_escape::sim::SpawnRequest;
use ball_escape::{GameConfig, GameSession, SessionEvent, tick};

#[derive(Parser, Debug)]
#[command(about = "Run a Ball Escape arena headless", version)]
struct Args {
    /// JSON file overriding any subset of the tunables
    #[arg(long)]
    config: Option<PathBuf>,
    /// RNG seed (same seed + same input = same game)
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Stop after this many ticks (0 runs until interrupted)
    #[arg(long, default_value_t = 0)]
    ticks: u64,
    /// Spawn this many test players before the first tick
    #[arg(long, default_value_t = 0)]
    test_balls: u32,
    /// Write a snapshot every N ticks (0 disables snapshots)
    #[arg(long, default_value_t = 1)]
    snapshot_every: u64,
    /// Run as fast as possible instead of at the frame rate
    #[arg(long)]
    fast: bool,
}

fn main() {
    env_logger::init();
    if let Err(err) = run(Args::parse()) {
        log::error!("{:#}", err);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => GameConfig::default(),
    };
    let frame = Duration::from_secs_f64(config.frame_seconds);
    let mut session = GameSession::new(config, args.seed).context("creating session")?;
    log::info!("Ball Escape starting (seed {})", args.seed);

    for i in 0..args.test_balls {
        session.spawn(SpawnRequest::new(format!("test_user_{}", i)).with_display_name(format!("Tester {}", i)));
    }

    let lines = spawn_stdin_reader();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    loop {
        // Intake is serialized through the loop: lines only reach the session here
        while let Ok(line) = lines.try_recv() {
            session.enqueue_line(&line);
        }

        tick(&mut session);

        for event in session.drain_events() {
            match &event {
                SessionEvent::Victory { winner } => {
                    log::info!("Victory: {}", winner.owner.display_name)
                }
                SessionEvent::Impact { .. } => log::trace!("{:?}", event),
                _ => log::debug!("{:?}", event),
            }
        }

        let now = session.time_ticks();
        if args.snapshot_every > 0 && now % args.snapshot_every == 0 {
            let json = session.snapshot().to_json().context("encoding snapshot")?;
            writeln!(out, "{}", json).context("writing snapshot")?;
        }

        if args.ticks > 0 && now >= args.ticks {
            break;
        }
        if !args.fast {
            thread::sleep(frame);
        }
    }

    out.flush()?;
    log::info!("Stopped after {} ticks ({:?})", session.time_ticks(), session.phase());
    Ok(())
}

/// Forward stdin lines to the tick loop
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    log::warn!("stdin closed: {}", err);
                    break;
                }
            }
        }
        log::debug!("stdin reader finished");
    });
    rx
}
