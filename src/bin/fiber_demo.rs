//! Fiber Scheduler Demo
//!
//! Runs a small scene through the engine and logs what the fibers do.
//!
//! Usage:
//!   cargo run --bin fiber_demo -- --scene 1             # Blinkers in two groups
//!   cargo run --bin fiber_demo -- --scene 2 --offline   # Race against a timeout
//!   RUST_LOG=rust_fiber_lib=debug cargo run --bin fiber_demo -- --scene 3
//!
//! Scenes:
//!   1. Groups     - Two groups of blinkers; one group is paused halfway
//!   2. Timeout    - A slow job raced against a timer
//!   3. Promise    - A worker resolves a promise another fiber waits on

use clap::Parser;
use rust_fiber_lib::{
    combine, from_fn, race, wait_seconds, ClockMode, Control, Engine, EngineConfig, Promise,
    Sequence, SpawnOptions, Step, StopCause,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "fiber_demo", about = "Tick-driven fiber scheduler demo")]
struct Args {
    /// Scene to run (1-3).
    #[arg(short, long, default_value_t = 1)]
    scene: u32,

    /// Step frames as fast as possible instead of in realtime.
    #[arg(long)]
    offline: bool,

    /// Frames per second; overrides the config file.
    #[arg(long)]
    fps: Option<f64>,

    /// TOML engine config.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds of simulated time to run for.
    #[arg(long, default_value_t = 3.0)]
    seconds: f64,
}

fn blinker(name: &'static str, period: f64) -> impl Sequence {
    let mut on = false;
    from_fn(move |cx| {
        on = !on;
        info!(fiber = name, on, t = cx.time(), "blink");
        Ok(Step::Yield(Control::Wait(period)))
    })
}

fn scene_groups(engine: &mut Engine) -> Result<(), Box<dyn std::error::Error>> {
    const RED: u32 = 1 << 0;
    const BLUE: u32 = 1 << 1;

    for (name, group, period) in [("red-a", RED, 0.25), ("red-b", RED, 0.4), ("blue", BLUE, 0.3)] {
        engine.scheduler.spawn_with(
            blinker(name, period),
            SpawnOptions {
                name: Some(name.into()),
                groups: group,
                ..Default::default()
            },
        )?;
    }
    engine.scheduler.set_group_time_scale(1, 2.0)?;

    let mut paused = false;
    engine.scheduler.spawn(from_fn(move |cx| {
        if !paused && cx.time() >= 1.0 {
            paused = true;
            info!("pausing red group");
            cx.scheduler().pause_groups(RED);
        }
        Ok(Step::Yield(Control::NextTick))
    }))?;
    Ok(())
}

fn scene_timeout(engine: &mut Engine) -> Result<(), Box<dyn std::error::Error>> {
    let mut progress = 0u32;
    let slow_job = from_fn(move |_| {
        progress += 1;
        if progress % 30 == 0 {
            info!(progress, "slow job working");
        }
        if progress >= 600 {
            Ok(Step::Done)
        } else {
            Ok(Step::Yield(Control::NextTick))
        }
    });

    let h = engine
        .scheduler
        .spawn_boxed(race(vec![slow_job.boxed(), wait_seconds(1.5).boxed()]), SpawnOptions {
            name: Some("job-with-timeout".into()),
            ..Default::default()
        })?;
    engine.scheduler.on_complete(h, |s| {
        info!(t = s.time(), "race finished");
    });
    Ok(())
}

fn scene_promise(engine: &mut Engine) -> Result<(), Box<dyn std::error::Error>> {
    let promise: Promise<u64> = Promise::new();

    let producer = promise.clone();
    let mut sum = 0u64;
    let mut i = 0u64;
    let worker = engine.scheduler.spawn(from_fn(move |_| {
        // A bit of work per tick.
        for _ in 0..1000 {
            i += 1;
            sum += i;
        }
        if i >= 50_000 {
            producer.resolve(sum);
            Ok(Step::Done)
        } else {
            Ok(Step::Yield(Control::NextTick))
        }
    }))?;
    promise.link(&mut engine.scheduler, worker);

    let consumer = promise.clone();
    let mut waited = false;
    let waiter = from_fn(move |_| {
        if !waited {
            waited = true;
            return Ok(Step::Yield(consumer.wait()));
        }
        info!(value = ?consumer.value(), "promise resolved");
        Ok(Step::Done)
    });
    let h = engine
        .scheduler
        .spawn_boxed(combine(vec![waiter.boxed(), wait_seconds(0.5).boxed()]), SpawnOptions::default())?;
    engine.scheduler.on_stop(h, |_, cause: &StopCause| {
        info!(%cause, "waiter stopped");
    });
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fiber_demo=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    if let Some(fps) = args.fps {
        config.fps = fps;
    }

    let mode = if args.offline {
        ClockMode::Offline
    } else {
        ClockMode::Realtime
    };
    let mut engine = Engine::new(mode, config)?;

    match args.scene {
        1 => scene_groups(&mut engine)?,
        2 => scene_timeout(&mut engine)?,
        3 => scene_promise(&mut engine)?,
        other => {
            eprintln!("Unknown scene {}; expected 1-3", other);
            return Ok(());
        }
    }

    let end = args.seconds;
    info!(scene = args.scene, ?mode, seconds = end, "running");
    engine.run_until(|s| s.time() >= end || s.active_count() == 0);

    info!(
        ticks = engine.scheduler.tick_count(),
        active = engine.scheduler.active_count(),
        "done"
    );
    engine.scheduler.shutdown();
    Ok(())
}
