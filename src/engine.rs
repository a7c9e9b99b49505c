//! Engine - realtime and offline host loops
//!
//! The engine owns a scheduler and calls `tick` for you. The clock mode
//! decides how `run_until` feeds it:
//! - Realtime: measures wall-clock deltas and paces frames with spin_sleep
//! - Offline: one fixed frame per tick, as fast as possible
//!
//! The `step_*` methods tick with fixed deltas in either mode.

use crate::config::EngineConfig;
use crate::error::SchedError;
use crate::handle::FiberHandle;
use crate::scheduler::Scheduler;
use crate::sequence::Sequence;
use spin_sleep::SpinSleeper;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockMode {
    Realtime,
    Offline,
}

/// Upper bound on frames for `run_until_idle`.
const MAX_IDLE_FRAMES: usize = 1_000_000;

pub struct Engine {
    pub scheduler: Scheduler,
    sleeper: SpinSleeper,
    fps: f64,
    mode: ClockMode,
}

impl Engine {
    pub fn new(mode: ClockMode, config: EngineConfig) -> Result<Self, SchedError> {
        config.validate()?;
        let mut scheduler = Scheduler::new(config.scheduler.clone())?;
        scheduler.set_global_time_scale(config.time_scale);
        debug!(?mode, fps = config.fps, "engine created");
        Ok(Self {
            scheduler,
            sleeper: SpinSleeper::default(),
            fps: config.fps,
            mode,
        })
    }

    pub fn mode(&self) -> ClockMode {
        self.mode
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Seconds per frame.
    pub fn frame_duration(&self) -> f64 {
        1.0 / self.fps
    }

    pub fn spawn<S: Sequence + 'static>(&mut self, seq: S) -> Result<FiberHandle, SchedError> {
        self.scheduler.spawn(seq)
    }

    /// Tick once with `dt` seconds (offline mode).
    pub fn step_sec(&mut self, dt: f64) {
        self.scheduler.tick(dt);
    }

    /// Tick once with one frame's worth of time (offline mode).
    pub fn step_frame(&mut self) {
        let dt = self.frame_duration();
        self.step_sec(dt);
    }

    /// Step by N frames (offline mode).
    pub fn step_frames(&mut self, n: usize) {
        for _ in 0..n {
            self.step_frame();
        }
    }

    /// Step frames until no fiber is left or `max_frames` have run. Returns
    /// whether the scheduler went idle.
    pub fn run_until_idle(&mut self, max_frames: usize) -> bool {
        let limit = max_frames.min(MAX_IDLE_FRAMES);
        for _ in 0..limit {
            if self.scheduler.active_count() == 0 {
                return true;
            }
            self.step_frame();
        }
        self.scheduler.active_count() == 0
    }

    /// Tick until `is_done` returns true.
    ///
    /// In realtime mode each tick gets the wall time elapsed since the
    /// previous one and the loop sleeps out the rest of the frame. In
    /// offline mode every tick gets exactly one frame and nothing sleeps.
    pub fn run_until<F>(&mut self, mut is_done: F)
    where
        F: FnMut(&Scheduler) -> bool,
    {
        if self.mode == ClockMode::Offline {
            while !is_done(&self.scheduler) {
                self.step_frame();
            }
            return;
        }

        let frame = Duration::from_secs_f64(self.frame_duration());
        let mut last = Instant::now();
        loop {
            if is_done(&self.scheduler) {
                break;
            }

            let now = Instant::now();
            let dt = now.duration_since(last).as_secs_f64();
            last = now;
            self.scheduler.tick(dt);

            let spent = now.elapsed();
            if spent < frame {
                self.sleeper.sleep(frame - spent);
            }
        }
    }

    /// Tick until every fiber has finished.
    pub fn run_until_complete(&mut self) {
        self.run_until(|s| s.active_count() == 0);
    }
}

/// Builder for offline simulations.
pub struct OfflineRunner {
    engine: Engine,
}

impl OfflineRunner {
    pub fn new<S: Sequence + 'static>(seq: S, config: EngineConfig) -> Result<Self, SchedError> {
        let mut engine = Engine::new(ClockMode::Offline, config)?;
        engine.spawn(seq)?;
        Ok(Self { engine })
    }

    pub fn scheduler(&mut self) -> &mut Scheduler {
        &mut self.engine.scheduler
    }

    /// Total scaled time so far.
    pub fn now(&self) -> f64 {
        self.engine.scheduler.time()
    }

    pub fn step_sec(&mut self, dt: f64) {
        self.engine.step_sec(dt);
    }

    pub fn step_frame(&mut self) {
        self.engine.step_frame();
    }

    pub fn step_frames(&mut self, n: usize) {
        self.engine.step_frames(n);
    }

    pub fn run_until_idle(&mut self, max_frames: usize) -> bool {
        self.engine.run_until_idle(max_frames)
    }

    pub fn run_until<F>(&mut self, is_done: F)
    where
        F: FnMut(&Scheduler) -> bool,
    {
        self.engine.run_until(is_done);
    }
}

/// Builder for realtime runs.
pub struct RealtimeRunner {
    engine: Engine,
}

impl RealtimeRunner {
    pub fn new<S: Sequence + 'static>(seq: S, config: EngineConfig) -> Result<Self, SchedError> {
        let mut engine = Engine::new(ClockMode::Realtime, config)?;
        engine.spawn(seq)?;
        Ok(Self { engine })
    }

    pub fn scheduler(&mut self) -> &mut Scheduler {
        &mut self.engine.scheduler
    }

    pub fn run_until_complete(&mut self) {
        self.engine.run_until_complete();
    }

    pub fn run_until<F>(&mut self, is_done: F)
    where
        F: FnMut(&Scheduler) -> bool,
    {
        self.engine.run_until(is_done);
    }
}

/// Start an offline simulation with the default config.
pub fn launch_offline<S: Sequence + 'static>(seq: S) -> Result<OfflineRunner, SchedError> {
    OfflineRunner::new(seq, EngineConfig::default())
}

pub fn launch_offline_with_config<S: Sequence + 'static>(
    seq: S,
    config: EngineConfig,
) -> Result<OfflineRunner, SchedError> {
    OfflineRunner::new(seq, config)
}

/// Start a realtime run with the default config.
pub fn launch_realtime<S: Sequence + 'static>(seq: S) -> Result<RealtimeRunner, SchedError> {
    RealtimeRunner::new(seq, EngineConfig::default())
}

pub fn launch_realtime_with_config<S: Sequence + 'static>(
    seq: S,
    config: EngineConfig,
) -> Result<RealtimeRunner, SchedError> {
    RealtimeRunner::new(seq, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::{from_fn, Control, Step};
    use std::cell::Cell;
    use std::rc::Rc;

    fn counting(counter: Rc<Cell<u32>>, wait: f64) -> impl Sequence {
        from_fn(move |_| {
            let n = counter.get() + 1;
            counter.set(n);
            if n < 3 {
                Ok(Step::Yield(Control::Wait(wait)))
            } else {
                Ok(Step::Done)
            }
        })
    }

    #[test]
    fn test_offline_basic() {
        let counter = Rc::new(Cell::new(0));
        let mut runner = launch_offline(counting(counter.clone(), 0.1)).unwrap();

        // Nothing runs before the first tick.
        assert_eq!(counter.get(), 0);

        runner.step_sec(0.0);
        assert_eq!(counter.get(), 1);

        runner.step_sec(0.1);
        assert_eq!(counter.get(), 1); // remaining is exactly zero
        runner.step_sec(0.05);
        assert_eq!(counter.get(), 2);

        runner.step_sec(0.2);
        assert_eq!(counter.get(), 3);
        assert_eq!(runner.scheduler().active_count(), 0);
    }

    #[test]
    fn test_time_scale_from_config() {
        let counter = Rc::new(Cell::new(0));
        let mut runner = launch_offline_with_config(
            counting(counter.clone(), 1.0),
            EngineConfig {
                fps: 10.0,
                time_scale: 2.0,
                ..Default::default()
            },
        )
        .unwrap();

        runner.step_frame();
        assert_eq!(counter.get(), 1);
        // Each frame is 0.1s of wall time, 0.2s scaled.
        runner.step_frames(4);
        assert_eq!(counter.get(), 1);
        runner.step_frames(2);
        assert_eq!(counter.get(), 2);
        assert!((runner.now() - 1.4).abs() < 1e-9);
    }

    #[test]
    fn test_run_until_idle() {
        let counter = Rc::new(Cell::new(0));
        let mut engine = Engine::new(ClockMode::Offline, EngineConfig::default()).unwrap();
        engine.spawn(counting(counter.clone(), 0.05)).unwrap();
        assert!(engine.run_until_idle(100));
        assert_eq!(counter.get(), 3);
        assert!(engine.run_until_idle(0));
    }

    #[test]
    fn test_offline_run_until_uses_fixed_frames() {
        let counter = Rc::new(Cell::new(0));
        let mut runner = launch_offline_with_config(
            counting(counter.clone(), 10.0),
            EngineConfig {
                fps: 4.0,
                ..Default::default()
            },
        )
        .unwrap();

        // Thirty simulated seconds, far faster than the wall clock.
        let started = Instant::now();
        runner.run_until(|s| s.time() >= 30.0);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(runner.scheduler().tick_count(), 120);
        assert_eq!(counter.get(), 3);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let bad = EngineConfig {
            fps: -1.0,
            ..Default::default()
        };
        assert!(Engine::new(ClockMode::Offline, bad).is_err());
    }

    #[test]
    fn test_realtime_runs_to_completion() {
        let counter = Rc::new(Cell::new(0));
        let mut runner = launch_realtime_with_config(
            counting(counter.clone(), 0.0),
            EngineConfig {
                fps: 1000.0,
                ..Default::default()
            },
        )
        .unwrap();
        runner.run_until_complete();
        assert_eq!(counter.get(), 3);
    }
}
