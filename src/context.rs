//! Step Context
//!
//! The view of the scheduler a sequence gets while it is being advanced,
//! started or released. It knows which fiber is running and the delta time
//! that fiber was stepped with, and forwards everything else to the
//! scheduler.

use crate::error::{SchedError, StopCause};
use crate::handle::FiberHandle;
use crate::scheduler::{Scheduler, SpawnOptions};
use crate::sequence::{BoxSequence, Sequence};

pub struct StepContext<'a> {
    sched: &'a mut Scheduler,
    fiber: FiberHandle,
    dt: f64,
}

impl<'a> StepContext<'a> {
    pub(crate) fn new(sched: &'a mut Scheduler, fiber: FiberHandle, dt: f64) -> Self {
        Self { sched, fiber, dt }
    }

    /// Handle of the fiber being stepped.
    pub fn handle(&self) -> FiberHandle {
        self.fiber
    }

    /// Scaled delta time of the current step.
    pub fn delta_time(&self) -> f64 {
        self.dt
    }

    /// Total scaled time since the scheduler started.
    pub fn time(&self) -> f64 {
        self.sched.time()
    }

    pub fn exists(&self, handle: FiberHandle) -> bool {
        self.sched.exists(handle)
    }

    /// Spawn a top-level fiber. It first runs on the next tick.
    pub fn spawn<S: Sequence + 'static>(&mut self, seq: S) -> Result<FiberHandle, SchedError> {
        self.sched.spawn(seq)
    }

    pub fn spawn_with(
        &mut self,
        seq: BoxSequence,
        opts: SpawnOptions,
    ) -> Result<FiberHandle, SchedError> {
        self.sched.spawn_boxed(seq, opts)
    }

    pub fn stop(&mut self, handle: FiberHandle) -> bool {
        self.sched.stop(handle)
    }

    pub fn pause(&mut self, handle: FiberHandle) -> bool {
        self.sched.pause(handle)
    }

    pub fn resume(&mut self, handle: FiberHandle) -> bool {
        self.sched.resume(handle)
    }

    /// Full scheduler access.
    pub fn scheduler(&mut self) -> &mut Scheduler {
        self.sched
    }

    /// Create a fiber owned by the current one. It is never put on the
    /// active list; the caller steps it with `step_chained`.
    pub(crate) fn spawn_chained(&mut self, seq: BoxSequence) -> Result<FiberHandle, SchedError> {
        self.sched.spawn_chained(seq, self.fiber)
    }

    /// Step a chained fiber with this step's delta. Disposes it and returns
    /// false once it has finished.
    pub(crate) fn step_chained(&mut self, handle: FiberHandle) -> bool {
        self.sched.step_chained(handle, self.dt)
    }

    /// Force-stop a chained fiber right away.
    pub(crate) fn stop_chained(&mut self, handle: FiberHandle, cause: StopCause) {
        self.sched.stop_now(handle, cause);
    }
}
