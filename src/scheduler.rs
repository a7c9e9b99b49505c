//! Fiber Scheduler
//!
//! Owns the slot table and the time groups. Each `tick` applies the queued
//! pause mask, steps every active fiber at most once in active-list order,
//! and recycles the fibers that finished. Fibers spawned during a tick first
//! run on the following one.
//!
//! Stops requested while a tick is running are deferred: the fiber is
//! disposed when the traversal reaches it, or in a sweep at the end of the
//! tick. Outside a tick they take effect immediately.

use crate::config::SchedulerConfig;
use crate::context::StepContext;
use crate::error::{Outcome, SchedError, SequenceError, StopCause};
use crate::fiber::{Fiber, FiberState, OwnerStatus};
use crate::groups::{sanitize_scale, TimeGroups};
use crate::handle::FiberHandle;
use crate::owner::Owner;
use crate::sequence::{BoxSequence, Control, Sequence, Step, WaitForFiber};
use crate::slots::SlotTable;
use std::borrow::Cow;
use std::cell::RefCell;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::rc::Rc;
use tracing::{debug, info, trace, warn};

/// Options applied to a fiber when it is spawned.
#[derive(Clone)]
pub struct SpawnOptions {
    pub owner: Option<Rc<dyn Owner>>,
    pub name: Option<Cow<'static, str>>,
    pub priority: i32,
    /// Bitmask of the groups the fiber belongs to.
    pub groups: u32,
    pub time_scale: f64,
    /// Skip group and owner time scales.
    pub ignore_time_scale: bool,
    /// Start paused.
    pub paused: bool,
}

impl Default for SpawnOptions {
    fn default() -> Self {
        Self {
            owner: None,
            name: None,
            priority: 0,
            groups: 0,
            time_scale: 1.0,
            ignore_time_scale: false,
            paused: false,
        }
    }
}

enum StackResult {
    Running,
    Completed,
    Stopped(StopCause),
}

/// Run `f`, turning a panic into a `SequenceError` when isolation is on.
fn isolated<R>(enabled: bool, f: impl FnOnce() -> R) -> Result<R, SequenceError> {
    if enabled {
        catch_unwind(AssertUnwindSafe(f)).map_err(SequenceError::from_panic)
    } else {
        Ok(f())
    }
}

pub struct Scheduler {
    table: SlotTable<Fiber>,
    groups: TimeGroups,
    config: SchedulerConfig,

    tick_count: u64,
    /// Delta of the current tick after the global time scale.
    delta: f64,
    /// Sum of all scaled deltas.
    time: f64,

    ticking: bool,
    sort_dirty: bool,
    shutdown_requested: bool,
    /// Set while `shutdown` drains the active list; spawns are refused.
    shutting_down: bool,

    /// Stops requested mid-tick, applied by the end-of-tick sweep.
    deferred: Vec<FiberHandle>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SchedulerConfig) -> Self {
        Self {
            table: SlotTable::new(config.initial_capacity, config.max_capacity),
            groups: TimeGroups::new(),
            config,
            tick_count: 0,
            delta: 0.0,
            time: 0.0,
            ticking: false,
            sort_dirty: false,
            shutdown_requested: false,
            shutting_down: false,
            deferred: Vec::new(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    // ==================== SPAWNING ====================

    pub fn spawn<S: Sequence + 'static>(&mut self, seq: S) -> Result<FiberHandle, SchedError> {
        self.spawn_boxed(Box::new(seq), SpawnOptions::default())
    }

    pub fn spawn_with<S: Sequence + 'static>(
        &mut self,
        seq: S,
        opts: SpawnOptions,
    ) -> Result<FiberHandle, SchedError> {
        self.spawn_boxed(Box::new(seq), opts)
    }

    pub fn spawn_boxed(
        &mut self,
        seq: BoxSequence,
        opts: SpawnOptions,
    ) -> Result<FiberHandle, SchedError> {
        if self.shutting_down {
            return Err(SchedError::ShuttingDown);
        }
        let index = self.table.acquire()?;
        let born = self.tick_count;

        let fiber = &mut self.table[index];
        fiber.init(seq.type_label(), false, born);
        fiber.owner = opts.owner.as_ref().map(Rc::downgrade);
        fiber.name = opts.name;
        fiber.priority = opts.priority;
        fiber.groups = opts.groups;
        fiber.time_scale = sanitize_scale(opts.time_scale);
        fiber.ignore_time_scale = opts.ignore_time_scale;
        fiber.paused = opts.paused;
        let handle = fiber.handle(index);

        self.table.add_active(index);
        if opts.priority != 0 {
            self.sort_dirty = true;
        }

        debug!(handle = %handle, name = %self.table[index].display_name(), "spawned fiber");
        self.start(index, handle, seq);
        Ok(handle)
    }

    /// Create a fiber that is owned and stepped by `parent` rather than by
    /// the active list. It inherits the parent's owner.
    pub(crate) fn spawn_chained(
        &mut self,
        seq: BoxSequence,
        parent: FiberHandle,
    ) -> Result<FiberHandle, SchedError> {
        if self.shutting_down {
            return Err(SchedError::ShuttingDown);
        }
        let owner = self.live(parent).and_then(|p| p.owner.clone());
        let index = self.table.acquire()?;
        let born = self.tick_count;

        let fiber = &mut self.table[index];
        fiber.init(seq.type_label(), true, born);
        fiber.owner = owner;
        let handle = fiber.handle(index);

        trace!(handle = %handle, parent = %parent, "spawned chained fiber");
        self.start(index, handle, seq);
        Ok(handle)
    }

    /// Run the root's run-start hook and push it.
    fn start(&mut self, index: u32, handle: FiberHandle, mut seq: BoxSequence) {
        let isolate = self.config.isolate_panics;
        self.table[index].updating = true;
        let started = {
            let mut cx = StepContext::new(self, handle, 0.0);
            isolated(isolate, || seq.on_start(&mut cx))
        };

        let fiber = &mut self.table[index];
        fiber.updating = false;
        fiber.stack.push(seq);
        match started {
            Ok(true) => {}
            Ok(false) => fiber.request_stop(StopCause::Declined),
            Err(e) => {
                warn!(handle = %handle, error = %e, "run-start hook failed");
                fiber.request_stop(StopCause::Failed(e));
            }
        }

        if fiber.disposing {
            if self.ticking {
                self.deferred.push(handle);
            } else {
                self.dispose_now(index);
            }
        }
    }

    // ==================== LOOKUP ====================

    fn live(&self, handle: FiberHandle) -> Option<&Fiber> {
        if handle.is_null() {
            return None;
        }
        let fiber = self.table.get(handle.index())?;
        (fiber.is_live() && fiber.matches(handle)).then_some(fiber)
    }

    fn live_mut(&mut self, handle: FiberHandle) -> Option<&mut Fiber> {
        if handle.is_null() {
            return None;
        }
        let fiber = self.table.get_mut(handle.index())?;
        (fiber.is_live() && fiber.matches(handle)).then_some(fiber)
    }

    /// Whether the handle refers to a fiber that has not been disposed.
    pub fn exists(&self, handle: FiberHandle) -> bool {
        self.live(handle).is_some()
    }

    /// Outcome of a disposed fiber whose slot has not been reused yet.
    pub fn outcome(&self, handle: FiberHandle) -> Option<Outcome> {
        if handle.is_null() {
            return None;
        }
        let fiber = self.table.get(handle.index())?;
        if fiber.state == FiberState::Disposed && fiber.matches(handle) {
            fiber.outcome.clone()
        } else {
            None
        }
    }

    // ==================== PER-FIBER CONTROL ====================

    /// Stop a fiber. Stale handles are ignored.
    pub fn stop(&mut self, handle: FiberHandle) -> bool {
        let ticking = self.ticking;
        let Some(fiber) = self.live_mut(handle) else {
            return false;
        };
        fiber.request_stop(StopCause::Cancelled);
        if fiber.updating || ticking {
            self.deferred.push(handle);
        } else {
            self.dispose_now(handle.index());
        }
        true
    }

    /// Stop and dispose right away unless the fiber is mid-step.
    pub(crate) fn stop_now(&mut self, handle: FiberHandle, cause: StopCause) {
        let Some(fiber) = self.live_mut(handle) else {
            return;
        };
        fiber.request_stop(cause);
        if fiber.updating {
            self.deferred.push(handle);
        } else {
            self.dispose_now(handle.index());
        }
    }

    pub fn pause(&mut self, handle: FiberHandle) -> bool {
        self.live_mut(handle).map(|f| f.paused = true).is_some()
    }

    pub fn resume(&mut self, handle: FiberHandle) -> bool {
        self.live_mut(handle).map(|f| f.paused = false).is_some()
    }

    pub fn is_paused(&self, handle: FiberHandle) -> bool {
        self.live(handle).map(|f| f.paused).unwrap_or(false)
    }

    /// Change priority. The active list is re-sorted at the start of the
    /// next tick, so a change made mid-tick shows up on the following one.
    pub fn set_priority(&mut self, handle: FiberHandle, priority: i32) -> bool {
        let Some(fiber) = self.live_mut(handle) else {
            return false;
        };
        if fiber.priority != priority {
            fiber.priority = priority;
            if !fiber.chained {
                self.sort_dirty = true;
            }
        }
        true
    }

    pub fn priority(&self, handle: FiberHandle) -> Option<i32> {
        self.live(handle).map(|f| f.priority)
    }

    pub fn set_time_scale(&mut self, handle: FiberHandle, scale: f64) -> bool {
        let scale = sanitize_scale(scale);
        self.live_mut(handle).map(|f| f.time_scale = scale).is_some()
    }

    pub fn time_scale(&self, handle: FiberHandle) -> Option<f64> {
        self.live(handle).map(|f| f.time_scale)
    }

    pub fn set_ignore_time_scale(&mut self, handle: FiberHandle, ignore: bool) -> bool {
        self.live_mut(handle)
            .map(|f| f.ignore_time_scale = ignore)
            .is_some()
    }

    pub fn set_groups(&mut self, handle: FiberHandle, mask: u32) -> bool {
        self.live_mut(handle).map(|f| f.groups = mask).is_some()
    }

    pub fn add_to_groups(&mut self, handle: FiberHandle, mask: u32) -> bool {
        self.live_mut(handle).map(|f| f.groups |= mask).is_some()
    }

    pub fn remove_from_groups(&mut self, handle: FiberHandle, mask: u32) -> bool {
        self.live_mut(handle).map(|f| f.groups &= !mask).is_some()
    }

    pub fn groups_of(&self, handle: FiberHandle) -> Option<u32> {
        self.live(handle).map(|f| f.groups)
    }

    pub fn set_name(&mut self, handle: FiberHandle, name: impl Into<Cow<'static, str>>) -> bool {
        let name = name.into();
        self.live_mut(handle).map(|f| f.name = Some(name)).is_some()
    }

    /// Explicit name, or the root sequence's type name when none was set.
    pub fn name(&self, handle: FiberHandle) -> Option<Cow<'static, str>> {
        self.live(handle).map(|f| f.display_name())
    }

    /// Take a lock. A fiber holding any lock makes no progress.
    pub fn lock(&mut self, handle: FiberHandle) -> bool {
        self.live_mut(handle).map(|f| f.locks += 1).is_some()
    }

    pub fn unlock(&mut self, handle: FiberHandle) -> bool {
        self.live_mut(handle)
            .map(|f| f.locks = f.locks.saturating_sub(1))
            .is_some()
    }

    pub fn lock_count(&self, handle: FiberHandle) -> u32 {
        self.live(handle).map(|f| f.locks).unwrap_or(0)
    }

    /// Run `f` when the fiber's stack empties. If the fiber already finished
    /// and its slot has not been reused, the stored outcome decides right
    /// away. Returns false when the outcome is unknown.
    pub fn on_complete<F>(&mut self, handle: FiberHandle, f: F) -> bool
    where
        F: FnOnce(&mut Scheduler) + 'static,
    {
        if let Some(fiber) = self.live_mut(handle) {
            fiber.on_complete.push(Box::new(f));
            return true;
        }
        match self.outcome(handle) {
            Some(Outcome::Completed) => {
                f(self);
                true
            }
            Some(Outcome::Stopped(_)) => true,
            None => false,
        }
    }

    /// Run `f` when the fiber is stopped before its stack empties.
    pub fn on_stop<F>(&mut self, handle: FiberHandle, f: F) -> bool
    where
        F: FnOnce(&mut Scheduler, &StopCause) + 'static,
    {
        if let Some(fiber) = self.live_mut(handle) {
            fiber.on_stop.push(Box::new(f));
            return true;
        }
        match self.outcome(handle) {
            Some(Outcome::Stopped(cause)) => {
                f(self, &cause);
                true
            }
            Some(Outcome::Completed) => true,
            None => false,
        }
    }

    // ==================== GROUPS & GLOBAL TIME ====================

    /// Queue a pause of every group in `mask`; applied at the next tick.
    pub fn pause_groups(&mut self, mask: u32) {
        self.groups.pause(mask);
    }

    pub fn resume_groups(&mut self, mask: u32) {
        self.groups.resume(mask);
    }

    /// Whether any group in `mask` is paused for the current tick.
    pub fn is_group_paused(&self, mask: u32) -> bool {
        self.groups.is_paused(mask)
    }

    pub fn set_group_time_scale(&mut self, index: u32, scale: f64) -> Result<(), SchedError> {
        self.groups.set_scale(index, scale)
    }

    pub fn group_time_scale(&self, index: u32) -> Result<f64, SchedError> {
        self.groups.scale(index)
    }

    /// While set, ticks advance nothing.
    pub fn set_paused(&mut self, paused: bool) {
        self.groups.set_global_paused(paused);
    }

    pub fn is_globally_paused(&self) -> bool {
        self.groups.is_global_paused()
    }

    pub fn set_global_time_scale(&mut self, scale: f64) {
        self.groups.set_time_scale(scale);
    }

    pub fn global_time_scale(&self) -> f64 {
        self.groups.time_scale()
    }

    pub fn groups(&self) -> &TimeGroups {
        &self.groups
    }

    // ==================== INTROSPECTION ====================

    pub fn active_count(&self) -> usize {
        self.table.active_len()
    }

    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Scaled delta of the most recent tick.
    pub fn delta_time(&self) -> f64 {
        self.delta
    }

    pub fn is_ticking(&self) -> bool {
        self.ticking
    }

    /// Active fibers in the order the next tick will visit them, assuming no
    /// pending re-sort.
    pub fn active_handles(&self) -> Vec<FiberHandle> {
        self.table
            .active_indices()
            .into_iter()
            .map(|i| self.table[i].handle(i))
            .collect()
    }

    // ==================== TICK ====================

    /// Advance every active fiber by one step.
    pub fn tick(&mut self, raw_dt: f64) {
        if self.ticking {
            warn!("tick called from inside a tick; ignored");
            return;
        }
        self.groups.apply_queued();
        self.tick_count += 1;

        if self.groups.is_global_paused() {
            self.delta = 0.0;
            return;
        }

        let raw = if raw_dt.is_finite() && raw_dt > 0.0 { raw_dt } else { 0.0 };
        self.delta = raw * self.groups.time_scale();
        self.time += self.delta;

        if self.sort_dirty {
            self.table
                .sort_active_by(|a, b| b.priority.cmp(&a.priority));
            self.sort_dirty = false;
        }

        trace!(tick = self.tick_count, dt = self.delta, active = self.table.active_len(), "tick");

        self.ticking = true;
        let traversal = catch_unwind(AssertUnwindSafe(|| self.traverse()));
        self.ticking = false;
        if let Err(payload) = traversal {
            // Only reachable with isolation off.
            resume_unwind(payload);
        }

        self.sweep_deferred();
        if self.shutdown_requested {
            self.shutdown_requested = false;
            self.shutdown();
        }
    }

    /// Step each fiber that was active when the tick started, once.
    fn traverse(&mut self) {
        let mut remaining = self.table.active_len();
        let mut cursor = self.table.active_head();
        while remaining > 0 {
            let Some(index) = cursor else {
                break;
            };
            if self.table[index].born_tick == self.tick_count {
                cursor = self.table.next_of(index);
                continue;
            }
            remaining -= 1;

            let running = self.step_fiber(index, None);
            // The stepped fiber is still linked; removal happens below.
            cursor = self.table.next_of(index);
            if !running {
                self.dispose_now(index);
            }
        }
    }

    fn sweep_deferred(&mut self) {
        while !self.deferred.is_empty() {
            for handle in std::mem::take(&mut self.deferred) {
                if self.live(handle).is_some_and(|f| !f.updating) {
                    self.dispose_now(handle.index());
                }
            }
        }
    }

    /// Step a chained fiber with the parent's delta times its own scale,
    /// disposing it once it has finished.
    pub(crate) fn step_chained(&mut self, handle: FiberHandle, dt: f64) -> bool {
        if !self.exists(handle) {
            return false;
        }
        let index = handle.index();
        if self.step_fiber(index, Some(dt)) {
            true
        } else {
            self.dispose_now(index);
            false
        }
    }

    /// One step of one fiber. Returns false once the fiber should be
    /// disposed.
    fn step_fiber(&mut self, index: u32, inherited_dt: Option<f64>) -> bool {
        let fiber = &mut self.table[index];

        if fiber.updating {
            // A run-start hook unwound before its fiber was set up.
            fiber.updating = false;
            fiber.request_stop(StopCause::Failed(SequenceError::Panicked(
                "step interrupted".to_string(),
            )));
            return false;
        }
        if fiber.disposing {
            return false;
        }

        let owner_scale = match fiber.owner_status() {
            OwnerStatus::Gone => {
                fiber.request_stop(StopCause::OwnerGone);
                return false;
            }
            OwnerStatus::Inactive => return true,
            OwnerStatus::Unowned => 1.0,
            OwnerStatus::Active(scale) => scale,
        };

        if fiber.paused || fiber.locks > 0 || self.groups.is_paused(fiber.groups) {
            return true;
        }

        if let Some(s) = &fiber.suspension {
            if s.is_cancelled() {
                fiber.request_stop(StopCause::Suspension);
                return false;
            }
            if s.is_pending() {
                return true;
            }
            fiber.suspension = None;
        }

        let dt = match inherited_dt {
            Some(dt) => dt * fiber.time_scale,
            None => self.delta * fiber.scale(&self.groups, owner_scale),
        };

        if let Some(wait) = fiber.wait {
            let remaining = wait - dt;
            if remaining >= 0.0 {
                fiber.wait = Some(remaining);
                return true;
            }
            fiber.wait = None;
        }

        let handle = fiber.handle(index);
        let mut stack = std::mem::take(&mut fiber.stack);
        fiber.updating = true;

        let result = if self.config.isolate_panics {
            self.run_stack(index, handle, dt, &mut stack)
        } else {
            match catch_unwind(AssertUnwindSafe(|| self.run_stack(index, handle, dt, &mut stack))) {
                Ok(result) => result,
                Err(payload) => {
                    // Put the stack back so disposal still releases it and
                    // any chained children it holds.
                    let fiber = &mut self.table[index];
                    fiber.updating = false;
                    fiber.stack = stack;
                    fiber.request_stop(StopCause::Failed(SequenceError::panicked(&*payload)));
                    resume_unwind(payload);
                }
            }
        };

        let fiber = &mut self.table[index];
        fiber.updating = false;
        fiber.stack = stack;
        match result {
            StackResult::Running => !fiber.disposing,
            StackResult::Completed => false,
            StackResult::Stopped(cause) => {
                fiber.request_stop(cause);
                false
            }
        }
    }

    /// Advance the innermost sequence, interpreting control values until the
    /// fiber suspends or its stack runs out.
    fn run_stack(
        &mut self,
        index: u32,
        handle: FiberHandle,
        dt: f64,
        stack: &mut Vec<BoxSequence>,
    ) -> StackResult {
        let isolate = self.config.isolate_panics;

        loop {
            let Some(top) = stack.last_mut() else {
                return StackResult::Completed;
            };

            let advanced = {
                let mut cx = StepContext::new(self, handle, dt);
                isolated(isolate, || top.advance(&mut cx)).and_then(|r| r)
            };

            let step = match advanced {
                Ok(step) => step,
                Err(e) => {
                    warn!(handle = %handle, error = %e, "sequence failed");
                    return StackResult::Stopped(StopCause::Failed(e));
                }
            };

            let control = match step {
                Step::Done => {
                    stack.pop();
                    continue;
                }
                Step::Yield(control) => control,
            };

            match control {
                Control::NextTick => return StackResult::Running,
                Control::Wait(seconds) => {
                    if seconds > 0.0 {
                        self.table[index].wait = Some(seconds);
                    }
                    return StackResult::Running;
                }
                Control::WaitFor(target) => {
                    if target != handle && self.exists(target) {
                        stack.push(Box::new(WaitForFiber { target }));
                        return StackResult::Running;
                    }
                }
                Control::Nest(mut seq) => {
                    let started = {
                        let mut cx = StepContext::new(self, handle, dt);
                        isolated(isolate, || seq.on_start(&mut cx))
                    };
                    stack.push(seq);
                    match started {
                        Ok(true) => {}
                        Ok(false) => return StackResult::Stopped(StopCause::Declined),
                        Err(e) => return StackResult::Stopped(StopCause::Failed(e)),
                    }
                }
                Control::Pause => {
                    self.table[index].paused = true;
                    return StackResult::Running;
                }
                Control::Stop => return StackResult::Stopped(StopCause::Cancelled),
                Control::Suspend(s) => {
                    if s.is_cancelled() {
                        return StackResult::Stopped(StopCause::Suspension);
                    }
                    if s.is_pending() {
                        self.table[index].suspension = Some(s);
                        return StackResult::Running;
                    }
                }
            }
        }
    }

    // ==================== DISPOSAL ====================

    /// Release the remaining stack innermost first, return the slot to the
    /// free list and fire exactly one callback set.
    fn dispose_now(&mut self, index: u32) {
        let isolate = self.config.isolate_panics;
        let fiber = &mut self.table[index];
        if !fiber.is_live() {
            return;
        }
        let handle = fiber.handle(index);
        if fiber.updating {
            self.deferred.push(handle);
            return;
        }

        let mut stack = std::mem::take(&mut fiber.stack);
        // A stop that was requested wins even if the stack has emptied since.
        let forced = !stack.is_empty() || fiber.stop_cause.is_some();
        let cause = fiber.stop_cause.take().unwrap_or(StopCause::Cancelled);
        fiber.state = FiberState::Disposed;

        while let Some(mut seq) = stack.pop() {
            let mut cx = StepContext::new(self, handle, 0.0);
            if let Err(e) = isolated(isolate, || seq.release(&mut cx)) {
                warn!(handle = %handle, error = %e, "release failed");
            }
        }

        let outcome = if forced {
            Outcome::Stopped(cause)
        } else {
            Outcome::Completed
        };

        let fiber = &mut self.table[index];
        fiber.outcome = Some(outcome.clone());
        fiber.owner = None;
        fiber.suspension = None;
        fiber.wait = None;
        fiber.locks = 0;
        fiber.disposing = false;
        let on_complete = std::mem::take(&mut fiber.on_complete);
        let on_stop = std::mem::take(&mut fiber.on_stop);
        debug!(handle = %handle, name = %fiber.display_name(), outcome = ?outcome, "fiber disposed");

        self.table.release(index);

        match outcome {
            Outcome::Completed => {
                for f in on_complete {
                    f(self);
                }
            }
            Outcome::Stopped(cause) => {
                for f in on_stop {
                    f(self, &cause);
                }
            }
        }
    }

    /// Force-stop every active fiber. Called from inside a tick, it runs
    /// once the tick finishes. Spawns made by callbacks while the active
    /// list drains fail with `SchedError::ShuttingDown`.
    pub fn shutdown(&mut self) {
        if self.ticking {
            self.shutdown_requested = true;
            return;
        }
        if self.shutting_down {
            return;
        }
        if self.table.active_len() > 0 {
            info!(active = self.table.active_len(), "shutting down scheduler");
        }
        self.shutting_down = true;
        loop {
            let mut progressed = false;
            for index in self.table.active_indices() {
                let fiber = &mut self.table[index];
                if fiber.is_live() && !fiber.updating {
                    fiber.request_stop(StopCause::Shutdown);
                    self.dispose_now(index);
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }
        self.deferred.clear();
        self.shutting_down = false;
    }

    /// Whether `shutdown` is currently draining the active list.
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::build(SchedulerConfig::default())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ==================== DEFAULT INSTANCE ====================

thread_local! {
    static DEFAULT: RefCell<Option<Scheduler>> = RefCell::new(None);
}

/// Replace this thread's default scheduler. The previous one is shut down.
pub fn install_default(config: SchedulerConfig) -> Result<(), SchedError> {
    let sched = Scheduler::new(config)?;
    let old = DEFAULT.with(|d| d.borrow_mut().replace(sched));
    drop(old);
    Ok(())
}

/// Run `f` against this thread's default scheduler, creating it with the
/// default config on first use. Must not be re-entered from inside `f`;
/// sequences reach the scheduler through their `StepContext` instead.
pub fn with_default<R>(f: impl FnOnce(&mut Scheduler) -> R) -> R {
    DEFAULT.with(|d| {
        let mut slot = d.borrow_mut();
        let sched = slot.get_or_insert_with(Scheduler::default);
        f(sched)
    })
}

/// Shut down and drop this thread's default scheduler.
pub fn shutdown_default() {
    let old = DEFAULT.with(|d| d.borrow_mut().take());
    drop(old);
}
