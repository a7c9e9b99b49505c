//! Fiber Records
//!
//! One record per slot. The record outlives the fiber that used it: after
//! disposal it keeps the generation and outcome until the slot is reused, so
//! late callback registrations can still be answered.

use crate::error::{Outcome, StopCause};
use crate::groups::{clamp_scale, TimeGroups};
use crate::handle::{next_generation, FiberHandle};
use crate::owner::Owner;
use crate::scheduler::Scheduler;
use crate::sequence::{short_label, BoxSequence};
use crate::suspend::Suspension;
use std::borrow::Cow;
use std::rc::Weak;

pub type CompleteFn = Box<dyn FnOnce(&mut Scheduler)>;
pub type StopFn = Box<dyn FnOnce(&mut Scheduler, &StopCause)>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FiberState {
    #[default]
    Free,
    Running,
    Disposed,
}

/// What the owning entity currently allows.
pub(crate) enum OwnerStatus {
    Unowned,
    Gone,
    Inactive,
    Active(f64),
}

#[derive(Default)]
pub struct Fiber {
    pub(crate) generation: u8,
    pub(crate) state: FiberState,

    pub(crate) owner: Option<Weak<dyn Owner>>,
    pub(crate) stack: Vec<BoxSequence>,

    /// Remaining seconds of a numeric wait.
    pub(crate) wait: Option<f64>,
    pub(crate) suspension: Option<Suspension>,

    pub(crate) groups: u32,
    pub(crate) paused: bool,
    pub(crate) disposing: bool,
    pub(crate) chained: bool,
    pub(crate) ignore_time_scale: bool,

    /// Set while the stack is taken out for a step or run-start hook.
    pub(crate) updating: bool,

    pub(crate) name: Option<Cow<'static, str>>,
    pub(crate) root_label: &'static str,
    pub(crate) priority: i32,
    pub(crate) time_scale: f64,
    pub(crate) locks: u32,

    pub(crate) on_complete: Vec<CompleteFn>,
    pub(crate) on_stop: Vec<StopFn>,

    pub(crate) stop_cause: Option<StopCause>,
    pub(crate) outcome: Option<Outcome>,

    /// Tick number during which the fiber was spawned.
    pub(crate) born_tick: u64,
}

impl Fiber {
    /// Reset for a new run and return the new generation.
    pub(crate) fn init(&mut self, root_label: &'static str, chained: bool, born_tick: u64) -> u8 {
        self.generation = next_generation(self.generation);
        self.state = FiberState::Running;
        self.owner = None;
        self.stack.clear();
        self.wait = None;
        self.suspension = None;
        self.groups = 0;
        self.paused = false;
        self.disposing = false;
        self.chained = chained;
        self.ignore_time_scale = false;
        self.updating = false;
        self.name = None;
        self.root_label = root_label;
        self.priority = 0;
        self.time_scale = 1.0;
        self.locks = 0;
        self.on_complete.clear();
        self.on_stop.clear();
        self.stop_cause = None;
        self.outcome = None;
        self.born_tick = born_tick;
        self.generation
    }

    pub(crate) fn handle(&self, index: u32) -> FiberHandle {
        FiberHandle::new(index, self.generation)
    }

    pub(crate) fn is_live(&self) -> bool {
        self.state == FiberState::Running
    }

    pub(crate) fn matches(&self, handle: FiberHandle) -> bool {
        !handle.is_null() && self.generation == handle.generation()
    }

    /// Request a stop. The first cause recorded wins.
    pub(crate) fn request_stop(&mut self, cause: StopCause) {
        self.disposing = true;
        if self.stop_cause.is_none() {
            self.stop_cause = Some(cause);
        }
    }

    pub(crate) fn owner_status(&self) -> OwnerStatus {
        let Some(weak) = &self.owner else {
            return OwnerStatus::Unowned;
        };
        match weak.upgrade() {
            None => OwnerStatus::Gone,
            Some(o) if !o.is_alive() => OwnerStatus::Gone,
            Some(o) if !o.is_active() => OwnerStatus::Inactive,
            Some(o) => OwnerStatus::Active(clamp_scale(o.time_scale())),
        }
    }

    /// Multiplier applied to the tick delta for this fiber.
    pub(crate) fn scale(&self, groups: &TimeGroups, owner_scale: f64) -> f64 {
        if self.ignore_time_scale {
            self.time_scale
        } else {
            self.time_scale * groups.scale_for(self.groups) * owner_scale
        }
    }

    /// Explicit name, or the root sequence's type name.
    pub(crate) fn display_name(&self) -> Cow<'static, str> {
        match &self.name {
            Some(n) => n.clone(),
            None => Cow::Borrowed(short_label(self.root_label)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::owner::Entity;
    use std::rc::Rc;

    #[test]
    fn test_init_bumps_generation() {
        let mut f = Fiber::default();
        assert_eq!(f.init("a::B", false, 0), 1);
        f.priority = 9;
        f.locks = 2;
        assert_eq!(f.init("a::B", false, 0), 2);
        assert_eq!(f.priority, 0);
        assert_eq!(f.locks, 0);
        assert_eq!(f.time_scale, 1.0);
    }

    #[test]
    fn test_generation_wraps_past_zero() {
        let mut f = Fiber::default();
        f.generation = 255;
        assert_eq!(f.init("x", false, 0), 1);
        assert!(!f.handle(0).is_null());
    }

    #[test]
    fn test_owner_status() {
        let mut f = Fiber::default();
        f.init("x", false, 0);
        assert!(matches!(f.owner_status(), OwnerStatus::Unowned));

        let e = Rc::new(Entity::new());
        let as_owner: Rc<dyn Owner> = e.clone();
        f.owner = Some(Rc::downgrade(&as_owner));
        e.set_time_scale(0.5);
        assert!(matches!(f.owner_status(), OwnerStatus::Active(s) if s == 0.5));
        e.set_active(false);
        assert!(matches!(f.owner_status(), OwnerStatus::Inactive));
        e.destroy();
        assert!(matches!(f.owner_status(), OwnerStatus::Gone));
        e.set_active(true);
        drop(as_owner);
        drop(e);
        assert!(matches!(f.owner_status(), OwnerStatus::Gone));
    }

    #[test]
    fn test_first_stop_cause_wins() {
        let mut f = Fiber::default();
        f.init("x", false, 0);
        f.request_stop(StopCause::OwnerGone);
        f.request_stop(StopCause::Cancelled);
        assert!(f.disposing);
        assert_eq!(f.stop_cause, Some(StopCause::OwnerGone));
    }

    #[test]
    fn test_display_name() {
        let mut f = Fiber::default();
        f.init("crate::seq::Countdown", false, 0);
        assert_eq!(f.display_name(), "Countdown");
        f.name = Some(Cow::Borrowed("hud"));
        assert_eq!(f.display_name(), "hud");
    }
}
