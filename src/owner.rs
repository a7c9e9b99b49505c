//! Owning Entities
//!
//! The host tells the scheduler whether the entity a fiber belongs to is
//! still alive, whether it is currently eligible to run, and how fast its
//! local time runs. Fibers keep only a `Weak` reference; dropping the entity
//! counts as it dying.

use crate::groups::sanitize_scale;
use std::cell::Cell;

pub trait Owner {
    /// A dead owner's fibers are stopped with `StopCause::OwnerGone`.
    fn is_alive(&self) -> bool {
        true
    }

    /// An inactive owner's fibers are paused.
    fn is_active(&self) -> bool {
        true
    }

    fn time_scale(&self) -> f64 {
        1.0
    }
}

/// Ready-made owner with host-settable flags.
#[derive(Debug)]
pub struct Entity {
    alive: Cell<bool>,
    active: Cell<bool>,
    time_scale: Cell<f64>,
}

impl Entity {
    pub fn new() -> Self {
        Self {
            alive: Cell::new(true),
            active: Cell::new(true),
            time_scale: Cell::new(1.0),
        }
    }

    pub fn set_active(&self, active: bool) {
        self.active.set(active);
    }

    pub fn set_time_scale(&self, scale: f64) {
        self.time_scale.set(sanitize_scale(scale));
    }

    /// Mark the entity destroyed while other code may still hold it.
    pub fn destroy(&self) {
        self.alive.set(false);
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

impl Owner for Entity {
    fn is_alive(&self) -> bool {
        self.alive.get()
    }

    fn is_active(&self) -> bool {
        self.active.get()
    }

    fn time_scale(&self) -> f64 {
        self.time_scale.get()
    }
}
