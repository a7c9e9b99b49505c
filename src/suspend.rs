//! External Suspension
//!
//! A shared single-assignment token. A sequence yields `Control::Suspend` with
//! a clone of the token and its fiber stops making progress until whoever
//! holds the other clone calls `complete` (the fiber resumes) or `cancel`
//! (the fiber is stopped with `StopCause::Suspension`).

use std::cell::Cell;
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SuspendState {
    Pending,
    Done,
    Cancelled,
}

#[derive(Clone, Debug)]
pub struct Suspension {
    state: Rc<Cell<SuspendState>>,
}

impl Suspension {
    pub fn new() -> Self {
        Self {
            state: Rc::new(Cell::new(SuspendState::Pending)),
        }
    }

    /// Mark as completed. Returns false if it was already settled.
    pub fn complete(&self) -> bool {
        self.settle(SuspendState::Done)
    }

    /// Mark as cancelled. Returns false if it was already settled.
    pub fn cancel(&self) -> bool {
        self.settle(SuspendState::Cancelled)
    }

    fn settle(&self, to: SuspendState) -> bool {
        if self.state.get() != SuspendState::Pending {
            return false;
        }
        self.state.set(to);
        true
    }

    pub fn is_done(&self) -> bool {
        self.state.get() == SuspendState::Done
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.get() == SuspendState::Cancelled
    }

    pub fn is_pending(&self) -> bool {
        self.state.get() == SuspendState::Pending
    }
}

impl Default for Suspension {
    fn default() -> Self {
        Self::new()
    }
}
