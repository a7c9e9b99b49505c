//! Promises
//!
//! A single-assignment result shared between a fiber doing some work and
//! whoever is waiting for it. A promise can be linked to the fiber producing
//! it: if that fiber is stopped the promise fails with the stop cause, and
//! cancelling the promise stops the fiber.

use crate::error::StopCause;
use crate::handle::FiberHandle;
use crate::scheduler::Scheduler;
use crate::sequence::Control;
use crate::suspend::Suspension;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum PromiseState<T> {
    Pending,
    Resolved(T),
    Failed(StopCause),
    Cancelled,
}

struct Inner<T> {
    state: PromiseState<T>,
    linked: FiberHandle,
    suspension: Suspension,
}

pub struct Promise<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Promise<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                state: PromiseState::Pending,
                linked: FiberHandle::NULL,
                suspension: Suspension::new(),
            })),
        }
    }

    /// Store the value and wake waiters. Returns false if already settled.
    pub fn resolve(&self, value: T) -> bool {
        let mut inner = self.inner.borrow_mut();
        if !matches!(inner.state, PromiseState::Pending) {
            return false;
        }
        inner.state = PromiseState::Resolved(value);
        inner.suspension.complete();
        true
    }

    /// Settle with a failure. Fibers suspended on the promise are stopped.
    pub fn fail(&self, cause: StopCause) -> bool {
        let mut inner = self.inner.borrow_mut();
        if !matches!(inner.state, PromiseState::Pending) {
            return false;
        }
        inner.state = PromiseState::Failed(cause);
        inner.suspension.cancel();
        true
    }

    /// Cancel the promise and stop the linked fiber, if any.
    pub fn cancel(&self, sched: &mut Scheduler) -> bool {
        let linked = {
            let mut inner = self.inner.borrow_mut();
            if !matches!(inner.state, PromiseState::Pending) {
                return false;
            }
            inner.state = PromiseState::Cancelled;
            inner.suspension.cancel();
            std::mem::replace(&mut inner.linked, FiberHandle::NULL)
        };
        sched.stop(linked);
        true
    }

    /// Tie the promise to the fiber producing it. Returns false if the
    /// fiber's outcome is no longer known.
    pub fn link(&self, sched: &mut Scheduler, handle: FiberHandle) -> bool
    where
        T: 'static,
    {
        self.inner.borrow_mut().linked = handle;
        let promise = self.clone();
        sched.on_stop(handle, move |_, cause| {
            promise.fail(cause.clone());
        })
    }

    pub fn linked(&self) -> FiberHandle {
        self.inner.borrow().linked
    }

    /// Token that completes on resolve and cancels on failure.
    pub fn suspension(&self) -> Suspension {
        self.inner.borrow().suspension.clone()
    }

    /// Control value that suspends the yielding fiber until the promise
    /// settles.
    pub fn wait(&self) -> Control {
        Control::Suspend(self.suspension())
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.inner.borrow().state, PromiseState::Pending)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.inner.borrow().state, PromiseState::Resolved(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.inner.borrow().state, PromiseState::Failed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.inner.borrow().state, PromiseState::Cancelled)
    }

    pub fn failure(&self) -> Option<StopCause> {
        match &self.inner.borrow().state {
            PromiseState::Failed(cause) => Some(cause.clone()),
            _ => None,
        }
    }
}

impl<T: Clone> Promise<T> {
    pub fn value(&self) -> Option<T> {
        match &self.inner.borrow().state {
            PromiseState::Resolved(v) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn state(&self) -> PromiseState<T> {
        self.inner.borrow().state.clone()
    }
}
