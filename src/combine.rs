//! Composite Sequences
//!
//! `combine` runs several sequences side by side and finishes when all of
//! them have. `race` finishes as soon as one of them does and force-stops
//! the rest. The children are chained fibers: they have their own handles
//! but are stepped from inside the parent's step, never by the tick driver.

use crate::context::StepContext;
use crate::error::{SchedError, SequenceError, StopCause};
use crate::handle::FiberHandle;
use crate::sequence::{BoxSequence, Control, Empty, Sequence, Step};
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositeMode {
    /// Finish once every child has finished.
    All,
    /// Finish once any child has finished.
    Any,
}

pub struct Composite {
    mode: CompositeMode,
    inputs: Vec<BoxSequence>,
    children: Vec<FiberHandle>,
    started: bool,
}

impl Composite {
    pub fn new(mode: CompositeMode) -> Self {
        Self {
            mode,
            inputs: Vec::new(),
            children: Vec::new(),
            started: false,
        }
    }

    pub fn all() -> Self {
        Self::new(CompositeMode::All)
    }

    pub fn any() -> Self {
        Self::new(CompositeMode::Any)
    }

    pub fn mode(&self) -> CompositeMode {
        self.mode
    }

    /// Add a child. Fails once the composite has started running.
    pub fn push<S: Sequence + 'static>(&mut self, seq: S) -> Result<(), SchedError> {
        self.push_boxed(Box::new(seq))
    }

    pub fn push_boxed(&mut self, seq: BoxSequence) -> Result<(), SchedError> {
        if self.started {
            return Err(SchedError::AlreadyStarted);
        }
        self.inputs.push(seq);
        Ok(())
    }

    pub fn with<S: Sequence + 'static>(mut self, seq: S) -> Self {
        self.inputs.push(Box::new(seq));
        self
    }

    pub fn len(&self) -> usize {
        if self.started {
            self.children.len()
        } else {
            self.inputs.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    fn stop_children(&mut self, cx: &mut StepContext<'_>) {
        for child in self.children.drain(..) {
            cx.stop_chained(child, StopCause::Cancelled);
        }
    }
}

impl Sequence for Composite {
    fn on_start(&mut self, cx: &mut StepContext<'_>) -> bool {
        self.started = true;
        for seq in self.inputs.drain(..) {
            match cx.spawn_chained(seq) {
                Ok(h) => self.children.push(h),
                Err(e) => {
                    warn!(parent = %cx.handle(), error = %e, "could not start composite child");
                    for child in self.children.drain(..) {
                        cx.stop_chained(child, StopCause::Cancelled);
                    }
                    return false;
                }
            }
        }
        true
    }

    fn advance(&mut self, cx: &mut StepContext<'_>) -> Result<Step, SequenceError> {
        let mut finished = false;
        let mut i = 0;
        while i < self.children.len() {
            let child = self.children[i];
            if cx.step_chained(child) {
                i += 1;
            } else {
                self.children.remove(i);
                finished = true;
                if self.mode == CompositeMode::Any {
                    break;
                }
            }
        }

        match self.mode {
            CompositeMode::Any if finished || self.children.is_empty() => {
                self.stop_children(cx);
                Ok(Step::Done)
            }
            CompositeMode::All if self.children.is_empty() => Ok(Step::Done),
            _ => Ok(Step::Yield(Control::NextTick)),
        }
    }

    fn release(&mut self, cx: &mut StepContext<'_>) {
        self.stop_children(cx);
    }
}

fn collapse(mut inputs: Vec<BoxSequence>, mode: CompositeMode) -> BoxSequence {
    match inputs.len() {
        0 => Box::new(Empty),
        1 => inputs.remove(0),
        _ => Box::new(Composite {
            mode,
            inputs,
            children: Vec::new(),
            started: false,
        }),
    }
}

/// Run every input side by side; done when all are done. A single input is
/// returned unchanged and no input at all gives an empty sequence.
pub fn combine(inputs: Vec<BoxSequence>) -> BoxSequence {
    collapse(inputs, CompositeMode::All)
}

/// Run every input side by side; done when the first one is. The others are
/// force-stopped in the same step.
pub fn race(inputs: Vec<BoxSequence>) -> BoxSequence {
    collapse(inputs, CompositeMode::Any)
}

/// Run `seq` as a chained fiber of its own, stepped inside the parent's step.
/// Unlike plain nesting the child has its own handle, so it can be paused,
/// locked or re-scaled on its own.
pub fn inline<S: Sequence + 'static>(seq: S) -> Composite {
    Composite::all().with(seq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Scheduler;
    use crate::sequence::{empty, from_fn, script, wait_seconds};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_push_after_start_rejected() {
        let mut sched = Scheduler::default();
        let shared: Rc<RefCell<Option<SchedError>>> = Rc::new(RefCell::new(None));
        let seen = shared.clone();

        let mut comp = Composite::all().with(script([Control::NextTick]));
        assert!(comp.push(script([Control::NextTick])).is_ok());
        assert_eq!(comp.len(), 2);

        let mut comp = Some(comp);
        sched
            .spawn(from_fn(move |cx| {
                if let Some(mut c) = comp.take() {
                    let ok = c.on_start(cx);
                    assert!(ok);
                    assert!(c.is_started());
                    *seen.borrow_mut() = c.push(empty()).err();
                    c.release(cx);
                }
                Ok(Step::Done)
            }))
            .unwrap();
        sched.tick(0.1);
        assert!(matches!(*shared.borrow(), Some(SchedError::AlreadyStarted)));
        assert_eq!(sched.active_count(), 0);
    }

    #[test]
    fn test_cardinality_shortcuts() {
        assert!(combine(Vec::new()).type_label().ends_with("Empty"));
        let one = race(vec![wait_seconds(1.0).boxed()]);
        assert!(one.type_label().ends_with("WaitSeconds"));
        let two = combine(vec![empty().boxed(), empty().boxed()]);
        assert!(two.type_label().ends_with("Composite"));
    }

    #[test]
    fn test_combine_waits_for_all() {
        let mut sched = Scheduler::default();
        let h = sched
            .spawn_boxed(
                combine(vec![
                    script([Control::NextTick]).boxed(),
                    script([Control::NextTick, Control::NextTick, Control::NextTick]).boxed(),
                ]),
                Default::default(),
            )
            .unwrap();
        // One root plus two chained children in the table.
        assert_eq!(sched.active_count(), 1);

        sched.tick(0.1);
        sched.tick(0.1);
        assert!(sched.exists(h));
        sched.tick(0.1);
        assert!(sched.exists(h));
        sched.tick(0.1);
        assert!(!sched.exists(h));
    }

    #[test]
    fn test_stopping_composite_stops_children() {
        let mut sched = Scheduler::default();
        let children: Rc<RefCell<Vec<FiberHandle>>> = Rc::new(RefCell::new(Vec::new()));
        let log = children.clone();
        let forever = move || {
            let log = log.clone();
            let mut first = true;
            from_fn(move |cx| {
                if first {
                    log.borrow_mut().push(cx.handle());
                    first = false;
                }
                Ok(Step::Yield(Control::NextTick))
            })
        };
        let root = sched
            .spawn_boxed(
                combine(vec![forever().boxed(), forever().boxed()]),
                Default::default(),
            )
            .unwrap();
        sched.tick(0.1);
        let kids = children.borrow().clone();
        assert_eq!(kids.len(), 2);
        assert!(kids.iter().all(|k| sched.exists(*k)));

        sched.stop(root);
        assert!(!sched.exists(root));
        assert!(kids.iter().all(|k| !sched.exists(*k)));
    }
}
