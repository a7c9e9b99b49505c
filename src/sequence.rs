//! Sequences and Control Values
//!
//! A sequence is a resumable unit of work. Each call to `advance` runs it up
//! to its next yield point and reports what the fiber should do next. A fiber
//! keeps a stack of sequences and only ever advances the innermost one.

use crate::context::StepContext;
use crate::error::SequenceError;
use crate::handle::FiberHandle;
use crate::suspend::Suspension;
use std::fmt;

pub type BoxSequence = Box<dyn Sequence>;

/// What a yielding sequence asks of its fiber.
pub enum Control {
    /// Resume on the next tick.
    NextTick,
    /// Resume after this many seconds of the fiber's scaled time. The
    /// fiber resumes on the first tick that takes the remainder below zero;
    /// a remainder of exactly zero waits one more tick. Zero or negative
    /// durations resume on the next tick.
    Wait(f64),
    /// Resume once the referenced fiber no longer exists.
    WaitFor(FiberHandle),
    /// Run a nested sequence to completion, then resume.
    Nest(BoxSequence),
    /// Pause this fiber. It stays alive until resumed or stopped.
    Pause,
    /// Stop this fiber; remaining stack entries are released.
    Stop,
    /// Resume once an external mechanism completes the suspension.
    Suspend(Suspension),
}

impl fmt::Debug for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Control::NextTick => write!(f, "NextTick"),
            Control::Wait(d) => write!(f, "Wait({})", d),
            Control::WaitFor(h) => write!(f, "WaitFor({:?})", h),
            Control::Nest(s) => write!(f, "Nest({})", s.type_label()),
            Control::Pause => write!(f, "Pause"),
            Control::Stop => write!(f, "Stop"),
            Control::Suspend(_) => write!(f, "Suspend"),
        }
    }
}

/// Result of advancing a sequence once.
#[derive(Debug)]
pub enum Step {
    Yield(Control),
    Done,
}

pub trait Sequence {
    fn advance(&mut self, cx: &mut StepContext<'_>) -> Result<Step, SequenceError>;

    /// Run-start hook, called once before the first `advance`. Returning
    /// false stops the fiber before it runs.
    fn on_start(&mut self, _cx: &mut StepContext<'_>) -> bool {
        true
    }

    /// Called when the sequence is abandoned before finishing.
    fn release(&mut self, _cx: &mut StepContext<'_>) {}

    fn type_label(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn boxed(self) -> BoxSequence
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
}

/// Sequence driven by a closure.
pub struct FnSequence<F> {
    f: F,
}

impl<F> Sequence for FnSequence<F>
where
    F: FnMut(&mut StepContext<'_>) -> Result<Step, SequenceError>,
{
    fn advance(&mut self, cx: &mut StepContext<'_>) -> Result<Step, SequenceError> {
        (self.f)(cx)
    }
}

pub fn from_fn<F>(f: F) -> FnSequence<F>
where
    F: FnMut(&mut StepContext<'_>) -> Result<Step, SequenceError>,
{
    FnSequence { f }
}

/// Sequence that yields each control value of an iterator in turn.
pub struct Script<I> {
    iter: I,
}

impl<I> Sequence for Script<I>
where
    I: Iterator<Item = Control>,
{
    fn advance(&mut self, _cx: &mut StepContext<'_>) -> Result<Step, SequenceError> {
        Ok(match self.iter.next() {
            Some(c) => Step::Yield(c),
            None => Step::Done,
        })
    }
}

pub fn script<I>(controls: I) -> Script<I::IntoIter>
where
    I: IntoIterator<Item = Control>,
{
    Script {
        iter: controls.into_iter(),
    }
}

/// Finishes on its first advance.
pub struct Empty;

impl Sequence for Empty {
    fn advance(&mut self, _cx: &mut StepContext<'_>) -> Result<Step, SequenceError> {
        Ok(Step::Done)
    }
}

pub fn empty() -> Empty {
    Empty
}

pub struct WaitSeconds {
    seconds: Option<f64>,
}

impl Sequence for WaitSeconds {
    fn advance(&mut self, _cx: &mut StepContext<'_>) -> Result<Step, SequenceError> {
        Ok(match self.seconds.take() {
            Some(s) => Step::Yield(Control::Wait(s)),
            None => Step::Done,
        })
    }
}

pub fn wait_seconds(seconds: f64) -> WaitSeconds {
    WaitSeconds {
        seconds: Some(seconds),
    }
}

/// Checks the predicate every step and finishes once it holds.
pub struct WaitUntil<F> {
    pred: F,
}

impl<F> Sequence for WaitUntil<F>
where
    F: FnMut(&mut StepContext<'_>) -> bool,
{
    fn advance(&mut self, cx: &mut StepContext<'_>) -> Result<Step, SequenceError> {
        if (self.pred)(cx) {
            Ok(Step::Done)
        } else {
            Ok(Step::Yield(Control::NextTick))
        }
    }
}

pub fn wait_until<F>(pred: F) -> WaitUntil<F>
where
    F: FnMut(&mut StepContext<'_>) -> bool,
{
    WaitUntil { pred }
}

/// Adapter pushed for `Control::WaitFor`: polls the target's generation.
pub(crate) struct WaitForFiber {
    pub target: FiberHandle,
}

impl Sequence for WaitForFiber {
    fn advance(&mut self, cx: &mut StepContext<'_>) -> Result<Step, SequenceError> {
        if cx.exists(self.target) {
            Ok(Step::Yield(Control::NextTick))
        } else {
            Ok(Step::Done)
        }
    }
}

/// Last path segment of a type name, generics dropped.
pub(crate) fn short_label(label: &str) -> &str {
    let base = label.split('<').next().unwrap_or(label);
    base.rsplit("::").next().unwrap_or(base)
}
