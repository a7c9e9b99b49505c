//! Error types
//!
//! `SchedError` covers failures of the scheduler API itself. `SequenceError`
//! is what a sequence reports when it cannot continue, and `StopCause` is what
//! on-stop callbacks receive when a fiber ends before its stack empties.

use thiserror::Error;

/// Errors returned by scheduler operations.
#[derive(Error, Debug)]
pub enum SchedError {
    /// Growing the slot table would leave the addressable index space.
    #[error("slot table capacity exceeded: requested {requested} slots, max {max}")]
    CapacityExceeded { requested: usize, max: usize },

    /// Group indices are limited to the 32 bits of the group mask.
    #[error("group index {0} out of range (0..32)")]
    InvalidGroup(u32),

    /// A composite's child list was mutated after it started running.
    #[error("composite already started; its children can no longer change")]
    AlreadyStarted,

    /// A configuration value is out of bounds.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Spawning was attempted while the scheduler was shutting down.
    #[error("scheduler is shutting down")]
    ShuttingDown,

    /// Configuration text could not be parsed.
    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),
}

/// Failure reported by a sequence while it was being advanced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SequenceError {
    #[error("sequence failed: {0}")]
    Failed(String),

    #[error("sequence panicked: {0}")]
    Panicked(String),
}

impl SequenceError {
    pub fn failed(msg: impl Into<String>) -> Self {
        SequenceError::Failed(msg.into())
    }

    /// Build from a `catch_unwind` payload.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        Self::panicked(&*payload)
    }

    /// Same as `from_panic` but leaves the payload with the caller, which
    /// may still want to resume the unwind.
    pub(crate) fn panicked(payload: &(dyn std::any::Any + Send)) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        SequenceError::Panicked(msg)
    }
}

/// Why a fiber was stopped before its sequence stack emptied.
#[derive(Debug, Clone, PartialEq)]
pub enum StopCause {
    /// `Scheduler::stop`, a `Control::Stop` yield, or a race that was lost.
    Cancelled,
    /// The owning entity was dropped or reported itself dead.
    OwnerGone,
    /// A run-start hook declined to run.
    Declined,
    /// The sequence returned an error or panicked.
    Failed(SequenceError),
    /// The scheduler shut down while the fiber was still active.
    Shutdown,
    /// The external suspension the fiber was waiting on was cancelled.
    Suspension,
}

impl std::fmt::Display for StopCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopCause::Cancelled => write!(f, "cancelled"),
            StopCause::OwnerGone => write!(f, "owner gone"),
            StopCause::Declined => write!(f, "declined by run-start hook"),
            StopCause::Failed(e) => write!(f, "{}", e),
            StopCause::Shutdown => write!(f, "scheduler shutdown"),
            StopCause::Suspension => write!(f, "external suspension cancelled"),
        }
    }
}

/// How a fiber finished. Kept in the slot until the slot is reused.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed,
    Stopped(StopCause),
}
