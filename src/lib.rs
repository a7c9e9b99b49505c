//! Rust Fiber Scheduler
//!
//! A cooperative, tick-driven fiber scheduler with:
//! - Generational handles into a pooled slot table (stale handles are no-ops)
//! - Nested sequences, numeric waits, external suspensions and locks
//! - 32 pause/time-scale groups plus per-fiber and per-owner scaling
//! - Combine / race composites stepped inside their parent's step
//! - Offline stepping and realtime pacing (spin_sleep) host loops

pub mod config;
pub mod error;
pub mod handle;
pub mod slots;
pub mod suspend;
pub mod owner;
pub mod groups;
pub mod sequence;
pub mod fiber;
pub mod context;
pub mod scheduler;
pub mod combine;
pub mod promise;
pub mod engine;


pub use combine::{combine, inline, race, Composite, CompositeMode};
pub use config::{EngineConfig, SchedulerConfig};
pub use context::StepContext;
pub use engine::{ClockMode, Engine, OfflineRunner, RealtimeRunner};
pub use error::{Outcome, SchedError, SequenceError, StopCause};
pub use groups::{group_mask, GROUP_COUNT};
pub use handle::FiberHandle;
pub use owner::{Entity, Owner};
pub use promise::{Promise, PromiseState};
pub use scheduler::{install_default, shutdown_default, with_default, Scheduler, SpawnOptions};
pub use sequence::{
    empty, from_fn, script, wait_seconds, wait_until, BoxSequence, Control, Sequence, Step,
};
pub use suspend::Suspension;
