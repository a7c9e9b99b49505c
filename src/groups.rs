//! Time Groups
//!
//! Up to 32 logical groups addressed by bit. Each group has a time-scale
//! multiplier and a pause bit. Pause changes are queued and only applied at
//! a tick boundary, so every fiber stepped within one tick sees the same
//! pause mask no matter when during the tick the mask was changed.

use crate::error::SchedError;
use tracing::warn;

pub const GROUP_COUNT: u32 = 32;

/// Invalid scales (negative, NaN or infinite) become 0.0, freezing time
/// rather than running it at full speed.
pub(crate) fn clamp_scale(x: f64) -> f64 {
    if x.is_finite() && x >= 0.0 {
        x
    } else {
        0.0
    }
}

/// `clamp_scale` for values coming through the public API; logs the
/// replacement.
pub(crate) fn sanitize_scale(x: f64) -> f64 {
    let clamped = clamp_scale(x);
    if clamped != x {
        warn!(scale = x, "invalid time scale replaced with 0");
    }
    clamped
}

/// Bit for a group index.
pub fn group_mask(index: u32) -> Result<u32, SchedError> {
    if index >= GROUP_COUNT {
        return Err(SchedError::InvalidGroup(index));
    }
    Ok(1 << index)
}

#[derive(Clone, Debug)]
pub struct TimeGroups {
    scales: [f64; GROUP_COUNT as usize],
    queued_paused: u32,
    applied_paused: u32,
    paused: bool,
    time_scale: f64,
}

impl TimeGroups {
    pub fn new() -> Self {
        Self {
            scales: [1.0; GROUP_COUNT as usize],
            queued_paused: 0,
            applied_paused: 0,
            paused: false,
            time_scale: 1.0,
        }
    }

    /// Copy the queued pause mask into the applied one. Called once at the
    /// start of every tick.
    pub fn apply_queued(&mut self) {
        self.applied_paused = self.queued_paused;
    }

    pub fn pause(&mut self, mask: u32) {
        self.queued_paused |= mask;
    }

    pub fn resume(&mut self, mask: u32) {
        self.queued_paused &= !mask;
    }

    /// Whether any group in `mask` is paused as of the current tick.
    pub fn is_paused(&self, mask: u32) -> bool {
        self.applied_paused & mask != 0
    }

    pub fn queued_mask(&self) -> u32 {
        self.queued_paused
    }

    pub fn applied_mask(&self) -> u32 {
        self.applied_paused
    }

    pub fn set_scale(&mut self, index: u32, scale: f64) -> Result<(), SchedError> {
        group_mask(index)?;
        self.scales[index as usize] = sanitize_scale(scale);
        Ok(())
    }

    pub fn scale(&self, index: u32) -> Result<f64, SchedError> {
        group_mask(index)?;
        Ok(self.scales[index as usize])
    }

    /// Product of the scales of every group in `mask`.
    pub fn scale_for(&self, mask: u32) -> f64 {
        let mut scale = 1.0;
        let mut bits = mask;
        while bits != 0 {
            let i = bits.trailing_zeros();
            scale *= self.scales[i as usize];
            bits &= bits - 1;
        }
        scale
    }

    pub fn set_global_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_global_paused(&self) -> bool {
        self.paused
    }

    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = sanitize_scale(scale);
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }
}

impl Default for TimeGroups {
    fn default() -> Self {
        Self::new()
    }
}
