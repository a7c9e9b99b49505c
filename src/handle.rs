//! Fiber Handle
//!
//! A copyable 32-bit reference to a fiber slot. The low 24 bits hold the slot
//! index and the top 8 bits hold the slot's generation at the time the fiber
//! was created. Recycling a slot bumps its generation, so old handles stop
//! matching instead of aliasing the new occupant.

use std::fmt;

/// Number of bits used for the slot index.
pub const INDEX_BITS: u32 = 24;

/// Largest number of slots a handle can address.
pub const MAX_SLOTS: usize = 1 << INDEX_BITS;

const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;

/// Generational reference to a fiber.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FiberHandle(u32);

impl FiberHandle {
    /// The null handle. Never refers to a fiber.
    pub const NULL: FiberHandle = FiberHandle(0);

    pub(crate) fn new(index: u32, generation: u8) -> Self {
        debug_assert!(index <= INDEX_MASK);
        debug_assert!(generation != 0);
        FiberHandle(((generation as u32) << INDEX_BITS) | (index & INDEX_MASK))
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Slot index component.
    pub fn index(&self) -> u32 {
        self.0 & INDEX_MASK
    }

    /// Generation component. Zero only for the null handle.
    pub fn generation(&self) -> u8 {
        (self.0 >> INDEX_BITS) as u8
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    pub fn from_raw(raw: u32) -> Self {
        FiberHandle(raw)
    }
}

/// Next generation after `g`, skipping 0 so a live handle is never null.
pub(crate) fn next_generation(g: u8) -> u8 {
    match g.wrapping_add(1) {
        0 => 1,
        n => n,
    }
}

impl fmt::Debug for FiberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "FiberHandle(null)")
        } else {
            write!(f, "FiberHandle({}v{})", self.index(), self.generation())
        }
    }
}

impl fmt::Display for FiberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack() {
        let h = FiberHandle::new(0x12_3456, 7);
        assert_eq!(h.index(), 0x12_3456);
        assert_eq!(h.generation(), 7);
        assert!(!h.is_null());
        assert_eq!(FiberHandle::from_raw(h.raw()), h);
    }

    #[test]
    fn test_null() {
        assert!(FiberHandle::NULL.is_null());
        assert_eq!(FiberHandle::default(), FiberHandle::NULL);
        assert_eq!(FiberHandle::NULL.generation(), 0);
    }

    #[test]
    fn test_index_zero_is_not_null() {
        let h = FiberHandle::new(0, 1);
        assert!(!h.is_null());
        assert_ne!(h, FiberHandle::NULL);
    }

    #[test]
    fn test_generation_skips_zero() {
        assert_eq!(next_generation(1), 2);
        assert_eq!(next_generation(254), 255);
        assert_eq!(next_generation(255), 1);
        assert_eq!(next_generation(0), 1);
    }
}
