//! Slot Table
//!
//! A growable arena of slots threaded by two intrusive doubly-linked lists:
//! the free list (unused slots, LIFO) and the active list (scheduled slots, in
//! step order). Links are slot indices stored next to the payload, so list
//! membership changes never allocate.
//!
//! A slot that has been acquired but not added to the active list is
//! "detached". Chained fibers live there: their parent steps them directly.

use crate::error::SchedError;
use crate::handle::MAX_SLOTS;
use std::cmp::Ordering;
use std::ops::{Index, IndexMut};

/// End-of-list marker.
pub const NIL: u32 = u32::MAX;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListTag {
    Free,
    Active,
    Detached,
}

struct Slot<T> {
    value: T,
    prev: u32,
    next: u32,
    list: ListTag,
}

pub struct SlotTable<T> {
    slots: Vec<Slot<T>>,
    max_capacity: usize,

    free_head: u32,
    free_len: usize,

    active_head: u32,
    active_tail: u32,
    active_len: usize,
}

impl<T: Default> SlotTable<T> {
    /// Create a table with `initial` free slots that may grow up to `max`.
    /// Both are clamped into `1..=MAX_SLOTS`; callers validate beforehand.
    pub fn new(initial: usize, max: usize) -> Self {
        let max_capacity = max.clamp(1, MAX_SLOTS);
        let initial = initial.clamp(1, max_capacity);

        let mut table = Self {
            slots: Vec::with_capacity(initial),
            max_capacity,
            free_head: NIL,
            free_len: 0,
            active_head: NIL,
            active_tail: NIL,
            active_len: 0,
        };
        table.append_free(initial);
        table
    }

    /// Append `count` new slots and put them on the free list so that the
    /// lowest new index is handed out first.
    fn append_free(&mut self, count: usize) {
        let start = self.slots.len();
        self.slots.extend((0..count).map(|_| Slot {
            value: T::default(),
            prev: NIL,
            next: NIL,
            list: ListTag::Free,
        }));
        for i in (start..start + count).rev() {
            self.push_free(i as u32);
        }
    }

    fn grow(&mut self) -> Result<(), SchedError> {
        let cap = self.slots.len();
        let requested = cap * 2;
        if cap >= self.max_capacity {
            tracing::error!(capacity = cap, max = self.max_capacity, "slot table exhausted");
            return Err(SchedError::CapacityExceeded {
                requested,
                max: self.max_capacity,
            });
        }
        let new_cap = requested.min(self.max_capacity);
        tracing::info!(from = cap, to = new_cap, "growing slot table");
        self.append_free(new_cap - cap);
        Ok(())
    }

    /// Pop the free-list head, doubling capacity first if the list is empty.
    /// The returned slot is detached.
    pub fn acquire(&mut self) -> Result<u32, SchedError> {
        if self.free_head == NIL {
            self.grow()?;
        }
        let index = self.free_head;
        let next = self.slots[index as usize].next;
        self.free_head = next;
        if next != NIL {
            self.slots[next as usize].prev = NIL;
        }
        self.free_len -= 1;

        let slot = &mut self.slots[index as usize];
        slot.prev = NIL;
        slot.next = NIL;
        slot.list = ListTag::Detached;
        Ok(index)
    }
}

impl<T> SlotTable<T> {
    fn push_free(&mut self, index: u32) {
        let head = self.free_head;
        {
            let slot = &mut self.slots[index as usize];
            slot.prev = NIL;
            slot.next = head;
            slot.list = ListTag::Free;
        }
        if head != NIL {
            self.slots[head as usize].prev = index;
        }
        self.free_head = index;
        self.free_len += 1;
    }

    /// Return a slot to the free list head. Unlinks it from the active list
    /// first if needed. The payload is left in place.
    pub fn release(&mut self, index: u32) {
        match self.slots[index as usize].list {
            ListTag::Free => return,
            ListTag::Active => self.remove_active(index),
            ListTag::Detached => {}
        }
        self.push_free(index);
    }

    /// Append a detached slot to the active-list tail.
    pub fn add_active(&mut self, index: u32) {
        debug_assert_eq!(self.slots[index as usize].list, ListTag::Detached);
        let tail = self.active_tail;
        {
            let slot = &mut self.slots[index as usize];
            slot.prev = tail;
            slot.next = NIL;
            slot.list = ListTag::Active;
        }
        if tail == NIL {
            self.active_head = index;
        } else {
            self.slots[tail as usize].next = index;
        }
        self.active_tail = index;
        self.active_len += 1;
    }

    /// Unlink an active slot from any position. The slot becomes detached.
    pub fn remove_active(&mut self, index: u32) {
        let (prev, next) = {
            let slot = &self.slots[index as usize];
            if slot.list != ListTag::Active {
                return;
            }
            (slot.prev, slot.next)
        };
        if prev == NIL {
            self.active_head = next;
        } else {
            self.slots[prev as usize].next = next;
        }
        if next == NIL {
            self.active_tail = prev;
        } else {
            self.slots[next as usize].prev = prev;
        }
        let slot = &mut self.slots[index as usize];
        slot.prev = NIL;
        slot.next = NIL;
        slot.list = ListTag::Detached;
        self.active_len -= 1;
    }

    pub fn active_head(&self) -> Option<u32> {
        (self.active_head != NIL).then_some(self.active_head)
    }

    /// Successor of `index` in whichever list currently owns it.
    pub fn next_of(&self, index: u32) -> Option<u32> {
        let next = self.slots[index as usize].next;
        (next != NIL).then_some(next)
    }

    /// Snapshot of active indices in list order.
    pub fn active_indices(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.active_len);
        let mut cursor = self.active_head;
        while cursor != NIL {
            out.push(cursor);
            cursor = self.slots[cursor as usize].next;
        }
        out
    }

    pub fn list_of(&self, index: u32) -> ListTag {
        self.slots[index as usize].list
    }

    pub fn get(&self, index: u32) -> Option<&T> {
        self.slots.get(index as usize).map(|s| &s.value)
    }

    pub fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        self.slots.get_mut(index as usize).map(|s| &mut s.value)
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    pub fn active_len(&self) -> usize {
        self.active_len
    }

    pub fn free_len(&self) -> usize {
        self.free_len
    }

    /// Stable in-place merge sort of the active list. Elements for which
    /// `cmp` returns `Equal` keep their relative order.
    ///
    /// Bottom-up list merge: each pass merges runs of `width` nodes by
    /// relinking `next`, fixing `prev` as nodes are emitted.
    pub fn sort_active_by<F>(&mut self, mut cmp: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        if self.active_len < 2 {
            return;
        }

        let mut head = self.active_head;
        let mut width = 1usize;

        loop {
            let mut p = head;
            head = NIL;
            let mut tail = NIL;
            let mut merges = 0;

            while p != NIL {
                merges += 1;

                let mut q = p;
                let mut psize = 0;
                for _ in 0..width {
                    psize += 1;
                    q = self.slots[q as usize].next;
                    if q == NIL {
                        break;
                    }
                }
                let mut qsize = width;

                while psize > 0 || (qsize > 0 && q != NIL) {
                    let take_p = if psize == 0 {
                        false
                    } else if qsize == 0 || q == NIL {
                        true
                    } else {
                        cmp(&self.slots[p as usize].value, &self.slots[q as usize].value)
                            != Ordering::Greater
                    };

                    let e = if take_p {
                        let e = p;
                        p = self.slots[p as usize].next;
                        psize -= 1;
                        e
                    } else {
                        let e = q;
                        q = self.slots[q as usize].next;
                        qsize -= 1;
                        e
                    };

                    if tail == NIL {
                        head = e;
                    } else {
                        self.slots[tail as usize].next = e;
                    }
                    self.slots[e as usize].prev = tail;
                    tail = e;
                }

                p = q;
            }

            self.slots[tail as usize].next = NIL;

            if merges <= 1 {
                self.active_head = head;
                self.active_tail = tail;
                return;
            }
            width *= 2;
        }
    }
}

impl<T> Index<u32> for SlotTable<T> {
    type Output = T;

    fn index(&self, index: u32) -> &T {
        &self.slots[index as usize].value
    }
}

impl<T> IndexMut<u32> for SlotTable<T> {
    fn index_mut(&mut self, index: u32) -> &mut T {
        &mut self.slots[index as usize].value
    }
}
