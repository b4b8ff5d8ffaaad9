//! Entity handles for objects that own recorders.
//!
//! An [`EntityId`] packs a *generation* in the high 32 bits and a slot
//! *index* in the low 32 bits. Slots are recycled once an entity is
//! destroyed, and the generation bump makes any handle still held by a
//! listener or a gameplay script detectably stale.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// A generational handle to an entity tracked by the timeline.
///
/// Layout: `[generation: u32 | index: u32]`
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Build a handle from a slot index and generation.
    #[inline]
    pub fn new(index: u32, generation: u32) -> Self {
        Self((generation as u64) << 32 | index as u64)
    }

    /// Slot index (low 32 bits).
    #[inline]
    pub fn index(self) -> u32 {
        self.0 as u32
    }

    /// Generation (high 32 bits).
    #[inline]
    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Raw `u64` form, stable for use as a map key outside this crate.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}v{})", self.index(), self.generation())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Hands out [`EntityId`]s and retires them when their entity is released.
///
/// Retired slots wait in a FIFO queue before reuse, so a slot that was just
/// released by a despawn is not immediately handed to the next spawn.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    /// Current generation per slot.
    generations: Vec<u32>,
    /// Liveness per slot.
    live: Vec<bool>,
    /// Retired slots awaiting reuse.
    retired: VecDeque<u32>,
    /// Number of live slots.
    live_count: usize,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh handle, reusing the oldest retired slot if any.
    pub fn allocate(&mut self) -> EntityId {
        self.live_count += 1;
        match self.retired.pop_front() {
            Some(index) => {
                self.live[index as usize] = true;
                EntityId::new(index, self.generations[index as usize])
            }
            None => {
                let index = self.generations.len() as u32;
                self.generations.push(0);
                self.live.push(true);
                EntityId::new(index, 0)
            }
        }
    }

    /// Retire a handle. The slot's generation is bumped so `id` goes stale.
    ///
    /// Returns `false` if `id` was already stale.
    pub fn retire(&mut self, id: EntityId) -> bool {
        if !self.is_live(id) {
            return false;
        }
        let slot = id.index() as usize;
        self.live[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.retired.push_back(id.index());
        self.live_count -= 1;
        true
    }

    /// Whether `id` refers to a live entity of the current generation.
    pub fn is_live(&self, id: EntityId) -> bool {
        let slot = id.index() as usize;
        slot < self.generations.len()
            && self.live[slot]
            && self.generations[slot] == id.generation()
    }

    pub fn live_count(&self) -> usize {
        self.live_count
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
