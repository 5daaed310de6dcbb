//! Entity identifiers and allocation.
//!
//! An [`EntityId`] is a 64-bit handle that packs a *generation* counter in the
//! high 32 bits and an *index* in the low 32 bits. The generation is bumped
//! every time an index is recycled, which allows immediate stale-ID detection.
//! Externally (scenes, blueprints, sessions) the handle is the raw `u64`.

use std::collections::VecDeque;
use std::fmt;

/// Sentinel used for absent slots in sparse arrays.
pub(crate) const ABSENT: u32 = u32::MAX;

/// How far past the last allocated index a restore hint may reach. Hints
/// further out are treated as missing.
pub const MAX_HINT_GAP: usize = 1 << 16;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// A generational entity identifier.
///
/// Layout: `[generation: u32 | index: u32]`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    /// Never refers to a live entity.
    pub const NULL: EntityId = EntityId(u64::MAX);

    /// Construct an `EntityId` from an index and generation.
    #[inline]
    pub fn new(index: u32, generation: u32) -> Self {
        Self((generation as u64) << 32 | index as u64)
    }

    /// The index portion (low 32 bits).
    #[inline]
    pub fn index(self) -> u32 {
        self.0 as u32
    }

    /// The generation portion (high 32 bits).
    #[inline]
    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self == Self::NULL
    }

    /// Raw `u64` representation.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    /// Reconstruct from a raw `u64`.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("EntityId(null)");
        }
        write!(f, "EntityId({}v{})", self.index(), self.generation())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("null");
        }
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Allocates and recycles [`EntityId`]s with generational tracking.
///
/// Free indices are kept in a FIFO queue so that generations are spread out
/// over time rather than concentrated on a hot index. Live entities are also
/// kept in a dense list (swap-removed on deallocation), which gives the world
/// its entity iteration order.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    /// Current generation for each index slot.
    generations: Vec<u32>,
    /// Position of each index in `live`, or `ABSENT` when dead.
    slots: Vec<u32>,
    /// Dense list of live entities.
    live: Vec<EntityId>,
    /// Free-list of recyclable indices (FIFO queue).
    free_indices: VecDeque<u32>,
}

impl EntityAllocator {
    /// Create a new, empty allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh [`EntityId`].
    ///
    /// If a recycled index is available it will be reused with an incremented
    /// generation; otherwise a brand-new index is created.
    pub fn allocate(&mut self) -> EntityId {
        let index = match self.free_indices.pop_front() {
            // Generation was already bumped on deallocation.
            Some(index) => index,
            None => {
                let index = self.generations.len() as u32;
                self.generations.push(0);
                self.slots.push(ABSENT);
                index
            }
        };
        self.mark_live(index)
    }

    /// Allocate the exact handle `hint` if its index is free, otherwise fall
    /// back to [`allocate`](Self::allocate).
    ///
    /// Used when restoring entities from scenes and snapshots so that stored
    /// references keep pointing at the same entity.
    pub fn allocate_with_hint(&mut self, hint: EntityId) -> EntityId {
        let index = hint.index();
        if hint.is_null() || index == ABSENT {
            return self.allocate();
        }
        let idx = index as usize;
        if idx > self.generations.len() + MAX_HINT_GAP {
            tracing::warn!(hint = %hint, "entity id hint too far past the allocator, allocating fresh");
            return self.allocate();
        }
        if idx >= self.generations.len() {
            for skipped in self.generations.len() as u32..index {
                self.generations.push(0);
                self.slots.push(ABSENT);
                self.free_indices.push_back(skipped);
            }
            self.generations.push(hint.generation());
            self.slots.push(ABSENT);
            return self.mark_live(index);
        }
        if self.slots[idx] != ABSENT {
            return self.allocate();
        }
        self.free_indices.retain(|&free| free != index);
        self.generations[idx] = hint.generation();
        self.mark_live(index)
    }

    fn mark_live(&mut self, index: u32) -> EntityId {
        let id = EntityId::new(index, self.generations[index as usize]);
        self.slots[index as usize] = self.live.len() as u32;
        self.live.push(id);
        id
    }

    /// Deallocate an entity, incrementing the generation for that index so
    /// that any outstanding handles become stale.
    ///
    /// Returns `true` if the entity was alive and is now freed,
    /// `false` if it was already dead or had a stale generation.
    pub fn deallocate(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        let idx = id.index() as usize;
        let pos = self.slots[idx] as usize;
        self.live.swap_remove(pos);
        if let Some(&moved) = self.live.get(pos) {
            self.slots[moved.index() as usize] = pos as u32;
        }
        self.slots[idx] = ABSENT;
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.free_indices.push_back(id.index());
        true
    }

    /// Returns `true` if `id` refers to a currently alive entity whose
    /// generation matches the allocator's current generation for that index.
    pub fn is_alive(&self, id: EntityId) -> bool {
        let idx = id.index() as usize;
        if idx >= self.generations.len() {
            return false;
        }
        self.slots[idx] != ABSENT && self.generations[idx] == id.generation()
    }

    /// Total number of currently alive entities.
    pub fn alive_count(&self) -> usize {
        self.live.len()
    }

    /// Live entities in dense order.
    pub fn live(&self) -> &[EntityId] {
        &self.live
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
