//! Sparse-set component storage.
//!
//! Each component type lives in its own [`ComponentPool`]: a sparse array
//! indexed by entity index that points into a dense array of
//! `(entity, value)` pairs. Insert appends, removal swaps the last pair into
//! the hole, and lookups are a single indirection. A sparse slot only counts
//! as occupied when the dense pair it points at carries the exact same
//! entity, so stale handles never alias a recycled index.

use std::any::Any;
use std::cmp::Ordering;

use crate::entity::{EntityId, ABSENT};

// ---------------------------------------------------------------------------
// ComponentPool
// ---------------------------------------------------------------------------

/// Dense storage for every `T` in the world.
#[derive(Debug)]
pub struct ComponentPool<T> {
    sparse: Vec<u32>,
    dense: Vec<(EntityId, T)>,
}

impl<T> Default for ComponentPool<T> {
    fn default() -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::new(),
        }
    }
}

impl<T> ComponentPool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    fn slot(&self, entity: EntityId) -> Option<usize> {
        let slot = *self.sparse.get(entity.index() as usize)?;
        if slot == ABSENT {
            return None;
        }
        let slot = slot as usize;
        (self.dense[slot].0 == entity).then_some(slot)
    }

    #[inline]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.slot(entity).is_some()
    }

    pub fn get(&self, entity: EntityId) -> Option<&T> {
        self.slot(entity).map(|slot| &self.dense[slot].1)
    }

    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        let slot = self.slot(entity)?;
        Some(&mut self.dense[slot].1)
    }

    /// Append `value` for `entity`. If the entity already has a value it is
    /// replaced in place.
    pub fn insert(&mut self, entity: EntityId, value: T) -> &mut T {
        if let Some(slot) = self.slot(entity) {
            self.dense[slot].1 = value;
            return &mut self.dense[slot].1;
        }
        let idx = entity.index() as usize;
        if idx >= self.sparse.len() {
            self.sparse.resize(idx + 1, ABSENT);
        }
        let slot = self.dense.len();
        self.sparse[idx] = slot as u32;
        self.dense.push((entity, value));
        &mut self.dense[slot].1
    }

    /// Remove and return the value for `entity`, moving the last dense pair
    /// into its slot.
    pub fn remove(&mut self, entity: EntityId) -> Option<T> {
        let slot = self.slot(entity)?;
        self.sparse[entity.index() as usize] = ABSENT;
        let (_, value) = self.dense.swap_remove(slot);
        if let Some(&(moved, _)) = self.dense.get(slot) {
            self.sparse[moved.index() as usize] = slot as u32;
        }
        Some(value)
    }

    /// Entity stored at dense position `index`.
    #[inline]
    pub fn entity_at(&self, index: usize) -> EntityId {
        self.dense[index].0
    }

    /// The pair stored at dense position `index`.
    #[inline]
    pub fn at_mut(&mut self, index: usize) -> (EntityId, &mut T) {
        let (entity, value) = &mut self.dense[index];
        (*entity, value)
    }

    /// Pairs in dense order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (EntityId, &T)> {
        self.dense.iter().map(|(e, v)| (*e, v))
    }

    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = (EntityId, &mut T)> {
        self.dense.iter_mut().map(|(e, v)| (*e, v))
    }

    /// Reorder so that reverse dense iteration (the order queries use) visits
    /// values in `compare` order, then rebuild the sparse index.
    pub fn sort_by(&mut self, mut compare: impl FnMut(&T, &T) -> Ordering) {
        self.dense.sort_by(|a, b| compare(&b.1, &a.1));
        for (slot, (entity, _)) in self.dense.iter().enumerate() {
            self.sparse[entity.index() as usize] = slot as u32;
        }
    }

    pub fn clear(&mut self) {
        self.sparse.clear();
        self.dense.clear();
    }
}

// ---------------------------------------------------------------------------
// Type erasure
// ---------------------------------------------------------------------------

/// Object-safe view over a pool of any component type.
pub(crate) trait AnyPool: Any {
    fn len(&self) -> usize;
    fn contains(&self, entity: EntityId) -> bool;
    fn entity_at(&self, index: usize) -> EntityId;
    fn type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static> AnyPool for ComponentPool<T> {
    fn len(&self) -> usize {
        ComponentPool::len(self)
    }

    fn contains(&self, entity: EntityId) -> bool {
        ComponentPool::contains(self, entity)
    }

    fn entity_at(&self, index: usize) -> EntityId {
        ComponentPool::entity_at(self, index)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
