//! Broad-phase spatial index adapter.
//!
//! A [`BroadPhase`] backend stores opaque `u64` handles with bounding boxes.
//! [`SpatialIndex`] maps entities carrying a [`Bounded`] component onto those
//! handles and back. The backend never owns entity data: each query decodes
//! the handles it returns and drops entities that no longer carry the
//! component, so stale entries are harmless until the next `reindex`.

use std::collections::HashMap;
use std::marker::PhantomData;

use crate::component::Component;
use crate::entity::EntityId;
use crate::math::{BoundingBox, Vec2};
use crate::world::World;

/// Encode an entity as a broad-phase handle. Handle `0` is never produced.
#[inline]
pub fn entity_to_handle(entity: EntityId) -> u64 {
    entity.to_raw().wrapping_add(1)
}

/// Decode a broad-phase handle.
#[inline]
pub fn handle_to_entity(handle: u64) -> Option<EntityId> {
    handle.checked_sub(1).map(EntityId::from_raw)
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// A broad-phase collision structure over opaque handles.
pub trait BroadPhase {
    fn insert(&mut self, handle: u64, bounds: BoundingBox);
    fn remove(&mut self, handle: u64);

    /// Move an existing handle. Inserts it if absent.
    fn update(&mut self, handle: u64, bounds: BoundingBox) {
        self.remove(handle);
        self.insert(handle, bounds);
    }

    /// Call `visit` once for every handle whose box overlaps `bounds`.
    fn query(&self, bounds: BoundingBox, visit: &mut dyn FnMut(u64));
}

/// Boxes spanning more cells than this are kept out of the grid and checked
/// against every query instead.
pub const MAX_CELLS_PER_HANDLE: u64 = 1024;

/// Inclusive cell range `(x0, y0)..=(x1, y1)` under a box.
type CellSpan = ((i32, i32), (i32, i32));

/// Uniform grid backend. Each handle is stored in every cell its box touches.
/// Oversized or unbounded boxes live in a side list.
#[derive(Debug, Clone)]
pub struct SpatialHashGrid {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<u64>>,
    bounds: HashMap<u64, BoundingBox>,
    oversized: Vec<u64>,
}

impl Default for SpatialHashGrid {
    fn default() -> Self {
        Self::new(128.0)
    }
}

impl SpatialHashGrid {
    /// Create a grid with square cells of `cell_size` world units.
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: if cell_size.is_finite() && cell_size > 0.0 {
                cell_size
            } else {
                1.0
            },
            cells: HashMap::new(),
            bounds: HashMap::new(),
            oversized: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    fn cell_of(&self, point: Vec2) -> (i32, i32) {
        (
            (point.x / self.cell_size).floor() as i32,
            (point.y / self.cell_size).floor() as i32,
        )
    }

    /// Cells under `bounds`, or `None` when the box is not finite.
    fn cell_span(&self, bounds: &BoundingBox) -> Option<CellSpan> {
        let finite = [bounds.min.x, bounds.min.y, bounds.max.x, bounds.max.y]
            .iter()
            .all(|v| v.is_finite());
        finite.then(|| (self.cell_of(bounds.min), self.cell_of(bounds.max)))
    }

    fn span_len(((x0, y0), (x1, y1)): CellSpan) -> u64 {
        let w = (i64::from(x1) - i64::from(x0) + 1).max(0) as u64;
        let h = (i64::from(y1) - i64::from(y0) + 1).max(0) as u64;
        w.saturating_mul(h)
    }

    fn cells_in(((x0, y0), (x1, y1)): CellSpan) -> impl Iterator<Item = (i32, i32)> {
        (y0..=y1).flat_map(move |y| (x0..=x1).map(move |x| (x, y)))
    }

    /// The grid cells a stored box occupies. Empty for oversized boxes.
    fn stored_span(&self, bounds: &BoundingBox) -> Option<CellSpan> {
        self.cell_span(bounds)
            .filter(|&span| Self::span_len(span) <= MAX_CELLS_PER_HANDLE)
    }

    fn overlapping(&self, handle: u64, bounds: &BoundingBox) -> bool {
        self.bounds
            .get(&handle)
            .is_some_and(|stored| stored.overlaps(bounds))
    }
}

fn has_nan(bounds: &BoundingBox) -> bool {
    [bounds.min.x, bounds.min.y, bounds.max.x, bounds.max.y]
        .iter()
        .any(|v| v.is_nan())
}

impl BroadPhase for SpatialHashGrid {
    fn insert(&mut self, handle: u64, bounds: BoundingBox) {
        if self.bounds.contains_key(&handle) {
            self.remove(handle);
        }
        if has_nan(&bounds) {
            tracing::warn!(handle, ?bounds, "ignoring NaN bounds");
            return;
        }
        match self.stored_span(&bounds) {
            Some(span) => {
                for cell in Self::cells_in(span) {
                    self.cells.entry(cell).or_default().push(handle);
                }
            }
            None => self.oversized.push(handle),
        }
        self.bounds.insert(handle, bounds);
    }

    fn remove(&mut self, handle: u64) {
        let Some(bounds) = self.bounds.remove(&handle) else {
            return;
        };
        let Some(span) = self.stored_span(&bounds) else {
            self.oversized.retain(|&h| h != handle);
            return;
        };
        for cell in Self::cells_in(span) {
            if let Some(entries) = self.cells.get_mut(&cell) {
                entries.retain(|&h| h != handle);
                if entries.is_empty() {
                    self.cells.remove(&cell);
                }
            }
        }
    }

    fn query(&self, bounds: BoundingBox, visit: &mut dyn FnMut(u64)) {
        if has_nan(&bounds) {
            return;
        }
        let walk = self
            .cell_span(&bounds)
            .filter(|&span| Self::span_len(span) <= self.bounds.len() as u64);
        let mut hits: Vec<u64> = match walk {
            Some(span) => Self::cells_in(span)
                .filter_map(|cell| self.cells.get(&cell))
                .flatten()
                .chain(&self.oversized)
                .copied()
                .filter(|&handle| self.overlapping(handle, &bounds))
                .collect(),
            // Covering more cells than there are handles: scan them all.
            None => self
                .bounds
                .iter()
                .filter(|(_, stored)| stored.overlaps(&bounds))
                .map(|(&handle, _)| handle)
                .collect(),
        };
        hits.sort_unstable();
        hits.dedup();
        for handle in hits {
            visit(handle);
        }
    }
}

// ---------------------------------------------------------------------------
// Entity adapter
// ---------------------------------------------------------------------------

/// A component that knows its own world-space bounds.
pub trait Bounded: Component {
    fn bounding_box(&self) -> BoundingBox;
}

/// Keeps a [`BroadPhase`] backend in sync with entities carrying `T`.
#[derive(Debug)]
pub struct SpatialIndex<T, B = SpatialHashGrid> {
    backend: B,
    _component: PhantomData<fn() -> T>,
}

impl<T, B: Default> Default for SpatialIndex<T, B> {
    fn default() -> Self {
        Self {
            backend: B::default(),
            _component: PhantomData,
        }
    }
}

impl<T: Bounded, B: BroadPhase> SpatialIndex<T, B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            _component: PhantomData,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Index `entity` under its current bounds. Returns `false` if it has no
    /// `T`.
    pub fn insert(&mut self, world: &World, entity: EntityId) -> bool {
        let Some(value) = world.try_get::<T>(entity) else {
            return false;
        };
        self.backend
            .insert(entity_to_handle(entity), value.bounding_box());
        true
    }

    pub fn remove(&mut self, entity: EntityId) {
        self.backend.remove(entity_to_handle(entity));
    }

    /// Refresh the bounds of `entity`, dropping it if it lost its `T`.
    pub fn reindex(&mut self, world: &World, entity: EntityId) {
        match world.try_get::<T>(entity) {
            Some(value) => self
                .backend
                .update(entity_to_handle(entity), value.bounding_box()),
            None => self.remove(entity),
        }
    }

    /// Index every entity currently carrying `T`.
    pub fn reindex_all(&mut self, world: &World) {
        for entity in world.entities_with::<T>() {
            self.reindex(world, entity);
        }
    }

    /// Visit every entity whose indexed box overlaps `bounds` and that still
    /// carries `T`.
    pub fn query(&self, world: &World, bounds: BoundingBox, mut visit: impl FnMut(EntityId)) {
        self.backend.query(bounds, &mut |handle| {
            match handle_to_entity(handle) {
                Some(entity) if world.has::<T>(entity) => visit(entity),
                _ => tracing::trace!(handle, "skipping stale spatial handle"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Rect;

    #[derive(Debug, Clone, Copy)]
    struct Collider(Rect);
    impl Component for Collider {}
    impl Bounded for Collider {
        fn bounding_box(&self) -> BoundingBox {
            BoundingBox::from(self.0)
        }
    }

    fn bb(x0: f32, y0: f32, x1: f32, y1: f32) -> BoundingBox {
        BoundingBox::new(Vec2::new(x0, y0), Vec2::new(x1, y1))
    }

    fn query_handles(grid: &SpatialHashGrid, bounds: BoundingBox) -> Vec<u64> {
        let mut out = Vec::new();
        grid.query(bounds, &mut |h| out.push(h));
        out
    }

    #[test]
    fn handles_never_zero() {
        let e = EntityId::new(0, 0);
        assert_eq!(entity_to_handle(e), 1);
        assert_eq!(handle_to_entity(1), Some(e));
        assert_eq!(handle_to_entity(0), None);
    }

    #[test]
    fn grid_finds_overlaps_once() {
        let mut grid = SpatialHashGrid::new(10.0);
        grid.insert(1, bb(0.0, 0.0, 25.0, 25.0));
        grid.insert(2, bb(100.0, 100.0, 110.0, 110.0));
        assert_eq!(query_handles(&grid, bb(5.0, 5.0, 30.0, 30.0)), vec![1]);
        assert_eq!(query_handles(&grid, bb(-50.0, -50.0, 200.0, 200.0)), vec![1, 2]);
        assert!(query_handles(&grid, bb(40.0, 40.0, 50.0, 50.0)).is_empty());
    }

    #[test]
    fn grid_update_and_remove() {
        let mut grid = SpatialHashGrid::new(10.0);
        grid.insert(7, bb(0.0, 0.0, 5.0, 5.0));
        grid.update(7, bb(50.0, 50.0, 55.0, 55.0));
        assert!(query_handles(&grid, bb(0.0, 0.0, 5.0, 5.0)).is_empty());
        assert_eq!(query_handles(&grid, bb(52.0, 52.0, 53.0, 53.0)), vec![7]);
        grid.remove(7);
        assert!(grid.is_empty());
        assert!(query_handles(&grid, bb(52.0, 52.0, 53.0, 53.0)).is_empty());
    }

    #[test]
    fn grid_handles_negative_coordinates() {
        let mut grid = SpatialHashGrid::new(16.0);
        grid.insert(3, bb(-20.0, -20.0, -10.0, -10.0));
        assert_eq!(query_handles(&grid, bb(-12.0, -12.0, -11.0, -11.0)), vec![3]);
    }

    #[test]
    fn huge_query_scans_stored_handles() {
        let mut grid = SpatialHashGrid::new(1.0);
        grid.insert(1, bb(0.0, 0.0, 10.0, 10.0));
        grid.insert(2, bb(5e5, 5e5, 5e5 + 1.0, 5e5 + 1.0));
        assert_eq!(query_handles(&grid, bb(-1e6, -1e6, 1e6, 1e6)), vec![1, 2]);
        assert_eq!(query_handles(&grid, bb(-1e6, -1e6, 100.0, 100.0)), vec![1]);
        let everything = bb(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::INFINITY, f32::INFINITY);
        assert_eq!(query_handles(&grid, everything), vec![1, 2]);
    }

    #[test]
    fn huge_box_is_kept_out_of_cells() {
        let mut grid = SpatialHashGrid::new(1.0);
        grid.insert(1, bb(-1e7, -1e7, 1e7, 1e7));
        grid.insert(2, bb(0.0, f32::NEG_INFINITY, 1.0, f32::INFINITY));
        grid.insert(3, bb(3.0, 3.0, 4.0, 4.0));
        assert_eq!(grid.oversized, vec![1, 2]);
        assert!(grid.cells.len() <= 4);

        assert_eq!(query_handles(&grid, bb(0.5, 0.5, 0.6, 0.6)), vec![1, 2]);
        assert_eq!(query_handles(&grid, bb(3.5, 3.5, 3.6, 3.6)), vec![1, 3]);

        grid.update(1, bb(3.2, 3.2, 3.3, 3.3));
        assert_eq!(grid.oversized, vec![2]);
        assert_eq!(query_handles(&grid, bb(3.5, 3.5, 3.6, 3.6)), vec![3]);
        grid.remove(2);
        assert!(grid.oversized.is_empty());
        assert_eq!(grid.len(), 2);
    }

    #[test]
    fn nan_bounds_are_ignored() {
        let mut grid = SpatialHashGrid::new(4.0);
        grid.insert(1, bb(0.0, 0.0, 1.0, 1.0));
        grid.update(1, bb(f32::NAN, 0.0, 1.0, 1.0));
        assert!(grid.is_empty());
        grid.insert(2, bb(0.0, 0.0, 1.0, 1.0));
        assert!(query_handles(&grid, bb(0.0, f32::NAN, 1.0, 1.0)).is_empty());
        assert_eq!(query_handles(&grid, bb(0.5, 0.5, 0.6, 0.6)), vec![2]);
    }

    #[test]
    fn index_resolves_entities_lazily() {
        let mut world = World::new();
        let a = world.create_with((Collider(Rect::new(0.0, 0.0, 10.0, 10.0)),));
        let b = world.create_with((Collider(Rect::new(5.0, 5.0, 10.0, 10.0)),));
        let mut index: SpatialIndex<Collider> = SpatialIndex::new(SpatialHashGrid::new(8.0));
        index.reindex_all(&world);

        let mut hits = Vec::new();
        index.query(&world, bb(6.0, 6.0, 7.0, 7.0), |e| hits.push(e));
        hits.sort();
        assert_eq!(hits, vec![a, b]);

        world.destroy(a).unwrap();
        hits.clear();
        index.query(&world, bb(6.0, 6.0, 7.0, 7.0), |e| hits.push(e));
        assert_eq!(hits, vec![b]);
    }

    #[test]
    fn reindex_follows_component_changes() {
        let mut world = World::new();
        let e = world.create_with((Collider(Rect::new(0.0, 0.0, 4.0, 4.0)),));
        let mut index: SpatialIndex<Collider> = SpatialIndex::new(SpatialHashGrid::new(8.0));
        assert!(index.insert(&world, e));

        world.get_mut::<Collider>(e).0 = Rect::new(100.0, 100.0, 4.0, 4.0);
        index.reindex(&world, e);
        let mut hits = Vec::new();
        index.query(&world, bb(101.0, 101.0, 102.0, 102.0), |e| hits.push(e));
        assert_eq!(hits, vec![e]);

        world.remove::<Collider>(e);
        index.reindex(&world, e);
        assert!(index.backend().is_empty());
        assert!(!index.insert(&world, e));
    }
}
