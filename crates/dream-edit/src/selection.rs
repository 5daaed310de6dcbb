//! Edit markers and selection.
//!
//! Markers are ordinary components that are never registered, so scenes,
//! blueprints and history snapshots do not see them.

use dream_ecs::prelude::*;

/// The entity is selected.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EditSelect;
impl Component for EditSelect {}

/// The entity is about to be deleted and must be left out of snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EditDelete;
impl Component for EditDelete {}

/// Clickable bounds, rebuilt by the game every editor frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EditBox {
    pub rect: Rect,
}
impl Component for EditBox {}

/// A pending translation for the game to apply.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EditMove {
    pub delta: Vec2,
}
impl Component for EditMove {}

/// Grow the entity's edit box to cover `rect`, creating it if absent.
pub fn merge_edit_box(world: &mut World, entity: EntityId, rect: Rect) {
    if let Some(edit_box) = world.try_get_mut::<EditBox>(entity) {
        edit_box.rect = edit_box.rect.union(&rect);
        return;
    }
    attach(world, entity, EditBox { rect });
}

/// Attach a marker, logging if the entity is gone.
pub(crate) fn attach<T: Component>(world: &mut World, entity: EntityId, marker: T) {
    if let Err(err) = world.add(entity, marker) {
        tracing::warn!(%entity, error = %err, "failed to attach edit marker");
    }
}

pub fn select(world: &mut World, entity: EntityId) {
    attach(world, entity, EditSelect);
}

/// Selected entities, in iteration order.
pub fn save_selection(world: &World) -> Vec<EntityId> {
    world.entities_with::<EditSelect>()
}

/// Replace the selection. Entities that no longer exist are skipped.
pub fn load_selection(world: &mut World, selection: &[EntityId]) {
    world.clear_component::<EditSelect>();
    for &entity in selection {
        if world.exists(entity) {
            select(world, entity);
        }
    }
}

pub fn has_selection(world: &World) -> bool {
    world.pool::<EditSelect>().is_some_and(|pool| !pool.is_empty())
}

/// The selected entity the inspector shows.
pub fn first_selected(world: &World) -> Option<EntityId> {
    world.entities_with::<EditSelect>().into_iter().next()
}

/// Click-pick at `point`.
///
/// Hits are ordered by ascending box area; equal areas keep edit box
/// iteration order. The pick is the first unselected hit after the last
/// selected one, so repeated clicks cycle through overlapping entities.
/// Unless `additive`, the previous selection is cleared. Returns the newly
/// selected entity.
pub fn pick_at(
    world: &mut World,
    point: Vec2,
    additive: bool,
    max_hits: usize,
) -> Option<EntityId> {
    let mut hits: Vec<(EntityId, f32)> = Vec::new();
    world.each::<EditBox>(|entity, edit_box| {
        if hits.len() < max_hits && edit_box.rect.contains(point) {
            hits.push((entity, edit_box.rect.area()));
        }
    });
    hits.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut pick = None;
    let mut pick_next = true;
    for &(entity, _) in &hits {
        if world.has::<EditSelect>(entity) {
            pick_next = true;
        } else if pick_next {
            pick = Some(entity);
            pick_next = false;
        }
    }

    if !additive {
        world.clear_component::<EditSelect>();
    }
    if let Some(entity) = pick {
        select(world, entity);
    }
    pick
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(world: &mut World, rect: Rect) -> EntityId {
        let e = world.create();
        merge_edit_box(world, e, rect);
        e
    }

    #[test]
    fn merge_takes_union() {
        let mut world = World::new();
        let e = boxed(&mut world, Rect::new(0.0, 0.0, 10.0, 10.0));
        merge_edit_box(&mut world, e, Rect::new(5.0, -5.0, 10.0, 10.0));
        assert_eq!(world.get::<EditBox>(e).rect, Rect::new(0.0, -5.0, 15.0, 15.0));
    }

    #[test]
    fn selection_round_trip_skips_dead_entities() {
        let mut world = World::new();
        let a = world.create();
        let b = world.create();
        select(&mut world, a);
        select(&mut world, b);
        let saved = save_selection(&world);
        assert_eq!(saved.len(), 2);

        world.clear_component::<EditSelect>();
        assert!(!has_selection(&world));
        world.destroy(b).unwrap();
        load_selection(&mut world, &saved);
        assert_eq!(save_selection(&world), vec![a]);
        assert_eq!(first_selected(&world), Some(a));
    }

    #[test]
    fn repeated_clicks_cycle_by_area() {
        let mut world = World::new();
        let big = boxed(&mut world, Rect::new(0.0, 0.0, 100.0, 100.0));
        let small = boxed(&mut world, Rect::new(0.0, 0.0, 10.0, 10.0));
        let medium = boxed(&mut world, Rect::new(0.0, 0.0, 50.0, 50.0));
        let point = Vec2::new(5.0, 5.0);

        assert_eq!(pick_at(&mut world, point, false, 32), Some(small));
        assert_eq!(pick_at(&mut world, point, false, 32), Some(medium));
        assert_eq!(pick_at(&mut world, point, false, 32), Some(big));
        // After the largest, wrap back to the smallest.
        assert_eq!(pick_at(&mut world, point, false, 32), Some(small));
        assert_eq!(save_selection(&world), vec![small]);
    }

    #[test]
    fn equal_areas_keep_iteration_order() {
        let mut world = World::new();
        let first = boxed(&mut world, Rect::new(0.0, 0.0, 10.0, 10.0));
        let second = boxed(&mut world, Rect::new(0.0, 0.0, 10.0, 10.0));
        // Iteration runs newest first.
        let order = world.entities_with::<EditBox>();
        assert_eq!(order, vec![second, first]);
        assert_eq!(pick_at(&mut world, Vec2::new(1.0, 1.0), false, 32), Some(second));
        assert_eq!(pick_at(&mut world, Vec2::new(1.0, 1.0), false, 32), Some(first));
    }

    #[test]
    fn additive_pick_keeps_selection_and_miss_clears() {
        let mut world = World::new();
        let a = boxed(&mut world, Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = boxed(&mut world, Rect::new(20.0, 0.0, 10.0, 10.0));
        pick_at(&mut world, Vec2::new(1.0, 1.0), false, 32);
        pick_at(&mut world, Vec2::new(21.0, 1.0), true, 32);
        let mut selected = save_selection(&world);
        selected.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(selected, expected);

        assert_eq!(pick_at(&mut world, Vec2::new(500.0, 500.0), false, 32), None);
        assert!(!has_selection(&world));
    }

    #[test]
    fn hit_cap_limits_candidates() {
        let mut world = World::new();
        for _ in 0..4 {
            boxed(&mut world, Rect::new(0.0, 0.0, 10.0, 10.0));
        }
        let mut picked = Vec::new();
        for _ in 0..4 {
            picked.extend(pick_at(&mut world, Vec2::new(1.0, 1.0), false, 2));
        }
        picked.sort();
        picked.dedup();
        assert_eq!(picked.len(), 2);
    }
}
