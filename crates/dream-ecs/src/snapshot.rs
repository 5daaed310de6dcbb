//! Type-erased component copies and whole-world snapshots.
//!
//! A [`WorldSnapshot`] is a deep copy of every live entity's registered
//! components, taken directly through `Clone` rather than the text format.
//! Restoring tears the world down and rebuilds each entity under its original
//! handle. The undo history is built from these.

use std::any::Any;
use std::fmt;

use crate::component::SceneComponent;
use crate::entity::EntityId;
use crate::serialize::{type_tag, write_tagged, Node, ReadWrite};
use crate::world::World;

// ---------------------------------------------------------------------------
// ComponentSnapshot
// ---------------------------------------------------------------------------

/// An owned copy of one component value whose type has been erased.
pub trait ComponentSnapshot {
    /// Registered name of the copied type.
    fn type_name(&self) -> &'static str;

    /// Attach a fresh copy of the value to `entity`.
    fn attach(&self, world: &mut World, entity: EntityId);

    /// Tagged payload of the copied value.
    fn write(&self) -> Node;

    fn clone_box(&self) -> Box<dyn ComponentSnapshot>;

    fn as_any(&self) -> &dyn Any;
}

impl Clone for Box<dyn ComponentSnapshot> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl fmt::Debug for dyn ComponentSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentSnapshot({})", self.type_name())
    }
}

/// The [`ComponentSnapshot`] for a concrete component type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedSnapshot<T>(T);

impl<T: SceneComponent> TypedSnapshot<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &T {
        &self.0
    }
}

impl<T: SceneComponent> ComponentSnapshot for TypedSnapshot<T> {
    fn type_name(&self) -> &'static str {
        T::NAME
    }

    fn attach(&self, world: &mut World, entity: EntityId) {
        if let Err(err) = world.add(entity, self.0.clone()) {
            tracing::warn!(component = T::NAME, error = %err, "failed to attach snapshot");
        }
    }

    fn write(&self) -> Node {
        write_tagged(T::NAME, &self.0)
    }

    fn clone_box(&self) -> Box<dyn ComponentSnapshot> {
        Box::new(Self(self.0.clone()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

/// Copies of every registered component on one entity.
#[derive(Debug, Clone, Default)]
pub struct EntitySnapshot {
    pub entity: EntityId,
    /// In component registration order.
    pub components: Vec<Box<dyn ComponentSnapshot>>,
}

impl EntitySnapshot {
    /// The copied value of type `T`, if present.
    pub fn get<T: SceneComponent>(&self) -> Option<&T> {
        self.components.iter().find_map(|c| {
            c.as_any()
                .downcast_ref::<TypedSnapshot<T>>()
                .map(TypedSnapshot::value)
        })
    }

    /// `{"components": [...], "entity": id}`
    pub fn write(&self) -> Node {
        let mut object = serde_json::Map::new();
        object.insert(
            "components".to_owned(),
            Node::Array(self.components.iter().map(|c| c.write()).collect()),
        );
        object.insert("entity".to_owned(), self.entity.write());
        Node::Object(object)
    }
}

/// Copies of every live entity.
#[derive(Debug, Clone, Default)]
pub struct WorldSnapshot {
    /// In world entity order.
    pub entities: Vec<EntitySnapshot>,
}

impl WorldSnapshot {
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn find(&self, entity: EntityId) -> Option<&EntitySnapshot> {
        self.entities.iter().find(|e| e.entity == entity)
    }
}

// ---------------------------------------------------------------------------
// World snapshot/restore impl
// ---------------------------------------------------------------------------

impl World {
    /// Copy every registered component attached to `entity`.
    pub fn capture_entity(&self, entity: EntityId) -> EntitySnapshot {
        let components = self
            .registry()
            .iter()
            .filter_map(|info| (info.vtable.snapshot)(self, entity))
            .collect();
        EntitySnapshot { entity, components }
    }

    /// Capture every live entity.
    pub fn capture_snapshot(&self) -> WorldSnapshot {
        self.capture_snapshot_filtered(|_, _| true)
    }

    /// Capture every live entity for which `keep` returns `true`.
    pub fn capture_snapshot_filtered(
        &self,
        mut keep: impl FnMut(&World, EntityId) -> bool,
    ) -> WorldSnapshot {
        let entities: Vec<EntitySnapshot> = self
            .entities()
            .into_iter()
            .filter(|&entity| keep(self, entity))
            .map(|entity| self.capture_entity(entity))
            .collect();
        tracing::debug!(entities = entities.len(), "captured world snapshot");
        WorldSnapshot { entities }
    }

    /// Destroy every entity, then recreate each snapshotted entity under its
    /// original handle and attach copies of its components.
    ///
    /// Component hooks fire as the copies are attached.
    pub fn restore_snapshot(&mut self, snapshot: &WorldSnapshot) {
        self.clear_entities();
        for entity_snapshot in &snapshot.entities {
            let entity = self.create_with_hint(entity_snapshot.entity);
            if entity != entity_snapshot.entity {
                tracing::warn!(
                    requested = %entity_snapshot.entity,
                    assigned = %entity,
                    "entity handle could not be restored"
                );
            }
            for component in &entity_snapshot.components {
                component.attach(self, entity);
            }
        }
        tracing::debug!(entities = snapshot.entities.len(), "restored world snapshot");
    }

    /// Rebuild an [`EntitySnapshot`] from [`EntitySnapshot::write`] output.
    /// Payloads whose `_type` is not registered are dropped.
    pub fn read_entity_snapshot(&self, node: &Node) -> EntitySnapshot {
        let mut entity = EntityId::NULL;
        if let Some(id) = node.get("entity") {
            entity.read(id);
        }
        let components = node
            .get("components")
            .and_then(Node::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let id = self.registry().lookup_by_name(type_tag(item)?)?;
                        let info = self.registry().get_info(id)?;
                        Some((info.vtable.snapshot_from_node)(item))
                    })
                    .collect()
            })
            .unwrap_or_default();
        EntitySnapshot { entity, components }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }
    crate::reflect!(Position { x, y });
    crate::scene_component!(Position);

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Tags {
        names: Vec<String>,
    }
    crate::reflect!(Tags { names });
    crate::scene_component!(Tags);

    fn setup_world() -> World {
        let mut world = World::new();
        world.register_component::<Position>();
        world.register_component::<Tags>();
        world
    }

    #[test]
    fn snapshot_is_independent_of_world() {
        let mut world = setup_world();
        let e = world.create();
        world.add(e, Position { x: 1.0, y: 2.0 }).unwrap();
        let snap = world.capture_snapshot();

        world.get_mut::<Position>(e).x = 50.0;
        assert_eq!(snap.entities[0].get::<Position>().unwrap().x, 1.0);
    }

    #[test]
    fn restore_recreates_handles_and_values() {
        let mut world = setup_world();
        let a = world.create();
        let b = world.create();
        world.add(a, Position { x: 1.0, y: 2.0 }).unwrap();
        world
            .add(
                b,
                Tags {
                    names: vec!["t".into()],
                },
            )
            .unwrap();
        let snap = world.capture_snapshot();

        world.destroy(a).unwrap();
        let c = world.create();
        world.add(c, Position::default()).unwrap();

        world.restore_snapshot(&snap);
        assert_eq!(world.entity_count(), 2);
        assert!(world.exists(a));
        assert!(world.exists(b));
        assert_eq!(world.get::<Position>(a), &Position { x: 1.0, y: 2.0 });
        assert_eq!(world.get::<Tags>(b).names, vec!["t".to_string()]);
        assert!(!world.has::<Position>(b));
    }

    #[test]
    fn filtered_capture_skips_entities() {
        let mut world = setup_world();
        let keep = world.create();
        let skip = world.create();
        world.add(skip, Position::default()).unwrap();
        let snap = world.capture_snapshot_filtered(|w, e| !w.has::<Position>(e));
        assert_eq!(snap.len(), 1);
        assert!(snap.find(keep).is_some());
        assert!(snap.find(skip).is_none());
    }

    #[test]
    fn entity_snapshot_node_round_trip() {
        let mut world = setup_world();
        let e = world.create();
        world.add(e, Position { x: 3.0, y: 4.0 }).unwrap();
        let node = world.capture_entity(e).write();
        assert_eq!(node["components"][0]["_type"], json!("Position"));

        let back = world.read_entity_snapshot(&node);
        assert_eq!(back.entity, e);
        assert_eq!(back.get::<Position>(), Some(&Position { x: 3.0, y: 4.0 }));
    }

    #[test]
    fn unknown_snapshot_types_are_dropped() {
        let world = setup_world();
        let node = json!({
            "components": [{"_type": "Ghost", "boo": 1}, {"_type": "Position", "x": 5}],
            "entity": 0
        });
        let snap = world.read_entity_snapshot(&node);
        assert_eq!(snap.components.len(), 1);
        assert_eq!(snap.components[0].type_name(), "Position");
    }

    #[test]
    fn boxed_snapshots_clone_deeply() {
        let boxed: Box<dyn ComponentSnapshot> = Box::new(TypedSnapshot::new(Tags {
            names: vec!["a".into()],
        }));
        let copy = boxed.clone();
        assert_eq!(copy.type_name(), "Tags");
        assert_eq!(copy.write(), boxed.write());
    }
}
