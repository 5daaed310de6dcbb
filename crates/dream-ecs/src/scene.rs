//! Scene and blueprint persistence.
//!
//! A *blueprint* is the serialized form of one entity:
//!
//! ```json
//! {"id": 4294967296, "components": [{"_type": "Position", "x": 1, "y": 2}]}
//! ```
//!
//! Components are written in registration order, independent of the order in
//! which they were attached. A *scene* is `{"entities": [blueprint, ...]}`,
//! written in live entity order so that reading it back recreates entities in
//! the order they were originally created.

use crate::entity::EntityId;
use crate::serialize::{type_tag, Node, ReadWrite};
use crate::world::World;

impl World {
    /// Serialize every registered component on `entity`. The handle is
    /// embedded under `"id"` when `write_id` is set.
    pub fn write_blueprint(&self, entity: EntityId, write_id: bool) -> Node {
        let components: Vec<Node> = self
            .registry()
            .iter()
            .filter_map(|info| (info.vtable.write)(self, entity))
            .collect();
        let mut object = serde_json::Map::new();
        if write_id {
            object.insert("id".to_owned(), entity.write());
        }
        object.insert("components".to_owned(), Node::Array(components));
        Node::Object(object)
    }

    /// Create an entity from a blueprint and return it.
    ///
    /// An embedded `"id"` is used as a handle hint. Component payloads whose
    /// `_type` does not name a registered type are skipped.
    pub fn read_blueprint(&mut self, node: &Node) -> EntityId {
        let entity = match node.get("id") {
            Some(id) => {
                let mut hint = EntityId::NULL;
                hint.read(id);
                self.create_with_hint(hint)
            }
            None => self.create(),
        };
        let Some(components) = node.get("components").and_then(Node::as_array) else {
            return entity;
        };
        for payload in components {
            let Some(name) = type_tag(payload) else {
                continue;
            };
            let Some(read_attach) = self
                .registry()
                .lookup_by_name(name)
                .and_then(|id| self.registry().get_info(id))
                .map(|info| info.vtable.read_attach)
            else {
                tracing::trace!(component = name, "skipping unregistered component");
                continue;
            };
            read_attach(self, entity, payload);
        }
        entity
    }

    /// Serialize every live entity, ids included.
    pub fn write_scene(&self) -> Node {
        let entities: Vec<Node> = self
            .entities()
            .into_iter()
            .map(|entity| self.write_blueprint(entity, true))
            .collect();
        let mut object = serde_json::Map::new();
        object.insert("entities".to_owned(), Node::Array(entities));
        Node::Object(object)
    }

    /// Read every blueprint in a scene, returning the created entities in
    /// file order.
    pub fn read_scene(&mut self, node: &Node) -> Vec<EntityId> {
        let Some(blueprints) = node.get("entities").and_then(Node::as_array) else {
            return Vec::new();
        };
        let created: Vec<EntityId> = blueprints
            .iter()
            .map(|blueprint| self.read_blueprint(blueprint))
            .collect();
        tracing::debug!(entities = created.len(), "read scene");
        created
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed_str::FixedStr;
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }
    crate::reflect!(Position { x, y });
    crate::scene_component!(Position);

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Name(FixedStr<32>);
    crate::reflect!(Name(0));
    crate::scene_component!(Name);

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Target {
        entity: EntityId,
    }
    crate::reflect!(Target { entity });
    crate::scene_component!(Target);

    fn setup_world() -> World {
        let mut world = World::new();
        world.register_component::<Position>();
        world.register_component::<Name>();
        world.register_component::<Target>();
        world
    }

    #[test]
    fn blueprint_follows_registration_order() {
        let mut world = setup_world();
        let e = world.create();
        world.add(e, Name(FixedStr::new("foo"))).unwrap();
        world.add(e, Position { x: 1.0, y: 2.0 }).unwrap();

        let node = world.write_blueprint(e, false);
        assert_eq!(
            node,
            json!({"components": [
                {"_type": "Position", "x": 1.0, "y": 2.0},
                {"_type": "Name", "0": "foo"},
            ]})
        );
        assert!(node.get("id").is_none());
    }

    #[test]
    fn scene_round_trip_keeps_values_and_ids() {
        let mut world = setup_world();
        let e1 = world.create();
        world.add(e1, Position { x: 1.0, y: 2.0 }).unwrap();
        world.add(e1, Name(FixedStr::new("foo"))).unwrap();
        let e2 = world.create();
        world.add(e2, Position { x: 3.0, y: 4.0 }).unwrap();

        let scene = world.write_scene();
        world.clear_entities();
        let created = world.read_scene(&scene);

        assert_eq!(created, vec![e1, e2]);
        assert_eq!(world.entities(), vec![e1, e2]);
        assert_eq!(world.get::<Position>(e1), &Position { x: 1.0, y: 2.0 });
        assert_eq!(world.get::<Name>(e1).0, "foo");
        assert_eq!(world.get::<Position>(e2), &Position { x: 3.0, y: 4.0 });
        assert!(!world.has::<Name>(e2));
    }

    #[test]
    fn blueprint_duplicate_is_independent() {
        let mut world = setup_world();
        let e = world.create();
        world.add(e, Position { x: 5.0, y: 6.0 }).unwrap();

        let copy = world.read_blueprint(&world.write_blueprint(e, false));
        assert_ne!(copy, e);
        assert_eq!(world.get::<Position>(copy), world.get::<Position>(e));

        world.get_mut::<Position>(copy).x = 0.0;
        assert_eq!(world.get::<Position>(e).x, 5.0);
    }

    #[test]
    fn entity_references_survive_round_trip() {
        let mut world = setup_world();
        let a = world.create();
        let b = world.create();
        world.add(b, Target { entity: a }).unwrap();

        let scene = world.write_scene();
        world.clear_entities();
        world.read_scene(&scene);
        assert_eq!(world.get::<Target>(b).entity, a);
        assert!(world.exists(a));
    }

    #[test]
    fn unknown_types_and_malformed_nodes_are_skipped() {
        let mut world = setup_world();
        let e = world.read_blueprint(&json!({
            "components": [
                {"_type": "Ghost", "x": 1},
                {"x": 9},
                {"_type": "Position", "x": 7, "unknown": true},
            ]
        }));
        assert_eq!(world.get::<Position>(e), &Position { x: 7.0, y: 0.0 });
        assert!(world.read_scene(&json!([1, 2])).is_empty());
    }
}
