//! Dream ECS -- sparse-set Entity Component System with reflected components.
//!
//! Every component type is stored in its own sparse-set pool, giving O(1)
//! add/remove/lookup and dense iteration. Component types that opt into
//! reflection with [`reflect!`] get generic JSON serialization, scene and
//! blueprint persistence, whole-world snapshots and a dynamic field view,
//! all driven by the same field walk.
//!
//! # Quick Start
//!
//! ```
//! use dream_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! struct Position { x: f32, y: f32 }
//! dream_ecs::reflect!(Position { x, y });
//! dream_ecs::scene_component!(Position);
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! struct Velocity { dx: f32, dy: f32 }
//! dream_ecs::reflect!(Velocity { dx, dy });
//! dream_ecs::scene_component!(Velocity);
//!
//! let mut world = World::new();
//! world.register_component::<Position>();
//! world.register_component::<Velocity>();
//!
//! let entity = world.create_with((Position { x: 0.0, y: 0.0 }, Velocity { dx: 1.0, dy: 0.0 }));
//! world.each2::<Position, Velocity>(|_, pos, vel| {
//!     pos.x += vel.dx;
//!     pos.y += vel.dy;
//! });
//!
//! assert_eq!(world.get::<Position>(entity), &Position { x: 1.0, y: 0.0 });
//!
//! let scene = world.write_scene();
//! world.clear_entities();
//! world.read_scene(&scene);
//! assert_eq!(world.try_get::<Position>(entity), Some(&Position { x: 1.0, y: 0.0 }));
//! ```

#![deny(unsafe_code)]

pub mod component;
pub mod entity;
pub mod fixed_str;
pub mod math;
pub mod pool;
pub mod query;
pub mod reflect;
pub mod scene;
pub mod serialize;
pub mod snapshot;
pub mod spatial;
pub mod world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ECS operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The entity does not exist (stale generation or never allocated).
    #[error("entity {entity:?} does not exist (stale or never allocated)")]
    StaleEntity { entity: entity::EntityId },

    /// A component type was referenced by name that has not been registered.
    #[error("component type '{name}' not registered. Registered components: [{registered}]")]
    UnknownComponent { name: String, registered: String },

    /// The component was expected on the entity but is not attached.
    #[error("entity {entity:?} has no '{component}' component")]
    MissingComponent {
        entity: entity::EntityId,
        component: &'static str,
    },
}

impl world::World {
    /// Resolve a registered component name, reporting the registered set on
    /// failure.
    pub fn component_named(&self, name: &str) -> Result<component::ComponentTypeId, EcsError> {
        self.registry()
            .lookup_by_name(name)
            .ok_or_else(|| EcsError::UnknownComponent {
                name: name.to_owned(),
                registered: self.registry().registered_names().join(", "),
            })
    }
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::component::{
        Component, ComponentInfo, ComponentRegistry, ComponentTypeId, ComponentVtable,
        SceneComponent,
    };
    pub use crate::entity::EntityId;
    pub use crate::fixed_str::FixedStr;
    pub use crate::math::{BoundingBox, Rect, Vec2};
    pub use crate::pool::ComponentPool;
    pub use crate::query::QueryFilter;
    pub use crate::reflect::{
        prop_attribs, DynProps, FieldMut, Inspect, Prop, PropAttribs, PropVisitor,
        PropVisitorRef, Props, SeqField, TextField,
    };
    pub use crate::serialize::{parse, stringify, Node, ReadWrite};
    pub use crate::snapshot::{ComponentSnapshot, EntitySnapshot, WorldSnapshot};
    pub use crate::spatial::{BroadPhase, Bounded, SpatialHashGrid, SpatialIndex};
    pub use crate::world::{Bundle, World};
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    // -- test component types -----------------------------------------------

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
    struct Inventory {
        slots: [i32; 4],
        items: Vec<String>,
        bounds: Rect,
        anchor: Vec2,
        scale: f64,
        visible: bool,
        owner: EntityId,
    }
    crate::reflect!(Inventory { slots, items, bounds, anchor, scale, visible, owner });
    crate::scene_component!(Inventory);

    fn setup_world() -> World {
        let mut world = World::new();
        world.register_component::<Position>();
        world.register_component::<Name>();
        world.register_component::<Inventory>();
        world
    }

    // -- serialization through the store ------------------------------------

    #[test]
    fn every_field_kind_survives_text_round_trip() {
        let mut world = setup_world();
        let owner = world.create();
        let e = world.create();
        let inventory = Inventory {
            slots: [1, -2, 3, 4],
            items: vec!["sword".into(), "shield".into()],
            bounds: Rect::new(1.0, 2.0, 30.0, 40.0),
            anchor: Vec2::new(0.5, -0.25),
            scale: 1.125,
            visible: true,
            owner,
        };
        world.add(e, inventory.clone()).unwrap();
        world.add(e, Name(FixedStr::new("chest"))).unwrap();

        let text = stringify(&world.write_scene(), true);
        world.clear_entities();
        world.read_scene(&parse(&text));

        assert_eq!(world.get::<Inventory>(e), &inventory);
        assert_eq!(world.get::<Name>(e).0, "chest");
        assert!(world.exists(owner));
    }

    #[test]
    fn store_invariants_after_add_remove_destroy() {
        let mut world = setup_world();
        let e = world.create();
        world.add(e, Position { x: 1.0, y: 1.0 }).unwrap();
        assert!(world.has::<Position>(e));
        assert_eq!(world.get::<Position>(e), &Position { x: 1.0, y: 1.0 });

        world.remove::<Position>(e);
        assert!(!world.has::<Position>(e));

        world.add(e, Name::default()).unwrap();
        world.destroy(e).unwrap();
        assert!(!world.exists(e));
        for info in world.registry().iter() {
            assert!(!(info.vtable.has)(&world, e), "{} survived destroy", info.name);
        }
    }

    #[test]
    fn component_named_reports_registered_set() {
        let world = setup_world();
        assert!(world.component_named("Name").is_ok());
        match world.component_named("Ghost") {
            Err(EcsError::UnknownComponent { name, registered }) => {
                assert_eq!(name, "Ghost");
                assert_eq!(registered, "Position, Name, Inventory");
            }
            other => panic!("expected UnknownComponent, got {other:?}"),
        }
    }

    #[test]
    fn vtable_drives_type_erased_edits() {
        let mut world = setup_world();
        let e = world.create();
        let id = world.component_named("Position").unwrap();
        let vtable = world.registry().get_info(id).unwrap().vtable;

        (vtable.add_default)(&mut world, e);
        assert!((vtable.has)(&world, e));

        (vtable.inspect)(&mut world, e, &mut |props| {
            props.visit_fields(&mut |attribs, field| {
                if let FieldMut::Float(v) = field {
                    *v = if attribs.name == "x" { 8.0 } else { 9.0 };
                }
            });
        });
        assert_eq!(world.get::<Position>(e), &Position { x: 8.0, y: 9.0 });

        (vtable.remove)(&mut world, e);
        assert!(!world.has::<Position>(e));
    }
}
