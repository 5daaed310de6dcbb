//! Component traits, type registration and metadata.
//!
//! Any `'static` type implementing [`Component`] can be stored in a
//! [`World`]. Types that should also take part in scenes, snapshots and the
//! editor implement [`SceneComponent`] and are registered once with
//! [`World::register_component`]. Registration records a [`ComponentInfo`]
//! whose [`ComponentVtable`] holds monomorphized function pointers, so code
//! that only knows "some registered type" can still attach, copy, serialize or
//! inspect it. Registered types are always walked in registration order.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use crate::entity::EntityId;
use crate::reflect::{hash, prop_attribs, DynProps, Inspect, PropAttribs, Props};
use crate::serialize::{write_tagged, Node, ReadWrite};
use crate::snapshot::{ComponentSnapshot, TypedSnapshot};
use crate::world::World;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A value that can be attached to an entity.
///
/// All hooks are optional. They receive the world so they can reach other
/// state; the component itself is available through `world.get::<Self>()`.
pub trait Component: 'static {
    /// Called right after the component is attached.
    fn on_add(_world: &mut World, _entity: EntityId) {}

    /// Called right before the component is detached, while it is still
    /// present.
    fn on_remove(_world: &mut World, _entity: EntityId) {}

    /// Called when a reflected field changes: once per field on attach, and
    /// after edits made through the inspector.
    fn on_change(_world: &mut World, _entity: EntityId, _prop: &'static PropAttribs) {}
}

/// A reflected component with a stable name, usable in scenes, blueprints,
/// undo history and the inspector.
pub trait SceneComponent: Component + Props + ReadWrite + Inspect + Clone + Default {
    /// Stable type name written as the `_type` tag.
    const NAME: &'static str;
}

/// Implement [`SceneComponent`] (and, by default, an empty [`Component`])
/// using the type's own name.
///
/// ```
/// use dream_ecs::prelude::*;
///
/// #[derive(Debug, Clone, Default)]
/// struct Position { x: f32, y: f32 }
/// dream_ecs::reflect!(Position { x, y });
/// dream_ecs::scene_component!(Position);
///
/// assert_eq!(<Position as SceneComponent>::NAME, "Position");
/// ```
///
/// Use `scene_component!(Type with hooks)` when the type has its own
/// `Component` impl.
#[macro_export]
macro_rules! scene_component {
    ($ty:ident) => {
        impl $crate::component::Component for $ty {}
        $crate::scene_component!($ty with hooks);
    };
    ($ty:ident with hooks) => {
        impl $crate::component::SceneComponent for $ty {
            const NAME: &'static str = stringify!($ty);
        }
    };
}

// ---------------------------------------------------------------------------
// ComponentTypeId
// ---------------------------------------------------------------------------

/// Opaque, lightweight identifier for a registered component type. Ids are
/// handed out in registration order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(pub(crate) u32);

impl fmt::Debug for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentTypeId({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// ComponentVtable
// ---------------------------------------------------------------------------

/// Type-erased operations for one registered component type.
#[derive(Clone, Copy)]
pub struct ComponentVtable {
    pub has: fn(&World, EntityId) -> bool,
    /// Detach, firing `on_remove`.
    pub remove: fn(&mut World, EntityId),
    pub add_default: fn(&mut World, EntityId),
    /// Tagged payload of the attached value, if any.
    pub write: fn(&World, EntityId) -> Option<Node>,
    /// Build a default value, read `node` into it and attach it.
    pub read_attach: fn(&mut World, EntityId, &Node),
    pub snapshot: fn(&World, EntityId) -> Option<Box<dyn ComponentSnapshot>>,
    pub snapshot_from_node: fn(&Node) -> Box<dyn ComponentSnapshot>,
    /// Fire `on_change` for every field of the attached value.
    pub notify_all_changed: fn(&mut World, EntityId),
    pub notify_changed: fn(&mut World, EntityId, &'static PropAttribs),
    /// Hand the attached value to `f` as a dynamic field walker.
    pub inspect: fn(&mut World, EntityId, &mut dyn FnMut(&mut dyn DynProps)),
}

impl ComponentVtable {
    pub fn new<T: SceneComponent>() -> Self {
        Self {
            has: |world, entity| world.has::<T>(entity),
            remove: |world, entity| {
                world.remove::<T>(entity);
            },
            add_default: |world, entity| {
                if let Err(err) = world.add(entity, T::default()) {
                    tracing::warn!(component = T::NAME, error = %err, "failed to attach default component");
                }
            },
            write: |world, entity| {
                world
                    .try_get::<T>(entity)
                    .map(|value| write_tagged(T::NAME, value))
            },
            read_attach: |world, entity, node| {
                let mut value = T::default();
                value.read(node);
                if let Err(err) = world.add(entity, value) {
                    tracing::warn!(component = T::NAME, error = %err, "failed to attach component");
                }
            },
            snapshot: |world, entity| {
                world.try_get::<T>(entity).map(|value| {
                    Box::new(TypedSnapshot::new(value.clone())) as Box<dyn ComponentSnapshot>
                })
            },
            snapshot_from_node: |node| {
                let mut value = T::default();
                value.read(node);
                Box::new(TypedSnapshot::new(value))
            },
            notify_all_changed: |world, entity| {
                let Some(value) = world.try_get::<T>(entity) else {
                    return;
                };
                for prop in prop_attribs(value) {
                    T::on_change(world, entity, prop);
                }
            },
            notify_changed: |world, entity, prop| T::on_change(world, entity, prop),
            inspect: |world, entity, f| {
                if let Some(value) = world.try_get_mut::<T>(entity) {
                    f(value);
                }
            },
        }
    }
}

impl fmt::Debug for ComponentVtable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentVtable").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// ComponentInfo
// ---------------------------------------------------------------------------

/// Metadata about a registered component type.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    /// Unique ID assigned at registration time.
    pub id: ComponentTypeId,
    /// Stable name, see [`SceneComponent::NAME`].
    pub name: &'static str,
    /// [`hash`] of `name`.
    pub name_hash: u32,
    /// Rust `TypeId` for runtime type checking.
    pub type_id: TypeId,
    pub vtable: ComponentVtable,
}

// ---------------------------------------------------------------------------
// ComponentRegistry
// ---------------------------------------------------------------------------

/// Registry mapping Rust types to [`ComponentTypeId`]s and their metadata.
///
/// A type can only be registered once; subsequent registrations of the same
/// Rust `TypeId` return the existing [`ComponentTypeId`].
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    /// TypeId -> ComponentTypeId for dedup.
    by_type: HashMap<TypeId, ComponentTypeId>,
    /// Indexed by ComponentTypeId.0, in registration order.
    infos: Vec<ComponentInfo>,
}

impl ComponentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under [`SceneComponent::NAME`].
    ///
    /// # Panics
    ///
    /// Panics if a different type is already registered under the same name.
    pub fn register<T: SceneComponent>(&mut self) -> ComponentTypeId {
        let rust_type_id = TypeId::of::<T>();
        if let Some(&existing) = self.by_type.get(&rust_type_id) {
            return existing;
        }
        if self.lookup_by_name(T::NAME).is_some() {
            panic!(
                "component name '{}' is already registered for a different type",
                T::NAME
            );
        }

        let id = ComponentTypeId(self.infos.len() as u32);
        self.infos.push(ComponentInfo {
            id,
            name: T::NAME,
            name_hash: hash(T::NAME),
            type_id: rust_type_id,
            vtable: ComponentVtable::new::<T>(),
        });
        self.by_type.insert(rust_type_id, id);
        id
    }

    /// Look up a component type by its Rust type.
    pub fn lookup<T: 'static>(&self) -> Option<ComponentTypeId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Metadata for the registered type with the given Rust `TypeId`.
    pub fn info_for_type(&self, type_id: TypeId) -> Option<&ComponentInfo> {
        self.by_type
            .get(&type_id)
            .and_then(|id| self.infos.get(id.0 as usize))
    }

    /// Look up a component type by name, comparing hashes before strings.
    pub fn lookup_by_name(&self, name: &str) -> Option<ComponentTypeId> {
        let name_hash = hash(name);
        self.infos
            .iter()
            .find(|info| info.name_hash == name_hash && info.name == name)
            .map(|info| info.id)
    }

    /// Get the [`ComponentInfo`] for a registered component type ID.
    pub fn get_info(&self, id: ComponentTypeId) -> Option<&ComponentInfo> {
        self.infos.get(id.0 as usize)
    }

    /// All registered types, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentInfo> {
        self.infos.iter()
    }

    /// Total number of registered component types.
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Whether any component types have been registered.
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Names of all registered component types, in registration order.
    pub fn registered_names(&self) -> Vec<&'static str> {
        self.infos.iter().map(|info| info.name).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
