//! The [`World`] is the top-level container for the ECS. It owns the entity
//! allocator, the component registry, and one sparse-set pool per component
//! type.
//!
//! Pools are created lazily the first time a type is attached. Each new pool
//! also appends a *remover* to the world; [`World::destroy`] runs every
//! remover, in pool creation order, before freeing the entity's slot.

use std::any::TypeId;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::component::{Component, ComponentRegistry, ComponentTypeId, SceneComponent};
use crate::entity::{EntityAllocator, EntityId};
use crate::pool::{AnyPool, ComponentPool};
use crate::query::{disjoint_pools, typed, QueryFilter};
use crate::EcsError;

type Remover = fn(&mut World, EntityId);

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// A group of components attached together by [`World::create_with`].
pub trait Bundle {
    fn attach(self, world: &mut World, entity: EntityId);
}

macro_rules! impl_bundle {
    ($($T:ident $v:ident),+) => {
        impl<$($T: Component),+> Bundle for ($($T,)+) {
            fn attach(self, world: &mut World, entity: EntityId) {
                let ($($v,)+) = self;
                $(
                    if let Err(err) = world.add(entity, $v) {
                        tracing::warn!(error = %err, "failed to attach bundle component");
                    }
                )+
            }
        }
    };
}

impl_bundle!(A a);
impl_bundle!(A a, B b);
impl_bundle!(A a, B b, C c);
impl_bundle!(A a, B b, C c, D d);
impl_bundle!(A a, B b, C c, D d, E e);
impl_bundle!(A a, B b, C c, D d, E e, F f);

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Central ECS container.
///
/// There is one world per simulation; it is passed explicitly to everything
/// that reads or mutates entities.
#[derive(Default)]
pub struct World {
    allocator: EntityAllocator,
    registry: ComponentRegistry,
    pools: Vec<Box<dyn AnyPool>>,
    pool_index: HashMap<TypeId, usize>,
    removers: Vec<Remover>,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entity_count", &self.allocator.alive_count())
            .field("pool_count", &self.pools.len())
            .field("registered", &self.registry.registered_names())
            .finish()
    }
}

impl World {
    /// Create a new, empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only access to the component registry.
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Register a scene component type so that it takes part in scenes,
    /// snapshots and the inspector. Registration order is the order in which
    /// those walk component types.
    pub fn register_component<T: SceneComponent>(&mut self) -> ComponentTypeId {
        self.ensure_pool::<T>();
        self.registry.register::<T>()
    }

    // -- pools --------------------------------------------------------------

    fn pool_id<T: 'static>(&self) -> Option<usize> {
        self.pool_index.get(&TypeId::of::<T>()).copied()
    }

    fn ensure_pool<T: Component>(&mut self) -> usize {
        if let Some(idx) = self.pool_id::<T>() {
            return idx;
        }
        let idx = self.pools.len();
        self.pools.push(Box::new(ComponentPool::<T>::new()));
        self.pool_index.insert(TypeId::of::<T>(), idx);
        self.removers.push(|world, entity| {
            world.remove::<T>(entity);
        });
        tracing::trace!(component = std::any::type_name::<T>(), "created component pool");
        idx
    }

    /// The pool for `T`, if any value of `T` was ever attached.
    pub fn pool<T: 'static>(&self) -> Option<&ComponentPool<T>> {
        let idx = self.pool_id::<T>()?;
        self.pools[idx].as_any().downcast_ref()
    }

    fn pool_mut<T: 'static>(&mut self) -> Option<&mut ComponentPool<T>> {
        let idx = self.pool_id::<T>()?;
        typed(&mut self.pools[idx])
    }

    // -- entity lifecycle ---------------------------------------------------

    /// Create an entity with no components.
    pub fn create(&mut self) -> EntityId {
        self.allocator.allocate()
    }

    /// Create an entity reusing the handle `hint` when its slot is free.
    pub fn create_with_hint(&mut self, hint: EntityId) -> EntityId {
        self.allocator.allocate_with_hint(hint)
    }

    /// Create an entity and attach every component in `bundle`.
    pub fn create_with<B: Bundle>(&mut self, bundle: B) -> EntityId {
        let entity = self.create();
        bundle.attach(self, entity);
        entity
    }

    /// Detach every component from `entity` (firing `on_remove` hooks) and
    /// free its slot. The handle becomes stale.
    pub fn destroy(&mut self, entity: EntityId) -> Result<(), EcsError> {
        if !self.exists(entity) {
            return Err(EcsError::StaleEntity { entity });
        }
        for i in 0..self.removers.len() {
            let remover = self.removers[i];
            remover(self, entity);
        }
        self.allocator.deallocate(entity);
        Ok(())
    }

    /// Destroy every live entity.
    pub fn clear_entities(&mut self) {
        while let Some(&entity) = self.allocator.live().last() {
            if self.destroy(entity).is_err() {
                break;
            }
        }
    }

    #[inline]
    pub fn exists(&self, entity: EntityId) -> bool {
        self.allocator.is_alive(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.allocator.alive_count()
    }

    /// Live entities, oldest slot first. Destroying an entity moves the
    /// newest one into its position.
    pub fn entities(&self) -> Vec<EntityId> {
        self.allocator.live().to_vec()
    }

    // -- component access ---------------------------------------------------

    /// Attach `value` to `entity` and return the stored component.
    ///
    /// If the entity already has a `T`, the existing value is returned
    /// unchanged and `value` is dropped. Otherwise `on_add` fires, followed
    /// by `on_change` for every reflected field when `T` is registered.
    ///
    /// # Errors
    ///
    /// [`EcsError::StaleEntity`] if the entity does not exist, and
    /// [`EcsError::MissingComponent`] if a hook removed the new component.
    pub fn add<T: Component>(&mut self, entity: EntityId, value: T) -> Result<&mut T, EcsError> {
        if !self.exists(entity) {
            return Err(EcsError::StaleEntity { entity });
        }
        self.ensure_pool::<T>();
        if !self.has::<T>(entity) {
            if let Some(pool) = self.pool_mut::<T>() {
                pool.insert(entity, value);
            }
            T::on_add(self, entity);
            let notify = self
                .registry
                .info_for_type(TypeId::of::<T>())
                .map(|info| info.vtable.notify_all_changed);
            if let Some(notify) = notify {
                notify(self, entity);
            }
        }
        self.try_get_mut::<T>(entity)
            .ok_or(EcsError::MissingComponent {
                entity,
                component: std::any::type_name::<T>(),
            })
    }

    /// Attach a default `T`. See [`add`](Self::add).
    pub fn add_default<T: Component + Default>(
        &mut self,
        entity: EntityId,
    ) -> Result<&mut T, EcsError> {
        self.add(entity, T::default())
    }

    /// The `T` attached to `entity`.
    ///
    /// # Panics
    ///
    /// Panics if the entity has no `T`. Use [`try_get`](Self::try_get) when
    /// presence has not been established.
    pub fn get<T: 'static>(&self, entity: EntityId) -> &T {
        match self.try_get::<T>(entity) {
            Some(value) => value,
            None => panic!(
                "entity {entity} has no {} component",
                std::any::type_name::<T>()
            ),
        }
    }

    /// Mutable variant of [`get`](Self::get).
    ///
    /// # Panics
    ///
    /// Panics if the entity has no `T`.
    pub fn get_mut<T: 'static>(&mut self, entity: EntityId) -> &mut T {
        match self.try_get_mut::<T>(entity) {
            Some(value) => value,
            None => panic!(
                "entity {entity} has no {} component",
                std::any::type_name::<T>()
            ),
        }
    }

    pub fn try_get<T: 'static>(&self, entity: EntityId) -> Option<&T> {
        self.pool::<T>()?.get(entity)
    }

    pub fn try_get_mut<T: 'static>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.pool_mut::<T>()?.get_mut(entity)
    }

    pub fn has<T: 'static>(&self, entity: EntityId) -> bool {
        self.pool::<T>().is_some_and(|pool| pool.contains(entity))
    }

    /// Detach and return the `T` on `entity`, firing `on_remove` first.
    /// Does nothing if the component is absent.
    pub fn remove<T: Component>(&mut self, entity: EntityId) -> Option<T> {
        if !self.has::<T>(entity) {
            return None;
        }
        T::on_remove(self, entity);
        self.pool_mut::<T>()?.remove(entity)
    }

    /// Detach `T` from every entity.
    pub fn clear_component<T: Component>(&mut self) {
        while let Some(entity) = self.entities_with::<T>().first().copied() {
            if self.remove::<T>(entity).is_none() {
                break;
            }
        }
    }

    /// Reorder the `T` pool so that queries led by `T` visit values in
    /// `compare` order.
    pub fn sort<T: 'static>(&mut self, compare: impl FnMut(&T, &T) -> Ordering) {
        if let Some(pool) = self.pool_mut::<T>() {
            pool.sort_by(compare);
        }
    }

    // -- iteration ----------------------------------------------------------

    /// Entities carrying `T`, in query order (reverse insertion order).
    pub fn entities_with<T: 'static>(&self) -> Vec<EntityId> {
        self.pool::<T>()
            .map(|pool| pool.iter().rev().map(|(entity, _)| entity).collect())
            .unwrap_or_default()
    }

    /// Visit every `A`, newest first.
    pub fn each<A: 'static>(&mut self, mut f: impl FnMut(EntityId, &mut A)) {
        let Some(pool) = self.pool_mut::<A>() else {
            return;
        };
        for i in (0..pool.len()).rev() {
            let (entity, a) = pool.at_mut(i);
            f(entity, a);
        }
    }

    /// Visit every entity carrying both `A` and `B`, walking the `A` pool
    /// newest first.
    ///
    /// # Panics
    ///
    /// Panics if `A` and `B` are the same type.
    pub fn each2<A: 'static, B: 'static>(&mut self, mut f: impl FnMut(EntityId, &mut A, &mut B)) {
        let (Some(ia), Some(ib)) = (self.pool_id::<A>(), self.pool_id::<B>()) else {
            return;
        };
        let [pa, pb] = disjoint_pools(&mut self.pools, [ia, ib]);
        let (Some(pa), Some(pb)) = (typed::<A>(pa), typed::<B>(pb)) else {
            return;
        };
        for i in (0..pa.len()).rev() {
            let (entity, a) = pa.at_mut(i);
            if let Some(b) = pb.get_mut(entity) {
                f(entity, a, b);
            }
        }
    }

    /// Three-component variant of [`each2`](Self::each2).
    ///
    /// # Panics
    ///
    /// Panics if any two of the types are the same.
    pub fn each3<A: 'static, B: 'static, C: 'static>(
        &mut self,
        mut f: impl FnMut(EntityId, &mut A, &mut B, &mut C),
    ) {
        let (Some(ia), Some(ib), Some(ic)) =
            (self.pool_id::<A>(), self.pool_id::<B>(), self.pool_id::<C>())
        else {
            return;
        };
        let [pa, pb, pc] = disjoint_pools(&mut self.pools, [ia, ib, ic]);
        let (Some(pa), Some(pb), Some(pc)) = (typed::<A>(pa), typed::<B>(pb), typed::<C>(pc))
        else {
            return;
        };
        for i in (0..pa.len()).rev() {
            let (entity, a) = pa.at_mut(i);
            if let (Some(b), Some(c)) = (pb.get_mut(entity), pc.get_mut(entity)) {
                f(entity, a, b, c);
            }
        }
    }

    /// Visit every entity matching `Q` with full access to the world.
    ///
    /// Walks the pool of `Q::Primary` from its last element to its first.
    /// The callback may destroy the visited entity or detach its primary
    /// component: swap removal only moves already-visited elements. Adding to
    /// the primary pool, or removing *other* elements from it, can cause
    /// entities to be skipped or visited twice.
    pub fn each_entity<Q: QueryFilter>(&mut self, mut f: impl FnMut(&mut World, EntityId)) {
        let Some(idx) = self.pool_id::<Q::Primary>() else {
            return;
        };
        let mut i = self.pools[idx].len();
        while i > 0 {
            i -= 1;
            if i >= self.pools[idx].len() {
                continue;
            }
            let entity = self.pools[idx].entity_at(i);
            if Q::matches(self, entity) {
                f(self, entity);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
