//! Query filters and pool access helpers for multi-component iteration.
//!
//! Typed iteration lives on [`World`] (`each`, `each2`, `each3`). Those hand
//! out `&mut` borrows into several pools at once, which requires borrowing
//! distinct pools simultaneously; [`disjoint_pools`] does that without
//! unsafe code and rejects a query that lists the same type twice.
//!
//! [`QueryFilter`] describes a component set for
//! [`World::each_entity`], the variant whose callback receives the whole
//! world and may destroy or detach as it goes.

use crate::entity::EntityId;
use crate::pool::{AnyPool, ComponentPool};
use crate::world::World;

/// A set of component types that an entity must all carry.
///
/// The first type is the *primary* type: iteration walks its pool.
pub trait QueryFilter {
    type Primary: 'static;

    fn matches(world: &World, entity: EntityId) -> bool;
}

macro_rules! impl_query_filter {
    ($first:ident $(, $rest:ident)*) => {
        impl<$first: 'static $(, $rest: 'static)*> QueryFilter for ($first, $($rest,)*) {
            type Primary = $first;

            fn matches(world: &World, entity: EntityId) -> bool {
                world.has::<$first>(entity) $(&& world.has::<$rest>(entity))*
            }
        }
    };
}

impl_query_filter!(A);
impl_query_filter!(A, B);
impl_query_filter!(A, B, C);
impl_query_filter!(A, B, C, D);

/// Borrow `N` distinct pools mutably at once.
///
/// # Panics
///
/// Panics if `indices` contains the same pool twice.
pub(crate) fn disjoint_pools<const N: usize>(
    pools: &mut [Box<dyn AnyPool>],
    indices: [usize; N],
) -> [&mut Box<dyn AnyPool>; N] {
    let mut picked: [Option<&mut Box<dyn AnyPool>>; N] = std::array::from_fn(|_| None);
    for (index, pool) in pools.iter_mut().enumerate() {
        if let Some(slot) = indices.iter().position(|&wanted| wanted == index) {
            picked[slot] = Some(pool);
        }
    }
    picked.map(|pool| match pool {
        Some(pool) => pool,
        None => panic!("query lists the same component type more than once"),
    })
}

/// Typed view of an erased pool.
pub(crate) fn typed<T: 'static>(pool: &mut Box<dyn AnyPool>) -> Option<&mut ComponentPool<T>> {
    (**pool).as_any_mut().downcast_mut::<ComponentPool<T>>()
}
