//! Field-level reflection.
//!
//! A reflected type enumerates its fields, in declaration order, as
//! `(attribs, &mut field)` pairs through a [`PropVisitor`]. The visitor method
//! is generic over the field type, so each call is statically dispatched and
//! costs no more than the field access itself. Serialization, snapshots and
//! the editor inspector are all built on this single walk.
//!
//! Types opt in in one of two ways:
//!
//! - **Explicit registration** with [`reflect!`](crate::reflect!), which names
//!   each field and optionally attaches [`PropAttribs`] flags.
//! - **Structural fallback**: plain tuples of up to 24 reflected values
//!   implement [`Props`] with positional names `"0"`, `"1"`, ... and default
//!   attributes. Larger tuples do not implement the trait, so misuse is a
//!   compile error.
//!
//! # Quick Start
//!
//! ```
//! use dream_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! struct Sprite {
//!     image: String,
//!     tint: f32,
//! }
//! dream_ecs::reflect!(Sprite { image: asset image, tint });
//!
//! let mut names = Vec::new();
//! for attribs in prop_attribs(&Sprite::default()) {
//!     names.push((attribs.name, attribs.asset));
//! }
//! assert_eq!(names, vec![("image", true), ("tint", false)]);
//! ```

use crate::entity::EntityId;
use crate::fixed_str::FixedStr;
use crate::math::{Rect, Vec2};
use crate::serialize::{read_props, write_props, Node, ReadWrite};

// ---------------------------------------------------------------------------
// Name hashing
// ---------------------------------------------------------------------------

/// 32-bit FNV-1a hash, evaluated at compile time for field and type names.
pub const fn hash(s: &str) -> u32 {
    let bytes = s.as_bytes();
    let mut h: u32 = 0x811c_9dc5;
    let mut i = 0;
    while i < bytes.len() {
        h ^= bytes[i] as u32;
        h = h.wrapping_mul(0x0100_0193);
        i += 1;
    }
    h
}

// ---------------------------------------------------------------------------
// PropAttribs
// ---------------------------------------------------------------------------

/// Static descriptor of a reflected field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropAttribs {
    pub name: &'static str,
    pub name_hash: u32,
    /// Force a layout break before the field in generated UI.
    pub break_before: bool,
    /// Force a layout break after the field in generated UI.
    pub break_after: bool,
    /// Edit as multi-line text.
    pub multiline: bool,
    /// The string names an asset.
    pub asset: bool,
    /// The asset is an image.
    pub image: bool,
    /// The asset is a shader.
    pub shader: bool,
}

impl PropAttribs {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            name_hash: hash(name),
            break_before: false,
            break_after: false,
            multiline: false,
            asset: false,
            image: false,
            shader: false,
        }
    }

    pub const fn break_before(mut self) -> Self {
        self.break_before = true;
        self
    }

    pub const fn break_after(mut self) -> Self {
        self.break_after = true;
        self
    }

    pub const fn multiline(mut self) -> Self {
        self.multiline = true;
        self
    }

    pub const fn asset(mut self) -> Self {
        self.asset = true;
        self
    }

    pub const fn image(mut self) -> Self {
        self.asset = true;
        self.image = true;
        self
    }

    pub const fn shader(mut self) -> Self {
        self.asset = true;
        self.shader = true;
        self
    }
}

/// Attributes used for positional (tuple) fields.
pub static POSITIONAL: [PropAttribs; 24] = [
    PropAttribs::new("0"),
    PropAttribs::new("1"),
    PropAttribs::new("2"),
    PropAttribs::new("3"),
    PropAttribs::new("4"),
    PropAttribs::new("5"),
    PropAttribs::new("6"),
    PropAttribs::new("7"),
    PropAttribs::new("8"),
    PropAttribs::new("9"),
    PropAttribs::new("10"),
    PropAttribs::new("11"),
    PropAttribs::new("12"),
    PropAttribs::new("13"),
    PropAttribs::new("14"),
    PropAttribs::new("15"),
    PropAttribs::new("16"),
    PropAttribs::new("17"),
    PropAttribs::new("18"),
    PropAttribs::new("19"),
    PropAttribs::new("20"),
    PropAttribs::new("21"),
    PropAttribs::new("22"),
    PropAttribs::new("23"),
];

// ---------------------------------------------------------------------------
// Visiting
// ---------------------------------------------------------------------------

/// Anything that can appear as a reflected field.
pub trait Prop: ReadWrite + Inspect + 'static {}

impl<T: ReadWrite + Inspect + 'static> Prop for T {}

/// Receives mutable field references.
pub trait PropVisitor {
    fn visit<P: Prop>(&mut self, attribs: &'static PropAttribs, value: &mut P);
}

/// Receives shared field references.
pub trait PropVisitorRef {
    fn visit<P: Prop>(&mut self, attribs: &'static PropAttribs, value: &P);
}

/// A type whose fields can be enumerated.
pub trait Props: 'static {
    fn for_each_prop<V: PropVisitor>(&mut self, visitor: &mut V);
    fn for_each_prop_ref<V: PropVisitorRef>(&self, visitor: &mut V);
}

/// Collect the attributes of every field of `value`, in declaration order.
pub fn prop_attribs<T: Props>(value: &T) -> Vec<&'static PropAttribs> {
    struct Collect(Vec<&'static PropAttribs>);
    impl PropVisitorRef for Collect {
        fn visit<P: Prop>(&mut self, attribs: &'static PropAttribs, _value: &P) {
            self.0.push(attribs);
        }
    }
    let mut collect = Collect(Vec::new());
    value.for_each_prop_ref(&mut collect);
    collect.0
}

// ---------------------------------------------------------------------------
// Dynamic field view
// ---------------------------------------------------------------------------

/// A mutable, dynamically typed view of one field, used where the concrete
/// type is erased (the editor inspector).
pub enum FieldMut<'a> {
    Int(&'a mut i32),
    Float(&'a mut f32),
    Double(&'a mut f64),
    Bool(&'a mut bool),
    Text(&'a mut dyn TextField),
    Vec2(&'a mut Vec2),
    Rect(&'a mut Rect),
    Entity(&'a mut EntityId),
    /// Fixed-length sequence.
    Array(&'a mut dyn SeqField),
    /// Growable sequence.
    Seq(&'a mut dyn SeqField),
    Props(&'a mut dyn DynProps),
    /// Not editable through the dynamic view.
    Opaque,
}

/// Produces the dynamic view of a value.
pub trait Inspect {
    fn field_mut(&mut self) -> FieldMut<'_>;
}

pub trait TextField {
    fn text(&self) -> &str;
    fn set_text(&mut self, text: &str);
}

impl TextField for String {
    fn text(&self) -> &str {
        self
    }

    fn set_text(&mut self, text: &str) {
        self.clear();
        self.push_str(text);
    }
}

impl<const N: usize> TextField for FixedStr<N> {
    fn text(&self) -> &str {
        self.as_str()
    }

    fn set_text(&mut self, text: &str) {
        self.set(text);
    }
}

/// Element access for sequences. Structural edits are no-ops on fixed arrays.
pub trait SeqField {
    fn len(&self) -> usize;
    fn element(&mut self, index: usize) -> FieldMut<'_>;
    fn remove(&mut self, index: usize);
    fn swap(&mut self, a: usize, b: usize);
    fn insert_default(&mut self, index: usize);
    fn push_default(&mut self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Prop + Default> SeqField for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn element(&mut self, index: usize) -> FieldMut<'_> {
        self[index].field_mut()
    }

    fn remove(&mut self, index: usize) {
        if index < Vec::len(self) {
            Vec::remove(self, index);
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a < Vec::len(self) && b < Vec::len(self) {
            <[T]>::swap(self, a, b);
        }
    }

    fn insert_default(&mut self, index: usize) {
        let index = index.min(Vec::len(self));
        Vec::insert(self, index, T::default());
    }

    fn push_default(&mut self) {
        self.push(T::default());
    }
}

impl<T: Prop, const N: usize> SeqField for [T; N] {
    fn len(&self) -> usize {
        N
    }

    fn element(&mut self, index: usize) -> FieldMut<'_> {
        self[index].field_mut()
    }

    fn remove(&mut self, _index: usize) {}

    fn swap(&mut self, a: usize, b: usize) {
        if a < N && b < N {
            <[T]>::swap(self, a, b);
        }
    }

    fn insert_default(&mut self, _index: usize) {}

    fn push_default(&mut self) {}
}

/// Object-safe field walk over a [`Props`] value.
pub trait DynProps {
    fn visit_fields(&mut self, f: &mut dyn FnMut(&'static PropAttribs, FieldMut<'_>));
}

struct FieldAdapter<'f>(&'f mut dyn FnMut(&'static PropAttribs, FieldMut<'_>));

impl PropVisitor for FieldAdapter<'_> {
    fn visit<P: Prop>(&mut self, attribs: &'static PropAttribs, value: &mut P) {
        (self.0)(attribs, value.field_mut());
    }
}

impl<T: Props> DynProps for T {
    fn visit_fields(&mut self, f: &mut dyn FnMut(&'static PropAttribs, FieldMut<'_>)) {
        self.for_each_prop(&mut FieldAdapter(f));
    }
}

// ---------------------------------------------------------------------------
// Leaf impls
// ---------------------------------------------------------------------------

macro_rules! impl_inspect {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Inspect for $ty {
                fn field_mut(&mut self) -> FieldMut<'_> {
                    FieldMut::$variant(self)
                }
            }
        )*
    };
}

impl_inspect! {
    i32 => Int,
    f32 => Float,
    f64 => Double,
    bool => Bool,
    String => Text,
    Vec2 => Vec2,
    Rect => Rect,
    EntityId => Entity,
}

impl<const N: usize> Inspect for FixedStr<N> {
    fn field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::Text(self)
    }
}

impl<T: Prop, const N: usize> Inspect for [T; N] {
    fn field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::Array(self)
    }
}

impl<T: Prop + Default> Inspect for Vec<T> {
    fn field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::Seq(self)
    }
}

impl Inspect for Node {
    fn field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::Opaque
    }
}

// ---------------------------------------------------------------------------
// Explicit registration
// ---------------------------------------------------------------------------

/// Implement [`Props`], [`ReadWrite`] and [`Inspect`] for a struct by listing
/// its reflected fields.
///
/// Named fields may carry attribute flags after a colon, named after the
/// [`PropAttribs`] builder methods:
///
/// ```
/// #[derive(Debug, Clone, Default)]
/// struct Label {
///     text: String,
///     font: String,
///     size: f32,
/// }
/// dream_ecs::reflect!(Label { text: multiline break_after, font: asset, size });
///
/// #[derive(Debug, Clone, Default)]
/// struct Health(i32);
/// dream_ecs::reflect!(Health(0));
/// ```
#[macro_export]
macro_rules! reflect {
    ($ty:ident { $($field:ident $(: $($flag:ident)+)?),* $(,)? }) => {
        impl $crate::reflect::Props for $ty {
            #[allow(unused_variables)]
            fn for_each_prop<V: $crate::reflect::PropVisitor>(&mut self, visitor: &mut V) {
                $({
                    static ATTRIBS: $crate::reflect::PropAttribs =
                        $crate::reflect::PropAttribs::new(stringify!($field)) $($(.$flag())+)?;
                    visitor.visit(&ATTRIBS, &mut self.$field);
                })*
            }

            #[allow(unused_variables)]
            fn for_each_prop_ref<V: $crate::reflect::PropVisitorRef>(&self, visitor: &mut V) {
                $({
                    static ATTRIBS: $crate::reflect::PropAttribs =
                        $crate::reflect::PropAttribs::new(stringify!($field)) $($(.$flag())+)?;
                    visitor.visit(&ATTRIBS, &self.$field);
                })*
            }
        }
        $crate::reflect!(@common $ty);
    };
    ($ty:ident ( $($idx:tt $(: $($flag:ident)+)?),* $(,)? )) => {
        impl $crate::reflect::Props for $ty {
            #[allow(unused_variables)]
            fn for_each_prop<V: $crate::reflect::PropVisitor>(&mut self, visitor: &mut V) {
                $({
                    static ATTRIBS: $crate::reflect::PropAttribs =
                        $crate::reflect::PropAttribs::new(stringify!($idx)) $($(.$flag())+)?;
                    visitor.visit(&ATTRIBS, &mut self.$idx);
                })*
            }

            #[allow(unused_variables)]
            fn for_each_prop_ref<V: $crate::reflect::PropVisitorRef>(&self, visitor: &mut V) {
                $({
                    static ATTRIBS: $crate::reflect::PropAttribs =
                        $crate::reflect::PropAttribs::new(stringify!($idx)) $($(.$flag())+)?;
                    visitor.visit(&ATTRIBS, &self.$idx);
                })*
            }
        }
        $crate::reflect!(@common $ty);
    };
    (@common $ty:ident) => {
        impl $crate::serialize::ReadWrite for $ty {
            fn read(&mut self, node: &$crate::serialize::Node) {
                $crate::serialize::read_props(self, node);
            }

            fn write(&self) -> $crate::serialize::Node {
                $crate::serialize::write_props(self)
            }
        }

        impl $crate::reflect::Inspect for $ty {
            fn field_mut(&mut self) -> $crate::reflect::FieldMut<'_> {
                $crate::reflect::FieldMut::Props(self)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Structural fallback
// ---------------------------------------------------------------------------

macro_rules! impl_tuple_props {
    ($($idx:tt $T:ident),+) => {
        impl<$($T: Prop),+> Props for ($($T,)+) {
            fn for_each_prop<V: PropVisitor>(&mut self, visitor: &mut V) {
                $( visitor.visit(&POSITIONAL[$idx], &mut self.$idx); )+
            }

            fn for_each_prop_ref<V: PropVisitorRef>(&self, visitor: &mut V) {
                $( visitor.visit(&POSITIONAL[$idx], &self.$idx); )+
            }
        }

        impl<$($T: Prop),+> ReadWrite for ($($T,)+) {
            fn read(&mut self, node: &Node) {
                read_props(self, node);
            }

            fn write(&self) -> Node {
                write_props(self)
            }
        }

        impl<$($T: Prop),+> Inspect for ($($T,)+) {
            fn field_mut(&mut self) -> FieldMut<'_> {
                FieldMut::Props(self)
            }
        }
    };
}

impl_tuple_props!(0 T0);
impl_tuple_props!(0 T0, 1 T1);
impl_tuple_props!(0 T0, 1 T1, 2 T2);
impl_tuple_props!(0 T0, 1 T1, 2 T2, 3 T3);
impl_tuple_props!(0 T0, 1 T1, 2 T2, 3 T3, 4 T4);
impl_tuple_props!(0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5);
impl_tuple_props!(0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6);
impl_tuple_props!(0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7);
impl_tuple_props!(0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7, 8 T8);
impl_tuple_props!(0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7, 8 T8, 9 T9);
impl_tuple_props!(0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7, 8 T8, 9 T9, 10 T10);
impl_tuple_props!(0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7, 8 T8, 9 T9, 10 T10, 11 T11);
impl_tuple_props!(0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7, 8 T8, 9 T9, 10 T10, 11 T11, 12 T12);
impl_tuple_props!(0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7, 8 T8, 9 T9, 10 T10, 11 T11, 12 T12, 13 T13);
impl_tuple_props!(0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7, 8 T8, 9 T9, 10 T10, 11 T11, 12 T12, 13 T13, 14 T14);
impl_tuple_props!(0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7, 8 T8, 9 T9, 10 T10, 11 T11, 12 T12, 13 T13, 14 T14, 15 T15);
impl_tuple_props!(0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7, 8 T8, 9 T9, 10 T10, 11 T11, 12 T12, 13 T13, 14 T14, 15 T15, 16 T16);
impl_tuple_props!(0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7, 8 T8, 9 T9, 10 T10, 11 T11, 12 T12, 13 T13, 14 T14, 15 T15, 16 T16, 17 T17);
impl_tuple_props!(0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7, 8 T8, 9 T9, 10 T10, 11 T11, 12 T12, 13 T13, 14 T14, 15 T15, 16 T16, 17 T17, 18 T18);
impl_tuple_props!(0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7, 8 T8, 9 T9, 10 T10, 11 T11, 12 T12, 13 T13, 14 T14, 15 T15, 16 T16, 17 T17, 18 T18, 19 T19);
impl_tuple_props!(0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7, 8 T8, 9 T9, 10 T10, 11 T11, 12 T12, 13 T13, 14 T14, 15 T15, 16 T16, 17 T17, 18 T18, 19 T19, 20 T20);
impl_tuple_props!(0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7, 8 T8, 9 T9, 10 T10, 11 T11, 12 T12, 13 T13, 14 T14, 15 T15, 16 T16, 17 T17, 18 T18, 19 T19, 20 T20, 21 T21);
impl_tuple_props!(0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7, 8 T8, 9 T9, 10 T10, 11 T11, 12 T12, 13 T13, 14 T14, 15 T15, 16 T16, 17 T17, 18 T18, 19 T19, 20 T20, 21 T21, 22 T22);
impl_tuple_props!(0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7, 8 T8, 9 T9, 10 T10, 11 T11, 12 T12, 13 T13, 14 T14, 15 T15, 16 T16, 17 T17, 18 T18, 19 T19, 20 T20, 21 T21, 22 T22, 23 T23);

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
