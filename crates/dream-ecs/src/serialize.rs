//! Generic, best-effort serialization to and from JSON trees.
//!
//! Reading never fails: keys that do not match a field and nodes of the wrong
//! shape are skipped, leaving the destination untouched. Writing always
//! produces a node. Aggregates are driven by [`Props`], so a reflected type
//! needs no serialization code of its own.

use crate::entity::EntityId;
use crate::fixed_str::FixedStr;
use crate::math::{Rect, Vec2};
use crate::reflect::{hash, Prop, PropAttribs, PropVisitor, PropVisitorRef, Props};

/// Generic tree node used for every persisted format.
pub use serde_json::Value as Node;

/// Reserved key carrying the type name of a tagged payload.
pub const TYPE_KEY: &str = "_type";

/// Upper bound on serialized text, in bytes.
pub const MAX_TEXT_BYTES: usize = 6 * 1024 * 1024;

/// In-place read and total write against a [`Node`].
pub trait ReadWrite {
    fn read(&mut self, node: &Node);
    fn write(&self) -> Node;
}

// ---------------------------------------------------------------------------
// Scalars
// ---------------------------------------------------------------------------

fn number(value: f64) -> Node {
    serde_json::Number::from_f64(value)
        .map(Node::Number)
        .unwrap_or(Node::Null)
}

impl ReadWrite for i32 {
    fn read(&mut self, node: &Node) {
        if let Some(n) = node.as_i64() {
            *self = n.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
        } else if let Some(n) = node.as_f64() {
            *self = n as i32;
        }
    }

    fn write(&self) -> Node {
        Node::from(*self)
    }
}

impl ReadWrite for f32 {
    fn read(&mut self, node: &Node) {
        if let Some(n) = node.as_f64() {
            *self = n as f32;
        }
    }

    fn write(&self) -> Node {
        number(*self as f64)
    }
}

impl ReadWrite for f64 {
    fn read(&mut self, node: &Node) {
        if let Some(n) = node.as_f64() {
            *self = n;
        }
    }

    fn write(&self) -> Node {
        number(*self)
    }
}

impl ReadWrite for bool {
    fn read(&mut self, node: &Node) {
        if let Some(b) = node.as_bool() {
            *self = b;
        }
    }

    fn write(&self) -> Node {
        Node::Bool(*self)
    }
}

impl ReadWrite for String {
    fn read(&mut self, node: &Node) {
        if let Some(s) = node.as_str() {
            self.clear();
            self.push_str(s);
        }
    }

    fn write(&self) -> Node {
        Node::String(self.clone())
    }
}

impl<const N: usize> ReadWrite for FixedStr<N> {
    fn read(&mut self, node: &Node) {
        if let Some(s) = node.as_str() {
            self.set(s);
        }
    }

    fn write(&self) -> Node {
        Node::String(self.as_str().to_owned())
    }
}

impl ReadWrite for EntityId {
    fn read(&mut self, node: &Node) {
        if let Some(raw) = node.as_u64() {
            *self = EntityId::from_raw(raw);
        }
    }

    fn write(&self) -> Node {
        Node::from(self.to_raw())
    }
}

impl ReadWrite for Node {
    fn read(&mut self, node: &Node) {
        *self = node.clone();
    }

    fn write(&self) -> Node {
        self.clone()
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

impl ReadWrite for Vec2 {
    fn read(&mut self, node: &Node) {
        if let Some([x, y]) = node.as_array().map(Vec::as_slice) {
            self.x.read(x);
            self.y.read(y);
        }
    }

    fn write(&self) -> Node {
        Node::Array(vec![self.x.write(), self.y.write()])
    }
}

impl ReadWrite for Rect {
    fn read(&mut self, node: &Node) {
        if let Some([x, y, w, h]) = node.as_array().map(Vec::as_slice) {
            self.x.read(x);
            self.y.read(y);
            self.width.read(w);
            self.height.read(h);
        }
    }

    fn write(&self) -> Node {
        Node::Array(vec![
            self.x.write(),
            self.y.write(),
            self.width.write(),
            self.height.write(),
        ])
    }
}

// ---------------------------------------------------------------------------
// Sequences
// ---------------------------------------------------------------------------

impl<T: ReadWrite, const N: usize> ReadWrite for [T; N] {
    /// Reads up to `N` elements; extra input is ignored.
    fn read(&mut self, node: &Node) {
        if let Some(items) = node.as_array() {
            for (slot, item) in self.iter_mut().zip(items) {
                slot.read(item);
            }
        }
    }

    fn write(&self) -> Node {
        Node::Array(self.iter().map(ReadWrite::write).collect())
    }
}

impl<T: ReadWrite + Default> ReadWrite for Vec<T> {
    fn read(&mut self, node: &Node) {
        if let Some(items) = node.as_array() {
            *self = items
                .iter()
                .map(|item| {
                    let mut value = T::default();
                    value.read(item);
                    value
                })
                .collect();
        }
    }

    fn write(&self) -> Node {
        Node::Array(self.iter().map(ReadWrite::write).collect())
    }
}

// ---------------------------------------------------------------------------
// Reflected aggregates
// ---------------------------------------------------------------------------

struct ReadField<'n> {
    key: &'n str,
    key_hash: u32,
    node: &'n Node,
}

impl PropVisitor for ReadField<'_> {
    fn visit<P: Prop>(&mut self, attribs: &'static PropAttribs, value: &mut P) {
        if attribs.name_hash == self.key_hash && attribs.name == self.key {
            value.read(self.node);
        }
    }
}

struct WriteFields(serde_json::Map<String, Node>);

impl PropVisitorRef for WriteFields {
    fn visit<P: Prop>(&mut self, attribs: &'static PropAttribs, value: &P) {
        self.0.insert(attribs.name.to_owned(), value.write());
    }
}

/// Read each key of an object node into the field with the same name.
pub fn read_props<T: Props>(value: &mut T, node: &Node) {
    let Some(object) = node.as_object() else {
        return;
    };
    for (key, item) in object {
        value.for_each_prop(&mut ReadField {
            key,
            key_hash: hash(key),
            node: item,
        });
    }
}

/// Write every field of `value` into an object node, in declaration order.
pub fn write_props<T: Props>(value: &T) -> Node {
    let mut fields = WriteFields(serde_json::Map::new());
    value.for_each_prop_ref(&mut fields);
    Node::Object(fields.0)
}

/// Write `value` as an object whose first key is [`TYPE_KEY`].
pub fn write_tagged<T: ReadWrite>(type_name: &str, value: &T) -> Node {
    let mut object = serde_json::Map::new();
    object.insert(TYPE_KEY.to_owned(), Node::String(type_name.to_owned()));
    if let Node::Object(fields) = value.write() {
        for (key, item) in fields {
            if key != TYPE_KEY {
                object.insert(key, item);
            }
        }
    }
    Node::Object(object)
}

/// The type tag of a payload, if present.
pub fn type_tag(node: &Node) -> Option<&str> {
    node.get(TYPE_KEY).and_then(Node::as_str)
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// Parse JSON text, returning [`Node::Null`] on malformed input.
pub fn parse(text: &str) -> Node {
    match serde_json::from_str(text) {
        Ok(node) => node,
        Err(err) => {
            tracing::warn!(error = %err, "failed to parse json");
            Node::Null
        }
    }
}

/// Render a node as JSON text, or an empty string if it exceeds
/// [`MAX_TEXT_BYTES`].
pub fn stringify(node: &Node, pretty: bool) -> String {
    let rendered = if pretty {
        serde_json::to_string_pretty(node)
    } else {
        serde_json::to_string(node)
    };
    match rendered {
        Ok(text) if text.len() <= MAX_TEXT_BYTES => text,
        Ok(text) => {
            tracing::warn!(
                bytes = text.len(),
                limit = MAX_TEXT_BYTES,
                "json text too large"
            );
            String::new()
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to stringify json");
            String::new()
        }
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
    struct Inner {
        a: i32,
        b: String,
    }
    crate::reflect!(Inner { a, b });

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Outer {
        pos: Vec2,
        bounds: Rect,
        slots: [i32; 3],
        items: Vec<Inner>,
        title: FixedStr<8>,
        speed: f64,
        on: bool,
        target: EntityId,
    }
    crate::reflect!(Outer { pos, bounds, slots, items, title, speed, on, target });

    fn sample() -> Outer {
        Outer {
            pos: Vec2::new(1.5, -2.0),
            bounds: Rect::new(0.0, 1.0, 2.0, 3.0),
            slots: [7, 8, 9],
            items: vec![
                Inner {
                    a: 1,
                    b: "x".into(),
                },
                Inner {
                    a: 2,
                    b: "y".into(),
                },
            ],
            title: FixedStr::new("hero"),
            speed: 0.25,
            on: true,
            target: EntityId::new(3, 1),
        }
    }

    #[test]
    fn write_then_read_reproduces_value() {
        let original = sample();
        let mut copy = Outer::default();
        copy.read(&original.write());
        assert_eq!(copy, original);
    }

    #[test]
    fn wire_shapes() {
        let node = sample().write();
        assert_eq!(node["pos"], json!([1.5, -2.0]));
        assert_eq!(node["bounds"], json!([0.0, 1.0, 2.0, 3.0]));
        assert_eq!(node["slots"], json!([7, 8, 9]));
        assert_eq!(node["items"][1], json!({"a": 2, "b": "y"}));
        assert_eq!(node["target"], json!(EntityId::new(3, 1).to_raw()));
        let keys: Vec<&String> = node.as_object().unwrap().keys().collect();
        assert_eq!(keys[0], "pos");
        assert_eq!(keys[7], "target");
    }

    #[test]
    fn unknown_keys_and_bad_shapes_are_ignored() {
        let mut value = sample();
        value.read(&json!({
            "renamed": 5,
            "pos": "not an array",
            "bounds": [1, 2],
            "speed": "fast",
            "on": false,
        }));
        let mut expected = sample();
        expected.on = false;
        assert_eq!(value, expected);

        value.read(&json!(42));
        assert_eq!(value, expected);
    }

    #[test]
    fn fixed_arrays_clamp_to_capacity() {
        let mut slots = [0; 3];
        slots.read(&json!([1, 2, 3, 4, 5]));
        assert_eq!(slots, [1, 2, 3]);
        slots.read(&json!([9]));
        assert_eq!(slots, [9, 2, 3]);
    }

    #[test]
    fn dynamic_sequences_take_input_length() {
        let mut items = vec![1, 2, 3];
        items.read(&json!([4]));
        assert_eq!(items, vec![4]);
    }

    #[test]
    fn fixed_strings_truncate_on_read() {
        let mut title: FixedStr<4> = FixedStr::default();
        title.read(&json!("abcdef"));
        assert_eq!(title, "abc");
    }

    #[test]
    fn integers_accept_float_nodes() {
        let mut n = 0_i32;
        n.read(&json!(3.9));
        assert_eq!(n, 3);
        n.read(&json!(1_i64 << 40));
        assert_eq!(n, i32::MAX);
    }

    #[test]
    fn tagged_payload_puts_type_first() {
        let node = write_tagged("Inner", &Inner { a: 3, b: "z".into() });
        let keys: Vec<&String> = node.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["_type", "a", "b"]);
        assert_eq!(type_tag(&node), Some("Inner"));
    }

    #[test]
    fn positional_tuples_round_trip() {
        let value = (1_i32, String::from("two"), 3.0_f32);
        let node = value.write();
        assert_eq!(node, json!({"0": 1, "1": "two", "2": 3.0}));
        let mut back = (0_i32, String::new(), 0.0_f32);
        back.read(&node);
        assert_eq!(back, value);
    }

    #[test]
    fn parse_failure_yields_null() {
        assert_eq!(parse("{ nope"), Node::Null);
        assert_eq!(parse("[1]"), json!([1]));
    }

    #[test]
    fn stringify_compact_and_pretty() {
        let node = json!({"a": [1, 2]});
        assert_eq!(stringify(&node, false), r#"{"a":[1,2]}"#);
        assert!(stringify(&node, true).contains('\n'));
    }

    #[test]
    fn stringify_refuses_oversized_text() {
        let big = Node::String("x".repeat(MAX_TEXT_BYTES));
        assert_eq!(stringify(&big, false), "");
    }
}
