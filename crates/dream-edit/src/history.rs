//! Undo/redo over whole-world snapshots.
//!
//! [`EditHistory`] is a fixed ring of [`MAX_SNAPSHOTS`] slots with a cursor
//! at the current state. Saving advances the cursor and overwrites whatever
//! the next slot held, so the oldest states are evicted silently. Undo and
//! redo availability is decided only by the slots adjacent to the cursor:
//! a neighbour is usable when it is valid and its timestamp lies on the
//! correct side of the current slot's. That local check is what stops undo
//! at the oldest retained state once the ring has wrapped.
//!
//! Snapshots are type-erased component copies, so restoring never goes
//! through the text format.

use dream_ecs::entity::EntityId;
use dream_ecs::fixed_str::FixedStr;
use dream_ecs::serialize::{Node, ReadWrite};
use dream_ecs::snapshot::WorldSnapshot;
use dream_ecs::world::World;

use crate::selection::{load_selection, save_selection, EditDelete};

/// Number of slots in the ring.
pub const MAX_SNAPSHOTS: usize = 50;

// ---------------------------------------------------------------------------
// SceneSnapshot
// ---------------------------------------------------------------------------

/// One slot of the ring.
#[derive(Debug, Clone, Default)]
pub struct SceneSnapshot {
    pub valid: bool,
    pub time: f64,
    pub description: FixedStr<64>,
    /// Inspector section to reopen when stepping to this state. Empty when
    /// the edit did not come from the inspector.
    pub inspected_component_title: FixedStr<64>,
    pub world: WorldSnapshot,
    pub selection: Vec<EntityId>,
}

impl SceneSnapshot {
    fn write(&self) -> Node {
        let mut object = serde_json::Map::new();
        object.insert("valid".to_owned(), self.valid.write());
        object.insert("time".to_owned(), self.time.write());
        object.insert("description".to_owned(), self.description.write());
        object.insert(
            "inspected_component_title".to_owned(),
            self.inspected_component_title.write(),
        );
        object.insert(
            "entities".to_owned(),
            Node::Array(self.world.entities.iter().map(|e| e.write()).collect()),
        );
        object.insert("selection".to_owned(), self.selection.write());
        Node::Object(object)
    }

    fn read(world: &World, node: &Node) -> Self {
        let mut snapshot = SceneSnapshot::default();
        read_key(node, "valid", &mut snapshot.valid);
        read_key(node, "time", &mut snapshot.time);
        read_key(node, "description", &mut snapshot.description);
        read_key(
            node,
            "inspected_component_title",
            &mut snapshot.inspected_component_title,
        );
        read_key(node, "selection", &mut snapshot.selection);
        if let Some(entities) = node.get("entities").and_then(Node::as_array) {
            snapshot.world.entities = entities
                .iter()
                .map(|item| world.read_entity_snapshot(item))
                .collect();
        }
        snapshot
    }
}

fn read_key(node: &Node, key: &str, field: &mut dyn ReadWrite) {
    if let Some(item) = node.get(key) {
        field.read(item);
    }
}

// ---------------------------------------------------------------------------
// HistoryStep
// ---------------------------------------------------------------------------

/// What an undo or redo stepped over.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryStep {
    /// Description of the edit, when the undone or redone slot was valid.
    pub description: Option<String>,
    /// Inspector title recorded with that edit, if any.
    pub inspected_component_title: Option<String>,
}

impl HistoryStep {
    fn from_slot(slot: &SceneSnapshot) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_owned());
        Self {
            description: Some(slot.description.as_str().to_owned()),
            inspected_component_title: non_empty(slot.inspected_component_title.as_str()),
        }
    }
}

// ---------------------------------------------------------------------------
// EditHistory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EditHistory {
    snapshots: Vec<SceneSnapshot>,
    last_index: usize,
    /// Selection at the moment play started, restored on stop.
    stop_selection: Vec<EntityId>,
}

impl Default for EditHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl EditHistory {
    pub fn new() -> Self {
        Self {
            snapshots: vec![SceneSnapshot::default(); MAX_SNAPSHOTS],
            last_index: 0,
            stop_selection: Vec::new(),
        }
    }

    fn prev_index(&self) -> usize {
        (self.last_index + MAX_SNAPSHOTS - 1) % MAX_SNAPSHOTS
    }

    fn next_index(&self) -> usize {
        (self.last_index + 1) % MAX_SNAPSHOTS
    }

    /// The slot at the cursor.
    pub fn current(&self) -> &SceneSnapshot {
        &self.snapshots[self.last_index]
    }

    pub fn cursor(&self) -> usize {
        self.last_index
    }

    /// Number of valid slots.
    pub fn len(&self) -> usize {
        self.snapshots.iter().filter(|s| s.valid).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Advance the cursor and capture every live entity not marked
    /// [`EditDelete`], plus the selection.
    pub fn save(
        &mut self,
        world: &World,
        time: f64,
        description: &str,
        inspected_component_title: Option<&str>,
    ) {
        self.last_index = self.next_index();
        let snapshot = &mut self.snapshots[self.last_index];
        *snapshot = SceneSnapshot {
            valid: true,
            time,
            description: FixedStr::new(description),
            inspected_component_title: FixedStr::new(inspected_component_title.unwrap_or("")),
            world: world.capture_snapshot_filtered(|world, entity| !world.has::<EditDelete>(entity)),
            selection: save_selection(world),
        };
        tracing::debug!(
            slot = self.last_index,
            description,
            entities = snapshot.world.len(),
            "saved edit snapshot"
        );
    }

    pub fn can_undo(&self) -> bool {
        let curr = &self.snapshots[self.last_index];
        let prev = &self.snapshots[self.prev_index()];
        prev.valid && (!curr.valid || prev.time <= curr.time)
    }

    pub fn can_redo(&self) -> bool {
        let curr = &self.snapshots[self.last_index];
        let next = &self.snapshots[self.next_index()];
        next.valid && (!curr.valid || next.time >= curr.time)
    }

    /// Step back: rebuild the world from the previous slot, then restore the
    /// selection that was current when the undone edit was saved.
    ///
    /// Returns `None` when there is nothing to undo. The step's description
    /// is `None` when the slot being left was never filled.
    pub fn undo(&mut self, world: &mut World) -> Option<HistoryStep> {
        if !self.can_undo() {
            return None;
        }
        let undone = self.last_index;
        self.last_index = self.prev_index();
        self.load_current(world);

        let curr = &self.snapshots[undone];
        if !curr.valid {
            return Some(HistoryStep::default());
        }
        load_selection(world, &curr.selection);
        tracing::debug!(description = %curr.description, "undid edit");
        Some(HistoryStep::from_slot(curr))
    }

    /// Step forward to the next slot's world and selection.
    pub fn redo(&mut self, world: &mut World) -> Option<HistoryStep> {
        if !self.can_redo() {
            return None;
        }
        self.last_index = self.next_index();
        self.load_current(world);

        let next = &self.snapshots[self.last_index];
        load_selection(world, &next.selection);
        tracing::debug!(description = %next.description, "redid edit");
        Some(HistoryStep::from_slot(next))
    }

    /// Rebuild the world from the slot at the cursor. Does nothing if the
    /// slot is empty.
    pub fn load_current(&self, world: &mut World) -> bool {
        let snapshot = &self.snapshots[self.last_index];
        if !snapshot.valid {
            return false;
        }
        world.restore_snapshot(&snapshot.world);
        true
    }

    /// Drop every slot and start a new chain.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn set_stop_selection(&mut self, selection: Vec<EntityId>) {
        self.stop_selection = selection;
    }

    pub fn stop_selection(&self) -> &[EntityId] {
        &self.stop_selection
    }

    /// Shift every timestamp so the newest slot sits at `-1`, keeping all of
    /// them below any time a fresh clock will report.
    pub fn rebase_times(&mut self) {
        let max_time = self
            .snapshots
            .iter()
            .filter(|s| s.valid)
            .map(|s| s.time)
            .fold(f64::NEG_INFINITY, f64::max);
        if !max_time.is_finite() {
            return;
        }
        for snapshot in &mut self.snapshots {
            snapshot.time -= max_time + 1.0;
        }
    }

    // -- persistence --------------------------------------------------------

    pub fn write(&self) -> Node {
        let mut object = serde_json::Map::new();
        object.insert(
            "snapshots".to_owned(),
            Node::Array(self.snapshots.iter().map(SceneSnapshot::write).collect()),
        );
        object.insert("last_index".to_owned(), (self.last_index as i32).write());
        object.insert("stop_selection".to_owned(), self.stop_selection.write());
        Node::Object(object)
    }

    /// Rebuild a history from [`write`](Self::write) output. Component
    /// payloads are matched against the types registered in `world`; extra
    /// slots are ignored and missing ones stay empty.
    pub fn read(world: &World, node: &Node) -> Self {
        let mut history = Self::new();
        if let Some(slots) = node.get("snapshots").and_then(Node::as_array) {
            for (slot, item) in history.snapshots.iter_mut().zip(slots) {
                *slot = SceneSnapshot::read(world, item);
            }
        }
        let mut last_index = 0i32;
        read_key(node, "last_index", &mut last_index);
        history.last_index = usize::try_from(last_index).unwrap_or(0) % MAX_SNAPSHOTS;
        read_key(node, "stop_selection", &mut history.stop_selection);
        history
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
