//! Session persistence across reloads.
//!
//! A session bundles the scene, the reflected edit state, the full undo
//! history and the selection. It is stored as a single blob under
//! [`EditorConfig::session_key`](crate::config::EditorConfig::session_key):
//!
//! ```json
//! {"checksum": "<blake3 hex>", "session": "<session JSON text>"}
//! ```
//!
//! The checksum covers the session text exactly as stored. Loading consumes
//! the blob, so a session is restored at most once.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use dream_ecs::entity::EntityId;
use dream_ecs::serialize::{parse, stringify, Node, ReadWrite};
use dream_ecs::world::World;

use crate::editor::Editor;
use crate::history::EditHistory;
use crate::selection::{load_selection, save_selection};
use crate::state::EditState;

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

/// String key-value storage that outlives the process.
pub trait SessionStore {
    fn get(&self, key: &str) -> Option<String>;
    /// Store `value` under `key`. An empty value clears the key.
    fn set(&mut self, key: &str, value: &str);
}

#[derive(Debug, Default, Clone)]
pub struct MemorySessionStore {
    entries: HashMap<String, String>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        if value.is_empty() {
            self.entries.remove(key);
        } else {
            self.entries.insert(key.to_owned(), value.to_owned());
        }
    }
}

/// One `{key}.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Option<String> {
        match fs::read_to_string(self.path(key)) {
            Ok(text) => Some(text),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                tracing::warn!(key, error = %err, "failed to read session");
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) {
        let path = self.path(key);
        let result = if value.is_empty() {
            match fs::remove_file(&path) {
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
                other => other,
            }
        } else {
            fs::create_dir_all(&self.dir).and_then(|()| fs::write(&path, value))
        };
        if let Err(err) = result {
            tracing::warn!(key, path = %path.display(), error = %err, "failed to write session");
        }
    }
}

fn checksum(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

// ---------------------------------------------------------------------------
// Save / load
// ---------------------------------------------------------------------------

impl Editor {
    /// Store the whole editing session.
    pub fn save_session(&mut self, world: &World, store: &mut dyn SessionStore) -> bool {
        let mut session = serde_json::Map::new();
        session.insert("scene".to_owned(), world.write_scene());
        session.insert("edit".to_owned(), self.state.write());
        session.insert("history".to_owned(), self.history.write());
        session.insert("selection".to_owned(), save_selection(world).write());
        let text = stringify(&Node::Object(session), false);
        if text.is_empty() {
            return false;
        }

        let blob = serde_json::json!({
            "checksum": checksum(&text),
            "session": text,
        });
        let blob = stringify(&blob, false);
        if blob.is_empty() {
            return false;
        }
        store.set(&self.config.session_key, &blob);
        tracing::debug!(bytes = blob.len(), "saved edit session");
        self.notify("saved session");
        true
    }

    /// Restore a session saved by [`save_session`](Self::save_session) and
    /// clear it from the store.
    ///
    /// Returns `false`, leaving the world untouched, when there is no
    /// session or its checksum does not match.
    pub fn load_session(&mut self, world: &mut World, store: &mut dyn SessionStore) -> bool {
        let key = self.config.session_key.clone();
        let blob = store.get(&key).unwrap_or_default();
        store.set(&key, "");
        if blob.is_empty() {
            return false;
        }

        let blob = parse(&blob);
        let stored_checksum = blob.get("checksum").and_then(Node::as_str);
        let Some(text) = blob.get("session").and_then(Node::as_str) else {
            tracing::warn!(key, "session blob has no payload");
            return false;
        };
        if stored_checksum != Some(checksum(text).as_str()) {
            tracing::warn!(key, "session checksum mismatch, discarding");
            return false;
        }
        let session = parse(text);

        world.clear_entities();
        let entities = session
            .get("scene")
            .map_or(0, |scene| world.read_scene(scene).len());

        let mut state = EditState::default();
        if let Some(edit) = session.get("edit") {
            state.read(edit);
        }
        self.state = state;

        self.history = session
            .get("history")
            .map(|history| EditHistory::read(world, history))
            .unwrap_or_default();
        self.history.rebase_times();

        let mut selection: Vec<EntityId> = Vec::new();
        if let Some(node) = session.get("selection") {
            selection.read(node);
        }
        load_selection(world, &selection);

        tracing::debug!(entities, snapshots = self.history.len(), "restored edit session");
        self.notify("restored session");
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
