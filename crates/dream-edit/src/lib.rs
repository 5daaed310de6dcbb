//! Dream Edit -- in-game editor for Dream ECS worlds.
//!
//! The editor runs inside the game. It keeps a 50-step undo history of
//! whole-world snapshots, lets the user pick, move, duplicate and delete
//! entities, and generates an inspector for every registered component from
//! its reflected fields. Scenes and blueprints are read from and written to
//! an asset directory; the whole session can be stashed in a key-value store
//! and restored after a reload.
//!
//! Rendering and windowing stay with the game. The editor consumes one
//! [`InputFrame`](input::InputFrame) per frame and describes its panels
//! through a [`UiBridge`](ui::UiBridge).
//!
//! # Quick Start
//!
//! ```
//! use dream_ecs::prelude::*;
//! use dream_edit::prelude::*;
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! struct Health { points: i32 }
//! dream_ecs::reflect!(Health { points });
//! dream_ecs::scene_component!(Health);
//!
//! let mut world = World::new();
//! world.register_component::<Health>();
//! let hero = world.create();
//! world.add(hero, Health { points: 10 }).unwrap();
//! select(&mut world, hero);
//!
//! let mut editor = Editor::new(EditorConfig::default());
//! editor.save_snapshot(&mut world, "start", false);
//!
//! // Describe the UI once, then type into the generated field.
//! let mut bridge = RecordingBridge::new();
//! let input = InputFrame::default();
//! editor.ui(&mut Ui::new(&mut bridge), &mut world, &input);
//! let points = bridge.find(|e| e.tag == "input").unwrap();
//! bridge.change(points, "25");
//! editor.ui(&mut Ui::new(&mut bridge), &mut world, &input);
//!
//! assert_eq!(world.get::<Health>(hero).points, 25);
//! assert_eq!(editor.history().current().description, "change health points");
//! ```

#![deny(unsafe_code)]

pub mod assets;
pub mod clock;
pub mod config;
pub mod editor;
pub mod history;
pub mod input;
pub mod inspector;
pub mod logging;
pub mod selection;
pub mod session;
pub mod state;
pub mod toolbar;
pub mod ui;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors surfaced by editor setup. Per-frame operations log and carry on
/// instead.
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error(transparent)]
    Asset(#[from] assets::AssetError),

    /// A configuration document could not be parsed.
    #[error("invalid editor config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::assets::{AssetError, AssetStore};
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::config::EditorConfig;
    pub use crate::editor::{Editor, GameEditHooks, NoGameHooks};
    pub use crate::history::{EditHistory, HistoryStep, SceneSnapshot, MAX_SNAPSHOTS};
    pub use crate::input::{InputFrame, Key, MouseButton, Shortcut};
    pub use crate::inspector::{AssetBrowser, FieldInspector, InspectContext};
    pub use crate::selection::{
        first_selected, has_selection, load_selection, merge_edit_box, pick_at, save_selection,
        select, EditBox, EditDelete, EditMove, EditSelect,
    };
    pub use crate::session::{FileSessionStore, MemorySessionStore, SessionStore};
    pub use crate::state::{mode, titleify, Camera2D, EditState};
    pub use crate::ui::{Dialogs, NoDialogs, RecordingBridge, ScriptedDialogs, Ui, UiBridge};
    pub use crate::EditError;
}
