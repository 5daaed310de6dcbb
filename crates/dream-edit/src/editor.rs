//! The editing session.
//!
//! [`Editor`] ties the edit state, undo history, asset store and generated
//! UI together. The game plugs in through [`GameEditHooks`]: it applies
//! pending moves to its own transforms, reports clickable bounds and checks
//! world invariants before each snapshot.
//!
//! A frame in edit mode is:
//!
//! 1. [`Editor::update`] with the frame's input (camera, picking, dragging),
//! 2. [`Editor::ui`] to describe the toolbar, inspector and status bar.
//!
//! # Quick Start
//!
//! ```
//! use dream_ecs::prelude::*;
//! use dream_edit::prelude::*;
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! struct Position { x: f32, y: f32 }
//! dream_ecs::reflect!(Position { x, y });
//! dream_ecs::scene_component!(Position);
//!
//! let mut world = World::new();
//! world.register_component::<Position>();
//! let mut editor = Editor::new(EditorConfig::default()).with_clock(ManualClock::stepping(0.0, 1.0));
//!
//! let e = world.create();
//! world.add(e, Position { x: 1.0, y: 2.0 }).unwrap();
//! editor.save_snapshot(&mut world, "create", false);
//! world.get_mut::<Position>(e).x = 5.0;
//! editor.save_snapshot(&mut world, "nudge", false);
//!
//! assert!(editor.undo(&mut world));
//! assert_eq!(world.get::<Position>(e).x, 1.0);
//! assert_eq!(editor.state().notification, "undid nudge");
//! ```

use dream_ecs::entity::EntityId;
use dream_ecs::fixed_str::FixedStr;
use dream_ecs::math::Vec2;
use dream_ecs::serialize::{parse, stringify};
use dream_ecs::world::World;

use crate::assets::AssetStore;
use crate::clock::{Clock, SystemClock};
use crate::config::EditorConfig;
use crate::history::EditHistory;
use crate::input::{InputFrame, Key, MouseButton};
use crate::inspector::AssetBrowser;
use crate::selection::{
    attach, has_selection, load_selection, pick_at, save_selection, select, EditBox, EditDelete,
    EditMove, EditSelect,
};
use crate::state::{mode, EditState};
use crate::ui::{Dialogs, NoDialogs, Ui};

// ---------------------------------------------------------------------------
// GameEditHooks
// ---------------------------------------------------------------------------

/// Game-side callbacks. Every method defaults to doing nothing.
pub trait GameEditHooks {
    /// Apply every pending [`EditMove`] to the game's transforms. The editor
    /// clears the moves afterwards.
    fn apply_moves(&mut self, _world: &mut World) {}

    /// Rebuild edit boxes, usually with
    /// [`merge_edit_box`](crate::selection::merge_edit_box).
    fn merge_boxes(&mut self, _world: &mut World) {}

    /// Game-specific editor input.
    fn input(&mut self, _world: &mut World, _input: &InputFrame) {}

    /// Restore world invariants before a snapshot is taken.
    fn validate(&mut self, _world: &mut World) {}
}

/// Hooks for a game with nothing to contribute.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGameHooks;

impl GameEditHooks for NoGameHooks {}

// ---------------------------------------------------------------------------
// Editor
// ---------------------------------------------------------------------------

pub struct Editor {
    pub(crate) config: EditorConfig,
    pub(crate) state: EditState,
    pub(crate) history: EditHistory,
    pub(crate) assets: AssetStore,
    clock: Box<dyn Clock>,
    hooks: Box<dyn GameEditHooks>,
    pub(crate) dialogs: Box<dyn Dialogs>,
    pub(crate) browser: AssetBrowser,
    pub(crate) seq_menu_token: Option<u64>,
    pan_prev_mode: FixedStr<16>,
    wheel_accum: f32,
    move_needs_snapshot: bool,
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        let state = EditState {
            enabled: config.start_enabled,
            ..EditState::default()
        };
        Self {
            assets: AssetStore::from_config(&config),
            state,
            history: EditHistory::new(),
            clock: Box::new(SystemClock::new()),
            hooks: Box::new(NoGameHooks),
            dialogs: Box::new(NoDialogs),
            browser: AssetBrowser::default(),
            seq_menu_token: None,
            pan_prev_mode: FixedStr::new(mode::SELECT),
            wheel_accum: 0.0,
            move_needs_snapshot: false,
            config,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_hooks(mut self, hooks: impl GameEditHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn with_dialogs(mut self, dialogs: impl Dialogs + 'static) -> Self {
        self.dialogs = Box::new(dialogs);
        self
    }

    pub fn with_assets(mut self, assets: AssetStore) -> Self {
        self.assets = assets;
        self
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut EditState {
        &mut self.state
    }

    pub fn history(&self) -> &EditHistory {
        &self.history
    }

    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    // -- notifications and modes --------------------------------------------

    /// Show `message` in the status bar.
    pub fn notify(&mut self, message: &str) {
        tracing::debug!(message, "edit notification");
        self.state.notification.set(message);
        self.state.last_notification_time = self.clock.now();
    }

    pub fn set_mode(&mut self, new_mode: &str) {
        self.state.mode.set(new_mode);
    }

    pub fn is_mode(&self, query: &str) -> bool {
        self.state.mode == query
    }

    /// Camera scale relative to the base zoom.
    pub fn zoom_factor(&self) -> f32 {
        self.config.zoom_step.powf(self.state.zoom_level)
    }

    pub fn set_zoom_level(&mut self, level: f32) {
        self.state.zoom_level = level;
        let step = f64::from(self.config.zoom_step);
        let message = if level == 0.0 {
            "zoomed 1x".to_owned()
        } else if level > 0.0 {
            format!("zoomed in {}x", format_significant(step.powf(f64::from(level))))
        } else {
            format!("zoomed out {}x", format_significant(1.0 / step.powf(f64::from(level))))
        };
        self.notify(&message);
    }

    // -- history ------------------------------------------------------------

    /// Record the world as a new undo step. Does nothing while playing.
    ///
    /// With `save_title`, the inspector section that is currently open is
    /// reopened when stepping back to this state.
    pub fn save_snapshot(&mut self, world: &mut World, description: &str, save_title: bool) {
        if !self.state.enabled {
            return;
        }
        self.hooks.validate(world);
        self.state.notification.clear();
        let title = save_title.then(|| self.state.inspected_component_title.as_str());
        self.history.save(world, self.clock.now(), description, title);
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self, world: &mut World) -> bool {
        let Some(step) = self.history.undo(world) else {
            self.notify("cannot undo");
            return false;
        };
        if let Some(title) = &step.inspected_component_title {
            self.state.inspected_component_title.set(title);
        }
        if let Some(description) = &step.description {
            self.notify(&format!("undid {description}"));
        }
        true
    }

    pub fn redo(&mut self, world: &mut World) -> bool {
        let Some(step) = self.history.redo(world) else {
            self.notify("cannot redo");
            return false;
        };
        if let Some(title) = &step.inspected_component_title {
            self.state.inspected_component_title.set(title);
        }
        if let Some(description) = &step.description {
            self.notify(&format!("redid {description}"));
        }
        true
    }

    // -- play / stop ----------------------------------------------------------

    /// Leave edit mode, remembering the selection.
    pub fn play(&mut self, world: &World) {
        if !self.state.enabled {
            return;
        }
        self.history.set_stop_selection(save_selection(world));
        self.state.enabled = false;
        self.state.notification.clear();
    }

    /// Return to edit mode: the world is reset to the current snapshot and
    /// the selection from before play is restored.
    pub fn stop(&mut self, world: &mut World) {
        if self.state.enabled {
            return;
        }
        self.state.enabled = true;
        self.history.load_current(world);
        load_selection(world, self.history.stop_selection());
        self.state.notification.clear();
    }

    // -- scenes and blueprints ------------------------------------------------

    /// Replace the world with the scene asset `name` and start a new undo
    /// chain. On a read failure the world is left untouched.
    pub fn open_scene(&mut self, world: &mut World, name: &str) -> bool {
        let text = match self.assets.read(name) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(scene = name, error = %err, "failed to open scene");
                self.notify(&format!("failed to open {name}"));
                return false;
            }
        };
        world.clear_entities();
        self.history.reset();
        let entities = world.read_scene(&parse(&text));
        tracing::debug!(scene = name, entities = entities.len(), "opened scene");
        self.save_snapshot(world, "load scene", false);
        self.state.camera.target = Vec2::ZERO;
        self.state.scene_name.set(name);
        true
    }

    pub fn save_scene(&mut self, world: &World, name: &str) -> bool {
        let text = stringify(&world.write_scene(), true);
        if !self.assets.write_contents(name, &text) {
            self.notify(&format!("failed to save {name}"));
            return false;
        }
        self.state.scene_name.set(name);
        self.notify(&format!("saved {name}"));
        true
    }

    /// Instantiate the blueprint asset `name` at the camera target and make
    /// it the selection.
    pub fn add_blueprint(&mut self, world: &mut World, name: &str) -> Option<EntityId> {
        let text = match self.assets.read(name) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(blueprint = name, error = %err, "failed to add blueprint");
                self.notify(&format!("failed to add {name}"));
                return None;
            }
        };
        world.clear_component::<EditSelect>();
        let entity = world.read_blueprint(&parse(&text));
        select(world, entity);
        attach(
            world,
            entity,
            EditMove {
                delta: self.state.camera.target,
            },
        );
        self.apply_moves(world);
        self.save_snapshot(world, "add", false);
        Some(entity)
    }

    // -- selection edits ------------------------------------------------------

    /// Copy every selected entity, shifted by the duplicate offset. The
    /// copies become the selection.
    pub fn duplicate_selection(&mut self, world: &mut World) -> Vec<EntityId> {
        let originals = save_selection(world);
        let mut copies = Vec::with_capacity(originals.len());
        for original in originals {
            let blueprint = world.write_blueprint(original, false);
            let copy = world.read_blueprint(&blueprint);
            world.remove::<EditSelect>(original);
            select(world, copy);
            attach(
                world,
                copy,
                EditMove {
                    delta: self.config.duplicate_offset,
                },
            );
            copies.push(copy);
        }
        if copies.is_empty() {
            return copies;
        }
        self.apply_moves(world);
        self.save_snapshot(world, "duplicate", false);
        copies
    }

    /// Destroy every selected entity, recording the deletion as one step.
    pub fn delete_selection(&mut self, world: &mut World) -> usize {
        let doomed = save_selection(world);
        if doomed.is_empty() {
            return 0;
        }
        for &entity in &doomed {
            attach(world, entity, EditDelete);
        }
        self.save_snapshot(world, "delete", false);
        for &entity in &doomed {
            if let Err(err) = world.destroy(entity) {
                tracing::warn!(%entity, error = %err, "failed to delete entity");
            }
        }
        doomed.len()
    }

    pub fn deselect_all(&mut self, world: &mut World) {
        world.clear_component::<EditSelect>();
        self.set_mode(mode::SELECT);
    }

    /// Let the game apply pending moves, then drop them.
    pub fn apply_moves(&mut self, world: &mut World) {
        self.hooks.apply_moves(world);
        world.clear_component::<EditMove>();
    }

    /// Click-pick at a world position.
    pub fn select_at(&mut self, world: &mut World, point: Vec2, additive: bool) -> Option<EntityId> {
        pick_at(world, point, additive, self.config.max_pick_hits)
    }

    // -- per-frame update -----------------------------------------------------

    /// Handle one frame of input. Does nothing while playing.
    pub fn update(&mut self, world: &mut World, input: &InputFrame) {
        if !self.state.enabled {
            return;
        }

        // Mouse
        let mut prev_screen = self.state.mouse_screen_pos;
        self.state.mouse_screen_pos = input.mouse_position;
        if input.is_mouse_pressed(MouseButton::Left) {
            prev_screen = input.mouse_position;
        }
        let prev_world = self.state.camera.screen_to_world(prev_screen);
        self.state.mouse_world_pos = self.state.camera.screen_to_world(input.mouse_position);
        self.state.mouse_world_delta = self.state.mouse_world_pos - prev_world;

        // Camera pan
        if input.is_mouse_pressed(MouseButton::Middle) {
            self.pan_prev_mode = self.state.mode.clone();
            self.set_mode(mode::CAMERA_PAN);
        }
        if input.is_mouse_released(MouseButton::Middle) {
            self.state.mode = self.pan_prev_mode.clone();
        }
        if self.is_mode(mode::CAMERA_PAN)
            && (input.is_mouse_down(MouseButton::Left) || input.is_mouse_down(MouseButton::Middle))
        {
            let delta = self.state.mouse_world_delta;
            self.state.camera.target = self.state.camera.target - delta;
        }

        // Camera zoom and offset
        self.wheel_accum += input.wheel;
        if self.wheel_accum.abs() > 0.1 {
            let level = if self.wheel_accum < 0.0 {
                self.state.zoom_level + 1.0
            } else {
                self.state.zoom_level - 1.0
            };
            self.set_zoom_level(level);
            self.wheel_accum = 0.0;
        }
        let base_zoom = input.screen_size.x / self.config.game_camera_size.x;
        self.state.camera.zoom = base_zoom * self.zoom_factor();
        self.state.camera.offset = input.screen_size * 0.5;
        self.state.line_thickness = input.pixel_ratio / self.state.camera.zoom;

        // Deselect all
        if !input.keyboard_captured
            && input.is_key_down(Key::Control)
            && input.is_key_released(Key::Char('d'))
        {
            self.deselect_all(world);
        }

        // Select
        if self.is_mode(mode::SELECT) && input.is_mouse_released(MouseButton::Left) {
            let point = self.state.mouse_world_pos;
            self.select_at(world, point, input.is_key_down(Key::Control));
        }

        // Move
        if self.is_mode(mode::MOVE) {
            let delta = self.state.mouse_world_delta;
            if input.is_mouse_down(MouseButton::Left) && delta != Vec2::ZERO {
                for entity in world.entities_with::<EditSelect>() {
                    if world.has::<EditBox>(entity) {
                        attach(world, entity, EditMove { delta });
                    }
                }
                self.apply_moves(world);
                self.move_needs_snapshot = true;
            }
            if input.is_mouse_released(MouseButton::Left) && self.move_needs_snapshot {
                self.save_snapshot(world, "move", false);
                self.move_needs_snapshot = false;
            }
        }

        self.hooks.input(world, input);

        world.clear_component::<EditBox>();
        self.hooks.merge_boxes(world);
    }

    // -- UI -------------------------------------------------------------------

    /// Describe the toolbar, inspector and status bar.
    pub fn ui(&mut self, ui: &mut Ui<'_>, world: &mut World, input: &InputFrame) {
        ui.patch("top", |ui| {
            ui.elem("div").class("toolbar").children(|ui| {
                self.toolbar_ui(ui, world, input);
            });
        });
        ui.patch("side", |ui| {
            ui.elem("div").class("inspector").children(|ui| {
                if self.state.enabled {
                    self.inspector_ui(ui, world, input);
                }
            });
        });
        ui.patch("bottom", |ui| {
            ui.elem("div").class("status").children(|ui| {
                self.status_ui(ui, input);
            });
        });
    }

    pub fn has_selection(&self, world: &World) -> bool {
        has_selection(world)
    }
}

/// Append `.{extension}` unless `name` already ends with it.
pub(crate) fn ensure_extension(name: String, extension: &str) -> String {
    let suffix = format!(".{extension}");
    if name.ends_with(&suffix) {
        name
    } else {
        name + &suffix
    }
}

/// Three significant digits, trailing zeros removed.
pub(crate) fn format_significant(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{value}");
    }
    let digits = value.abs().log10().floor() as i32 + 1;
    let decimals = (3 - digits).max(0) as usize;
    let text = format!("{value:.decimals$}");
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_owned()
    } else {
        text
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::selection::merge_edit_box;
    use dream_ecs::math::Rect;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }
    dream_ecs::reflect!(Position { x, y });
    dream_ecs::scene_component!(Position);

    /// Moves positions and reports 10x10 boxes around them.
    struct BoxHooks;

    impl GameEditHooks for BoxHooks {
        fn apply_moves(&mut self, world: &mut World) {
            world.each2::<EditMove, Position>(|_, edit_move, position| {
                position.x += edit_move.delta.x;
                position.y += edit_move.delta.y;
            });
        }

        fn merge_boxes(&mut self, world: &mut World) {
            for entity in world.entities_with::<Position>() {
                let p = world.get::<Position>(entity).clone();
                merge_edit_box(world, entity, Rect::new(p.x - 5.0, p.y - 5.0, 10.0, 10.0));
            }
        }
    }

    fn setup() -> (World, Editor) {
        let mut world = World::new();
        world.register_component::<Position>();
        let editor = Editor::new(EditorConfig::default())
            .with_clock(ManualClock::stepping(0.0, 1.0))
            .with_hooks(BoxHooks);
        (world, editor)
    }

    #[test]
    fn significant_digits() {
        assert_eq!(format_significant(1.5), "1.5");
        assert_eq!(format_significant(2.25), "2.25");
        assert_eq!(format_significant(1.0), "1");
        assert_eq!(format_significant(0.444444), "0.444");
        assert_eq!(format_significant(1234.0), "1234");
    }

    #[test]
    fn extension_is_appended_once() {
        assert_eq!(ensure_extension("level".to_owned(), "scn"), "level.scn");
        assert_eq!(ensure_extension("level.scn".to_owned(), "scn"), "level.scn");
    }

    #[test]
    fn zoom_notifications() {
        let (_, mut editor) = setup();
        editor.set_zoom_level(0.0);
        assert_eq!(editor.state().notification, "zoomed 1x");
        editor.set_zoom_level(1.0);
        assert_eq!(editor.state().notification, "zoomed in 1.5x");
        editor.set_zoom_level(-2.0);
        assert_eq!(editor.state().notification, "zoomed out 2.25x");
        assert!((editor.zoom_factor() - 1.0 / 2.25).abs() < 1e-6);
    }

    #[test]
    fn undo_without_history_reports() {
        let (mut world, mut editor) = setup();
        assert!(!editor.undo(&mut world));
        assert_eq!(editor.state().notification, "cannot undo");
        assert!(!editor.redo(&mut world));
        assert_eq!(editor.state().notification, "cannot redo");
    }

    #[test]
    fn snapshots_are_skipped_while_playing() {
        let (mut world, mut editor) = setup();
        editor.play(&world);
        editor.save_snapshot(&mut world, "ignored", false);
        assert!(editor.history().is_empty());
    }

    #[test]
    fn stop_restores_world_and_selection() {
        let (mut world, mut editor) = setup();
        let e = world.create();
        world.add(e, Position { x: 1.0, y: 1.0 }).unwrap();
        editor.save_snapshot(&mut world, "start", false);
        select(&mut world, e);

        editor.play(&world);
        world.get_mut::<Position>(e).x = 99.0;
        world.clear_component::<EditSelect>();
        editor.update(&mut world, &InputFrame::default());
        assert_eq!(world.get::<Position>(e).x, 99.0);

        editor.stop(&mut world);
        assert!(editor.state().enabled);
        assert_eq!(world.get::<Position>(e).x, 1.0);
        assert_eq!(save_selection(&world), vec![e]);
    }

    #[test]
    fn click_selects_and_drag_moves() {
        let (mut world, mut editor) = setup();
        let e = world.create();
        world.add(e, Position { x: 480.0, y: 270.0 }).unwrap();
        editor.save_snapshot(&mut world, "start", false);

        // First frame sizes the camera and builds boxes.
        editor.update(&mut world, &InputFrame::default());
        let center = Vec2::new(480.0, 270.0);
        editor.update(&mut world, &InputFrame::default().at(center).release(MouseButton::Left));
        assert_eq!(save_selection(&world), vec![e]);

        editor.set_mode(mode::MOVE);
        editor.update(&mut world, &InputFrame::default().at(center).press(MouseButton::Left));
        let target = center + Vec2::new(10.0, -4.0);
        editor.update(&mut world, &InputFrame::default().at(target).hold(MouseButton::Left));
        assert_eq!(world.get::<Position>(e), &Position { x: 490.0, y: 266.0 });
        editor.update(&mut world, &InputFrame::default().at(target).release(MouseButton::Left));
        assert_eq!(editor.history().current().description, "move");

        assert!(editor.undo(&mut world));
        assert_eq!(world.get::<Position>(e), &Position { x: 480.0, y: 270.0 });
        assert_eq!(editor.state().notification, "undid move");
    }

    #[test]
    fn middle_drag_pans_and_restores_mode() {
        let (mut world, mut editor) = setup();
        editor.update(&mut world, &InputFrame::default().at(Vec2::new(100.0, 100.0)));
        let start = editor.state().camera.target;
        editor.update(
            &mut world,
            &InputFrame::default()
                .at(Vec2::new(100.0, 100.0))
                .press(MouseButton::Middle),
        );
        assert!(editor.is_mode(mode::CAMERA_PAN));
        editor.update(
            &mut world,
            &InputFrame::default()
                .at(Vec2::new(120.0, 100.0))
                .hold(MouseButton::Middle),
        );
        assert!((editor.state().camera.target.x - (start.x - 20.0)).abs() < 1e-3);
        editor.update(&mut world, &InputFrame::default().release(MouseButton::Middle));
        assert!(editor.is_mode(mode::SELECT));
    }

    #[test]
    fn wheel_changes_zoom_level() {
        let (mut world, mut editor) = setup();
        editor.update(&mut world, &InputFrame::default().scroll(-1.0));
        assert_eq!(editor.state().zoom_level, 1.0);
        assert!((editor.state().camera.zoom - 1.5).abs() < 1e-6);
        editor.update(&mut world, &InputFrame::default().scroll(0.05));
        assert_eq!(editor.state().zoom_level, 1.0);
        editor.update(&mut world, &InputFrame::default().scroll(0.1));
        assert_eq!(editor.state().zoom_level, 0.0);
    }

    #[test]
    fn ctrl_d_deselects() {
        let (mut world, mut editor) = setup();
        let e = world.create();
        select(&mut world, e);
        editor.set_mode(mode::MOVE);
        let input = InputFrame::default()
            .key_down(Key::Control)
            .key_released(Key::Char('d'));
        editor.update(&mut world, &input);
        assert!(!has_selection(&world));
        assert!(editor.is_mode(mode::SELECT));
    }

    #[test]
    fn delete_and_duplicate_are_single_steps() {
        let (mut world, mut editor) = setup();
        let e = world.create();
        world.add(e, Position { x: 1.0, y: 2.0 }).unwrap();
        editor.save_snapshot(&mut world, "start", false);
        select(&mut world, e);

        let copies = editor.duplicate_selection(&mut world);
        assert_eq!(copies.len(), 1);
        let copy = copies[0];
        assert_ne!(copy, e);
        assert_eq!(world.get::<Position>(copy), &Position { x: 33.0, y: 34.0 });
        assert_eq!(save_selection(&world), vec![copy]);

        assert_eq!(editor.delete_selection(&mut world), 1);
        assert!(!world.exists(copy));
        assert_eq!(editor.history().current().description, "delete");
        assert!(editor.history().current().world.find(copy).is_none());

        editor.undo(&mut world);
        assert!(world.exists(copy));
        editor.undo(&mut world);
        assert!(!world.exists(copy));
        assert!(world.exists(e));
    }
}
