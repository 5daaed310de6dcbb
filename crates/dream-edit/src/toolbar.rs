//! Toolbar and status bar.

use dream_ecs::world::World;

use crate::editor::{ensure_extension, Editor};
use crate::input::{InputFrame, Key, Shortcut};
use crate::selection::has_selection;
use crate::state::mode;
use crate::ui::Ui;

/// One toolbar button.
struct Tool<'a> {
    class: &'a str,
    title: &'a str,
    shortcut: Shortcut,
    disabled: bool,
    selected: bool,
}

impl<'a> Tool<'a> {
    fn new(class: &'a str, title: &'a str, shortcut: Shortcut) -> Self {
        Self {
            class,
            title,
            shortcut,
            disabled: false,
            selected: false,
        }
    }

    fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// Describe the button; true if it was clicked or its shortcut fired.
    fn show(self, ui: &mut Ui<'_>, input: &InputFrame) -> bool {
        let clicked = ui
            .elem("button")
            .class(self.class)
            .flag("selected", self.selected)
            .flag("disabled", self.disabled)
            .attr("title", self.title)
            .clicked();
        if self.disabled {
            return false;
        }
        let captured = ui.is_keyboard_captured() || input.keyboard_captured;
        clicked || (!captured && self.shortcut.triggered(input))
    }
}

fn gap(ui: &mut Ui<'_>, class: &str) {
    ui.elem("div").class(class);
}

impl Editor {
    pub(crate) fn toolbar_ui(&mut self, ui: &mut Ui<'_>, world: &mut World, input: &InputFrame) {
        let (class, title) = if self.state.enabled {
            ("play", "play game (spacebar)")
        } else {
            ("stop", "stop game (spacebar)")
        };
        if Tool::new(class, title, Shortcut::key(Key::Space)).show(ui, input) {
            if self.state.enabled {
                self.play(world);
            } else {
                self.stop(world);
            }
        }
        if !self.state.enabled {
            return;
        }

        gap(ui, "small-gap");

        let mut blueprint = None;
        ui.elem("div").children(|ui| {
            let open = Tool::new("add-entity", "add (a)", Shortcut::key(Key::Char('a'))).show(ui, input);
            blueprint = self.browser.show(ui, &self.assets, open, ".bp");
        });
        if let Some(name) = blueprint {
            self.add_blueprint(world, &name);
        }

        gap(ui, "flex-gap");

        let selecting = self.is_mode(mode::SELECT);
        if Tool::new("select", "select (s)", Shortcut::key(Key::Char('s')))
            .selected(selecting)
            .show(ui, input)
        {
            self.set_mode(mode::SELECT);
        }

        let selection = has_selection(world);
        if !selection && !self.is_mode(mode::SELECT) && !self.is_mode(mode::CAMERA_PAN) {
            self.set_mode(mode::SELECT);
        }
        if Tool::new("move", "move (g)", Shortcut::key(Key::Char('g')))
            .selected(self.is_mode(mode::MOVE))
            .disabled(!selection)
            .show(ui, input)
        {
            self.set_mode(mode::MOVE);
        }
        if Tool::new(
            "duplicate",
            "duplicate (shift+d)",
            Shortcut::with(Key::Shift, Key::Char('d')),
        )
        .disabled(!selection)
        .show(ui, input)
        {
            self.duplicate_selection(world);
        }
        if Tool::new("delete", "delete (backspace)", Shortcut::key(Key::Backspace))
            .disabled(!selection)
            .show(ui, input)
        {
            self.delete_selection(world);
        }

        gap(ui, "flex-gap");

        if Tool::new("undo", "undo (ctrl+z)", Shortcut::with(Key::Control, Key::Char('z')))
            .disabled(!self.can_undo())
            .show(ui, input)
        {
            self.undo(world);
        }
        if Tool::new("redo", "redo (ctrl+y)", Shortcut::with(Key::Control, Key::Char('y')))
            .disabled(!self.can_redo())
            .show(ui, input)
        {
            self.redo(world);
        }

        if Tool::new("pan", "camera pan (v)", Shortcut::key(Key::Char('v')))
            .selected(self.is_mode(mode::CAMERA_PAN))
            .show(ui, input)
        {
            self.set_mode(mode::CAMERA_PAN);
        }
        if Tool::new("zoom-in", "zoom in (=)", Shortcut::key(Key::Char('='))).show(ui, input) {
            self.set_zoom_level(self.state.zoom_level + 1.0);
        }
        if Tool::new("zoom-out", "zoom out (-)", Shortcut::key(Key::Char('-'))).show(ui, input) {
            self.set_zoom_level(self.state.zoom_level - 1.0);
        }

        let mut scene = None;
        ui.elem("div").children(|ui| {
            let open = Tool::new(
                "open",
                "open scene (ctrl+o)",
                Shortcut::with(Key::Control, Key::Char('o')),
            )
            .show(ui, input);
            scene = self.browser.show(ui, &self.assets, open, ".scn");
        });
        if let Some(name) = scene {
            self.open_scene(world, &name);
        }

        if Tool::new(
            "save",
            "save scene (ctrl+s)",
            Shortcut::with(Key::Control, Key::Char('s')),
        )
        .show(ui, input)
        {
            let default_name = self.state.scene_name.clone();
            let default_name = (!default_name.is_empty()).then(|| default_name.as_str());
            if let Some(name) = self.dialogs.prompt_save_asset(default_name, "scn") {
                let name = ensure_extension(name, "scn");
                self.save_scene(world, &name);
            }
        }
    }

    pub(crate) fn status_ui(&mut self, ui: &mut Ui<'_>, input: &InputFrame) {
        if let Some(fps) = input.fps {
            ui.elem("div").class("fps").text(&format!("fps: {fps}"));
        }
        gap(ui, "flex-gap");
        if !self.state.notification.is_empty() {
            let age = self.now() - self.state.last_notification_time;
            if age < self.config.notification_seconds {
                ui.elem("div")
                    .class("notification")
                    .text(self.state.notification.as_str());
            } else {
                self.state.notification.clear();
            }
        }
        if self.state.enabled {
            gap(ui, "small-gap");
            ui.elem("div").class("mode").text(self.state.mode.as_str());
        }
    }
}
