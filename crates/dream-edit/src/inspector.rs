//! Generated property editors.
//!
//! [`FieldInspector`] walks a reflected value through [`FieldMut`] and emits
//! one editor per field: numeric inputs, toggle buttons, text inputs or asset
//! pickers, number rows for vectors and rectangles, and menu-driven lists
//! for growable sequences. Every edit is written straight into the value and
//! recorded in an [`InspectContext`]; the panel decides afterwards which
//! hooks to fire and which snapshot to save.
//!
//! The panel itself (`Editor::inspector_ui`) shows the first selected entity,
//! one collapsible section per registered component it carries.

use dream_ecs::entity::EntityId;
use dream_ecs::math::Vec2;
use dream_ecs::reflect::{DynProps, FieldMut, PropAttribs, SeqField, TextField};
use dream_ecs::serialize::stringify;
use dream_ecs::world::World;

use crate::assets::AssetStore;
use crate::editor::{ensure_extension, Editor};
use crate::input::{InputFrame, Key, Shortcut};
use crate::selection::{attach, first_selected, EditBox, EditMove};
use crate::state::titleify;
use crate::ui::Ui;

static ROOT_ATTRIBS: PropAttribs = PropAttribs::new("");

// ---------------------------------------------------------------------------
// Number formatting
// ---------------------------------------------------------------------------

/// Four decimals with trailing zeros and a trailing point removed.
pub fn format_double(value: f64) -> String {
    let text = format!("{value:.4}");
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_owned()
    } else {
        text
    }
}

/// The integer at the start of `text`, or 0. Trailing garbage is ignored
/// and out-of-range values saturate.
pub fn parse_leading_int(text: &str) -> i32 {
    let s = text.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = (value * 10 + i64::from(b - b'0')).min(i64::from(i32::MAX) + 1);
    }
    let value = if negative { -value } else { value };
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// The floating-point number at the start of `text`, or 0.
pub fn parse_leading_double(text: &str) -> f64 {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let is_digit = |i: usize| bytes.get(i).is_some_and(u8::is_ascii_digit);

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let mut mantissa_digits = 0;
    while is_digit(end) {
        end += 1;
        mantissa_digits += 1;
    }
    if bytes.get(end) == Some(&b'.') {
        end += 1;
        while is_digit(end) {
            end += 1;
            mantissa_digits += 1;
        }
    }
    if mantissa_digits == 0 {
        return 0.0;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        if is_digit(exp_end) {
            while is_digit(exp_end) {
                exp_end += 1;
            }
            end = exp_end;
        }
    }
    s[..end].parse().unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// AssetBrowser
// ---------------------------------------------------------------------------

/// Modal list of asset files. At most one browser is open at a time; it is
/// anchored to the UI position that opened it.
#[derive(Debug, Default)]
pub struct AssetBrowser {
    active_token: Option<u64>,
    entries: Vec<String>,
}

impl AssetBrowser {
    pub fn is_open(&self) -> bool {
        self.active_token.is_some()
    }

    pub fn close(&mut self) {
        self.active_token = None;
        self.entries.clear();
    }

    /// Describe the browser for the caller at the current UI position.
    ///
    /// `open` (re)opens it here and rescans `assets` for names ending with
    /// `suffix`. Returns the picked name on the frame it is clicked.
    pub fn show(
        &mut self,
        ui: &mut Ui<'_>,
        assets: &AssetStore,
        open: bool,
        suffix: &str,
    ) -> Option<String> {
        let token = ui.token();
        if open {
            self.active_token = Some(token);
            self.entries = assets.list(suffix);
        }
        if self.active_token != Some(token) {
            return None;
        }

        let mut picked = None;
        let dismissed = ui.elem("div").class("asset-browser-background").clicked();
        ui.elem("div").class("asset-browser").children(|ui| {
            ui.elem("div").class("content").children(|ui| {
                for name in &self.entries {
                    let mut cell = ui.keyed("div", name).class("cell");
                    if cell.fired("click") {
                        picked = Some(name.clone());
                    }
                    cell.children(|ui| {
                        if name.ends_with(".png") {
                            ui.elem("div").class("thumbnail-container").children(|ui| {
                                ui.elem("img")
                                    .class("thumbnail checker")
                                    .attr("src", assets.url(name));
                            });
                        }
                        ui.elem("div").class("filename").text(name);
                    });
                }
            });
        });

        if dismissed || picked.is_some() {
            self.close();
        }
        picked
    }
}

// ---------------------------------------------------------------------------
// InspectContext
// ---------------------------------------------------------------------------

/// What one pass over a component changed.
#[derive(Debug)]
pub struct InspectContext {
    pub entity: EntityId,
    pub component_title: String,
    /// Set when any field was edited.
    pub changed: bool,
    /// `change {component} {field}` for the first edited field.
    pub change_description: String,
    /// Top-level fields that were edited, in visit order.
    pub changed_props: Vec<&'static PropAttribs>,
    attribs: &'static PropAttribs,
    depth: usize,
}

impl InspectContext {
    pub fn new(entity: EntityId, component_title: &str) -> Self {
        Self {
            entity,
            component_title: component_title.to_owned(),
            changed: false,
            change_description: String::new(),
            changed_props: Vec::new(),
            attribs: &ROOT_ATTRIBS,
            depth: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// FieldInspector
// ---------------------------------------------------------------------------

/// Renders editors for reflected fields.
pub struct FieldInspector<'a> {
    /// Position of the sequence element whose menu is open.
    menu_token: &'a mut Option<u64>,
    browser: &'a mut AssetBrowser,
    assets: &'a AssetStore,
}

impl<'a> FieldInspector<'a> {
    pub fn new(
        menu_token: &'a mut Option<u64>,
        browser: &'a mut AssetBrowser,
        assets: &'a AssetStore,
    ) -> Self {
        Self {
            menu_token,
            browser,
            assets,
        }
    }

    /// Editors for every field of `props`, in declaration order.
    pub fn props(&mut self, ui: &mut Ui<'_>, ctx: &mut InspectContext, props: &mut dyn DynProps) {
        ui.elem("div").class("props-container").children(|ui| {
            props.visit_fields(&mut |attribs: &'static PropAttribs, field: FieldMut<'_>| {
                self.prop(ui, ctx, attribs, field);
            });
        });
    }

    fn prop(
        &mut self,
        ui: &mut Ui<'_>,
        ctx: &mut InspectContext,
        attribs: &'static PropAttribs,
        field: FieldMut<'_>,
    ) {
        let type_break = matches!(field, FieldMut::Seq(_))
            || (attribs.asset && matches!(field, FieldMut::Text(_)));
        if attribs.break_before || type_break {
            ui.elem("div").class("prop-break");
        }

        let changed_before = ctx.changed;
        ctx.changed = false;
        let saved_attribs = std::mem::replace(&mut ctx.attribs, attribs);
        ui.elem("div").class("prop-container").children(|ui| {
            ui.elem("div").class("prop-name").text(attribs.name);
            ui.elem("div").class("prop-value-container").children(|ui| {
                self.field(ui, ctx, field);
            });
        });
        ctx.attribs = saved_attribs;

        if ctx.changed {
            if ctx.depth == 0 {
                ctx.changed_props.push(attribs);
            }
            if ctx.change_description.is_empty() {
                ctx.change_description = format!("change {} {}", ctx.component_title, attribs.name);
            }
        }
        ctx.changed |= changed_before;

        if attribs.break_after || type_break {
            ui.elem("div").class("prop-break");
        }
    }

    /// Editor for a single value.
    pub fn field(&mut self, ui: &mut Ui<'_>, ctx: &mut InspectContext, field: FieldMut<'_>) {
        match field {
            FieldMut::Int(value) => int_input(ui, ctx, value),
            FieldMut::Float(value) => float_input(ui, ctx, value),
            FieldMut::Double(value) => double_input(ui, ctx, value),
            FieldMut::Bool(value) => {
                let class = if *value { "on" } else { "off" };
                if ui.elem("button").class(class).clicked() {
                    *value = !*value;
                    ctx.changed = true;
                }
            }
            FieldMut::Text(text) if ctx.attribs.asset => self.asset_picker(ui, ctx, text),
            FieldMut::Text(text) => {
                let tag = if ctx.attribs.multiline { "textarea" } else { "input" };
                let mut input = ui.elem(tag).attr("value", text.text());
                if let Some(new_text) = input.changed() {
                    if new_text != text.text() {
                        text.set_text(&new_text);
                        ctx.changed = true;
                    }
                }
            }
            FieldMut::Vec2(value) => vec2_row(ui, ctx, value),
            FieldMut::Rect(rect) => {
                ui.elem("div").class("numbers-row").children(|ui| {
                    ui.elem("div").class("numbers-row").children(|ui| {
                        float_input(ui, ctx, &mut rect.x);
                        float_input(ui, ctx, &mut rect.y);
                    });
                    ui.elem("div").class("numbers-row").children(|ui| {
                        float_input(ui, ctx, &mut rect.width);
                        float_input(ui, ctx, &mut rect.height);
                    });
                });
            }
            FieldMut::Entity(entity) => {
                ui.elem("div").class("entity-ref").text(&entity.to_string());
            }
            FieldMut::Array(items) => {
                for index in 0..items.len() {
                    ui.elem("div").class("array-elem").children(|ui| {
                        self.field(ui, ctx, items.element(index));
                    });
                }
            }
            FieldMut::Seq(items) => self.seq(ui, ctx, items),
            FieldMut::Props(props) => {
                ctx.depth += 1;
                self.props(ui, ctx, props);
                ctx.depth -= 1;
            }
            FieldMut::Opaque => {}
        }
    }

    fn asset_picker(
        &mut self,
        ui: &mut Ui<'_>,
        ctx: &mut InspectContext,
        text: &mut dyn TextField,
    ) {
        let current = text.text().to_owned();
        if current.ends_with(".png") {
            let src = self.assets.url(&current);
            ui.elem("div").children(|ui| {
                ui.elem("img").class("asset-preview checker").attr("src", src);
            });
        }
        let open = ui
            .elem("button")
            .class("show-asset-browser")
            .attr("label", &current)
            .clicked();
        let suffix = if ctx.attribs.image {
            ".png"
        } else if ctx.attribs.shader {
            ".frag"
        } else {
            ""
        };
        if let Some(name) = self.browser.show(ui, self.assets, open, suffix) {
            if name != current {
                text.set_text(&name);
                ctx.changed = true;
            }
        }
    }

    fn seq(&mut self, ui: &mut Ui<'_>, ctx: &mut InspectContext, items: &mut dyn SeqField) {
        let len = items.len();
        let mut remove = None;
        let mut swap = None;
        let mut insert = None;

        for index in 0..len {
            ui.elem("div").class("seq-elem-container").children(|ui| {
                let token = ui.token();
                let mut open_menu = false;
                ui.elem("div").children(|ui| {
                    open_menu = ui.elem("button").class("show-seq-elem-menu").clicked();
                });
                if open_menu {
                    *self.menu_token = Some(token);
                }
                let menu_open = *self.menu_token == Some(token);

                ui.elem("div").class("seq-elem-menu-anchor").children(|ui| {
                    self.field(ui, ctx, items.element(index));
                    if !menu_open {
                        return;
                    }
                    if ui.elem("div").class("seq-elem-menu-background").clicked() {
                        *self.menu_token = None;
                    }
                    ui.elem("div").class("seq-elem-menu-container").children(|ui| {
                        if menu_button(ui, "remove", "remove item") {
                            remove = Some(index);
                        }
                        if index > 0 && menu_button(ui, "up", "move up") {
                            swap = Some((index, index - 1));
                        }
                        if index + 1 < len && menu_button(ui, "down", "move down") {
                            swap = Some((index, index + 1));
                        }
                        if menu_button(ui, "add", "add before") {
                            insert = Some(index);
                        }
                    });
                });
            });
        }

        if remove.is_some() || swap.is_some() || insert.is_some() {
            if let Some(index) = remove {
                items.remove(index);
            }
            if let Some((a, b)) = swap {
                items.swap(a, b);
            }
            if let Some(index) = insert {
                items.insert_default(index);
            }
            ctx.changed = true;
            *self.menu_token = None;
        }

        ui.elem("div").class("seq-elem-container").children(|ui| {
            ui.elem("div").children(|ui| {
                ui.elem("button")
                    .class("show-seq-elem-menu")
                    .flag("disabled", true);
            });
            if ui.elem("button").class("add-seq-elem").clicked() {
                items.push_default();
                ctx.changed = true;
            }
        });
    }
}

fn menu_button(ui: &mut Ui<'_>, class: &str, label: &str) -> bool {
    ui.elem("button").class(class).attr("label", label).clicked()
}

fn int_input(ui: &mut Ui<'_>, ctx: &mut InspectContext, value: &mut i32) {
    let mut input = ui
        .elem("input")
        .attr("type", "number")
        .attr("step", "any")
        .attr("value", *value);
    if let Some(text) = input.changed() {
        let parsed = parse_leading_int(&text);
        if parsed != *value {
            *value = parsed;
            ctx.changed = true;
        }
        input.set_value(&value.to_string());
    }
}

fn double_input(ui: &mut Ui<'_>, ctx: &mut InspectContext, value: &mut f64) {
    let mut input = ui
        .elem("input")
        .attr("type", "number")
        .attr("step", "any")
        .attr("value", format_double(*value));
    if let Some(text) = input.changed() {
        let parsed = parse_leading_double(&text);
        if parsed != *value {
            *value = parsed;
            ctx.changed = true;
        }
        input.set_value(&format_double(*value));
    }
}

/// Like [`double_input`], but compares after narrowing so re-entering the
/// displayed value is not a change.
fn float_input(ui: &mut Ui<'_>, ctx: &mut InspectContext, value: &mut f32) {
    let mut input = ui
        .elem("input")
        .attr("type", "number")
        .attr("step", "any")
        .attr("value", format_double(f64::from(*value)));
    if let Some(text) = input.changed() {
        let parsed = parse_leading_double(&text) as f32;
        if parsed != *value {
            *value = parsed;
            ctx.changed = true;
        }
        input.set_value(&format_double(f64::from(*value)));
    }
}

fn vec2_row(ui: &mut Ui<'_>, ctx: &mut InspectContext, value: &mut Vec2) {
    ui.elem("div").class("numbers-row").children(|ui| {
        float_input(ui, ctx, &mut value.x);
        float_input(ui, ctx, &mut value.y);
    });
}

// ---------------------------------------------------------------------------
// Entity panel
// ---------------------------------------------------------------------------

enum PanelAction {
    ToggleSection(String),
    Remove(String, fn(&mut World, EntityId)),
    Add(String, fn(&mut World, EntityId)),
}

impl Editor {
    /// Inspector for the first selected entity.
    pub(crate) fn inspector_ui(&mut self, ui: &mut Ui<'_>, world: &mut World, input: &InputFrame) {
        let Some(entity) = first_selected(world) else {
            return;
        };
        let components: Vec<_> = world
            .registry()
            .iter()
            .map(|info| (titleify(info.name), info.vtable))
            .collect();
        let mut actions = Vec::new();

        for (title, vtable) in &components {
            if !(vtable.has)(world, entity) {
                continue;
            }
            let open = self.state.inspected_component_title == title.as_str();
            let mut ctx = InspectContext::new(entity, title);

            ui.keyed("details", title)
                .class(title)
                .flag("open", open)
                .children(|ui| {
                    let mut summary = ui.elem("summary");
                    if summary.fired("click") {
                        actions.push(PanelAction::ToggleSection(title.clone()));
                    }
                    summary.children(|ui| {
                        ui.text(title);
                        if ui.elem("button").class("remove").clicked() {
                            actions.push(PanelAction::Remove(title.clone(), vtable.remove));
                        }
                    });
                    ui.elem("div").class("component-container").children(|ui| {
                        let mut inspector = FieldInspector::new(
                            &mut self.seq_menu_token,
                            &mut self.browser,
                            &self.assets,
                        );
                        (vtable.inspect)(world, entity, &mut |props: &mut dyn DynProps| {
                            inspector.props(ui, &mut ctx, props);
                        });
                    });
                });

            if ctx.changed {
                for &prop in &ctx.changed_props {
                    (vtable.notify_changed)(world, entity, prop);
                }
                let description = if ctx.change_description.is_empty() {
                    format!("edit {title}")
                } else {
                    ctx.change_description
                };
                self.save_snapshot(world, &description, true);
            }
        }

        ui.elem("div").class("button-bar").children(|ui| {
            for (title, vtable) in &components {
                if (vtable.has)(world, entity) {
                    continue;
                }
                if ui.elem("button").class("add").attr("label", title).clicked() {
                    actions.push(PanelAction::Add(title.clone(), vtable.add_default));
                }
            }
        });

        let shortcut = Shortcut::with(Key::Control, Key::Char('b'));
        let mut save_clicked = false;
        ui.elem("div").class("button-bar").children(|ui| {
            save_clicked = ui
                .elem("button")
                .class("save")
                .attr("label", "save blueprint")
                .attr("title", "ctrl+b")
                .clicked();
        });
        if save_clicked || (!ui.is_keyboard_captured() && shortcut.triggered(input)) {
            self.save_blueprint(world, entity);
        }

        for action in actions {
            match action {
                PanelAction::ToggleSection(title) => {
                    if self.state.inspected_component_title == title.as_str() {
                        self.state.inspected_component_title.clear();
                    } else {
                        self.state.inspected_component_title.set(&title);
                    }
                }
                PanelAction::Remove(title, remove) => {
                    remove(world, entity);
                    self.save_snapshot(world, &format!("remove {title}"), true);
                }
                PanelAction::Add(title, add_default) => {
                    add_default(world, entity);
                    self.state.inspected_component_title.set(&title);
                    self.save_snapshot(world, &format!("add {title}"), true);
                }
            }
        }
    }

    /// Prompt for a name and write `entity` as a blueprint centred on its
    /// edit box.
    pub fn save_blueprint(&mut self, world: &mut World, entity: EntityId) -> bool {
        let Some(name) = self.dialogs.prompt_save_asset(None, "bp") else {
            return false;
        };
        let name = ensure_extension(name, "bp");
        let center = world
            .try_get::<EditBox>(entity)
            .map_or(Vec2::ZERO, |edit_box| edit_box.rect.center());

        attach(world, entity, EditMove { delta: -center });
        self.apply_moves(world);
        let text = stringify(&world.write_blueprint(entity, false), true);
        attach(world, entity, EditMove { delta: center });
        self.apply_moves(world);

        let saved = self.assets.write_contents(&name, &text);
        if saved {
            self.notify(&format!("saved {name}"));
        }
        saved
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
