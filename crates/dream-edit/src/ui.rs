//! Declarative UI over a diff-based element bridge.
//!
//! The editor describes its panels every frame as a sequence of
//! open/attribute/text/close calls on a [`UiBridge`]. The bridge owns the
//! actual widgets and reports user events as counts since the last check,
//! polled on the element that is currently open. [`Ui`] and [`UiElem`] wrap
//! the raw calls so that an element is always closed when its builder is
//! dropped.
//!
//! [`RecordingBridge`] keeps the last described tree in memory and replays
//! queued events into the next frame. It backs headless sessions and tests.
//!
//! # Quick Start
//!
//! ```
//! use dream_edit::ui::{RecordingBridge, Ui};
//!
//! let mut bridge = RecordingBridge::new();
//! let draw = |bridge: &mut RecordingBridge| {
//!     let mut ui = Ui::new(bridge);
//!     let mut clicked = false;
//!     ui.patch("top", |ui| {
//!         clicked = ui.elem("button").class("play").text("play").clicked();
//!     });
//!     clicked
//! };
//!
//! assert!(!draw(&mut bridge));
//! let button = bridge.find_by_class("play").unwrap();
//! bridge.click(button);
//! assert!(draw(&mut bridge));
//! ```

use std::collections::{HashMap, VecDeque};
use std::fmt::Display;

// ---------------------------------------------------------------------------
// UiBridge
// ---------------------------------------------------------------------------

/// The UI-rendering collaborator.
///
/// Calls arrive in document order. Event, value and token queries refer to
/// the innermost element whose open tag has been ended.
pub trait UiBridge {
    /// Begin an element. A key identifies it among its siblings across frames.
    fn open_start(&mut self, tag: &str, key: Option<&str>);
    /// Finish the open tag. Attributes must precede this call.
    fn open_end(&mut self);
    fn close(&mut self, tag: &str);
    fn attr(&mut self, name: &str, value: &str);
    fn class(&mut self, class: &str);
    fn text(&mut self, text: &str);
    /// Occurrences of `event` on the current element since the last query.
    fn event_count(&mut self, event: &str) -> u32;
    /// The current element's value, for inputs.
    fn value(&mut self) -> String;
    fn set_value(&mut self, value: &str);
    /// An identifier for the current position in the tree, stable across
    /// frames that describe the same structure.
    fn token(&mut self) -> u64;
    /// Whether a text field has keyboard focus.
    fn is_keyboard_captured(&self) -> bool;
    /// Start redescribing the region named `id`.
    fn begin_patch(&mut self, id: &str);
    fn end_patch(&mut self);
}

// ---------------------------------------------------------------------------
// Ui / UiElem
// ---------------------------------------------------------------------------

/// Element builder entry point.
pub struct Ui<'b> {
    bridge: &'b mut dyn UiBridge,
}

impl<'b> Ui<'b> {
    pub fn new(bridge: &'b mut dyn UiBridge) -> Self {
        Self { bridge }
    }

    pub fn elem(&mut self, tag: &'static str) -> UiElem<'_, 'b> {
        self.bridge.open_start(tag, None);
        UiElem {
            ui: self,
            tag,
            ended: false,
        }
    }

    pub fn keyed(&mut self, tag: &'static str, key: &str) -> UiElem<'_, 'b> {
        self.bridge.open_start(tag, Some(key));
        UiElem {
            ui: self,
            tag,
            ended: false,
        }
    }

    pub fn text(&mut self, text: &str) {
        self.bridge.text(text);
    }

    pub fn token(&mut self) -> u64 {
        self.bridge.token()
    }

    pub fn is_keyboard_captured(&self) -> bool {
        self.bridge.is_keyboard_captured()
    }

    /// Describe the region `id` with `f`.
    pub fn patch(&mut self, id: &str, f: impl FnOnce(&mut Ui<'b>)) {
        self.bridge.begin_patch(id);
        f(&mut *self);
        self.bridge.end_patch();
    }
}

/// An open element. It is closed when dropped.
///
/// Attribute and class calls must come before anything that ends the open
/// tag ([`text`](Self::text), [`children`](Self::children), event queries).
pub struct UiElem<'u, 'b> {
    ui: &'u mut Ui<'b>,
    tag: &'static str,
    ended: bool,
}

impl<'u, 'b> UiElem<'u, 'b> {
    pub fn class(self, class: &str) -> Self {
        self.ui.bridge.class(class);
        self
    }

    pub fn attr(self, name: &str, value: impl Display) -> Self {
        self.ui.bridge.attr(name, &value.to_string());
        self
    }

    /// An empty attribute, present only when `on`.
    pub fn flag(self, name: &str, on: bool) -> Self {
        if on {
            self.ui.bridge.attr(name, "");
        }
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.end();
        self.ui.bridge.text(text);
        self
    }

    pub fn children(mut self, f: impl FnOnce(&mut Ui<'b>)) -> Self {
        self.end();
        f(&mut *self.ui);
        self
    }

    /// Whether `event` fired on this element since the last frame.
    pub fn fired(&mut self, event: &str) -> bool {
        self.end();
        self.ui.bridge.event_count(event) > 0
    }

    /// Close the element and report whether it was clicked.
    pub fn clicked(mut self) -> bool {
        self.fired("click")
    }

    /// The new value if a `change` event fired.
    pub fn changed(&mut self) -> Option<String> {
        if self.fired("change") {
            Some(self.ui.bridge.value())
        } else {
            None
        }
    }

    pub fn set_value(&mut self, value: &str) {
        self.end();
        self.ui.bridge.set_value(value);
    }

    fn end(&mut self) {
        if !self.ended {
            self.ui.bridge.open_end();
            self.ended = true;
        }
    }
}

impl Drop for UiElem<'_, '_> {
    fn drop(&mut self) {
        self.end();
        self.ui.bridge.close(self.tag);
    }
}

// ---------------------------------------------------------------------------
// Dialogs
// ---------------------------------------------------------------------------

/// Native dialogs the editor may ask for.
pub trait Dialogs {
    /// Ask for an asset name to save under. `None` means cancelled.
    fn prompt_save_asset(&mut self, default_name: Option<&str>, extension: &str)
        -> Option<String>;
}

/// No dialog support; every prompt is cancelled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDialogs;

impl Dialogs for NoDialogs {
    fn prompt_save_asset(
        &mut self,
        _default_name: Option<&str>,
        extension: &str,
    ) -> Option<String> {
        tracing::warn!(extension, "cannot prompt for an asset name without dialogs");
        None
    }
}

/// Answers prompts from a queue, in order.
#[derive(Debug, Default, Clone)]
pub struct ScriptedDialogs {
    answers: VecDeque<String>,
}

impl ScriptedDialogs {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn push(&mut self, answer: impl Into<String>) {
        self.answers.push_back(answer.into());
    }
}

impl Dialogs for ScriptedDialogs {
    fn prompt_save_asset(
        &mut self,
        _default_name: Option<&str>,
        _extension: &str,
    ) -> Option<String> {
        self.answers.pop_front()
    }
}

// ---------------------------------------------------------------------------
// RecordingBridge
// ---------------------------------------------------------------------------

/// Address of a recorded element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElemId {
    patch: usize,
    index: usize,
}

/// One element as described in the last frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedElem {
    pub tag: String,
    pub key: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub value: Option<String>,
    pub parent: Option<usize>,
}

impl RecordedElem {
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }
}

#[derive(Debug, Default)]
struct Patch {
    id: String,
    elems: Vec<RecordedElem>,
}

/// In-memory [`UiBridge`] that records each patch and replays queued events
/// on the next description of the same element.
///
/// Elements are identified across frames by patch and position, so events
/// queued against one frame's tree land on the element at the same position
/// in the next frame.
#[derive(Debug)]
pub struct RecordingBridge {
    patches: Vec<Patch>,
    current: usize,
    stack: Vec<usize>,
    events: HashMap<(usize, usize, String), u32>,
    values: HashMap<(usize, usize), String>,
    keyboard_captured: bool,
}

impl Default for RecordingBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBridge {
    pub fn new() -> Self {
        Self {
            patches: vec![Patch::default()],
            current: 0,
            stack: Vec::new(),
            events: HashMap::new(),
            values: HashMap::new(),
            keyboard_captured: false,
        }
    }

    pub fn set_keyboard_captured(&mut self, captured: bool) {
        self.keyboard_captured = captured;
    }

    // -- queries ------------------------------------------------------------

    pub fn elem(&self, id: ElemId) -> &RecordedElem {
        &self.patches[id.patch].elems[id.index]
    }

    /// Elements of every patch, in document order.
    pub fn iter(&self) -> impl Iterator<Item = (ElemId, &RecordedElem)> {
        self.patches.iter().enumerate().flat_map(|(patch, p)| {
            p.elems
                .iter()
                .enumerate()
                .map(move |(index, elem)| (ElemId { patch, index }, elem))
        })
    }

    pub fn find(&self, mut pred: impl FnMut(&RecordedElem) -> bool) -> Option<ElemId> {
        self.iter().find(|(_, elem)| pred(elem)).map(|(id, _)| id)
    }

    pub fn find_all(&self, mut pred: impl FnMut(&RecordedElem) -> bool) -> Vec<ElemId> {
        self.iter()
            .filter(|(_, elem)| pred(elem))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn find_by_class(&self, class: &str) -> Option<ElemId> {
        self.find(|elem| elem.has_class(class))
    }

    /// First button with `class` and the given `label` attribute.
    pub fn find_button(&self, class: &str, label: &str) -> Option<ElemId> {
        self.find(|elem| {
            elem.tag == "button" && elem.has_class(class) && elem.attr("label") == Some(label)
        })
    }

    /// First element whose own text equals `text`.
    pub fn find_by_text(&self, text: &str) -> Option<ElemId> {
        self.find(|elem| elem.text == text)
    }

    /// First element with `class` below `ancestor`.
    pub fn find_within(&self, ancestor: ElemId, class: &str) -> Option<ElemId> {
        self.descendants(ancestor)
            .into_iter()
            .find(|&id| self.elem(id).has_class(class))
    }

    pub fn children(&self, parent: ElemId) -> Vec<ElemId> {
        let elems = &self.patches[parent.patch].elems;
        (parent.index + 1..elems.len())
            .filter(|&index| elems[index].parent == Some(parent.index))
            .map(|index| ElemId {
                patch: parent.patch,
                index,
            })
            .collect()
    }

    pub fn descendants(&self, ancestor: ElemId) -> Vec<ElemId> {
        let mut out = Vec::new();
        let mut pending = vec![ancestor];
        while let Some(id) = pending.pop() {
            let children = self.children(id);
            out.extend(children.iter().copied());
            pending.extend(children.into_iter().rev());
        }
        out.sort_by_key(|id| id.index);
        out
    }

    /// Text of `id` and all its descendants, in document order.
    pub fn text_content(&self, id: ElemId) -> String {
        let mut text = self.elem(id).text.clone();
        for child in self.descendants(id) {
            text.push_str(&self.elem(child).text);
        }
        text
    }

    /// Non-empty texts of a whole patch, joined by spaces.
    pub fn patch_text(&self, patch_id: &str) -> String {
        self.patches
            .iter()
            .find(|p| p.id == patch_id)
            .map(|p| {
                p.elems
                    .iter()
                    .map(|e| e.text.as_str())
                    .filter(|text| !text.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default()
    }

    // -- event queueing -----------------------------------------------------

    pub fn queue_event(&mut self, id: ElemId, event: &str) {
        *self
            .events
            .entry((id.patch, id.index, event.to_owned()))
            .or_default() += 1;
    }

    pub fn click(&mut self, id: ElemId) {
        self.queue_event(id, "click");
    }

    /// Queue a `change` event carrying `value`.
    pub fn change(&mut self, id: ElemId, value: &str) {
        self.values.insert((id.patch, id.index), value.to_owned());
        self.queue_event(id, "change");
    }

    fn current_elem(&mut self) -> Option<&mut RecordedElem> {
        let index = *self.stack.last()?;
        self.patches[self.current].elems.get_mut(index)
    }
}

impl UiBridge for RecordingBridge {
    fn open_start(&mut self, tag: &str, key: Option<&str>) {
        let parent = self.stack.last().copied();
        let elems = &mut self.patches[self.current].elems;
        elems.push(RecordedElem {
            tag: tag.to_owned(),
            key: key.map(str::to_owned),
            parent,
            ..Default::default()
        });
        self.stack.push(elems.len() - 1);
    }

    fn open_end(&mut self) {}

    fn close(&mut self, tag: &str) {
        match self.stack.pop() {
            Some(index) if self.patches[self.current].elems[index].tag == tag => {}
            Some(_) | None => tracing::warn!(tag, "unbalanced element close"),
        }
    }

    fn attr(&mut self, name: &str, value: &str) {
        if let Some(elem) = self.current_elem() {
            if name == "value" {
                elem.value = Some(value.to_owned());
            }
            elem.attrs.push((name.to_owned(), value.to_owned()));
        }
    }

    fn class(&mut self, class: &str) {
        if let Some(elem) = self.current_elem() {
            elem.classes
                .extend(class.split_whitespace().map(str::to_owned));
        }
    }

    fn text(&mut self, text: &str) {
        match self.current_elem() {
            Some(elem) => elem.text.push_str(text),
            None => self.patches[self.current].elems.push(RecordedElem {
                tag: "#text".to_owned(),
                text: text.to_owned(),
                ..Default::default()
            }),
        }
    }

    fn event_count(&mut self, event: &str) -> u32 {
        let Some(&index) = self.stack.last() else {
            return 0;
        };
        self.events
            .remove(&(self.current, index, event.to_owned()))
            .unwrap_or(0)
    }

    fn value(&mut self) -> String {
        let Some(&index) = self.stack.last() else {
            return String::new();
        };
        if let Some(value) = self.values.remove(&(self.current, index)) {
            return value;
        }
        self.patches[self.current].elems[index]
            .value
            .clone()
            .unwrap_or_default()
    }

    fn set_value(&mut self, value: &str) {
        if let Some(elem) = self.current_elem() {
            elem.value = Some(value.to_owned());
        }
    }

    fn token(&mut self) -> u64 {
        let position = self.patches[self.current].elems.len() as u64;
        ((self.current as u64) << 32) | position
    }

    fn is_keyboard_captured(&self) -> bool {
        self.keyboard_captured
    }

    fn begin_patch(&mut self, id: &str) {
        let index = match self.patches.iter().position(|p| p.id == id) {
            Some(index) => index,
            None => {
                self.patches.push(Patch {
                    id: id.to_owned(),
                    elems: Vec::new(),
                });
                self.patches.len() - 1
            }
        };
        self.patches[index].elems.clear();
        self.current = index;
        self.stack.clear();
    }

    fn end_patch(&mut self) {
        if !self.stack.is_empty() {
            tracing::warn!(open = self.stack.len(), "patch ended with open elements");
            self.stack.clear();
        }
        self.current = 0;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
