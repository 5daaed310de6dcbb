//! Per-frame input as polled from the windowing backend.

use dream_ecs::math::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// A printable key, by its unshifted lowercase character.
    Char(char),
    Space,
    Backspace,
    Escape,
    Enter,
    Shift,
    Control,
    Alt,
    Super,
}

impl Key {
    pub fn is_modifier(self) -> bool {
        matches!(self, Key::Shift | Key::Control | Key::Alt | Key::Super)
    }
}

/// A single frame of input.
///
/// `pressed` and `released` hold the transitions that happened this frame;
/// `down` holds everything currently held, including this frame's presses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputFrame {
    pub mouse_position: Vec2,
    pub mouse_pressed: Vec<MouseButton>,
    pub mouse_down: Vec<MouseButton>,
    pub mouse_released: Vec<MouseButton>,
    /// Wheel movement this frame; positive scrolls up.
    pub wheel: f32,
    pub keys_down: Vec<Key>,
    pub keys_released: Vec<Key>,
    pub screen_size: Vec2,
    /// Physical pixels per logical pixel.
    pub pixel_ratio: f32,
    /// Whether a UI text field has keyboard focus.
    pub keyboard_captured: bool,
    pub fps: Option<u32>,
}

impl Default for InputFrame {
    /// No buttons, a 960x540 screen at pixel ratio 1.
    fn default() -> Self {
        Self {
            mouse_position: Vec2::ZERO,
            mouse_pressed: Vec::new(),
            mouse_down: Vec::new(),
            mouse_released: Vec::new(),
            wheel: 0.0,
            keys_down: Vec::new(),
            keys_released: Vec::new(),
            screen_size: Vec2::new(960.0, 540.0),
            pixel_ratio: 1.0,
            keyboard_captured: false,
            fps: None,
        }
    }
}

impl InputFrame {
    pub fn is_mouse_pressed(&self, button: MouseButton) -> bool {
        self.mouse_pressed.contains(&button)
    }

    pub fn is_mouse_down(&self, button: MouseButton) -> bool {
        self.mouse_down.contains(&button)
    }

    pub fn is_mouse_released(&self, button: MouseButton) -> bool {
        self.mouse_released.contains(&button)
    }

    pub fn is_key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn is_key_released(&self, key: Key) -> bool {
        self.keys_released.contains(&key)
    }

    pub fn is_modifier_down(&self) -> bool {
        self.keys_down.iter().any(|key| key.is_modifier())
    }

    // -- builders -----------------------------------------------------------

    pub fn at(mut self, position: Vec2) -> Self {
        self.mouse_position = position;
        self
    }

    /// The button went down this frame.
    pub fn press(mut self, button: MouseButton) -> Self {
        self.mouse_pressed.push(button);
        self.mouse_down.push(button);
        self
    }

    /// The button is held.
    pub fn hold(mut self, button: MouseButton) -> Self {
        self.mouse_down.push(button);
        self
    }

    /// The button came up this frame.
    pub fn release(mut self, button: MouseButton) -> Self {
        self.mouse_released.push(button);
        self
    }

    pub fn scroll(mut self, wheel: f32) -> Self {
        self.wheel = wheel;
        self
    }

    pub fn key_down(mut self, key: Key) -> Self {
        self.keys_down.push(key);
        self
    }

    pub fn key_released(mut self, key: Key) -> Self {
        self.keys_released.push(key);
        self
    }

    pub fn screen(mut self, size: Vec2) -> Self {
        self.screen_size = size;
        self
    }
}

/// A keyboard shortcut: a key, optionally combined with a modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortcut {
    pub modifier: Option<Key>,
    pub key: Key,
}

impl Shortcut {
    pub const fn key(key: Key) -> Self {
        Self {
            modifier: None,
            key,
        }
    }

    pub const fn with(modifier: Key, key: Key) -> Self {
        Self {
            modifier: Some(modifier),
            key,
        }
    }

    /// Whether the shortcut completed this frame.
    ///
    /// A bare key fires on release while no modifier is held. A combination
    /// fires when either half is released while the other is held.
    pub fn triggered(&self, input: &InputFrame) -> bool {
        match self.modifier {
            None => input.is_key_released(self.key) && !input.is_modifier_down(),
            Some(modifier) => {
                (input.is_key_down(modifier) && input.is_key_released(self.key))
                    || (input.is_key_released(modifier) && input.is_key_down(self.key))
            }
        }
    }
}
