//! Editor-wide state that survives session reloads.

use dream_ecs::fixed_str::FixedStr;
use dream_ecs::math::Vec2;

// ---------------------------------------------------------------------------
// Camera2D
// ---------------------------------------------------------------------------

/// A 2D view transform: `target` in world space appears at `offset` in
/// screen space, rotated by `rotation` degrees and scaled by `zoom`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera2D {
    pub offset: Vec2,
    pub target: Vec2,
    pub rotation: f32,
    pub zoom: f32,
}
dream_ecs::reflect!(Camera2D { offset, target, rotation, zoom });

impl Default for Camera2D {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            target: Vec2::ZERO,
            rotation: 0.0,
            zoom: 1.0,
        }
    }
}

impl Camera2D {
    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        ((world - self.target) * self.zoom).rotate(self.rotation) + self.offset
    }

    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        if self.zoom == 0.0 {
            return self.target;
        }
        ((screen - self.offset) * (1.0 / self.zoom)).rotate(-self.rotation) + self.target
    }
}

// ---------------------------------------------------------------------------
// EditState
// ---------------------------------------------------------------------------

/// Where the game camera looks before any scene is opened.
pub const INITIAL_CAMERA_TARGET: Vec2 = Vec2::new(0.5 * 960.0, 0.5 * 540.0);

/// Mode names understood by the built-in tools.
pub mod mode {
    pub const SELECT: &str = "select";
    pub const MOVE: &str = "move";
    pub const CAMERA_PAN: &str = "camera pan";
}

/// Editing state. The reflected fields are saved with the session; the rest
/// is recomputed every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct EditState {
    /// Editing (`true`) or playing (`false`).
    pub enabled: bool,
    pub mode: FixedStr<16>,
    pub scene_name: FixedStr<64>,
    /// Title of the component section last opened in the inspector.
    pub inspected_component_title: FixedStr<64>,
    pub camera: Camera2D,
    pub zoom_level: f32,

    pub line_thickness: f32,
    pub mouse_screen_pos: Vec2,
    pub mouse_world_pos: Vec2,
    pub mouse_world_delta: Vec2,
    pub notification: FixedStr<96>,
    pub last_notification_time: f64,
}
dream_ecs::reflect!(EditState {
    enabled,
    mode,
    scene_name,
    inspected_component_title,
    camera,
    zoom_level,
});

impl Default for EditState {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: FixedStr::new(mode::SELECT),
            scene_name: FixedStr::default(),
            inspected_component_title: FixedStr::default(),
            camera: Camera2D {
                target: INITIAL_CAMERA_TARGET,
                ..Camera2D::default()
            },
            zoom_level: 0.0,
            line_thickness: 1.0,
            mouse_screen_pos: Vec2::ZERO,
            mouse_world_pos: Vec2::ZERO,
            mouse_world_delta: Vec2::ZERO,
            notification: FixedStr::default(),
            last_notification_time: 0.0,
        }
    }
}

/// `"EditBox"` becomes `"edit box"`: each capital starts a new lowercase
/// word.
pub fn titleify(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_uppercase() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dream_ecs::serialize::ReadWrite;

    fn approx(a: Vec2, b: Vec2) -> bool {
        (a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3
    }

    #[test]
    fn titleify_splits_camel_case() {
        assert_eq!(titleify("EditBox"), "edit box");
        assert_eq!(titleify("Position"), "position");
        assert_eq!(titleify("spriteSheet"), "sprite sheet");
        assert_eq!(titleify(""), "");
    }

    #[test]
    fn camera_transforms_invert() {
        let camera = Camera2D {
            offset: Vec2::new(480.0, 270.0),
            target: Vec2::new(100.0, -20.0),
            rotation: 30.0,
            zoom: 2.5,
        };
        let world = Vec2::new(37.0, 12.5);
        let screen = camera.world_to_screen(world);
        assert!(approx(camera.screen_to_world(screen), world));
        assert!(approx(camera.world_to_screen(camera.target), camera.offset));
    }

    #[test]
    fn unrotated_camera_scales_about_target() {
        let camera = Camera2D {
            offset: Vec2::new(100.0, 100.0),
            target: Vec2::new(10.0, 10.0),
            rotation: 0.0,
            zoom: 2.0,
        };
        assert!(approx(camera.world_to_screen(Vec2::new(20.0, 10.0)), Vec2::new(120.0, 100.0)));
        assert!(approx(camera.screen_to_world(Vec2::ZERO), Vec2::new(-40.0, -40.0)));
    }

    #[test]
    fn only_reflected_fields_persist() {
        let mut state = EditState::default();
        state.mode.set(mode::MOVE);
        state.scene_name.set("level.scn");
        state.zoom_level = 2.0;
        state.camera.target = Vec2::new(5.0, 6.0);
        state.notification.set("hello");
        state.last_notification_time = 9.0;

        let node = state.write();
        assert!(node.get("notification").is_none());

        let mut back = EditState::default();
        back.read(&node);
        assert_eq!(back.mode, "move");
        assert_eq!(back.scene_name, "level.scn");
        assert_eq!(back.zoom_level, 2.0);
        assert_eq!(back.camera.target, Vec2::new(5.0, 6.0));
        assert!(back.notification.is_empty());
        assert_eq!(back.last_notification_time, 0.0);
    }
}
