//! Headless editing session -- select, drag, save, reload.
//!
//! Run with:
//!   cargo run --example headless_session -p dream-edit
//!
//! Scripts a few frames of input against a recording UI bridge, saves the
//! scene with Ctrl+S, stashes the session on disk and restores it into a
//! fresh editor.

use anyhow::{ensure, Context};
use dream_ecs::prelude::*;
use dream_edit::prelude::*;

// ---------------------------------------------------------------------------
// Game side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}
dream_ecs::reflect!(Position { x, y });
dream_ecs::scene_component!(Position);

#[derive(Debug, Clone, Default, PartialEq)]
struct Crate {
    size: f32,
    label: String,
}
dream_ecs::reflect!(Crate { size, label });
dream_ecs::scene_component!(Crate);

struct CrateHooks;

impl GameEditHooks for CrateHooks {
    fn apply_moves(&mut self, world: &mut World) {
        world.each2::<EditMove, Position>(|_, edit_move, position| {
            position.x += edit_move.delta.x;
            position.y += edit_move.delta.y;
        });
    }

    fn merge_boxes(&mut self, world: &mut World) {
        for entity in world.entities_with::<Crate>() {
            let size = world.get::<Crate>(entity).size;
            let p = world.get::<Position>(entity).clone();
            let half = 0.5 * size;
            merge_edit_box(world, entity, Rect::new(p.x - half, p.y - half, size, size));
        }
    }
}

fn setup_world() -> World {
    let mut world = World::new();
    world.register_component::<Position>();
    world.register_component::<Crate>();
    world
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

struct Session {
    world: World,
    editor: Editor,
    bridge: RecordingBridge,
}

impl Session {
    fn frame(&mut self, input: &InputFrame) {
        self.editor.update(&mut self.world, input);
        let mut ui = Ui::new(&mut self.bridge);
        self.editor.ui(&mut ui, &mut self.world, input);
    }
}

fn main() -> Result<(), anyhow::Error> {
    dream_edit::logging::init_with_default("info");

    let dir = tempfile::tempdir().context("create asset directory")?;
    let assets = AssetStore::new(dir.path().join("assets"), 1 << 20);
    let sessions = dir.path().join("sessions");

    let mut world = setup_world();
    for (i, label) in ["left", "middle", "right"].into_iter().enumerate() {
        world.create_with((
            Position {
                x: 400.0 + 80.0 * i as f32,
                y: 270.0,
            },
            Crate {
                size: 40.0,
                label: label.to_owned(),
            },
        ));
    }

    let editor = Editor::new(EditorConfig::default())
        .with_assets(assets.clone())
        .with_hooks(CrateHooks)
        .with_dialogs(ScriptedDialogs::new(["warehouse"]));
    let mut session = Session {
        world,
        editor,
        bridge: RecordingBridge::new(),
    };
    let screen = Vec2::new(960.0, 540.0);
    let idle = InputFrame::default().screen(screen);

    session.frame(&idle);
    session.editor.save_snapshot(&mut session.world, "start", false);

    // Click the middle crate, then drag it right in move mode.
    let middle = Vec2::new(480.0, 270.0);
    session.frame(&idle.clone().at(middle).press(MouseButton::Left));
    session.frame(&idle.clone().at(middle).release(MouseButton::Left));
    let picked = first_selected(&session.world).context("nothing picked")?;
    tracing::info!(entity = %picked, label = %session.world.get::<Crate>(picked).label, "picked");

    session.editor.set_mode(mode::MOVE);
    session.frame(&idle.clone().at(middle).press(MouseButton::Left));
    for step in 1..=4 {
        let at = middle + Vec2::new(10.0 * step as f32, 0.0);
        session.frame(&idle.clone().at(at).hold(MouseButton::Left));
    }
    session.frame(&idle.clone().at(middle + Vec2::new(40.0, 0.0)).release(MouseButton::Left));
    tracing::info!(
        x = session.world.get::<Position>(picked).x,
        history = session.editor.history().len(),
        "dragged"
    );

    // Ctrl+S prompts for a name and writes the scene.
    session.frame(&idle.clone().key_down(Key::Control).key_released(Key::Char('s')));
    ensure!(
        session.editor.state().scene_name == "warehouse.scn",
        "scene was not saved"
    );

    let mut store = FileSessionStore::new(&sessions);
    ensure!(
        session.editor.save_session(&session.world, &mut store),
        "session was not saved"
    );

    // A fresh process picks the session up again.
    let mut restored = Session {
        world: setup_world(),
        editor: Editor::new(EditorConfig::default())
            .with_assets(assets)
            .with_hooks(CrateHooks),
        bridge: RecordingBridge::new(),
    };
    ensure!(
        restored.editor.load_session(&mut restored.world, &mut store),
        "session was not restored"
    );
    restored.frame(&idle);
    ensure!(restored.editor.undo(&mut restored.world), "nothing to undo");

    println!("scene:        {}", restored.editor.state().scene_name);
    println!("entities:     {}", restored.world.entity_count());
    println!("after undo:   x = {}", restored.world.get::<Position>(picked).x);
    println!("notification: {}", restored.editor.state().notification);
    println!("status bar:   {}", restored.bridge.patch_text("bottom"));
    Ok(())
}
