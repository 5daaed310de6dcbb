//! Undo history limits and session save/restore through the editor.

use dream_ecs::prelude::*;
use dream_edit::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone, Default, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}
dream_ecs::reflect!(Position { x, y });
dream_ecs::scene_component!(Position);

fn setup_world() -> World {
    let mut world = World::new();
    world.register_component::<Position>();
    world
}

fn editor() -> Editor {
    Editor::new(EditorConfig::default()).with_clock(ManualClock::stepping(0.0, 1.0))
}

// -- history ----------------------------------------------------------------

#[test]
fn undo_stops_after_ring_wraps() {
    let mut world = setup_world();
    let e = world.create_with((Position::default(),));
    let mut editor = editor();

    for i in 0..60 {
        world.get_mut::<Position>(e).x = i as f32;
        editor.save_snapshot(&mut world, &format!("step {i}"), false);
    }
    assert_eq!(editor.history().len(), MAX_SNAPSHOTS);

    for _ in 0..MAX_SNAPSHOTS - 1 {
        assert!(editor.undo(&mut world));
    }
    assert_eq!(world.get::<Position>(e).x, 10.0);
    assert!(!editor.can_undo());
    assert!(!editor.undo(&mut world));
    assert_eq!(editor.state().notification, "cannot undo");
}

#[test]
fn undo_then_redo_returns_to_latest() {
    let mut world = setup_world();
    let e = world.create_with((Position::default(),));
    let mut editor = editor();

    for i in 0..5 {
        world.get_mut::<Position>(e).y = i as f32;
        editor.save_snapshot(&mut world, "nudge", false);
    }
    for _ in 0..3 {
        assert!(editor.undo(&mut world));
    }
    assert_eq!(world.get::<Position>(e).y, 1.0);
    for _ in 0..3 {
        assert!(editor.redo(&mut world));
    }
    assert_eq!(world.get::<Position>(e).y, 4.0);
    assert!(!editor.can_redo());
}

#[derive(Debug, Clone)]
enum HistoryOp {
    Save(i16),
    Undo,
    Redo,
}

fn history_op() -> impl Strategy<Value = HistoryOp> {
    prop_oneof![
        any::<i16>().prop_map(HistoryOp::Save),
        Just(HistoryOp::Undo),
        Just(HistoryOp::Redo),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Without wrapping the ring, history behaves like a list with a cursor
    /// where saving drops everything after the cursor.
    #[test]
    fn undo_redo_match_linear_model(ops in prop::collection::vec(history_op(), 1..48)) {
        let mut world = setup_world();
        let e = world.create_with((Position::default(),));
        let mut editor = editor();

        let mut states: Vec<f32> = Vec::new();
        let mut cursor = 0usize;

        for op in ops {
            match op {
                HistoryOp::Save(x) => {
                    world.get_mut::<Position>(e).x = f32::from(x);
                    editor.save_snapshot(&mut world, "set x", false);
                    if !states.is_empty() {
                        states.truncate(cursor + 1);
                    }
                    states.push(f32::from(x));
                    cursor = states.len() - 1;
                }
                HistoryOp::Undo => {
                    let expected = cursor > 0;
                    prop_assert_eq!(editor.undo(&mut world), expected);
                    if expected {
                        cursor -= 1;
                    }
                }
                HistoryOp::Redo => {
                    let expected = cursor + 1 < states.len();
                    prop_assert_eq!(editor.redo(&mut world), expected);
                    if expected {
                        cursor += 1;
                    }
                }
            }

            prop_assert_eq!(editor.can_undo(), cursor > 0);
            prop_assert_eq!(editor.can_redo(), cursor + 1 < states.len());
            if let Some(&x) = states.get(cursor) {
                prop_assert_eq!(world.get::<Position>(e).x, x);
            }
        }
    }
}

// -- sessions ---------------------------------------------------------------

/// Two entities, the second selected, with a two-step history and a moved
/// camera.
fn edited_session(editor: &mut Editor) -> (World, EntityId, EntityId) {
    let mut world = setup_world();
    let a = world.create_with((Position { x: 1.0, y: 1.0 },));
    let b = world.create_with((Position { x: 5.0, y: 5.0 },));
    editor.save_snapshot(&mut world, "start", false);
    world.get_mut::<Position>(b).x = 8.0;
    select(&mut world, b);
    editor.save_snapshot(&mut world, "move", false);
    editor.set_mode(mode::MOVE);
    editor.set_zoom_level(2.0);
    editor.state_mut().camera.target = Vec2::new(12.0, -4.0);
    editor.state_mut().scene_name.set("level.scn");
    (world, a, b)
}

#[test]
fn session_restores_world_history_and_state() {
    let mut store = MemorySessionStore::new();
    let mut first = editor();
    let (world, a, b) = edited_session(&mut first);
    assert!(first.save_session(&world, &mut store));
    assert_eq!(first.state().notification, "saved session");

    let mut restored = setup_world();
    let mut second = editor();
    assert!(second.load_session(&mut restored, &mut store));
    assert_eq!(second.state().notification, "restored session");

    assert_eq!(restored.get::<Position>(a), &Position { x: 1.0, y: 1.0 });
    assert_eq!(restored.get::<Position>(b), &Position { x: 8.0, y: 5.0 });
    assert_eq!(save_selection(&restored), vec![b]);

    let state = second.state();
    assert_eq!(state.mode, mode::MOVE);
    assert_eq!(state.zoom_level, 2.0);
    assert_eq!(state.camera.target, Vec2::new(12.0, -4.0));
    assert_eq!(state.scene_name, "level.scn");

    assert_eq!(second.history().len(), 2);
    assert_eq!(second.history().current().description, "move");
    assert!(second.undo(&mut restored));
    assert_eq!(restored.get::<Position>(b).x, 5.0);
    assert_eq!(second.state().notification, "undid move");
}

#[test]
fn session_is_consumed_by_load() {
    let mut store = MemorySessionStore::new();
    let mut first = editor();
    let (world, _, _) = edited_session(&mut first);
    assert!(first.save_session(&world, &mut store));

    let mut restored = setup_world();
    let mut second = editor();
    assert!(second.load_session(&mut restored, &mut store));
    assert_eq!(store.get("editSession"), None);
    assert!(!second.load_session(&mut restored, &mut store));
}

#[test]
fn tampered_session_is_rejected() {
    let mut store = MemorySessionStore::new();
    let mut first = editor();
    let (world, _, _) = edited_session(&mut first);
    assert!(first.save_session(&world, &mut store));

    let mut blob = parse(&store.get("editSession").unwrap());
    let session = blob["session"].as_str().unwrap().replace("level.scn", "other.scn");
    blob["session"] = Node::String(session);
    store.set("editSession", &stringify(&blob, false));

    let mut target = setup_world();
    let keep = target.create_with((Position { x: 3.0, y: 3.0 },));
    let mut second = editor();
    assert!(!second.load_session(&mut target, &mut store));
    assert!(target.exists(keep));
    assert_eq!(target.entity_count(), 1);
    assert!(second.history().is_empty());
    assert_eq!(store.get("editSession"), None);
}

#[test]
fn restored_history_sorts_before_new_edits() {
    let mut store = MemorySessionStore::new();
    let mut first = Editor::new(EditorConfig::default())
        .with_clock(ManualClock::stepping(10_000.0, 1.0));
    let (world, _, b) = edited_session(&mut first);
    assert!(first.save_session(&world, &mut store));

    // The reloaded process starts its clock from zero again.
    let mut restored = setup_world();
    let mut second = editor();
    assert!(second.load_session(&mut restored, &mut store));
    assert!(second.history().current().time < 0.0);

    restored.get_mut::<Position>(b).y = 9.0;
    second.save_snapshot(&mut restored, "lift", false);
    assert!(second.undo(&mut restored));
    assert_eq!(restored.get::<Position>(b), &Position { x: 8.0, y: 5.0 });
    assert!(second.undo(&mut restored));
    assert_eq!(restored.get::<Position>(b).x, 5.0);
    assert!(second.redo(&mut restored));
    assert!(second.redo(&mut restored));
    assert_eq!(restored.get::<Position>(b).y, 9.0);
}

#[test]
fn file_store_carries_session_across_editors() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileSessionStore::new(dir.path());
    let mut first = editor();
    let (world, a, _) = edited_session(&mut first);
    assert!(first.save_session(&world, &mut store));
    assert!(dir.path().join("editSession.json").is_file());

    let mut store = FileSessionStore::new(dir.path());
    let mut restored = setup_world();
    let mut second = editor();
    assert!(second.load_session(&mut restored, &mut store));
    assert!(restored.exists(a));
    assert!(!dir.path().join("editSession.json").exists());
}
