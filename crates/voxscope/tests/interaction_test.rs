//! Interaction integration tests.
//!
//! These drive the viewer's event routing against a real volume file and the
//! host-memory texture store, so they run without a GPU.

use std::path::PathBuf;

use voxscope::*;
use voxscope_core::HostTextureStore;

const WIDTH: u32 = 400;
const HEIGHT: u32 = 300;

/// Writes a small self-describing 16-bit raw volume and returns its path.
fn write_raw_volume(name: &str) -> PathBuf {
    let (x, y, z) = (4u16, 3u16, 2u16);
    let mut bytes = Vec::new();
    for dim in [x, y, z] {
        bytes.extend_from_slice(&dim.to_le_bytes());
    }
    for i in 0..(x * y * z) {
        bytes.extend_from_slice(&(i * 100).to_le_bytes());
    }
    let path = std::env::temp_dir().join(format!("voxscope_{}_{name}.raw", std::process::id()));
    std::fs::write(&path, bytes).expect("failed to write test volume");
    path
}

struct Fixture {
    store: HostTextureStore,
    scene: Scene,
    interaction: Interaction,
    path: PathBuf,
}

impl Fixture {
    fn new(name: &str) -> Self {
        let path = write_raw_volume(name);
        let mut store = HostTextureStore::new();
        let source = VolumeSource::new(&path, VolumeFormat::Raw);
        let scene = build_scene(&Options::default(), Some(source), &mut store);
        assert!(scene.volume.is_open(), "test volume should open");
        Self {
            store,
            scene,
            interaction: Interaction::new(WIDTH, HEIGHT),
            path,
        }
    }

    fn send(&mut self, event: InputEvent) -> Option<Command> {
        self.interaction.handle_event(&mut self.scene, &event)
    }

    fn press(&mut self, button: MouseButton, x: f32, y: f32) {
        self.send(InputEvent::CursorMoved { x, y });
        self.send(InputEvent::MouseButton {
            button,
            pressed: true,
            x,
            y,
        });
    }

    fn release(&mut self, button: MouseButton) {
        let cursor = self.interaction.cursor();
        self.send(InputEvent::MouseButton {
            button,
            pressed: false,
            x: cursor.x,
            y: cursor.y,
        });
    }

    fn key(&mut self, key: Key) -> Option<Command> {
        let command = self.send(InputEvent::Key { key, pressed: true });
        self.send(InputEvent::Key {
            key,
            pressed: false,
        });
        command
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        self.scene.release(&mut self.store);
        let _ = std::fs::remove_file(&self.path);
    }
}

#[test]
fn left_drag_on_volume_rotates_it() {
    let mut fx = Fixture::new("rotate");
    fx.press(MouseButton::Left, 200.0, 100.0);
    fx.send(InputEvent::CursorMoved { x: 260.0, y: 100.0 });
    fx.release(MouseButton::Left);

    assert_eq!(fx.interaction.focus(), HitRegion::Volume);
    assert!(!fx.scene.volume.rotation().abs_diff_eq(Quat::IDENTITY, 1e-6));
    assert_eq!(fx.scene.volume.position(), Vec3::ZERO);
}

#[test]
fn right_drag_on_volume_translates_it() {
    let mut fx = Fixture::new("translate");
    fx.press(MouseButton::Right, 200.0, 150.0);
    fx.send(InputEvent::CursorMoved { x: 300.0, y: 150.0 });
    fx.release(MouseButton::Right);

    let position = fx.scene.volume.position();
    assert!((position.x - 0.5).abs() < 1e-5, "moved by {position}");
    assert_eq!(position.y, 0.0);
    assert_eq!(position.z, 0.0);
    assert!(fx.scene.volume.rotation().abs_diff_eq(Quat::IDENTITY, 1e-6));
}

#[test]
fn moving_without_a_button_does_nothing() {
    let mut fx = Fixture::new("hover");
    fx.send(InputEvent::CursorMoved { x: 10.0, y: 10.0 });
    fx.send(InputEvent::CursorMoved { x: 300.0, y: 200.0 });
    assert!(fx.scene.volume.rotation().abs_diff_eq(Quat::IDENTITY, 1e-6));
    assert_eq!(fx.scene.volume.position(), Vec3::ZERO);
}

#[test]
fn editor_sets_channel_of_selected_level() {
    let mut fx = Fixture::new("editor");

    // Function graph: pick level 127 as current.
    fx.press(MouseButton::Left, 200.0, 250.0);
    fx.release(MouseButton::Left);
    assert_eq!(fx.interaction.focus(), HitRegion::Function);
    assert_eq!(fx.scene.transfer_function.current_node(), 127);

    // Red bar: press then drag to the right end.
    let before = fx.scene.transfer_function.node_color(127);
    fx.press(MouseButton::Left, 200.0, 178.0);
    assert_eq!(fx.interaction.focus(), HitRegion::Red);
    assert!(fx.scene.transfer_function.is_node(127));
    assert_eq!(fx.scene.transfer_function.node_color(127)[0], 127);

    fx.send(InputEvent::CursorMoved { x: 387.0, y: 178.0 });
    fx.release(MouseButton::Left);
    let after = fx.scene.transfer_function.node_color(127);
    assert_eq!(after, [255, before[1], before[2], before[3]]);

    // The volume was never touched.
    assert!(fx.scene.volume.rotation().abs_diff_eq(Quat::IDENTITY, 1e-6));
}

#[test]
fn right_click_on_graph_removes_current_node() {
    let mut fx = Fixture::new("remove");
    let count = fx.scene.transfer_function.node_count();

    fx.press(MouseButton::Left, 200.0, 250.0);
    fx.release(MouseButton::Left);
    fx.press(MouseButton::Left, 200.0, 178.0);
    fx.release(MouseButton::Left);
    assert_eq!(fx.scene.transfer_function.node_count(), count + 1);

    fx.press(MouseButton::Right, 200.0, 250.0);
    fx.release(MouseButton::Right);
    assert_eq!(fx.scene.transfer_function.node_count(), count);
    assert!(!fx.scene.transfer_function.is_node(127));
}

#[test]
fn hidden_editor_passes_clicks_to_the_volume() {
    let mut fx = Fixture::new("hidden");
    assert_eq!(fx.key(Key::ToggleGui), None);
    assert!(!fx.interaction.is_showing_gui());

    fx.press(MouseButton::Left, 200.0, 250.0);
    fx.send(InputEvent::CursorMoved { x: 260.0, y: 250.0 });
    fx.release(MouseButton::Left);

    assert_eq!(fx.interaction.focus(), HitRegion::Volume);
    assert!(!fx.scene.volume.rotation().abs_diff_eq(Quat::IDENTITY, 1e-6));
    assert!(fx.interaction.layout().geometry(&fx.scene.transfer_function).is_empty());
}

#[test]
fn reload_restores_pose_and_recreates_lookup() {
    let mut fx = Fixture::new("reload");
    fx.press(MouseButton::Right, 200.0, 150.0);
    fx.send(InputEvent::CursorMoved { x: 300.0, y: 100.0 });
    fx.release(MouseButton::Right);
    assert_ne!(fx.scene.volume.position(), Vec3::ZERO);

    assert_eq!(fx.key(Key::Reload), Some(Command::ReloadVolume));
    let lookup = fx.scene.transfer_function.texture();
    assert!(fx.scene.reload(&mut fx.store));

    assert_eq!(fx.scene.volume.position(), Vec3::ZERO);
    assert_ne!(fx.scene.transfer_function.texture(), lookup);
    // One volume texture and one lookup texture.
    assert_eq!(fx.store.len(), 2);
}

#[test]
fn keys_map_to_commands() {
    let mut fx = Fixture::new("keys");
    assert_eq!(fx.key(Key::ToggleProjection), Some(Command::ToggleProjection));
    assert_eq!(fx.key(Key::Relink), Some(Command::ReloadShaders));
    assert_eq!(fx.key(Key::Screenshot), Some(Command::Screenshot));
    assert_eq!(fx.key(Key::Escape), Some(Command::Exit));
    assert_eq!(
        fx.send(InputEvent::Scroll { delta: -2.0 }),
        Some(Command::Zoom(-2.0))
    );
    assert_eq!(
        fx.send(InputEvent::Key {
            key: Key::Shift,
            pressed: true
        }),
        Some(Command::SetBoost(true))
    );
    assert_eq!(
        fx.send(InputEvent::Key {
            key: Key::Shift,
            pressed: false
        }),
        Some(Command::SetBoost(false))
    );
}

#[test]
fn held_travel_keys_combine() {
    let mut fx = Fixture::new("travel");
    fx.send(InputEvent::Key {
        key: Key::Forward,
        pressed: true,
    });
    fx.send(InputEvent::Key {
        key: Key::Right,
        pressed: true,
    });
    assert_eq!(fx.interaction.travel_direction(), Vec3::new(1.0, 0.0, 1.0));

    fx.send(InputEvent::Key {
        key: Key::Forward,
        pressed: false,
    });
    assert_eq!(fx.interaction.travel_direction(), Vec3::X);

    let mut camera = Camera::new(1.0);
    camera.travel(fx.interaction.travel_direction(), 0.5);
    assert!((camera.position.x - 0.5).abs() < 1e-5);
}

#[test]
fn reset_key_restores_default_function() {
    let mut fx = Fixture::new("reset");
    let default_table = *fx.scene.transfer_function.table();
    fx.press(MouseButton::Left, 200.0, 250.0);
    fx.release(MouseButton::Left);
    fx.press(MouseButton::Left, 100.0, 210.0);
    fx.release(MouseButton::Left);
    assert_ne!(fx.scene.transfer_function.table(), &default_table);

    fx.key(Key::ResetTransferFunction);
    assert_eq!(fx.scene.transfer_function.table(), &default_table);
}
