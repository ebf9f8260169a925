//! Routing of host input events to the trackball, the volume and the editor.
//!
//! [`Interaction`] is a pure function of the incoming [`InputEvent`]s and the
//! scene it is handed. Effects that live outside the core, such as camera
//! zoom or a shader relink, come back as [`Command`]s for the host to apply.

use std::collections::HashMap;

use glam::{IVec4, Vec2, Vec3};

use crate::gui::{GuiLayout, HitRegion};
use crate::scene::Scene;
use crate::trackball::Trackball;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Keys the viewer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    ToggleGui,
    ToggleProjection,
    Shift,
    Reload,
    Relink,
    Escape,
    Screenshot,
    Delete,
    PreviousNode,
    NextNode,
    ResetTransferFunction,
    Forward,
    Back,
    Left,
    Right,
    Up,
    Down,
}

impl Key {
    /// Travel direction in camera space: +X right, +Y up, +Z forward.
    #[must_use]
    pub fn travel(self) -> Option<Vec3> {
        match self {
            Key::Forward => Some(Vec3::Z),
            Key::Back => Some(Vec3::NEG_Z),
            Key::Left => Some(Vec3::NEG_X),
            Key::Right => Some(Vec3::X),
            Key::Up => Some(Vec3::Y),
            Key::Down => Some(Vec3::NEG_Y),
            _ => None,
        }
    }
}

/// Discrete event delivered by the host surface. Positions are window pixels, Y down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Resized { width: u32, height: u32 },
    MouseButton { button: MouseButton, pressed: bool, x: f32, y: f32 },
    CursorMoved { x: f32, y: f32 },
    Scroll { delta: f32 },
    Key { key: Key, pressed: bool },
}

/// Effect the host applies on behalf of the interaction layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Move the camera along its view axis.
    Zoom(f32),
    ToggleProjection,
    /// Faster camera travel while held.
    SetBoost(bool),
    /// Reload the volume and recreate the lookup texture.
    ReloadVolume,
    /// Recompile shaders from source.
    ReloadShaders,
    Screenshot,
    Exit,
}

/// Interaction state for one window.
#[derive(Debug, Clone)]
pub struct Interaction {
    trackball: Trackball,
    layout: GuiLayout,
    focus: HitRegion,
    left: bool,
    right: bool,
    middle: bool,
    cursor: Vec2,
    /// Physical keys currently down per travel key.
    held: HashMap<Key, u32>,
}

impl Default for Interaction {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl Interaction {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            trackball: Trackball::new(width, height),
            layout: GuiLayout::new(width, height),
            focus: HitRegion::Volume,
            left: false,
            right: false,
            middle: false,
            cursor: Vec2::ZERO,
            held: HashMap::new(),
        }
    }

    #[must_use]
    pub fn trackball(&self) -> &Trackball {
        &self.trackball
    }

    pub fn trackball_mut(&mut self) -> &mut Trackball {
        &mut self.trackball
    }

    #[must_use]
    pub fn layout(&self) -> &GuiLayout {
        &self.layout
    }

    /// Region that received the last button press.
    #[must_use]
    pub fn focus(&self) -> HitRegion {
        self.focus
    }

    #[must_use]
    pub fn is_showing_gui(&self) -> bool {
        self.layout.is_visible()
    }

    pub fn set_showing_gui(&mut self, visible: bool) {
        self.layout.set_visible(visible);
        if !visible {
            self.focus = HitRegion::Volume;
        }
    }

    /// Last cursor position.
    #[must_use]
    pub fn cursor(&self) -> Vec2 {
        self.cursor
    }

    /// Sum of the held travel keys, zero when none is held.
    #[must_use]
    pub fn travel_direction(&self) -> Vec3 {
        self.held.keys().filter_map(|k| k.travel()).sum()
    }

    /// Applies one event to the scene. Returns a command for the host, if any.
    pub fn handle_event(&mut self, scene: &mut Scene, event: &InputEvent) -> Option<Command> {
        match *event {
            InputEvent::Resized { width, height } => {
                self.trackball.set_resolution(width, height);
                self.layout.set_resolution(width, height);
                None
            }
            InputEvent::MouseButton {
                button,
                pressed,
                x,
                y,
            } => {
                self.cursor = Vec2::new(x, y);
                if pressed {
                    self.press(scene, button, x, y);
                } else {
                    self.release(button);
                }
                None
            }
            InputEvent::CursorMoved { x, y } => {
                self.cursor = Vec2::new(x, y);
                self.drag(scene, x, y);
                None
            }
            InputEvent::Scroll { delta } => Some(Command::Zoom(delta)),
            InputEvent::Key { key, pressed } => self.key(scene, key, pressed),
        }
    }

    fn press(&mut self, scene: &mut Scene, button: MouseButton, x: f32, y: f32) {
        match button {
            MouseButton::Left => self.left = true,
            MouseButton::Right => self.right = true,
            MouseButton::Middle => self.middle = true,
        }
        self.trackball.set_pressed(true);
        self.focus = self.layout.classify(x, y);
        log::trace!("press {button:?} at ({x}, {y}) on {:?}", self.focus);

        self.gui_action(scene, x, button, false);
        match button {
            MouseButton::Left => self.trackball.set_rotation_point(x, y),
            MouseButton::Right | MouseButton::Middle => self.trackball.set_translation_point(x, y),
        }
    }

    fn release(&mut self, button: MouseButton) {
        match button {
            MouseButton::Left => self.left = false,
            MouseButton::Right => self.right = false,
            MouseButton::Middle => self.middle = false,
        }
        self.trackball
            .set_pressed(self.left || self.right || self.middle);
    }

    fn drag(&mut self, scene: &mut Scene, x: f32, y: f32) {
        if !self.trackball.is_enabled() || !self.trackball.is_pressed() {
            return;
        }
        let button = if self.right || self.middle {
            MouseButton::Right
        } else {
            MouseButton::Left
        };

        if self.focus.is_gui() {
            self.gui_action(scene, x, button, true);
            return;
        }
        match button {
            MouseButton::Left => {
                let rotation = self.trackball.rotate(x, y);
                scene.volume.rotate(rotation);
            }
            MouseButton::Right | MouseButton::Middle => {
                let delta = self.trackball.translate(x, y);
                scene.volume.translate(delta.extend(0.0));
            }
        }
    }

    /// Applies the editor action for the focused region at cursor `x`.
    ///
    /// The node arrows react to presses only, so holding the button on
    /// them does not race through the node list.
    fn gui_action(&mut self, scene: &mut Scene, x: f32, button: MouseButton, dragging: bool) {
        let tf = &mut scene.transfer_function;
        let level = self.layout.level_from_x(x);
        match self.focus {
            HitRegion::Volume => {}
            HitRegion::Previous if !dragging => {
                tf.select_previous_node();
            }
            HitRegion::Next if !dragging => {
                tf.select_next_node();
            }
            HitRegion::Previous | HitRegion::Next => {}
            HitRegion::Function => match button {
                MouseButton::Left => tf.set_current_node_index(level),
                MouseButton::Right if !dragging => tf.remove_current_node(),
                MouseButton::Right | MouseButton::Middle => {}
            },
            region @ (HitRegion::Red | HitRegion::Green | HitRegion::Blue | HitRegion::Alpha) => {
                let Some(channel) = region.channel() else {
                    return;
                };
                let mut color = tf.current_node_color();
                color[channel] = level;
                tf.set_current_node(IVec4::from_array(color.map(i32::from)));
            }
        }
    }

    fn key(&mut self, scene: &mut Scene, key: Key, pressed: bool) -> Option<Command> {
        if key.travel().is_some() {
            if pressed {
                *self.held.entry(key).or_insert(0) += 1;
            } else if let Some(count) = self.held.get_mut(&key) {
                *count -= 1;
                if *count == 0 {
                    self.held.remove(&key);
                }
            }
            return None;
        }
        if key == Key::Shift {
            return Some(Command::SetBoost(pressed));
        }
        if !pressed {
            return None;
        }

        let tf = &mut scene.transfer_function;
        match key {
            Key::ToggleGui => {
                let visible = !self.layout.is_visible();
                self.set_showing_gui(visible);
                log::debug!("gui {}", if visible { "shown" } else { "hidden" });
                None
            }
            Key::ToggleProjection => Some(Command::ToggleProjection),
            Key::Reload => Some(Command::ReloadVolume),
            Key::Relink => Some(Command::ReloadShaders),
            Key::Escape => Some(Command::Exit),
            Key::Screenshot => Some(Command::Screenshot),
            Key::Delete => {
                tf.remove_current_node();
                None
            }
            Key::PreviousNode => {
                tf.select_previous_node();
                None
            }
            Key::NextNode => {
                tf.select_next_node();
                None
            }
            Key::ResetTransferFunction => {
                tf.reset();
                None
            }
            _ => None,
        }
    }
}
