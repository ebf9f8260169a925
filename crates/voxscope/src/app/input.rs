use std::sync::Arc;
use std::time::Instant;

use pollster::FutureExt;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, MouseScrollDelta, WindowEvent},
    event_loop::ActiveEventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use voxscope_core::{InputEvent, Interaction, Key, MouseButton};
use voxscope_render::{RenderEngine, SceneRenderer};

use super::App;
use crate::{build_scene, fit_camera};

/// Maps a physical key to the viewer key it drives.
pub(super) fn translate_key(code: KeyCode) -> Option<Key> {
    let key = match code {
        KeyCode::KeyI => Key::ToggleGui,
        KeyCode::KeyP => Key::ToggleProjection,
        KeyCode::ShiftLeft | KeyCode::ShiftRight => Key::Shift,
        KeyCode::F5 => Key::Reload,
        KeyCode::F6 => Key::Relink,
        KeyCode::Escape => Key::Escape,
        KeyCode::F12 => Key::Screenshot,
        KeyCode::Delete | KeyCode::Backspace => Key::Delete,
        KeyCode::BracketLeft => Key::PreviousNode,
        KeyCode::BracketRight => Key::NextNode,
        KeyCode::KeyR => Key::ResetTransferFunction,
        KeyCode::KeyW => Key::Forward,
        KeyCode::KeyS => Key::Back,
        KeyCode::KeyA | KeyCode::ArrowLeft => Key::Left,
        KeyCode::KeyD | KeyCode::ArrowRight => Key::Right,
        KeyCode::Space | KeyCode::ArrowUp => Key::Up,
        KeyCode::KeyC | KeyCode::ArrowDown => Key::Down,
        _ => return None,
    };
    Some(key)
}

pub(super) fn translate_button(button: winit::event::MouseButton) -> Option<MouseButton> {
    match button {
        winit::event::MouseButton::Left => Some(MouseButton::Left),
        winit::event::MouseButton::Right => Some(MouseButton::Right),
        winit::event::MouseButton::Middle => Some(MouseButton::Middle),
        _ => None,
    }
}

/// Scroll amount in lines; pixel deltas from touchpads are scaled down.
pub(super) fn scroll_lines(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.1,
    }
}

impl App {
    /// Routes a translated event through the interaction layer.
    fn dispatch(&mut self, event: &InputEvent) {
        if let Some(command) = self.interaction.handle_event(&mut self.scene, event) {
            self.apply_command(command);
        }
    }

    /// Creates the window, graphics context and scene.
    fn start(&mut self, event_loop: &ActiveEventLoop) -> crate::Result<()> {
        let window_attributes = Window::default_attributes()
            .with_title(self.options.window_title.clone())
            .with_inner_size(LogicalSize::new(
                self.options.window_width,
                self.options.window_height,
            ));
        let window = Arc::new(event_loop.create_window(window_attributes)?);

        let mut engine = RenderEngine::new_windowed(window.clone()).block_on()?;
        let mut renderer = SceneRenderer::new(&engine, self.options.shader_path.clone());
        self.scene = build_scene(
            &self.options,
            self.pending_source.take(),
            renderer.textures(),
        );
        fit_camera(&mut engine.camera, &self.scene, &self.options);

        let mut interaction = Interaction::new(engine.width, engine.height);
        interaction.set_showing_gui(self.interaction.is_showing_gui());
        self.interaction = interaction;

        window.set_title(&self.title(None));
        window.request_redraw();
        self.window = Some(window);
        self.engine = Some(engine);
        self.renderer = Some(renderer);
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.start(event_loop) {
                self.fail(e);
            }
        }
        if self.close_requested {
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.close_requested = true;
            }
            WindowEvent::Resized(size) => {
                if let Some(engine) = &mut self.engine {
                    engine.resize(size.width, size.height);
                }
                if size.width > 0 && size.height > 0 {
                    self.dispatch(&InputEvent::Resized {
                        width: size.width,
                        height: size.height,
                    });
                }
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = self
                    .last_frame_time
                    .map_or(0.0, |last| now.duration_since(last).as_secs_f32());
                self.last_frame_time = Some(now);

                let direction = self.interaction.travel_direction();
                if let Some(engine) = &mut self.engine {
                    engine.camera.travel(direction, dt);
                }

                self.render();
                self.count_frame(now);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.dispatch(&InputEvent::CursorMoved {
                    x: position.x as f32,
                    y: position.y as f32,
                });
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(button) = translate_button(button) {
                    let cursor = self.interaction.cursor();
                    self.dispatch(&InputEvent::MouseButton {
                        button,
                        pressed: state == ElementState::Pressed,
                        x: cursor.x,
                        y: cursor.y,
                    });
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.dispatch(&InputEvent::Scroll {
                    delta: scroll_lines(delta),
                });
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.repeat {
                    return;
                }
                if let PhysicalKey::Code(code) = event.physical_key {
                    if let Some(key) = translate_key(code) {
                        self.dispatch(&InputEvent::Key {
                            key,
                            pressed: event.state == ElementState::Pressed,
                        });
                    }
                }
            }
            _ => {}
        }

        if self.close_requested {
            event_loop.exit();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(renderer) = &mut self.renderer {
            renderer.release(&mut self.scene);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_key_bindings() {
        assert_eq!(translate_key(KeyCode::KeyI), Some(Key::ToggleGui));
        assert_eq!(translate_key(KeyCode::F5), Some(Key::Reload));
        assert_eq!(translate_key(KeyCode::F12), Some(Key::Screenshot));
        assert_eq!(translate_key(KeyCode::ShiftRight), Some(Key::Shift));
        assert_eq!(translate_key(KeyCode::KeyW), Some(Key::Forward));
        assert_eq!(translate_key(KeyCode::KeyS), Some(Key::Back));
        assert_eq!(translate_key(KeyCode::KeyZ), None);
    }

    #[test]
    fn test_vertical_arrows_travel_up_and_down() {
        assert_eq!(translate_key(KeyCode::ArrowUp), Some(Key::Up));
        assert_eq!(translate_key(KeyCode::Space), Some(Key::Up));
        assert_eq!(translate_key(KeyCode::ArrowDown), Some(Key::Down));
        assert_eq!(translate_key(KeyCode::KeyC), Some(Key::Down));
        assert_eq!(translate_key(KeyCode::ArrowLeft), Some(Key::Left));
        assert_eq!(translate_key(KeyCode::ArrowRight), Some(Key::Right));
    }

    #[test]
    fn test_translate_button() {
        assert_eq!(
            translate_button(winit::event::MouseButton::Middle),
            Some(MouseButton::Middle)
        );
        assert_eq!(translate_button(winit::event::MouseButton::Back), None);
    }

    #[test]
    fn test_scroll_lines() {
        assert_eq!(scroll_lines(MouseScrollDelta::LineDelta(0.0, 2.0)), 2.0);
        let pixels = MouseScrollDelta::PixelDelta(winit::dpi::PhysicalPosition::new(0.0, 30.0));
        assert!((scroll_lines(pixels) - 3.0).abs() < 1e-6);
    }
}
