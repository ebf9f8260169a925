use voxscope_core::Command;
use voxscope_render::{save_image, timestamped_filename, ProjectionMode, RenderError};

use super::App;
use crate::{fit_camera, AppError};

impl App {
    /// Draws and presents one frame.
    pub(super) fn render(&mut self) {
        let (Some(engine), Some(renderer)) = (&mut self.engine, &mut self.renderer) else {
            return;
        };
        let result = renderer.render_frame(
            engine,
            &mut self.scene,
            self.interaction.layout(),
            self.options.background_color,
        );
        match result {
            Ok(()) => {}
            Err(RenderError::SurfaceLost | RenderError::SurfaceOutdated) => {
                log::debug!("surface reconfigured, skipping frame");
            }
            Err(RenderError::Timeout) => {
                log::warn!("timed out acquiring the next frame");
            }
            Err(e) => self.fail(AppError::Render(e)),
        }
    }

    /// Applies an effect requested by the interaction layer.
    pub(super) fn apply_command(&mut self, command: Command) {
        log::debug!("command {command:?}");
        match command {
            Command::Zoom(lines) => {
                if let Some(engine) = &mut self.engine {
                    let camera = &mut engine.camera;
                    let scale = match camera.projection_mode {
                        ProjectionMode::Perspective => {
                            camera.position.distance(camera.target) * 0.1
                        }
                        ProjectionMode::Orthographic => 0.5,
                    };
                    camera.zoom(lines * scale);
                }
            }
            Command::ToggleProjection => {
                if let Some(engine) = &mut self.engine {
                    engine.camera.toggle_projection();
                }
            }
            Command::SetBoost(boost) => {
                if let Some(engine) = &mut self.engine {
                    engine.camera.set_boost(boost);
                }
            }
            Command::ReloadVolume => self.reload_volume(),
            Command::ReloadShaders => {
                if let Some(renderer) = &mut self.renderer {
                    if let Err(e) = renderer.relink() {
                        log::error!("{e}");
                    }
                }
            }
            Command::Screenshot => self.take_screenshot(),
            Command::Exit => self.close_requested = true,
        }
    }

    fn reload_volume(&mut self) {
        let Some(renderer) = &mut self.renderer else {
            return;
        };
        self.scene.reload(renderer.textures());
        if let Some(engine) = &mut self.engine {
            fit_camera(&mut engine.camera, &self.scene, &self.options);
        }
        if let Some(window) = &self.window {
            window.set_title(&self.title(None));
        }
    }

    /// Renders the current view offscreen and writes it to the screenshot directory.
    fn take_screenshot(&mut self) {
        let (Some(engine), Some(renderer)) = (&self.engine, &mut self.renderer) else {
            return;
        };
        let path = timestamped_filename(&self.options.screenshot_dir, "png");
        let (width, height) = engine.dimensions();
        let result = renderer
            .capture(
                engine,
                &mut self.scene,
                self.interaction.layout(),
                self.options.background_color,
            )
            .and_then(|pixels| save_image(&path, &pixels, width, height, engine.is_bgra()));
        if let Err(e) = result {
            log::error!("screenshot failed: {e}");
        }
    }
}
