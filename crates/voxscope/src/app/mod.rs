//! Application window and event loop management.

mod input;
mod render;

use std::sync::Arc;
use std::time::Instant;

use winit::{event_loop::EventLoop, window::Window};

use voxscope_core::{Interaction, Options, Scene, VolumeSource};
use voxscope_render::{RenderEngine, SceneRenderer};

use crate::{AppError, Result};

/// The viewer application state.
pub struct App {
    window: Option<Arc<Window>>,
    engine: Option<RenderEngine>,
    renderer: Option<SceneRenderer>,
    scene: Scene,
    interaction: Interaction,
    options: Options,
    // Taken when the graphics context exists to load into.
    pending_source: Option<VolumeSource>,
    close_requested: bool,
    // First fatal error, reported once the event loop returns
    error: Option<AppError>,
    last_frame_time: Option<Instant>,
    // Frame counter for the title bar rate
    frames: u32,
    frames_since: Option<Instant>,
}

impl App {
    /// Creates a new application that opens `source` once the window exists.
    pub fn new(options: Options, source: Option<VolumeSource>) -> Self {
        let mut interaction = Interaction::new(options.window_width, options.window_height);
        interaction.set_showing_gui(options.show_gui);
        Self {
            window: None,
            engine: None,
            renderer: None,
            scene: Scene::default(),
            interaction,
            options,
            pending_source: source,
            close_requested: false,
            error: None,
            last_frame_time: None,
            frames: 0,
            frames_since: None,
        }
    }

    /// Records a fatal error and asks the loop to stop.
    fn fail(&mut self, error: AppError) {
        log::error!("{error}");
        if self.error.is_none() {
            self.error = Some(error);
        }
        self.close_requested = true;
    }

    /// Counts a presented frame and refreshes the title once per second.
    fn count_frame(&mut self, now: Instant) {
        self.frames += 1;
        let since = *self.frames_since.get_or_insert(now);
        let elapsed = now.duration_since(since).as_secs_f32();
        if elapsed < 1.0 {
            return;
        }
        let fps = self.frames as f32 / elapsed;
        self.frames = 0;
        self.frames_since = Some(now);
        if let Some(window) = &self.window {
            window.set_title(&self.title(Some(fps)));
        }
    }

    fn title(&self, fps: Option<f32>) -> String {
        let mut title = self.options.window_title.clone();
        if self.scene.volume.is_open() {
            title.push_str(" - ");
            title.push_str(&self.scene.volume.name());
        }
        if let Some(fps) = fps {
            title.push_str(&format!(" ({fps:.0} fps)"));
        }
        title
    }
}

/// Runs the viewer until the window closes.
pub fn run_app(options: Options, source: Option<VolumeSource>) -> Result<()> {
    let event_loop = EventLoop::new()?;
    let mut app = App::new(options, source);

    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
