//! voxscope: an interactive scalar volume viewer.
//!
//! A regular voxel grid is drawn as view-aligned translucent slices and
//! colored through a transfer function edited in an overlay at the bottom
//! of the window.
//!
//! # Quick Start
//!
//! ```no_run
//! use voxscope::*;
//!
//! fn main() -> Result<()> {
//!     init();
//!     let source = VolumeSource::new("head.pvm", VolumeFormat::Pvm);
//!     show(Options::default(), Some(source))
//! }
//! ```
//!
//! # Controls
//!
//! - left drag rotates the volume, right or middle drag moves it
//! - scroll zooms, `W/A/S/D/Space/C` or the arrow keys travel, `Shift` speeds up
//! - `I` toggles the editor, `P` toggles orthographic projection
//! - `F5` reloads the volume, `F6` relinks shaders, `F12` saves a screenshot
//! - `[`/`]` select nodes, `Delete` removes one, `R` resets the function

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

mod app;
mod headless;
mod init;

use thiserror::Error;

pub use headless::{render_to_file, render_to_image};
pub use init::{init, show};

// Re-export core types
pub use voxscope_core::{
    Command, HitRegion, InputEvent, Interaction, Key, MouseButton, Options, SamplingMode, Scene,
    SliceSettings, TextureStore, TransferFunction, VolumeFormat, VolumeSource, VoxelVolume,
    VoxscopeError, Mat4, Quat, UVec3, Vec2, Vec3, Vec4,
};

// Re-export render types
pub use voxscope_render::{Camera, ProjectionMode, RenderEngine, RenderError, SceneRenderer};

/// Errors surfaced by the viewer entry points.
#[derive(Error, Debug)]
pub enum AppError {
    /// Loading, configuration or texture error.
    #[error(transparent)]
    Core(#[from] VoxscopeError),

    /// Graphics context or frame error.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Screenshot capture or encoding error.
    #[error(transparent)]
    Screenshot(#[from] voxscope_render::ScreenshotError),

    /// The window could not be created.
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    /// The event loop could not start or failed while running.
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

/// A specialized Result type for the viewer entry points.
pub type Result<T> = std::result::Result<T, AppError>;

/// Slice parameters taken from the options.
#[must_use]
pub fn slice_settings(options: &Options) -> SliceSettings {
    SliceSettings {
        density: options.slice_density,
        mode: options.sampling_mode,
        opacity: options.opacity_scale,
    }
}

/// Builds the scene for `source` and uploads its textures into `store`.
///
/// A source that fails to load leaves the volume closed; the scene is still
/// usable and can be reloaded later.
pub fn build_scene(
    options: &Options,
    source: Option<VolumeSource>,
    store: &mut dyn TextureStore,
) -> Scene {
    let mut volume = VoxelVolume::new();
    volume.set_slice_settings(slice_settings(options));
    let mut scene = Scene::new(volume);
    if let Some(source) = source {
        scene.volume.set_path(source, store);
    }
    scene.upload(store);
    scene
}

/// Points the camera at the scene and applies the configured travel speed.
pub fn fit_camera(camera: &mut Camera, scene: &Scene, options: &Options) {
    camera.look_at_radius(scene.volume.bounding_radius());
    camera.set_move_speed(options.move_speed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxscope_core::HostTextureStore;

    #[test]
    fn test_build_scene_without_source() {
        let mut store = HostTextureStore::new();
        let scene = build_scene(&Options::default(), None, &mut store);
        assert!(!scene.volume.is_open());
        // Only the lookup texture is resident.
        assert_eq!(store.len(), 1);
        assert!(scene.transfer_function.texture().is_some());
    }

    #[test]
    fn test_build_scene_with_missing_file_stays_closed() {
        let mut store = HostTextureStore::new();
        let source = VolumeSource::new("does/not/exist.pvm", VolumeFormat::Pvm);
        let scene = build_scene(&Options::default(), Some(source), &mut store);
        assert!(!scene.volume.is_open());
        assert_eq!(scene.volume.name(), "exist.pvm");
    }

    #[test]
    fn test_slice_settings_follow_options() {
        let options = Options {
            slice_density: 2.0,
            sampling_mode: SamplingMode::SliceStack,
            opacity_scale: 0.5,
            ..Options::default()
        };
        let settings = slice_settings(&options);
        assert_eq!(settings.density, 2.0);
        assert_eq!(settings.mode, SamplingMode::SliceStack);
        assert_eq!(settings.opacity, 0.5);
    }

    #[test]
    fn test_fit_camera_frames_closed_volume() {
        let mut store = HostTextureStore::new();
        let scene = build_scene(&Options::default(), None, &mut store);
        let mut camera = Camera::default();
        camera.position = Vec3::new(5.0, 5.0, 5.0);
        fit_camera(&mut camera, &scene, &Options::default());
        assert_eq!(camera.target, Vec3::ZERO);
        assert!(camera.position.z > 0.0);
        assert!(camera.view_projection_matrix().is_finite());
    }
}
