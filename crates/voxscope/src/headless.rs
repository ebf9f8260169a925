//! Headless rendering.
//!
//! Renders one frame of a volume without opening a window. Useful for
//! integration tests, batch processing and automated screenshots.

use std::path::Path;

use pollster::FutureExt;
use voxscope_core::{Interaction, Options, VolumeSource};
use voxscope_render::{RenderEngine, SceneRenderer};

use crate::{build_scene, fit_camera, Result};

/// Renders a volume to a raw RGBA pixel buffer.
///
/// Creates a headless GPU context, loads `source`, frames it with the
/// camera and draws one frame, including the editor overlay when
/// `options.show_gui` is set. The buffer holds `width * height * 4` bytes,
/// row by row from the top left. Zero sizes are raised to one pixel.
pub fn render_to_image(
    options: &Options,
    source: Option<VolumeSource>,
    width: u32,
    height: u32,
) -> Result<Vec<u8>> {
    let mut engine = RenderEngine::new_headless(width, height).block_on()?;
    let mut renderer = SceneRenderer::new(&engine, options.shader_path.clone());
    let mut scene = build_scene(options, source, renderer.textures());
    fit_camera(&mut engine.camera, &scene, options);

    let (width, height) = engine.dimensions();
    let mut interaction = Interaction::new(width, height);
    interaction.set_showing_gui(options.show_gui);

    let frame = engine.begin_frame()?;
    renderer.render(
        &engine,
        &mut scene,
        interaction.layout(),
        options.background_color,
        frame.view(),
    );
    frame.present();
    let pixels = engine.capture_offscreen()?;
    renderer.release(&mut scene);
    Ok(pixels)
}

/// Renders a volume to a PNG or JPEG file.
pub fn render_to_file(
    options: &Options,
    source: Option<VolumeSource>,
    path: &Path,
    width: u32,
    height: u32,
) -> Result<()> {
    let pixels = render_to_image(options, source, width, height)?;
    voxscope_render::save_image(path, &pixels, width.max(1), height.max(1), false)?;
    Ok(())
}
