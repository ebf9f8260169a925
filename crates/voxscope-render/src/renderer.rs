//! Per-frame drawing of a [`Scene`] and its editor overlay.

use std::path::PathBuf;

use glam::Vec3;
use voxscope_core::{GuiLayout, Scene, ShaderProgram};

use crate::engine::RenderEngine;
use crate::error::RenderResult;
use crate::gui_pass::GuiPass;
use crate::screenshot::ScreenshotError;
use crate::slice_pass::SlicePass;
use crate::textures::TextureArena;

/// Owns the GPU textures and passes used to draw one scene.
pub struct SceneRenderer {
    arena: TextureArena,
    slice_pass: SlicePass,
    gui_pass: GuiPass,
}

impl SceneRenderer {
    /// Creates the passes for the engine's output format.
    ///
    /// `shader_path` replaces the built-in slice shader when set.
    #[must_use]
    pub fn new(engine: &RenderEngine, shader_path: Option<PathBuf>) -> Self {
        Self {
            arena: TextureArena::new(&engine.device, &engine.queue),
            slice_pass: SlicePass::new(&engine.device, engine.format(), shader_path),
            gui_pass: GuiPass::new(&engine.device, &engine.queue, engine.format()),
        }
    }

    /// Texture store the scene loads into.
    pub fn textures(&mut self) -> &mut TextureArena {
        &mut self.arena
    }

    #[must_use]
    pub fn slice_pass(&self) -> &SlicePass {
        &self.slice_pass
    }

    /// Recompiles the slice shader. A failure leaves slices undrawn until the
    /// next successful relink.
    pub fn relink(&mut self) -> voxscope_core::Result<()> {
        self.slice_pass.link()
    }

    /// Draws the scene into `target`.
    pub fn render(
        &mut self,
        engine: &RenderEngine,
        scene: &mut Scene,
        layout: &GuiLayout,
        background: Vec3,
        target: &wgpu::TextureView,
    ) {
        scene.upload(&mut self.arena);
        engine.update_camera_uniforms();

        self.slice_pass.begin_frame();
        scene.draw(&mut self.slice_pass);
        self.slice_pass
            .prepare(&engine.queue, &engine.camera_buffer, &self.arena);

        let geometry = layout.geometry(&scene.transfer_function);
        self.gui_pass.prepare(
            &engine.queue,
            engine.dimensions(),
            &geometry,
            scene.transfer_function.texture(),
            &self.arena,
        );

        let mut encoder = engine
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Scene Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: f64::from(background.x),
                            g: f64::from(background.y),
                            b: f64::from(background.z),
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });
            self.slice_pass.draw(&mut render_pass);
            self.gui_pass.draw(&mut render_pass);
        }
        engine.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Draws and presents one frame on the engine's output target.
    pub fn render_frame(
        &mut self,
        engine: &mut RenderEngine,
        scene: &mut Scene,
        layout: &GuiLayout,
        background: Vec3,
    ) -> RenderResult<()> {
        let frame = engine.begin_frame()?;
        self.render(engine, scene, layout, background, frame.view());
        frame.present();
        Ok(())
    }

    /// Draws the scene into a readable texture and returns its pixels.
    ///
    /// Rows are tightly packed; check [`RenderEngine::is_bgra`] for the
    /// channel order.
    pub fn capture(
        &mut self,
        engine: &RenderEngine,
        scene: &mut Scene,
        layout: &GuiLayout,
        background: Vec3,
    ) -> Result<Vec<u8>, ScreenshotError> {
        let texture = engine.create_capture_texture();
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.render(engine, scene, layout, background, &view);
        let pixels = engine.read_texture(&texture);
        texture.destroy();
        pixels
    }

    /// Frees the scene's textures.
    pub fn release(&mut self, scene: &mut Scene) {
        scene.release(&mut self.arena);
    }
}
