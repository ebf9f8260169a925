//! Transfer function editor overlay.

use voxscope_core::{GuiGeometry, GuiVertex, TextureHandle};

use crate::buffer::{create_uniform_buffer, create_vertex_buffer, write_or_grow};
use crate::textures::{TextureArena, TextureKind};

/// Screen size uniform for pixel to clip space conversion.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[allow(clippy::pub_underscore_fields)]
pub struct ScreenUniforms {
    pub size: [f32; 2],
    pub _padding: [f32; 2],
}

// The lookup coordinate is followed by one float of padding before the color.
const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] = [
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x2,
        offset: 0,
        shader_location: 0,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32,
        offset: 8,
        shader_location: 1,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x4,
        offset: 16,
        shader_location: 2,
    },
];

fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<GuiVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBUTES,
    }
}

/// Draws [`GuiGeometry`] over the rendered volume.
pub struct GuiPass {
    device: wgpu::Device,
    triangle_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: Option<wgpu::BindGroup>,
    screen_buffer: wgpu::Buffer,
    triangle_buffer: wgpu::Buffer,
    line_buffer: wgpu::Buffer,
    triangle_count: u32,
    line_count: u32,
    blank_view: wgpu::TextureView,
    blank_sampler: wgpu::Sampler,
}

impl GuiPass {
    /// Creates the overlay pipelines for the given output format.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Gui Bind Group Layout"),
            entries: &[
                // Screen size
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Lookup table
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D1,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Gui Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/gui.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Gui Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let create_pipeline = |label: &str, topology: wgpu::PrimitiveTopology| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[vertex_layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };
        let triangle_pipeline =
            create_pipeline("Gui Triangle Pipeline", wgpu::PrimitiveTopology::TriangleList);
        let line_pipeline = create_pipeline("Gui Line Pipeline", wgpu::PrimitiveTopology::LineList);

        // White 1D texture used until a lookup table is resident.
        let size = wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        };
        let blank = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Gui Blank Lookup"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D1,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &blank,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &[255u8; 4],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            size,
        );
        let blank_view = blank.create_view(&wgpu::TextureViewDescriptor::default());
        let blank_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Gui Blank Sampler"),
            ..Default::default()
        });

        let screen_buffer = create_uniform_buffer(
            device,
            &ScreenUniforms {
                size: [1.0, 1.0],
                _padding: [0.0; 2],
            },
            Some("Gui Screen Buffer"),
        );
        let placeholder = [<GuiVertex as bytemuck::Zeroable>::zeroed(); 6];
        let triangle_buffer =
            create_vertex_buffer(device, &placeholder, Some("Gui Triangle Buffer"));
        let line_buffer = create_vertex_buffer(device, &placeholder, Some("Gui Line Buffer"));

        Self {
            device: device.clone(),
            triangle_pipeline,
            line_pipeline,
            bind_group_layout,
            bind_group: None,
            screen_buffer,
            triangle_buffer,
            line_buffer,
            triangle_count: 0,
            line_count: 0,
            blank_view,
            blank_sampler,
        }
    }

    /// Uploads the overlay geometry for this frame.
    ///
    /// `lookup` is the transfer function texture; a stale or missing handle
    /// falls back to white so the strip still draws.
    pub fn prepare(
        &mut self,
        queue: &wgpu::Queue,
        (width, height): (u32, u32),
        geometry: &GuiGeometry,
        lookup: Option<TextureHandle>,
        arena: &TextureArena,
    ) {
        self.triangle_count = 0;
        self.line_count = 0;
        self.bind_group = None;
        if geometry.is_empty() {
            return;
        }

        queue.write_buffer(
            &self.screen_buffer,
            0,
            bytemuck::bytes_of(&ScreenUniforms {
                size: [width.max(1) as f32, height.max(1) as f32],
                _padding: [0.0; 2],
            }),
        );
        write_or_grow(
            &self.device,
            queue,
            &mut self.triangle_buffer,
            &geometry.triangles,
            Some("Gui Triangle Buffer"),
        );
        write_or_grow(
            &self.device,
            queue,
            &mut self.line_buffer,
            &geometry.lines,
            Some("Gui Line Buffer"),
        );
        self.triangle_count = geometry.triangles.len() as u32;
        self.line_count = geometry.lines.len() as u32;

        let (view, sampler) = lookup
            .and_then(|handle| arena.get(handle))
            .filter(|t| t.kind == TextureKind::Lookup)
            .map_or((&self.blank_view, &self.blank_sampler), |t| {
                (&t.view, &t.sampler)
            });
        self.bind_group = Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Gui Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.screen_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        }));
    }

    /// Draws the prepared overlay: filled shapes first, then the curves.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        let Some(bind_group) = &self.bind_group else {
            return;
        };
        render_pass.set_bind_group(0, bind_group, &[]);
        if self.triangle_count > 0 {
            render_pass.set_pipeline(&self.triangle_pipeline);
            render_pass.set_vertex_buffer(0, self.triangle_buffer.slice(..));
            render_pass.draw(0..self.triangle_count, 0..1);
        }
        if self.line_count > 0 {
            render_pass.set_pipeline(&self.line_pipeline);
            render_pass.set_vertex_buffer(0, self.line_buffer.slice(..));
            render_pass.draw(0..self.line_count, 0..1);
        }
    }
}
