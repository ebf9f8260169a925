//! Volume slice pass: the wgpu side of [`ShaderProgram`].
//!
//! Uniform writes and quad draws coming from the core are recorded as one
//! instance each. [`SlicePass::prepare`] uploads them and
//! [`SlicePass::draw`] replays them in issue order inside a render pass.

use std::path::{Path, PathBuf};

use glam::Mat4;
use voxscope_core::{
    uniform_names as names, ShaderProgram, TextureHandle, Uniform, VoxscopeError,
    TRANSFER_FUNCTION_SLOT, VOLUME_TEXTURE_SLOT,
};

use crate::buffer::{create_vertex_buffer, write_or_grow};
use crate::textures::{TextureArena, TextureKind};

const EMBEDDED_SOURCE: &str = include_str!("shaders/slice.wgsl");

/// Per-slice state, one vertex buffer instance per recorded quad.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SliceInstance {
    pub model: [[f32; 4]; 4],
    pub volume: [[f32; 4]; 4],
    pub texture_to_world: [[f32; 4]; 4],
    /// slice, radius, opacity, mode
    pub params: [f32; 4],
}

impl Default for SliceInstance {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY.to_cols_array_2d(),
            volume: Mat4::IDENTITY.to_cols_array_2d(),
            texture_to_world: Mat4::IDENTITY.to_cols_array_2d(),
            params: [0.0, 0.5, 1.0, 0.0],
        }
    }
}

impl SliceInstance {
    const ATTRIBUTES: [wgpu::VertexAttribute; 13] = wgpu::vertex_attr_array![
        0 => Float32x4, 1 => Float32x4, 2 => Float32x4, 3 => Float32x4,
        4 => Float32x4, 5 => Float32x4, 6 => Float32x4, 7 => Float32x4,
        8 => Float32x4, 9 => Float32x4, 10 => Float32x4, 11 => Float32x4,
        12 => Float32x4
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }

    /// Applies a named uniform. Returns false for names or types this shader
    /// does not declare.
    fn apply(&mut self, name: &str, value: Uniform) -> bool {
        match (name, value) {
            (names::MODEL_MATRIX, Uniform::Mat4(m)) => self.model = m.to_cols_array_2d(),
            (names::VOLUME_MATRIX, Uniform::Mat4(m)) => {
                self.volume = m.to_cols_array_2d();
                self.texture_to_world = m.inverse().to_cols_array_2d();
            }
            (names::SLICE, Uniform::Float(v)) => self.params[0] = v,
            (names::RADIUS, Uniform::Float(v)) => self.params[1] = v,
            (names::OPACITY, Uniform::Float(v)) => self.params[2] = v,
            (names::MODE, Uniform::Int(v)) => self.params[3] = v as f32,
            // Texture slots are fixed by the bind group layout.
            (names::VOLUME_TEXTURE | names::TRANSFER_FUNCTION, Uniform::Int(_)) => {}
            _ => return false,
        }
        true
    }
}

/// Renders recorded volume slices with back-to-front alpha blending.
pub struct SlicePass {
    device: wgpu::Device,
    format: wgpu::TextureFormat,
    source_path: Option<PathBuf>,
    camera_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    pipeline: Option<wgpu::RenderPipeline>,
    current: SliceInstance,
    bound: [Option<TextureHandle>; 2],
    instances: Vec<SliceInstance>,
    instance_buffer: wgpu::Buffer,
    camera_bind_group: Option<wgpu::BindGroup>,
    texture_bind_group: Option<wgpu::BindGroup>,
    prepared: u32,
}

impl SlicePass {
    /// Creates the pass and compiles the slice shader.
    ///
    /// `source_path` replaces the built-in WGSL when set. A failed compile is
    /// logged and leaves the pass invalid until the next successful
    /// [`ShaderProgram::link`].
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        source_path: Option<PathBuf>,
    ) -> Self {
        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Slice Camera Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Slice Texture Bind Group Layout"),
            entries: &[
                // Voxel grid
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D3,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                // Transfer function
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D1,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let instance_buffer = create_vertex_buffer(
            device,
            &[SliceInstance::default(); 64],
            Some("Slice Instance Buffer"),
        );

        let mut pass = Self {
            device: device.clone(),
            format,
            source_path,
            camera_layout,
            texture_layout,
            pipeline: None,
            current: SliceInstance::default(),
            bound: [None; 2],
            instances: Vec::new(),
            instance_buffer,
            camera_bind_group: None,
            texture_bind_group: None,
            prepared: 0,
        };
        if let Err(e) = pass.link() {
            log::error!("{e}");
        }
        pass
    }

    /// Path of the WGSL file compiled by [`ShaderProgram::link`], if any.
    #[must_use]
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Slices recorded since the last [`SlicePass::begin_frame`].
    #[must_use]
    pub fn recorded(&self) -> &[SliceInstance] {
        &self.instances
    }

    /// Drops last frame's recording. Bound textures are kept.
    pub fn begin_frame(&mut self) {
        self.instances.clear();
        self.prepared = 0;
    }

    /// Uploads recorded slices and resolves the bound textures.
    ///
    /// Nothing is drawn afterwards if a bound handle went stale.
    pub fn prepare(
        &mut self,
        queue: &wgpu::Queue,
        camera_buffer: &wgpu::Buffer,
        arena: &TextureArena,
    ) {
        self.prepared = 0;
        self.texture_bind_group = None;
        if self.instances.is_empty() || self.pipeline.is_none() {
            return;
        }

        let volume = self.bound[VOLUME_TEXTURE_SLOT as usize]
            .and_then(|handle| arena.get(handle))
            .filter(|t| t.kind == TextureKind::Volume);
        let lookup = self.bound[TRANSFER_FUNCTION_SLOT as usize]
            .and_then(|handle| arena.get(handle))
            .filter(|t| t.kind == TextureKind::Lookup);
        let (Some(volume), Some(lookup)) = (volume, lookup) else {
            log::trace!(
                "slice textures not resident, skipping {} slices",
                self.instances.len()
            );
            return;
        };

        write_or_grow(
            &self.device,
            queue,
            &mut self.instance_buffer,
            &self.instances,
            Some("Slice Instance Buffer"),
        );

        self.camera_bind_group = Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Slice Camera Bind Group"),
            layout: &self.camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        }));
        self.texture_bind_group = Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Slice Texture Bind Group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&volume.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&volume.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&lookup.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&lookup.sampler),
                },
            ],
        }));
        self.prepared = self.instances.len() as u32;
    }

    /// Draws the prepared slices in the order they were recorded.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        let (Some(pipeline), Some(camera), Some(textures)) = (
            &self.pipeline,
            &self.camera_bind_group,
            &self.texture_bind_group,
        ) else {
            return;
        };
        if self.prepared == 0 {
            return;
        }
        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, camera, &[]);
        render_pass.set_bind_group(1, textures, &[]);
        render_pass.set_vertex_buffer(0, self.instance_buffer.slice(..));
        render_pass.draw(0..4, 0..self.prepared);
    }

    fn read_source(&self) -> voxscope_core::Result<String> {
        match &self.source_path {
            Some(path) => Ok(std::fs::read_to_string(path)?),
            None => Ok(EMBEDDED_SOURCE.to_string()),
        }
    }

    fn create_pipeline(&self, source: String) -> voxscope_core::Result<wgpu::RenderPipeline> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Slice Shader"),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Slice Pipeline Layout"),
                bind_group_layouts: &[&self.camera_layout, &self.texture_layout],
                push_constant_ranges: &[],
            });

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Slice Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[SliceInstance::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        match pollster::block_on(self.device.pop_error_scope()) {
            Some(error) => Err(VoxscopeError::ShaderLink(error.to_string())),
            None => Ok(pipeline),
        }
    }
}

impl ShaderProgram for SlicePass {
    fn use_program(&mut self) {
        // One pipeline per pass, nothing to switch.
    }

    fn is_valid(&self) -> bool {
        self.pipeline.is_some()
    }

    fn set_uniform(&mut self, name: &str, value: Uniform) {
        if !self.current.apply(name, value) {
            log::trace!("slice shader ignores uniform {name}");
        }
    }

    fn bind_texture(&mut self, slot: u32, texture: TextureHandle) {
        match self.bound.get_mut(slot as usize) {
            Some(bound) => *bound = Some(texture),
            None => log::warn!("slice shader has no texture slot {slot}"),
        }
    }

    fn draw_quad(&mut self) {
        self.instances.push(self.current);
    }

    fn link(&mut self) -> voxscope_core::Result<()> {
        self.pipeline = None;
        let source = self.read_source()?;
        let pipeline = self.create_pipeline(source)?;
        self.pipeline = Some(pipeline);
        match &self.source_path {
            Some(path) => log::info!("slice shader linked from {}", path.display()),
            None => log::info!("slice shader linked"),
        }
        Ok(())
    }
}
