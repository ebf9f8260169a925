//! The graphics context shared by every pass.

use std::sync::Arc;

use crate::buffer::create_uniform_buffer;
use crate::camera::Camera;
use crate::error::{RenderError, RenderResult};
use crate::screenshot::ScreenshotError;

/// Camera uniforms for GPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[allow(clippy::pub_underscore_fields)]
pub struct CameraUniforms {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub inv_view: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
    pub _padding: f32,
}

impl Default for CameraUniforms {
    fn default() -> Self {
        Self {
            view: glam::Mat4::IDENTITY.to_cols_array_2d(),
            proj: glam::Mat4::IDENTITY.to_cols_array_2d(),
            inv_view: glam::Mat4::IDENTITY.to_cols_array_2d(),
            camera_pos: [0.0, 0.0, 2.0],
            _padding: 0.0,
        }
    }
}

impl CameraUniforms {
    /// Builds the uniforms for the camera's current pose.
    #[must_use]
    pub fn from_camera(camera: &Camera) -> Self {
        let view = camera.view_matrix();
        Self {
            view: view.to_cols_array_2d(),
            proj: camera.projection_matrix().to_cols_array_2d(),
            inv_view: view.inverse().to_cols_array_2d(),
            camera_pos: camera.position.to_array(),
            _padding: 0.0,
        }
    }
}

/// Where the current frame is drawn.
pub enum FrameTarget {
    /// A swapchain image, presented by [`FrameTarget::present`].
    Surface {
        texture: wgpu::SurfaceTexture,
        view: wgpu::TextureView,
    },
    /// The headless offscreen texture.
    Offscreen { view: wgpu::TextureView },
}

impl FrameTarget {
    #[must_use]
    pub fn view(&self) -> &wgpu::TextureView {
        match self {
            FrameTarget::Surface { view, .. } | FrameTarget::Offscreen { view } => view,
        }
    }

    /// Presents swapchain images. Offscreen frames stay in place for readback.
    pub fn present(self) {
        if let FrameTarget::Surface { texture, .. } = self {
            texture.present();
        }
    }
}

/// Graphics context: device, queue, output target and camera uniforms.
///
/// Created once by the application and lent to every pass and to the
/// texture arena.
pub struct RenderEngine {
    /// The wgpu instance.
    pub instance: wgpu::Instance,
    /// The wgpu adapter.
    pub adapter: wgpu::Adapter,
    /// The wgpu device.
    pub device: wgpu::Device,
    /// The wgpu queue.
    pub queue: wgpu::Queue,
    /// The render surface (None for headless).
    pub surface: Option<wgpu::Surface<'static>>,
    /// Surface configuration. Headless engines keep the offscreen format here.
    pub surface_config: wgpu::SurfaceConfiguration,
    /// Offscreen color target (headless only).
    pub(crate) offscreen: Option<wgpu::Texture>,
    /// Main camera.
    pub camera: Camera,
    /// Camera uniform buffer.
    pub camera_buffer: wgpu::Buffer,
    /// Current viewport width.
    pub width: u32,
    /// Current viewport height.
    pub height: u32,
}

impl RenderEngine {
    /// Creates a new windowed render engine.
    pub async fn new_windowed(window: Arc<winit::window::Window>) -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;
        let (device, queue) = Self::request_device(&adapter, "voxscope device").await?;

        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(RenderError::SurfaceConfigurationFailed)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        Ok(Self::assemble(
            instance,
            adapter,
            device,
            queue,
            Some(surface),
            surface_config,
            None,
        ))
    }

    /// Creates a new headless render engine drawing into an offscreen texture.
    pub async fn new_headless(width: u32, height: u32) -> RenderResult<Self> {
        let width = width.max(1);
        let height = height.max(1);
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;
        let (device, queue) = Self::request_device(&adapter, "voxscope device (headless)").await?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        let offscreen = Self::create_offscreen_texture(&device, &surface_config);

        Ok(Self::assemble(
            instance,
            adapter,
            device,
            queue,
            None,
            surface_config,
            Some(offscreen),
        ))
    }

    async fn request_device(
        adapter: &wgpu::Adapter,
        label: &str,
    ) -> RenderResult<(wgpu::Device, wgpu::Queue)> {
        let info = adapter.get_info();
        log::info!(
            "graphics adapter: {} ({:?}, vendor {:#06x}, driver {})",
            info.name,
            info.backend,
            info.vendor,
            info.driver
        );
        let device = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(label),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;
        Ok(device)
    }

    fn assemble(
        instance: wgpu::Instance,
        adapter: wgpu::Adapter,
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface: Option<wgpu::Surface<'static>>,
        surface_config: wgpu::SurfaceConfiguration,
        offscreen: Option<wgpu::Texture>,
    ) -> Self {
        let width = surface_config.width;
        let height = surface_config.height;
        let camera = Camera::new(width as f32 / height as f32);
        let camera_buffer = create_uniform_buffer(
            &device,
            &CameraUniforms::from_camera(&camera),
            Some("camera uniforms"),
        );
        Self {
            instance,
            adapter,
            device,
            queue,
            surface,
            surface_config,
            offscreen,
            camera,
            camera_buffer,
            width,
            height,
        }
    }

    fn create_offscreen_texture(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
    ) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen target"),
            size: wgpu::Extent3d {
                width: config.width,
                height: config.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: config.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        })
    }

    /// Color format of the output target.
    #[must_use]
    pub fn format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }

    /// Returns true when rendering into the offscreen texture.
    #[must_use]
    pub fn is_headless(&self) -> bool {
        self.surface.is_none()
    }

    /// Returns the viewport dimensions.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Resizes the render target.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.width = width;
        self.height = height;
        self.surface_config.width = width;
        self.surface_config.height = height;

        if let Some(ref surface) = self.surface {
            surface.configure(&self.device, &self.surface_config);
        }
        if let Some(old) = self.offscreen.take() {
            old.destroy();
            self.offscreen = Some(Self::create_offscreen_texture(
                &self.device,
                &self.surface_config,
            ));
        }

        self.camera.set_resolution(width, height);
    }

    /// Uploads the camera pose.
    pub fn update_camera_uniforms(&self) {
        let uniforms = CameraUniforms::from_camera(&self.camera);
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    /// Acquires the texture the next frame is drawn into.
    ///
    /// A lost or outdated surface is reconfigured and reported, so the
    /// caller skips the frame and tries again on the next one.
    pub fn begin_frame(&mut self) -> RenderResult<FrameTarget> {
        if let Some(surface) = &self.surface {
            return match surface.get_current_texture() {
                Ok(texture) => {
                    let view = texture
                        .texture
                        .create_view(&wgpu::TextureViewDescriptor::default());
                    Ok(FrameTarget::Surface { texture, view })
                }
                Err(e @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                    surface.configure(&self.device, &self.surface_config);
                    Err(e.into())
                }
                Err(e) => Err(e.into()),
            };
        }
        let texture = self
            .offscreen
            .as_ref()
            .ok_or(RenderError::SurfaceConfigurationFailed)?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(FrameTarget::Offscreen { view })
    }

    /// Calculates bytes per row with proper alignment for wgpu buffer copies.
    fn aligned_bytes_per_row(width: u32) -> u32 {
        let bytes_per_pixel = 4u32; // RGBA8
        let unaligned = width * bytes_per_pixel;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        unaligned.div_ceil(align) * align
    }

    /// Creates a readable color target matching the output format and size.
    ///
    /// Used to capture windowed frames, whose swapchain images cannot be
    /// copied from.
    #[must_use]
    pub fn create_capture_texture(&self) -> wgpu::Texture {
        Self::create_offscreen_texture(&self.device, &self.surface_config)
    }

    /// Reads the offscreen target back as tightly packed RGBA rows.
    pub fn capture_offscreen(&self) -> Result<Vec<u8>, ScreenshotError> {
        let texture = self
            .offscreen
            .as_ref()
            .ok_or(ScreenshotError::InvalidImageData)?;
        self.read_texture(texture)
    }

    /// Copies a 2D RGBA8 texture of the viewport size into host memory.
    pub fn read_texture(&self, texture: &wgpu::Texture) -> Result<Vec<u8>, ScreenshotError> {
        let bytes_per_row = Self::aligned_bytes_per_row(self.width);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback buffer"),
            size: u64::from(bytes_per_row) * u64::from(self.height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.device.poll(wgpu::PollType::wait_indefinitely());
        rx.recv()
            .map_err(|_| ScreenshotError::BufferMapFailed)?
            .map_err(|_| ScreenshotError::BufferMapFailed)?;

        // Copy data, removing row padding
        let data = buffer_slice.get_mapped_range();
        let row_bytes = (self.width * 4) as usize;
        let mut result = Vec::with_capacity(row_bytes * self.height as usize);
        for row in 0..self.height {
            let start = (row * bytes_per_row) as usize;
            result.extend_from_slice(&data[start..start + row_bytes]);
        }
        drop(data);
        buffer.unmap();
        Ok(result)
    }

    /// Returns true if the output format stores blue first.
    #[must_use]
    pub fn is_bgra(&self) -> bool {
        matches!(
            self.surface_config.format,
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_uniforms_size() {
        let size = std::mem::size_of::<CameraUniforms>();
        assert_eq!(size, 208);
        assert_eq!(size % 16, 0);
    }

    #[test]
    fn test_aligned_bytes_per_row() {
        assert_eq!(RenderEngine::aligned_bytes_per_row(64), 256);
        assert_eq!(RenderEngine::aligned_bytes_per_row(65), 512);
        assert_eq!(RenderEngine::aligned_bytes_per_row(1), 256);
    }

    #[test]
    fn test_camera_uniforms_invert_view() {
        let camera = Camera::default();
        let uniforms = CameraUniforms::from_camera(&camera);
        let view = glam::Mat4::from_cols_array_2d(&uniforms.view);
        let inv = glam::Mat4::from_cols_array_2d(&uniforms.inv_view);
        assert!((view * inv).abs_diff_eq(glam::Mat4::IDENTITY, 1e-5));
    }
}
