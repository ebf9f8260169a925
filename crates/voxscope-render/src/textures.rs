//! GPU texture storage behind the core [`TextureStore`] contract.

use half::f16;
use slotmap::SlotMap;
use voxscope_core::{
    Rgba, TextureHandle, TextureStore, VoxelGrid, Voxels, VoxscopeError, LOOKUP_SIZE,
};

/// What a stored texture holds. Decides the bind group it can join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    /// 1D RGBA8 transfer function lookup.
    Lookup,
    /// 3D single-channel voxel grid.
    Volume,
}

/// A texture with the view and sampler the passes bind.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub kind: TextureKind,
    pub size: wgpu::Extent3d,
}

/// Owns every volume and lookup texture on the device.
///
/// Handles are generation checked, so a released handle never aliases a
/// texture created afterwards.
pub struct TextureArena {
    device: wgpu::Device,
    queue: wgpu::Queue,
    textures: SlotMap<TextureHandle, GpuTexture>,
}

impl TextureArena {
    #[must_use]
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self {
            device: device.clone(),
            queue: queue.clone(),
            textures: SlotMap::with_key(),
        }
    }

    /// Looks up a live texture.
    #[must_use]
    pub fn get(&self, handle: TextureHandle) -> Option<&GpuTexture> {
        self.textures.get(handle)
    }

    /// Number of live textures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Frees every texture.
    pub fn clear(&mut self) {
        for (_, texture) in self.textures.drain() {
            texture.texture.destroy();
        }
    }

    fn create_sampler(&self, label: &str) -> wgpu::Sampler {
        self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        })
    }

    /// Creates a texture and fills it, reporting validation failures as errors.
    #[allow(clippy::too_many_arguments)]
    fn create_filled(
        &mut self,
        label: &str,
        kind: TextureKind,
        dimension: wgpu::TextureDimension,
        format: wgpu::TextureFormat,
        size: wgpu::Extent3d,
        bytes_per_texel: u32,
        data: &[u8],
    ) -> voxscope_core::Result<TextureHandle> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size.width * bytes_per_texel),
                rows_per_image: Some(size.height),
            },
            size,
        );
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            texture.destroy();
            return Err(VoxscopeError::TextureCreation(error.to_string()));
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = self.create_sampler(label);
        Ok(self.textures.insert(GpuTexture {
            texture,
            view,
            sampler,
            kind,
            size,
        }))
    }
}

/// Converts 16-bit samples to half floats in `[0, 1]`, scaled by the grid maximum.
fn normalized_half_floats(samples: &[u16], max: u16) -> Vec<u8> {
    let max = f32::from(max.max(1));
    let halves: Vec<f16> = samples
        .iter()
        .map(|&s| f16::from_f32(f32::from(s) / max))
        .collect();
    bytemuck::cast_slice(&halves).to_vec()
}

impl TextureStore for TextureArena {
    fn create_lookup_texture(
        &mut self,
        table: &[Rgba; LOOKUP_SIZE],
    ) -> voxscope_core::Result<TextureHandle> {
        let size = wgpu::Extent3d {
            width: LOOKUP_SIZE as u32,
            height: 1,
            depth_or_array_layers: 1,
        };
        self.create_filled(
            "transfer function",
            TextureKind::Lookup,
            wgpu::TextureDimension::D1,
            wgpu::TextureFormat::Rgba8Unorm,
            size,
            4,
            table.as_flattened(),
        )
    }

    fn create_volume_texture(&mut self, grid: &VoxelGrid) -> voxscope_core::Result<TextureHandle> {
        let resolution = grid.resolution();
        let limit = self.device.limits().max_texture_dimension_3d;
        if resolution.max_element() > limit {
            return Err(VoxscopeError::TextureCreation(format!(
                "volume {}x{}x{} exceeds the device limit of {limit} texels per axis",
                resolution.x, resolution.y, resolution.z
            )));
        }
        let size = wgpu::Extent3d {
            width: resolution.x,
            height: resolution.y,
            depth_or_array_layers: resolution.z,
        };
        match grid.voxels() {
            Voxels::U8(samples) => self.create_filled(
                "volume",
                TextureKind::Volume,
                wgpu::TextureDimension::D3,
                wgpu::TextureFormat::R8Unorm,
                size,
                1,
                samples,
            ),
            Voxels::U16(samples) => {
                let texels = normalized_half_floats(samples, grid.max_sample());
                self.create_filled(
                    "volume",
                    TextureKind::Volume,
                    wgpu::TextureDimension::D3,
                    wgpu::TextureFormat::R16Float,
                    size,
                    2,
                    &texels,
                )
            }
        }
    }

    fn release(&mut self, handle: TextureHandle) -> bool {
        match self.textures.remove(handle) {
            Some(texture) => {
                texture.texture.destroy();
                true
            }
            None => false,
        }
    }

    fn contains(&self, handle: TextureHandle) -> bool {
        self.textures.contains_key(handle)
    }
}

impl Drop for TextureArena {
    fn drop(&mut self) {
        self.clear();
    }
}
