//! Texture handles and the storage contract behind them.
//!
//! Volume and lookup textures are addressed through generation-checked
//! [`TextureHandle`]s. Releasing a handle invalidates it, so a stale handle
//! held by a closed volume resolves to nothing instead of a reused slot.

use glam::UVec3;
use slotmap::{new_key_type, SlotMap};

use crate::transfer_function::{Rgba, LOOKUP_SIZE};
use crate::voxel_grid::{VoxelGrid, Voxels};
use crate::Result;

new_key_type! {
    /// Handle to a texture owned by a [`TextureStore`].
    pub struct TextureHandle;
}

/// Owner of the textures the renderer samples.
pub trait TextureStore {
    /// Creates a 1D RGBA lookup texture from a transfer function table.
    fn create_lookup_texture(&mut self, table: &[Rgba; LOOKUP_SIZE]) -> Result<TextureHandle>;

    /// Creates a 3D single-channel texture holding a voxel grid.
    fn create_volume_texture(&mut self, grid: &VoxelGrid) -> Result<TextureHandle>;

    /// Frees a texture. Returns false if the handle was already stale.
    fn release(&mut self, handle: TextureHandle) -> bool;

    /// Returns true if the handle refers to a live texture.
    fn contains(&self, handle: TextureHandle) -> bool;
}

/// A texture kept in host memory.
#[derive(Debug, Clone, PartialEq)]
pub enum HostTexture {
    /// Transfer function lookup table.
    Lookup(Box<[Rgba; LOOKUP_SIZE]>),
    /// Voxel grid normalized to 8 bits per sample.
    Volume {
        /// Grid resolution.
        resolution: UVec3,
        /// Samples, X fastest.
        texels: Vec<u8>,
    },
}

/// [`TextureStore`] keeping textures in host memory.
///
/// Used when no graphics device is present and to observe texture
/// lifetimes in tests.
#[derive(Debug, Default)]
pub struct HostTextureStore {
    textures: SlotMap<TextureHandle, HostTexture>,
}

impl HostTextureStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live textures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Returns true if no textures are alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Looks up a live texture.
    #[must_use]
    pub fn get(&self, handle: TextureHandle) -> Option<&HostTexture> {
        self.textures.get(handle)
    }

    /// Looks up a live lookup table.
    #[must_use]
    pub fn lookup_table(&self, handle: TextureHandle) -> Option<&[Rgba; LOOKUP_SIZE]> {
        match self.textures.get(handle)? {
            HostTexture::Lookup(table) => Some(table),
            HostTexture::Volume { .. } => None,
        }
    }
}

impl TextureStore for HostTextureStore {
    fn create_lookup_texture(&mut self, table: &[Rgba; LOOKUP_SIZE]) -> Result<TextureHandle> {
        Ok(self.textures.insert(HostTexture::Lookup(Box::new(*table))))
    }

    fn create_volume_texture(&mut self, grid: &VoxelGrid) -> Result<TextureHandle> {
        let texels = match grid.voxels() {
            Voxels::U8(samples) => samples.clone(),
            Voxels::U16(samples) => {
                let max = u32::from(grid.max_sample().max(1));
                samples
                    .iter()
                    .map(|&s| u8::try_from(u32::from(s) * 255 / max).unwrap_or(u8::MAX))
                    .collect()
            }
        };
        Ok(self.textures.insert(HostTexture::Volume {
            resolution: grid.resolution(),
            texels,
        }))
    }

    fn release(&mut self, handle: TextureHandle) -> bool {
        self.textures.remove(handle).is_some()
    }

    fn contains(&self, handle: TextureHandle) -> bool {
        self.textures.contains_key(handle)
    }
}
