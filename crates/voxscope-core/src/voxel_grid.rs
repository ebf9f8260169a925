//! Regular voxel grids produced by the volume loaders.

use glam::{UVec3, Vec3};

use crate::{Result, VoxscopeError};

/// Voxel samples, stored with X varying fastest, then Y, then Z.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Voxels {
    /// 8-bit samples.
    U8(Vec<u8>),
    /// 16-bit samples.
    U16(Vec<u16>),
}

impl Voxels {
    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Voxels::U8(v) => v.len(),
            Voxels::U16(v) => v.len(),
        }
    }

    /// Returns true if there are no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bits per sample.
    #[must_use]
    pub fn bits(&self) -> u32 {
        match self {
            Voxels::U8(_) => 8,
            Voxels::U16(_) => 16,
        }
    }
}

/// An immutable regular grid of scalar samples.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelGrid {
    resolution: UVec3,
    spacing: Vec3,
    voxels: Voxels,
}

impl VoxelGrid {
    /// Creates a grid, checking that the sample count matches the resolution.
    pub fn new(resolution: UVec3, voxels: Voxels) -> Result<Self> {
        if resolution.min_element() == 0 {
            return Err(VoxscopeError::EmptyResolution(
                resolution.x,
                resolution.y,
                resolution.z,
            ));
        }
        let expected = voxel_count(resolution).ok_or(VoxscopeError::ResolutionTooLarge(
            resolution.x,
            resolution.y,
            resolution.z,
        ))?;
        if voxels.len() != expected {
            return Err(VoxscopeError::SizeMismatch {
                expected,
                actual: voxels.len(),
            });
        }
        Ok(Self {
            resolution,
            spacing: Vec3::ONE,
            voxels,
        })
    }

    /// Sets the physical voxel spacing. Non-positive components become 1.
    #[must_use]
    pub fn with_spacing(mut self, spacing: Vec3) -> Self {
        self.spacing = Vec3::from_array(
            spacing
                .to_array()
                .map(|s| if s.is_finite() && s > 0.0 { s } else { 1.0 }),
        );
        self
    }

    /// Grid resolution in voxels.
    #[must_use]
    pub fn resolution(&self) -> UVec3 {
        self.resolution
    }

    /// Physical voxel spacing.
    #[must_use]
    pub fn spacing(&self) -> Vec3 {
        self.spacing
    }

    /// The raw samples.
    #[must_use]
    pub fn voxels(&self) -> &Voxels {
        &self.voxels
    }

    /// Length of the grid diagonal measured in voxels.
    #[must_use]
    pub fn diagonal(&self) -> f32 {
        self.resolution.as_vec3().length()
    }

    /// Physical size of the grid normalized so its diagonal is 1.
    #[must_use]
    pub fn extent(&self) -> Vec3 {
        let size = self.resolution.as_vec3() * self.spacing;
        size / size.length()
    }

    /// Largest sample value, used to normalize 16-bit data.
    #[must_use]
    pub fn max_sample(&self) -> u16 {
        match &self.voxels {
            Voxels::U8(v) => v.iter().copied().max().map_or(0, u16::from),
            Voxels::U16(v) => v.iter().copied().max().unwrap_or(0),
        }
    }

    /// Sample at a voxel coordinate, normalized to [0, 1].
    #[must_use]
    pub fn normalized(&self, x: u32, y: u32, z: u32) -> Option<f32> {
        if x >= self.resolution.x || y >= self.resolution.y || z >= self.resolution.z {
            return None;
        }
        let index = (z as usize * self.resolution.y as usize + y as usize)
            * self.resolution.x as usize
            + x as usize;
        match &self.voxels {
            Voxels::U8(v) => v.get(index).map(|&s| f32::from(s) / 255.0),
            Voxels::U16(v) => {
                let max = f32::from(self.max_sample().max(1));
                v.get(index).map(|&s| f32::from(s) / max)
            }
        }
    }
}

/// Number of voxels in a grid of the given resolution, or `None` if it
/// does not fit in `usize`.
#[must_use]
pub fn voxel_count(resolution: UVec3) -> Option<usize> {
    sample_bytes(resolution, 1)
}

/// Byte length of a grid stored with `bytes_per_sample` bytes per voxel.
#[must_use]
pub fn sample_bytes(resolution: UVec3, bytes_per_sample: usize) -> Option<usize> {
    [resolution.x, resolution.y, resolution.z]
        .into_iter()
        .try_fold(bytes_per_sample, |acc, n| acc.checked_mul(usize::try_from(n).ok()?))
}
