//! The voxel volume entity: data, placement, reload lifecycle and slice drawing.

use glam::{Mat4, Quat, UVec3, Vec3};

use crate::loader::{FileLoader, VolumeLoader, VolumeSource};
use crate::options::SamplingMode;
use crate::placement::Placement;
use crate::resource::{TextureHandle, TextureStore};
use crate::shader::{names, ShaderProgram, Uniform};
use crate::voxel_grid::VoxelGrid;

/// Texture slot the voxel grid is bound to.
pub const VOLUME_TEXTURE_SLOT: u32 = 0;

/// Texture slot the transfer function lookup is bound to.
pub const TRANSFER_FUNCTION_SLOT: u32 = 1;

/// Plain data owned by a [`VoxelVolume`].
#[derive(Debug, Default)]
pub struct VolumeData {
    /// Source the data was loaded from.
    pub source: VolumeSource,
    /// Loaded grid. `None` while closed.
    pub grid: Option<VoxelGrid>,
    /// Placement in world space.
    pub placement: Placement,
    /// Texture holding the grid.
    pub texture: Option<TextureHandle>,
}

impl VolumeData {
    /// Returns true if a grid is loaded and uploaded.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.grid.is_some() && self.texture.is_some()
    }
}

/// Slice drawing parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceSettings {
    /// Multiplier on the number of slices.
    pub density: f32,
    /// How slices sample the grid.
    pub mode: SamplingMode,
    /// Scale applied to per-slice opacity.
    pub opacity: f32,
}

impl Default for SliceSettings {
    fn default() -> Self {
        Self {
            density: 1.0,
            mode: SamplingMode::Volume,
            opacity: 1.0,
        }
    }
}

/// A scalar volume that can be loaded, placed and drawn as translucent slices.
pub struct VoxelVolume {
    data: VolumeData,
    loader: Box<dyn VolumeLoader>,
    enabled: bool,
    settings: SliceSettings,
}

impl Default for VoxelVolume {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for VoxelVolume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoxelVolume")
            .field("data", &self.data)
            .field("enabled", &self.enabled)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl VoxelVolume {
    /// Creates a closed volume that reads files from disk.
    #[must_use]
    pub fn new() -> Self {
        Self::with_loader(FileLoader)
    }

    /// Creates a closed volume with a custom loader.
    pub fn with_loader(loader: impl VolumeLoader + 'static) -> Self {
        Self {
            data: VolumeData::default(),
            loader: Box::new(loader),
            enabled: true,
            settings: SliceSettings::default(),
        }
    }

    /// Records a new source and reloads.
    pub fn set_path(&mut self, source: VolumeSource, store: &mut dyn TextureStore) -> bool {
        self.data.source = source;
        self.reload(store)
    }

    /// Clears the volume and loads it again from its source.
    ///
    /// The previous texture is released first. A missing path leaves the
    /// volume closed. A failed load is logged and also leaves it closed.
    /// On success the placement returns to the identity pose. Returns
    /// whether the volume is open afterwards.
    pub fn reload(&mut self, store: &mut dyn TextureStore) -> bool {
        self.close(store);

        if self.data.source.is_empty() {
            log::debug!("volume has no path, staying closed");
            return false;
        }

        let grid = match self.loader.load(&self.data.source) {
            Ok(grid) => grid,
            Err(e) => {
                log::error!(
                    "could not load volume '{}': {e}",
                    self.data.source.path.display()
                );
                return false;
            }
        };
        let texture = match store.create_volume_texture(&grid) {
            Ok(texture) => texture,
            Err(e) => {
                log::error!("could not upload volume '{}': {e}", self.data.source.name());
                return false;
            }
        };

        let resolution = grid.resolution();
        self.data.placement = Placement::new(grid.extent());
        self.data.grid = Some(grid);
        self.data.texture = Some(texture);
        log::info!(
            "opened volume '{}' ({}x{}x{}, {}-bit)",
            self.data.source.name(),
            resolution.x,
            resolution.y,
            resolution.z,
            self.data.grid.as_ref().map_or(0, |g| g.voxels().bits()),
        );
        true
    }

    /// Releases the texture and forgets the grid.
    pub fn close(&mut self, store: &mut dyn TextureStore) {
        if let Some(texture) = self.data.texture.take() {
            store.release(texture);
        }
        if self.data.grid.take().is_some() {
            log::debug!("closed volume '{}'", self.data.source.name());
        }
        self.data.placement = Placement::default();
    }

    /// Returns the placement to the identity pose.
    pub fn reset_geometry(&mut self) {
        self.data.placement.reset();
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.data.placement.translate(delta);
    }

    /// Rotates by Euler angles in degrees.
    pub fn rotate_euler(&mut self, degrees: Vec3) {
        self.data.placement.rotate_euler(degrees);
    }

    /// Left-composes a rotation.
    pub fn rotate(&mut self, rotation: Quat) {
        self.data.placement.rotate(rotation);
    }

    /// Multiplies the scale. Non-finite components become 0.001.
    pub fn scale(&mut self, factor: Vec3) {
        self.data.placement.scale(factor);
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.data.placement.set_position(position);
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.data.placement.set_rotation(rotation);
    }

    pub fn set_rotation_euler(&mut self, degrees: Vec3) {
        self.data.placement.set_rotation_euler(degrees);
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.data.placement.set_scale(scale);
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Sets the slice drawing parameters. Invalid density or opacity is ignored.
    pub fn set_slice_settings(&mut self, settings: SliceSettings) {
        if settings.density.is_finite() && settings.density > 0.0 {
            self.settings.density = settings.density;
        }
        if settings.opacity.is_finite() && settings.opacity > 0.0 {
            self.settings.opacity = settings.opacity;
        }
        self.settings.mode = settings.mode;
    }

    #[must_use]
    pub fn slice_settings(&self) -> SliceSettings {
        self.settings
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.data.is_open()
    }

    #[must_use]
    pub fn source(&self) -> &VolumeSource {
        &self.data.source
    }

    /// File name of the volume.
    #[must_use]
    pub fn name(&self) -> String {
        self.data.source.name()
    }

    /// Borrows the underlying data.
    #[must_use]
    pub fn data(&self) -> &VolumeData {
        &self.data
    }

    /// Grid resolution, zero while closed.
    #[must_use]
    pub fn resolution(&self) -> UVec3 {
        self.open_grid().map_or(UVec3::ZERO, VoxelGrid::resolution)
    }

    /// Position, origin while closed.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.open_placement().map_or(Vec3::ZERO, Placement::position)
    }

    /// Rotation, identity while closed.
    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.open_placement()
            .map_or(Quat::IDENTITY, Placement::rotation)
    }

    /// Rotation as Euler angles in degrees, zero while closed.
    #[must_use]
    pub fn rotation_degrees(&self) -> Vec3 {
        self.open_placement()
            .map_or(Vec3::ZERO, Placement::rotation_degrees)
    }

    /// Scale, unit while closed.
    #[must_use]
    pub fn scale_factor(&self) -> Vec3 {
        self.open_placement()
            .map_or(Vec3::ONE, Placement::scale_factor)
    }

    /// Model matrix, identity while closed.
    #[must_use]
    pub fn model_matrix(&self) -> Mat4 {
        self.open_placement()
            .map_or(Mat4::IDENTITY, Placement::model_matrix)
    }

    /// World to texture space matrix, identity while closed.
    #[must_use]
    pub fn sampling_matrix(&self) -> Mat4 {
        self.open_placement()
            .map_or(Mat4::IDENTITY, Placement::sampling_matrix)
    }

    /// Radius of the sphere enclosing the placed volume, zero while closed.
    #[must_use]
    pub fn bounding_radius(&self) -> f32 {
        self.open_placement()
            .map_or(0.0, Placement::bounding_radius)
    }

    /// Slice coordinates in drawing order, from -0.5 (farthest) to 0.5.
    ///
    /// View-aligned slices are spaced `1 / (diagonal · density)` apart, with
    /// the diagonal measured in voxels. Stacked slices sit on voxel layer
    /// centers along Z.
    #[must_use]
    pub fn slice_positions(&self) -> Vec<f32> {
        let Some(grid) = self.open_grid() else {
            return Vec::new();
        };
        match self.settings.mode {
            SamplingMode::Volume => {
                let steps = (grid.diagonal() * self.settings.density).max(1.0);
                let step = 1.0 / steps;
                (0..=steps.floor() as usize)
                    .map(|i| -0.5 + i as f32 * step)
                    .collect()
            }
            SamplingMode::SliceStack => {
                let layers = grid.resolution().z;
                (0..layers)
                    .map(|i| (i as f32 + 0.5) / layers as f32 - 0.5)
                    .collect()
            }
        }
    }

    /// Draws the volume as back-to-front slices.
    ///
    /// Does nothing if disabled, closed, or the program is absent or
    /// invalid. Blending and depth state belong to the caller.
    pub fn draw(&self, program: Option<&mut dyn ShaderProgram>) {
        let Some(program) = program else {
            return;
        };
        if !self.enabled || !program.is_valid() {
            return;
        }
        let (Some(placement), Some(texture)) = (self.open_placement(), self.data.texture) else {
            return;
        };

        let slices = self.slice_positions();
        let opacity = match self.settings.mode {
            SamplingMode::Volume => self.settings.opacity / self.settings.density,
            SamplingMode::SliceStack => self.settings.opacity,
        };

        program.use_program();
        program.set_uniform(names::MODEL_MATRIX, placement.model_matrix().into());
        program.set_uniform(names::VOLUME_MATRIX, placement.sampling_matrix().into());
        program.set_uniform(names::VOLUME_TEXTURE, Uniform::Int(VOLUME_TEXTURE_SLOT as i32));
        program.set_uniform(names::MODE, Uniform::Int(self.settings.mode.shader_value()));
        program.set_uniform(names::RADIUS, Uniform::Float(placement.bounding_radius()));
        program.set_uniform(names::OPACITY, Uniform::Float(opacity));
        program.bind_texture(VOLUME_TEXTURE_SLOT, texture);

        for slice in slices {
            program.set_uniform(names::SLICE, Uniform::Float(slice));
            program.draw_quad();
        }
    }

    fn open_grid(&self) -> Option<&VoxelGrid> {
        self.data.texture.and(self.data.grid.as_ref())
    }

    fn open_placement(&self) -> Option<&Placement> {
        self.data.is_open().then_some(&self.data.placement)
    }
}
