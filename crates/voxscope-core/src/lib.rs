//! Core volume model for voxscope.
//!
//! This crate holds everything that does not need a graphics device:
//! - [`TransferFunction`]: control nodes and the 256-entry lookup table
//! - [`VoxelVolume`]: voxel data, placement and slice drawing
//! - [`Trackball`]: cursor to rotation/translation mapping
//! - [`Interaction`]: routing of host input events to the above
//! - [`ShaderProgram`] and [`TextureStore`]: contracts implemented by the renderer

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
// Pixel and level arithmetic converts between integers and floats constantly
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod gui;
pub mod interaction;
pub mod loader;
pub mod options;
pub mod placement;
pub mod resource;
pub mod scene;
pub mod shader;
pub mod trackball;
pub mod transfer_function;
pub mod volume;
pub mod voxel_grid;

pub use error::{Result, VoxscopeError};
pub use gui::{GuiGeometry, GuiLayout, GuiVertex, HitRegion};
pub use interaction::{Command, InputEvent, Interaction, Key, MouseButton};
pub use loader::{parse_volume, FileLoader, VolumeFormat, VolumeLoader, VolumeSource};
pub use options::{Options, SamplingMode};
pub use placement::Placement;
pub use resource::{HostTexture, HostTextureStore, TextureHandle, TextureStore};
pub use scene::Scene;
pub use shader::{names as uniform_names, ShaderProgram, Uniform};
pub use trackball::Trackball;
pub use transfer_function::{Rgba, TransferFunction, LOOKUP_SIZE};
pub use volume::{
    SliceSettings, VolumeData, VoxelVolume, TRANSFER_FUNCTION_SLOT, VOLUME_TEXTURE_SLOT,
};
pub use voxel_grid::{VoxelGrid, Voxels};

// Re-export glam types for convenience
pub use glam::{Mat4, Quat, UVec3, Vec2, Vec3, Vec4};
