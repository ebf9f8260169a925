//! Shader program contract used by the drawable components.

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::resource::TextureHandle;
use crate::Result;

/// Uniform names shared by the slice shader and the components that drive it.
pub mod names {
    /// Model matrix of the volume.
    pub const MODEL_MATRIX: &str = "u_model_mat";
    /// World to texture space matrix.
    pub const VOLUME_MATRIX: &str = "u_volume_mat";
    /// Texture slot of the voxel grid.
    pub const VOLUME_TEXTURE: &str = "u_tex";
    /// Texture slot of the transfer function lookup.
    pub const TRANSFER_FUNCTION: &str = "u_trans_func";
    /// Current slice coordinate in [-0.5, 0.5].
    pub const SLICE: &str = "u_slice";
    /// Sampling mode, see [`crate::SamplingMode::shader_value`].
    pub const MODE: &str = "u_mode";
    /// Radius of the sphere bounding the placed volume.
    pub const RADIUS: &str = "u_radius";
    /// Per-slice opacity exponent.
    pub const OPACITY: &str = "u_opacity";
}

/// A value assignable to a shader uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Uniform {
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

impl From<i32> for Uniform {
    fn from(value: i32) -> Self {
        Uniform::Int(value)
    }
}

impl From<f32> for Uniform {
    fn from(value: f32) -> Self {
        Uniform::Float(value)
    }
}

impl From<Vec2> for Uniform {
    fn from(value: Vec2) -> Self {
        Uniform::Vec2(value)
    }
}

impl From<Vec3> for Uniform {
    fn from(value: Vec3) -> Self {
        Uniform::Vec3(value)
    }
}

impl From<Vec4> for Uniform {
    fn from(value: Vec4) -> Self {
        Uniform::Vec4(value)
    }
}

impl From<Mat4> for Uniform {
    fn from(value: Mat4) -> Self {
        Uniform::Mat4(value)
    }
}

/// A compiled shader program that components draw through.
///
/// Components never compile shaders themselves. They check [`is_valid`]
/// and treat an invalid program as a no-op target.
///
/// [`is_valid`]: ShaderProgram::is_valid
pub trait ShaderProgram {
    /// Makes this program the target of subsequent calls.
    fn use_program(&mut self);

    /// Returns true if the last link succeeded.
    fn is_valid(&self) -> bool;

    /// Assigns a uniform by name. Unknown names are ignored.
    fn set_uniform(&mut self, name: &str, value: Uniform);

    /// Binds a texture to a slot.
    fn bind_texture(&mut self, slot: u32, texture: TextureHandle);

    /// Issues one unit-quad draw with the current uniforms.
    fn draw_quad(&mut self);

    /// Recompiles the program from its sources.
    fn link(&mut self) -> Result<()>;
}
