//! Rendering backend for voxscope.
//!
//! This crate provides the wgpu-based rendering engine, including:
//! - the graphics context, windowed or headless ([`RenderEngine`])
//! - GPU textures behind the core texture contract ([`TextureArena`])
//! - the volume slice pass implementing the core shader contract ([`SlicePass`])
//! - the transfer function editor overlay ([`GuiPass`])
//! - camera and screenshot encoding

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
// wgpu descriptors spell out `Default::default()` for compilation options
#![allow(clippy::default_trait_access)]

pub mod buffer;
pub mod camera;
pub mod engine;
pub mod error;
pub mod gui_pass;
pub mod renderer;
pub mod screenshot;
pub mod slice_pass;
pub mod textures;

pub use camera::{Camera, ProjectionMode, BOOST_FACTOR};
pub use engine::{CameraUniforms, FrameTarget, RenderEngine};
pub use error::{RenderError, RenderResult};
pub use gui_pass::{GuiPass, ScreenUniforms};
pub use renderer::SceneRenderer;
pub use screenshot::{save_image, save_to_buffer, timestamped_filename, ScreenshotError};
pub use slice_pass::{SliceInstance, SlicePass};
pub use textures::{GpuTexture, TextureArena, TextureKind};
