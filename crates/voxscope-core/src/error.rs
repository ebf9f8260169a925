//! Error types for voxscope.

use thiserror::Error;

/// The main error type for voxscope operations.
#[derive(Error, Debug)]
pub enum VoxscopeError {
    /// The volume format could not be determined.
    #[error("unknown volume format for '{0}'")]
    UnknownFormat(String),

    /// A headerless format was requested without width, height and depth.
    #[error("volume '{0}' needs width, height and depth hints")]
    MissingDimensions(String),

    /// The grid resolution has a zero axis.
    #[error("invalid volume resolution {0}x{1}x{2}")]
    EmptyResolution(u32, u32, u32),

    /// The grid resolution has more voxels than fit in memory addressing.
    #[error("volume resolution {0}x{1}x{2} is too large")]
    ResolutionTooLarge(u32, u32, u32),

    /// The file holds fewer voxel bytes than its resolution requires.
    #[error("volume data truncated: expected {expected} bytes, got {actual}")]
    TruncatedData { expected: usize, actual: usize },

    /// A voxel buffer does not match the declared resolution.
    #[error("data size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// A volume header could not be parsed.
    #[error("malformed volume header: {0}")]
    MalformedHeader(String),

    /// The volume file uses a compression scheme that is not supported.
    #[error("unsupported compression in '{0}'")]
    UnsupportedCompression(String),

    /// A shader program failed to compile or link.
    #[error("shader link failed: {0}")]
    ShaderLink(String),

    /// A texture could not be created.
    #[error("texture creation failed: {0}")]
    TextureCreation(String),

    /// Rendering error.
    #[error("render error: {0}")]
    RenderError(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for voxscope operations.
pub type Result<T> = std::result::Result<T, VoxscopeError>;
