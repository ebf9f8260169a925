//! Configuration options for voxscope.

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::Result;

/// How the voxel grid is sampled when drawing slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SamplingMode {
    /// View-aligned slices sampling a single 3D texture.
    #[default]
    Volume,
    /// One object-aligned slice per voxel layer along Z.
    SliceStack,
}

impl SamplingMode {
    /// Value passed to the slice shader as `u_mode`.
    #[must_use]
    pub fn shader_value(self) -> i32 {
        match self {
            SamplingMode::Volume => 0,
            SamplingMode::SliceStack => 1,
        }
    }
}

/// Global configuration options for voxscope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Window title.
    pub window_title: String,

    /// Initial framebuffer width in pixels.
    pub window_width: u32,

    /// Initial framebuffer height in pixels.
    pub window_height: u32,

    /// Background color.
    pub background_color: Vec3,

    /// Multiplier on the number of slices drawn per volume.
    pub slice_density: f32,

    /// Slice sampling mode.
    pub sampling_mode: SamplingMode,

    /// Scale applied to per-slice opacity.
    pub opacity_scale: f32,

    /// Whether the transfer function editor is visible at start.
    pub show_gui: bool,

    /// Camera travel speed in world units per second.
    pub move_speed: f32,

    /// Directory screenshots are written to.
    pub screenshot_dir: PathBuf,

    /// Optional WGSL file that replaces the built-in slice shader.
    pub shader_path: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            window_title: "voxscope".to_string(),
            window_width: 1280,
            window_height: 720,
            background_color: Vec3::new(0.1, 0.1, 0.1),
            slice_density: 1.0,
            sampling_mode: SamplingMode::Volume,
            opacity_scale: 1.0,
            show_gui: true,
            move_speed: 1.0,
            screenshot_dir: PathBuf::from("."),
            shader_path: None,
        }
    }
}

impl Options {
    /// Loads options from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let options: Self = serde_json::from_str(&text)?;
        Ok(options.sanitized())
    }

    /// Serializes the options as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Clamps values that would make rendering degenerate.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        if !self.slice_density.is_finite() || self.slice_density <= 0.0 {
            log::warn!(
                "slice density {} is invalid, using 1.0",
                self.slice_density
            );
            self.slice_density = 1.0;
        }
        if !self.opacity_scale.is_finite() || self.opacity_scale <= 0.0 {
            log::warn!(
                "opacity scale {} is invalid, using 1.0",
                self.opacity_scale
            );
            self.opacity_scale = 1.0;
        }
        self.move_speed = self.move_speed.max(0.01);
        self.window_width = self.window_width.max(1);
        self.window_height = self.window_height.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults() {
        let options = Options::default();
        assert_eq!(options.sampling_mode, SamplingMode::Volume);
        assert!(options.show_gui);
        assert!((options.slice_density - 1.0).abs() < f32::EPSILON);
        assert!(options.shader_path.is_none());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options: Options =
            serde_json::from_str(r#"{ "slice_density": 2.5, "sampling_mode": "slice-stack" }"#)
                .unwrap();
        assert!((options.slice_density - 2.5).abs() < f32::EPSILON);
        assert_eq!(options.sampling_mode, SamplingMode::SliceStack);
        assert_eq!(options.window_width, 1280);
    }

    #[test]
    fn test_sanitized_clamps_invalid_values() {
        let options = Options {
            slice_density: 0.0,
            opacity_scale: f32::NAN,
            window_width: 0,
            ..Options::default()
        }
        .sanitized();
        assert!((options.slice_density - 1.0).abs() < f32::EPSILON);
        assert!((options.opacity_scale - 1.0).abs() < f32::EPSILON);
        assert_eq!(options.window_width, 1);
    }

    #[test]
    fn test_json_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("voxscope_options_{}.json", std::process::id()));
        let options = Options {
            window_title: "ct scan".to_string(),
            show_gui: false,
            ..Options::default()
        };
        std::fs::write(&path, options.to_json().unwrap()).unwrap();
        let loaded = Options::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.window_title, "ct scan");
        assert!(!loaded.show_gui);
    }
}
