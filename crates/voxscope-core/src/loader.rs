//! Volume file formats and loaders.
//!
//! Supported inputs:
//! - `Raw8` / `Raw16`: headerless little-endian samples, resolution given by hints.
//! - `Raw`: three little-endian `u16` (x, y, z) followed by `u16` samples.
//! - `Pvm`: uncompressed `PVM`, `PVM2` or `PVM3` files. 16-bit PVM samples are big-endian.

use std::fmt;
use std::path::{Path, PathBuf};

use glam::{UVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::voxel_grid::{sample_bytes, VoxelGrid, Voxels};
use crate::{Result, VoxscopeError};

/// Volume file format tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum VolumeFormat {
    /// Headerless 8-bit samples.
    Raw8,
    /// Headerless 16-bit little-endian samples.
    Raw16,
    /// Self-describing 16-bit raw file.
    Raw,
    /// PVM volume.
    Pvm,
    /// Unrecognized format.
    #[default]
    Unknown,
}

impl VolumeFormat {
    /// Guesses the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "raw" => VolumeFormat::Raw,
            "pvm" => VolumeFormat::Pvm,
            _ => VolumeFormat::Unknown,
        }
    }

    /// Returns true if the resolution is read from the file itself.
    #[must_use]
    pub fn is_self_describing(self) -> bool {
        matches!(self, VolumeFormat::Raw | VolumeFormat::Pvm)
    }
}

impl fmt::Display for VolumeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VolumeFormat::Raw8 => "raw8",
            VolumeFormat::Raw16 => "raw16",
            VolumeFormat::Raw => "raw",
            VolumeFormat::Pvm => "pvm",
            VolumeFormat::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Where a volume comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VolumeSource {
    /// File path. Empty means no volume.
    pub path: PathBuf,
    /// File format.
    pub format: VolumeFormat,
    /// Width hint for headerless formats.
    pub width: Option<u32>,
    /// Height hint for headerless formats.
    pub height: Option<u32>,
    /// Depth hint for headerless formats.
    pub depth: Option<u32>,
}

impl VolumeSource {
    /// Creates a source for a self-describing file.
    pub fn new(path: impl Into<PathBuf>, format: VolumeFormat) -> Self {
        Self {
            path: path.into(),
            format,
            ..Self::default()
        }
    }

    /// Adds resolution hints.
    #[must_use]
    pub fn with_dimensions(mut self, width: u32, height: u32, depth: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self.depth = Some(depth);
        self
    }

    /// Returns true if no path is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.path.as_os_str().is_empty()
    }

    /// File name component of the path.
    #[must_use]
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Resolution hints, if all three are present.
    #[must_use]
    pub fn dimensions(&self) -> Option<UVec3> {
        Some(UVec3::new(self.width?, self.height?, self.depth?))
    }
}

/// Produces a voxel grid from a source.
pub trait VolumeLoader {
    /// Loads the grid described by `source`.
    fn load(&self, source: &VolumeSource) -> Result<VoxelGrid>;
}

/// Loads volumes from the file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl VolumeLoader for FileLoader {
    fn load(&self, source: &VolumeSource) -> Result<VoxelGrid> {
        if source.format == VolumeFormat::Unknown {
            return Err(VoxscopeError::UnknownFormat(source.path.display().to_string()));
        }
        let bytes = std::fs::read(&source.path)?;
        log::debug!(
            "read {} bytes from {}",
            bytes.len(),
            source.path.display()
        );
        parse_volume(&bytes, source)
    }
}

/// Decodes an in-memory volume file.
pub fn parse_volume(bytes: &[u8], source: &VolumeSource) -> Result<VoxelGrid> {
    let name = || source.path.display().to_string();
    match source.format {
        VolumeFormat::Raw8 => {
            let resolution = source
                .dimensions()
                .ok_or_else(|| VoxscopeError::MissingDimensions(name()))?;
            let samples = take(bytes, payload_len(resolution, 1)?)?;
            VoxelGrid::new(resolution, Voxels::U8(samples.to_vec()))
        }
        VolumeFormat::Raw16 => {
            let resolution = source
                .dimensions()
                .ok_or_else(|| VoxscopeError::MissingDimensions(name()))?;
            let samples = take(bytes, payload_len(resolution, 2)?)?;
            VoxelGrid::new(resolution, Voxels::U16(decode_u16(samples, u16::from_le_bytes)))
        }
        VolumeFormat::Raw => parse_raw(bytes),
        VolumeFormat::Pvm => parse_pvm(bytes, &name()),
        VolumeFormat::Unknown => Err(VoxscopeError::UnknownFormat(name())),
    }
}

fn parse_raw(bytes: &[u8]) -> Result<VoxelGrid> {
    let header = take(bytes, 6)?;
    let dims: Vec<u32> = decode_u16(header, u16::from_le_bytes)
        .into_iter()
        .map(u32::from)
        .collect();
    let resolution = UVec3::new(dims[0], dims[1], dims[2]);
    let samples = take(&bytes[6..], payload_len(resolution, 2)?)?;
    VoxelGrid::new(resolution, Voxels::U16(decode_u16(samples, u16::from_le_bytes)))
}

fn parse_pvm(bytes: &[u8], name: &str) -> Result<VoxelGrid> {
    if bytes.starts_with(b"DDS ") {
        return Err(VoxscopeError::UnsupportedCompression(name.to_string()));
    }

    let mut cursor = HeaderCursor::new(bytes);
    let magic = cursor.line()?;
    let has_spacing = match magic.trim() {
        "PVM" => false,
        "PVM2" | "PVM3" => true,
        other => {
            return Err(VoxscopeError::MalformedHeader(format!(
                "unexpected PVM magic '{other}'"
            )))
        }
    };

    let [x, y, z]: [u32; 3] = cursor.numbers()?;
    let spacing = if has_spacing {
        let [sx, sy, sz]: [f32; 3] = cursor.numbers()?;
        Vec3::new(sx, sy, sz)
    } else {
        Vec3::ONE
    };
    let [components]: [u32; 1] = cursor.numbers()?;

    let resolution = UVec3::new(x, y, z);
    let data = cursor.rest();
    let grid = match components {
        1 => {
            let samples = take(data, payload_len(resolution, 1)?)?;
            VoxelGrid::new(resolution, Voxels::U8(samples.to_vec()))?
        }
        2 => {
            let samples = take(data, payload_len(resolution, 2)?)?;
            VoxelGrid::new(resolution, Voxels::U16(decode_u16(samples, u16::from_be_bytes)))?
        }
        other => {
            return Err(VoxscopeError::MalformedHeader(format!(
                "unsupported PVM sample size {other}"
            )))
        }
    };
    Ok(grid.with_spacing(spacing))
}

/// Bytes of voxel payload a header declares.
fn payload_len(resolution: UVec3, bytes_per_sample: usize) -> Result<usize> {
    sample_bytes(resolution, bytes_per_sample).ok_or_else(|| {
        VoxscopeError::MalformedHeader(format!(
            "resolution {}x{}x{} is too large",
            resolution.x, resolution.y, resolution.z
        ))
    })
}

fn take(bytes: &[u8], len: usize) -> Result<&[u8]> {
    bytes.get(..len).ok_or(VoxscopeError::TruncatedData {
        expected: len,
        actual: bytes.len(),
    })
}

fn decode_u16(bytes: &[u8], decode: fn([u8; 2]) -> u16) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|pair| decode([pair[0], pair[1]]))
        .collect()
}

/// Reads newline-terminated ASCII header lines.
struct HeaderCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> HeaderCursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn line(&mut self) -> Result<&'a str> {
        let rest = &self.bytes[self.offset..];
        let end = rest
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| VoxscopeError::MalformedHeader("unterminated header line".into()))?;
        self.offset += end + 1;
        std::str::from_utf8(&rest[..end])
            .map_err(|_| VoxscopeError::MalformedHeader("header is not ASCII".into()))
    }

    fn numbers<T: std::str::FromStr, const N: usize>(&mut self) -> Result<[T; N]> {
        let line = self.line()?;
        let values: Vec<T> = line
            .split_whitespace()
            .map(str::parse::<T>)
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| VoxscopeError::MalformedHeader(format!("bad header line '{line}'")))?;
        values.try_into().map_err(|_| {
            VoxscopeError::MalformedHeader(format!("expected {N} values in '{line}'"))
        })
    }

    fn rest(&self) -> &'a [u8] {
        &self.bytes[self.offset..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn raw_file(dims: [u16; 3], samples: &[u16]) -> Vec<u8> {
        dims.iter()
            .chain(samples)
            .flat_map(|v| v.to_le_bytes())
            .collect()
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(VolumeFormat::from_path(Path::new("a/head.PVM")), VolumeFormat::Pvm);
        assert_eq!(VolumeFormat::from_path(Path::new("b.raw")), VolumeFormat::Raw);
        assert_eq!(VolumeFormat::from_path(Path::new("c.dat")), VolumeFormat::Unknown);
    }

    #[test]
    fn test_source_name_and_dimensions() {
        let source = VolumeSource::new("data/volumes/bonsai.raw", VolumeFormat::Raw8)
            .with_dimensions(4, 5, 6);
        assert_eq!(source.name(), "bonsai.raw");
        assert_eq!(source.dimensions(), Some(UVec3::new(4, 5, 6)));
        assert!(!source.is_empty());
        assert!(VolumeSource::default().is_empty());
    }

    #[test]
    fn test_parse_raw8_with_hints() {
        let source = VolumeSource::new("v.bin", VolumeFormat::Raw8).with_dimensions(2, 2, 1);
        let grid = parse_volume(&[1, 2, 3, 4, 99], &source).unwrap();
        assert_eq!(grid.resolution(), UVec3::new(2, 2, 1));
        assert_eq!(grid.voxels(), &Voxels::U8(vec![1, 2, 3, 4]));
    }

    #[test]
    fn test_raw8_without_hints_fails() {
        let source = VolumeSource::new("v.bin", VolumeFormat::Raw8);
        assert!(matches!(
            parse_volume(&[0; 8], &source),
            Err(VoxscopeError::MissingDimensions(_))
        ));
    }

    #[test]
    fn test_parse_raw16_little_endian() {
        let source = VolumeSource::new("v.bin", VolumeFormat::Raw16).with_dimensions(2, 1, 1);
        let grid = parse_volume(&[0x34, 0x12, 0xff, 0x00], &source).unwrap();
        assert_eq!(grid.voxels(), &Voxels::U16(vec![0x1234, 0x00ff]));
    }

    #[test]
    fn test_parse_self_describing_raw() {
        let bytes = raw_file([2, 1, 2], &[10, 20, 30, 40]);
        let source = VolumeSource::new("v.raw", VolumeFormat::Raw).with_dimensions(9, 9, 9);
        let grid = parse_volume(&bytes, &source).unwrap();
        assert_eq!(grid.resolution(), UVec3::new(2, 1, 2), "hints are ignored");
        assert_eq!(grid.voxels(), &Voxels::U16(vec![10, 20, 30, 40]));
    }

    #[test]
    fn test_truncated_raw() {
        let bytes = raw_file([2, 2, 2], &[1, 2, 3]);
        let source = VolumeSource::new("v.raw", VolumeFormat::Raw);
        assert!(matches!(
            parse_volume(&bytes, &source),
            Err(VoxscopeError::TruncatedData { expected: 16, actual: 6 })
        ));
    }

    #[test]
    fn test_parse_pvm2_with_spacing() {
        let mut bytes = b"PVM2\n2 2 1\n1 1 2\n1\n".to_vec();
        bytes.extend_from_slice(&[5, 6, 7, 8]);
        let source = VolumeSource::new("v.pvm", VolumeFormat::Pvm);
        let grid = parse_volume(&bytes, &source).unwrap();
        assert_eq!(grid.resolution(), UVec3::new(2, 2, 1));
        assert_eq!(grid.spacing(), Vec3::new(1.0, 1.0, 2.0));
        assert_eq!(grid.voxels(), &Voxels::U8(vec![5, 6, 7, 8]));
    }

    #[test]
    fn test_parse_pvm_16_bit_big_endian() {
        let mut bytes = b"PVM\n1 1 2\n2\n".to_vec();
        bytes.extend_from_slice(&[0x01, 0x00, 0x00, 0x02]);
        let source = VolumeSource::new("v.pvm", VolumeFormat::Pvm);
        let grid = parse_volume(&bytes, &source).unwrap();
        assert_eq!(grid.voxels(), &Voxels::U16(vec![0x0100, 0x0002]));
    }

    #[test]
    fn test_compressed_pvm_is_rejected() {
        let source = VolumeSource::new("v.pvm", VolumeFormat::Pvm);
        assert!(matches!(
            parse_volume(b"DDS v3d\n...", &source),
            Err(VoxscopeError::UnsupportedCompression(_))
        ));
    }

    #[test]
    fn test_malformed_pvm_header() {
        let source = VolumeSource::new("v.pvm", VolumeFormat::Pvm);
        assert!(matches!(
            parse_volume(b"PVM\n1 1\n1\n\0", &source),
            Err(VoxscopeError::MalformedHeader(_))
        ));
        assert!(matches!(
            parse_volume(b"VOL\n", &source),
            Err(VoxscopeError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_overflowing_dimensions_are_rejected() {
        let source = VolumeSource::new("v.pvm", VolumeFormat::Pvm);
        assert!(matches!(
            parse_volume(b"PVM\n4194304 2097152 2097152\n1\n", &source),
            Err(VoxscopeError::MalformedHeader(_))
        ));
        assert!(matches!(
            parse_volume(b"PVM\n4294967295 4294967295 4294967295\n2\n\0\0", &source),
            Err(VoxscopeError::MalformedHeader(_))
        ));

        let hinted = VolumeSource::new("v.bin", VolumeFormat::Raw16)
            .with_dimensions(u32::MAX, u32::MAX, u32::MAX);
        assert!(matches!(
            parse_volume(&[0; 16], &hinted),
            Err(VoxscopeError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_huge_dimensions_report_truncation() {
        let source = VolumeSource::new("v.pvm", VolumeFormat::Pvm);
        assert!(matches!(
            parse_volume(b"PVM\n65536 65536 16\n1\n\x01\x02", &source),
            Err(VoxscopeError::TruncatedData { actual: 2, .. })
        ));
    }

    fn dimension() -> impl Strategy<Value = u32> {
        prop_oneof![0u32..5, any::<u32>()]
    }

    proptest! {
        #[test]
        fn prop_header_dimensions_never_panic(
            x in dimension(),
            y in dimension(),
            z in dimension(),
            wide in any::<bool>(),
            payload in prop::collection::vec(any::<u8>(), 0..64),
        ) {
            let bytes_per_sample: u128 = if wide { 2 } else { 1 };
            let declared = u128::from(x) * u128::from(y) * u128::from(z) * bytes_per_sample;
            let short = (payload.len() as u128) < declared;

            let mut pvm = format!("PVM\n{x} {y} {z}\n{bytes_per_sample}\n").into_bytes();
            pvm.extend_from_slice(&payload);
            let pvm_result = parse_volume(&pvm, &VolumeSource::new("v.pvm", VolumeFormat::Pvm));

            let format = if wide { VolumeFormat::Raw16 } else { VolumeFormat::Raw8 };
            let hinted = VolumeSource::new("v.bin", format).with_dimensions(x, y, z);
            let hinted_result = parse_volume(&payload, &hinted);

            for result in [pvm_result, hinted_result] {
                if short || declared == 0 {
                    prop_assert!(result.is_err());
                } else {
                    let grid = result.unwrap();
                    prop_assert_eq!(grid.resolution(), UVec3::new(x, y, z));
                }
            }
        }
    }

    #[test]
    fn test_file_loader_reports_missing_file_and_unknown_format() {
        let missing = VolumeSource::new("/nonexistent/voxscope/volume.raw", VolumeFormat::Raw);
        assert!(matches!(FileLoader.load(&missing), Err(VoxscopeError::IoError(_))));

        let unknown = VolumeSource::new("volume.xyz", VolumeFormat::Unknown);
        assert!(matches!(FileLoader.load(&unknown), Err(VoxscopeError::UnknownFormat(_))));
    }
}
