//! Screenshot encoding for captured frames.

use std::path::{Path, PathBuf};

use image::{ImageBuffer, Rgba};

/// Builds a screenshot path in `dir` named after the local time,
/// e.g. `voxscope_20240131_154502_123.png`.
#[must_use]
pub fn timestamped_filename(dir: &Path, extension: &str) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%3f");
    dir.join(format!("voxscope_{stamp}.{extension}"))
}

fn to_image(
    data: &[u8],
    width: u32,
    height: u32,
    bgra: bool,
) -> Result<ImageBuffer<Rgba<u8>, Vec<u8>>, ScreenshotError> {
    let mut rgba_data = data.to_vec();
    if bgra {
        for chunk in rgba_data.chunks_exact_mut(4) {
            chunk.swap(0, 2); // Swap B and R
        }
    }
    // wgpu uses top-left origin, so no vertical flip needed
    ImageBuffer::from_raw(width, height, rgba_data).ok_or(ScreenshotError::InvalidImageData)
}

/// Saves raw 8-bit pixel data to an image file.
///
/// `data` holds 4 bytes per pixel, tightly packed, in BGRA order when
/// `bgra` is set (swapchain formats) and RGBA otherwise. The format is taken
/// from the extension: `.png`, `.jpg` or `.jpeg`.
pub fn save_image(
    path: &Path,
    data: &[u8],
    width: u32,
    height: u32,
    bgra: bool,
) -> Result<(), ScreenshotError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let img = to_image(data, width, height, bgra)?;

    match extension.as_str() {
        "png" => {
            img.save_with_format(path, image::ImageFormat::Png)?;
        }
        "jpg" | "jpeg" => {
            // JPEG has no alpha
            let rgb_img = image::DynamicImage::ImageRgba8(img).to_rgb8();
            rgb_img.save_with_format(path, image::ImageFormat::Jpeg)?;
        }
        _ => {
            return Err(ScreenshotError::UnsupportedFormat(extension));
        }
    }

    log::info!("wrote {}x{} image to {}", width, height, path.display());
    Ok(())
}

/// Encodes raw 8-bit pixel data as PNG in memory.
pub fn save_to_buffer(
    data: &[u8],
    width: u32,
    height: u32,
    bgra: bool,
) -> Result<Vec<u8>, ScreenshotError> {
    let img = to_image(data, width, height, bgra)?;
    let mut buffer = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

/// Error type for screenshot operations.
#[derive(Debug, thiserror::Error)]
pub enum ScreenshotError {
    #[error("Failed to save image: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image encoding error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid image data")]
    InvalidImageData,

    #[error("GPU buffer mapping failed")]
    BufferMapFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_buffer_swaps_bgra() {
        let bgra = [10u8, 20, 30, 255];
        let png = save_to_buffer(&bgra, 1, 1, true).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0).0, [30, 20, 10, 255]);

        let png = save_to_buffer(&bgra, 1, 1, false).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0).0, bgra);
    }

    #[test]
    fn test_short_data_is_rejected() {
        let result = save_to_buffer(&[0u8; 4], 2, 2, false);
        assert!(matches!(result, Err(ScreenshotError::InvalidImageData)));
    }

    #[test]
    fn test_unsupported_extension() {
        let path = std::env::temp_dir().join("voxscope_screenshot_test.bmp2");
        let result = save_image(&path, &[0u8; 4], 1, 1, false);
        assert!(matches!(result, Err(ScreenshotError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_timestamped_filename() {
        let path = timestamped_filename(Path::new("shots"), "png");
        assert!(path.starts_with("shots"));
        let name = path.file_name().and_then(|n| n.to_str()).unwrap();
        assert!(name.starts_with("voxscope_"));
        assert!(name.ends_with(".png"));
    }
}
