/// Preview base generation
///
/// Produces the downscaled working copy of the active source image that the
/// live preview renders against. Generated once per source load and reused
/// across every filter change until the source changes.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

use crate::error::EngineError;

/// Maximum preview base width in pixels; height follows the aspect ratio
pub const PREVIEW_MAX_WIDTH: u32 = 800;

/// JPEG quality for the preview base (fast-loading, visually lossless)
const PREVIEW_BASE_QUALITY: u8 = 95;

/// File name of the preview base inside the cache directory
const PREVIEW_BASE_NAME: &str = "preview-base.jpg";

/// Generate the downscaled preview base for a source image.
///
/// Returns the path to the cached base JPEG. The previous base, if any, is
/// overwritten in place.
pub async fn generate_preview_base(
    source: PathBuf,
    cache_dir: PathBuf,
) -> Result<PathBuf, EngineError> {
    // Spawn blocking task for the CPU-bound decode and resize
    tokio::task::spawn_blocking(move || generate_preview_base_blocking(&source, &cache_dir))
        .await
        .map_err(|e| EngineError::SourceLoadFailed(format!("task join error: {}", e)))?
}

/// Blocking implementation of preview base generation
fn generate_preview_base_blocking(source: &Path, cache_dir: &Path) -> Result<PathBuf, EngineError> {
    if !source.exists() {
        return Err(EngineError::SourceLoadFailed(format!(
            "file not found: {}",
            source.display()
        )));
    }

    let img = image::open(source).map_err(|e| {
        EngineError::SourceLoadFailed(format!("failed to decode {}: {}", source.display(), e))
    })?;

    // Resize maintaining aspect ratio (width-constrained); images already
    // narrow enough are encoded as-is
    let img = if img.width() > PREVIEW_MAX_WIDTH {
        img.resize(PREVIEW_MAX_WIDTH, PREVIEW_MAX_WIDTH * 10, FilterType::Lanczos3)
    } else {
        img
    };

    fs::create_dir_all(cache_dir)
        .map_err(|e| EngineError::WriteFailed(format!("failed to create cache dir: {}", e)))?;

    let base_path = cache_dir.join(PREVIEW_BASE_NAME);
    let file = File::create(&base_path)
        .map_err(|e| EngineError::WriteFailed(format!("failed to create preview base: {}", e)))?;

    let mut writer = BufWriter::new(file);
    let encoder = JpegEncoder::new_with_quality(&mut writer, PREVIEW_BASE_QUALITY);
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| EngineError::WriteFailed(format!("failed to encode preview base: {}", e)))?;

    println!(
        "🖼️  Preview base ready: {}x{} at {}",
        img.width(),
        img.height(),
        base_path.display()
    );

    Ok(base_path)
}
