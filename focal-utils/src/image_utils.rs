use std::path::Path;

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat, RgbImage, imageops::FilterType};

/// Upload formats the pipeline accepts.
const ACCEPTED_FORMATS: [ImageFormat; 2] = [ImageFormat::Png, ImageFormat::Jpeg];

/// Load an image from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    let path_ref = path.as_ref();
    image::open(path_ref).with_context(|| format!("failed to open image {}", path_ref.display()))
}

/// Decode uploaded bytes, accepting PNG and JPEG only.
///
/// The format is sniffed from the content, not taken from the file name.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    anyhow::ensure!(!bytes.is_empty(), "uploaded file is empty");
    let format = image::guess_format(bytes).context("unrecognized image data")?;
    anyhow::ensure!(
        ACCEPTED_FORMATS.contains(&format),
        "unsupported image format {format:?}; upload a PNG or JPEG"
    );
    let image = image::load_from_memory_with_format(bytes, format)
        .with_context(|| format!("failed to decode {format:?} image"))?;
    anyhow::ensure!(
        image.width() > 0 && image.height() > 0,
        "image has zero dimensions"
    );
    Ok(image)
}

/// Resize an image to exactly `width`×`height` using the provided filter.
pub fn resize_image(image: &DynamicImage, width: u32, height: u32, filter: FilterType) -> RgbImage {
    image.resize_exact(width, height, filter).to_rgb8()
}

/// Scale factors that map model-space coordinates back to the original image.
pub fn compute_resize_scales(original: (u32, u32), target: (u32, u32)) -> Result<(f32, f32)> {
    let (orig_w, orig_h) = original;
    let (target_w, target_h) = target;
    anyhow::ensure!(
        target_w > 0 && target_h > 0,
        "target dimensions must be non-zero"
    );
    anyhow::ensure!(
        orig_w > 0 && orig_h > 0,
        "original dimensions must be non-zero"
    );
    Ok((
        orig_w as f32 / target_w as f32,
        orig_h as f32 / target_h as f32,
    ))
}
