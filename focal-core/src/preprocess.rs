//! Preprocessing utilities for preparing images for YOLO inference.
//!
//! Images are stretched to the detector input size, converted to RGB in
//! `[0, 1]`, and laid out as `[1, 3, H, W]`. The returned scale factors map
//! detections back to the source image.

use std::path::Path;

use anyhow::{Context, Result};
use focal_utils::{
    compute_resize_scales,
    config::{InputDimensions, ResizeQuality},
    load_image, resize_image,
    telemetry::timing_guard,
};
use image::{DynamicImage, GenericImageView, imageops::FilterType};
use tract_onnx::prelude::Tensor;

/// Desired input resolution for the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSize {
    pub width: u32,
    pub height: u32,
}

impl InputSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for InputSize {
    fn default() -> Self {
        Self {
            width: 640,
            height: 640,
        }
    }
}

/// Configuration for preprocessing an image before inference.
#[derive(Debug, Clone, Default)]
pub struct PreprocessConfig {
    /// The target input size for the model.
    pub input_size: InputSize,
    /// Resize filter preference controlling the quality vs speed trade-off.
    pub resize_quality: ResizeQuality,
}

impl PreprocessConfig {
    fn resize_filter(&self) -> FilterType {
        match self.resize_quality {
            ResizeQuality::Quality => FilterType::Triangle,
            ResizeQuality::Speed => FilterType::Nearest,
        }
    }
}

/// Output of preprocessing: tensor plus metadata for rescaling detections.
#[derive(Debug)]
pub struct PreprocessOutput {
    /// `[1, 3, H, W]` RGB tensor with values in `[0, 1]`.
    pub tensor: Tensor,
    pub scale_x: f32,
    pub scale_y: f32,
    pub original_size: (u32, u32),
}

/// Load and preprocess an image file.
pub fn preprocess_image<P: AsRef<Path>>(
    path: P,
    config: &PreprocessConfig,
) -> Result<PreprocessOutput> {
    let _guard = timing_guard("focal_core::preprocess_image", log::Level::Debug);
    let path_ref = path.as_ref();
    anyhow::ensure!(
        path_ref.exists(),
        "input image does not exist: {}",
        path_ref.display()
    );

    let image = load_image(path_ref)
        .with_context(|| format!("failed to load image from {}", path_ref.display()))?;
    preprocess_dynamic_image(&image, config)
}

/// Preprocess an in-memory image.
pub fn preprocess_dynamic_image(
    image: &DynamicImage,
    config: &PreprocessConfig,
) -> Result<PreprocessOutput> {
    let (orig_w, orig_h) = image.dimensions();
    let InputSize { width, height } = config.input_size;
    let (scale_x, scale_y) = compute_resize_scales((orig_w, orig_h), (width, height))?;

    let resized = resize_image(image, width, height, config.resize_filter());
    let tensor = rgb_to_chw_tensor(resized.as_raw(), width as usize, height as usize)?;

    Ok(PreprocessOutput {
        tensor,
        scale_x,
        scale_y,
        original_size: (orig_w, orig_h),
    })
}

/// Interleaved RGB8 to planar `[1, 3, H, W]` f32 in `[0, 1]`.
fn rgb_to_chw_tensor(rgb: &[u8], width: usize, height: usize) -> Result<Tensor> {
    let plane = width * height;
    anyhow::ensure!(
        rgb.len() == plane * 3,
        "expected {} RGB bytes for {}x{}, got {}",
        plane * 3,
        width,
        height,
        rgb.len()
    );

    let mut chw = vec![0f32; plane * 3];
    for (idx, pixel) in rgb.chunks_exact(3).enumerate() {
        chw[idx] = f32::from(pixel[0]) / 255.0;
        chw[plane + idx] = f32::from(pixel[1]) / 255.0;
        chw[2 * plane + idx] = f32::from(pixel[2]) / 255.0;
    }

    Tensor::from_shape(&[1, 3, height, width], &chw)
        .map_err(|e| anyhow::anyhow!("failed to build input tensor: {e}"))
}

impl From<InputDimensions> for InputSize {
    fn from(dimensions: InputDimensions) -> Self {
        InputSize::new(dimensions.width, dimensions.height)
    }
}

impl From<InputDimensions> for PreprocessConfig {
    fn from(dimensions: InputDimensions) -> Self {
        Self {
            input_size: dimensions.into(),
            resize_quality: dimensions.resize_quality,
        }
    }
}

impl From<&InputDimensions> for PreprocessConfig {
    fn from(dimensions: &InputDimensions) -> Self {
        (*dimensions).into()
    }
}
