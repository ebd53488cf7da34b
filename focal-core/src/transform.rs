//! Crop a detection out of an image and resize it to the requested size.
//!
//! Coordinates are truncated toward zero and clamped to the image bounds, so a
//! box that hangs off the edge is cut back instead of rejected. The resize is
//! exact: the output always has the target dimensions, whatever the aspect
//! ratio of the crop.

use std::{fmt, num::NonZeroU32};

use focal_utils::timing_guard;
use image::{DynamicImage, GenericImageView, imageops::FilterType};
use thiserror::Error;

use crate::postprocess::BoundingBox;

/// Target size of the derived image. Zero is not representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputSize {
    width: NonZeroU32,
    height: NonZeroU32,
}

/// A requested output size with a zero side.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("output size must be at least 1x1 pixels (got {width}x{height})")]
pub struct SizeError {
    pub width: u32,
    pub height: u32,
}

impl OutputSize {
    pub const SQUARE_1080: OutputSize = OutputSize {
        width: NonZeroU32::new(1080).unwrap(),
        height: NonZeroU32::new(1080).unwrap(),
    };

    /// Validate user-supplied dimensions.
    pub fn new(width: u32, height: u32) -> Result<Self, SizeError> {
        match (NonZeroU32::new(width), NonZeroU32::new(height)) {
            (Some(width), Some(height)) => Ok(Self { width, height }),
            _ => Err(SizeError { width, height }),
        }
    }

    pub fn width(self) -> u32 {
        self.width.get()
    }

    pub fn height(self) -> u32 {
        self.height.get()
    }
}

impl Default for OutputSize {
    fn default() -> Self {
        Self::SQUARE_1080
    }
}

impl fmt::Display for OutputSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Integer crop rectangle inside the source image, right/bottom exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CropRect {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

/// The box left nothing to crop once clamped to the image.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformError {
    #[error("the selected region is empty after clamping to the image bounds")]
    EmptyCropRegion,
}

/// Clamp `bbox` to an `img_w`×`img_h` image.
///
/// Returns `None` when nothing of the box is left, including boxes with
/// non-finite coordinates or inverted corners.
pub fn crop_rect(bbox: &BoundingBox, img_w: u32, img_h: u32) -> Option<CropRect> {
    let coords = [bbox.x1, bbox.y1, bbox.x2, bbox.y2];
    if coords.iter().any(|c| !c.is_finite()) {
        return None;
    }

    // `as` truncates toward zero and saturates, so negatives land on 0 before the clamp.
    let clamp = |value: f32, max: u32| (value.trunc() as i64).clamp(0, i64::from(max)) as u32;
    let rect = CropRect {
        left: clamp(bbox.x1, img_w),
        top: clamp(bbox.y1, img_h),
        right: clamp(bbox.x2, img_w),
        bottom: clamp(bbox.y2, img_h),
    };

    if rect.right <= rect.left || rect.bottom <= rect.top {
        None
    } else {
        Some(rect)
    }
}

/// Crop `bbox` out of `image` and resize it to `size` with bilinear filtering.
///
/// # Examples
///
/// ```
/// use focal_core::{BoundingBox, OutputSize, transform};
/// use image::{DynamicImage, RgbImage};
///
/// let img = DynamicImage::ImageRgb8(RgbImage::new(400, 300));
/// let bbox = BoundingBox::new(10.0, 20.0, 110.0, 70.0);
/// let out = transform(&img, &bbox, OutputSize::new(64, 64).unwrap()).unwrap();
/// assert_eq!((out.width(), out.height()), (64, 64));
/// ```
pub fn transform(
    image: &DynamicImage,
    bbox: &BoundingBox,
    size: OutputSize,
) -> Result<DynamicImage, TransformError> {
    transform_with_filter(image, bbox, size, FilterType::Triangle)
}

/// [`transform`] with an explicit resize filter.
pub fn transform_with_filter(
    image: &DynamicImage,
    bbox: &BoundingBox,
    size: OutputSize,
    filter: FilterType,
) -> Result<DynamicImage, TransformError> {
    let _guard = timing_guard("focal_core::transform", log::Level::Debug);
    let (img_w, img_h) = image.dimensions();
    let rect = crop_rect(bbox, img_w, img_h).ok_or(TransformError::EmptyCropRegion)?;

    log::debug!(
        "Cropping {}x{} at ({}, {}) and resizing to {}",
        rect.width(),
        rect.height(),
        rect.left,
        rect.top,
        size
    );

    let cropped = image.crop_imm(rect.left, rect.top, rect.width(), rect.height());
    Ok(cropped.resize_exact(size.width(), size.height(), filter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    #[test]
    fn output_size_rejects_zero() {
        assert_eq!(
            OutputSize::new(0, 1080),
            Err(SizeError {
                width: 0,
                height: 1080
            })
        );
        assert!(OutputSize::new(1080, 0).is_err());
        assert_eq!(OutputSize::new(1, 1).unwrap().width(), 1);
        assert_eq!(OutputSize::default(), OutputSize::new(1080, 1080).unwrap());
    }

    #[test]
    fn large_source_crop_hits_target_size() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(4000, 3000));
        let bbox = BoundingBox::new(100.0, 100.0, 2100.0, 1600.0);

        let rect = crop_rect(&bbox, 4000, 3000).unwrap();
        assert_eq!((rect.width(), rect.height()), (2000, 1500));

        let out = transform(&img, &bbox, OutputSize::new(1080, 1080).unwrap()).unwrap();
        assert_eq!(out.dimensions(), (1080, 1080));
    }

    #[test]
    fn ignores_aspect_ratio() {
        let img = gradient(200, 100);
        let bbox = BoundingBox::new(0.0, 0.0, 200.0, 20.0);
        let out = transform(&img, &bbox, OutputSize::new(30, 90).unwrap()).unwrap();
        assert_eq!(out.dimensions(), (30, 90));
    }

    #[test]
    fn coordinates_are_truncated_and_clamped() {
        let bbox = BoundingBox::new(-15.7, 10.9, 250.2, 99.99);
        let rect = crop_rect(&bbox, 200, 100).unwrap();
        assert_eq!(
            rect,
            CropRect {
                left: 0,
                top: 10,
                right: 200,
                bottom: 99
            }
        );
    }

    #[test]
    fn degenerate_boxes_produce_no_image() {
        let img = gradient(50, 50);
        let size = OutputSize::new(10, 10).unwrap();
        for bbox in [
            BoundingBox::new(20.0, 5.0, 20.0, 40.0),
            BoundingBox::new(5.0, 30.0, 40.0, 30.4),
            BoundingBox::new(60.0, 60.0, 90.0, 90.0),
            BoundingBox::new(40.0, 40.0, 10.0, 10.0),
            BoundingBox::new(f32::NAN, 0.0, 10.0, 10.0),
        ] {
            assert_eq!(
                transform(&img, &bbox, size),
                Err(TransformError::EmptyCropRegion),
                "{bbox:?}"
            );
        }
    }

    #[test]
    fn crop_takes_pixels_from_the_box() {
        let img = gradient(100, 100);
        let bbox = BoundingBox::new(40.0, 10.0, 41.0, 11.0);
        let out = transform_with_filter(&img, &bbox, OutputSize::new(3, 3).unwrap(), FilterType::Nearest)
            .unwrap()
            .to_rgb8();
        assert_eq!(out.get_pixel(1, 1), &Rgb([40, 10, 128]));
    }
}
