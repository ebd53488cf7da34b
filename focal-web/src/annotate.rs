//! Source-image preview with the detections outlined.

use anyhow::Result;
use focal_core::{BoundingBox, Detection};
use focal_utils::{EncodeOptions, OutputFormat, encode_image};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

/// Longest side of the preview image.
const PREVIEW_MAX_SIDE: u32 = 800;

const BOX_COLOR: Rgba<u8> = Rgba([255, 196, 0, 255]);
const SELECTED_COLOR: Rgba<u8> = Rgba([230, 30, 30, 255]);

/// Draw every detection on a downscaled copy of `image`, highlighting `selected`.
pub fn annotate_detections(
    image: &DynamicImage,
    detections: &[Detection],
    selected: Option<usize>,
) -> RgbaImage {
    let preview = if image.width().max(image.height()) > PREVIEW_MAX_SIDE {
        image.thumbnail(PREVIEW_MAX_SIDE, PREVIEW_MAX_SIDE)
    } else {
        image.clone()
    };
    let mut canvas = preview.to_rgba8();
    let (img_w, img_h) = canvas.dimensions();
    let scale_x = img_w as f32 / image.width() as f32;
    let scale_y = img_h as f32 / image.height() as f32;

    for (index, detection) in detections.iter().enumerate() {
        let is_selected = selected == Some(index);
        let color = if is_selected { SELECTED_COLOR } else { BOX_COLOR };
        let Some(rect) = rect_from_bbox(&detection.bbox, scale_x, scale_y, img_w, img_h) else {
            continue;
        };
        draw_hollow_rect_mut(&mut canvas, rect, color);
        // Thicker outline for the cropped object.
        if is_selected && rect.width() > 2 && rect.height() > 2 {
            let inner = Rect::at(rect.left() + 1, rect.top() + 1)
                .of_size(rect.width() - 2, rect.height() - 2);
            draw_hollow_rect_mut(&mut canvas, inner, color);
        }
    }

    canvas
}

/// PNG bytes of [`annotate_detections`].
pub fn annotated_png(
    image: &DynamicImage,
    detections: &[Detection],
    selected: Option<usize>,
) -> Result<Vec<u8>> {
    let canvas = DynamicImage::ImageRgba8(annotate_detections(image, detections, selected));
    encode_image(&canvas, OutputFormat::Png, &EncodeOptions::default())
}

/// Scale a source-space box into the preview and clamp it to the canvas.
fn rect_from_bbox(
    bbox: &BoundingBox,
    scale_x: f32,
    scale_y: f32,
    img_w: u32,
    img_h: u32,
) -> Option<Rect> {
    if img_w == 0 || img_h == 0 {
        return None;
    }
    let max_x = (img_w - 1) as f32;
    let max_y = (img_h - 1) as f32;

    let x1 = (bbox.x1 * scale_x).clamp(0.0, max_x);
    let y1 = (bbox.y1 * scale_y).clamp(0.0, max_y);
    let x2 = (bbox.x2 * scale_x).clamp(0.0, max_x);
    let y2 = (bbox.y2 * scale_y).clamp(0.0, max_y);
    if !(x1.is_finite() && y1.is_finite() && x2.is_finite() && y2.is_finite()) {
        return None;
    }

    let width = (x2 - x1).max(1.0).round() as u32;
    let height = (y2 - y1).max(1.0).round() as u32;
    Some(Rect::at(x1.round() as i32, y1.round() as i32).of_size(width, height))
}
