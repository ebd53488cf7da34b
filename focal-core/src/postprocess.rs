use anyhow::Result;
use focal_utils::config::{DetectionSettings, OutputLayout};
use serde::Serialize;
use std::cmp::Ordering;
use tract_onnx::prelude::{Tensor, tract_ndarray::ArrayView2};

use crate::labels::class_label;

/// Number of leading box columns (`cx, cy, w, h`) in each YOLO candidate row.
const BOX_COLS: usize = 4;

/// Filtering parameters applied to raw detector output.
#[derive(Debug, Clone)]
pub struct PostprocessConfig {
    /// Minimum class confidence for a candidate to be considered valid.
    pub score_threshold: f32,
    /// IoU threshold for non-maximum suppression between boxes of the same class.
    pub nms_threshold: f32,
    /// The maximum number of candidates kept (after sorting by score) before NMS.
    pub top_k: usize,
    /// Tensor orientation; `Auto` guesses from the axis lengths.
    pub layout: OutputLayout,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.25,
            nms_threshold: 0.45,
            top_k: 300,
            layout: OutputLayout::Auto,
        }
    }
}

/// Axis-aligned box in source-image pixel coordinates, stored as corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build a box from its center and size, as YOLO heads emit them.
    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self {
            x1: width.mul_add(-0.5, cx),
            y1: height.mul_add(-0.5, cy),
            x2: width.mul_add(0.5, cx),
            y2: height.mul_add(0.5, cy),
        }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Area of the box; inverted boxes count as empty.
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Intersection over Union with another box.
    pub fn iou(&self, other: &Self) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        if intersection <= 0.0 {
            return 0.0;
        }

        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// One object instance found by the detector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    /// Index into the model's class list.
    pub class_id: u32,
    /// Class confidence in `[0, 1]`.
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    /// Human-readable class name when the id is a known COCO class.
    pub fn label(&self) -> Option<&'static str> {
        class_label(self.class_id)
    }
}

/// Decode YOLO-style output into filtered detections.
///
/// Accepts `[1, 4 + C, N]` (the usual YOLOv8 export), `[1, N, 4 + C]`, or
/// `[N, 4 + C]`. With [`OutputLayout::Auto`] the longer axis is taken as the
/// candidate axis, so an output with fewer candidates than `4 + C` columns
/// needs `config.layout` set explicitly. Each candidate keeps its best class;
/// boxes are scaled back to the original image with `scale_x`/`scale_y`.
/// Results are sorted by confidence, truncated to `top_k`, then reduced by
/// per-class NMS.
pub fn apply_postprocess(
    output: &Tensor,
    scale_x: f32,
    scale_y: f32,
    config: &PostprocessConfig,
) -> Result<Vec<Detection>> {
    let rows = candidate_rows(output, config.layout)?;

    let mut detections = Vec::new();
    for row in rows.rows() {
        let Some((class_id, confidence)) = row
            .iter()
            .skip(BOX_COLS)
            .copied()
            .enumerate()
            .filter(|(_, score)| score.is_finite())
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
        else {
            continue;
        };
        if confidence < config.score_threshold {
            continue;
        }

        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        if !(cx.is_finite() && cy.is_finite() && w.is_finite() && h.is_finite()) {
            continue;
        }
        if w <= 0.0 || h <= 0.0 {
            continue;
        }

        detections.push(Detection {
            class_id: class_id as u32,
            confidence,
            bbox: BoundingBox::from_center(cx * scale_x, cy * scale_y, w * scale_x, h * scale_y),
        });
    }

    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    if config.top_k > 0 && detections.len() > config.top_k {
        detections.truncate(config.top_k);
    }

    if config.nms_threshold > 0.0 && detections.len() > 1 {
        detections = non_max_suppression(detections, config.nms_threshold);
    }

    Ok(detections)
}

/// View the output tensor as `[candidates, 4 + classes]`, transposing when needed.
fn candidate_rows(output: &Tensor, layout: OutputLayout) -> Result<ArrayView2<'_, f32>> {
    let (a, b) = match output.shape() {
        &[1, a, b] | &[a, b] => (a, b),
        other => anyhow::bail!(
            "detector output must have shape [1, F, N], [1, N, F] or [N, F] (got {:?})",
            other
        ),
    };
    let features_major = match layout {
        // YOLO heads have far more anchors than classes.
        OutputLayout::Auto => a < b,
        OutputLayout::FeaturesMajor => true,
        OutputLayout::CandidatesMajor => false,
    };
    let (features, candidates) = if features_major { (a, b) } else { (b, a) };
    anyhow::ensure!(
        features > BOX_COLS,
        "detector output needs at least {} columns per candidate, got {}",
        BOX_COLS + 1,
        features
    );

    let slice = output
        .as_slice::<f32>()
        .map_err(|e| anyhow::anyhow!("detector output is not f32: {e}"))?;

    let view = if features_major {
        ArrayView2::from_shape((features, candidates), slice).map(|v| v.reversed_axes())
    } else {
        ArrayView2::from_shape((candidates, features), slice)
    };
    view.map_err(|_| anyhow::anyhow!("detector output data is not contiguous"))
}

/// Greedy NMS over score-sorted detections; only boxes of the same class suppress each other.
fn non_max_suppression(detections: Vec<Detection>, threshold: f32) -> Vec<Detection> {
    let mut result: Vec<Detection> = Vec::with_capacity(detections.len());
    for detection in detections {
        let suppressed = result.iter().any(|kept| {
            kept.class_id == detection.class_id && detection.bbox.iou(&kept.bbox) > threshold
        });
        if !suppressed {
            result.push(detection);
        }
    }
    result
}

impl From<DetectionSettings> for PostprocessConfig {
    fn from(settings: DetectionSettings) -> Self {
        PostprocessConfig {
            score_threshold: settings.score_threshold,
            nms_threshold: settings.nms_threshold,
            top_k: settings.top_k,
            layout: settings.output_layout,
        }
    }
}

impl From<&DetectionSettings> for PostprocessConfig {
    fn from(settings: &DetectionSettings) -> Self {
        settings.clone().into()
    }
}
