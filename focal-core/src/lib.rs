//! Core object-detection cropping primitives.
//!
//! This crate loads a YOLO ONNX model with `tract-onnx`, decodes its output
//! into [`Detection`]s, and turns one chosen detection into a resized image.
//! [`Pipeline`] ties the pieces together for a single upload.

/// Detector trait and the YOLO implementation.
pub mod detector;
/// COCO class names.
pub mod labels;
/// ONNX model loading and execution.
pub mod model;
/// Request orchestration with scratch-file cleanup.
pub mod pipeline;
/// Detection post-processing (score filtering, NMS).
pub mod postprocess;
/// Image pre-processing (resizing, tensor conversion).
pub mod preprocess;
/// Output size presets and per-variant options.
pub mod presets;
/// Choosing which detection to crop.
pub mod selector;
/// Crop and resize of the selected region.
pub mod transform;

pub use detector::{Detector, YoloDetector};
pub use labels::class_label;
pub use model::YoloModel;
pub use pipeline::{
    Pipeline, PipelineConfig, ProcessOutcome, ProcessedImage, RequestError, RequestInput, Upload,
};
pub use postprocess::{BoundingBox, Detection, PostprocessConfig, apply_postprocess};
pub use preprocess::{
    InputSize, PreprocessConfig, PreprocessOutput, preprocess_dynamic_image, preprocess_image,
};
pub use presets::{
    FormatMode, ProcessOptions, SizeMode, SizePreset, UnknownPreset, preset_by_name, preset_size,
    standard_presets,
};
pub use selector::{SelectionError, SelectionMode, describe_choices, select_region, select_with_mode};
pub use transform::{
    CropRect, OutputSize, SizeError, TransformError, crop_rect, transform, transform_with_filter,
};

/// Returns the crate version for diagnostics.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
