//! Command-line argument definitions for focal-web.

use clap::{ArgAction, Parser};
use std::path::PathBuf;

use focal_utils::{
    OutputFormat, Variant,
    config::{OutputLayout, ResizeQuality},
};

/// Serve the upload, detect, crop, and resize page.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct ServeArgs {
    /// Optional settings JSON. Defaults to `config/focal_settings.json` when present, otherwise built-in parameters.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Path to the YOLO ONNX model (overrides the settings file).
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// Address to bind.
    #[arg(long)]
    pub host: Option<String>,

    #[arg(short, long)]
    pub port: Option<u16>,

    /// Page variant: basic, selectable, or custom.
    #[arg(long, value_name = "VARIANT")]
    pub variant: Option<Variant>,

    /// Size preset: square, portrait, landscape, story, or custom. Overridden by --output-width/--output-height.
    #[arg(long)]
    pub preset: Option<String>,

    /// Output width (fixed size for basic/selectable, form default for custom).
    #[arg(long)]
    pub output_width: Option<u32>,

    /// Output height (fixed size for basic/selectable, form default for custom).
    #[arg(long)]
    pub output_height: Option<u32>,

    /// Output format: png or jpeg.
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Override score threshold.
    #[arg(long)]
    pub score_threshold: Option<f32>,

    /// Override NMS threshold.
    #[arg(long)]
    pub nms_threshold: Option<f32>,

    /// Override top_k limit.
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Detector output orientation: auto, features_major, or candidates_major.
    #[arg(long, value_name = "LAYOUT")]
    pub output_layout: Option<OutputLayout>,

    /// Override detector input width (pixels).
    #[arg(long)]
    pub input_width: Option<u32>,

    /// Override detector input height (pixels).
    #[arg(long)]
    pub input_height: Option<u32>,

    /// Resize quality mode: `quality` (Triangle) or `speed` (fast Nearest).
    #[arg(long, value_name = "MODE")]
    pub resize_quality: Option<ResizeQuality>,

    /// Directory for per-request scratch files.
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,

    /// Enable telemetry timing logs (defaults to settings file).
    #[arg(long, action = ArgAction::SetTrue)]
    pub telemetry: bool,

    /// Override telemetry logging level (error, warn, info, debug, trace).
    #[arg(long, value_name = "LEVEL")]
    pub telemetry_level: Option<String>,
}
