//! Shared configuration types consumed across the focal-crop workspace.
//!
//! Settings serialize to a single JSON document so the server can be started
//! with a saved profile and individual values overridden from the command line.

use crate::output::OutputFormat;

use anyhow::{Context, Result};
use log::{LevelFilter, warn};
use serde::{Deserialize, Serialize};
use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Default location of the detector weights, relative to the working directory.
pub const DEFAULT_MODEL_PATH: &str = "models/yolov8n.onnx";

/// Post-processing parameters for the object detector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionSettings {
    /// Minimum class confidence for a candidate to be kept.
    pub score_threshold: f32,
    /// IoU above which overlapping boxes of the same class are merged.
    pub nms_threshold: f32,
    /// Maximum number of candidates kept before non-maximum suppression.
    pub top_k: usize,
    /// Orientation of the detector's output tensor.
    pub output_layout: OutputLayout,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            score_threshold: 0.25,
            nms_threshold: 0.45,
            top_k: 300,
            output_layout: OutputLayout::Auto,
        }
    }
}

/// How a 2-D detector output is laid out.
///
/// `Auto` treats the longer axis as the candidate axis, which holds for stock
/// YOLOv8 exports. Models emitting fewer candidates than `4 + classes` need an
/// explicit layout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayout {
    #[default]
    Auto,
    /// `[1, 4 + C, N]`
    FeaturesMajor,
    /// `[1, N, 4 + C]` or `[N, 4 + C]`
    CandidatesMajor,
}

impl fmt::Display for OutputLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputLayout::Auto => "auto",
            OutputLayout::FeaturesMajor => "features_major",
            OutputLayout::CandidatesMajor => "candidates_major",
        })
    }
}

impl FromStr for OutputLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "auto" => Ok(OutputLayout::Auto),
            "features_major" => Ok(OutputLayout::FeaturesMajor),
            "candidates_major" => Ok(OutputLayout::CandidatesMajor),
            other => Err(format!(
                "invalid output layout '{other}'; expected auto, features_major, or candidates_major"
            )),
        }
    }
}

/// Resampling preference for resize operations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResizeQuality {
    /// Bilinear (Triangle) filtering.
    #[default]
    Quality,
    /// Nearest-neighbour sampling.
    Speed,
}

impl fmt::Display for ResizeQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResizeQuality::Quality => "quality",
            ResizeQuality::Speed => "speed",
        })
    }
}

impl FromStr for ResizeQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quality" | "bilinear" => Ok(ResizeQuality::Quality),
            "speed" | "nearest" => Ok(ResizeQuality::Speed),
            other => Err(format!(
                "invalid resize quality '{other}'; expected 'quality' or 'speed'"
            )),
        }
    }
}

/// Detector input resolution in pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InputDimensions {
    pub width: u32,
    pub height: u32,
    /// Filter used when scaling the upload down to the detector input.
    pub resize_quality: ResizeQuality,
}

impl Default for InputDimensions {
    fn default() -> Self {
        Self {
            width: 640,
            height: 640,
            resize_quality: ResizeQuality::Quality,
        }
    }
}

/// Which of the three page layouts the server exposes.
///
/// * `Basic` acts on the first detection and always writes a 1080×1080 PNG.
/// * `Selectable` lets the user pick the detection, size and format stay fixed.
/// * `Custom` adds width/height inputs and a PNG/JPEG choice.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Basic,
    Selectable,
    #[default]
    Custom,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Basic, Variant::Selectable, Variant::Custom];
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Variant::Basic => "basic",
            Variant::Selectable => "selectable",
            Variant::Custom => "custom",
        })
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" | "fixed" => Ok(Variant::Basic),
            "selectable" | "select" => Ok(Variant::Selectable),
            "custom" => Ok(Variant::Custom),
            other => Err(format!(
                "unknown variant '{other}'; expected basic, selectable, or custom"
            )),
        }
    }
}

/// Settings for the crop/resize output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputSettings {
    pub variant: Variant,
    /// Named size preset ("square", "portrait", "landscape", "story"); "custom" uses `width`/`height`.
    pub preset: String,
    /// Output width in pixels; the fixed size for `basic`/`selectable`, the form default for `custom`.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Default (or fixed) output format.
    pub format: OutputFormat,
    /// JPEG quality (1-100).
    pub jpeg_quality: u8,
    /// PNG compression strategy ("fast", "default", "best") or numeric level (0-9).
    pub png_compression: String,
    /// Filter used when stretching the crop to the output size.
    pub resize_quality: ResizeQuality,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            variant: Variant::default(),
            preset: "custom".to_string(),
            width: 1080,
            height: 1080,
            format: OutputFormat::Png,
            jpeg_quality: 90,
            png_compression: "default".to_string(),
            resize_quality: ResizeQuality::Quality,
        }
    }
}

impl OutputSettings {
    /// Clamp values to ranges the encoders accept.
    pub fn sanitize(&mut self) {
        if self.width == 0 || self.height == 0 {
            warn!(
                "output size {}x{} is invalid; using at least 1 pixel per side",
                self.width, self.height
            );
            self.width = self.width.max(1);
            self.height = self.height.max(1);
        }
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
    }
}

/// HTTP listener and request-handling limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Directory for per-request scratch files. Defaults to `<tmp>/focal-crop`.
    pub scratch_dir: Option<String>,
    /// Largest accepted request body in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            scratch_dir: None,
            max_upload_bytes: 32 * 1024 * 1024,
        }
    }
}

impl ServerSettings {
    /// Resolve the scratch directory, falling back to the system temp dir.
    pub fn scratch_path(&self) -> PathBuf {
        self.scratch_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join("focal-crop"))
    }
}

/// Settings controlling optional runtime telemetry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Whether telemetry timing logs are enabled.
    pub enabled: bool,
    /// Logging level for telemetry output (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "debug".to_string(),
        }
    }
}

impl TelemetrySettings {
    /// Resolve the configured level string into a `LevelFilter`.
    pub fn level_filter(&self) -> LevelFilter {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "warning" => LevelFilter::Warn,
            other => other.parse().unwrap_or(LevelFilter::Debug),
        }
    }
}

/// Everything the server needs to start, as persisted on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    /// Path to the detector ONNX weights. `None` falls back to [`DEFAULT_MODEL_PATH`].
    pub model_path: Option<String>,
    pub input: InputDimensions,
    pub detection: DetectionSettings,
    pub output: OutputSettings,
    pub server: ServerSettings,
    pub telemetry: TelemetrySettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            model_path: Some(DEFAULT_MODEL_PATH.to_string()),
            input: InputDimensions::default(),
            detection: DetectionSettings::default(),
            output: OutputSettings::default(),
            server: ServerSettings::default(),
            telemetry: TelemetrySettings::default(),
        }
    }
}

impl AppSettings {
    /// Load settings from a JSON file. Missing fields take their defaults.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let mut settings: AppSettings = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse settings JSON at {}", path.display()))?;

        if settings.model_path.is_none() {
            settings.model_path = Some(DEFAULT_MODEL_PATH.to_string());
        }
        settings.output.sanitize();

        Ok(settings)
    }

    /// Serialize settings to disk as pretty-printed JSON, overwriting any existing file.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let payload =
            serde_json::to_string_pretty(self).context("failed to serialize settings JSON")?;
        fs::write(path, payload)
            .with_context(|| format!("failed to write settings file {}", path.display()))?;
        Ok(())
    }

    /// Model path with the default applied.
    pub fn model_path(&self) -> PathBuf {
        PathBuf::from(self.model_path.as_deref().unwrap_or(DEFAULT_MODEL_PATH))
    }
}

/// Returns the default settings location (`config/focal_settings.json`).
pub fn default_settings_path() -> PathBuf {
    env::current_dir()
        .map(|dir| dir.join("config/focal_settings.json"))
        .unwrap_or_else(|_| PathBuf::from("config/focal_settings.json"))
}
