//! One upload in, one resized download out.
//!
//! [`Pipeline::handle`] runs the whole request: validate the requested size,
//! stage the upload in the scratch directory, detect, select, crop, encode,
//! and read the encoded file back as the download payload. Every scratch file
//! is owned by a guard that removes it on drop, so nothing outlives the request
//! whether it succeeds, fails, or unwinds.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use focal_utils::{
    AppSettings, EncodeOptions, OutputFormat, ResizeQuality, decode_image, download_file_name,
    sanitize_file_name, save_image, timing_guard,
};
use image::imageops::FilterType;
use log::{debug, info, warn};
use thiserror::Error;

use crate::detector::Detector;
use crate::postprocess::Detection;
use crate::presets::ProcessOptions;
use crate::selector::{SelectionError, SelectionMode, describe_choices, select_with_mode};
use crate::transform::{SizeError, TransformError, transform_with_filter};

/// Static configuration shared by every request.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding the per-request scratch files.
    pub scratch_dir: PathBuf,
    pub options: ProcessOptions,
    pub encode: EncodeOptions,
    /// Filter used when stretching the crop to the output size.
    pub resize_filter: FilterType,
}

impl PipelineConfig {
    pub fn from_settings(settings: &AppSettings) -> Result<Self, SizeError> {
        Ok(Self {
            scratch_dir: settings.server.scratch_path(),
            options: ProcessOptions::from_settings(&settings.output)?,
            encode: EncodeOptions::from(&settings.output),
            resize_filter: match settings.output.resize_quality {
                ResizeQuality::Quality => FilterType::Triangle,
                ResizeQuality::Speed => FilterType::Nearest,
            },
        })
    }
}

/// The uploaded file as received.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Client-supplied file name; only used to derive scratch and download names.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// User choices submitted alongside the upload. Fields the variant does not
/// expose are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestInput {
    /// Zero-based detection index.
    pub selection: Option<usize>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: Option<OutputFormat>,
}

/// A finished crop ready to preview and download.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    /// Encoded image bytes, as read back from the scratch output file.
    pub bytes: Vec<u8>,
    /// `resized_<stem>.<ext>`, stem taken from the upload name as given.
    pub file_name: String,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub detections: Vec<Detection>,
    /// Index of the cropped detection in `detections`.
    pub selected: usize,
    /// One description per detection, for the choice list.
    pub choices: Vec<String>,
}

impl ProcessedImage {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

#[derive(Debug)]
pub enum ProcessOutcome {
    /// The detector found nothing; no output was produced.
    NoDetections,
    Ready(ProcessedImage),
}

/// Everything that can stop a request short of a download.
///
/// Usage errors (see [`RequestError::is_usage_error`]) come from the
/// submission; the rest are server-side failures.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    InvalidDimensions(#[from] SizeError),
    #[error(transparent)]
    InvalidSelection(#[from] SelectionError),
    #[error(transparent)]
    EmptyCropRegion(#[from] TransformError),
    #[error("could not read the uploaded image: {0:#}")]
    Decode(anyhow::Error),
    #[error("object detection failed: {0:#}")]
    Detector(anyhow::Error),
    #[error("failed to encode the output image: {0:#}")]
    Encode(anyhow::Error),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl RequestError {
    fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Errors caused by what the user submitted rather than by the server.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidDimensions(_)
                | Self::InvalidSelection(_)
                | Self::EmptyCropRegion(_)
                | Self::Decode(_)
        )
    }

    /// Message shown to the user in place of the download.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidDimensions(_) => {
                "Width and height must be at least 1 pixel.".to_string()
            }
            Self::InvalidSelection(SelectionError::IndexOutOfRange { index, len }) => format!(
                "Object {} does not exist; choose one of the {len} detected object(s).",
                index + 1
            ),
            Self::InvalidSelection(SelectionError::NoDetections) => {
                "No objects detected in the uploaded image.".to_string()
            }
            Self::EmptyCropRegion(_) => {
                "The selected object has an empty area and cannot be cropped.".to_string()
            }
            Self::Decode(err) => format!("Could not read the uploaded image: {err:#}"),
            Self::Detector(_) | Self::Encode(_) | Self::Io { .. } => {
                format!("An error occurred: {self}")
            }
        }
    }
}

/// Runs upload requests against one shared detector.
pub struct Pipeline {
    detector: Arc<dyn Detector>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(detector: Arc<dyn Detector>, config: PipelineConfig) -> Self {
        Self { detector, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn options(&self) -> &ProcessOptions {
        &self.config.options
    }

    pub fn detector(&self) -> &Arc<dyn Detector> {
        &self.detector
    }

    /// Process one upload end to end.
    pub fn handle(
        &self,
        upload: Upload,
        request: RequestInput,
    ) -> Result<ProcessOutcome, RequestError> {
        let _guard = timing_guard("focal_core::pipeline", log::Level::Info);
        let options = &self.config.options;

        let size = options.resolve_size(request.width, request.height)?;
        let format = options.resolve_format(request.format);

        fs::create_dir_all(&self.config.scratch_dir).map_err(|e| {
            RequestError::io(
                format!(
                    "failed to create scratch directory {}",
                    self.config.scratch_dir.display()
                ),
                e,
            )
        })?;

        let safe_name = sanitize_file_name(&upload.file_name);
        let staged = ScratchFile::claim(self.config.scratch_dir.join(format!("temp_{safe_name}")));
        fs::write(staged.path(), &upload.bytes).map_err(|e| {
            RequestError::io(format!("failed to stage {}", staged.path().display()), e)
        })?;

        let image = {
            let _guard = timing_guard("focal_core::decode", log::Level::Debug);
            decode_image(&upload.bytes).map_err(RequestError::Decode)?
        };

        let detections = self
            .detector
            .detect_path(staged.path())
            .map_err(RequestError::Detector)?;
        if detections.is_empty() {
            info!("No objects detected in {safe_name}");
            return Ok(ProcessOutcome::NoDetections);
        }

        let region = select_with_mode(&detections, options.selection_mode, request.selection)?;
        let selected = match options.selection_mode {
            SelectionMode::First => 0,
            SelectionMode::UserChosen => request.selection.unwrap_or(0),
        };
        debug!(
            "Cropping detection {} of {} (class {}, confidence {:.2})",
            selected + 1,
            detections.len(),
            region.class_id,
            region.confidence
        );

        let resized = transform_with_filter(&image, &region.bbox, size, self.config.resize_filter)?;

        let file_name = download_file_name(&upload.file_name, format);
        let output = ScratchFile::claim(
            self.config
                .scratch_dir
                .join(download_file_name(&safe_name, format)),
        );
        {
            let _guard = timing_guard("focal_core::encode", log::Level::Debug);
            save_image(&resized, output.path(), format, &self.config.encode)
                .map_err(RequestError::Encode)?;
        }
        let bytes = fs::read(output.path()).map_err(|e| {
            RequestError::io(format!("failed to read {}", output.path().display()), e)
        })?;

        info!(
            "Produced {file_name} ({}x{}, {} bytes) from {safe_name}",
            size.width(),
            size.height(),
            bytes.len()
        );

        let choices = describe_choices(&detections);
        Ok(ProcessOutcome::Ready(ProcessedImage {
            bytes,
            file_name,
            format,
            width: size.width(),
            height: size.height(),
            detections,
            selected,
            choices,
        }))
    }
}

/// A file in the scratch directory that is deleted when the guard drops.
struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    fn claim(path: PathBuf) -> Self {
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path)
            && err.kind() != io::ErrorKind::NotFound
        {
            warn!(
                "Failed to remove scratch file {}: {err}",
                self.path.display()
            );
        }
    }
}
