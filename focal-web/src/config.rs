//! Configuration loading and CLI override logic.

use std::path::PathBuf;

use anyhow::{Context, Result};
use focal_core::preset_size;
use focal_utils::{
    config::{AppSettings, default_settings_path},
    normalize_path,
};
use log::{info, warn};

use crate::args::ServeArgs;

/// Load application settings from a file or use defaults.
pub fn load_settings(config_path: Option<&PathBuf>) -> Result<AppSettings> {
    if let Some(path) = config_path {
        let resolved = normalize_path(path)?;
        let settings = AppSettings::load_from_path(&resolved)?;
        info!("Loaded settings from {}", resolved.display());
        Ok(settings)
    } else {
        let default_path = default_settings_path();
        if default_path.exists() {
            let settings = AppSettings::load_from_path(&default_path).with_context(|| {
                format!(
                    "failed to load default settings from {}",
                    default_path.display()
                )
            })?;
            info!("Loaded settings from {}", default_path.display());
            Ok(settings)
        } else {
            Ok(AppSettings::default())
        }
    }
}

/// Apply command-line arguments to override loaded or default settings.
pub fn apply_cli_overrides(settings: &mut AppSettings, args: &ServeArgs) {
    if let Some(model) = args.model.as_ref() {
        settings.model_path = Some(model.to_string_lossy().into_owned());
    }
    if let Some(host) = args.host.as_ref() {
        settings.server.host = host.clone();
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    if let Some(dir) = args.scratch_dir.as_ref() {
        settings.server.scratch_dir = Some(dir.to_string_lossy().into_owned());
    }

    if args.telemetry {
        settings.telemetry.enabled = true;
    }
    if let Some(level) = args.telemetry_level.as_ref() {
        let normalized = level.trim();
        if !normalized.is_empty() {
            let lower = normalized.to_ascii_lowercase();
            if lower == "off" {
                settings.telemetry.enabled = false;
            }
            settings.telemetry.level = lower;
        }
    }

    if let Some(width) = args.input_width {
        settings.input.width = width;
    }
    if let Some(height) = args.input_height {
        settings.input.height = height;
    }
    if let Some(mode) = args.resize_quality {
        settings.input.resize_quality = mode;
        settings.output.resize_quality = mode;
    }
    if let Some(score) = args.score_threshold {
        settings.detection.score_threshold = score;
    }
    if let Some(nms) = args.nms_threshold {
        settings.detection.nms_threshold = nms;
    }
    if let Some(top_k) = args.top_k {
        settings.detection.top_k = top_k;
    }
    if let Some(layout) = args.output_layout {
        settings.detection.output_layout = layout;
    }

    if let Some(variant) = args.variant {
        settings.output.variant = variant;
    }
    if let Some(preset_name) = args.preset.as_ref() {
        settings.output.preset = preset_name.trim().to_ascii_lowercase();
        match preset_size(preset_name) {
            Ok(Some(size)) => {
                settings.output.width = size.width();
                settings.output.height = size.height();
            }
            Ok(None) => {}
            Err(err) => warn!("{err}"),
        }
    }
    if let Some(width) = args.output_width {
        settings.output.width = width;
        settings.output.preset = "custom".to_string();
    }
    if let Some(height) = args.output_height {
        settings.output.height = height;
        settings.output.preset = "custom".to_string();
    }
    if let Some(format) = args.format {
        settings.output.format = format;
    }

    settings.output.sanitize();
}
