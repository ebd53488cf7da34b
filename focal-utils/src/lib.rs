//! Common helpers shared across the focal-crop crates.

/// Application configuration and settings management.
pub mod config;
/// Image loading, decoding, and resize helpers.
pub mod image_utils;
/// Image output helpers (encoding, download naming).
pub mod output;
/// Instrumentation helpers for optional performance tracing.
pub mod telemetry;

use std::path::Path;

use anyhow::Result;
use log::LevelFilter;

pub use config::{
    AppSettings, DetectionSettings, InputDimensions, OutputLayout, OutputSettings, ResizeQuality,
    ServerSettings, TelemetrySettings, Variant,
};
pub use image_utils::{compute_resize_scales, decode_image, load_image, resize_image};
pub use output::{
    EncodeOptions, OutputFormat, PngCompression, download_file_name, encode_image, save_image,
    sanitize_file_name,
};
pub use telemetry::{
    TimingGuard, configure as configure_telemetry, telemetry_allows, telemetry_enabled,
    telemetry_level, timing_guard, timing_guard_if,
};

/// Initialize logging once for the server and test binaries.
///
/// This function respects the `RUST_LOG` environment variable if it is set.
/// Otherwise, it falls back to the provided default filter level.
pub fn init_logging(default_filter: LevelFilter) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter.as_str()),
    );
    builder.filter_module(telemetry::TELEMETRY_TARGET, LevelFilter::Trace);

    if builder.try_init().is_err() {
        // Logger already initialized; nothing to do.
    }
    Ok(())
}

/// Validate that a path exists and resolve it to an absolute path.
pub fn normalize_path<P: AsRef<Path>>(path: P) -> Result<std::path::PathBuf> {
    let path = path.as_ref();
    anyhow::ensure!(path.exists(), "path does not exist: {}", path.display());
    Ok(path.canonicalize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_path_rejects_missing_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.json");
        assert!(normalize_path(&missing).is_err());
        assert!(normalize_path(dir.path()).is_ok());
    }

    #[test]
    fn init_logging_is_idempotent() {
        init_logging(LevelFilter::Warn).expect("first init");
        init_logging(LevelFilter::Debug).expect("second init is a no-op");
    }
}
