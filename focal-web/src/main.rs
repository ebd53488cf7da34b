mod annotate;
mod args;
mod config;
mod form;
mod page;
mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use focal_core::{
    Detector, Pipeline, PipelineConfig, PostprocessConfig, PreprocessConfig, YoloDetector,
};
use focal_utils::{configure_telemetry, init_logging};
use log::info;

use crate::{
    args::ServeArgs,
    config::{apply_cli_overrides, load_settings},
    server::{AppState, run_server},
};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(log::LevelFilter::Info)?;
    let args = ServeArgs::parse();

    let mut settings = load_settings(args.config.as_ref())?;
    apply_cli_overrides(&mut settings, &args);

    configure_telemetry(
        settings.telemetry.enabled,
        settings.telemetry.level_filter(),
    );
    if settings.telemetry.enabled {
        info!(
            "Telemetry logging enabled (level={:?})",
            settings.telemetry.level_filter()
        );
    }

    let model_path = settings.model_path();
    let preprocess_config: PreprocessConfig = settings.input.into();
    let postprocess_config: PostprocessConfig = (&settings.detection).into();
    let input_size = preprocess_config.input_size;

    info!(
        "Loading YOLO model from {} at resolution {}x{}",
        model_path.display(),
        input_size.width,
        input_size.height
    );
    let detector: Arc<dyn Detector> = Arc::new(
        YoloDetector::new(&model_path, preprocess_config, postprocess_config)
            .with_context(|| format!("failed to load detector from {}", model_path.display()))?,
    );

    let pipeline_config = PipelineConfig::from_settings(&settings)?;
    info!(
        "Serving the {} variant; scratch files go to {}",
        settings.output.variant,
        pipeline_config.scratch_dir.display()
    );
    let state = AppState::new(Pipeline::new(detector, pipeline_config));

    run_server(
        state,
        &settings.server.host,
        settings.server.port,
        settings.server.max_upload_bytes,
    )
    .await
}
