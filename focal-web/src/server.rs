//! HTTP server: the upload page plus a small JSON/bytes API.

use std::{
    fmt::Write,
    net::SocketAddr,
    sync::{Arc, Mutex, PoisonError},
};

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use focal_core::{
    Detection, Pipeline, ProcessOptions, ProcessOutcome, ProcessedImage, RequestError, RequestInput, Upload,
};
use focal_utils::decode_image;
use log::{error, info, warn};
use serde::Serialize;

use crate::annotate::annotated_png;
use crate::form::{FormError, SubmittedForm, read_form};
use crate::page::{CarriedUpload, NO_DETECTIONS_MESSAGE, Notice, PageView, ResultView, render_page};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// One request at a time goes through the pipeline.
    pipeline: Arc<Mutex<Pipeline>>,
    options: ProcessOptions,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            options: *pipeline.options(),
            pipeline: Arc::new(Mutex::new(pipeline)),
        }
    }

    /// Run `handle` on a blocking thread, holding the pipeline lock.
    async fn process(
        &self,
        upload: Upload,
        input: RequestInput,
    ) -> Result<Processed, RequestError> {
        let pipeline = Arc::clone(&self.pipeline);
        let joined = tokio::task::spawn_blocking(move || {
            let pipeline = pipeline.lock().unwrap_or_else(PoisonError::into_inner);
            let source_bytes = upload.bytes.clone();
            let outcome = pipeline.handle(upload, input)?;
            let annotated = match &outcome {
                ProcessOutcome::Ready(processed) => preview(&source_bytes, processed),
                ProcessOutcome::NoDetections => None,
            };
            Ok::<_, RequestError>(Processed { outcome, annotated })
        })
        .await;

        joined.unwrap_or_else(|err| {
            error!("Pipeline task failed: {err}");
            Err(RequestError::Detector(anyhow::anyhow!(
                "processing was interrupted"
            )))
        })
    }
}

/// Pipeline result plus the annotated preview.
struct Processed {
    outcome: ProcessOutcome,
    annotated: Option<Vec<u8>>,
}

fn preview(source: &[u8], processed: &ProcessedImage) -> Option<Vec<u8>> {
    let image = decode_image(source).ok()?;
    match annotated_png(&image, &processed.detections, Some(processed.selected)) {
        Ok(png) => Some(png),
        Err(err) => {
            warn!("Failed to render detection preview: {err:#}");
            None
        }
    }
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index_handler).post(upload_handler))
        .route("/health", get(health_handler))
        .route("/api/v1/detect", post(detect_handler))
        .route("/api/v1/crop", post(crop_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

/// Run the HTTP server until Ctrl+C or SIGTERM.
pub async fn run_server(
    state: AppState,
    host: &str,
    port: u16,
    max_upload_bytes: usize,
) -> Result<()> {
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;

    let app = router(state, max_upload_bytes);

    info!("Server listening on http://{addr}");
    info!("Endpoints:");
    info!("  GET  /               - Upload page");
    info!("  POST /               - Detect, crop and resize (HTML)");
    info!("  POST /api/v1/detect  - Detections as JSON");
    info!("  POST /api/v1/crop    - Resized image bytes");
    info!("  GET  /health         - Health check");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn index_handler(State(state): State<AppState>) -> Html<String> {
    let options = state.options;
    Html(render_page(&PageView::empty(&options)))
}

async fn upload_handler(State(state): State<AppState>, multipart: Multipart) -> Html<String> {
    let options = state.options;

    let mut form = match read_form(multipart).await {
        Ok(form) => form,
        Err(err) => {
            warn!("Rejected form submission: {err}");
            return Html(render_page(&PageView {
                notice: Some(Notice::Error(err.to_string())),
                ..PageView::empty(&options)
            }));
        }
    };

    let width = form.width.clone();
    let height = form.height.clone();
    let preset = form.preset.clone();
    let format = form.request_input().ok().and_then(|input| input.format);

    let Some(upload) = form.upload.take() else {
        return Html(render_page(&PageView {
            notice: Some(Notice::Error(FormError::MissingFile.to_string())),
            width,
            height,
            preset,
            format,
            ..PageView::empty(&options)
        }));
    };
    let carried_name = upload.file_name.clone();
    let carried_bytes = upload.bytes.clone();
    let carried = Some(CarriedUpload {
        file_name: &carried_name,
        bytes: &carried_bytes,
    });

    let input = match form.request_input() {
        Ok(input) => input,
        Err(err) => {
            return Html(render_page(&PageView {
                notice: Some(Notice::Error(err.to_string())),
                carried,
                width,
                height,
                preset,
                format,
                ..PageView::empty(&options)
            }));
        }
    };

    match state.process(upload, input).await {
        Ok(Processed {
            outcome: ProcessOutcome::NoDetections,
            ..
        }) => Html(render_page(&PageView {
            notice: Some(Notice::Warning(NO_DETECTIONS_MESSAGE.to_string())),
            carried,
            width,
            height,
            preset,
            format,
            ..PageView::empty(&options)
        })),
        Ok(Processed {
            outcome: ProcessOutcome::Ready(processed),
            annotated,
        }) => Html(render_page(&PageView {
            result: Some(ResultView {
                processed: &processed,
                annotated_png: annotated.as_deref(),
            }),
            carried,
            width,
            height,
            preset,
            format: Some(processed.format),
            ..PageView::empty(&options)
        })),
        Err(err) => {
            log_request_error(&err);
            Html(render_page(&PageView {
                notice: Some(Notice::Error(err.user_message())),
                carried,
                width,
                height,
                preset,
                format,
                ..PageView::empty(&options)
            }))
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct DetectResponse {
    file_name: String,
    width: u32,
    height: u32,
    detections: Vec<DetectionRecord>,
}

#[derive(Serialize)]
struct DetectionRecord {
    class_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<&'static str>,
    confidence: f32,
    bbox: [f32; 4],
}

impl From<&Detection> for DetectionRecord {
    fn from(detection: &Detection) -> Self {
        let b = detection.bbox;
        Self {
            class_id: detection.class_id,
            label: detection.label(),
            confidence: detection.confidence,
            bbox: [b.x1, b.y1, b.x2, b.y2],
        }
    }
}

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Run the detector only; no crop, no scratch output.
async fn detect_handler(State(state): State<AppState>, multipart: Multipart) -> Response {
    let upload = match read_form(multipart).await {
        Ok(SubmittedForm {
            upload: Some(upload),
            ..
        }) => upload,
        Ok(_) => return json_error(StatusCode::BAD_REQUEST, FormError::MissingFile.to_string()),
        Err(err) => return json_error(StatusCode::BAD_REQUEST, err.to_string()),
    };

    let pipeline = Arc::clone(&state.pipeline);
    let file_name = upload.file_name.clone();
    let result = tokio::task::spawn_blocking(move || {
        let image = decode_image(&upload.bytes).map_err(RequestError::Decode)?;
        let pipeline = pipeline.lock().unwrap_or_else(PoisonError::into_inner);
        let detections = pipeline
            .detector()
            .detect_image(&image)
            .map_err(RequestError::Detector)?;
        Ok::<_, RequestError>((image.width(), image.height(), detections))
    })
    .await;

    match result {
        Ok(Ok((width, height, detections))) => Json(DetectResponse {
            file_name,
            width,
            height,
            detections: detections.iter().map(DetectionRecord::from).collect(),
        })
        .into_response(),
        Ok(Err(err)) => {
            log_request_error(&err);
            json_error(status_for(&err), err.user_message())
        }
        Err(err) => {
            error!("Detect task failed: {err}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "processing was interrupted")
        }
    }
}

/// Full pipeline; responds with the encoded image as an attachment.
async fn crop_handler(State(state): State<AppState>, multipart: Multipart) -> Response {
    let mut form = match read_form(multipart).await {
        Ok(form) => form,
        Err(err) => return json_error(StatusCode::BAD_REQUEST, err.to_string()),
    };
    let Some(upload) = form.upload.take() else {
        return json_error(StatusCode::BAD_REQUEST, FormError::MissingFile.to_string());
    };
    let input = match form.request_input() {
        Ok(input) => input,
        Err(err) => return json_error(StatusCode::BAD_REQUEST, err.to_string()),
    };

    match state.process(upload, input).await {
        Ok(Processed {
            outcome: ProcessOutcome::Ready(processed),
            ..
        }) => {
            let disposition = attachment_disposition(&processed.file_name);
            (
                [
                    (header::CONTENT_TYPE, processed.mime_type().to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                processed.bytes,
            )
                .into_response()
        }
        Ok(Processed {
            outcome: ProcessOutcome::NoDetections,
            ..
        }) => json_error(StatusCode::UNPROCESSABLE_ENTITY, NO_DETECTIONS_MESSAGE),
        Err(err) => {
            log_request_error(&err);
            json_error(status_for(&err), err.user_message())
        }
    }
}

/// `Content-Disposition` for a download named `file_name`.
///
/// Names that are not plain ASCII also get an RFC 5987 `filename*` carrying
/// the exact UTF-8 name; `filename` holds an ASCII stand-in.
fn attachment_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c == ' ' || c.is_ascii_graphic() => c,
            _ => '_',
        })
        .collect();
    if fallback == file_name {
        return format!("attachment; filename=\"{fallback}\"");
    }

    let mut encoded = String::with_capacity(file_name.len() * 3);
    for byte in file_name.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(char::from(byte));
        } else {
            let _ = write!(encoded, "%{byte:02X}");
        }
    }
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

fn status_for(err: &RequestError) -> StatusCode {
    if err.is_usage_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn log_request_error(err: &RequestError) {
    if err.is_usage_error() {
        warn!("Request rejected: {err}");
    } else {
        error!("Request failed: {err}");
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use focal_core::{BoundingBox, Detector, PipelineConfig};
    use focal_utils::EncodeOptions;
    use http_body_util::BodyExt;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage, imageops::FilterType};
    use std::path::Path;
    use tower::ServiceExt;

    const BOUNDARY: &str = "focal-test-boundary";

    struct StubDetector(Vec<Detection>);

    impl Detector for StubDetector {
        fn detect_image(&self, _image: &DynamicImage) -> anyhow::Result<Vec<Detection>> {
            Ok(self.0.clone())
        }
    }

    fn app(detections: Vec<Detection>, scratch: &Path, options: ProcessOptions) -> Router {
        let pipeline = Pipeline::new(
            Arc::new(StubDetector(detections)),
            PipelineConfig {
                scratch_dir: scratch.to_path_buf(),
                options,
                encode: EncodeOptions::default(),
                resize_filter: FilterType::Triangle,
            },
        );
        router(AppState::new(pipeline), 1024 * 1024)
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([40, 80, 120])));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    /// Build a multipart body with an optional file part and text fields.
    fn multipart_body(file: Option<(&str, &[u8])>, fields: &[(&str, &str)]) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some((name, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn post(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        response
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec()
    }

    fn det(x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection {
            class_id: 0,
            confidence: 0.75,
            bbox: BoundingBox::new(x1, y1, x2, y2),
        }
    }

    #[tokio::test]
    async fn index_serves_upload_form() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(vec![], dir.path(), ProcessOptions::custom())
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(html.contains("enctype=\"multipart/form-data\""));
    }

    #[tokio::test]
    async fn health_reports_version() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(vec![], dir.path(), ProcessOptions::custom())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn page_warns_when_nothing_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let png = png_bytes(32, 32);
        let response = app(vec![], dir.path(), ProcessOptions::custom())
            .oneshot(post("/", multipart_body(Some(("blank.png", &png)), &[])))
            .await
            .unwrap();
        let html = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(html.contains(NO_DETECTIONS_MESSAGE));
        assert!(!html.contains("download="));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn page_renders_result_with_download_link() {
        let dir = tempfile::tempdir().unwrap();
        let png = png_bytes(64, 48);
        let response = app(
            vec![det(4.0, 4.0, 40.0, 30.0), det(10.0, 10.0, 20.0, 20.0)],
            dir.path(),
            ProcessOptions::custom(),
        )
        .oneshot(post(
            "/",
            multipart_body(
                Some(("photo.png", &png)),
                &[("selection", "1"), ("width", "50"), ("height", "25"), ("format", "jpg")],
            ),
        ))
        .await
        .unwrap();
        let html = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(html.contains("download=\"resized_photo.jpg\""));
        assert!(html.contains("data:image/jpeg;base64,"));
        assert!(html.contains("<option value=\"1\" selected>"));
        assert!(html.contains("name=\"source\""));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn page_rejects_zero_width() {
        let dir = tempfile::tempdir().unwrap();
        let png = png_bytes(16, 16);
        let response = app(vec![det(0.0, 0.0, 8.0, 8.0)], dir.path(), ProcessOptions::custom())
            .oneshot(post(
                "/",
                multipart_body(Some(("a.png", &png)), &[("width", "0"), ("height", "10")]),
            ))
            .await
            .unwrap();
        let html = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(html.contains("Width and height must be at least 1 pixel."));
        assert!(!html.contains("download="));
    }

    #[tokio::test]
    async fn page_without_file_asks_for_one() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(vec![], dir.path(), ProcessOptions::custom())
            .oneshot(post("/", multipart_body(None, &[("width", "10")])))
            .await
            .unwrap();
        let html = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(html.contains("Please choose a PNG or JPEG image to upload."));
    }

    #[tokio::test]
    async fn crop_api_returns_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let png = png_bytes(80, 60);
        let response = app(vec![det(10.0, 10.0, 70.0, 50.0)], dir.path(), ProcessOptions::basic())
            .oneshot(post("/api/v1/crop", multipart_body(Some(("shot.final.png", &png)), &[])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"resized_shot.png\""
        );
        let image = image::load_from_memory(&body_bytes(response).await).unwrap();
        assert_eq!((image.width(), image.height()), (1080, 1080));
    }

    #[tokio::test]
    async fn crop_api_status_codes() {
        let dir = tempfile::tempdir().unwrap();
        let png = png_bytes(20, 20);

        let none = app(vec![], dir.path(), ProcessOptions::custom())
            .oneshot(post("/api/v1/crop", multipart_body(Some(("x.png", &png)), &[])))
            .await
            .unwrap();
        assert_eq!(none.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let bad_index = app(vec![det(0.0, 0.0, 5.0, 5.0)], dir.path(), ProcessOptions::custom())
            .oneshot(post(
                "/api/v1/crop",
                multipart_body(Some(("x.png", &png)), &[("selection", "5")]),
            ))
            .await
            .unwrap();
        assert_eq!(bad_index.status(), StatusCode::BAD_REQUEST);

        let not_image = app(vec![det(0.0, 0.0, 5.0, 5.0)], dir.path(), ProcessOptions::custom())
            .oneshot(post(
                "/api/v1/crop",
                multipart_body(Some(("x.png", b"hello")), &[]),
            ))
            .await
            .unwrap();
        assert_eq!(not_image.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn detect_api_lists_detections() {
        let dir = tempfile::tempdir().unwrap();
        let png = png_bytes(30, 20);
        let response = app(vec![det(1.0, 2.0, 3.0, 4.0)], dir.path(), ProcessOptions::custom())
            .oneshot(post("/api/v1/detect", multipart_body(Some(("d.png", &png)), &[])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(json["width"], 30);
        assert_eq!(json["detections"][0]["label"], "person");
        assert_eq!(json["detections"][0]["bbox"][2], 3.0);
    }

    #[tokio::test]
    async fn replacing_the_image_drops_the_old_selection() {
        let dir = tempfile::tempdir().unwrap();
        let old = png_bytes(24, 24);
        let new = png_bytes(40, 30);
        let encoded_old = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &old);
        let response = app(vec![det(2.0, 2.0, 20.0, 20.0)], dir.path(), ProcessOptions::custom())
            .oneshot(post(
                "/",
                multipart_body(
                    Some(("new.png", &new)),
                    &[
                        ("source", encoded_old.as_str()),
                        ("filename", "old.png"),
                        ("selection", "2"),
                    ],
                ),
            ))
            .await
            .unwrap();
        let html = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(!html.contains("does not exist"), "{html}");
        assert!(html.contains("download=\"resized_new.png\""));
        assert!(html.contains("<option value=\"0\" selected>"));
    }

    #[tokio::test]
    async fn carried_image_keeps_its_selection() {
        let dir = tempfile::tempdir().unwrap();
        let png = png_bytes(40, 30);
        let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &png);
        let response = app(
            vec![det(2.0, 2.0, 20.0, 20.0), det(5.0, 5.0, 30.0, 25.0)],
            dir.path(),
            ProcessOptions::custom(),
        )
        .oneshot(post(
            "/",
            multipart_body(
                None,
                &[("source", encoded.as_str()), ("filename", "kept.png"), ("selection", "1")],
            ),
        ))
        .await
        .unwrap();
        let html = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(html.contains("download=\"resized_kept.png\""));
        assert!(html.contains("<option value=\"1\" selected>"));
    }

    #[tokio::test]
    async fn page_preset_sets_output_size() {
        let dir = tempfile::tempdir().unwrap();
        let png = png_bytes(64, 64);
        let response = app(vec![det(0.0, 0.0, 40.0, 40.0)], dir.path(), ProcessOptions::custom())
            .oneshot(post(
                "/api/v1/crop",
                multipart_body(
                    Some(("p.png", &png)),
                    &[("preset", "landscape"), ("width", "10"), ("height", "10")],
                ),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let image = image::load_from_memory(&body_bytes(response).await).unwrap();
        assert_eq!((image.width(), image.height()), (1080, 566));
    }

    #[test]
    fn disposition_encodes_non_ascii_names() {
        assert_eq!(
            attachment_disposition("resized_street scene.png"),
            "attachment; filename=\"resized_street scene.png\""
        );
        assert_eq!(
            attachment_disposition("resized_Café \"x\".jpg"),
            "attachment; filename=\"resized_Caf_ _x_.jpg\"; filename*=UTF-8''resized_Caf%C3%A9%20%22x%22.jpg"
        );
    }
}
