use std::{io::Cursor, path::Path, sync::Arc};

use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing, Router,
};
use hemavision_core::{
    Backend, Classifier, ClassifierError, ModelSlot, Network, Pipeline, Preprocessor, Simulator,
};
use hemavision_server::{app, routes, upload::UploadStore, AppState};
use hemavision_types::prelude::*;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;

const BOUNDARY: &str = "hemavision-test-boundary";
const LIMIT: usize = 64 * 1024;
const FEATURES: usize = 8 * 8 * 3;

fn router(backend: Backend, uploads: &Path) -> Router {
    let pipeline = Pipeline::builder()
        .backend(backend)
        .preprocessor(Preprocessor::builder().size(8).build())
        .build();
    let uploads = UploadStore::builder().dir(uploads).build();
    app(AppState { pipeline, uploads }, LIMIT)
}

fn demo() -> (Router, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    (router(Backend::Demo(Simulator), dir.path()), dir)
}

fn png() -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 40, Rgb([180, 90, 160])))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn upload(field: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    Request::post("/predict")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn text_part(field: &str, value: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n--{BOUNDARY}--\r\n"
    );
    Request::post("/predict")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn stored_files(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn health_reports_demo_mode() {
    let (app, _dir) = demo();
    let (status, body) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["mode"], "demo");
    assert_eq!(body["model_loaded"], false);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn health_reports_missing_model() {
    let dir = tempfile::tempdir().unwrap();
    let slot = ModelSlot::new(dir.path().join("missing.bin"), FEATURES);
    let app = router(Backend::Model(Arc::new(slot)), dir.path());
    let (status, body) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "model");
    assert_eq!(body["model_loaded"], false);
}

#[tokio::test]
async fn info_returns_the_static_blob() {
    let (app, _dir) = demo();
    let (status, body) = send(app, get("/info/Lymphocytes")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "description": "Lymphocytes are crucial for adaptive immunity and antibody production.",
            "morphology": "Small cell, large nucleus, scanty cytoplasm",
            "normal_range": "20-40% of white blood cells",
            "function": "Immune response and antibody production",
        })
    );
}

#[tokio::test]
async fn info_rejects_unknown_labels() {
    let (app, _dir) = demo();
    let (status, body) = send(app, get("/info/Bacteria")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid cell type" }));
}

#[tokio::test]
async fn gif_uploads_are_rejected_without_touching_disk() {
    let (app, dir) = demo();
    let (status, body) = send(app, upload("file", "cell.gif", b"GIF89a")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid file type. Use: png, jpg, jpeg" }));
    assert!(stored_files(dir.path()).is_empty());
}

#[tokio::test]
async fn missing_file_part_is_rejected() {
    let (app, _dir) = demo();
    let (status, body) = send(app, upload("attachment", "cell.png", &png())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No file provided" }));
}

#[tokio::test]
async fn non_multipart_body_is_rejected() {
    let (app, _dir) = demo();
    let request = Request::post("/predict")
        .header("content-type", "text/plain")
        .body(Body::from("hello"))
        .unwrap();
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No file provided" }));
}

#[tokio::test]
async fn empty_filename_is_not_selected() {
    let (app, _dir) = demo();
    let (status, body) = send(app, upload("file", "", &png())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No file selected" }));
}

#[tokio::test]
async fn text_field_named_file_is_not_a_file() {
    let (app, dir) = demo();
    let (status, body) = send(app, text_part("file", "cell.png")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No file provided" }));
    assert!(stored_files(dir.path()).is_empty());
}

#[tokio::test]
async fn demo_prediction_succeeds_and_persists_the_upload() {
    let (app, dir) = demo();
    let (status, body) = send(app, upload("file", "sample.png", &png())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let expected = Simulator::chosen_class("sample.png");
    assert_eq!(body["predicted_cell"], expected.to_string());
    assert_eq!(body["report"]["predicted_cell_type"], expected.to_string());
    assert_eq!(body["report"]["confidence"], body["confidence"]);
    assert_eq!(body["all_predictions"].as_object().unwrap().len(), 4);
    assert!(body["report"]["warning"].is_string());
    assert!(body["chart"]
        .as_str()
        .unwrap()
        .starts_with("data:image/png;base64,"));

    let uploaded = body["uploaded_file"].as_str().unwrap();
    assert!(uploaded.ends_with("_sample.png"));
    assert_eq!(body["report"]["filename"], uploaded);
    assert_eq!(stored_files(dir.path()), vec![uploaded.to_owned()]);
}

#[tokio::test]
async fn demo_predictions_repeat_per_filename() {
    let (app, _dir) = demo();
    let (_, first) = send(app.clone(), upload("file", "sample.jpg", &png())).await;
    let (_, second) = send(app, upload("file", "sample.jpg", &png())).await;
    assert_eq!(first["predicted_cell"], second["predicted_cell"]);
    assert_eq!(first["confidence"], second["confidence"]);
    assert_ne!(first["uploaded_file"], second["uploaded_file"]);
}

#[tokio::test]
async fn undecodable_image_is_a_server_error() {
    let (app, _dir) = demo();
    let (status, body) = send(app, upload("file", "broken.png", b"not an image")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to process image" }));
}

#[tokio::test]
async fn missing_model_is_a_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let slot = ModelSlot::new(dir.path().join("missing.bin"), FEATURES);
    let app = router(Backend::Model(Arc::new(slot)), &dir.path().join("uploads"));
    let (status, body) = send(app, upload("file", "cell.png", &png())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to process image" }));
}

#[tokio::test]
async fn loaded_model_serves_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("model.bin");
    Network::untrained()
        .input_size(FEATURES)
        .hidden(&[6])
        .call()
        .save_data(&model)
        .unwrap();
    let slot = ModelSlot::new(&model, FEATURES);
    slot.warm().unwrap();
    let app = router(Backend::Model(Arc::new(slot)), &dir.path().join("uploads"));

    let (status, health) = send(app.clone(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["model_loaded"], true);

    let (status, body) = send(app, upload("file", "cell.jpeg", &png())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["uploaded_file"].as_str().unwrap().ends_with("_cell.jpeg"));
}

#[tokio::test]
async fn model_with_wrong_input_width_is_not_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("model.bin");
    Network::untrained()
        .input_size(12)
        .call()
        .save_data(&model)
        .unwrap();
    let slot = ModelSlot::new(&model, FEATURES);
    assert!(slot.warm().is_err());
    let app = router(Backend::Model(Arc::new(slot)), &dir.path().join("uploads"));

    let (status, health) = send(app.clone(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["model_loaded"], false);

    let (status, body) = send(app, upload("file", "cell.png", &png())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to process image" }));
}

struct Panicking;

impl Classifier for Panicking {
    fn predict(&self, _batch: &ImageBatch) -> Result<Probabilities, ClassifierError> {
        panic!("classifier exploded")
    }
}

#[tokio::test]
async fn panicking_classifier_is_an_internal_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(Backend::Model(Arc::new(Panicking)), dir.path());
    let (status, body) = send(app, upload("file", "cell.png", &png())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Internal server error" }));
}

#[tokio::test]
async fn panicking_handler_is_an_internal_error() {
    let app = Router::new()
        .route("/boom", routing::get(|| async { panic!("handler exploded") as () }))
        .layer(CatchPanicLayer::custom(routes::panic_response));
    let (status, body) = send(app, get("/boom")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Internal server error" }));
}

#[tokio::test]
async fn oversized_uploads_are_refused() {
    let (app, dir) = demo();
    let (status, body) = send(app, upload("file", "big.png", &vec![0u8; LIMIT * 2])).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].is_string());
    assert!(stored_files(dir.path()).is_empty());
}

#[tokio::test]
async fn unknown_routes_are_json_404s() {
    let (app, _dir) = demo();
    let (status, body) = send(app, get("/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Endpoint not found" }));
}

#[tokio::test]
async fn index_serves_the_upload_page() {
    let (app, _dir) = demo();
    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("/predict"));
}
