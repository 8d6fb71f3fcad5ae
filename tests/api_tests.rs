//! Router-level tests with an in-memory store and fake model/geocoder

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::Engine;
use image::{DynamicImage, ImageFormat, RgbImage};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use nivedan::api::{create_rest_router, AppState};
use nivedan::engine::{Classification, ImageClassifier};
use nivedan::geo::ReverseGeocoder;
use nivedan::service::ComplaintService;
use nivedan::storage::{ComplaintStore, SqliteStore, UnconfiguredStore};

struct FixedClassifier {
    fail: bool,
}

impl ImageClassifier for FixedClassifier {
    fn classify(&self, _image: &DynamicImage) -> anyhow::Result<Classification> {
        if self.fail {
            anyhow::bail!("output tensor has 3 values, expected 6");
        }
        Ok(Classification {
            issue_type: "potholes".to_string(),
            confidence: 0.91,
        })
    }

    fn model_loaded(&self) -> bool {
        true
    }

    fn model_path(&self) -> String {
        "model/test.onnx".to_string()
    }
}

struct FixedGeocoder;

#[async_trait]
impl ReverseGeocoder for FixedGeocoder {
    async fn address_for(&self, _lat: f64, _lon: f64) -> String {
        "Mall Road, Kanpur, Uttar Pradesh, 208001, India".to_string()
    }
}

struct TestApp {
    router: Router,
    uploads: TempDir,
}

async fn app_with(store: Arc<dyn ComplaintStore>, fail_classifier: bool) -> TestApp {
    let uploads = TempDir::new().unwrap();
    let service = Arc::new(ComplaintService::new(
        Arc::new(FixedClassifier { fail: fail_classifier }),
        store,
        Arc::new(FixedGeocoder),
        uploads.path().to_path_buf(),
    ));
    let router = create_rest_router(Arc::new(AppState::new(service, 20 * 1024 * 1024)));
    TestApp { router, uploads }
}

async fn app() -> TestApp {
    app_with(Arc::new(SqliteStore::in_memory().await.unwrap()), false).await
}

fn png_data_url() -> String {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, image::Rgb([120, 90, 60])));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(buf.into_inner())
    )
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes) = send_raw(router, method, uri, body).await;
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn send_raw(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn test_health_reports_model_and_storage() {
    let app = app().await;
    let (status, body) = send(&app.router, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["model_path"], "model/test.onnx");
    assert_eq!(body["storage"], "sqlite");
}

#[tokio::test]
async fn test_classify_issue() {
    let app = app().await;
    let (status, body) = send(
        &app.router,
        "POST",
        "/api/classify-issue",
        Some(json!({ "image": png_data_url() })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["issue_type"], "potholes");
    assert!((body["confidence"].as_f64().unwrap() - 0.91).abs() < 1e-6);

    // Legacy alias
    let (status, _) = send(&app.router, "POST", "/predict", Some(json!({ "image": png_data_url() }))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_classify_rejects_bad_input() {
    let app = app().await;

    let (status, body) = send(&app.router, "POST", "/api/classify-issue", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No image provided");

    let (status, body) =
        send(&app.router, "POST", "/api/classify-issue", Some(json!({ "image": "!!!not base64" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid image format. Expected a base64-encoded image string.");

    // Valid base64, not an image
    let junk = format!(
        "data:image/jpeg;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(b"definitely not a jpeg")
    );
    let (status, body) = send(&app.router, "POST", "/api/classify-issue", Some(json!({ "image": junk }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Failed to decode image bytes. mime=image/jpeg");
}

#[tokio::test]
async fn test_classifier_failure_is_500_with_detail() {
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    let app = app_with(store, true).await;

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/classify-issue",
        Some(json!({ "image": png_data_url() })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error during classification.");
    assert!(body["detail"].as_str().unwrap().contains("expected 6"));
}

#[tokio::test]
async fn test_submit_track_update_flow() {
    let app = app().await;

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/submit-complaint",
        Some(json!({
            "issueType": "garbage",
            "userId": "citizen-7",
            "latitude": 26.4499,
            "longitude": 80.3319,
            "description": "Overflowing bins near the market",
            "priority": "high"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["department"], "Sanitation");
    assert_eq!(body["issue_type"], "garbage");
    let id = body["complaint_id"].as_str().unwrap().to_string();

    let (status, tracked) = send(&app.router, "GET", &format!("/api/track-complaint/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tracked["status"], "pending");
    assert_eq!(tracked["priority"], "high");
    assert_eq!(tracked["department"], "Sanitation");

    let (status, details) = send(&app.router, "GET", &format!("/api/complaint/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["user_id"], "citizen-7");
    // No client address, so the geocoder fills it in
    assert_eq!(details["address"], "Mall Road, Kanpur, Uttar Pradesh, 208001, India");
    let letter = details["formal_complaint"].as_str().unwrap();
    assert!(letter.contains("Garbage"));
    assert!(letter.contains("Overflowing bins near the market"));
    assert!(!letter.contains('['));

    let (status, updated) = send(
        &app.router,
        "PUT",
        &format!("/api/complaint/{}/update-status", id),
        Some(json!({ "status": "in_progress" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["message"], "Complaint status updated successfully");
    assert_eq!(updated["complaint"]["status"], "in_progress");
    assert_eq!(updated["complaint"]["priority"], "high");

    let (_, tracked) = send(&app.router, "GET", &format!("/api/track-complaint/{}", id), None).await;
    assert_eq!(tracked["status"], "in_progress");
    assert!(tracked["updated_at"].is_string());
}

#[tokio::test]
async fn test_submit_with_client_key_and_address() {
    let app = app().await;

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/submit-complaint",
        Some(json!({
            "issue_type": "potholes",
            "address": "Civil Lines, Kanpur",
            "firebase_id": "-Nabc123"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["complaint_id"], "-Nabc123");

    let (_, details) = send(&app.router, "GET", "/api/complaint/-Nabc123", None).await;
    assert_eq!(details["address"], "Civil Lines, Kanpur");
    assert_eq!(details["user_id"], "anonymous");
    assert_eq!(details["priority"], "normal");
    assert!(details["latitude"].is_null());
}

#[tokio::test]
async fn test_submit_requires_issue_type() {
    let app = app().await;
    let (status, body) = send(
        &app.router,
        "POST",
        "/api/submit-complaint",
        Some(json!({ "latitude": 26.4, "longitude": 80.3 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Issue type is required");
}

#[tokio::test]
async fn test_unknown_complaint_is_404() {
    let app = app().await;

    let (status, body) = send(&app.router, "GET", "/api/track-complaint/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Complaint not found");

    let (status, _) = send(
        &app.router,
        "PUT",
        "/api/complaint/missing/update-status",
        Some(json!({ "status": "resolved" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_without_fields_is_400() {
    let app = app().await;
    let (_, body) = send(
        &app.router,
        "POST",
        "/api/submit-complaint",
        Some(json!({ "issue_type": "graffiti", "address": "Somewhere" })),
    )
    .await;
    let id = body["complaint_id"].as_str().unwrap();

    let (status, body) = send(
        &app.router,
        "PUT",
        &format!("/api/complaint/{}/update-status", id),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No updates provided");
}

#[tokio::test]
async fn test_map_and_heatmap() {
    let app = app().await;

    // Two reports on the same corner, one across town
    for (lat, lon) in [(26.4499, 80.3319), (26.4503, 80.3322), (26.5123, 80.2329)] {
        let (status, _) = send(
            &app.router,
            "POST",
            "/api/submit-complaint",
            Some(json!({ "issue_type": "potholes", "latitude": lat, "longitude": lon, "address": "Kanpur" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    // No coordinates: left out of both views
    send(
        &app.router,
        "POST",
        "/api/submit-complaint",
        Some(json!({ "issue_type": "garbage" })),
    )
    .await;

    let (status, body) = send(&app.router, "GET", "/api/complaints-map?lat=26.45&lon=80.332&radius=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["complaints"].as_array().unwrap().len(), 2);
    assert_eq!(body["radius"], 1.0);
    assert!(body["complaints"][0]["distance"].as_f64().unwrap() < 1.0);

    let (_, body) = send(&app.router, "GET", "/api/complaints-map?lat=26.45&lon=80.332", None).await;
    assert_eq!(body["radius"], 5.0);
    assert_eq!(body["complaints"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app.router, "GET", "/api/complaints-map?lat=26.45", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Latitude and longitude required");

    let (status, body) = send(&app.router, "GET", "/api/heatmap-data", None).await;
    assert_eq!(status, StatusCode::OK);
    let mut counts: Vec<u64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["count"].as_u64().unwrap())
        .collect();
    counts.sort();
    assert_eq!(counts, vec![1, 2]);

    let (_, body) = send(&app.router, "GET", "/api/all-complaints", None).await;
    assert_eq!(body["total"], 4);
}

#[tokio::test]
async fn test_uploaded_image_is_served() {
    let app = app().await;

    let (_, body) = send(
        &app.router,
        "POST",
        "/api/submit-complaint",
        Some(json!({ "issue_type": "fallen_trees", "address": "Kanpur", "image": png_data_url() })),
    )
    .await;
    let id = body["complaint_id"].as_str().unwrap();

    let (_, details) = send(&app.router, "GET", &format!("/api/complaint/{}", id), None).await;
    let image_path = details["image_path"].as_str().unwrap().to_string();
    assert!(image_path.starts_with("uploads/"));
    assert!(image_path.ends_with(".jpg"));

    let filename = image_path.trim_start_matches("uploads/");
    assert!(app.uploads.path().join(filename).exists());

    for uri in [format!("/api/image/{}", image_path), format!("/api/image/{}", filename)] {
        let (status, bytes) = send_raw(&app.router, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        // JPEG magic
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    let (status, body) = send(&app.router, "GET", "/api/image/nope.jpg", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Image not found");
}

#[tokio::test]
async fn test_image_route_rejects_traversal_and_hidden_files() {
    let app = app().await;
    std::fs::write(app.uploads.path().join(".hidden"), b"secret").unwrap();
    std::fs::write(app.uploads.path().join("ok.png"), b"png bytes").unwrap();

    for uri in [
        "/api/image/uploads/../x",
        "/api/image/..%2fx",
        "/api/image/%2e%2e%2fx",
        "/api/image/.hidden",
        "/api/image/uploads/.hidden",
        "/api/image/sub%5c..%5cx",
    ] {
        let (status, body) = send(&app.router, "GET", uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body["error"], "Image not found", "{}", uri);
    }

    let (status, bytes) = send_raw(&app.router, "GET", "/api/image/ok.png", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"png bytes");
}

#[tokio::test]
async fn test_unconfigured_database_is_503() {
    let app = app_with(Arc::new(UnconfiguredStore), false).await;

    let (status, body) = send(&app.router, "GET", "/api/all-complaints", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("FIREBASE_DATABASE_URL"));

    let (status, _) = send(
        &app.router,
        "POST",
        "/api/submit-complaint",
        Some(json!({ "issue_type": "garbage", "address": "Kanpur" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    // Classification does not need the database
    let (status, _) = send(
        &app.router,
        "POST",
        "/api/classify-issue",
        Some(json!({ "image": png_data_url() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
