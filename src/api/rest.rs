//! Axum REST API handlers

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    routing::{get, post, put},
    extract::{Path, State, Query, DefaultBodyLimit},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::engine::Classification;
use crate::error::ServiceError;
use crate::geo::proximity::HeatPoint;
use crate::service::*;
use crate::storage::Complaint;

use super::dto::*;

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

/// Application state shared across handlers
pub struct AppState {
    pub service: Arc<ComplaintService>,
    pub start_time: Instant,
    pub body_limit: usize,
}

impl AppState {
    pub fn new(service: Arc<ComplaintService>, body_limit: usize) -> Self {
        Self {
            service,
            start_time: Instant::now(),
            body_limit,
        }
    }
}

/// Create the REST API router
pub fn create_rest_router(state: Arc<AppState>) -> Router {
    let body_limit = state.body_limit;

    Router::new()
        // Service info
        .route("/", get(index_handler))
        .route("/api", get(api_root_handler))
        .route("/health", get(health_handler))
        .route("/api/health", get(health_handler))
        // Classification
        .route("/api/classify-issue", post(classify_handler))
        .route("/predict", post(classify_handler))
        // Complaints
        .route("/api/submit-complaint", post(submit_handler))
        .route("/api/track-complaint/:id", get(track_handler))
        .route("/api/complaints-map", get(map_handler))
        .route("/api/heatmap-data", get(heatmap_handler))
        .route("/api/all-complaints", get(list_handler))
        .route("/api/complaint/:id", get(details_handler))
        .route("/api/complaint/:id/update-status", put(update_status_handler))
        // Uploaded photos
        .route("/api/image/*filename", get(image_handler))
        // Middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Map a service error to a status code and error body
fn api_error(e: ServiceError) -> ApiError {
    match e {
        ServiceError::InvalidInput(msg) => {
            (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(&msg, "INVALID_INPUT")))
        }
        ServiceError::NotFound(msg) => {
            (StatusCode::NOT_FOUND, Json(ErrorResponse::new(&msg, "NOT_FOUND")))
        }
        ServiceError::Unavailable(msg) => {
            (StatusCode::SERVICE_UNAVAILABLE, Json(ErrorResponse::new(&msg, "DATABASE_UNAVAILABLE")))
        }
        ServiceError::Classification(detail) => {
            error!("Classification failed: {}", detail);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(
                    ErrorResponse::new("Internal server error during classification.", "CLASSIFICATION_FAILED")
                        .with_detail(detail),
                ),
            )
        }
        ServiceError::Internal(e) => {
            error!("Request failed: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse::new(&e.to_string(), "INTERNAL_ERROR")))
        }
    }
}

// ============================================================================
// Service info
// ============================================================================

async fn index_handler() -> Json<IndexResponse> {
    let endpoints = [
        "GET /health",
        "POST /api/classify-issue",
        "POST /api/submit-complaint",
        "GET /api/track-complaint/:id",
        "GET /api/complaints-map?lat=&lon=&radius=",
        "GET /api/heatmap-data",
        "GET /api/all-complaints",
        "GET /api/complaint/:id",
        "PUT /api/complaint/:id/update-status",
        "GET /api/image/:filename",
    ];

    Json(IndexResponse {
        service: "Civic Issue Reporting API".to_string(),
        status: "running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
    })
}

async fn api_root_handler() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Civic Issue Reporting API is running".to_string(),
    })
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let health = state.service.health();
    Json(HealthResponse {
        status: health.status,
        version: health.version,
        model_path: health.model_path,
        model_loaded: health.model_loaded,
        storage: health.storage,
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

// ============================================================================
// Classification
// ============================================================================

async fn classify_handler(
    State(state): State<Arc<AppState>>,
    body: Option<Json<ClassifyRequest>>,
) -> ApiResult<Classification> {
    let image = body.and_then(|Json(req)| req.image).unwrap_or_default();
    let result = state.service.classify(&image).await.map_err(api_error)?;
    Ok(Json(result))
}

// ============================================================================
// Complaints
// ============================================================================

async fn submit_handler(
    State(state): State<Arc<AppState>>,
    body: Option<Json<ComplaintSubmission>>,
) -> ApiResult<SubmitResult> {
    let Json(request) = body.ok_or_else(|| {
        (StatusCode::BAD_REQUEST, Json(ErrorResponse::new("No data provided", "INVALID_INPUT")))
    })?;
    let result = state.service.submit(request).await.map_err(api_error)?;
    Ok(Json(result))
}

async fn track_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<TrackingInfo> {
    let info = state.service.track(&id).await.map_err(api_error)?;
    Ok(Json(info))
}

async fn map_handler(
    State(state): State<Arc<AppState>>,
    query: Option<Query<MapQuery>>,
) -> ApiResult<NearbyResult> {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let (lat, lon) = match (query.lat, query.lon) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("Latitude and longitude required", "INVALID_INPUT")),
            ))
        }
    };

    let result = state.service.nearby(lat, lon, query.radius).await.map_err(api_error)?;
    Ok(Json(result))
}

async fn heatmap_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<HeatPoint<ComplaintSummary>>> {
    let points = state.service.heatmap().await.map_err(api_error)?;
    Ok(Json(points))
}

async fn list_handler(State(state): State<Arc<AppState>>) -> ApiResult<ComplaintList> {
    let list = state.service.list().await.map_err(api_error)?;
    Ok(Json(list))
}

async fn details_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Complaint> {
    let complaint = state.service.details(&id).await.map_err(api_error)?;
    Ok(Json(complaint))
}

async fn update_status_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<Json<StatusUpdate>>,
) -> ApiResult<UpdateResult> {
    let update = body.map(|Json(u)| u).unwrap_or_default();
    let result = state.service.update_status(&id, update).await.map_err(api_error)?;
    Ok(Json(result))
}

// ============================================================================
// Uploaded photos
// ============================================================================

async fn image_handler(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let (bytes, content_type) = state.service.image(&filename).await.map_err(api_error)?;
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}
