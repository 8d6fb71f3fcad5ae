//! Complaint Service - Core business logic
//!
//! Orchestrates classification, geocoding, letter drafting and storage.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use chrono::{Local, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::preprocess::decode_image;
use crate::engine::{Classification, ImageClassifier};
use crate::error::{Result, ServiceError};
use crate::geo::proximity::{HeatPoint, CLUSTER_RADIUS_DEG, DEFAULT_RADIUS_KM};
use crate::geo::{cluster_points, within_radius, ReverseGeocoder};
use crate::storage::{Complaint, ComplaintStore, NewComplaint, StatusPatch};
use crate::utils::image::{decode_payload, encode_jpeg};

use super::department::department_for;
use super::letter::{generate_formal_complaint, LetterDetails};
use super::types::*;

/// Prefix under which stored image paths are recorded and served
pub const UPLOADS_PREFIX: &str = "uploads/";

const LOCATION_NOT_PROVIDED: &str = "Location not provided";

/// Storage timestamp: UTC, microseconds, no offset
pub fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Civic complaint service
pub struct ComplaintService {
    classifier: Arc<dyn ImageClassifier>,
    store: Arc<dyn ComplaintStore>,
    geocoder: Arc<dyn ReverseGeocoder>,
    uploads_dir: PathBuf,
}

impl ComplaintService {
    pub fn new(
        classifier: Arc<dyn ImageClassifier>,
        store: Arc<dyn ComplaintStore>,
        geocoder: Arc<dyn ReverseGeocoder>,
        uploads_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            classifier,
            store,
            geocoder,
            uploads_dir: uploads_dir.into(),
        }
    }

    pub fn store(&self) -> &Arc<dyn ComplaintStore> {
        &self.store
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Classify a photo sent as data URL or base64
    pub async fn classify(&self, image_payload: &str) -> Result<Classification> {
        if image_payload.trim().is_empty() {
            return Err(ServiceError::InvalidInput("No image provided".to_string()));
        }

        let payload = decode_payload(image_payload).map_err(|_| {
            ServiceError::InvalidInput(
                "Invalid image format. Expected a base64-encoded image string.".to_string(),
            )
        })?;

        let image = decode_image(&payload.bytes).map_err(|_| {
            let mut msg = "Failed to decode image bytes.".to_string();
            if let Some(ref mime) = payload.mime_hint {
                msg.push_str(&format!(" mime={}", mime));
            }
            ServiceError::InvalidInput(msg)
        })?;

        let start = Instant::now();
        let classifier = self.classifier.clone();
        let result = tokio::task::spawn_blocking(move || classifier.classify(&image))
            .await
            .context("Classification task panicked")?
            .map_err(|e| ServiceError::Classification(e.to_string()))?;

        info!(
            "Classified image as {} ({:.3}) in {}ms",
            result.issue_type,
            result.confidence,
            start.elapsed().as_millis()
        );
        Ok(result)
    }

    /// File a new complaint
    pub async fn submit(&self, request: ComplaintSubmission) -> Result<SubmitResult> {
        let issue_type = request
            .issue_type()
            .ok_or_else(|| ServiceError::InvalidInput("Issue type is required".to_string()))?
            .to_string();

        let address = match (non_empty(request.address.as_deref()), request.latitude, request.longitude) {
            (Some(address), _, _) => address.to_string(),
            (None, Some(lat), Some(lon)) => self.geocoder.address_for(lat, lon).await,
            _ => LOCATION_NOT_PROVIDED.to_string(),
        };

        let department = department_for(&issue_type);
        let priority = request.priority().to_string();
        let user_id = request.user_id().to_string();
        let description = request.description.clone().unwrap_or_default();

        let formal_complaint = generate_formal_complaint(
            &LetterDetails {
                issue_type: &issue_type,
                description: Some(&description),
                location: &address,
                latitude: request.latitude,
                longitude: request.longitude,
                priority: &priority,
                department: Some(department),
                reference: &user_id,
            },
            Local::now().date_naive(),
        );

        let image_path = match non_empty(request.image.as_deref()) {
            Some(payload) => self.save_image(payload).await,
            None => None,
        };

        let complaint = NewComplaint {
            user_id,
            issue_type: issue_type.clone(),
            latitude: request.latitude,
            longitude: request.longitude,
            address,
            description,
            formal_complaint,
            department: department.to_string(),
            priority,
            image_path,
            timestamp: timestamp(),
        };

        let firebase_id = non_empty(request.firebase_id.as_deref());
        let complaint_id = self.store.create(firebase_id, &complaint).await?;

        info!("Complaint {} filed: {} -> {}", complaint_id, issue_type, department);

        Ok(SubmitResult {
            success: true,
            complaint_id,
            department: department.to_string(),
            issue_type,
        })
    }

    /// Persist an uploaded photo as JPEG. Failures are logged, not fatal.
    async fn save_image(&self, payload: &str) -> Option<String> {
        let decoded = match decode_payload(payload) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("Error saving image: {}", e);
                return None;
            }
        };

        let filename = format!("{}.jpg", Uuid::new_v4().simple());
        let dir = self.uploads_dir.clone();
        let path = dir.join(&filename);

        let written = tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            std::fs::create_dir_all(&dir)?;
            let bytes = match decode_image(&decoded.bytes).and_then(|img| encode_jpeg(&img)) {
                Ok(jpeg) => jpeg,
                Err(_) => decoded.bytes,
            };
            std::fs::write(&path, bytes)?;
            Ok(())
        })
        .await;

        match written {
            Ok(Ok(())) => Some(format!("{}{}", UPLOADS_PREFIX, filename)),
            Ok(Err(e)) => {
                warn!("Error saving image: {}", e);
                None
            }
            Err(e) => {
                warn!("Image save task failed: {}", e);
                None
            }
        }
    }

    async fn require(&self, id: &str) -> Result<Complaint> {
        self.store.fetch(id).await?.ok_or_else(ServiceError::not_found)
    }

    /// Public status of a complaint
    pub async fn track(&self, id: &str) -> Result<TrackingInfo> {
        Ok(self.require(id).await?.into())
    }

    /// Full normalised complaint
    pub async fn details(&self, id: &str) -> Result<Complaint> {
        self.require(id).await
    }

    pub async fn list(&self) -> Result<ComplaintList> {
        let complaints = self.store.fetch_all().await?;
        Ok(ComplaintList {
            total: complaints.len(),
            complaints,
        })
    }

    /// Complaints within `radius` km (default 5) of a point
    pub async fn nearby(&self, lat: f64, lon: f64, radius: Option<f64>) -> Result<NearbyResult> {
        let radius = radius.unwrap_or(DEFAULT_RADIUS_KM);
        let complaints = self.store.fetch_all().await?;

        let nearby = within_radius(&complaints, (lat, lon), radius, Complaint::coordinates)
            .into_iter()
            .filter_map(|(c, distance)| {
                let (latitude, longitude) = c.coordinates()?;
                Some(NearbyComplaint {
                    id: c.id.clone(),
                    latitude,
                    longitude,
                    issue_type: c.issue_type.clone(),
                    status: c.status.clone(),
                    priority: c.priority.clone(),
                    distance,
                })
            })
            .collect();

        Ok(NearbyResult {
            complaints: nearby,
            center: MapCenter { lat, lon },
            radius,
        })
    }

    /// Clustered complaint density for the heatmap
    pub async fn heatmap(&self) -> Result<Vec<HeatPoint<ComplaintSummary>>> {
        let complaints = self.store.fetch_all().await?;

        let points = cluster_points(&complaints, CLUSTER_RADIUS_DEG, Complaint::coordinates)
            .into_iter()
            .map(|cluster| HeatPoint {
                lat: cluster.center_lat,
                lng: cluster.center_lng,
                weight: cluster.weight(),
                count: cluster.count(),
                complaints: cluster.members.iter().map(|c| ComplaintSummary::from(*c)).collect(),
            })
            .collect();

        Ok(points)
    }

    /// Change status and/or priority
    pub async fn update_status(&self, id: &str, update: StatusUpdate) -> Result<UpdateResult> {
        let mut complaint = self.require(id).await?;

        if update.status.is_none() && update.priority.is_none() {
            return Err(ServiceError::InvalidInput("No updates provided".to_string()));
        }

        let patch = StatusPatch {
            status: update.status,
            priority: update.priority,
            updated_at: timestamp(),
        };

        self.store.update(id, &patch).await?;
        complaint.apply(&patch);

        info!("Complaint {} updated: status={} priority={}", id, complaint.status, complaint.priority);

        Ok(UpdateResult {
            success: true,
            message: "Complaint status updated successfully".to_string(),
            complaint,
        })
    }

    /// Locate an uploaded image. Accepts `name.jpg` or `uploads/name.jpg`.
    pub async fn image(&self, filename: &str) -> Result<(Vec<u8>, &'static str)> {
        let name = filename.trim_start_matches('/');
        let name = name.strip_prefix(UPLOADS_PREFIX).unwrap_or(name);

        let not_found = || ServiceError::NotFound("Image not found".to_string());

        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(not_found());
        }

        let bytes = tokio::fs::read(self.uploads_dir.join(name))
            .await
            .map_err(|_| not_found())?;

        Ok((bytes, content_type_for(name)))
    }

    pub fn health(&self) -> HealthResult {
        HealthResult {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            model_path: self.classifier.model_path(),
            model_loaded: self.classifier.model_loaded(),
            storage: self.store.backend().to_string(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn content_type_for(name: &str) -> &'static str {
    let ext = name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}
