//! Service layer types

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::storage::Complaint;

/// Accept a number, a numeric string, or nothing
fn lenient_coordinate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Complaint submission as sent by the web and mobile clients.
/// Both snake_case and camelCase spellings are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComplaintSubmission {
    pub issue_type: Option<String>,
    #[serde(rename = "issueType")]
    pub issue_type_camel: Option<String>,
    #[serde(default, deserialize_with = "lenient_coordinate")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_coordinate")]
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub user_id: Option<String>,
    #[serde(rename = "userId")]
    pub user_id_camel: Option<String>,
    /// Data URL or base64 photo
    pub image: Option<String>,
    /// Client-chosen key; when absent the store generates one
    pub firebase_id: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl ComplaintSubmission {
    pub fn issue_type(&self) -> Option<&str> {
        non_empty(&self.issue_type).or_else(|| non_empty(&self.issue_type_camel))
    }

    pub fn user_id(&self) -> &str {
        non_empty(&self.user_id)
            .or_else(|| non_empty(&self.user_id_camel))
            .unwrap_or("anonymous")
    }

    pub fn priority(&self) -> &str {
        non_empty(&self.priority).unwrap_or("normal")
    }
}

/// Submission outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResult {
    pub success: bool,
    pub complaint_id: String,
    pub department: String,
    pub issue_type: String,
}

/// Public tracking view of a complaint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingInfo {
    pub id: String,
    pub issue_type: String,
    pub status: String,
    pub priority: String,
    pub department: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<Complaint> for TrackingInfo {
    fn from(c: Complaint) -> Self {
        Self {
            id: c.id,
            issue_type: c.issue_type,
            status: c.status,
            priority: c.priority,
            department: c.department,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Complaint near a map centre
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyComplaint {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub issue_type: String,
    pub status: String,
    pub priority: String,
    /// Kilometres from the centre
    pub distance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapCenter {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyResult {
    pub complaints: Vec<NearbyComplaint>,
    pub center: MapCenter,
    pub radius: f64,
}

/// Compact complaint entry inside a heatmap cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplaintSummary {
    pub id: String,
    pub issue_type: String,
    pub status: String,
    pub priority: String,
}

impl From<&Complaint> for ComplaintSummary {
    fn from(c: &Complaint) -> Self {
        Self {
            id: c.id.clone(),
            issue_type: c.issue_type.clone(),
            status: c.status.clone(),
            priority: c.priority.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplaintList {
    pub complaints: Vec<Complaint>,
    pub total: usize,
}

/// Status/priority change request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusUpdate {
    pub status: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateResult {
    pub success: bool,
    pub message: String,
    pub complaint: Complaint,
}

/// Health check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResult {
    pub status: String,
    pub version: String,
    pub model_path: String,
    pub model_loaded: bool,
    pub storage: String,
}
