//! Storage abstraction traits
//!
//! Complaint documents are schemaless JSON. Older clients wrote camelCase
//! keys, the backend writes both spellings; reads normalise to snake_case.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::Result;

/// A complaint as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Complaint {
    pub id: String,
    pub user_id: Option<String>,
    pub issue_type: String,
    pub status: String,
    pub priority: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub department: Option<String>,
    pub formal_complaint: Option<String>,
    pub image_path: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Complaint {
    /// Build a complaint from a stored document
    pub fn from_document(id: &str, doc: &Value) -> Self {
        let text = |keys: &[&str]| -> Option<String> {
            keys.iter().find_map(|key| match doc.get(*key) {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
        };

        Self {
            id: id.to_string(),
            user_id: text(&["user_id", "userId"]),
            issue_type: text(&["issue_type", "issueType"]).unwrap_or_else(|| "other".to_string()),
            status: text(&["status"]).unwrap_or_else(|| "pending".to_string()),
            priority: text(&["priority"]).unwrap_or_else(|| "normal".to_string()),
            latitude: to_float(doc.get("latitude")),
            longitude: to_float(doc.get("longitude")),
            address: text(&["address"]),
            description: text(&["description"]),
            department: text(&["department"]),
            formal_complaint: text(&["formal_complaint", "formalComplaint"]),
            image_path: text(&["image_path", "imagePath"]),
            created_at: text(&["created_at", "createdAt"]),
            updated_at: text(&["updated_at", "updatedAt"]),
        }
    }

    /// Coordinates, when both are present
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }

    /// Apply a status patch to the in-memory view
    pub fn apply(&mut self, patch: &StatusPatch) {
        if let Some(ref status) = patch.status {
            self.status = status.clone();
        }
        if let Some(ref priority) = patch.priority {
            self.priority = priority.clone();
        }
        self.updated_at = Some(patch.updated_at.clone());
    }
}

fn to_float(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Document written for a new complaint
#[derive(Debug, Clone)]
pub struct NewComplaint {
    pub user_id: String,
    pub issue_type: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: String,
    pub description: String,
    pub formal_complaint: String,
    pub department: String,
    pub priority: String,
    pub image_path: Option<String>,
    pub timestamp: String,
}

impl NewComplaint {
    /// Stored form with both key spellings
    pub fn to_document(&self) -> Value {
        json!({
            "user_id": self.user_id,
            "userId": self.user_id,
            "issue_type": self.issue_type,
            "issueType": self.issue_type,
            "latitude": self.latitude,
            "longitude": self.longitude,
            "address": self.address,
            "description": self.description,
            "formal_complaint": self.formal_complaint,
            "formalComplaint": self.formal_complaint,
            "department": self.department,
            "status": "pending",
            "priority": self.priority,
            "image_path": self.image_path,
            "imagePath": self.image_path,
            "source": "backend",
            "created_at": self.timestamp,
            "updated_at": self.timestamp,
        })
    }
}

/// Partial update of a complaint's status fields
#[derive(Debug, Clone, Serialize)]
pub struct StatusPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    pub updated_at: String,
}

impl StatusPatch {
    /// Merge this patch into a stored document
    pub fn merge_into(&self, doc: &mut Map<String, Value>) {
        if let Some(ref status) = self.status {
            doc.insert("status".to_string(), Value::String(status.clone()));
        }
        if let Some(ref priority) = self.priority {
            doc.insert("priority".to_string(), Value::String(priority.clone()));
        }
        doc.insert("updated_at".to_string(), Value::String(self.updated_at.clone()));
    }
}

/// Complaint storage trait
/// Implementations must be thread-safe and async-compatible
#[async_trait]
pub trait ComplaintStore: Send + Sync + 'static {
    /// Short backend name for health output
    fn backend(&self) -> &'static str;

    /// All complaints, oldest first
    async fn fetch_all(&self) -> Result<Vec<Complaint>>;

    /// A single complaint by key
    async fn fetch(&self, id: &str) -> Result<Option<Complaint>>;

    /// Store a new complaint. With `id` the document is written at that key,
    /// otherwise a fresh key is generated. Returns the key.
    async fn create(&self, id: Option<&str>, complaint: &NewComplaint) -> Result<String>;

    /// Patch an existing complaint
    async fn update(&self, id: &str, patch: &StatusPatch) -> Result<()>;
}

/// Stand-in used when no database is configured; every call is a 503
pub struct UnconfiguredStore;

#[async_trait]
impl ComplaintStore for UnconfiguredStore {
    fn backend(&self) -> &'static str {
        "none"
    }

    async fn fetch_all(&self) -> Result<Vec<Complaint>> {
        Err(crate::error::ServiceError::unconfigured())
    }

    async fn fetch(&self, _id: &str) -> Result<Option<Complaint>> {
        Err(crate::error::ServiceError::unconfigured())
    }

    async fn create(&self, _id: Option<&str>, _complaint: &NewComplaint) -> Result<String> {
        Err(crate::error::ServiceError::unconfigured())
    }

    async fn update(&self, _id: &str, _patch: &StatusPatch) -> Result<()> {
        Err(crate::error::ServiceError::unconfigured())
    }
}
