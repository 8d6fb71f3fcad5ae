//! Service error type

use thiserror::Error;

/// Errors surfaced to the API layer, one variant per response class
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    /// Backing database is not configured or reachable
    #[error("{0}")]
    Unavailable(String),

    #[error("Classification failed: {0}")]
    Classification(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

impl ServiceError {
    pub fn not_found() -> Self {
        ServiceError::NotFound("Complaint not found".to_string())
    }

    pub fn unconfigured() -> Self {
        ServiceError::Unavailable(
            "Firebase Realtime Database is not configured. Set FIREBASE_DATABASE_URL (and FIREBASE_AUTH_TOKEN if rules require it)."
                .to_string(),
        )
    }
}
