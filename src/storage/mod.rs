//! Storage module for complaint persistence

pub mod traits;
pub mod firebase;
pub mod sqlite;

use std::sync::Arc;

use tracing::warn;

use crate::config::{StorageConfig, StorageType};

pub use traits::{Complaint, ComplaintStore, NewComplaint, StatusPatch, UnconfiguredStore};
pub use firebase::FirebaseStore;
pub use sqlite::SqliteStore;

/// Build the configured complaint store.
///
/// A Firebase backend without a database URL is not fatal: the service
/// starts and database-backed endpoints answer 503.
pub async fn open_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn ComplaintStore>> {
    match config.storage_type {
        StorageType::Firebase => match config.firebase_url.as_deref() {
            Some(url) if !url.is_empty() => {
                Ok(Arc::new(FirebaseStore::new(url, config.auth_token.clone())?))
            }
            _ => {
                warn!("FIREBASE_DATABASE_URL not set. Backend will run without database access.");
                Ok(Arc::new(UnconfiguredStore))
            }
        },
        StorageType::Sqlite => {
            let path = config
                .sqlite_path
                .clone()
                .unwrap_or_else(|| "data/complaints.db".into());
            Ok(Arc::new(SqliteStore::new(&path).await?))
        }
    }
}
