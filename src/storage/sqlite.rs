//! SQLite storage implementation
//!
//! Keeps complaint documents as JSON text keyed by id, so local runs behave
//! like the hosted document database.

use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{sqlite::{SqlitePool, SqlitePoolOptions}, Row};
use tracing::{debug, info};
use uuid::Uuid;

use super::traits::{Complaint, ComplaintStore, NewComplaint, StatusPatch};
use crate::error::{Result, ServiceError};

/// SQLite-based complaint storage
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a database file
    pub async fn new(db_path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await
            .context("Failed to connect to SQLite database")?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Private in-memory database. A single connection that never expires,
    /// since each SQLite memory connection is its own database.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory SQLite database")?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    async fn initialize(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS complaints (
                id TEXT PRIMARY KEY,
                document TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("SQLite complaint store initialized");
        Ok(())
    }

    async fn write_document(&self, id: &str, doc: &Value) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO complaints (id, document) VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET document = excluded.document
            "#,
        )
        .bind(id)
        .bind(doc.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to write complaint")?;
        Ok(())
    }

    async fn read_document(&self, id: &str) -> Result<Option<Value>> {
        let row = sqlx::query("SELECT document FROM complaints WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to read complaint")?;

        match row {
            Some(row) => {
                let text: String = row.get("document");
                let doc = serde_json::from_str(&text).context("Corrupt complaint document")?;
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ComplaintStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn fetch_all(&self) -> Result<Vec<Complaint>> {
        let rows = sqlx::query("SELECT id, document FROM complaints ORDER BY rowid")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list complaints")?;

        let mut complaints = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get("id");
            let text: String = row.get("document");
            match serde_json::from_str::<Value>(&text) {
                Ok(doc) => complaints.push(Complaint::from_document(&id, &doc)),
                Err(e) => debug!("Skipping unreadable complaint {}: {}", id, e),
            }
        }

        Ok(complaints)
    }

    async fn fetch(&self, id: &str) -> Result<Option<Complaint>> {
        Ok(self
            .read_document(id)
            .await?
            .map(|doc| Complaint::from_document(id, &doc)))
    }

    async fn create(&self, id: Option<&str>, complaint: &NewComplaint) -> Result<String> {
        let id = match id {
            Some(id) => id.to_string(),
            None => Uuid::new_v4().simple().to_string(),
        };

        self.write_document(&id, &complaint.to_document()).await?;
        Ok(id)
    }

    async fn update(&self, id: &str, patch: &StatusPatch) -> Result<()> {
        let mut doc = match self.read_document(id).await? {
            Some(Value::Object(map)) => map,
            Some(_) | None => return Err(ServiceError::not_found()),
        };

        patch.merge_into(&mut doc);
        self.write_document(id, &Value::Object(doc)).await
    }
}
