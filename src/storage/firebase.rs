//! Firebase Realtime Database storage over the REST API
//!
//! Every node is addressable as `<database>/<path>.json`. `POST` pushes a
//! child with a generated key, `PUT` replaces, `PATCH` merges.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::traits::{Complaint, ComplaintStore, NewComplaint, StatusPatch};
use crate::error::{Result, ServiceError};

const COLLECTION: &str = "complaints";

/// Response body of a push
#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

/// Firebase-backed complaint storage
pub struct FirebaseStore {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl FirebaseStore {
    pub fn new(database_url: &str, auth_token: Option<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("Failed to build HTTP client")?;

        let base_url = database_url.trim_end_matches('/').to_string();
        info!("Using Firebase Realtime Database at {}", base_url);

        Ok(Self {
            client,
            base_url,
            auth_token: auth_token.filter(|t| !t.is_empty()),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}.json", self.base_url, path);
        let builder = self.client.request(method, url);
        match self.auth_token {
            Some(ref token) => builder.query(&[("auth", token)]),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let response = builder
            .send()
            .await
            .with_context(|| format!("Firebase {} request failed", what))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Firebase {} returned {}: {}", what, status, body).into());
        }
        Ok(response)
    }

    async fn get_document(&self, id: &str) -> Result<Option<Value>> {
        let response = self
            .send(self.request(Method::GET, &format!("{}/{}", COLLECTION, id)), "get")
            .await?;
        let doc: Value = response.json().await.context("Invalid Firebase response")?;

        Ok(match doc {
            Value::Null => None,
            doc => Some(doc),
        })
    }
}

/// Firebase keys may not contain these characters; such ids cannot exist
pub fn is_valid_key(id: &str) -> bool {
    !id.is_empty() && !id.chars().any(|c| matches!(c, '.' | '#' | '$' | '[' | ']' | '/'))
}

#[async_trait]
impl ComplaintStore for FirebaseStore {
    fn backend(&self) -> &'static str {
        "firebase"
    }

    async fn fetch_all(&self) -> Result<Vec<Complaint>> {
        let response = self.send(self.request(Method::GET, COLLECTION), "list").await?;
        let snapshot: Value = response.json().await.context("Invalid Firebase response")?;

        let complaints = match snapshot {
            Value::Object(map) => map
                .iter()
                .map(|(id, doc)| Complaint::from_document(id, doc))
                .collect(),
            // Mostly-integer keys come back as an array with null holes
            Value::Array(items) => items
                .iter()
                .enumerate()
                .filter(|(_, doc)| !doc.is_null())
                .map(|(index, doc)| Complaint::from_document(&index.to_string(), doc))
                .collect(),
            Value::Null => Vec::new(),
            other => {
                debug!("Unexpected complaints snapshot: {}", other);
                return Err(anyhow::anyhow!("Unexpected complaints snapshot shape").into());
            }
        };

        Ok(complaints)
    }

    async fn fetch(&self, id: &str) -> Result<Option<Complaint>> {
        if !is_valid_key(id) {
            return Ok(None);
        }
        Ok(self
            .get_document(id)
            .await?
            .map(|doc| Complaint::from_document(id, &doc)))
    }

    async fn create(&self, id: Option<&str>, complaint: &NewComplaint) -> Result<String> {
        let doc = complaint.to_document();

        match id {
            Some(id) => {
                if !is_valid_key(id) {
                    return Err(ServiceError::InvalidInput(format!("Invalid complaint id: {}", id)));
                }
                let builder = self
                    .request(Method::PUT, &format!("{}/{}", COLLECTION, id))
                    .json(&doc);
                self.send(builder, "set").await?;
                Ok(id.to_string())
            }
            None => {
                let builder = self.request(Method::POST, COLLECTION).json(&doc);
                let response = self.send(builder, "push").await?;
                let pushed: PushResponse = response.json().await.context("Invalid push response")?;
                Ok(pushed.name)
            }
        }
    }

    async fn update(&self, id: &str, patch: &StatusPatch) -> Result<()> {
        if !is_valid_key(id) {
            return Err(ServiceError::not_found());
        }
        let builder = self
            .request(Method::PATCH, &format!("{}/{}", COLLECTION, id))
            .json(patch);
        self.send(builder, "update").await?;
        Ok(())
    }
}
