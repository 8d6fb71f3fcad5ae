//! Service configuration
//!
//! Values come from `config.toml` (or the file named by `NIVEDAN_CONFIG`),
//! then environment variables override the deployment-specific bits.

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub inference: InferenceConfig,
    pub model: ModelConfig,
    pub storage: StorageConfig,
    pub geocoding: GeocodingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub uploads_dir: PathBuf,
    pub body_limit_mb: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    pub device: String,
    /// Seconds; 0 disables idle unloading
    pub model_idle_timeout: u64,
    pub preload: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub path: PathBuf,
    pub num_classes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    Firebase,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    pub firebase_url: Option<String>,
    pub auth_token: Option<String>,
    pub sqlite_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingConfig {
    pub endpoint: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub zoom: u8,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn default_path() -> String {
        std::env::var("NIVEDAN_CONFIG").unwrap_or_else(|_| "config.toml".to_string())
    }

    /// Apply process environment overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = lookup("PORT").and_then(|p| p.trim().parse().ok()) {
            self.server.port = port;
        }
        if let Some(path) = lookup("MODEL_PATH") {
            self.model.path = PathBuf::from(path);
        }
        if let Some(n) = lookup("MODEL_NUM_CLASSES").and_then(|n| n.trim().parse().ok()) {
            self.model.num_classes = n;
        }

        let database_url = lookup("FIREBASE_DATABASE_URL")
            .or_else(|| lookup("REACT_APP_FIREBASE_DATABASE_URL"))
            .or_else(|| lookup("VITE_FIREBASE_DATABASE_URL"));
        if let Some(url) = database_url {
            self.storage.firebase_url = Some(url);
        }
        if let Some(token) = lookup("FIREBASE_AUTH_TOKEN") {
            self.storage.auth_token = Some(token);
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("server.port must be non-zero");
        }
        if !matches!(self.model.num_classes, 5 | 6) {
            anyhow::bail!("model.num_classes must be 5 or 6, got {}", self.model.num_classes);
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: 5000,
                uploads_dir: PathBuf::from("uploads"),
                body_limit_mb: 20,
            },
            inference: InferenceConfig {
                device: "CPU".to_string(),
                model_idle_timeout: 0,
                preload: true,
            },
            model: ModelConfig {
                path: PathBuf::from("model/best_urban_mobilenet.onnx"),
                num_classes: 6,
            },
            storage: StorageConfig {
                storage_type: StorageType::Firebase,
                firebase_url: None,
                auth_token: None,
                sqlite_path: Some(PathBuf::from("data/complaints.db")),
            },
            geocoding: GeocodingConfig {
                endpoint: "https://nominatim.openstreetmap.org/reverse".to_string(),
                user_agent: "civic_issue_app/1.0 (contact: support@example.com)".to_string(),
                timeout_secs: 10,
                zoom: 18,
            },
        }
    }
}
