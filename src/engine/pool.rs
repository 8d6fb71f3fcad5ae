//! Model Pool Manager
//!
//! Owns the OpenVINO core and the compiled classifier. The model is loaded
//! once (eagerly at startup when `preload` is set, otherwise on first use)
//! and may be unloaded after an idle timeout to give memory back.

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use openvino::{CompiledModel, Core};
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use tracing::{debug, info};

use crate::config::InferenceConfig;

/// Wrapper for OpenVINO Core that implements Send + Sync
pub struct SafeCore(Core);
// SAFETY: the core is only ever touched through the pool's RwLock.
unsafe impl Send for SafeCore {}
unsafe impl Sync for SafeCore {}

impl Deref for SafeCore {
    type Target = Core;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::ops::DerefMut for SafeCore {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Shared handle to a compiled model
///
/// The Rust bindings need `&mut` to create an infer request, so the model
/// sits behind a mutex that is held only while the request is created.
#[derive(Clone)]
pub struct SafeCompiledModel(Arc<Mutex<CompiledModel>>);
// SAFETY: all access to the CompiledModel goes through the mutex.
unsafe impl Send for SafeCompiledModel {}
unsafe impl Sync for SafeCompiledModel {}

impl SafeCompiledModel {
    /// Create an inference request
    pub fn create_infer_request(&self) -> anyhow::Result<openvino::InferRequest> {
        let mut model = self.0.lock();
        model.create_infer_request().map_err(|e| e.into())
    }
}

/// A cached model with its last access time
struct CachedModel {
    compiled: SafeCompiledModel,
    last_access: Instant,
}

/// Model pool for the issue classifier
pub struct ModelPool {
    core: RwLock<SafeCore>,
    device: String,
    idle_timeout: Option<Duration>,
    model_path: PathBuf,
    classifier: RwLock<Option<CachedModel>>,
    shutdown: Notify,
}

impl ModelPool {
    /// Create a new model pool. Fails when the model file does not exist.
    pub fn new(config: &InferenceConfig, model_path: &Path) -> anyhow::Result<Self> {
        if !model_path.exists() {
            anyhow::bail!(
                "Model file not found at {}. Export the trained MobileNetV3 classifier to ONNX/OpenVINO IR and place it there, or set MODEL_PATH.",
                model_path.display()
            );
        }

        let core = Core::new()?;

        Ok(Self {
            core: RwLock::new(SafeCore(core)),
            device: config.device.clone(),
            idle_timeout: match config.model_idle_timeout {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            model_path: model_path.to_path_buf(),
            classifier: RwLock::new(None),
            shutdown: Notify::new(),
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Get or load the classifier model
    pub fn get_model(&self) -> anyhow::Result<SafeCompiledModel> {
        // Held across loading so concurrent first requests compile only once
        let mut guard = self.classifier.write();

        if let Some(ref mut cached) = *guard {
            cached.last_access = Instant::now();
            return Ok(cached.compiled.clone());
        }

        let path = self
            .model_path
            .to_str()
            .context("Model path is not valid UTF-8")?;

        info!("Loading classifier from {}", path);
        let start = Instant::now();

        let mut core = self.core.write();
        let model = core
            .read_model_from_file(path, "")
            .with_context(|| format!("Failed to read model file {}", path))?;
        let compiled = core.compile_model(&model, self.device.as_str().into())?;
        let compiled = SafeCompiledModel(Arc::new(Mutex::new(compiled)));

        info!("Classifier loaded on {} in {:?}", self.device, start.elapsed());

        *guard = Some(CachedModel {
            compiled: compiled.clone(),
            last_access: Instant::now(),
        });

        Ok(compiled)
    }

    /// Load the model now instead of on first request
    pub fn preload(&self) -> anyhow::Result<()> {
        self.get_model().map(|_| ())
    }

    /// Non-blocking: reports false while a load holds the lock
    pub fn is_loaded(&self) -> bool {
        slot_filled(&self.classifier)
    }

    fn cleanup_idle_model(&self) {
        let Some(timeout) = self.idle_timeout else {
            return;
        };

        // A load in progress is not idle
        let Some(mut guard) = self.classifier.try_write() else {
            return;
        };
        let idle = guard
            .as_ref()
            .map(|cached| cached.last_access.elapsed() > timeout)
            .unwrap_or(false);

        if idle {
            info!("Unloading idle classifier model");
            *guard = None;
        }
    }

    /// Background task unloading the model after the idle timeout
    pub async fn start_cleanup_task(self: Arc<Self>) {
        if self.idle_timeout.is_none() {
            debug!("Model idle unloading disabled");
            return;
        }

        let check_interval = Duration::from_secs(60);

        loop {
            tokio::select! {
                _ = tokio::time::sleep(check_interval) => {
                    debug!("Running model cleanup check");
                    self.cleanup_idle_model();
                }
                _ = self.shutdown.notified() => {
                    info!("Model pool cleanup task shutting down");
                    break;
                }
            }
        }
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

fn slot_filled<T>(slot: &RwLock<Option<T>>) -> bool {
    slot.try_read().map(|guard| guard.is_some()).unwrap_or(false)
}

impl Drop for ModelPool {
    fn drop(&mut self) {
        self.shutdown.notify_one();
    }
}
