//! Lazy, load-once model cache

use crate::model::{ModelLoader, TextModel};
use crate::model_config::ModelConfigStore;
use parking_lot::{Mutex, RwLock};
use smsguard_core::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Owns every loaded model for the lifetime of the process.
///
/// Entries are never evicted or reloaded. Loads are serialized by a
/// cache-wide lock, so concurrent first requests for the same `model_id`
/// produce exactly one load; reads of already-loaded models only take the
/// shared side of the map lock.
pub struct ModelCache {
    loader: Arc<dyn ModelLoader>,
    models: RwLock<HashMap<String, Arc<dyn TextModel>>>,
    load_lock: Mutex<()>,
}

impl ModelCache {
    /// Create an empty cache backed by `loader`
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            models: RwLock::new(HashMap::new()),
            load_lock: Mutex::new(()),
        }
    }

    /// Get a model by id, loading it on first access
    pub fn resolve(&self, model_id: &str, store: &ModelConfigStore) -> Result<Arc<dyn TextModel>> {
        if let Some(model) = self.cached(model_id) {
            return Ok(model);
        }

        let _guard = self.load_lock.lock();

        // Another caller may have finished the load while we waited.
        if let Some(model) = self.cached(model_id) {
            debug!("Model '{}' loaded by a concurrent request", model_id);
            return Ok(model);
        }

        let config = store.get(model_id)?;
        let location = store.artifact_path(config);
        if !location.exists() {
            return Err(Error::ArtifactMissing(location));
        }

        info!("Loading model '{}' from {}", model_id, location.display());
        let start = Instant::now();
        let model = self.loader.load(&location)?;
        info!(
            "Loaded model '{}' ({}) in {}ms",
            model_id,
            model.describe(),
            start.elapsed().as_millis()
        );
        metrics::counter!("smsguard_model_loads_total", "model_id" => model_id.to_string())
            .increment(1);

        self.models
            .write()
            .insert(model_id.to_string(), Arc::clone(&model));

        Ok(model)
    }

    /// Whether `model_id` has already been loaded
    pub fn is_loaded(&self, model_id: &str) -> bool {
        self.models.read().contains_key(model_id)
    }

    /// Number of loaded models
    pub fn loaded_count(&self) -> usize {
        self.models.read().len()
    }

    fn cached(&self, model_id: &str) -> Option<Arc<dyn TextModel>> {
        self.models.read().get(model_id).map(Arc::clone)
    }
}
