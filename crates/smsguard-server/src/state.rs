//! Shared application state

use crate::config::ServerConfig;
use crate::results::ResultStore;
use metrics_exporter_prometheus::PrometheusHandle;
use smsguard_classifiers::{BatchFileIngester, InferenceEngine};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Shared state injected into every handler
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<InferenceEngine>,
    pub ingester: BatchFileIngester,
    pub results: ResultStore,
    pub frontend_dir: Option<PathBuf>,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(engine: Arc<InferenceEngine>, results: ResultStore) -> Self {
        Self {
            engine,
            ingester: BatchFileIngester::new(),
            results,
            frontend_dir: None,
            metrics_handle: None,
        }
    }

    /// Build state from configuration: load the registry, prepare the
    /// results directory and warm the requested models
    pub fn from_config(
        config: &ServerConfig,
        metrics_handle: Option<PrometheusHandle>,
    ) -> anyhow::Result<Self> {
        let engine = InferenceEngine::from_registry_file(&config.registry_path)?;
        info!("Registry serves {} models", engine.store().len());

        if !config.preload.is_empty() {
            engine.preload(&config.preload)?;
        }

        let results = ResultStore::new(&config.results_dir)?;

        Ok(Self {
            frontend_dir: config.frontend_dir.clone(),
            metrics_handle,
            ..Self::new(Arc::new(engine), results)
        })
    }

    pub fn with_frontend_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.frontend_dir = Some(dir.into());
        self
    }
}
