//! smsguard Classifiers
//!
//! The inference-serving engine behind smsguard:
//! - [`model_config`]: the declarative model registry (one record per `model_id`)
//! - [`cache`]: lazy, load-once cache of instantiated models
//! - [`engine`]: capability dispatch (probability scoring vs label-only) and
//!   threshold resolution into spam/ham verdicts
//! - [`ingest`]: batch upload parsing with text-column resolution
//! - [`preprocess`]: the text normalizer every model applies to raw input
//!
//! Everything here is synchronous; callers running inside an async runtime
//! should move calls onto a blocking thread.

pub mod cache;
pub mod engine;
pub mod ingest;
pub mod keyword;
pub mod model;
pub mod model_config;
pub mod preprocess;

pub use cache::ModelCache;
pub use engine::InferenceEngine;
pub use ingest::{BatchFileIngester, BatchFormat, IngestedBatch, MAX_UPLOAD_BYTES};
pub use keyword::{KeywordModel, KeywordModelDef, KeywordModelLoader};
pub use model::{ModelLoader, ProbabilityScorer, TextModel};
pub use model_config::{ModelConfig, ModelConfigStore, ModelSummary};
pub use preprocess::TextNormalizer;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::engine::InferenceEngine;
    pub use crate::ingest::{BatchFileIngester, IngestedBatch};
    pub use crate::model::{ModelLoader, ProbabilityScorer, TextModel};
    pub use crate::model_config::{ModelConfig, ModelConfigStore, ModelSummary};
    pub use crate::preprocess::TextNormalizer;
    pub use smsguard_core::{BatchPrediction, Error, Label, PredictionResult, Result};
}
