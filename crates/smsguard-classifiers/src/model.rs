//! Capability traits implemented by every servable model
//!
//! A model always answers plain label predictions. Probability scoring is an
//! optional second capability queried at call time through [`TextModel::scorer`];
//! the registry's `has_proba` flag is informational only.

use smsguard_core::Result;
use std::path::Path;
use std::sync::Arc;

/// Trait for all servable text models
pub trait TextModel: Send + Sync {
    /// Predict one raw label per input text
    fn predict(&self, texts: &[String]) -> Result<Vec<String>>;

    /// Probability scoring capability, if this model has one
    fn scorer(&self) -> Option<&dyn ProbabilityScorer> {
        None
    }

    /// Short description for logs
    fn describe(&self) -> String {
        "text model".to_string()
    }
}

/// Optional per-class probability capability
pub trait ProbabilityScorer: Send + Sync {
    /// Ordered class labels; index `i` matches column `i` of [`Self::predict_proba`]
    fn classes(&self) -> Option<&[String]>;

    /// One probability vector per input text
    fn predict_proba(&self, texts: &[String]) -> Result<Vec<Vec<f64>>>;
}

/// Turns a resolved artifact location into an in-memory model.
///
/// The serialized format is entirely the loader's concern; the cache only
/// checks that the location exists before calling [`ModelLoader::load`].
pub trait ModelLoader: Send + Sync {
    fn load(&self, location: &Path) -> Result<Arc<dyn TextModel>>;
}

impl<F> ModelLoader for F
where
    F: Fn(&Path) -> Result<Arc<dyn TextModel>> + Send + Sync,
{
    fn load(&self, location: &Path) -> Result<Arc<dyn TextModel>> {
        self(location)
    }
}
