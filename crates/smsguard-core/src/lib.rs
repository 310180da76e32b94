//! smsguard Core
//!
//! Types shared by every smsguard component.
//!
//! This crate provides:
//! - The error taxonomy surfaced by ingestion, the model registry and inference
//! - The normalized prediction shapes returned to callers

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{BatchPrediction, Label, PredictionResult};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{BatchPrediction, Label, PredictionResult};
}
