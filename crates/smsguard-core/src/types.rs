//! Prediction result types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary verdict emitted for every message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Spam,
    Ham,
}

impl Label {
    /// Spam when `score` reaches the threshold (inclusive)
    pub fn from_score(score: f64, threshold: f64) -> Self {
        if score >= threshold {
            Self::Spam
        } else {
            Self::Ham
        }
    }

    /// Map a raw model label onto spam/ham by case-insensitive comparison
    /// against the model's positive label
    pub fn from_raw(raw: &str, positive_label: &str) -> Self {
        if raw.trim().to_lowercase() == positive_label.trim().to_lowercase() {
            Self::Spam
        } else {
            Self::Ham
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spam => "spam",
            Self::Ham => "ham",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized verdict for one message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: Label,

    /// Probability of the positive class; `None` for label-only models
    pub score: Option<f64>,

    /// Threshold actually applied to this call
    pub threshold_used: f64,

    pub model_id: String,
}

/// Batch verdict, carrying the input text it was computed for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPrediction {
    pub text: String,

    #[serde(flatten)]
    pub result: PredictionResult,
}
