//! Error types for smsguard

use std::path::PathBuf;

/// Result type alias using smsguard's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for smsguard operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or malformed caller input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Upload extension outside the supported set
    #[error("unsupported file format '{0}': only .txt, .csv and .xlsx are accepted")]
    UnsupportedFormat(String),

    /// Upload or table carries no data
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// Upload exceeds the size cap
    #[error("payload too large: {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    /// Caller asked for a column the table does not have
    #[error("column '{0}' not found in file")]
    ColumnNotFound(String),

    /// No text column could be picked automatically
    #[error("could not determine the text column; pass `text_column` explicitly")]
    ColumnUnresolved,

    /// Selected column holds no non-empty text
    #[error("no valid text rows to predict")]
    NoValidRows,

    /// Unknown model identifier
    #[error("model_id '{0}' not found")]
    ModelNotFound(String),

    /// Artifact location does not exist
    #[error("model artifact not found: {}", .0.display())]
    ArtifactMissing(PathBuf),

    /// Scoring model without an ordered class list
    #[error("model '{0}' exposes probabilities but no class labels")]
    MissingClassMetadata(String),

    /// Scoring model whose classes contain neither the positive label nor "spam"
    #[error("model '{model_id}' has no class matching '{pos_label}' or 'spam'")]
    PositiveClassNotFound { model_id: String, pos_label: String },

    /// Two registry records share a model_id
    #[error("duplicate model_id in registry: {0}")]
    DuplicateModelId(String),

    /// Registry holds no records
    #[error("model registry contains no models")]
    EmptyRegistry,

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// A model implementation failed while predicting
    #[error("model error: {0}")]
    Model(String),

    /// Batch inputs and outputs disagree in length
    #[error("batch shape mismatch: {expected} inputs produced {actual} outputs")]
    BatchShapeMismatch { expected: usize, actual: usize },

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new empty input error
    pub fn empty_input(msg: impl Into<String>) -> Self {
        Self::EmptyInput(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new model error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the caller caused this error and can fix it by changing the request.
    ///
    /// Everything else is a server-side failure and is never retried inside the core.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::UnsupportedFormat(_)
                | Self::EmptyInput(_)
                | Self::PayloadTooLarge { .. }
                | Self::ColumnNotFound(_)
                | Self::ColumnUnresolved
                | Self::NoValidRows
                | Self::ModelNotFound(_)
                | Self::ArtifactMissing(_)
                | Self::MissingClassMetadata(_)
                | Self::PositiveClassNotFound { .. }
        )
    }

    /// Stable snake_case name, used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::EmptyInput(_) => "empty_input",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::ColumnNotFound(_) => "column_not_found",
            Self::ColumnUnresolved => "column_unresolved",
            Self::NoValidRows => "no_valid_rows",
            Self::ModelNotFound(_) => "model_not_found",
            Self::ArtifactMissing(_) => "artifact_missing",
            Self::MissingClassMetadata(_) => "missing_class_metadata",
            Self::PositiveClassNotFound { .. } => "positive_class_not_found",
            Self::DuplicateModelId(_) => "duplicate_model_id",
            Self::EmptyRegistry => "empty_registry",
            Self::Config(_) => "config",
            Self::Model(_) => "model",
            Self::BatchShapeMismatch { .. } => "batch_shape_mismatch",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_kinds_are_client_errors() {
        assert!(Error::invalid_input("missing `model_id`").is_client_error());
        assert!(Error::UnsupportedFormat(".pdf".into()).is_client_error());
        assert!(Error::PayloadTooLarge { size: 11, limit: 10 }.is_client_error());
        assert!(Error::ColumnUnresolved.is_client_error());
        assert!(Error::ModelNotFound("m1".into()).is_client_error());
        assert!(Error::ArtifactMissing(PathBuf::from("models/m1.yaml")).is_client_error());
    }

    #[test]
    fn test_internal_kinds_are_not_client_errors() {
        let mismatch = Error::BatchShapeMismatch { expected: 3, actual: 2 };
        assert!(!mismatch.is_client_error());
        assert_eq!(mismatch.kind(), "batch_shape_mismatch");
        assert!(!Error::model("boom").is_client_error());
        assert!(!Error::EmptyRegistry.is_client_error());
    }

    #[test]
    fn test_messages() {
        let err = Error::PositiveClassNotFound {
            model_id: "m1".into(),
            pos_label: "junk".into(),
        };
        assert_eq!(
            err.to_string(),
            "model 'm1' has no class matching 'junk' or 'spam'"
        );
        assert_eq!(
            Error::ColumnNotFound("body".into()).to_string(),
            "column 'body' not found in file"
        );
    }
}
