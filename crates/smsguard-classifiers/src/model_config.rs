//! Model registry configuration
//!
//! The registry is an ordered list of flat records, one per `model_id`, stored
//! as YAML or JSON. Artifact references are resolved against the directory the
//! registry file lives in.

use serde::{Deserialize, Serialize};
use smsguard_core::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Configuration for a single model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Unique key across the registry
    pub model_id: String,

    /// UI label only
    pub display_name: String,

    /// Artifact locator, relative to the registry's directory
    pub artifact_reference: String,

    /// Informational; the engine asks the loaded model instead
    pub has_proba: bool,

    /// Threshold applied when the caller supplies none
    pub default_threshold: f64,

    /// Class name the model uses for spam, compared case-insensitively
    pub pos_label: String,
}

impl ModelConfig {
    /// Public view without the artifact locator
    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            model_id: self.model_id.clone(),
            display_name: self.display_name.clone(),
            has_proba: self.has_proba,
            default_threshold: self.default_threshold,
            pos_label: self.pos_label.clone(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.model_id.trim().is_empty() {
            return Err(Error::config("model_id must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.default_threshold) {
            return Err(Error::config(format!(
                "default_threshold for '{}' must be within [0, 1], got {}",
                self.model_id, self.default_threshold
            )));
        }
        Ok(())
    }
}

/// Model listing entry exposed to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub model_id: String,
    pub display_name: String,
    pub has_proba: bool,
    pub default_threshold: f64,
    pub pos_label: String,
}

/// Immutable, validated set of model configurations
#[derive(Debug, Clone)]
pub struct ModelConfigStore {
    root: PathBuf,
    configs: HashMap<String, ModelConfig>,
}

impl ModelConfigStore {
    /// Build a store from already-parsed records.
    ///
    /// `root` is the directory artifact references are resolved against.
    pub fn from_records(records: Vec<ModelConfig>, root: impl Into<PathBuf>) -> Result<Self> {
        let mut configs = HashMap::with_capacity(records.len());

        for record in records {
            record.validate()?;
            if configs.contains_key(&record.model_id) {
                return Err(Error::DuplicateModelId(record.model_id));
            }
            configs.insert(record.model_id.clone(), record);
        }

        if configs.is_empty() {
            return Err(Error::EmptyRegistry);
        }

        Ok(Self {
            root: root.into(),
            configs,
        })
    }

    /// Load the registry from a YAML (`.yaml`/`.yml`) or JSON (`.json`) file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read model registry {}: {}", path.display(), e))
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let records: Vec<ModelConfig> = if is_json {
            serde_json::from_str(&contents)
                .map_err(|e| Error::config(format!("Invalid model registry: {}", e)))?
        } else {
            serde_yaml::from_str(&contents)
                .map_err(|e| Error::config(format!("Invalid model registry: {}", e)))?
        };

        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let store = Self::from_records(records, root)?;
        info!(
            "Loaded model registry {} with {} models",
            path.display(),
            store.len()
        );
        Ok(store)
    }

    /// Look up one model's configuration
    pub fn get(&self, model_id: &str) -> Result<&ModelConfig> {
        self.configs
            .get(model_id)
            .ok_or_else(|| Error::ModelNotFound(model_id.to_string()))
    }

    /// Public listing, sorted by `model_id`
    pub fn list(&self) -> Vec<ModelSummary> {
        let mut models: Vec<ModelSummary> =
            self.configs.values().map(ModelConfig::summary).collect();
        models.sort_by(|a, b| a.model_id.cmp(&b.model_id));
        models
    }

    /// Absolute-or-relative location of a model's artifact
    pub fn artifact_path(&self, config: &ModelConfig) -> PathBuf {
        self.root.join(&config.artifact_reference)
    }

    /// Directory artifact references are resolved against
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn contains(&self, model_id: &str) -> bool {
        self.configs.contains_key(model_id)
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(model_id: &str) -> ModelConfig {
        ModelConfig {
            model_id: model_id.to_string(),
            display_name: format!("{} model", model_id),
            artifact_reference: format!("models/{}.yaml", model_id),
            has_proba: true,
            default_threshold: 0.5,
            pos_label: "spam".to_string(),
        }
    }

    #[test]
    fn test_parse_registry_yaml() {
        let yaml = r#"
- model_id: bnb_binary
  display_name: "BernoulliNB + Binary Count"
  artifact_reference: models/bnb_binary.yaml
  has_proba: true
  default_threshold: 0.5
  pos_label: spam
- model_id: keyword_rules
  display_name: "Keyword rules"
  artifact_reference: models/rules.yaml
  has_proba: false
  default_threshold: 0.7
  pos_label: SPAM
"#;

        let records: Vec<ModelConfig> = serde_yaml::from_str(yaml).unwrap();
        let store = ModelConfigStore::from_records(records, "/srv/models").unwrap();
        assert_eq!(store.len(), 2);

        let rules = store.get("keyword_rules").unwrap();
        assert_eq!(rules.default_threshold, 0.7);
        assert!(!rules.has_proba);
        assert_eq!(
            store.artifact_path(rules),
            PathBuf::from("/srv/models/models/rules.yaml")
        );
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let yaml = r#"
- model_id: m1
  display_name: m1
  artifact_reference: m1.yaml
  has_proba: true
  default_threshold: 0.5
  pos_label: spam
  color: blue
"#;
        assert!(serde_yaml::from_str::<Vec<ModelConfig>>(yaml).is_err());
    }

    #[test]
    fn test_duplicate_model_id() {
        let err =
            ModelConfigStore::from_records(vec![record("m1"), record("m1")], ".").unwrap_err();
        assert!(matches!(err, Error::DuplicateModelId(id) if id == "m1"));
    }

    #[test]
    fn test_empty_registry() {
        let err = ModelConfigStore::from_records(Vec::new(), ".").unwrap_err();
        assert!(matches!(err, Error::EmptyRegistry));
    }

    #[test]
    fn test_threshold_out_of_range() {
        let mut bad = record("m1");
        bad.default_threshold = 1.5;
        let err = ModelConfigStore::from_records(vec![bad], ".").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_list_is_sorted_and_hides_artifact() {
        let records = vec![record("zeta"), record("alpha"), record("mid")];
        let store = ModelConfigStore::from_records(records, ".").unwrap();

        let ids: Vec<_> = store.list().into_iter().map(|m| m.model_id).collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"]);

        let listed = serde_json::to_value(store.list()).unwrap();
        assert!(listed[0].get("artifact_reference").is_none());
        assert_eq!(listed[0]["display_name"], "alpha model");
    }

    #[test]
    fn test_get_unknown_model() {
        let store = ModelConfigStore::from_records(vec![record("m1")], ".").unwrap();
        assert!(matches!(store.get("m2"), Err(Error::ModelNotFound(id)) if id == "m2"));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models_registry.json");
        let json = serde_json::to_string(&vec![record("m1")]).unwrap();
        std::fs::write(&path, json).unwrap();

        let store = ModelConfigStore::from_file(&path).unwrap();
        assert!(store.contains("m1"));
        assert_eq!(store.root(), dir.path());
    }
}
