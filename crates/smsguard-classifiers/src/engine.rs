//! Inference engine: resolves a model, dispatches on its capabilities and
//! normalizes the output into spam/ham verdicts

use crate::cache::ModelCache;
use crate::keyword::KeywordModelLoader;
use crate::model::{ModelLoader, ProbabilityScorer, TextModel};
use crate::model_config::{ModelConfig, ModelConfigStore, ModelSummary};
use smsguard_core::{BatchPrediction, Error, Label, PredictionResult, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Synchronous spam/ham inference over a fixed model registry.
///
/// Construct once at startup and share behind an `Arc`; the only mutable state
/// is the model cache, which is internally synchronized.
pub struct InferenceEngine {
    store: Arc<ModelConfigStore>,
    cache: ModelCache,
}

impl InferenceEngine {
    /// Create an engine over `store`, loading artifacts with `loader`
    pub fn new(store: Arc<ModelConfigStore>, loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            store,
            cache: ModelCache::new(loader),
        }
    }

    /// Load the registry at `path` and serve it with the built-in keyword loader
    pub fn from_registry_file(path: impl AsRef<Path>) -> Result<Self> {
        let store = ModelConfigStore::from_file(path)?;
        Ok(Self::new(Arc::new(store), Arc::new(KeywordModelLoader::new())))
    }

    /// Public model listing
    pub fn list_models(&self) -> Vec<ModelSummary> {
        self.store.list()
    }

    pub fn store(&self) -> &ModelConfigStore {
        &self.store
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    /// Load the given models ahead of the first request
    pub fn preload(&self, model_ids: &[String]) -> Result<()> {
        for model_id in model_ids {
            self.cache.resolve(model_id, &self.store)?;
        }
        info!("Preloaded {} models", model_ids.len());
        Ok(())
    }

    /// Classify a single message
    pub fn predict_one(
        &self,
        model_id: &str,
        text: &str,
        threshold: Option<f64>,
    ) -> Result<PredictionResult> {
        let texts = [text.to_string()];
        let mut results = self.run(model_id, &texts, threshold)?;
        results
            .pop()
            .ok_or_else(|| shape_mismatch(model_id, 1, 0))
    }

    /// Classify a batch of messages with one underlying model call.
    ///
    /// Output `i` always belongs to input `i`; the batch fails as a whole.
    pub fn predict_batch(
        &self,
        model_id: &str,
        texts: &[String],
        threshold: Option<f64>,
    ) -> Result<Vec<BatchPrediction>> {
        let results = self.run(model_id, texts, threshold)?;

        Ok(texts
            .iter()
            .cloned()
            .zip(results)
            .map(|(text, result)| BatchPrediction { text, result })
            .collect())
    }

    fn run(
        &self,
        model_id: &str,
        texts: &[String],
        threshold: Option<f64>,
    ) -> Result<Vec<PredictionResult>> {
        let start = Instant::now();
        let config = self.store.get(model_id)?;
        let model = self.cache.resolve(model_id, &self.store)?;
        let threshold_used = threshold.unwrap_or(config.default_threshold);

        let labels = match model.scorer() {
            Some(scorer) => score_labels(config, scorer, texts, threshold_used)?,
            None => predict_labels(config, model.as_ref(), texts)?,
        };

        let elapsed_us = start.elapsed().as_micros() as u64;
        debug!(
            "Model '{}' classified {} texts at threshold {} in {}us",
            model_id,
            texts.len(),
            threshold_used,
            elapsed_us
        );
        metrics::histogram!("smsguard_inference_latency_us").record(elapsed_us as f64);

        Ok(labels
            .into_iter()
            .map(|(label, score)| {
                metrics::counter!(
                    "smsguard_predictions_total",
                    "model_id" => model_id.to_string(),
                    "label" => label.as_str()
                )
                .increment(1);

                PredictionResult {
                    label,
                    score,
                    threshold_used,
                    model_id: model_id.to_string(),
                }
            })
            .collect())
    }
}

/// Index of the positive class: the configured label first, then the literal "spam"
fn positive_index(config: &ModelConfig, classes: &[String]) -> Result<usize> {
    let lowered: Vec<String> = classes.iter().map(|c| c.to_lowercase()).collect();
    let wanted = config.pos_label.to_lowercase();

    lowered
        .iter()
        .position(|c| *c == wanted)
        .or_else(|| lowered.iter().position(|c| c == "spam"))
        .ok_or_else(|| Error::PositiveClassNotFound {
            model_id: config.model_id.clone(),
            pos_label: config.pos_label.clone(),
        })
}

fn score_labels(
    config: &ModelConfig,
    scorer: &dyn ProbabilityScorer,
    texts: &[String],
    threshold: f64,
) -> Result<Vec<(Label, Option<f64>)>> {
    let classes = scorer
        .classes()
        .ok_or_else(|| Error::MissingClassMetadata(config.model_id.clone()))?;
    let positive = positive_index(config, classes)?;

    let rows = scorer.predict_proba(texts)?;
    if rows.len() != texts.len() {
        return Err(shape_mismatch(&config.model_id, texts.len(), rows.len()));
    }

    rows.iter()
        .map(|row| {
            let score = *row.get(positive).ok_or_else(|| {
                Error::model(format!(
                    "model '{}' returned {} probabilities for {} classes",
                    config.model_id,
                    row.len(),
                    classes.len()
                ))
            })?;
            Ok((Label::from_score(score, threshold), Some(score)))
        })
        .collect()
}

fn predict_labels(
    config: &ModelConfig,
    model: &dyn TextModel,
    texts: &[String],
) -> Result<Vec<(Label, Option<f64>)>> {
    let raw = model.predict(texts)?;
    if raw.len() != texts.len() {
        return Err(shape_mismatch(&config.model_id, texts.len(), raw.len()));
    }

    Ok(raw
        .iter()
        .map(|label| (Label::from_raw(label, &config.pos_label), None))
        .collect())
}

fn shape_mismatch(model_id: &str, expected: usize, actual: usize) -> Error {
    error!(
        "Model '{}' returned {} outputs for {} inputs",
        model_id, actual, expected
    );
    Error::BatchShapeMismatch { expected, actual }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    /// Scores every text with a fixed spam probability
    struct StubScorer {
        classes: Option<Vec<String>>,
        spam_index: usize,
        spam_score: f64,
    }

    impl TextModel for StubScorer {
        fn predict(&self, texts: &[String]) -> Result<Vec<String>> {
            Ok(texts.iter().map(|_| "unused".to_string()).collect())
        }

        fn scorer(&self) -> Option<&dyn ProbabilityScorer> {
            Some(self)
        }
    }

    impl ProbabilityScorer for StubScorer {
        fn classes(&self) -> Option<&[String]> {
            self.classes.as_deref()
        }

        fn predict_proba(&self, texts: &[String]) -> Result<Vec<Vec<f64>>> {
            Ok(texts
                .iter()
                .map(|_| {
                    let mut row = vec![1.0 - self.spam_score, 1.0 - self.spam_score];
                    row[self.spam_index] = self.spam_score;
                    row
                })
                .collect())
        }
    }

    /// Echoes a label derived from the text
    struct StubLabeler {
        drop_last: bool,
    }

    impl TextModel for StubLabeler {
        fn predict(&self, texts: &[String]) -> Result<Vec<String>> {
            let mut out: Vec<String> = texts
                .iter()
                .map(|t| if t.contains("win") { "JUNK" } else { "ok" }.to_string())
                .collect();
            if self.drop_last {
                out.pop();
            }
            Ok(out)
        }
    }

    fn engine_with(
        model: Arc<dyn TextModel>,
        pos_label: &str,
    ) -> (tempfile::TempDir, InferenceEngine) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("m1.bin"), b"stub").unwrap();

        let store = ModelConfigStore::from_records(
            vec![ModelConfig {
                model_id: "m1".to_string(),
                display_name: "Stub".to_string(),
                artifact_reference: "m1.bin".to_string(),
                has_proba: true,
                default_threshold: 0.5,
                pos_label: pos_label.to_string(),
            }],
            dir.path(),
        )
        .unwrap();

        let loader = move |_: &Path| -> Result<Arc<dyn TextModel>> { Ok(Arc::clone(&model)) };
        let engine = InferenceEngine::new(Arc::new(store), Arc::new(loader));
        (dir, engine)
    }

    fn scorer(classes: &[&str], spam_index: usize, spam_score: f64) -> Arc<dyn TextModel> {
        Arc::new(StubScorer {
            classes: Some(classes.iter().map(|c| c.to_string()).collect()),
            spam_index,
            spam_score,
        })
    }

    #[test]
    fn test_end_to_end_default_threshold() {
        let (_dir, engine) = engine_with(scorer(&["ham", "spam"], 1, 0.8), "spam");

        let result = engine.predict_one("m1", "free prize call now", None).unwrap();
        assert_eq!(
            result,
            PredictionResult {
                label: Label::Spam,
                score: Some(0.8),
                threshold_used: 0.5,
                model_id: "m1".to_string(),
            }
        );
    }

    #[test]
    fn test_threshold_boundary_is_spam() {
        let (_dir, engine) = engine_with(scorer(&["ham", "spam"], 1, 0.75), "spam");

        let result = engine.predict_one("m1", "text", Some(0.75)).unwrap();
        assert_eq!(result.label, Label::Spam);
        assert_eq!(result.threshold_used, 0.75);

        let result = engine.predict_one("m1", "text", Some(0.76)).unwrap();
        assert_eq!(result.label, Label::Ham);
    }

    #[test]
    fn test_caller_threshold_not_range_checked() {
        let (_dir, engine) = engine_with(scorer(&["ham", "spam"], 1, 0.99), "spam");

        let result = engine.predict_one("m1", "text", Some(1.5)).unwrap();
        assert_eq!(result.label, Label::Ham);
        assert_eq!(result.threshold_used, 1.5);
    }

    #[test]
    fn test_positive_class_match_is_case_insensitive() {
        let (_dir, engine) = engine_with(scorer(&["JUNK", "Normal"], 0, 0.9), "junk");
        let result = engine.predict_one("m1", "text", None).unwrap();
        assert_eq!(result.score, Some(0.9));
        assert_eq!(result.label, Label::Spam);
    }

    #[test]
    fn test_falls_back_to_literal_spam_class() {
        let (_dir, engine) = engine_with(scorer(&["SPAM", "ham"], 0, 0.3), "1");
        let result = engine.predict_one("m1", "text", None).unwrap();
        assert_eq!(result.score, Some(0.3));
        assert_eq!(result.label, Label::Ham);
    }

    #[test]
    fn test_positive_class_not_found() {
        let (_dir, engine) = engine_with(scorer(&["a", "b"], 0, 0.3), "junk");
        assert!(matches!(
            engine.predict_one("m1", "text", None),
            Err(Error::PositiveClassNotFound { .. })
        ));
    }

    #[test]
    fn test_missing_class_metadata() {
        let model: Arc<dyn TextModel> = Arc::new(StubScorer {
            classes: None,
            spam_index: 1,
            spam_score: 0.9,
        });
        let (_dir, engine) = engine_with(model, "spam");
        assert!(matches!(
            engine.predict_one("m1", "text", None),
            Err(Error::MissingClassMetadata(id)) if id == "m1"
        ));
    }

    #[test]
    fn test_label_only_model() {
        let (_dir, engine) = engine_with(Arc::new(StubLabeler { drop_last: false }), "junk");

        let texts = vec!["you win".to_string(), "see you".to_string()];
        let results = engine.predict_batch("m1", &texts, Some(0.9)).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "you win");
        assert_eq!(results[0].result.label, Label::Spam);
        assert_eq!(results[0].result.score, None);
        assert_eq!(results[0].result.threshold_used, 0.9);
        assert_eq!(results[1].result.label, Label::Ham);
    }

    #[test]
    fn test_batch_preserves_order_and_length() {
        let (_dir, engine) = engine_with(scorer(&["ham", "spam"], 1, 0.6), "spam");

        let texts: Vec<String> = (0..25).map(|i| format!("message {}", i)).collect();
        let results = engine.predict_batch("m1", &texts, None).unwrap();

        assert_eq!(results.len(), texts.len());
        for (input, output) in texts.iter().zip(&results) {
            assert_eq!(&output.text, input);
            assert_eq!(output.result.model_id, "m1");
        }
    }

    #[test]
    fn test_shape_mismatch_is_internal() {
        let (_dir, engine) = engine_with(Arc::new(StubLabeler { drop_last: true }), "junk");

        let texts = vec!["a".to_string(), "b".to_string()];
        let err = engine.predict_batch("m1", &texts, None).unwrap_err();
        assert!(matches!(err, Error::BatchShapeMismatch { expected: 2, actual: 1 }));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_unknown_model() {
        let (_dir, engine) = engine_with(scorer(&["ham", "spam"], 1, 0.6), "spam");
        assert!(matches!(
            engine.predict_one("nope", "text", None),
            Err(Error::ModelNotFound(_))
        ));
    }
}
