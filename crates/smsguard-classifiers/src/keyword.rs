//! Keyword-weighted logistic model
//!
//! A small declarative artifact that makes the server usable without an
//! external model runtime:
//!
//! ```yaml
//! classes: [ham, spam]     # negative class first, positive class second
//! bias: -2.5
//! scoring: true            # false => label-only model
//! keywords:
//!   free: 1.4
//!   "claim prize": 2.2
//!   "<URL>": 1.1
//! ```
//!
//! Inputs are normalized with [`TextNormalizer`] before matching, and keyword
//! terms are normalized the same way at load time, so placeholder tokens such
//! as `<URL>` can carry weight. Every whole-token occurrence of every keyword
//! counts, so `claim` and `claim prize` both fire on "claim prize".

use crate::model::{ModelLoader, ProbabilityScorer, TextModel};
use crate::preprocess::TextNormalizer;
use aho_corasick::{AhoCorasick, MatchKind};
use serde::{Deserialize, Serialize};
use smsguard_core::{Error, Result};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// On-disk form of a keyword model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeywordModelDef {
    /// Exactly two labels: negative, then positive
    pub classes: Vec<String>,

    #[serde(default)]
    pub bias: f64,

    /// Expose per-class probabilities
    #[serde(default = "default_scoring")]
    pub scoring: bool,

    pub keywords: BTreeMap<String, f64>,
}

fn default_scoring() -> bool {
    true
}

/// Loaded keyword model
pub struct KeywordModel {
    normalizer: TextNormalizer,
    classes: Vec<String>,
    bias: f64,
    scoring: bool,
    matcher: AhoCorasick,
    weights: Vec<f64>,
}

impl KeywordModel {
    /// Build a model from its definition
    pub fn new(def: KeywordModelDef) -> Result<Self> {
        if def.classes.len() != 2 {
            return Err(Error::config(format!(
                "keyword model needs exactly 2 classes, got {}",
                def.classes.len()
            )));
        }

        let normalizer = TextNormalizer::new()?;
        let mut terms = Vec::with_capacity(def.keywords.len());
        let mut weights = Vec::with_capacity(def.keywords.len());

        for (term, weight) in def.keywords {
            let normalized = normalizer.normalize(term.as_str());
            if normalized.is_empty() {
                return Err(Error::config(format!(
                    "keyword '{}' is empty after normalization",
                    term
                )));
            }
            // Space-padded on both sides so only whole-token runs can match
            terms.push(format!(" {} ", normalized));
            weights.push(weight);
        }

        let matcher = AhoCorasick::builder()
            .match_kind(MatchKind::Standard)
            .build(&terms)
            .map_err(|e| Error::config(format!("Failed to build keyword matcher: {}", e)))?;

        Ok(Self {
            normalizer,
            classes: def.classes,
            bias: def.bias,
            scoring: def.scoring,
            matcher,
            weights,
        })
    }

    /// Probability of the positive class for one raw text
    pub fn positive_probability(&self, text: &str) -> f64 {
        let haystack = format!(" {} ", self.normalizer.normalize(text));

        let logit = self
            .matcher
            .find_overlapping_iter(&haystack)
            .fold(self.bias, |acc, m| acc + self.weights[m.pattern().as_usize()]);

        1.0 / (1.0 + (-logit).exp())
    }
}

impl TextModel for KeywordModel {
    fn predict(&self, texts: &[String]) -> Result<Vec<String>> {
        Ok(texts
            .iter()
            .map(|text| {
                let idx = usize::from(self.positive_probability(text) >= 0.5);
                self.classes[idx].clone()
            })
            .collect())
    }

    fn scorer(&self) -> Option<&dyn ProbabilityScorer> {
        if self.scoring {
            Some(self)
        } else {
            None
        }
    }

    fn describe(&self) -> String {
        format!(
            "keyword model, {} terms, {}",
            self.weights.len(),
            if self.scoring { "scoring" } else { "label-only" }
        )
    }
}

impl ProbabilityScorer for KeywordModel {
    fn classes(&self) -> Option<&[String]> {
        Some(&self.classes)
    }

    fn predict_proba(&self, texts: &[String]) -> Result<Vec<Vec<f64>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let p = self.positive_probability(text);
                vec![1.0 - p, p]
            })
            .collect())
    }
}

/// Loads [`KeywordModel`] artifacts from YAML or JSON files
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordModelLoader;

impl KeywordModelLoader {
    pub fn new() -> Self {
        Self
    }
}

impl ModelLoader for KeywordModelLoader {
    fn load(&self, location: &Path) -> Result<Arc<dyn TextModel>> {
        let contents = std::fs::read_to_string(location)?;

        let is_json = location
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let def: KeywordModelDef = if is_json {
            serde_json::from_str(&contents).map_err(|e| {
                Error::config(format!("Invalid keyword model {}: {}", location.display(), e))
            })?
        } else {
            serde_yaml::from_str(&contents).map_err(|e| {
                Error::config(format!("Invalid keyword model {}: {}", location.display(), e))
            })?
        };

        Ok(Arc::new(KeywordModel::new(def)?))
    }
}
