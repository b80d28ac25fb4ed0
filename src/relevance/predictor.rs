use crate::relevance::PredictorError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// A classifier that can vote for articles
///
/// Implementations are optional collaborators: the filter checks
/// [`is_available`](Self::is_available) before every call and falls back to
/// keyword matching when the predictor is missing or errors.
pub trait RelevancePredictor: Send + Sync {
    fn is_available(&self) -> bool;

    /// One verdict per input text, in order
    fn predict(&self, texts: &[String]) -> Result<Vec<bool>, PredictorError>;
}

/// Bag-of-terms logistic model loaded from a JSON artifact
///
/// ```json
/// { "bias": -2.0, "threshold": 0.5, "features": { "harbour": 1.4, "tariff": 0.9 } }
/// ```
///
/// The score is `sigmoid(bias + sum of weights of terms present)`; terms are
/// matched case-sensitively by substring, so they work for unsegmented
/// scripts too.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearTextModel {
    bias: f64,
    #[serde(default = "default_threshold")]
    threshold: f64,
    features: HashMap<String, f64>,
}

impl LinearTextModel {
    pub fn new(bias: f64, threshold: f64, features: HashMap<String, f64>) -> Self {
        Self {
            bias,
            threshold,
            features,
        }
    }

    /// Reads a model artifact from disk
    pub fn from_file(path: &Path) -> Result<Self, PredictorError> {
        let raw = fs::read_to_string(path)?;
        let model: Self = serde_json::from_str(&raw)?;
        Ok(model)
    }

    /// Probability-like score in (0, 1)
    pub fn score(&self, text: &str) -> f64 {
        let logit = self.bias
            + self
                .features
                .iter()
                .filter(|(term, _)| text.contains(term.as_str()))
                .map(|(_, weight)| weight)
                .sum::<f64>();
        1.0 / (1.0 + (-logit).exp())
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl RelevancePredictor for LinearTextModel {
    fn is_available(&self) -> bool {
        !self.features.is_empty()
    }

    fn predict(&self, texts: &[String]) -> Result<Vec<bool>, PredictorError> {
        if !self.is_available() {
            return Err(PredictorError::Unavailable("model has no features".to_string()));
        }
        Ok(texts
            .iter()
            .map(|text| self.score(text) >= self.threshold)
            .collect())
    }
}

/// Loads the configured model artifact, if any
///
/// # Returns
///
/// * `Ok(Some(model))` - Artifact loaded
/// * `Ok(None)` - No path configured, or nothing at the path
/// * `Err(PredictorError)` - The artifact exists but is unreadable or malformed
pub fn load_predictor(path: Option<&Path>) -> Result<Option<LinearTextModel>, PredictorError> {
    let Some(path) = path else {
        return Ok(None);
    };

    match LinearTextModel::from_file(path) {
        Ok(model) => {
            tracing::info!(
                path = %path.display(),
                features = model.features.len(),
                "Loaded relevance model"
            );
            Ok(Some(model))
        }
        Err(PredictorError::Io(e)) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "Relevance model not found; keyword matching only");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn default_threshold() -> f64 {
    0.5
}
