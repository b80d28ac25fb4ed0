//! Relevance filtering
//!
//! An article is accepted when a configured keyword appears in its title or
//! content, or when an available predictor votes for it. The predictor is
//! optional: without one (or when it fails) the filter degrades to keywords
//! only.

mod filter;
mod predictor;

pub use filter::{RelevanceFilter, RelevanceVerdict};
pub use predictor::{load_predictor, LinearTextModel, RelevancePredictor};

use thiserror::Error;

/// Errors from loading or running a relevance predictor
#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("Failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid model artifact: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Predictor unavailable: {0}")]
    Unavailable(String),

    #[error("Prediction failed: {0}")]
    Inference(String),
}
