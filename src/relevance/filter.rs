use crate::config::FilterConfig;
use crate::relevance::RelevancePredictor;
use std::collections::BTreeSet;

/// Outcome of the relevance check for one article
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelevanceVerdict {
    pub accepted: bool,
    /// Keywords found in the title or content
    pub matched_keywords: BTreeSet<String>,
    /// The predictor voted for the article
    pub ml_recommended: bool,
}

impl RelevanceVerdict {
    pub fn keyword_match(&self) -> bool {
        !self.matched_keywords.is_empty()
    }
}

/// Keyword stage OR-ed with an optional predictor stage
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    keywords: Vec<String>,
}

impl RelevanceFilter {
    pub fn new(keywords: Vec<String>) -> Self {
        if keywords.is_empty() {
            tracing::warn!("No keywords configured; only the predictor can accept articles");
        }
        Self { keywords }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(config.keywords.clone())
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Keywords contained (case-sensitively) in `title + "\n" + content`
    pub fn match_keywords(&self, title: &str, content: &str) -> BTreeSet<String> {
        let text = combined_text(title, content);
        self.keywords
            .iter()
            .filter(|keyword| text.contains(keyword.as_str()))
            .cloned()
            .collect()
    }

    /// Decides whether an article is relevant
    ///
    /// # Stages
    ///
    /// 1. Keyword containment; every hit is recorded
    /// 2. If `predictor` is present and available, its vote is OR-ed in and
    ///    recorded as `ml_recommended`
    ///
    /// A missing, unavailable or failing predictor leaves the keyword
    /// verdict as the final one; prediction errors are logged, not returned.
    pub fn accept(
        &self,
        title: &str,
        content: &str,
        predictor: Option<&dyn RelevancePredictor>,
    ) -> RelevanceVerdict {
        let matched_keywords = self.match_keywords(title, content);

        let ml_recommended = match predictor {
            Some(predictor) if predictor.is_available() => {
                match predictor.predict(&[combined_text(title, content)]) {
                    Ok(votes) => votes.first().copied().unwrap_or(false),
                    Err(e) => {
                        tracing::warn!(title, "Predictor failed; using keyword verdict: {}", e);
                        false
                    }
                }
            }
            _ => false,
        };

        RelevanceVerdict {
            accepted: !matched_keywords.is_empty() || ml_recommended,
            matched_keywords,
            ml_recommended,
        }
    }
}

fn combined_text(title: &str, content: &str) -> String {
    format!("{}\n{}", title, content)
}
