//! Scorer trait

use commentlens_core::SentimentLabel;

/// Per-document sentiment scorer, used for on-demand (lexicon mode) scoring
pub trait SentimentScorer: Send + Sync {
    /// Score a single text
    fn score(&self, text: &str) -> SentimentLabel;

    /// Get the scorer name
    fn name(&self) -> &str;
}
