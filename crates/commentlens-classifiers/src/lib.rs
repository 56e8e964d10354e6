//! commentlens Classifiers
//!
//! Sentiment labelling for comment corpora.
//!
//! Two interchangeable strategies feed the same aggregation:
//! - Lexicon mode: a local rule-based scorer, evaluated lazily per thread
//! - AI mode: a remote chat-completion classifier, run once over every
//!   document in concurrency-bounded waves
//!
//! The crate also builds comment-section summaries over the same client.

pub mod aggregator;
pub mod batch;
pub mod classifier;
pub mod client;
pub mod config;
pub mod lexicon;
pub mod sentiment;
pub mod summary;

pub use aggregator::{SentimentAggregator, ThreadMatch, WordSentiment};
pub use batch::{parse_labels, AiBatchClassifier, BatchConfig, RunReport, RunState};
pub use classifier::SentimentScorer;
pub use client::{ChatClient, ChatRequest, HttpChatClient};
pub use config::ClassifierConfig;
pub use lexicon::{Lexicon, LexiconConfig};
pub use sentiment::LexiconScorer;
pub use summary::{sample_texts, Summary, SummaryConfig, SummaryGenerator, SummaryInput};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::aggregator::SentimentAggregator;
    pub use crate::batch::{AiBatchClassifier, BatchConfig, RunReport};
    pub use crate::classifier::SentimentScorer;
    pub use crate::client::{ChatClient, ChatRequest, HttpChatClient};
    pub use crate::sentiment::LexiconScorer;
    pub use crate::summary::SummaryGenerator;
}
