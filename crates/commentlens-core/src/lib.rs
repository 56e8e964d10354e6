//! commentlens Core
//!
//! Core types, traits, and utilities shared across commentlens components.
//!
//! This crate provides:
//! - Corpus, document and sentiment types
//! - Error types and result handling
//! - The tokenizer adapter with its primary and fallback backends
//! - A pair-list codec for persisting map- and set-shaped data
//! - Bounded retry with timeout for remote calls
//! - Deferred tasks with a cancellation handle

pub mod codec;
pub mod deferred;
pub mod error;
pub mod retry;
pub mod tokenizer;
pub mod types;

pub use deferred::{DeferredTask, TaskHandle};
pub use error::{Error, Result};
pub use retry::{retry_with_timeout, RetryPolicy};
pub use tokenizer::{select_tokenizer, SegmenterTokenizer, Tokenizer, TokenizerConfig, TokenizerKind};
pub use types::{
    document_count, flatten_documents, ChatMessage, CommentThread, Document, Polarity, Reply, SentimentCache,
    SentimentDistribution, SentimentLabel, SentimentMode,
};

#[cfg(feature = "jieba")]
pub use tokenizer::JiebaTokenizer;

pub use tokio_util::sync::CancellationToken;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::tokenizer::Tokenizer;
    pub use crate::types::{
        ChatMessage, CommentThread, Document, Polarity, SentimentCache, SentimentLabel, SentimentMode,
    };
}
