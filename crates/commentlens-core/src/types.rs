//! Core types for commentlens

use crate::codec;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single reply nested under a top-level comment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reply {
    /// Platform identifier of the reply
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: String,

    /// Reply text; non-string payloads are read as empty
    #[serde(default, alias = "content", deserialize_with = "lenient_text")]
    pub text: String,

    /// Author display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uname: Option<String>,

    /// Like count
    #[serde(default)]
    pub like: u64,
}

/// A top-level comment together with its replies (a thread)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentThread {
    /// Platform identifier of the top-level comment
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: String,

    /// Comment text; non-string payloads are read as empty
    #[serde(default, alias = "content", deserialize_with = "lenient_text")]
    pub text: String,

    /// Author display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uname: Option<String>,

    /// Like count
    #[serde(default)]
    pub like: u64,

    /// Replies in their original order
    #[serde(default)]
    pub replies: Vec<Reply>,
}

impl CommentThread {
    /// Create a thread without replies
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    /// Append a reply
    pub fn with_reply(mut self, id: impl Into<String>, text: impl Into<String>) -> Self {
        self.replies.push(Reply {
            id: id.into(),
            text: text.into(),
            ..Default::default()
        });
        self
    }

    /// Set the author name
    pub fn with_author(mut self, uname: impl Into<String>) -> Self {
        self.uname = Some(uname.into());
        self
    }

    /// Set the like count
    pub fn with_likes(mut self, like: u64) -> Self {
        self.like = like;
        self
    }
}

/// Number of documents a corpus flattens into (threads plus replies)
pub fn document_count(corpus: &[CommentThread]) -> usize {
    corpus.iter().map(|thread| 1 + thread.replies.len()).sum()
}

/// Flatten threads into documents: each top-level comment followed by its
/// replies, thread after thread. Document ids are flat positions.
pub fn flatten_documents(corpus: &[CommentThread]) -> Vec<Document> {
    let mut documents = Vec::with_capacity(document_count(corpus));

    for (thread_idx, thread) in corpus.iter().enumerate() {
        documents.push(Document {
            id: documents.len(),
            parent_id: thread_idx,
            is_reply: false,
            reply_index: None,
            text: thread.text.clone(),
        });

        for (reply_idx, reply) in thread.replies.iter().enumerate() {
            documents.push(Document {
                id: documents.len(),
                parent_id: thread_idx,
                is_reply: true,
                reply_index: Some(reply_idx),
                text: reply.text.clone(),
            });
        }
    }

    documents
}

/// Atomic unit of tokenization and classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Flat index across the expanded corpus
    pub id: usize,

    /// Index of the owning thread in the corpus
    pub parent_id: usize,

    /// Whether this document is a reply
    pub is_reply: bool,

    /// Position among the thread's replies
    pub reply_index: Option<usize>,

    /// Raw text
    pub text: String,
}

/// Three-way sentiment polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Polarity {
    /// Score above which a text is positive (and below whose negation it is negative)
    pub const THRESHOLD: f64 = 0.3;

    /// Classify a numeric score
    pub fn from_score(score: f64) -> Self {
        if score > Self::THRESHOLD {
            Self::Positive
        } else if score < -Self::THRESHOLD {
            Self::Negative
        } else {
            Self::Neutral
        }
    }

    /// Parse a label string; unknown labels are neutral
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" => Self::Positive,
            "negative" => Self::Negative,
            _ => Self::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Polarity {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" | "pos" => Ok(Self::Positive),
            "neutral" | "neu" => Ok(Self::Neutral),
            "negative" | "neg" => Ok(Self::Negative),
            other => Err(crate::Error::config(format!("unknown sentiment '{other}'"))),
        }
    }
}

/// Output of either scoring strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentLabel {
    pub label: Polarity,
    pub score: f64,
}

impl SentimentLabel {
    pub fn new(label: Polarity, score: f64) -> Self {
        Self { label, score }
    }

    /// Label from a numeric score using the standard thresholds
    pub fn from_score(score: f64) -> Self {
        Self::new(Polarity::from_score(score), score)
    }

    /// Label from a discrete polarity (score is +1, 0 or -1)
    pub fn from_polarity(label: Polarity) -> Self {
        let score = match label {
            Polarity::Positive => 1.0,
            Polarity::Neutral => 0.0,
            Polarity::Negative => -1.0,
        };
        Self::new(label, score)
    }

    pub fn neutral() -> Self {
        Self::new(Polarity::Neutral, 0.0)
    }
}

/// Sparse document id → label map. Absence means "not classified",
/// which is distinct from a neutral label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SentimentCache {
    #[serde(with = "codec::pairs")]
    labels: HashMap<usize, SentimentLabel>,
}

impl SentimentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a label. Returns false (and keeps the first label) if the
    /// document was already classified.
    pub fn insert(&mut self, document_id: usize, label: SentimentLabel) -> bool {
        match self.labels.entry(document_id) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(label);
                true
            }
        }
    }

    pub fn get(&self, document_id: usize) -> Option<&SentimentLabel> {
        self.labels.get(&document_id)
    }

    pub fn contains(&self, document_id: usize) -> bool {
        self.labels.contains_key(&document_id)
    }

    /// Label for aggregation purposes: unclassified documents count as neutral
    pub fn polarity_or_neutral(&self, document_id: usize) -> Polarity {
        self.get(document_id)
            .map(|label| label.label)
            .unwrap_or(Polarity::Neutral)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &SentimentLabel)> {
        self.labels.iter().map(|(id, label)| (*id, label))
    }

    /// Merge another cache; entries already present win
    pub fn merge(&mut self, other: SentimentCache) {
        for (id, label) in other.labels {
            self.labels.entry(id).or_insert(label);
        }
    }
}

/// A chat message sent to the classification service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }
}

/// Which labelling strategy the aggregator uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SentimentMode {
    #[default]
    Lexicon,
    Ai,
}

impl fmt::Display for SentimentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lexicon => f.write_str("lexicon"),
            Self::Ai => f.write_str("ai"),
        }
    }
}

/// Positive/neutral/negative tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentDistribution {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl SentimentDistribution {
    pub fn record(&mut self, polarity: Polarity) {
        match polarity {
            Polarity::Positive => self.positive += 1,
            Polarity::Neutral => self.neutral += 1,
            Polarity::Negative => self.negative += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.neutral + self.negative
    }

    /// Share of the total in percent, 0 for an empty tally
    pub fn percent(&self, polarity: Polarity) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let count = match polarity {
            Polarity::Positive => self.positive,
            Polarity::Neutral => self.neutral,
            Polarity::Negative => self.negative,
        };
        count as f64 * 100.0 / total as f64
    }
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(text)) => Ok(text),
        _ => Ok(String::new()),
    }
}

fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(id)) => Ok(id),
        Some(serde_json::Value::Number(id)) => Ok(id.to_string()),
        _ => Ok(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_orders_replies_after_parent() {
        let corpus = vec![
            CommentThread::new("1", "first").with_reply("11", "a").with_reply("12", "b"),
            CommentThread::new("2", "second"),
        ];

        let docs = flatten_documents(&corpus);
        assert_eq!(docs.len(), 4);
        assert_eq!(document_count(&corpus), 4);
        assert_eq!(docs[0].text, "first");
        assert!(!docs[0].is_reply);
        assert_eq!(docs[2].reply_index, Some(1));
        assert_eq!(docs[2].parent_id, 0);
        assert_eq!(docs[3].parent_id, 1);
        assert_eq!(docs[3].id, 3);
    }

    #[test]
    fn test_lenient_corpus_fields() {
        let json = r#"[
            {"id": 42, "content": "hello", "like": 3, "replies": [{"id": "7", "text": 5}]},
            {"id": "x", "text": null}
        ]"#;
        let corpus: Vec<CommentThread> = serde_json::from_str(json).unwrap();

        assert_eq!(corpus[0].id, "42");
        assert_eq!(corpus[0].text, "hello");
        assert_eq!(corpus[0].like, 3);
        assert_eq!(corpus[0].replies[0].text, "");
        assert_eq!(corpus[1].text, "");
        assert!(corpus[1].replies.is_empty());
    }

    #[test]
    fn test_polarity_thresholds() {
        assert_eq!(Polarity::from_score(0.31), Polarity::Positive);
        assert_eq!(Polarity::from_score(0.3), Polarity::Neutral);
        assert_eq!(Polarity::from_score(-0.3), Polarity::Neutral);
        assert_eq!(Polarity::from_score(-0.5), Polarity::Negative);
        assert_eq!(Polarity::from_label("POSITIVE"), Polarity::Positive);
        assert_eq!(Polarity::from_label("mixed"), Polarity::Neutral);
    }

    #[test]
    fn test_sentiment_cache_single_write() {
        let mut cache = SentimentCache::new();
        assert!(cache.insert(3, SentimentLabel::from_polarity(Polarity::Positive)));
        assert!(!cache.insert(3, SentimentLabel::from_polarity(Polarity::Negative)));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.polarity_or_neutral(3), Polarity::Positive);
        assert_eq!(cache.polarity_or_neutral(9), Polarity::Neutral);
        assert!(!cache.contains(9));
    }

    #[test]
    fn test_sentiment_cache_serializes_as_pairs() {
        let mut cache = SentimentCache::new();
        cache.insert(5, SentimentLabel::from_polarity(Polarity::Negative));

        let json = serde_json::to_value(&cache).unwrap();
        assert_eq!(
            json,
            serde_json::json!([[5, {"label": "negative", "score": -1.0}]])
        );

        let back: SentimentCache = serde_json::from_value(json).unwrap();
        assert_eq!(back, cache);
    }

    #[test]
    fn test_distribution_percent() {
        let mut dist = SentimentDistribution::default();
        dist.record(Polarity::Positive);
        dist.record(Polarity::Positive);
        dist.record(Polarity::Negative);
        dist.record(Polarity::Neutral);

        assert_eq!(dist.total(), 4);
        assert!((dist.percent(Polarity::Positive) - 50.0).abs() < 1e-9);
        assert_eq!(SentimentDistribution::default().percent(Polarity::Neutral), 0.0);
    }
}
