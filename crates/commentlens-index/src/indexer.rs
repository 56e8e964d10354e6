//! Corpus indexer
//!
//! Flattens comment threads into documents and builds:
//! - a word frequency map (every valid token occurrence counts)
//! - a word → document index (flat granularity, replies included)
//! - a word → thread index (one entry per top-level comment)

use crate::stopwords::{Stopwords, TokenFilter};
use commentlens_core::codec;
use commentlens_core::{document_count, flatten_documents, CommentThread, Document, Result, Tokenizer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Output of one indexing pass. Only valid for the corpus it was built from;
/// see [`AnalysisSnapshot::is_current`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    /// Number of top-level threads in the source corpus
    pub thread_count: usize,

    /// Number of documents (threads plus replies) in the source corpus
    pub document_count: usize,

    #[serde(with = "codec::pairs")]
    word_frequencies: HashMap<String, usize>,

    #[serde(with = "codec::pair_sets")]
    word_documents: HashMap<String, BTreeSet<usize>>,

    #[serde(with = "codec::pair_sets")]
    word_threads: HashMap<String, BTreeSet<usize>>,

    documents: Vec<Document>,
}

impl AnalysisSnapshot {
    /// Whether this snapshot still describes `corpus`. A stale snapshot must
    /// be rebuilt.
    pub fn is_current(&self, corpus: &[CommentThread]) -> bool {
        self.thread_count == corpus.len() && self.document_count == document_count(corpus)
    }

    /// Occurrences of `word` across all documents
    pub fn frequency(&self, word: &str) -> usize {
        self.word_frequencies.get(word).copied().unwrap_or(0)
    }

    pub fn word_frequencies(&self) -> &HashMap<String, usize> {
        &self.word_frequencies
    }

    /// Flat document ids containing `word`
    pub fn documents_for(&self, word: &str) -> Option<&BTreeSet<usize>> {
        self.word_documents.get(word)
    }

    /// Thread ids whose top-level comment or replies contain `word`
    pub fn threads_for(&self, word: &str) -> Option<&BTreeSet<usize>> {
        self.word_threads.get(word)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn document(&self, id: usize) -> Option<&Document> {
        self.documents.get(id)
    }

    /// Texts of every document in flat order
    pub fn texts(&self) -> Vec<&str> {
        self.documents.iter().map(|doc| doc.text.as_str()).collect()
    }

    /// Text of a thread's top-level comment
    pub fn thread_text(&self, thread_id: usize) -> Option<&str> {
        // Top-level documents precede their replies, so the first document
        // with this parent is the comment itself.
        let start = self.documents.partition_point(|doc| doc.parent_id < thread_id);
        self.documents
            .get(start)
            .filter(|doc| doc.parent_id == thread_id && !doc.is_reply)
            .map(|doc| doc.text.as_str())
    }

    /// Number of distinct indexed words
    pub fn vocabulary_size(&self) -> usize {
        self.word_frequencies.len()
    }

    /// Total number of indexed token occurrences
    pub fn total_tokens(&self) -> usize {
        self.word_frequencies.values().sum()
    }

    pub fn reply_count(&self) -> usize {
        self.documents.iter().filter(|doc| doc.is_reply).count()
    }

    fn record(&mut self, word: &str, document_id: usize, thread_id: usize) {
        *self.word_frequencies.entry(word.to_string()).or_insert(0) += 1;
        self.word_documents
            .entry(word.to_string())
            .or_default()
            .insert(document_id);
        self.word_threads
            .entry(word.to_string())
            .or_default()
            .insert(thread_id);
    }
}

/// Builds [`AnalysisSnapshot`]s from a corpus
#[derive(Clone)]
pub struct CorpusIndexer {
    tokenizer: Arc<dyn Tokenizer>,
    filter: Arc<TokenFilter>,
}

impl CorpusIndexer {
    pub fn new(tokenizer: Arc<dyn Tokenizer>, filter: Arc<TokenFilter>) -> Self {
        Self { tokenizer, filter }
    }

    /// Valid tokens of one text. Line breaks and tabs are treated as spaces;
    /// blank text yields no tokens.
    pub fn segment(&self, text: &str) -> Vec<String> {
        let clean = text.replace(['\n', '\r', '\t'], " ");
        let clean = clean.trim();
        if clean.is_empty() {
            return Vec::new();
        }

        self.tokenizer
            .cut(clean)
            .into_iter()
            .filter(|token| self.filter.is_valid(token))
            .map(str::to_string)
            .collect()
    }

    /// Index the whole corpus. Deterministic for a deterministic tokenizer.
    pub fn build(&self, corpus: &[CommentThread]) -> AnalysisSnapshot {
        let start = Instant::now();
        let documents = flatten_documents(corpus);

        let mut snapshot = AnalysisSnapshot {
            thread_count: corpus.len(),
            document_count: documents.len(),
            ..Default::default()
        };

        for doc in &documents {
            for token in self.segment(&doc.text) {
                snapshot.record(&token, doc.id, doc.parent_id);
            }
        }
        snapshot.documents = documents;

        debug!(
            "Indexed {} documents ({} threads): {} distinct words in {}ms",
            snapshot.document_count,
            snapshot.thread_count,
            snapshot.vocabulary_size(),
            start.elapsed().as_millis()
        );

        snapshot
    }

    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }
}

/// One-shot indexing without keeping an indexer around
pub fn build_index(
    corpus: &[CommentThread],
    tokenizer: Arc<dyn Tokenizer>,
    stopwords: Stopwords,
) -> Result<AnalysisSnapshot> {
    let filter = TokenFilter::new(stopwords)?;
    Ok(CorpusIndexer::new(tokenizer, Arc::new(filter)).build(corpus))
}

#[cfg(test)]
mod tests {
    use super::*;
    use commentlens_core::SegmenterTokenizer;

    fn indexer() -> CorpusIndexer {
        let filter = TokenFilter::new(Stopwords::from_words(["the"])).unwrap();
        CorpusIndexer::new(Arc::new(SegmenterTokenizer::new()), Arc::new(filter))
    }

    fn corpus() -> Vec<CommentThread> {
        vec![
            CommentThread::new("1", "great video great edit")
                .with_reply("11", "great\tpoint")
                .with_reply("12", "the edit"),
            CommentThread::new("2", "edit 123 !!"),
            CommentThread::new("3", ""),
        ]
    }

    #[test]
    fn test_frequencies_count_duplicates() {
        let snapshot = indexer().build(&corpus());

        assert_eq!(snapshot.frequency("great"), 3);
        assert_eq!(snapshot.frequency("edit"), 3);
        assert_eq!(snapshot.frequency("video"), 1);
        assert_eq!(snapshot.frequency("the"), 0);
        assert_eq!(snapshot.frequency("123"), 0);
        assert_eq!(snapshot.total_tokens(), 8);
    }

    #[test]
    fn test_document_and_thread_granularity() {
        let snapshot = indexer().build(&corpus());

        // documents: 0 = thread 0, 1-2 = its replies, 3 = thread 1, 4 = thread 2
        let docs: Vec<_> = snapshot.documents_for("edit").unwrap().iter().copied().collect();
        assert_eq!(docs, vec![0, 2, 3]);

        let threads: Vec<_> = snapshot.threads_for("edit").unwrap().iter().copied().collect();
        assert_eq!(threads, vec![0, 1]);

        let threads: Vec<_> = snapshot.threads_for("great").unwrap().iter().copied().collect();
        assert_eq!(threads, vec![0]);
    }

    #[test]
    fn test_staleness() {
        let mut corpus = corpus();
        let snapshot = indexer().build(&corpus);
        assert!(snapshot.is_current(&corpus));
        assert_eq!(snapshot.thread_count, 3);
        assert_eq!(snapshot.document_count, 5);
        assert_eq!(snapshot.reply_count(), 2);

        corpus[1] = corpus[1].clone().with_reply("21", "late reply");
        assert!(!snapshot.is_current(&corpus));

        corpus.pop();
        corpus.pop();
        assert!(!snapshot.is_current(&corpus));
    }

    #[test]
    fn test_thread_text_lookup() {
        let snapshot = indexer().build(&corpus());

        assert_eq!(snapshot.thread_text(0), Some("great video great edit"));
        assert_eq!(snapshot.thread_text(1), Some("edit 123 !!"));
        assert_eq!(snapshot.thread_text(2), Some(""));
        assert_eq!(snapshot.thread_text(3), None);
    }

    #[test]
    fn test_build_index_matches_indexer() {
        let one_shot = build_index(&corpus(), Arc::new(SegmenterTokenizer::new()), Stopwords::from_words(["the"])).unwrap();
        assert_eq!(one_shot, indexer().build(&corpus()));
    }

    #[test]
    fn test_blank_text_yields_nothing() {
        let indexer = indexer();
        assert!(indexer.segment("").is_empty());
        assert!(indexer.segment(" \n\t ").is_empty());
    }

    #[test]
    fn test_snapshot_persists_as_pair_lists() {
        let snapshot = indexer().build(&corpus());

        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json["word_frequencies"].is_array());
        assert!(json["word_threads"].is_array());

        let back: AnalysisSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }
}
