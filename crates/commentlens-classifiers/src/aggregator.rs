//! Per-word sentiment aggregation
//!
//! In lexicon mode a word's distribution is computed over the threads it
//! occurs in, scoring each thread's top-level comment on demand. In AI mode
//! it is computed over every document it occurs in (replies included) using
//! the precomputed cache, with unlabelled documents counted as neutral.

use crate::classifier::SentimentScorer;
use commentlens_core::{CommentThread, Polarity, SentimentCache, SentimentDistribution, SentimentMode};
use commentlens_index::{top_words, AnalysisSnapshot, WordCount};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// A top word with its sentiment distribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordSentiment {
    pub word: String,
    pub count: usize,
    pub distribution: SentimentDistribution,
}

/// Comments of one thread that contain a word
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadMatch {
    /// Thread index in the corpus
    pub thread: usize,

    /// Whether the top-level comment is included
    pub comment: bool,

    /// Indices of included replies
    pub replies: Vec<usize>,
}

/// Read-only view combining a corpus, its snapshot and the sentiment sources
pub struct SentimentAggregator<'a> {
    corpus: &'a [CommentThread],
    snapshot: &'a AnalysisSnapshot,
    scorer: &'a dyn SentimentScorer,
    cache: &'a SentimentCache,
    mode: SentimentMode,
}

impl<'a> SentimentAggregator<'a> {
    pub fn new(
        corpus: &'a [CommentThread],
        snapshot: &'a AnalysisSnapshot,
        scorer: &'a dyn SentimentScorer,
        cache: &'a SentimentCache,
        mode: SentimentMode,
    ) -> Self {
        Self {
            corpus,
            snapshot,
            scorer,
            cache,
            mode,
        }
    }

    pub fn mode(&self) -> SentimentMode {
        self.mode
    }

    pub fn top_words(&self, n: usize, min_freq: usize, excluded: &HashSet<String>) -> Vec<WordCount> {
        top_words(self.snapshot, n, min_freq, excluded)
    }

    /// Sentiment distribution of one word under the current mode
    pub fn distribution(&self, word: &str) -> SentimentDistribution {
        self.distribution_memo(word, &mut HashMap::new())
    }

    /// Distributions for a word list. Thread scores are shared across words
    /// within the call.
    pub fn distributions(&self, words: &[WordCount]) -> Vec<WordSentiment> {
        let mut memo = HashMap::new();
        words
            .iter()
            .map(|wc| WordSentiment {
                word: wc.word.clone(),
                count: wc.count,
                distribution: self.distribution_memo(&wc.word, &mut memo),
            })
            .collect()
    }

    fn distribution_memo(&self, word: &str, memo: &mut HashMap<usize, Polarity>) -> SentimentDistribution {
        let mut dist = SentimentDistribution::default();

        match self.mode {
            SentimentMode::Lexicon => {
                for &thread in self.snapshot.threads_for(word).into_iter().flatten() {
                    let Some(comment) = self.corpus.get(thread) else {
                        continue;
                    };
                    let polarity = *memo
                        .entry(thread)
                        .or_insert_with(|| self.scorer.score(&comment.text).label);
                    dist.record(polarity);
                }
            }
            SentimentMode::Ai => {
                for &doc in self.snapshot.documents_for(word).into_iter().flatten() {
                    dist.record(self.cache.polarity_or_neutral(doc));
                }
            }
        }

        dist
    }

    /// Comments containing `word`, optionally restricted to one polarity,
    /// grouped by thread in corpus order
    pub fn documents_for_word(&self, word: &str, filter: Option<Polarity>) -> Vec<ThreadMatch> {
        match (self.mode, filter) {
            (SentimentMode::Ai, Some(polarity)) => self.documents_by_cache(word, polarity),
            _ => self.documents_by_thread(word, filter),
        }
    }

    fn documents_by_cache(&self, word: &str, polarity: Polarity) -> Vec<ThreadMatch> {
        let mut matches: Vec<ThreadMatch> = Vec::new();

        for &id in self.snapshot.documents_for(word).into_iter().flatten() {
            if self.cache.polarity_or_neutral(id) != polarity {
                continue;
            }
            let Some(doc) = self.snapshot.document(id) else {
                continue;
            };

            // ids ascend, so documents of one thread are contiguous
            if matches.last().map_or(true, |last| last.thread != doc.parent_id) {
                matches.push(ThreadMatch {
                    thread: doc.parent_id,
                    comment: false,
                    replies: Vec::new(),
                });
            }
            if let Some(group) = matches.last_mut() {
                match doc.reply_index {
                    Some(reply) => group.replies.push(reply),
                    None => group.comment = true,
                }
            }
        }

        matches
    }

    fn documents_by_thread(&self, word: &str, filter: Option<Polarity>) -> Vec<ThreadMatch> {
        let accepts = |text: &str| -> bool {
            text.contains(word) && filter.map_or(true, |p| self.scorer.score(text).label == p)
        };

        self.snapshot
            .threads_for(word)
            .into_iter()
            .flatten()
            .filter_map(|&thread| {
                let comment = self.corpus.get(thread)?;
                let replies: Vec<usize> = comment
                    .replies
                    .iter()
                    .enumerate()
                    .filter(|(_, reply)| accepts(&reply.text))
                    .map(|(idx, _)| idx)
                    .collect();
                let comment = accepts(&comment.text);

                (comment || !replies.is_empty()).then_some(ThreadMatch {
                    thread,
                    comment,
                    replies,
                })
            })
            .collect()
    }

    /// Distribution over every document in the corpus
    pub fn overall(&self) -> SentimentDistribution {
        let mut dist = SentimentDistribution::default();
        for doc in self.snapshot.documents() {
            let polarity = match self.mode {
                SentimentMode::Lexicon => self.scorer.score(&doc.text).label,
                SentimentMode::Ai => self.cache.polarity_or_neutral(doc.id),
            };
            dist.record(polarity);
        }
        dist
    }
}
