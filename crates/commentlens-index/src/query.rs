//! Read-side queries over a snapshot and its corpus

use crate::indexer::AnalysisSnapshot;
use commentlens_core::{CommentThread, Error, Result};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::HashSet;

/// A word and its occurrence count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

/// Most frequent words with at least `min_freq` occurrences, skipping
/// `excluded`. Ties are broken alphabetically so output is stable.
pub fn top_words(
    snapshot: &AnalysisSnapshot,
    n: usize,
    min_freq: usize,
    excluded: &HashSet<String>,
) -> Vec<WordCount> {
    let mut words: Vec<WordCount> = snapshot
        .word_frequencies()
        .iter()
        .filter(|(word, count)| **count >= min_freq && !excluded.contains(*word))
        .map(|(word, count)| WordCount {
            word: word.clone(),
            count: *count,
        })
        .collect();

    words.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
    words.truncate(n);
    words
}

/// Keyword matcher for comment search
#[derive(Debug, Clone)]
pub enum KeywordMatcher {
    /// Case-insensitive substring
    Substring(String),
    /// Case-insensitive regular expression
    Pattern(Regex),
}

impl KeywordMatcher {
    /// Build a matcher; `None` for a blank keyword
    pub fn new(keyword: &str, use_regex: bool) -> Result<Option<Self>> {
        if keyword.is_empty() {
            return Ok(None);
        }

        if use_regex {
            let regex = RegexBuilder::new(keyword)
                .case_insensitive(true)
                .build()
                .map_err(|e| Error::config(format!("invalid search pattern: {e}")))?;
            Ok(Some(Self::Pattern(regex)))
        } else {
            Ok(Some(Self::Substring(keyword.to_lowercase())))
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Substring(needle) => text.to_lowercase().contains(needle.as_str()),
            Self::Pattern(regex) => regex.is_match(text),
        }
    }

    fn matches_any(&self, text: &str, author: Option<&str>) -> bool {
        self.is_match(text) || author.is_some_and(|name| self.is_match(name))
    }
}

/// A thread matched by a keyword search
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    /// Thread index in the corpus
    pub thread: usize,

    /// Whether the top-level comment itself matched
    pub comment_matched: bool,

    /// Indices of matching replies
    pub matched_replies: Vec<usize>,
}

/// Threads whose top-level comment or any reply matches by text or author
pub fn search(corpus: &[CommentThread], matcher: &KeywordMatcher) -> Vec<SearchHit> {
    corpus
        .iter()
        .enumerate()
        .filter_map(|(thread_idx, thread)| {
            let comment_matched = matcher.matches_any(&thread.text, thread.uname.as_deref());
            let matched_replies: Vec<usize> = thread
                .replies
                .iter()
                .enumerate()
                .filter(|(_, reply)| matcher.matches_any(&reply.text, reply.uname.as_deref()))
                .map(|(idx, _)| idx)
                .collect();

            (comment_matched || !matched_replies.is_empty()).then_some(SearchHit {
                thread: thread_idx,
                comment_matched,
                matched_replies,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::CorpusIndexer;
    use crate::stopwords::{Stopwords, TokenFilter};
    use commentlens_core::SegmenterTokenizer;
    use std::sync::Arc;

    fn snapshot() -> AnalysisSnapshot {
        let filter = TokenFilter::new(Stopwords::from_words(Vec::<String>::new())).unwrap();
        let indexer = CorpusIndexer::new(Arc::new(SegmenterTokenizer::new()), Arc::new(filter));
        indexer.build(&[
            CommentThread::new("1", "alpha beta beta gamma"),
            CommentThread::new("2", "beta gamma delta").with_reply("21", "alpha gamma"),
        ])
    }

    #[test]
    fn test_top_words_ranking() {
        let words = top_words(&snapshot(), 10, 2, &HashSet::new());
        let ranked: Vec<_> = words.iter().map(|w| (w.word.as_str(), w.count)).collect();

        assert_eq!(ranked, vec![("beta", 3), ("gamma", 3), ("alpha", 2)]);
    }

    #[test]
    fn test_top_words_exclusion_and_limit() {
        let excluded = HashSet::from(["beta".to_string()]);
        let words = top_words(&snapshot(), 1, 1, &excluded);

        assert_eq!(words.len(), 1);
        assert_eq!(words[0].word, "gamma");
    }

    #[test]
    fn test_search_matches_replies_and_authors() {
        let corpus = vec![
            CommentThread::new("1", "First Post").with_author("Alice"),
            CommentThread::new("2", "nothing here").with_reply("21", "a FIRST reply"),
            CommentThread::new("3", "unrelated"),
        ];

        let matcher = KeywordMatcher::new("first", false).unwrap().unwrap();
        let hits = search(&corpus, &matcher);
        assert_eq!(hits.len(), 2);
        assert!(hits[0].comment_matched);
        assert_eq!(hits[1].thread, 1);
        assert!(!hits[1].comment_matched);
        assert_eq!(hits[1].matched_replies, vec![0]);

        let by_author = KeywordMatcher::new("^ali", true).unwrap().unwrap();
        assert_eq!(search(&corpus, &by_author)[0].thread, 0);
    }

    #[test]
    fn test_matcher_edge_cases() {
        assert!(KeywordMatcher::new("", false).unwrap().is_none());
        assert!(KeywordMatcher::new("(unclosed", true).is_err());
    }
}
