//! commentlens Index
//!
//! Turns a comment corpus into a searchable word-frequency index.
//!
//! - [`stopwords`]: stopword table and the token validity filter
//! - [`indexer`]: corpus flattening and the [`AnalysisSnapshot`]
//! - [`query`]: top-word ranking and keyword search

pub mod indexer;
pub mod query;
pub mod stopwords;

pub use indexer::{build_index, AnalysisSnapshot, CorpusIndexer};
pub use query::{search, top_words, KeywordMatcher, SearchHit, WordCount};
pub use stopwords::{parse_word_list, read_word_list, Stopwords, TokenFilter};
