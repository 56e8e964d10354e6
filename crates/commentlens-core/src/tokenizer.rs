//! Tokenizer adapter
//!
//! A single `cut` contract over two interchangeable backends:
//! - [`JiebaTokenizer`]: dictionary-based Chinese segmentation (primary)
//! - [`SegmenterTokenizer`]: ICU dictionary word segmentation (fallback)
//!
//! The backend is chosen once at startup by [`select_tokenizer`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use icu_segmenter::WordSegmenter;
use tracing::{info, warn};

/// Splits text into word-like units
pub trait Tokenizer: Send + Sync {
    /// Cut text into tokens borrowed from the input
    fn cut<'a>(&self, text: &'a str) -> Vec<&'a str>;

    /// Backend name
    fn name(&self) -> &str;
}

/// Which backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerKind {
    /// Primary backend when compiled in, fallback otherwise
    #[default]
    Auto,
    Jieba,
    Segmenter,
}

/// Tokenizer configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TokenizerConfig {
    #[serde(default)]
    pub kind: TokenizerKind,

    /// User dictionary for the primary backend (`word [freq [tag]]` per line)
    #[serde(default)]
    pub custom_dict: Option<PathBuf>,
}

/// Dictionary-based segmenter
#[cfg(feature = "jieba")]
pub struct JiebaTokenizer {
    inner: jieba_rs::Jieba,
}

#[cfg(feature = "jieba")]
impl JiebaTokenizer {
    /// Create with the bundled dictionary
    pub fn new() -> Self {
        Self {
            inner: jieba_rs::Jieba::new(),
        }
    }

    /// Add custom words from a reader, one `word [freq [tag]]` entry per line.
    /// Returns the number of words added.
    pub fn load_custom_dict<R: BufRead>(&mut self, reader: R) -> Result<usize> {
        let mut count = 0;
        for line in reader.lines() {
            let line = line?;
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else {
                continue;
            };
            let freq = parts.next().and_then(|f| f.parse::<usize>().ok());
            let tag = parts.next();
            self.inner.add_word(word, freq, tag);
            count += 1;
        }
        Ok(count)
    }

    /// Add a single custom word
    pub fn add_word(&mut self, word: &str, freq: Option<usize>, tag: Option<&str>) {
        self.inner.add_word(word, freq, tag);
    }
}

#[cfg(feature = "jieba")]
impl Default for JiebaTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "jieba")]
impl Tokenizer for JiebaTokenizer {
    fn cut<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.inner.cut(text, true)
    }

    fn name(&self) -> &str {
        "jieba"
    }
}

/// ICU word segmenter. Chinese and Japanese runs are split against the
/// bundled ICU dictionary; only word-like segments are kept, so whitespace
/// and punctuation never appear as tokens.
pub struct SegmenterTokenizer {
    inner: WordSegmenter,
}

impl SegmenterTokenizer {
    pub fn new() -> Self {
        Self {
            inner: WordSegmenter::new_dictionary(),
        }
    }
}

impl Default for SegmenterTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer for SegmenterTokenizer {
    fn cut<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut breaks = self.inner.segment_str(text);
        let mut tokens = Vec::new();
        let mut start = 0;
        while let Some(end) = breaks.next() {
            if end > start && breaks.is_word_like() {
                tokens.push(&text[start..end]);
            }
            start = end;
        }
        tokens
    }

    fn name(&self) -> &str {
        "segmenter"
    }
}

/// Pick the tokenizer backend once. Failures of the primary backend are
/// logged and recovered by falling back to the segmenter.
pub fn select_tokenizer(config: &TokenizerConfig) -> Arc<dyn Tokenizer> {
    let selected = match config.kind {
        TokenizerKind::Segmenter => Ok(Arc::new(SegmenterTokenizer::new()) as Arc<dyn Tokenizer>),
        TokenizerKind::Auto | TokenizerKind::Jieba => primary_tokenizer(config),
    };

    match selected {
        Ok(tokenizer) => {
            info!("Using {} tokenizer", tokenizer.name());
            tokenizer
        }
        Err(e) => {
            warn!("Primary tokenizer unavailable, falling back to segmenter: {}", e);
            Arc::new(SegmenterTokenizer::new())
        }
    }
}

#[cfg(feature = "jieba")]
fn primary_tokenizer(config: &TokenizerConfig) -> Result<Arc<dyn Tokenizer>> {
    let mut tokenizer = JiebaTokenizer::new();

    if let Some(path) = &config.custom_dict {
        let file = std::fs::File::open(path).map_err(|e| {
            Error::tokenizer(format!("cannot open custom dictionary {}: {e}", path.display()))
        })?;
        let added = tokenizer.load_custom_dict(std::io::BufReader::new(file))?;
        info!("Loaded {} custom dictionary words from {:?}", added, path);
    }

    Ok(Arc::new(tokenizer))
}

#[cfg(not(feature = "jieba"))]
fn primary_tokenizer(_config: &TokenizerConfig) -> Result<Arc<dyn Tokenizer>> {
    Err(Error::tokenizer("jieba backend not compiled in"))
}
