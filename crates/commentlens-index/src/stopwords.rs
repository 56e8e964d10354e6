//! Stopword table and token validity filter

use commentlens_core::{Error, Result};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

const DEFAULT_STOPWORDS: &str = include_str!("../data/stopwords.txt");

/// Parse a word list: either a JSON array of strings or one word per line.
/// Blank lines and lines starting with `#` are ignored.
pub fn parse_word_list(content: &str) -> Result<HashSet<String>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        let words: Vec<String> = serde_json::from_str(trimmed)?;
        return Ok(words.into_iter().filter(|w| !w.is_empty()).collect());
    }

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Read a word list file (see [`parse_word_list`])
pub fn read_word_list(path: &Path) -> Result<HashSet<String>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::config(format!("cannot read word list {}: {e}", path.display())))?;
    parse_word_list(&content)
}

/// Words excluded from indexing
#[derive(Debug, Clone)]
pub struct Stopwords {
    words: HashSet<String>,
}

impl Stopwords {
    /// The bundled stopword table
    pub fn bundled() -> Self {
        let words = DEFAULT_STOPWORDS
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self { words }
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    /// Load from a file, replacing the bundled table
    pub fn from_file(path: &Path) -> Result<Self> {
        let words = read_word_list(path)?;
        info!("Loaded {} stopwords from {:?}", words.len(), path);
        Ok(Self { words })
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Default for Stopwords {
    fn default() -> Self {
        Self::bundled()
    }
}

/// Decides which tokens are indexed.
///
/// A token is valid iff it has at least two characters, is not made only of
/// whitespace/punctuation/symbols/control characters, is not all ASCII
/// digits, and is not a stopword.
#[derive(Debug, Clone)]
pub struct TokenFilter {
    stopwords: Stopwords,
    punctuation: Regex,
    digits: Regex,
}

impl TokenFilter {
    pub fn new(stopwords: Stopwords) -> Result<Self> {
        let punctuation = Regex::new(r"^[\s\p{P}\p{S}\p{Z}\p{C}]+$")
            .map_err(|e| Error::internal(format!("Failed to build punctuation filter: {e}")))?;
        let digits = Regex::new(r"^[0-9]+$")
            .map_err(|e| Error::internal(format!("Failed to build digit filter: {e}")))?;

        Ok(Self {
            stopwords,
            punctuation,
            digits,
        })
    }

    pub fn is_valid(&self, token: &str) -> bool {
        token.chars().count() >= 2
            && !self.punctuation.is_match(token)
            && !self.digits.is_match(token)
            && !self.stopwords.contains(token)
    }

    pub fn stopwords(&self) -> &Stopwords {
        &self.stopwords
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> TokenFilter {
        TokenFilter::new(Stopwords::from_words(["我们", "the"])).unwrap()
    }

    #[test]
    fn test_token_validity() {
        let filter = filter();

        assert!(filter.is_valid("好看"));
        assert!(filter.is_valid("up2"));
        assert!(!filter.is_valid("好"));
        assert!(!filter.is_valid("！！"));
        assert!(!filter.is_valid("……"));
        assert!(!filter.is_valid("2333"));
        assert!(!filter.is_valid("我们"));
        assert!(!filter.is_valid("the"));
        assert!(!filter.is_valid(""));
    }

    #[test]
    fn test_parse_word_list_formats() {
        let json = parse_word_list(r#"["好看", "", "厉害"]"#).unwrap();
        assert_eq!(json.len(), 2);

        let lines = parse_word_list("# comment\n好看\n\n 厉害 \n").unwrap();
        assert!(lines.contains("厉害"));
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_bundled_table_loaded() {
        let stopwords = Stopwords::bundled();
        assert!(stopwords.contains("我们"));
        assert!(!stopwords.contains("好看"));
    }
}
