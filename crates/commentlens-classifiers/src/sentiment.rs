//! Lexicon sentiment scorer
//!
//! Rule-based per-document scoring: a token pass with negation and degree
//! modifiers, a flat emoji pass, punctuation heuristics and a laughter bonus.

use crate::classifier::SentimentScorer;
use crate::lexicon::{Lexicon, TokenRole, EMOJI_NEGATIVE, EMOJI_POSITIVE};
use aho_corasick::AhoCorasick;
use commentlens_core::{Error, Result, SentimentLabel, Tokenizer};
use regex::Regex;
use std::sync::Arc;

const EMOJI_WEIGHT: f64 = 0.8;
const LAUGH_BONUS: f64 = 1.0;
const QUESTION_PENALTY: f64 = 0.3;

pub struct LexiconScorer {
    name: String,
    lexicon: Arc<Lexicon>,
    tokenizer: Arc<dyn Tokenizer>,
    emoji: AhoCorasick,
    positive_emoji: usize,
    laugh: Regex,
}

impl LexiconScorer {
    pub fn new(lexicon: Arc<Lexicon>, tokenizer: Arc<dyn Tokenizer>) -> Result<Self> {
        Self::with_name("lexicon", lexicon, tokenizer)
    }

    pub fn with_name(
        name: impl Into<String>,
        lexicon: Arc<Lexicon>,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Result<Self> {
        // positive patterns first, so a match id below `positive_emoji` is positive
        let emoji = AhoCorasick::new(EMOJI_POSITIVE.iter().chain(EMOJI_NEGATIVE.iter()))
            .map_err(|e| Error::classifier(format!("Failed to build emoji matcher: {e}")))?;

        let laugh = Regex::new(r"(?i)哈{3,}|2+3{2,}|xswl|笑死")
            .map_err(|e| Error::classifier(format!("Failed to build laughter pattern: {e}")))?;

        Ok(Self {
            name: name.into(),
            lexicon,
            tokenizer,
            emoji,
            positive_emoji: EMOJI_POSITIVE.len(),
            laugh,
        })
    }

    /// Raw score before thresholding
    pub fn raw_score(&self, text: &str) -> f64 {
        if text.is_empty() {
            return 0.0;
        }

        let mut score = self.token_score(text) + self.emoji_score(text);

        let exclamations = count_any(text, &['!', '！']);
        if exclamations >= 2 && score != 0.0 {
            score *= 1.0 + exclamations.min(4) as f64 * 0.15;
        }

        let questions = count_any(text, &['?', '？']);
        if questions >= 2 && score.abs() < QUESTION_PENALTY {
            score -= QUESTION_PENALTY;
        }

        if self.laugh.is_match(text) {
            score += LAUGH_BONUS;
        }

        score
    }

    fn token_score(&self, text: &str) -> f64 {
        let mut score = 0.0;
        let mut negated = false;
        let mut degree = 1.0;

        for token in self.tokenizer.cut(text) {
            match self.lexicon.role(token) {
                TokenRole::Negation => negated = true,
                TokenRole::Degree(multiplier) => degree = multiplier,
                TokenRole::Sentiment(weight) => {
                    let signed = if negated { -weight } else { weight };
                    score += signed * degree;
                    negated = false;
                    degree = 1.0;
                }
                TokenRole::Plain => {
                    negated = false;
                    degree = 1.0;
                }
            }
        }

        score
    }

    fn emoji_score(&self, text: &str) -> f64 {
        self.emoji
            .find_iter(text)
            .map(|m| {
                if m.pattern().as_usize() < self.positive_emoji {
                    EMOJI_WEIGHT
                } else {
                    -EMOJI_WEIGHT
                }
            })
            .sum()
    }
}

impl SentimentScorer for LexiconScorer {
    fn score(&self, text: &str) -> SentimentLabel {
        SentimentLabel::from_score(self.raw_score(text))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn count_any(text: &str, chars: &[char]) -> usize {
    text.chars().filter(|c| chars.contains(c)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use commentlens_core::{Polarity, SegmenterTokenizer};

    /// Whitespace splitting, so modifier sequences are spelled out exactly
    struct SpacedTokenizer;

    impl Tokenizer for SpacedTokenizer {
        fn cut<'a>(&self, text: &'a str) -> Vec<&'a str> {
            text.split_whitespace().collect()
        }

        fn name(&self) -> &str {
            "spaced"
        }
    }

    fn scorer() -> LexiconScorer {
        LexiconScorer::new(Arc::new(Lexicon::bundled().unwrap()), Arc::new(SpacedTokenizer)).unwrap()
    }

    #[test]
    fn test_amplified_positive() {
        let result = scorer().score("这个 视频 很 好看 ！");
        assert_eq!(result.label, Polarity::Positive);
        assert!(result.score > 0.3);
    }

    #[test]
    fn test_negated_positive() {
        let result = scorer().score("一点 都 不 好");
        assert_eq!(result.label, Polarity::Negative);
    }

    #[test]
    fn test_no_sentiment_terms() {
        let scorer = scorer();
        for text in ["的了。。。", "", "，，、"] {
            let result = scorer.score(text);
            assert_eq!(result.label, Polarity::Neutral);
            assert_eq!(result.score, 0.0);
        }
    }

    #[test]
    fn test_laughter_alone_is_positive() {
        let scorer = scorer();
        for text in ["哈哈哈哈哈", "233333", "笑死"] {
            let result = scorer.score(text);
            assert_eq!(result.label, Polarity::Positive, "{text}");
        }
        assert_eq!(scorer.raw_score("哈哈哈哈哈"), 1.0);
    }

    #[test]
    fn test_modifiers_apply_to_next_sentiment_token_only() {
        let scorer = scorer();

        // 很 doubles 好, then the state resets before 差
        assert_eq!(scorer.raw_score("很 好 差"), 2.0 - 1.0);
        // an intervening plain token clears pending modifiers
        assert_eq!(scorer.raw_score("不 桌 好"), 1.0);
        // negation and degree combine on the same token
        assert_eq!(scorer.raw_score("不 很 好"), -2.0);
    }

    #[test]
    fn test_emoji_bypass_modifiers() {
        let scorer = scorer();
        assert_eq!(scorer.raw_score("👍"), 0.8);
        assert_eq!(scorer.raw_score("不👎"), -0.8);
        assert_eq!(scorer.raw_score("❤️❤️"), 1.6);
    }

    #[test]
    fn test_punctuation_heuristics() {
        let scorer = scorer();

        let boosted = scorer.raw_score("好 ！！！");
        assert!((boosted - 1.45).abs() < 1e-9);
        // clamped at four marks
        let clamped = scorer.raw_score("好 !!!!!!");
        assert!((clamped - 1.6).abs() < 1e-9);
        // no boost without a score
        assert_eq!(scorer.raw_score("！！"), 0.0);

        let doubtful = scorer.score("真的吗？？");
        assert_eq!(doubtful.label, Polarity::Neutral);
        assert!((doubtful.score + 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_segmenter_scores_chinese_words() {
        let scorer = LexiconScorer::new(Arc::new(Lexicon::bundled().unwrap()), Arc::new(SegmenterTokenizer::new())).unwrap();

        assert_eq!(scorer.score("这个视频很好看！").label, Polarity::Positive);
        assert_eq!(scorer.score("垃圾视频").label, Polarity::Negative);
    }

    #[cfg(feature = "jieba")]
    #[test]
    fn test_jieba_segmentation() {
        let scorer = LexiconScorer::new(
            Arc::new(Lexicon::bundled().unwrap()),
            Arc::new(commentlens_core::JiebaTokenizer::new()),
        )
        .unwrap();

        assert_eq!(scorer.score("这个视频很好看！").label, Polarity::Positive);
        assert_eq!(scorer.score("垃圾视频").label, Polarity::Negative);
    }
}
