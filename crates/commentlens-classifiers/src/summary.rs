//! Comment-section summary
//!
//! One remote call over a statistics line, the top words and a sample of
//! comments mixing the most-liked top-level comments with random documents.

use crate::client::{ChatClient, ChatRequest};
use commentlens_core::{
    retry_with_timeout, CommentThread, Error, Polarity, Result, RetryPolicy, SentimentDistribution, SentimentMode,
};
use commentlens_index::{AnalysisSnapshot, WordCount};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const DEFAULT_SYSTEM_PROMPT: &str = "You analyse the sentiment of a video's comment section. \
From the comment sample, the sentiment statistics and the frequent words, write a concise summary \
(at most 150 words). Open with one sentence on the overall tone, then name the two or three main \
topics, and explain any clear positive or negative lean. Output only the summary.";

/// Summary generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub model: String,

    /// Upper bound for the single call, in milliseconds
    pub timeout_ms: u64,

    /// Maximum number of sampled comments
    pub sample_size: usize,

    /// Characters kept from each sampled comment
    pub sample_chars: usize,

    /// Share of the sample reserved for the most-liked comments
    pub liked_share: f64,

    /// Frequent words listed in the prompt
    pub top_words: usize,

    pub temperature: f32,

    pub max_tokens: u32,

    pub system_prompt: String,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            model: crate::batch::DEFAULT_MODEL.to_string(),
            timeout_ms: 45_000,
            sample_size: 120,
            sample_chars: 120,
            liked_share: 0.4,
            top_words: 15,
            temperature: 0.3,
            max_tokens: 500,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Everything the summary prompt is built from
pub struct SummaryInput<'a> {
    pub corpus: &'a [CommentThread],
    pub snapshot: &'a AnalysisSnapshot,
    pub distribution: SentimentDistribution,
    pub top_words: &'a [WordCount],
    pub mode: SentimentMode,
}

/// A generated summary with the statistics it was based on
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub text: String,
    pub distribution: SentimentDistribution,
    pub mode: SentimentMode,
    pub sampled: usize,
}

pub struct SummaryGenerator {
    client: Arc<dyn ChatClient>,
    config: SummaryConfig,
}

impl SummaryGenerator {
    pub fn new(client: Arc<dyn ChatClient>, config: SummaryConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &SummaryConfig {
        &self.config
    }

    /// Build the prompt and make the call. Not retried.
    pub async fn generate<R: Rng + ?Sized>(&self, input: &SummaryInput<'_>, rng: &mut R) -> Result<Summary> {
        if input.snapshot.documents().is_empty() {
            return Err(Error::classifier("nothing to summarize: the corpus is empty"));
        }

        let samples = sample_texts(input.corpus, input.snapshot, &self.config, rng);
        let numbered: Vec<String> = samples
            .iter()
            .enumerate()
            .map(|(i, text)| format!("{}. {}", i + 1, text))
            .collect();

        let user = format!(
            "{}\n{}\n\nComment sample:\n{}",
            stats_line(&input.distribution),
            top_words_line(input.top_words, self.config.top_words),
            numbered.join("\n")
        );
        let request = ChatRequest::new(
            &self.config.model,
            &self.config.system_prompt,
            user,
            self.config.temperature,
            self.config.max_tokens,
        );

        info!(
            "Requesting summary of {} documents ({} sampled, {} mode)",
            input.distribution.total(),
            samples.len(),
            input.mode
        );

        let policy = RetryPolicy::no_retry(Duration::from_millis(self.config.timeout_ms));
        let client = &self.client;
        let request = &request;
        let text = retry_with_timeout(&policy, "summary", || async move { client.complete(request).await }).await?;

        Ok(Summary {
            text,
            distribution: input.distribution,
            mode: input.mode,
            sampled: samples.len(),
        })
    }
}

/// Totals and percentages, e.g.
/// `120 comments: 60 positive (50.0%), 40 neutral (33.3%), 20 negative (16.7%).`
pub fn stats_line(dist: &SentimentDistribution) -> String {
    format!(
        "{} comments: {} positive ({:.1}%), {} neutral ({:.1}%), {} negative ({:.1}%).",
        dist.total(),
        dist.positive,
        dist.percent(Polarity::Positive),
        dist.neutral,
        dist.percent(Polarity::Neutral),
        dist.negative,
        dist.percent(Polarity::Negative)
    )
}

fn top_words_line(words: &[WordCount], limit: usize) -> String {
    let listed: Vec<String> = words
        .iter()
        .take(limit)
        .map(|wc| format!("{}({})", wc.word, wc.count))
        .collect();
    format!("Frequent words: {}", listed.join(", "))
}

fn clip(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn is_substantial(text: &str) -> bool {
    text.chars().count() > 2
}

/// Pick comment texts for the prompt.
///
/// A corpus within the sample size is used whole. Otherwise the liked share
/// of the quota goes to the most-liked top-level comments, and the rest is
/// drawn uniformly from the unused documents. Very short texts are skipped
/// in both passes.
pub fn sample_texts<R: Rng + ?Sized>(
    corpus: &[CommentThread],
    snapshot: &AnalysisSnapshot,
    config: &SummaryConfig,
    rng: &mut R,
) -> Vec<String> {
    let documents = snapshot.documents();
    let quota = config.sample_size;

    if documents.len() <= quota {
        return documents.iter().map(|d| clip(&d.text, config.sample_chars)).collect();
    }

    let mut used = HashSet::new();
    let mut samples = Vec::with_capacity(quota);

    let mut liked: Vec<_> = documents
        .iter()
        .filter(|d| !d.is_reply && is_substantial(&d.text))
        .map(|d| (corpus.get(d.parent_id).map_or(0, |t| t.like), d))
        .collect();
    // stable, so equal like counts keep corpus order
    liked.sort_by(|a, b| b.0.cmp(&a.0));

    let liked_quota = (quota as f64 * config.liked_share.clamp(0.0, 1.0)).floor() as usize;
    for (_, doc) in liked.into_iter().take(liked_quota) {
        used.insert(doc.id);
        samples.push(clip(&doc.text, config.sample_chars));
    }

    let mut available: Vec<_> = documents
        .iter()
        .filter(|d| !used.contains(&d.id) && is_substantial(&d.text))
        .collect();
    available.shuffle(rng);

    let remaining = quota.saturating_sub(samples.len());
    samples.extend(
        available
            .into_iter()
            .take(remaining)
            .map(|d| clip(&d.text, config.sample_chars)),
    );

    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use commentlens_core::SegmenterTokenizer;
    use commentlens_index::{CorpusIndexer, Stopwords, TokenFilter};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn snapshot(corpus: &[CommentThread]) -> AnalysisSnapshot {
        let filter = TokenFilter::new(Stopwords::from_words(Vec::<String>::new())).unwrap();
        CorpusIndexer::new(Arc::new(SegmenterTokenizer::new()), Arc::new(filter)).build(corpus)
    }

    fn small_config() -> SummaryConfig {
        SummaryConfig {
            sample_size: 5,
            sample_chars: 6,
            ..Default::default()
        }
    }

    #[test]
    fn test_small_corpus_is_used_whole() {
        let corpus = vec![CommentThread::new("1", "a rather long comment").with_reply("2", "ok")];
        let snapshot = snapshot(&corpus);
        let mut rng = StdRng::seed_from_u64(7);

        let samples = sample_texts(&corpus, &snapshot, &small_config(), &mut rng);
        assert_eq!(samples, vec!["a rath".to_string(), "ok".to_string()]);
    }

    #[test]
    fn test_sample_prefers_liked_comments() {
        let corpus: Vec<CommentThread> = (0..10)
            .map(|i| CommentThread::new(i.to_string(), format!("comment {i}")).with_likes(i as u64))
            .chain(std::iter::once(CommentThread::new("x", "no")))
            .collect();
        let snapshot = snapshot(&corpus);
        let mut rng = StdRng::seed_from_u64(7);

        let config = SummaryConfig {
            sample_size: 5,
            ..Default::default()
        };
        let samples = sample_texts(&corpus, &snapshot, &config, &mut rng);

        assert_eq!(samples.len(), 5);
        // floor(5 * 0.4) = 2 liked slots, most liked first
        assert_eq!(samples[..2], ["comment 9", "comment 8"]);
        assert!(!samples[2..].contains(&"comment 9".to_string()));
        assert!(!samples.contains(&"no".to_string()));
    }

    #[test]
    fn test_sample_never_repeats_documents() {
        let corpus: Vec<CommentThread> = (0..30)
            .map(|i| CommentThread::new(i.to_string(), format!("{i:03} text")).with_likes(30 - i as u64))
            .collect();
        let snapshot = snapshot(&corpus);
        let config = SummaryConfig {
            sample_size: 10,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(42);

        let samples = sample_texts(&corpus, &snapshot, &config, &mut rng);
        let distinct: HashSet<_> = samples.iter().collect();

        assert_eq!(samples.len(), 10);
        assert_eq!(distinct.len(), 10);
        assert_eq!(samples[..4], ["000 text", "001 text", "002 text", "003 text"]);
    }

    #[test]
    fn test_liked_share_above_one_is_clamped() {
        let corpus: Vec<CommentThread> = (0..10)
            .map(|i| CommentThread::new(i.to_string(), format!("comment {i}")).with_likes(i as u64))
            .collect();
        let snapshot = snapshot(&corpus);
        let config = SummaryConfig {
            sample_size: 4,
            liked_share: 2.5,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(7);

        let samples = sample_texts(&corpus, &snapshot, &config, &mut rng);
        assert_eq!(samples, ["comment 9", "comment 8", "comment 7", "comment 6"]);
    }

    #[test]
    fn test_stats_line() {
        let dist = SentimentDistribution {
            positive: 1,
            neutral: 1,
            negative: 1,
        };
        assert_eq!(
            stats_line(&dist),
            "3 comments: 1 positive (33.3%), 1 neutral (33.3%), 1 negative (33.3%)."
        );
    }
}
