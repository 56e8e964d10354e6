//! AI batch classifier
//!
//! Documents are split into sequential batches and dispatched in waves of
//! concurrent calls. Each wave resolves completely before the next starts.
//! A batch that still fails after its retries is tallied and skipped; its
//! documents stay absent from the resulting cache.

use crate::client::{ChatClient, ChatRequest};
use commentlens_core::{
    retry_with_timeout, CancellationToken, Error, Polarity, Result, RetryPolicy, SentimentCache,
    SentimentLabel,
};
use futures::future::join_all;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_ENDPOINT: &str = "https://api.deepseek.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "deepseek-chat";

const DEFAULT_SYSTEM_PROMPT: &str = "You are a sentiment classifier. Each input line is `index:text`. \
Reply with only a JSON array [{\"i\":index,\"s\":\"positive\"|\"neutral\"|\"negative\"}] and nothing else.";

/// Batch classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Chat-completion endpoint
    pub endpoint: String,

    /// Model name sent with every request
    pub model: String,

    /// Documents per call
    pub batch_size: usize,

    /// Calls per wave
    pub concurrency: usize,

    /// Characters of each document sent to the service
    pub max_chars: usize,

    /// Per-call timeout and retry budget
    pub retry: RetryPolicy,

    /// Pause between waves, in milliseconds
    pub wave_pause_ms: u64,

    pub temperature: f32,

    pub max_tokens: u32,

    pub system_prompt: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            batch_size: 80,
            concurrency: 5,
            max_chars: 100,
            retry: RetryPolicy::default(),
            wave_pause_ms: 50,
            temperature: 0.0,
            max_tokens: 2000,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl BatchConfig {
    /// Reject values that would make a run impossible
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::config("batch_size must be at least 1"));
        }
        if self.concurrency == 0 {
            return Err(Error::config("concurrency must be at least 1"));
        }
        if self.retry.timeout.is_zero() {
            return Err(Error::config("retry.timeout_ms must be positive"));
        }
        Ok(())
    }
}

/// Lifecycle of the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    /// Every dispatched batch failed
    Failed,
}

/// Outcome of one classification run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Labels for every successfully classified document
    pub cache: SentimentCache,

    /// Documents submitted
    pub total: usize,

    /// Documents labelled
    pub succeeded: usize,

    /// Documents in batches that failed every attempt
    pub failed: usize,

    /// Documents in successful batches that the response left out
    pub missing: usize,

    pub batches: usize,

    pub failed_batches: usize,

    /// Stopped early by cancellation
    pub cancelled: bool,
}

impl RunReport {
    /// Documents never dispatched because the run was cancelled
    pub fn skipped(&self) -> usize {
        self.total - self.succeeded - self.failed - self.missing
    }
}

/// Clears the running flag when a run ends, however it ends
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Concurrency-bounded batch classifier over a chat-completion client
pub struct AiBatchClassifier {
    client: Arc<dyn ChatClient>,
    config: BatchConfig,
    running: AtomicBool,
    state: Mutex<RunState>,
}

impl AiBatchClassifier {
    pub fn new(client: Arc<dyn ChatClient>, config: BatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client,
            config,
            running: AtomicBool::new(false),
            state: Mutex::new(RunState::Idle),
        })
    }

    pub fn state(&self) -> RunState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Classify `texts`, whose positions are the flat document ids.
    ///
    /// Returns [`Error::AlreadyRunning`] if another run is in progress.
    /// `cancel` is checked between waves and cuts the pause short; results
    /// obtained before cancellation are kept in the report.
    pub async fn run(&self, texts: &[String], cancel: &CancellationToken) -> Result<RunReport> {
        let _guard = RunGuard::acquire(&self.running).ok_or(Error::AlreadyRunning)?;
        *self.state.lock() = RunState::Running;

        let batches: Vec<(usize, &[String])> = texts
            .chunks(self.config.batch_size)
            .enumerate()
            .map(|(i, chunk)| (i * self.config.batch_size, chunk))
            .collect();
        let waves = batches.len().div_ceil(self.config.concurrency);

        info!(
            "Classifying {} documents in {} batches ({} waves)",
            texts.len(),
            batches.len(),
            waves
        );

        let mut report = RunReport {
            total: texts.len(),
            ..Default::default()
        };
        let pause = Duration::from_millis(self.config.wave_pause_ms);

        for (wave_idx, wave) in batches.chunks(self.config.concurrency).enumerate() {
            if wave_idx > 0 && !pause.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(pause) => {}
                }
            }
            if cancel.is_cancelled() {
                info!("Classification cancelled after {} of {} waves", wave_idx, waves);
                report.cancelled = true;
                break;
            }

            let outcomes = join_all(
                wave.iter()
                    .map(|(offset, batch)| self.classify_batch(*offset, batch)),
            )
            .await;

            for ((offset, batch), outcome) in wave.iter().zip(outcomes) {
                report.batches += 1;
                match outcome {
                    Ok(labels) => {
                        let mut written = 0;
                        for (local, label) in labels {
                            if report.cache.insert(offset + local, label) {
                                written += 1;
                            }
                        }
                        report.succeeded += written;
                        report.missing += batch.len() - written;
                        metrics::counter!("commentlens_batches_total", "outcome" => "success").increment(1);
                    }
                    Err(e) => {
                        warn!(
                            "Batch at document {} ({} documents) failed: {}",
                            offset,
                            batch.len(),
                            e
                        );
                        report.failed += batch.len();
                        report.failed_batches += 1;
                        metrics::counter!("commentlens_batches_total", "outcome" => "failure").increment(1);
                    }
                }
            }

            debug!(
                "Wave {}/{} done: {} labelled, {} failed",
                wave_idx + 1,
                waves,
                report.succeeded,
                report.failed
            );
        }

        let state = if report.failed_batches > 0 && report.succeeded == 0 {
            RunState::Failed
        } else {
            RunState::Completed
        };
        *self.state.lock() = state;

        info!(
            "Classification finished: {} labelled, {} failed, {} missing of {} documents",
            report.succeeded, report.failed, report.missing, report.total
        );

        Ok(report)
    }

    async fn classify_batch(&self, offset: usize, batch: &[String]) -> Result<Vec<(usize, SentimentLabel)>> {
        let request = ChatRequest::new(
            &self.config.model,
            &self.config.system_prompt,
            numbered_lines(batch, self.config.max_chars),
            self.config.temperature,
            self.config.max_tokens,
        );
        let label = format!("batch@{offset}");
        let start = Instant::now();

        let client = &self.client;
        let request = &request;
        let batch_len = batch.len();
        let result = retry_with_timeout(&self.config.retry, &label, || async move {
            let content = client.complete(request).await?;
            parse_labels(&content, batch_len)
        })
        .await;

        metrics::histogram!("commentlens_batch_latency_ms").record(start.elapsed().as_millis() as f64);
        result
    }
}

/// `index:text` lines with each text cut to `max_chars` characters
pub fn numbered_lines(texts: &[String], max_chars: usize) -> String {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let clipped: String = text
                .chars()
                .take(max_chars)
                .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
                .collect();
            format!("{i}:{clipped}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse a classification reply into batch-local labels.
///
/// The JSON array is taken from the first `[` to the last `]`, so prose
/// or code fences around it are tolerated. Items may use `index`/`label`
/// or the short `i`/`s` keys. Items without a usable index, or with an
/// index outside the batch, are skipped; unknown labels read as neutral.
pub fn parse_labels(content: &str, batch_len: usize) -> Result<Vec<(usize, SentimentLabel)>> {
    let start = content
        .find('[')
        .ok_or_else(|| Error::parse("no JSON array in response"))?;
    let end = content
        .rfind(']')
        .filter(|end| *end > start)
        .ok_or_else(|| Error::parse("unterminated JSON array in response"))?;

    let items: Vec<Value> = serde_json::from_str(&content[start..=end])
        .map_err(|e| Error::parse(format!("invalid label array: {e}")))?;

    Ok(items
        .iter()
        .filter_map(|item| {
            let index = item
                .get("index")
                .or_else(|| item.get("i"))
                .and_then(Value::as_u64)? as usize;
            if index >= batch_len {
                return None;
            }
            let label = item
                .get("label")
                .or_else(|| item.get("s"))
                .and_then(Value::as_str)
                .map(Polarity::from_label)
                .unwrap_or_default();
            Some((index, SentimentLabel::from_polarity(label)))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels_both_shapes() {
        let content = "```json\n[{\"i\":0,\"s\":\"positive\"},{\"index\":1,\"label\":\"negative\"},{\"i\":2,\"s\":\"meh\"}]\n```";
        let labels = parse_labels(content, 3).unwrap();

        assert_eq!(labels.len(), 3);
        assert_eq!(labels[0], (0, SentimentLabel::from_polarity(Polarity::Positive)));
        assert_eq!(labels[1].1.label, Polarity::Negative);
        assert_eq!(labels[2].1.label, Polarity::Neutral);
    }

    #[test]
    fn test_parse_labels_skips_bad_indices() {
        let labels = parse_labels(r#"[{"i":5,"s":"positive"},{"i":-1,"s":"positive"},{"s":"negative"},{"i":1}]"#, 2).unwrap();
        assert_eq!(labels, vec![(1, SentimentLabel::neutral())]);
    }

    #[test]
    fn test_parse_labels_malformed() {
        assert!(matches!(parse_labels("no array here", 1), Err(Error::Parse(_))));
        assert!(matches!(parse_labels("] then [", 1), Err(Error::Parse(_))));
        assert!(matches!(parse_labels("[{\"i\":0,}]", 1), Err(Error::Parse(_))));
    }

    #[test]
    fn test_numbered_lines_truncates_by_chars() {
        let texts = vec!["好看好看好看".to_string(), "line\nbreak".to_string()];
        assert_eq!(numbered_lines(&texts, 4), "0:好看好看\n1:line");
        assert_eq!(numbered_lines(&texts[1..], 100), "0:line break");
    }

    #[test]
    fn test_config_validation() {
        assert!(BatchConfig::default().validate().is_ok());
        let config = BatchConfig {
            concurrency: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
