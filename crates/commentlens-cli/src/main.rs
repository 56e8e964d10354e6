//! commentlens
//!
//! Word frequencies and sentiment for a video's comment section.
//!
//! Reads a corpus of comment threads (JSON), indexes it, scores it with the
//! local lexicon or a remote classification service, and caches the result
//! per video so later commands can work from the cache alone.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use commentlens_cache::{FileStore, SaveOutcome, VideoCache, VideoIdExtractor};
use commentlens_classifiers::{AiBatchClassifier, HttpChatClient, SummaryGenerator, WordSentiment};
use commentlens_core::{CommentThread, DeferredTask, Polarity, SentimentMode, TokenizerKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

mod config;
mod session;

use config::AppConfig;
use session::AnalysisSession;

#[derive(Parser, Debug)]
#[command(name = "commentlens")]
#[command(about = "Word frequencies and sentiment for comment sections", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "commentlens.yaml")]
    config: PathBuf,

    /// Cache directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Tokenizer backend
    #[arg(long, value_enum)]
    tokenizer: Option<TokenizerArg>,

    /// Model for the classification service
    #[arg(long)]
    model: Option<String>,

    /// Chat-completion endpoint of the classification service
    #[arg(long)]
    endpoint: Option<String>,

    /// API key for the classification service
    #[arg(long, env = "COMMENTLENS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index a corpus and list its top words with lexicon sentiment
    Analyze(Source),

    /// Label every comment with the classification service
    Ai(Source),

    /// Generate a summary of the comment section
    Summary(Source),

    /// List the comments containing a word
    Words {
        #[command(flatten)]
        source: Source,

        word: String,

        /// Only comments with this sentiment
        #[arg(long, value_enum)]
        filter: Option<PolarityArg>,
    },

    /// Search comments and authors
    Search {
        #[command(flatten)]
        source: Source,

        keyword: String,

        /// Treat the keyword as a regular expression
        #[arg(long)]
        regex: bool,
    },

    /// Inspect or prune the video cache
    #[command(subcommand)]
    Cache(CacheCommand),

    /// Manage excluded words
    #[command(subcommand)]
    Exclude(ExcludeCommand),
}

/// Where the corpus comes from
#[derive(Args, Debug)]
struct Source {
    /// Corpus file (JSON array of comment threads)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Video id or page URL; used as the cache key
    #[arg(long)]
    video: Option<String>,

    /// Aggregate with AI labels from an earlier `ai` run
    #[arg(long)]
    ai: bool,
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// List cached videos, most recent first
    List,
    /// Remove a cached video
    Remove { video: String },
}

#[derive(Subcommand, Debug)]
enum ExcludeCommand {
    List,
    Add { word: String },
    Remove { word: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TokenizerArg {
    Auto,
    Jieba,
    Segmenter,
}

impl From<TokenizerArg> for TokenizerKind {
    fn from(arg: TokenizerArg) -> Self {
        match arg {
            TokenizerArg::Auto => TokenizerKind::Auto,
            TokenizerArg::Jieba => TokenizerKind::Jieba,
            TokenizerArg::Segmenter => TokenizerKind::Segmenter,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PolarityArg {
    Positive,
    Neutral,
    Negative,
}

impl From<PolarityArg> for Polarity {
    fn from(arg: PolarityArg) -> Self {
        match arg {
            PolarityArg::Positive => Polarity::Positive,
            PolarityArg::Neutral => Polarity::Neutral,
            PolarityArg::Negative => Polarity::Negative,
        }
    }
}

type Session = AnalysisSession<FileStore>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);
    describe_metrics();

    let config = AppConfig::load(&cli.config, &cli)?;
    let cache_dir = config.cache.resolved_dir();
    let store = FileStore::open(&cache_dir, config.cache.quota_bytes)?;
    let cache = VideoCache::with_capacity(store, config.cache.capacity);
    info!("Using cache at {:?} (capacity {})", cache_dir, config.cache.capacity);

    let mut session = AnalysisSession::new(&config, cache)?;

    match &cli.command {
        Command::Analyze(source) => {
            open_source(&mut session, source)?;
            print_top_words(&session.top_words(), session.mode());
            report_save(session.persist());
        }
        Command::Ai(source) => {
            open_source(&mut session, source)?;
            run_ai(&mut session, &cli, &config).await?;
            print_top_words(&session.top_words(), session.mode());
        }
        Command::Summary(source) => {
            open_source(&mut session, source)?;
            let client = Arc::new(HttpChatClient::new(&config.classifiers.classifier.endpoint, api_key(&cli)?)?);
            let generator = SummaryGenerator::new(client, config.classifiers.summary.clone());
            let summary = session.summarize(&generator, &mut rand::thread_rng()).await?;
            println!("{}", summary.text);
        }
        Command::Words { source, word, filter } => {
            open_source(&mut session, source)?;
            let matches = session.aggregator().documents_for_word(word, filter.map(Polarity::from));
            let corpus = session.corpus();
            for found in &matches {
                let Some(thread) = corpus.get(found.thread) else {
                    continue;
                };
                if found.comment {
                    println!("#{} {}", found.thread, thread.text);
                }
                for reply in found.replies.iter().filter_map(|&idx| thread.replies.get(idx)) {
                    println!("#{}  ↳ {}", found.thread, reply.text);
                }
            }
            println!("{} threads", matches.len());
        }
        Command::Search { source, keyword, regex } => {
            open_source(&mut session, source)?;
            let hits = session.search(keyword, *regex)?;
            let corpus = session.corpus();
            for hit in &hits {
                let Some(thread) = corpus.get(hit.thread) else {
                    continue;
                };
                let marker = if hit.comment_matched { "*" } else { " " };
                println!("{}#{} {}", marker, hit.thread, thread.text);
                for reply in hit.matched_replies.iter().filter_map(|&idx| thread.replies.get(idx)) {
                    println!("   ↳ {}", reply.text);
                }
            }
            println!("{} matching threads", hits.len());
        }
        Command::Cache(CacheCommand::List) => {
            for (video_id, meta) in session.cache().entries() {
                let saved = format_saved_at(meta.saved_at);
                println!(
                    "{video_id}\t{} threads\t{} documents\tsaved {saved}",
                    meta.thread_count, meta.document_count
                );
            }
        }
        Command::Cache(CacheCommand::Remove { video }) => {
            let video_id = resolve_video_id(video)?;
            if session.cache().remove(&video_id)? {
                println!("Removed {video_id}");
            } else {
                println!("{video_id} is not cached");
            }
        }
        Command::Exclude(ExcludeCommand::List) => {
            for word in session.excluded() {
                println!("{word}");
            }
        }
        Command::Exclude(ExcludeCommand::Add { word }) => {
            session.exclude(word);
        }
        Command::Exclude(ExcludeCommand::Remove { word }) => {
            session.include(word);
        }
    }

    let stats = session.cache().stats().snapshot();
    info!(
        "Cache: {} hits, {} misses, {} writes, {} evictions",
        stats.hits, stats.misses, stats.writes, stats.evictions
    );
    Ok(())
}

/// Load the corpus from a file, or restore it from the cache by video id
fn open_source(session: &mut Session, source: &Source) -> Result<()> {
    let video_id = source.video.as_deref().map(resolve_video_id).transpose()?;

    match (&source.input, &video_id) {
        (Some(path), _) => {
            let corpus = read_corpus(path)?;
            session.load_corpus(video_id, corpus);
        }
        (None, Some(video_id)) => {
            if !session.restore(video_id) {
                bail!("{video_id} is not cached; pass --input to analyse a corpus file");
            }
        }
        (None, None) => bail!("either --input or --video is required"),
    }

    if source.ai {
        session.set_mode(SentimentMode::Ai)?;
    } else {
        session.set_mode(SentimentMode::Lexicon)?;
    }
    Ok(())
}

fn resolve_video_id(video: &str) -> Result<String> {
    let extractor = VideoIdExtractor::new()?;
    Ok(extractor.extract(video).unwrap_or_else(|| video.to_string()))
}

fn read_corpus(path: &Path) -> Result<Vec<CommentThread>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("{} is not a comment thread array", path.display()))
}

fn api_key(cli: &Cli) -> Result<&str> {
    cli.api_key
        .as_deref()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| anyhow!("an API key is required (--api-key or COMMENTLENS_API_KEY)"))
}

/// Run AI classification; Ctrl+C stops dispatching new waves but keeps
/// what was already labelled
async fn run_ai(session: &mut Session, cli: &Cli, config: &AppConfig) -> Result<()> {
    let batch = &config.classifiers.classifier;
    let client = Arc::new(HttpChatClient::new(&batch.endpoint, api_key(cli)?)?);
    let classifier = AiBatchClassifier::new(client, batch.clone())?;

    let cancel = commentlens_core::CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        DeferredTask::spawn(move |stop| async move {
            tokio::select! {
                _ = stop.cancelled() => {}
                signal = tokio::signal::ctrl_c() => {
                    if signal.is_ok() {
                        warn!("Interrupt received, finishing the current wave");
                        cancel.cancel();
                    }
                }
            }
        })
    };

    let result = session.run_ai_sentiment(&classifier, &cancel).await;
    watcher.cancel();
    let report = result?;

    println!(
        "Labelled {} of {} comments ({} failed, {} missing{})",
        report.succeeded,
        report.total,
        report.failed,
        report.missing,
        if report.cancelled {
            format!(", {} skipped after interrupt", report.skipped())
        } else {
            String::new()
        }
    );
    Ok(())
}

fn print_top_words(words: &[WordSentiment], mode: SentimentMode) {
    println!("Top words ({mode} sentiment):");
    for (rank, word) in words.iter().enumerate() {
        let dist = &word.distribution;
        println!(
            "{:>3}. {:<12} {:>5}   +{:<4} ={:<4} -{:<4}",
            rank + 1,
            word.word,
            word.count,
            dist.positive,
            dist.neutral,
            dist.negative
        );
    }
}

fn report_save(outcome: Option<SaveOutcome>) {
    match outcome {
        Some(SaveOutcome::Stored { evicted, .. }) if !evicted.is_empty() => {
            info!("Cached; evicted {}", evicted.join(", "))
        }
        Some(SaveOutcome::Dropped { .. }) => warn!("Analysis could not be cached"),
        _ => {}
    }
}

fn format_saved_at(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("commentlens=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("commentlens=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Register metric descriptions. No exporter is installed, so recording is a
/// no-op unless an embedding application installs a recorder.
fn describe_metrics() {
    metrics::describe_counter!(
        "commentlens_batches_total",
        "Classification batches by outcome"
    );
    metrics::describe_histogram!(
        "commentlens_batch_latency_ms",
        metrics::Unit::Milliseconds,
        "Classification batch latency in milliseconds"
    );
    metrics::describe_counter!(
        "commentlens_cache_evictions_total",
        "Video cache evictions by reason"
    );
    metrics::describe_counter!(
        "commentlens_cache_writes_total",
        "Video cache writes by outcome"
    );
}
