//! Analysis session
//!
//! Owns everything one analysed video needs: the tokenizer and indexer, the
//! lexicon scorer, the corpus with its snapshot and sentiment cache, the
//! active mode, the exclude list and the video cache. Components receive
//! borrows from here instead of reaching for shared state.

use crate::config::{AppConfig, DisplayConfig};
use commentlens_cache::{CachePayload, KvStore, SaveOutcome, VideoCache};
use commentlens_classifiers::{
    AiBatchClassifier, Lexicon, LexiconScorer, RunReport, SentimentAggregator, Summary, SummaryGenerator,
    SummaryInput, WordSentiment,
};
use commentlens_core::{
    select_tokenizer, CancellationToken, CommentThread, Error, Result, SentimentCache, SentimentMode,
};
use commentlens_index::{search, AnalysisSnapshot, CorpusIndexer, KeywordMatcher, SearchHit, Stopwords, TokenFilter};
use rand::Rng;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct AnalysisSession<S> {
    indexer: CorpusIndexer,
    scorer: LexiconScorer,
    display: DisplayConfig,
    video_id: Option<String>,
    corpus: Vec<CommentThread>,
    snapshot: AnalysisSnapshot,
    sentiment: SentimentCache,
    mode: SentimentMode,
    excluded: HashSet<String>,
    cache: VideoCache<S>,
}

impl<S: KvStore> AnalysisSession<S> {
    pub fn new(config: &AppConfig, cache: VideoCache<S>) -> Result<Self> {
        let tokenizer = select_tokenizer(&config.tokenizer);

        let stopwords = match &config.classifiers.lexicon.stopwords {
            Some(path) => Stopwords::from_file(path)?,
            None => Stopwords::bundled(),
        };
        let filter = TokenFilter::new(stopwords)?;
        let indexer = CorpusIndexer::new(tokenizer.clone(), Arc::new(filter));

        let lexicon = Lexicon::from_config(&config.classifiers.lexicon)?;
        let scorer = LexiconScorer::new(Arc::new(lexicon), tokenizer)?;

        let excluded = cache.load_excluded().into_iter().collect();

        Ok(Self {
            indexer,
            scorer,
            display: config.display.clone(),
            video_id: None,
            corpus: Vec::new(),
            snapshot: AnalysisSnapshot::default(),
            sentiment: SentimentCache::new(),
            mode: SentimentMode::Lexicon,
            excluded,
            cache,
        })
    }

    /// Start over with a freshly fetched corpus. Earlier labels and the
    /// snapshot are discarded.
    pub fn load_corpus(&mut self, video_id: Option<String>, corpus: Vec<CommentThread>) {
        info!(
            "Loaded corpus for {} ({} threads)",
            video_id.as_deref().unwrap_or("unnamed video"),
            corpus.len()
        );
        self.video_id = video_id;
        self.corpus = corpus;
        self.snapshot = AnalysisSnapshot::default();
        self.sentiment = SentimentCache::new();
        self.mode = SentimentMode::Lexicon;
    }

    /// Restore a cached analysis; returns whether one was found
    pub fn restore(&mut self, video_id: &str) -> bool {
        let Some(entry) = self.cache.load(video_id) else {
            return false;
        };

        self.video_id = Some(entry.video_id);
        self.corpus = entry.corpus;
        self.snapshot = entry.snapshot;
        self.sentiment = entry.sentiment_cache;
        self.mode = if self.sentiment.is_empty() {
            SentimentMode::Lexicon
        } else {
            entry.mode
        };
        info!(
            "Restored {} from cache ({} documents, {} mode)",
            video_id, self.snapshot.document_count, self.mode
        );
        true
    }

    /// Build the index unless the current snapshot still matches the corpus
    pub fn ensure_index(&mut self) -> &AnalysisSnapshot {
        if !self.snapshot.is_current(&self.corpus) {
            self.snapshot = self.indexer.build(&self.corpus);
            debug!(
                "Indexed {} documents, {} distinct words",
                self.snapshot.document_count,
                self.snapshot.vocabulary_size()
            );
        }
        &self.snapshot
    }

    /// Label every document remotely and switch to AI mode when anything
    /// was labelled. Partial results are kept and persisted.
    pub async fn run_ai_sentiment(
        &mut self,
        classifier: &AiBatchClassifier,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        let texts: Vec<String> = self
            .ensure_index()
            .documents()
            .iter()
            .map(|doc| doc.text.clone())
            .collect();

        let report = classifier.run(&texts, cancel).await?;

        self.sentiment = report.cache.clone();
        self.mode = if self.sentiment.is_empty() {
            warn!("AI classification labelled nothing, staying in lexicon mode");
            SentimentMode::Lexicon
        } else {
            SentimentMode::Ai
        };

        self.persist();
        Ok(report)
    }

    /// Switch modes. AI mode needs labels from a previous run.
    pub fn set_mode(&mut self, mode: SentimentMode) -> Result<()> {
        if mode == SentimentMode::Ai && self.sentiment.is_empty() {
            return Err(Error::config("AI mode needs a completed AI classification run"));
        }
        self.mode = mode;
        Ok(())
    }

    /// Save the current analysis under its video id. Sessions without a
    /// video id are not cached.
    pub fn persist(&mut self) -> Option<SaveOutcome> {
        let video_id = self.video_id.clone()?;
        self.ensure_index();

        let payload = CachePayload {
            corpus: &self.corpus,
            snapshot: &self.snapshot,
            sentiment_cache: &self.sentiment,
            mode: self.mode,
        };
        Some(self.cache.save(&video_id, &payload))
    }

    pub fn aggregator(&mut self) -> SentimentAggregator<'_> {
        self.ensure_index();
        SentimentAggregator::new(&self.corpus, &self.snapshot, &self.scorer, &self.sentiment, self.mode)
    }

    /// Most frequent non-excluded words with their distributions
    pub fn top_words(&mut self) -> Vec<WordSentiment> {
        let (top_n, min_freq) = (self.display.top_n, self.display.min_freq);
        let excluded = self.excluded.clone();
        let aggregator = self.aggregator();
        let words = aggregator.top_words(top_n, min_freq, &excluded);
        aggregator.distributions(&words)
    }

    pub fn search(&self, keyword: &str, use_regex: bool) -> Result<Vec<SearchHit>> {
        Ok(match KeywordMatcher::new(keyword, use_regex)? {
            Some(matcher) => search(&self.corpus, &matcher),
            None => Vec::new(),
        })
    }

    pub async fn summarize<R: Rng + ?Sized>(&mut self, generator: &SummaryGenerator, rng: &mut R) -> Result<Summary> {
        let top_n = generator.config().top_words;
        let excluded = self.excluded.clone();
        let aggregator = self.aggregator();
        let distribution = aggregator.overall();
        let top_words = aggregator.top_words(top_n, 1, &excluded);

        let input = SummaryInput {
            corpus: &self.corpus,
            snapshot: &self.snapshot,
            distribution,
            top_words: &top_words,
            mode: self.mode,
        };
        generator.generate(&input, rng).await
    }

    /// Add a word to the exclude list; returns whether it was new
    pub fn exclude(&mut self, word: &str) -> bool {
        let added = self.excluded.insert(word.to_string());
        if added {
            self.save_excluded();
        }
        added
    }

    /// Remove a word from the exclude list; returns whether it was present
    pub fn include(&mut self, word: &str) -> bool {
        let removed = self.excluded.remove(word);
        if removed {
            self.save_excluded();
        }
        removed
    }

    pub fn excluded(&self) -> BTreeSet<&str> {
        self.excluded.iter().map(String::as_str).collect()
    }

    fn save_excluded(&self) {
        let words: BTreeSet<String> = self.excluded.iter().cloned().collect();
        if let Err(e) = self.cache.save_excluded(&words) {
            warn!("Cannot persist exclude list: {}", e);
        }
    }

    pub fn video_id(&self) -> Option<&str> {
        self.video_id.as_deref()
    }

    pub fn corpus(&self) -> &[CommentThread] {
        &self.corpus
    }

    pub fn mode(&self) -> SentimentMode {
        self.mode
    }

    pub fn sentiment(&self) -> &SentimentCache {
        &self.sentiment
    }

    pub fn cache(&self) -> &VideoCache<S> {
        &self.cache
    }
}
