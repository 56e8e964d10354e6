//! Application configuration

use commentlens_cache::DEFAULT_CAPACITY;
use commentlens_classifiers::ClassifierConfig;
use commentlens_core::TokenizerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration, read from YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Tokenizer backend selection
    #[serde(default)]
    pub tokenizer: TokenizerConfig,

    /// `lexicon`, `classifier` and `summary` sections
    #[serde(flatten)]
    pub classifiers: ClassifierConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

impl AppConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &Path, cli: &crate::Cli) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            Self::from_yaml(&content)?
        } else {
            Self::default()
        };

        // Apply CLI overrides
        if let Some(kind) = cli.tokenizer {
            config.tokenizer.kind = kind.into();
        }

        if let Some(dir) = &cli.cache_dir {
            config.cache.dir = Some(dir.clone());
        }

        if let Some(model) = &cli.model {
            config.classifiers.classifier.model = model.clone();
            config.classifiers.summary.model = model.clone();
        }

        if let Some(endpoint) = &cli.endpoint {
            config.classifiers.classifier.endpoint = endpoint.clone();
        }

        config.classifiers.validate()?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

/// Video cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Store directory; the platform cache directory when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Videos kept before the least recently saved is evicted
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Byte budget for the whole store
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: Option<u64>,
}

impl CacheConfig {
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("commentlens")
        })
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            capacity: default_capacity(),
            quota_bytes: default_quota_bytes(),
        }
    }
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Number of top words listed
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Minimum frequency for a word to be listed
    #[serde(default = "default_min_freq")]
    pub min_freq: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            min_freq: default_min_freq(),
        }
    }
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_quota_bytes() -> Option<u64> {
    Some(5 * 1024 * 1024) // 5MB
}

fn default_top_n() -> usize {
    20
}

fn default_min_freq() -> usize {
    2
}

#[cfg(test)]
mod tests {
    use super::*;
    use commentlens_core::TokenizerKind;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_yaml("{}").unwrap();

        assert_eq!(config.tokenizer.kind, TokenizerKind::Auto);
        assert_eq!(config.cache.capacity, 5);
        assert_eq!(config.cache.quota_bytes, Some(5 * 1024 * 1024));
        assert_eq!(config.display.top_n, 20);
        assert_eq!(config.display.min_freq, 2);
        assert_eq!(config.classifiers.classifier.batch_size, 80);
        assert_eq!(config.classifiers.summary.sample_size, 120);
    }

    #[test]
    fn test_sections() {
        let yaml = r#"
tokenizer:
  kind: segmenter
classifier:
  model: test-model
  concurrency: 2
summary:
  sample_size: 30
cache:
  dir: /tmp/commentlens-test
  capacity: 8
  quota_bytes: null
display:
  top_n: 5
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.tokenizer.kind, TokenizerKind::Segmenter);
        assert_eq!(config.classifiers.classifier.model, "test-model");
        assert_eq!(config.classifiers.classifier.concurrency, 2);
        assert_eq!(config.classifiers.classifier.batch_size, 80);
        assert_eq!(config.classifiers.summary.sample_size, 30);
        assert_eq!(config.cache.capacity, 8);
        assert_eq!(config.cache.quota_bytes, None);
        assert_eq!(config.cache.resolved_dir(), PathBuf::from("/tmp/commentlens-test"));
        assert_eq!(config.display.top_n, 5);
        assert_eq!(config.display.min_freq, 2);
    }
}
