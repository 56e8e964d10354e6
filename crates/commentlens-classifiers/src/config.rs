//! Configuration for the scorers, the batch classifier and summaries

use crate::batch::BatchConfig;
use crate::lexicon::LexiconConfig;
use crate::summary::SummaryConfig;
use commentlens_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Configuration for all classifiers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Lexicon override files
    #[serde(default)]
    pub lexicon: LexiconConfig,

    /// Remote batch classification
    #[serde(default)]
    pub classifier: BatchConfig,

    /// Comment-section summary
    #[serde(default)]
    pub summary: SummaryConfig,
}

impl ClassifierConfig {
    /// Load configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| Error::config(format!("invalid classifier config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_yaml(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.classifier.validate()?;
        if !(0.0..=1.0).contains(&self.summary.liked_share) {
            return Err(Error::config("summary.liked_share must be between 0 and 1"));
        }
        if self.summary.timeout_ms == 0 {
            return Err(Error::config("summary.timeout_ms must be positive"));
        }
        Ok(())
    }
}
