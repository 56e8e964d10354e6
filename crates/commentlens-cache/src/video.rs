//! Video id extraction from page URLs

use commentlens_core::{Error, Result};
use regex::Regex;

/// Pulls a video id out of a page URL.
///
/// Tried in order: a `/video/<id>` path segment (`BV…` or `av…`), a `bvid`
/// query parameter, then any `BV…` token in the URL.
#[derive(Debug, Clone)]
pub struct VideoIdExtractor {
    patterns: Vec<Regex>,
}

impl VideoIdExtractor {
    pub fn new() -> Result<Self> {
        let patterns = [r"(?i)/video/(BV\w+|av\d+)", r"(?i)[?&]bvid=(BV\w+)", r"(?i)(BV\w+)"]
            .iter()
            .map(|p| Regex::new(p).map_err(|e| Error::config(format!("invalid video id pattern {p}: {e}"))))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn extract(&self, url: &str) -> Option<String> {
        self.patterns
            .iter()
            .find_map(|re| re.captures(url))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_video_ids() {
        let extractor = VideoIdExtractor::new().unwrap();

        assert_eq!(
            extractor.extract("https://www.bilibili.com/video/BV1xx411c7mD/?spm_id_from=333").as_deref(),
            Some("BV1xx411c7mD")
        );
        assert_eq!(extractor.extract("https://www.bilibili.com/video/av170001").as_deref(), Some("av170001"));
        assert_eq!(
            extractor.extract("https://m.bilibili.com/play?bvid=BV1ab411c7mQ&p=2").as_deref(),
            Some("BV1ab411c7mQ")
        );
        assert_eq!(extractor.extract("https://example.com/watch/BV9zz").as_deref(), Some("BV9zz"));
        assert_eq!(extractor.extract("https://example.com/watch?v=abc"), None);
    }

    #[test]
    fn test_path_takes_precedence_over_query() {
        let extractor = VideoIdExtractor::new().unwrap();
        assert_eq!(
            extractor.extract("https://www.bilibili.com/video/BV1first?bvid=BV1second").as_deref(),
            Some("BV1first")
        );
    }
}
