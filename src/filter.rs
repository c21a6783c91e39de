use crate::results::ImageUrlSet;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Configuration for deciding which image URLs are worth downloading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFilterConfig {
    /// Regex patterns marking a URL as the full-size variant (any match qualifies)
    #[serde(default = "default_full_size_patterns")]
    pub full_size_patterns: Vec<String>,

    /// Regex patterns for URLs to drop even when marked full-size
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// URL schemes accepted for download
    #[serde(default = "default_allowed_schemes")]
    pub allowed_schemes: Vec<String>,
}

/// eBay serves its largest gallery rendition under an `s-l1600` path token
fn default_full_size_patterns() -> Vec<String> {
    vec!["s-l1600".to_string()]
}

fn default_allowed_schemes() -> Vec<String> {
    vec!["http".to_string(), "https".to_string()]
}

impl Default for ImageFilterConfig {
    fn default() -> Self {
        Self {
            full_size_patterns: default_full_size_patterns(),
            exclude_patterns: Vec::new(),
            allowed_schemes: default_allowed_schemes(),
        }
    }
}

/// Heuristic filter separating full-size listing photos from thumbnails
#[derive(Debug)]
pub struct ImageFilter {
    config: ImageFilterConfig,
    full_size_regexes: Vec<Regex>,
    exclude_regexes: Vec<Regex>,
}

impl Default for ImageFilter {
    fn default() -> Self {
        Self::new(ImageFilterConfig::default()).expect("Default regex patterns should be valid")
    }
}

impl ImageFilter {
    /// Create a new image filter from configuration
    pub fn new(config: ImageFilterConfig) -> Result<Self, regex::Error> {
        let full_size_regexes = config
            .full_size_patterns
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        let exclude_regexes = config
            .exclude_patterns
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            config,
            full_size_regexes,
            exclude_regexes,
        })
    }

    /// Determine if a URL looks like a full-size rendition
    pub fn is_full_size(&self, url: &str) -> bool {
        // Exclusions take precedence
        if self.exclude_regexes.iter().any(|regex| regex.is_match(url)) {
            return false;
        }

        self.full_size_regexes.iter().any(|regex| regex.is_match(url))
    }

    /// Parse a candidate as an absolute URL with an accepted scheme
    pub fn downloadable_url(&self, url: &str) -> Option<Url> {
        let parsed = Url::parse(url).ok()?;
        let scheme_allowed = self
            .config
            .allowed_schemes
            .iter()
            .any(|scheme| scheme.eq_ignore_ascii_case(parsed.scheme()));

        if scheme_allowed { Some(parsed) } else { None }
    }

    /// Full-size candidates from a scrape, deduplicated, in a fixed order
    ///
    /// The returned position of each URL is its download index.
    pub fn full_size_candidates(&self, urls: &ImageUrlSet) -> Vec<String> {
        let candidates = urls
            .iter()
            .filter(|url| self.is_full_size(url))
            .collect::<ImageUrlSet>();

        ::log::debug!(
            "{} of {} image URLs look full-size",
            candidates.len(),
            urls.len()
        );

        candidates.into()
    }
}
