use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Image URLs discovered on a listing, one entry per distinct string
///
/// Iteration follows discovery order so repeated runs over the same page
/// produce the same numbering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ImageUrlSet {
    urls: Vec<String>,
    seen: HashSet<String>,
}

impl ImageUrlSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a URL, returning false if it was already present
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if !self.seen.insert(url.clone()) {
            return false;
        }
        self.urls.push(url);
        true
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ImageUrlSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<S: Into<String>> Extend<S> for ImageUrlSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for url in iter {
            self.insert(url);
        }
    }
}

impl From<Vec<String>> for ImageUrlSet {
    fn from(urls: Vec<String>) -> Self {
        urls.into_iter().collect()
    }
}

impl From<ImageUrlSet> for Vec<String> {
    fn from(set: ImageUrlSet) -> Self {
        set.urls
    }
}

/// Fields extracted from one product listing page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    /// Listing title, empty if it never appeared
    pub title: String,

    /// Image URLs referenced by the listing gallery
    pub image_urls: ImageUrlSet,

    /// Displayed price text, empty if it never appeared
    pub price: String,
}

impl ScrapeResult {
    /// Create a new scrape result
    pub fn new(title: String, price: String, image_urls: ImageUrlSet) -> Self {
        Self {
            title,
            image_urls,
            price,
        }
    }
}
