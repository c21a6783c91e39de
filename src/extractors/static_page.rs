use crate::config::{AppConfig, ListingSelectors};
use crate::extractors::{ExtractionError, Extractor};
use crate::parsers::parse_listing;
use crate::results::ScrapeResult;
use reqwest::Client;
use std::time::Instant;
use url::Url;

/// User-Agent sent when fetching listing pages
const USER_AGENT: &str = concat!("gettio/", env!("CARGO_PKG_VERSION"));

/// Extractor that reads the served HTML without running any scripts
///
/// Fields rendered client-side are invisible to it; use the WebDriver
/// extractor for those pages.
#[derive(Debug, Clone)]
pub struct StaticExtractor {
    client: Client,
    selectors: ListingSelectors,
}

impl StaticExtractor {
    pub fn new(config: &AppConfig) -> Result<Self, ExtractionError> {
        // The field timeout bounds the whole fetch here since there is nothing to wait on
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.field_timeout() + config.page_load_timeout())
            .build()?;

        Ok(Self::with_client(client, config.selectors.clone()))
    }

    pub fn with_client(client: Client, selectors: ListingSelectors) -> Self {
        Self { client, selectors }
    }

    async fn fetch(&self, url: &Url) -> Result<String, ExtractionError> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::Status {
                url: url.to_string(),
                status,
            });
        }

        Ok(response.text().await?)
    }

    async fn scrape(&self, url: &str) -> Result<ScrapeResult, ExtractionError> {
        let page_url = Url::parse(url)?;
        let html = self.fetch(&page_url).await?;
        parse_listing(&html, &page_url, &self.selectors)
    }
}

impl Extractor for StaticExtractor {
    async fn extract(&self, url: &str) -> Result<ScrapeResult, ExtractionError> {
        ::log::info!("Extracting listing from {} via static fetch", url);
        let started = Instant::now();

        let result = self.scrape(url).await;

        match &result {
            Ok(listing) => ::log::info!(
                "Extracted {} in {:.2} seconds ({} image URLs)",
                url,
                started.elapsed().as_secs_f64(),
                listing.image_urls.len()
            ),
            Err(e) => ::log::error!("Error in scraping {}: {}", url, e),
        }

        result
    }
}
