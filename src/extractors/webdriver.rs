use crate::config::{AppConfig, ListingSelectors};
use crate::extractors::{ExtractionError, Extractor};
use crate::parsers::{pick_image_source, resolve_against};
use crate::results::{ImageUrlSet, ScrapeResult};
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{Map, Value, json};
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// Delay between visibility and readiness checks
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A browser session owned by a single extraction
///
/// Prefer [`with_session`], which closes the session on every exit path. If
/// the session is dropped without [`BrowserSession::close`] (for example
/// when the owning request is cancelled) the close is scheduled on the
/// current runtime instead.
pub struct BrowserSession {
    client: Client,
    closed: bool,
}

impl BrowserSession {
    /// Start a fresh session against the WebDriver server
    pub async fn launch(webdriver_url: &str, headless: bool) -> Result<Self, ExtractionError> {
        let client = ClientBuilder::native()
            .capabilities(browser_capabilities(headless))
            .connect(webdriver_url)
            .await
            .map_err(|e| {
                ::log::error!(
                    "Failed to connect to WebDriver at {}: {}. Make sure a WebDriver server is \
                     running or set the WEBDRIVER_URL environment variable",
                    webdriver_url,
                    e
                );
                e
            })?;

        ::log::debug!("Browser session started at {}", webdriver_url);
        Ok(Self {
            client,
            closed: false,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// End the session
    ///
    /// If this future is dropped before the close request returns, the
    /// `Drop` fallback still schedules one.
    pub async fn close(mut self) {
        let client = self.client.clone();
        match mark_after(client.close(), &mut self.closed).await {
            Ok(()) => ::log::debug!("Browser session closed"),
            Err(e) => ::log::warn!("Failed to close browser session: {}", e),
        }
    }
}

/// Await `closing`, then set `closed`
async fn mark_after<F, T>(closing: F, closed: &mut bool) -> T
where
    F: Future<Output = T>,
{
    let result = closing.await;
    *closed = true;
    result
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }

        let client = self.client.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                ::log::debug!("Browser session dropped before close, closing in background");
                handle.spawn(async move {
                    if let Err(e) = client.close().await {
                        ::log::warn!("Failed to close abandoned browser session: {}", e);
                    }
                });
            }
            Err(_) => {
                ::log::warn!("Browser session dropped outside a runtime and could not be closed");
            }
        }
    }
}

/// Run `f` against a fresh browser session, closing it afterwards
///
/// The session is released whether `f` succeeds or fails.
pub async fn with_session<T, F, Fut>(
    webdriver_url: &str,
    headless: bool,
    f: F,
) -> Result<T, ExtractionError>
where
    F: FnOnce(Client) -> Fut,
    Fut: Future<Output = Result<T, ExtractionError>>,
{
    let session = BrowserSession::launch(webdriver_url, headless).await?;
    let outcome = f(session.client().clone()).await;
    session.close().await;
    outcome
}

/// Capabilities asking Chrome or Firefox to run without a window
fn browser_capabilities(headless: bool) -> Map<String, Value> {
    let mut caps = Map::new();
    if headless {
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({ "args": ["--headless=new", "--disable-gpu", "--no-sandbox"] }),
        );
        caps.insert(
            "moz:firefoxOptions".to_string(),
            json!({ "args": ["-headless"] }),
        );
    }
    caps
}

/// Extractor backed by a real browser over WebDriver
#[derive(Debug, Clone)]
pub struct WebDriverExtractor {
    webdriver_url: String,
    headless: bool,
    field_timeout: Duration,
    page_load_timeout: Duration,
    selectors: ListingSelectors,
}

impl WebDriverExtractor {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            headless: config.headless,
            field_timeout: config.field_timeout(),
            page_load_timeout: config.page_load_timeout(),
            selectors: config.selectors.clone(),
        }
    }

    /// Navigate and pull each field, giving every field its own timeout
    async fn scrape_page(&self, client: &Client, url: &str) -> Result<ScrapeResult, ExtractionError> {
        client
            .goto(url)
            .await
            .map_err(|e| ExtractionError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        wait_for_ready_state(client, self.page_load_timeout).await?;

        let selectors = &self.selectors;

        let title = if wait_for_visible(client, "title", &selectors.title, self.field_timeout).await? {
            first_text(client, &selectors.title).await?
        } else {
            String::new()
        };

        let price = if wait_for_visible(client, "price", &selectors.price, self.field_timeout).await? {
            first_text(client, &selectors.price).await?
        } else {
            String::new()
        };

        let image_urls = if wait_for_visible(client, "image", &selectors.image, self.field_timeout).await? {
            image_sources(client, selectors).await?
        } else {
            ImageUrlSet::new()
        };

        Ok(ScrapeResult::new(title, price, image_urls))
    }
}

impl Extractor for WebDriverExtractor {
    async fn extract(&self, url: &str) -> Result<ScrapeResult, ExtractionError> {
        ::log::info!("Extracting listing from {} via WebDriver", url);
        let started = Instant::now();

        let result = with_session(&self.webdriver_url, self.headless, |client| async move {
            self.scrape_page(&client, url).await
        })
        .await;

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

/// Wait for `document.readyState` to reach "complete"
///
/// Running out of time is logged and extraction carries on with whatever has
/// rendered.
async fn wait_for_ready_state(client: &Client, limit: Duration) -> Result<(), ExtractionError> {
    if !within(limit, poll_ready_state(client)).await? {
        ::log::warn!("Page did not finish loading within {:?}, extracting anyway", limit);
    }
    Ok(())
}

async fn poll_ready_state(client: &Client) -> Result<(), CmdError> {
    loop {
        let state = client.execute("return document.readyState", vec![]).await?;
        if state.as_str() == Some("complete") {
            return Ok(());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Wait until the first element matching `selector` is visible
///
/// Returns `Ok(false)` if it does not show up within `limit`.
async fn wait_for_visible(
    client: &Client,
    field: &str,
    selector: &str,
    limit: Duration,
) -> Result<bool, ExtractionError> {
    let visible = within(limit, poll_until_visible(client, selector)).await?;
    if !visible {
        ::log::warn!(
            "Timed out after {:?} waiting for {} selector `{}`",
            limit,
            field,
            selector
        );
    }
    Ok(visible)
}

/// Run `wait` for at most `limit`
///
/// `Ok(true)` when it finished in time, `Ok(false)` when time ran out. A
/// browser command error inside `wait` is returned as is.
async fn within<F>(limit: Duration, wait: F) -> Result<bool, ExtractionError>
where
    F: Future<Output = Result<(), CmdError>>,
{
    match timeout(limit, wait).await {
        Ok(Ok(())) => Ok(true),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Ok(false),
    }
}

async fn poll_until_visible(client: &Client, selector: &str) -> Result<(), CmdError> {
    loop {
        let elements = client.find_all(Locator::Css(selector)).await?;
        if let Some(first) = elements.into_iter().next() {
            // A node replaced mid-check reads as not yet visible
            match first.is_displayed().await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(e) => ::log::trace!("Visibility check for `{}` failed: {}", selector, e),
            }
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Trimmed `textContent` of the first match
async fn first_text(client: &Client, selector: &str) -> Result<String, CmdError> {
    let elements = client.find_all(Locator::Css(selector)).await?;
    let Some(first) = elements.into_iter().next() else {
        return Ok(String::new());
    };

    let text = first.prop("textContent").await?.unwrap_or_default();
    Ok(text.trim().to_string())
}

/// Image URLs of every gallery element, preferring the zoom attribute
async fn image_sources(
    client: &Client,
    selectors: &ListingSelectors,
) -> Result<ImageUrlSet, CmdError> {
    let page_url = client.current_url().await?;
    let mut urls = ImageUrlSet::new();

    for img in client.find_all(Locator::Css(&selectors.image)).await? {
        // The zoom attribute is read raw; the `src` property comes back absolute
        let zoom = img.attr(&selectors.zoom_attribute).await?;
        let src = img.prop("src").await?;

        if let Some(raw) = pick_image_source(zoom, src) {
            if !urls.insert(resolve_against(&page_url, &raw)) {
                ::log::trace!("Skipping duplicate image URL");
            }
        }
    }

    ::log::debug!("Found {} distinct image URLs", urls.len());
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_capabilities() {
        let caps = browser_capabilities(true);
        let chrome_args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(chrome_args.iter().any(|a| a == "--headless=new"));
        assert_eq!(caps["moz:firefoxOptions"]["args"][0], "-headless");
    }

    #[test]
    fn test_headed_capabilities_are_empty() {
        assert!(browser_capabilities(false).is_empty());
    }

    #[test]
    fn test_extractor_takes_config_values() {
        let mut config = AppConfig::default();
        config.webdriver_url = "http://localhost:9515".to_string();
        config.field_timeout_secs = 2;

        let extractor = WebDriverExtractor::new(&config);
        assert_eq!(extractor.webdriver_url, "http://localhost:9515");
        assert_eq!(extractor.field_timeout, Duration::from_secs(2));
        assert!(extractor.headless);
    }

    #[tokio::test]
    async fn test_wait_that_never_finishes_times_out_quietly() {
        let started = Instant::now();
        let result = within(
            Duration::from_millis(50),
            std::future::pending::<Result<(), CmdError>>(),
        )
        .await;

        assert!(matches!(result, Ok(false)));
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_wait_that_finishes_in_time() {
        let result = within(Duration::from_secs(5), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok::<(), CmdError>(())
        })
        .await;

        assert!(matches!(result, Ok(true)));
    }

    #[tokio::test]
    async fn test_browser_error_during_wait_is_fatal() {
        let result = within(Duration::from_secs(5), async {
            Err::<(), _>(CmdError::NotJson("<html>".to_string()))
        })
        .await;

        assert!(matches!(result, Err(ExtractionError::Browser(_))));
    }

    #[tokio::test]
    async fn test_closed_flag_waits_for_close_to_finish() {
        let mut closed = false;
        let cancelled = timeout(
            Duration::from_millis(20),
            mark_after(std::future::pending::<()>(), &mut closed),
        )
        .await;
        assert!(cancelled.is_err());
        assert!(!closed);

        mark_after(async {}, &mut closed).await;
        assert!(closed);
    }

    #[tokio::test]
    async fn test_unreachable_webdriver_is_a_launch_error() {
        let result = with_session("http://127.0.0.1:1", true, |_client| async {
            Ok::<_, ExtractionError>(())
        })
        .await;

        assert!(matches!(result, Err(ExtractionError::Launch(_))));
    }
}
