pub mod static_page;
pub mod webdriver;

use crate::results::ScrapeResult;
use thiserror::Error;

pub use static_page::StaticExtractor;
pub use webdriver::{BrowserSession, WebDriverExtractor, with_session};

/// Fatal errors of an extraction attempt
///
/// A field that never shows up is not an error; it stays empty.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("failed to launch browser session: {0}")]
    Launch(#[from] fantoccini::error::NewSessionError),

    #[error("failed to navigate to {url}: {reason}")]
    Navigation { url: String, reason: String },

    #[error("browser command failed: {0}")]
    Browser(#[from] fantoccini::error::CmdError),

    #[error("failed to fetch page: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("page {url} answered with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("invalid page URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid CSS selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Loads a listing page and pulls its title, price and image URLs
pub trait Extractor: Send + Sync {
    /// Extract listing fields from the page at `url`
    fn extract(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<ScrapeResult, ExtractionError>> + Send;
}
