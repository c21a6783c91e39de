use crate::filter::{ImageFilter, ImageFilterConfig};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid CSS selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("invalid image pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Which extraction engine serves scrape requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineType {
    /// Headless browser driven over WebDriver
    #[default]
    WebDriver,
    /// Plain HTTP fetch of the page source, no script execution
    Static,
}

/// DOM selectors describing where listing fields live on the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingSelectors {
    /// Element whose text is the listing title
    #[serde(default = "default_title_selector")]
    pub title: String,

    /// Element whose text is the displayed price
    #[serde(default = "default_price_selector")]
    pub price: String,

    /// Gallery `img` elements
    #[serde(default = "default_image_selector")]
    pub image: String,

    /// Attribute carrying the high-resolution source, preferred over `src`
    #[serde(default = "default_zoom_attribute")]
    pub zoom_attribute: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            title: default_title_selector(),
            price: default_price_selector(),
            image: default_image_selector(),
            zoom_attribute: default_zoom_attribute(),
        }
    }
}

impl ListingSelectors {
    /// Check that every selector parses
    pub fn validate(&self) -> Result<(), ConfigError> {
        for selector in [&self.title, &self.price, &self.image] {
            scraper::Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
                selector: selector.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port for the HTTP listener
    #[serde(default = "default_port")]
    pub port: u16,

    /// Extraction engine
    #[serde(default)]
    pub engine: EngineType,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Whether the browser runs without a window
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// How long to wait for each field selector to become visible
    #[serde(default = "default_field_timeout_secs")]
    pub field_timeout_secs: u64,

    /// Upper bound on waiting for `document.readyState` to reach "complete"
    #[serde(default = "default_page_load_timeout_secs")]
    pub page_load_timeout_secs: u64,

    /// Optional timeout for each image download
    #[serde(default)]
    pub download_timeout_secs: Option<u64>,

    /// Listing selectors
    #[serde(default)]
    pub selectors: ListingSelectors,

    /// Full-size image filtering
    #[serde(default)]
    pub images: ImageFilterConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            engine: EngineType::default(),
            webdriver_url: default_webdriver_url(),
            headless: default_headless(),
            field_timeout_secs: default_field_timeout_secs(),
            page_load_timeout_secs: default_page_load_timeout_secs(),
            download_timeout_secs: None,
            selectors: ListingSelectors::default(),
            images: ImageFilterConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Override settings from `PORT` and `WEBDRIVER_URL`
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    /// Override settings from variables looked up through `var`
    pub fn apply_vars<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = var("PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(_) => ::log::warn!("Ignoring invalid PORT value: {}", port),
            }
        }

        if let Some(webdriver_url) = var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                self.webdriver_url = webdriver_url;
            }
        }
    }

    /// Compile selectors and image patterns so bad values fail at startup
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.selectors.validate()?;
        ImageFilter::new(self.images.clone())?;
        Ok(())
    }

    pub fn field_timeout(&self) -> Duration {
        Duration::from_secs(self.field_timeout_secs)
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn download_timeout(&self) -> Option<Duration> {
        self.download_timeout_secs.map(Duration::from_secs)
    }
}

fn default_port() -> u16 {
    3000
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_headless() -> bool {
    true
}

fn default_field_timeout_secs() -> u64 {
    5
}

fn default_page_load_timeout_secs() -> u64 {
    30
}

fn default_title_selector() -> String {
    "div.vim.x-item-title h1.x-item-title__mainTitle span.ux-textspans.ux-textspans--BOLD"
        .to_string()
}

fn default_price_selector() -> String {
    "div.x-price-primary span.ux-textspans".to_string()
}

fn default_image_selector() -> String {
    "div.ux-image-carousel-item img, div.ux-image-grid.no-scrollbar img".to_string()
}

fn default_zoom_attribute() -> String {
    "data-zoom-src".to_string()
}
