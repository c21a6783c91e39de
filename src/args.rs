use clap::{Parser, ValueEnum};
use gettio::config::{AppConfig, EngineType};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gettio")]
#[command(about = "HTTP service that scrapes a product listing and archives it to disk")]
#[command(version)]
pub struct Args {
    /// Path to a JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Port for the HTTP listener (overrides PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Extraction engine
    #[arg(short, long, value_enum)]
    pub engine: Option<EngineArg>,

    /// WebDriver server URL (overrides WEBDRIVER_URL)
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Seconds to wait for each listing field to appear
    #[arg(long)]
    pub field_timeout: Option<u64>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub headed: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum EngineArg {
    Webdriver,
    Static,
}

/// Convert from CLI engine argument to the configured engine type
pub fn convert_engine(arg: EngineArg) -> EngineType {
    match arg {
        EngineArg::Webdriver => EngineType::WebDriver,
        EngineArg::Static => EngineType::Static,
    }
}

impl Args {
    /// Apply command-line overrides on top of file and environment settings
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(engine) = self.engine {
            config.engine = convert_engine(engine);
        }
        if let Some(url) = &self.webdriver_url {
            config.webdriver_url = url.clone();
        }
        if let Some(secs) = self.field_timeout {
            config.field_timeout_secs = secs;
        }
        if self.headed {
            config.headless = false;
        }
    }
}
