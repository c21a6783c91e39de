use clap::Parser;
use gettio::config::{AppConfig, EngineType};
use gettio::extractors::{Extractor, StaticExtractor, WebDriverExtractor};
use gettio::persist::Persister;
use gettio::server::{self, AppState};
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

mod args;
use args::Args;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Pick up a .env file before anything reads the environment
    dotenv::dotenv().ok();

    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    // File settings first, then environment, then CLI flags
    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    config.apply_env();
    args.apply(&mut config);
    config.validate()?;

    ::log::info!("Starting listing scraper with the {:?} engine", config.engine);

    let persister = Persister::from_config(&config)?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    match config.engine {
        EngineType::WebDriver => {
            println!("Note: the webdriver engine requires a WebDriver server (e.g., ChromeDriver).");
            println!(
                "Set WEBDRIVER_URL environment variable if not using the default {}",
                config.webdriver_url
            );
            run(addr, WebDriverExtractor::new(&config), persister).await?;
        }
        EngineType::Static => {
            run(addr, StaticExtractor::new(&config)?, persister).await?;
        }
    }

    Ok(())
}

async fn run<E: Extractor + 'static>(
    addr: SocketAddr,
    extractor: E,
    persister: Persister,
) -> std::io::Result<()> {
    let state = Arc::new(AppState {
        extractor,
        persister,
    });
    server::serve(addr, state).await
}
