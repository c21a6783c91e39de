// Re-export modules
pub mod config;
pub mod extractors;
pub mod filter;
pub mod parsers;
pub mod persist;
pub mod results;
pub mod server;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::{AppConfig, EngineType};
pub use extractors::{ExtractionError, Extractor};
pub use persist::{PersistError, PersistOutcome, PersistReport, Persister};
pub use results::{ImageUrlSet, ScrapeResult};

use std::path::Path;

/// Result of one scrape-then-persist run
#[derive(Debug)]
pub struct ArchiveRun {
    /// Fields as extracted from the page
    pub listing: ScrapeResult,

    /// What made it to disk
    pub persisted: Result<PersistReport, PersistError>,
}

/// Extract a listing and archive it under `base`
///
/// Only extraction failures are returned as errors. Persistence problems are
/// logged and carried in [`ArchiveRun::persisted`] so the caller still gets
/// the listing.
pub async fn scrape_and_persist<E: Extractor>(
    extractor: &E,
    persister: &Persister,
    url: &str,
    base: &Path,
) -> Result<ArchiveRun, ExtractionError> {
    let listing = extractor.extract(url).await?;

    let persisted = persister.persist(&listing, base).await;
    match &persisted {
        Ok(report) if report.outcome() != PersistOutcome::Complete => {
            ::log::warn!(
                "Archive of {} is {:?}: {} of {} images saved",
                url,
                report.outcome(),
                report.saved.len(),
                report.saved.len() + report.skipped.len() + report.failed.len()
            );
        }
        Ok(_) => {}
        Err(e) => ::log::error!("Failed to persist {}: {}", url, e),
    }

    Ok(ArchiveRun { listing, persisted })
}
