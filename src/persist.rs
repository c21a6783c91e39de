use crate::config::AppConfig;
use crate::filter::ImageFilter;
use crate::results::ScrapeResult;
use crate::utils::folder_name_from_title;
use futures::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// Errors that stop a persistence run before any image is attempted
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("failed to create folder {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid image pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Why a single image was not saved
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// An image written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedImage {
    pub url: String,
    pub path: PathBuf,
    pub bytes: u64,
}

/// An image whose download or write failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDownload {
    pub url: String,
    pub reason: String,
}

/// Overall result of a persistence run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// Every full-size candidate was saved
    Complete,
    /// Some candidates were saved, others skipped or failed
    Partial,
    /// There were candidates and none of them was saved
    Failed,
}

/// What a persistence run wrote and what it had to leave out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistReport {
    /// Folder holding the text files and images
    pub folder: PathBuf,
    pub saved: Vec<SavedImage>,
    /// Candidates without a usable absolute URL
    pub skipped: Vec<String>,
    pub failed: Vec<FailedDownload>,
}

impl PersistReport {
    fn new(folder: PathBuf) -> Self {
        Self {
            folder,
            saved: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn outcome(&self) -> PersistOutcome {
        let attempted = self.saved.len() + self.skipped.len() + self.failed.len();
        if self.skipped.is_empty() && self.failed.is_empty() {
            PersistOutcome::Complete
        } else if attempted > 0 && self.saved.is_empty() {
            PersistOutcome::Failed
        } else {
            PersistOutcome::Partial
        }
    }
}

/// Writes a scrape result and its full-size images into a folder
#[derive(Debug)]
pub struct Persister {
    client: Client,
    filter: ImageFilter,
}

impl Persister {
    pub fn new(client: Client, filter: ImageFilter) -> Self {
        Self { client, filter }
    }

    /// Build a persister from application configuration
    pub fn from_config(config: &AppConfig) -> Result<Self, PersistError> {
        let mut builder = Client::builder();
        if let Some(limit) = config.download_timeout() {
            builder = builder.timeout(limit);
        }
        let filter = ImageFilter::new(config.images.clone())?;

        Ok(Self::new(builder.build()?, filter))
    }

    /// Persist `result` under `base`
    ///
    /// Creates `base/<folder>`, writes `title.txt` and `price.txt`, then
    /// downloads each full-size image one after another. A failed image is
    /// recorded in the report and does not stop the others.
    pub async fn persist(
        &self,
        result: &ScrapeResult,
        base: &Path,
    ) -> Result<PersistReport, PersistError> {
        let folder = base.join(folder_name_from_title(&result.title));

        tokio::fs::create_dir_all(&folder)
            .await
            .map_err(|source| PersistError::CreateDir {
                path: folder.clone(),
                source,
            })?;

        write_text(&folder.join("title.txt"), &result.title).await?;
        write_text(&folder.join("price.txt"), &result.price).await?;

        let mut report = PersistReport::new(folder);
        let candidates = self.filter.full_size_candidates(&result.image_urls);

        for (index, url) in candidates.into_iter().enumerate() {
            let Some(parsed) = self.filter.downloadable_url(&url) else {
                ::log::error!("Invalid URL: {}", url);
                report.skipped.push(url);
                continue;
            };

            let path = report.folder.join(format!("image_{}.jpg", index));
            match self.download(parsed, &path).await {
                Ok(bytes) => {
                    ::log::debug!("Saved {} ({} bytes) to {}", url, bytes, path.display());
                    report.saved.push(SavedImage { url, path, bytes });
                }
                Err(e) => {
                    ::log::error!("Error downloading image from {}: {}", url, e);
                    report.failed.push(FailedDownload {
                        url,
                        reason: e.to_string(),
                    });
                }
            }
        }

        ::log::info!(
            "Persisted {} to {}: {} saved, {} skipped, {} failed ({:?})",
            result.title,
            report.folder.display(),
            report.saved.len(),
            report.skipped.len(),
            report.failed.len(),
            report.outcome()
        );

        Ok(report)
    }

    /// Stream one image to `path`, returning the number of bytes written
    ///
    /// On failure `path` is removed, whether it holds a truncated body or an
    /// image saved by an earlier run.
    async fn download(&self, url: url::Url, path: &Path) -> Result<u64, DownloadError> {
        let result = self.fetch_to_file(url, path).await;

        if result.is_err() {
            match tokio::fs::remove_file(path).await {
                Ok(()) => ::log::debug!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => ::log::warn!("Could not remove {}: {}", path.display(), e),
            }
        }

        result
    }

    async fn fetch_to_file(&self, url: url::Url, path: &Path) -> Result<u64, DownloadError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        stream_to_file(response, path).await
    }
}

async fn stream_to_file(response: reqwest::Response, path: &Path) -> Result<u64, DownloadError> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}

async fn write_text(path: &Path, contents: &str) -> Result<(), PersistError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| PersistError::Write {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(saved: usize, skipped: usize, failed: usize) -> PersistReport {
        let mut report = PersistReport::new(PathBuf::from("/tmp/out/x"));
        for i in 0..saved {
            report.saved.push(SavedImage {
                url: format!("https://x/{i}"),
                path: PathBuf::from(format!("/tmp/out/x/image_{i}.jpg")),
                bytes: 1,
            });
        }
        report.skipped.extend((0..skipped).map(|i| format!("bad{i}")));
        report.failed.extend((0..failed).map(|i| FailedDownload {
            url: format!("https://y/{i}"),
            reason: "404".to_string(),
        }));
        report
    }

    #[test]
    fn test_outcome() {
        assert_eq!(report(0, 0, 0).outcome(), PersistOutcome::Complete);
        assert_eq!(report(3, 0, 0).outcome(), PersistOutcome::Complete);
        assert_eq!(report(2, 0, 1).outcome(), PersistOutcome::Partial);
        assert_eq!(report(2, 1, 0).outcome(), PersistOutcome::Partial);
        assert_eq!(report(0, 1, 2).outcome(), PersistOutcome::Failed);
    }

    #[tokio::test]
    async fn test_text_files_without_images() {
        let dir = tempfile::tempdir().expect("tempdir");
        let persister = Persister::new(Client::new(), ImageFilter::default());
        let result = ScrapeResult::new("Brass Telescope".into(), "£80".into(), Default::default());

        let report = persister.persist(&result, dir.path()).await.unwrap();

        assert_eq!(report.folder, dir.path().join("Brass_Telescope"));
        assert_eq!(report.outcome(), PersistOutcome::Complete);
        assert_eq!(
            std::fs::read_to_string(report.folder.join("title.txt")).unwrap(),
            "Brass Telescope"
        );
        assert_eq!(std::fs::read_to_string(report.folder.join("price.txt")).unwrap(), "£80");
    }

    #[tokio::test]
    async fn test_invalid_urls_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let persister = Persister::new(Client::new(), ImageFilter::default());
        let result = ScrapeResult::new(
            "Lens".into(),
            String::new(),
            ["/relative/s-l1600.jpg", "ftp://host/s-l1600.jpg"].into_iter().collect(),
        );

        let report = persister.persist(&result, dir.path()).await.unwrap();

        assert!(report.saved.is_empty());
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.outcome(), PersistOutcome::Failed);
        assert!(!report.folder.join("image_0.jpg").exists());
    }

    #[tokio::test]
    async fn test_unwritable_base_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a directory").expect("write");

        let persister = Persister::new(Client::new(), ImageFilter::default());
        let result = ScrapeResult::new("Lens Cap".into(), String::new(), Default::default());

        let err = persister.persist(&result, &blocker).await.unwrap_err();
        assert!(matches!(err, PersistError::CreateDir { .. }));
    }
}
