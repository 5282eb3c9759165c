use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("download failed: {status} for {url}")]
    Status { status: u16, url: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

/// Downloads a URL to local storage and returns the path.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    async fn download(&self, url: &str) -> Result<PathBuf, FetchError>;
}

/// HTTP fetcher writing into one directory. Each chain run gets its own
/// directory, so concurrent sessions cannot clobber each other's files.
pub struct HttpFileFetcher {
    http: reqwest::Client,
    dest_dir: PathBuf,
}

impl HttpFileFetcher {
    pub fn new(dest_dir: impl Into<PathBuf>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            dest_dir: dest_dir.into(),
        }
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }
}

/// Derive a local filename from the URL path, falling back to a fixed name
/// when the path has none.
fn filename_from_url(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "downloaded".to_string())
}

#[async_trait]
impl FileFetcher for HttpFileFetcher {
    async fn download(&self, url: &str) -> Result<PathBuf, FetchError> {
        let resp = self.http.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = resp.bytes().await?;

        tokio::fs::create_dir_all(&self.dest_dir).await?;
        let dest = self.dest_dir.join(filename_from_url(url));
        tokio::fs::write(&dest, &bytes).await?;

        info!(url, path = %dest.display(), bytes = bytes.len(), "Downloaded file");
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_comes_from_url_path() {
        assert_eq!(
            filename_from_url("https://quiz.example/files/data.csv?v=2"),
            "data.csv"
        );
        assert_eq!(filename_from_url("https://quiz.example/report.pdf"), "report.pdf");
    }

    #[test]
    fn empty_path_falls_back_to_fixed_name() {
        assert_eq!(filename_from_url("https://quiz.example/"), "downloaded");
        assert_eq!(filename_from_url("https://quiz.example"), "downloaded");
        assert_eq!(filename_from_url("not a url"), "downloaded");
    }
}
