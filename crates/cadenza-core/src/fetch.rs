//! Remote fetching
//!
//! Downloads direct URLs and extracts audio from video platforms into the
//! cache directory. Downloads stream to a staging file and land under their
//! final name only after the transfer completes; staging files are removed on
//! every failure path. Transient network failures get exactly one retry;
//! HTTP status errors and extraction failures are terminal.

use crate::{Error, Result, SourceReference};
use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Extensions carried over from the URL path; anything else becomes mp3
const KNOWN_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "flac", "ogg", "oga", "m4a", "aac", "opus", "mp4", "webm",
];

/// Fetch timeouts and client settings
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Wall-clock bound for a single download attempt
    pub download_timeout: Duration,
    /// Wall-clock bound for a video extraction run
    pub extract_timeout: Duration,
    /// User agent presented to remote servers
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            download_timeout: Duration::from_secs(120),
            extract_timeout: Duration::from_secs(300),
            user_agent: format!("cadenza/{}", crate::VERSION),
        }
    }
}

/// Produces a fully-downloaded local file for a remote reference
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `reference` into `dest_dir`, named by `cache_key`
    async fn fetch(
        &self,
        reference: &SourceReference,
        cache_key: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf>;
}

/// Production fetcher: reqwest for direct URLs, yt-dlp for video links
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a fetcher with the given timeouts
    pub fn new(config: FetchConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(config.download_timeout)
                .user_agent(config.user_agent.clone())
                .build()
                .expect("Failed to create HTTP client"),
            config,
        }
    }

    #[instrument(skip(self, dest_dir))]
    async fn download(&self, url: &str, cache_key: &str, dest_dir: &Path) -> Result<PathBuf> {
        let extension = extension_for_url(url);
        let final_path = dest_dir.join(format!("{cache_key}.{extension}"));

        match self.download_once(url, &final_path, dest_dir, cache_key).await {
            Err(e) if e.is_transient() => {
                warn!(url, error = %e, "Transient download failure, retrying once");
                self.download_once(url, &final_path, dest_dir, cache_key).await
            }
            other => other,
        }
    }

    async fn download_once(
        &self,
        url: &str,
        final_path: &Path,
        dest_dir: &Path,
        cache_key: &str,
    ) -> Result<PathBuf> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Download {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::DownloadRejected {
                url: url.to_string(),
                reason: format!("HTTP status {status}"),
            });
        }

        if let Some(content_type) = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !is_audio_like(content_type) {
                return Err(Error::DownloadRejected {
                    url: url.to_string(),
                    reason: format!("content type {content_type} is not audio"),
                });
            }
        }

        if response.content_length() == Some(0) {
            return Err(Error::DownloadRejected {
                url: url.to_string(),
                reason: "empty response body".to_string(),
            });
        }

        let staging = StagingGuard::new(
            dest_dir.join(format!("{cache_key}.{}.part", uuid::Uuid::new_v4().simple())),
        );

        let mut file =
            tokio::fs::File::create(staging.path())
                .await
                .map_err(|e| Error::DownloadRejected {
                    url: url.to_string(),
                    reason: format!("cannot create staging file: {e}"),
                })?;

        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await.map_err(|e| Error::Download {
            url: url.to_string(),
            source: e,
        })? {
            written += chunk.len() as u64;
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::DownloadRejected {
                    url: url.to_string(),
                    reason: format!("cannot write staging file: {e}"),
                })?;
        }
        file.flush().await.map_err(|e| Error::DownloadRejected {
            url: url.to_string(),
            reason: format!("cannot write staging file: {e}"),
        })?;
        drop(file);

        if written == 0 {
            return Err(Error::DownloadRejected {
                url: url.to_string(),
                reason: "empty response body".to_string(),
            });
        }

        staging
            .commit(final_path)
            .map_err(|e| Error::DownloadRejected {
                url: url.to_string(),
                reason: format!("cannot finalize download: {e}"),
            })?;

        info!(url, bytes = written, path = %final_path.display(), "Download complete");
        Ok(final_path.to_path_buf())
    }

    #[instrument(skip(self, dest_dir))]
    async fn extract(&self, url: &str, cache_key: &str, dest_dir: &Path) -> Result<PathBuf> {
        let final_path = dest_dir.join(format!("{cache_key}.m4a"));
        let template = dest_dir.join(format!("{cache_key}.%(ext)s"));

        info!(url, "Extracting audio stream");

        let invocation = tokio::process::Command::new("yt-dlp")
            .args([
                "--no-playlist",
                "-f",
                "bestaudio/best",
                "-x",
                "--audio-format",
                "m4a",
                "-o",
                &template.to_string_lossy(),
                url,
            ])
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.config.extract_timeout, invocation)
            .await
            .map_err(|_| Error::Extraction {
                url: url.to_string(),
                diagnostic: format!(
                    "timed out after {}s",
                    self.config.extract_timeout.as_secs()
                ),
            })?
            .map_err(|e| Error::Extraction {
                url: url.to_string(),
                diagnostic: format!("yt-dlp not found ({e}). Please install yt-dlp."),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Extraction {
                url: url.to_string(),
                diagnostic: stderr.trim().to_string(),
            });
        }

        let size = tokio::fs::metadata(&final_path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if size == 0 {
            let _ = tokio::fs::remove_file(&final_path).await;
            return Err(Error::Extraction {
                url: url.to_string(),
                diagnostic: "backend produced no audio file".to_string(),
            });
        }

        info!(url, bytes = size, path = %final_path.display(), "Extraction complete");
        Ok(final_path)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        reference: &SourceReference,
        cache_key: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf> {
        match reference {
            SourceReference::RemoteUrl(url) => self.download(url, cache_key, dest_dir).await,
            SourceReference::VideoLink(url) => self.extract(url, cache_key, dest_dir).await,
            SourceReference::LocalPath(path) => Err(Error::UnresolvableSource(format!(
                "{} is local and needs no fetch",
                path.display()
            ))),
        }
    }
}

/// Scoped ownership of an in-flight staging file. The file is removed on drop
/// unless committed to its final name.
struct StagingGuard {
    path: PathBuf,
    committed: bool,
}

impl StagingGuard {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            committed: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn commit(mut self, final_path: &Path) -> std::io::Result<()> {
        std::fs::rename(&self.path, final_path)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed staging file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to remove staging file")
            }
        }
    }
}

fn extension_for_url(url: &str) -> &'static str {
    let ext = Url::parse(url).ok().and_then(|u| {
        u.path()
            .rsplit('/')
            .next()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, e)| e.to_ascii_lowercase())
    });
    match ext {
        Some(e) => KNOWN_EXTENSIONS
            .iter()
            .find(|known| **known == e)
            .copied()
            .unwrap_or("mp3"),
        None => "mp3",
    }
}

fn is_audio_like(content_type: &str) -> bool {
    let lowered = content_type.to_ascii_lowercase();
    !(lowered.starts_with("text/") || lowered.starts_with("image/") || lowered.contains("html"))
}
