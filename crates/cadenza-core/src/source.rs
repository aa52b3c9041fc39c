//! Source reference classification
//!
//! Raw tool input names an audio source as a single string. Classification is
//! tiered: an existing filesystem path wins, then known video-platform hosts,
//! then any other well-formed http(s) URL.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use url::Url;

/// Hosts routed through the video extraction backend instead of a direct download
const VIDEO_HOSTS: &[&str] = &["youtube.com", "youtu.be", "vimeo.com"];

/// A classified audio source reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceReference {
    /// Existing file on the local filesystem
    LocalPath(PathBuf),
    /// Direct HTTP(S) download
    RemoteUrl(String),
    /// Video-platform page whose audio must be extracted
    VideoLink(String),
}

impl SourceReference {
    /// Classify a raw input string
    pub fn classify(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::UnresolvableSource("empty input".to_string()));
        }

        let path = Path::new(trimmed);
        if path.exists() {
            return Ok(SourceReference::LocalPath(path.to_path_buf()));
        }

        match Url::parse(trimmed) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                if url.host_str().is_some_and(is_video_host) {
                    Ok(SourceReference::VideoLink(trimmed.to_string()))
                } else {
                    Ok(SourceReference::RemoteUrl(trimmed.to_string()))
                }
            }
            _ => Err(Error::UnresolvableSource(format!(
                "{trimmed}: not an existing file and not an http(s) URL"
            ))),
        }
    }

    /// The remote URL for fetchable variants
    pub fn url(&self) -> Option<&str> {
        match self {
            SourceReference::LocalPath(_) => None,
            SourceReference::RemoteUrl(url) | SourceReference::VideoLink(url) => Some(url),
        }
    }

    /// True for variants that require a network fetch
    pub fn is_remote(&self) -> bool {
        !matches!(self, SourceReference::LocalPath(_))
    }
}

fn is_video_host(host: &str) -> bool {
    VIDEO_HOSTS
        .iter()
        .any(|known| host == *known || host.ends_with(&format!(".{known}")))
}
