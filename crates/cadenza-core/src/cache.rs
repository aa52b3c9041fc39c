//! Process-lifetime asset cache
//!
//! Within one process run each distinct remote reference is fetched at most
//! once. Keys are derived from the reference string, values are paths to
//! fully-downloaded files under the cache directory. Entries are never
//! evicted mid-run; owned files are removed when the cache is dropped. The
//! cache is an injectable service, constructed once at startup and shared by
//! handle, so tests can substitute a fresh instance.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use ring::digest;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Stable, filename-safe cache key for a reference string
pub fn cache_key(reference: &str) -> String {
    let digest = digest::digest(&digest::SHA256, reference.as_bytes());
    URL_SAFE_NO_PAD.encode(digest.as_ref())
}

/// Process-wide map from cache key to a fully-downloaded local file
pub struct AssetCache {
    dir: PathBuf,
    entries: Mutex<HashMap<String, PathBuf>>,
}

impl AssetCache {
    /// Create a cache rooted at `dir`, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            entries: Mutex::new(HashMap::new()),
        })
    }

    /// Cache directory from `CADENZA_CACHE_DIR`, falling back to the system
    /// temp directory
    pub fn default_dir() -> PathBuf {
        std::env::var_os("CADENZA_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("cadenza-cache"))
    }

    /// Directory holding staged and cached files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of cached entries
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// True when no entry has been cached yet
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Return the cached path for `key`, or run `fetch` and cache its result.
    ///
    /// The entry lock is held across the fetch, so overlapping requests for
    /// the same key can never trigger duplicate downloads. Failed fetches
    /// insert nothing.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> crate::Result<PathBuf>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = crate::Result<PathBuf>>,
    {
        let mut entries = self.entries.lock().await;

        if let Some(path) = entries.get(key) {
            debug!(key, path = %path.display(), "Cache hit");
            return Ok(path.clone());
        }

        debug!(key, "Cache miss, fetching");
        let path = fetch().await?;
        entries.insert(key.to_string(), path.clone());
        Ok(path)
    }
}

impl Drop for AssetCache {
    fn drop(&mut self) {
        let entries = self.entries.get_mut();
        for (key, path) in entries.drain() {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(key = %key, path = %path.display(), error = %e, "Failed to remove cached file");
            } else {
                debug!(key = %key, "Removed cached file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_cache_key_is_stable() {
        let a = cache_key("https://example.com/track.mp3");
        let b = cache_key("https://example.com/track.mp3");
        assert_eq!(a, b);
    }

    #[test]
    fn test_cache_key_distinguishes_references() {
        let a = cache_key("https://example.com/track.mp3");
        let b = cache_key("https://example.com/other.mp3");
        assert_ne!(a, b);
    }

    #[test]
    fn test_cache_key_is_filename_safe() {
        let key = cache_key("https://example.com/some path?query=1&x=/\\");
        assert!(!key.is_empty());
        assert!(key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[tokio::test]
    async fn test_get_or_fetch_runs_fetch_once_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AssetCache::new(dir.path()).unwrap();
        let calls = AtomicUsize::new(0);

        let target = dir.path().join("fetched.mp3");
        std::fs::write(&target, b"audio").unwrap();

        for _ in 0..3 {
            let path = cache
                .get_or_fetch("key-a", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(target.clone())
                })
                .await
                .unwrap();
            assert_eq!(path, target);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_inserts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AssetCache::new(dir.path()).unwrap();

        let result = cache
            .get_or_fetch("key-b", || async {
                Err(Error::UnresolvableSource("boom".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_drop_removes_owned_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("owned.mp3");
        std::fs::write(&target, b"audio").unwrap();

        {
            let cache = AssetCache::new(dir.path()).unwrap();
            cache
                .get_or_fetch("key-c", || async { Ok(target.clone()) })
                .await
                .unwrap();
        }

        assert!(!target.exists());
    }
}
