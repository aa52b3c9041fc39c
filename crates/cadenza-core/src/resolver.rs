//! Source resolution
//!
//! Turns a raw reference string into a canonical local file. Local paths are
//! verified in place; remote references go through the cache so each distinct
//! reference is fetched at most once per process run.

use crate::{cache_key, AssetCache, Error, Fetcher, Result, SourceReference};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// A canonical, decodable local audio file produced by resolution
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedAsset {
    /// Fully-downloaded local file
    pub canonical_path: PathBuf,
    /// Stable key for the originating reference
    pub cache_key: String,
    /// True when the file lives in the cache directory and is removed at
    /// process exit
    pub is_temporary: bool,
}

/// Resolves heterogeneous source references into local files
pub struct SourceResolver {
    cache: Arc<AssetCache>,
    fetcher: Arc<dyn Fetcher>,
}

impl SourceResolver {
    /// Create a resolver over an injected cache and fetcher
    pub fn new(cache: Arc<AssetCache>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { cache, fetcher }
    }

    /// Resolve a raw input string to a canonical local file
    #[instrument(skip(self))]
    pub async fn resolve(&self, input: &str) -> Result<ResolvedAsset> {
        let reference = SourceReference::classify(input)?;
        let key = cache_key(input.trim());

        match reference {
            SourceReference::LocalPath(path) => self.resolve_local(&path, key),
            remote => {
                let fetcher = Arc::clone(&self.fetcher);
                let dir = self.cache.dir().to_path_buf();
                let fetch_key = key.clone();

                info!(reference = input, "Resolving remote source");
                let path = self
                    .cache
                    .get_or_fetch(&key, move || async move {
                        fetcher.fetch(&remote, &fetch_key, &dir).await
                    })
                    .await?;

                Ok(ResolvedAsset {
                    canonical_path: path,
                    cache_key: key,
                    is_temporary: true,
                })
            }
        }
    }

    fn resolve_local(&self, path: &Path, key: String) -> Result<ResolvedAsset> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| Error::UnresolvableSource(format!("{}: {e}", path.display())))?;

        if metadata.len() == 0 {
            return Err(Error::UnresolvableSource(format!(
                "{}: file is empty",
                path.display()
            )));
        }

        debug!(path = %path.display(), bytes = metadata.len(), "Resolved local file");
        Ok(ResolvedAsset {
            canonical_path: path.to_path_buf(),
            cache_key: key,
            is_temporary: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingFetcher {
        calls: AtomicUsize,
    }

    impl CountingFetcher {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Fetcher for CountingFetcher {
        async fn fetch(
            &self,
            _reference: &SourceReference,
            cache_key: &str,
            dest_dir: &Path,
        ) -> Result<PathBuf> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let path = dest_dir.join(format!("{cache_key}.mp3"));
            std::fs::write(&path, b"fake audio")
                .map_err(|e| Error::UnresolvableSource(e.to_string()))?;
            Ok(path)
        }
    }

    struct FailingFetcher;

    #[async_trait::async_trait]
    impl Fetcher for FailingFetcher {
        async fn fetch(
            &self,
            reference: &SourceReference,
            _cache_key: &str,
            _dest_dir: &Path,
        ) -> Result<PathBuf> {
            Err(Error::Extraction {
                url: reference.url().unwrap_or("").to_string(),
                diagnostic: "no audio stream".to_string(),
            })
        }
    }

    fn test_resolver(
        dir: &Path,
        fetcher: Arc<dyn Fetcher>,
    ) -> (Arc<AssetCache>, SourceResolver) {
        let cache = Arc::new(AssetCache::new(dir).unwrap());
        let resolver = SourceResolver::new(Arc::clone(&cache), fetcher);
        (cache, resolver)
    }

    #[tokio::test]
    async fn test_local_file_resolves_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"riff data").unwrap();

        let fetcher = Arc::new(CountingFetcher::default());
        let (_cache, resolver) = test_resolver(dir.path(), fetcher.clone());

        let asset = resolver.resolve(file.path().to_str().unwrap()).await.unwrap();
        assert_eq!(asset.canonical_path, file.path());
        assert!(!asset.is_temporary);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_local_file_is_unresolvable() {
        let dir = tempfile::tempdir().unwrap();
        let file = tempfile::NamedTempFile::new().unwrap();

        let fetcher = Arc::new(CountingFetcher::default());
        let (_cache, resolver) = test_resolver(dir.path(), fetcher);

        let err = resolver
            .resolve(file.path().to_str().unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "UnresolvableSourceError");
    }

    #[tokio::test]
    async fn test_missing_path_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(CountingFetcher::default());
        let (cache, resolver) = test_resolver(dir.path(), fetcher.clone());

        let err = resolver.resolve("/no/such/file.wav").await.unwrap_err();
        assert_eq!(err.kind(), "UnresolvableSourceError");
        assert_eq!(fetcher.calls(), 0);
        assert!(cache.is_empty().await);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_repeat_resolution_fetches_once() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(CountingFetcher::default());
        let (_cache, resolver) = test_resolver(dir.path(), fetcher.clone());

        let url = "https://example.com/track.mp3";
        let first = resolver.resolve(url).await.unwrap();
        let second = resolver.resolve(url).await.unwrap();

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(first.canonical_path, second.canonical_path);
        assert_eq!(first.cache_key, second.cache_key);
        assert!(first.is_temporary);
        assert!(second.is_temporary);
    }

    #[tokio::test]
    async fn test_distinct_references_fetch_separately() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(CountingFetcher::default());
        let (_cache, resolver) = test_resolver(dir.path(), fetcher.clone());

        let a = resolver
            .resolve("https://example.com/one.mp3")
            .await
            .unwrap();
        let b = resolver
            .resolve("https://example.com/two.mp3")
            .await
            .unwrap();

        assert_eq!(fetcher.calls(), 2);
        assert_ne!(a.cache_key, b.cache_key);
        assert_ne!(a.canonical_path, b.canonical_path);
    }

    #[tokio::test]
    async fn test_video_links_go_through_the_fetcher() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(CountingFetcher::default());
        let (_cache, resolver) = test_resolver(dir.path(), fetcher.clone());

        let asset = resolver
            .resolve("https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap();
        assert_eq!(fetcher.calls(), 1);
        assert!(asset.is_temporary);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, resolver) = test_resolver(dir.path(), Arc::new(FailingFetcher));

        let url = "https://youtu.be/gone";
        let first = resolver.resolve(url).await.unwrap_err();
        assert_eq!(first.kind(), "ExtractionError");
        assert!(cache.is_empty().await);

        let second = resolver.resolve(url).await.unwrap_err();
        assert_eq!(second.kind(), "ExtractionError");
    }
}
