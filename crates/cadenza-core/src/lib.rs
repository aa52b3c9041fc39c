//! Cadenza Core - Audio source resolution library
//!
//! This crate turns heterogeneous audio references into decodable local files:
//! - Reference classification (local path / direct URL / video-platform link)
//! - Remote fetching with bounded timeouts and a single transient retry
//! - Audio-only extraction from video platforms via yt-dlp
//! - Process-lifetime asset caching with at-most-one fetch per reference
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     Cadenza Core                        │
//! ├─────────────────────────────────────────────────────────┤
//! │                                                         │
//! │   ┌──────────────┐         ┌──────────────┐             │
//! │   │    Source    │         │    Asset     │             │
//! │   │  Classifier  │         │    Cache     │             │
//! │   └──────┬───────┘         └──────┬───────┘             │
//! │          │                        │                     │
//! │          └────────┬───────────────┘                     │
//! │                   │                                     │
//! │            ┌──────┴──────┐        ┌──────────────┐      │
//! │            │   Source    │───────►│    Remote    │      │
//! │            │  Resolver   │        │   Fetcher    │      │
//! │            └──────┬──────┘        └──────────────┘      │
//! │                   │                                     │
//! │                   ▼                                     │
//! │            canonical local file                         │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod error;
pub mod fetch;
pub mod resolver;
pub mod source;

pub use cache::{cache_key, AssetCache};
pub use error::{Error, Result};
pub use fetch::{FetchConfig, Fetcher, HttpFetcher};
pub use resolver::{ResolvedAsset, SourceResolver};
pub use source::SourceReference;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
