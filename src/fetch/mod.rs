//! Network access with an optional content cache in front of it.
//!
//! Every remote document (annotation lists, manifests, `info.json` files and
//! images) goes through a [`Fetcher`]. With caching enabled, a URL is fetched
//! from the network at most once across runs.

mod cache;

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::TrainsetError;

pub use cache::{cache_key, CacheStore, FsCache, MemoryCache};

/// Response bodies larger than this are rejected.
const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

/// Something that can retrieve the bytes behind a URL.
pub trait Transport {
    /// Returns the body of a successful (2xx) response.
    fn get(&self, url: &str) -> Result<Vec<u8>, TrainsetError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str) -> Result<Vec<u8>, TrainsetError> {
        (**self).get(url)
    }
}

/// Blocking HTTP(S) transport.
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: config.into(),
        }
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<Vec<u8>, TrainsetError> {
        let fetch_error = |message: String| TrainsetError::Fetch {
            url: url.to_string(),
            message,
        };

        // Non-2xx statuses surface as errors from `call`.
        let mut response = self
            .agent
            .get(url)
            .call()
            .map_err(|source| fetch_error(source.to_string()))?;
        response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_vec()
            .map_err(|source| fetch_error(source.to_string()))
    }
}

/// A transport with an optional cache in front of it.
pub struct Fetcher<'a> {
    transport: Box<dyn Transport + 'a>,
    cache: Option<Box<dyn CacheStore + 'a>>,
}

impl<'a> Fetcher<'a> {
    pub fn new(transport: impl Transport + 'a) -> Self {
        Self {
            transport: Box::new(transport),
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: impl CacheStore + 'a) -> Self {
        self.cache = Some(Box::new(cache));
        self
    }

    /// Attaches an on-disk cache, or runs uncached if the directory cannot be
    /// created.
    pub fn with_fs_cache(self, dir: &std::path::Path) -> Self {
        match FsCache::open(dir) {
            Ok(cache) => {
                debug!(dir = %dir.display(), "using fetch cache");
                self.with_cache(cache)
            }
            Err(err) => {
                warn!(error = %err, "unable to create cache folder, caching disabled");
                self
            }
        }
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Returns the bytes for `url`, from the cache when present.
    pub fn get(&self, url: &str) -> Result<Vec<u8>, TrainsetError> {
        let key = self.cache.as_ref().map(|_| cache_key(url));

        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(bytes) = cache.read(key) {
                debug!(url, "fetched from cache");
                return Ok(bytes);
            }
        }

        info!(url, "fetching");
        let bytes = self.transport.get(url)?;

        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Err(err) = cache.write(key, &bytes) {
                warn!(url, error = %err, "failed to write cache entry");
            }
        }
        Ok(bytes)
    }

    /// Fetches `url` and parses it as JSON.
    pub fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, TrainsetError> {
        let bytes = self.get(url)?;
        serde_json::from_slice(&bytes).map_err(|source| TrainsetError::Fetch {
            url: url.to_string(),
            message: format!("invalid JSON: {source}"),
        })
    }
}
