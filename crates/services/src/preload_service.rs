use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt, stream};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use study_core::model::{Activity, MediaHandle, MediaUrlPrefix, PreloadMap};

use crate::config::{ActivitySourceConfig, DEFAULT_MAX_CONCURRENT_FETCHES};
use crate::error::{PreloadError, TransportError};

/// Raw bytes of one downloaded media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMedia {
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Downloads a single media file in full.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// # Errors
    ///
    /// Returns `TransportError` if the file cannot be downloaded.
    async fn fetch(&self, url: &str) -> Result<FetchedMedia, TransportError>;
}

/// `MediaFetcher` that issues plain HTTP GET requests.
#[derive(Clone)]
pub struct HttpMediaFetcher {
    client: Client,
}

impl HttpMediaFetcher {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a fetcher whose requests share the API's `request_timeout`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Http` if the HTTP client cannot be built.
    pub fn from_config(config: &ActivitySourceConfig) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedMedia, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(TransportError::from_request)?;
        if !response.status().is_success() {
            return Err(TransportError::HttpStatus(response.status()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await.map_err(TransportError::from_request)?;

        Ok(FetchedMedia { content_type, body })
    }
}

/// Downloads every media file an activity references before it may be shown.
#[derive(Clone)]
pub struct MediaPreloader {
    fetcher: Arc<dyn MediaFetcher>,
    max_concurrent_fetches: usize,
}

impl MediaPreloader {
    #[must_use]
    pub fn new(fetcher: Arc<dyn MediaFetcher>) -> Self {
        Self {
            fetcher,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }

    #[must_use]
    pub fn with_max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.max_concurrent_fetches = limit.max(1);
        self
    }

    /// Fetches each distinct filename once and returns only when all are in memory.
    ///
    /// Fetches run concurrently up to the configured limit. The first failure
    /// drops the outstanding downloads and aborts the whole preload; nothing is
    /// retried here.
    ///
    /// # Errors
    ///
    /// Returns `PreloadError::Fetch` naming the first file that failed.
    pub async fn preload(
        &self,
        activity: &Activity,
        prefix: &MediaUrlPrefix,
    ) -> Result<PreloadMap, PreloadError> {
        let filenames = activity.media_filenames();
        debug!(files = filenames.len(), prefix = prefix.as_str(), "preloading activity media");

        let handles: Vec<MediaHandle> = stream::iter(filenames)
            .map(|filename| {
                let fetcher = Arc::clone(&self.fetcher);
                let url = prefix.resolve(&filename);
                async move {
                    match fetcher.fetch(&url).await {
                        Ok(media) => Ok(MediaHandle::new(filename, media.content_type, media.body)),
                        Err(source) => {
                            warn!(%filename, error = %source, "media fetch failed");
                            Err(PreloadError::Fetch { filename, source })
                        }
                    }
                }
            })
            .buffer_unordered(self.max_concurrent_fetches)
            .try_collect()
            .await?;

        let map: PreloadMap = handles.into_iter().collect();
        debug!(files = map.len(), bytes = map.total_bytes(), "activity media preloaded");
        Ok(map)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
