//! Single-tile fetching with retry.
//!
//! Key features:
//! - Per-attempt timeout around the transport call
//! - Linear backoff between attempts (`backoff_base * attempt`)
//! - Decode failures retried the same way as network failures
//! - Decode and normalization on the blocking pool
//!
//! The transport sits behind [`TileSource`] so the retry policy can be
//! driven by a simulated endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use compositor::TileRaster;
use mosaic_common::{FetchError, TileFailure, TileRequest, DEFAULT_TILE_EDGE};
use reqwest::Client;
use tracing::{debug, error, info, instrument, warn};

/// Retry, timeout and concurrency settings for tile fetching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Total tries per tile, including the first
    pub max_attempts: u32,
    /// Sleep before retry `n` is `backoff_base * n`
    pub backoff_base: Duration,
    /// Upper bound on a single attempt
    pub request_timeout: Duration,
    /// Expected tile width and height in pixels
    pub tile_edge: u32,
    /// Cap on in-flight fetches; `None` means one per tile
    pub max_concurrent: Option<usize>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: Duration::from_millis(1500),
            request_timeout: Duration::from_secs(30),
            tile_edge: DEFAULT_TILE_EDGE,
            max_concurrent: None,
        }
    }
}

impl FetchConfig {
    /// Delay after failed attempt `attempt` (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base * attempt
    }

    /// Concurrency to use for a grid of `tile_count` tiles.
    pub fn concurrency_for(&self, tile_count: usize) -> usize {
        self.max_concurrent
            .unwrap_or(tile_count)
            .min(tile_count)
            .max(1)
    }
}

/// Transport that returns the raw body of a tile URL.
#[async_trait]
pub trait TileSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// HTTP transport backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpTileSource {
    client: Client,
    request_timeout: Duration,
}

impl HttpTileSource {
    pub fn new(request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(request_timeout.min(Duration::from_secs(10)))
            .pool_max_idle_per_host(16)
            .tcp_nodelay(true)
            .user_agent(concat!("snapshotter/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            request_timeout,
        })
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.request_timeout)
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Connection(err.to_string())
        }
    }
}

#[async_trait]
impl TileSource for HttpTileSource {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        // Whole body in memory before decoding.
        response.bytes().await.map_err(|e| self.classify(e))
    }
}

/// Fetches one tile, retrying until it decodes or attempts run out.
#[derive(Clone)]
pub struct TileFetcher {
    source: Arc<dyn TileSource>,
    config: FetchConfig,
}

impl TileFetcher {
    pub fn new(source: Arc<dyn TileSource>, config: FetchConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetch and decode a tile.
    ///
    /// Returns the normalized raster, or the terminal failure carrying the
    /// last error once `max_attempts` tries have failed.
    #[instrument(skip(self, request), fields(tile_x = request.coord.x, tile_y = request.coord.y))]
    pub async fn fetch(&self, request: &TileRequest) -> Result<TileRaster, TileFailure> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match self.attempt(&request.url).await {
                Ok(raster) => {
                    if attempt > 1 {
                        info!(attempt = attempt, "Tile fetched after retry");
                    } else {
                        debug!("Tile fetched");
                    }
                    return Ok(raster);
                }
                Err(e) => {
                    let retrying = attempt < max_attempts;
                    let delay = self.config.backoff_delay(attempt);
                    warn!(
                        error = %e,
                        class = e.class(),
                        attempt = attempt,
                        max_attempts = max_attempts,
                        delay_ms = if retrying { delay.as_millis() as u64 } else { 0 },
                        "Tile fetch attempt failed"
                    );
                    last_error = Some(e);

                    if retrying {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        let failure = TileFailure {
            coord: request.coord,
            attempts: max_attempts,
            last_error: last_error
                .unwrap_or_else(|| FetchError::Connection("no attempt was made".into())),
        };
        error!(error = %failure.last_error, attempts = max_attempts, "Tile fetch failed");
        Err(failure)
    }

    /// One transport call plus decode, bounded by the request timeout.
    async fn attempt(&self, url: &str) -> Result<TileRaster, FetchError> {
        let timeout = self.config.request_timeout;
        let body = tokio::time::timeout(timeout, self.source.fetch(url))
            .await
            .map_err(|_| FetchError::Timeout(timeout))??;

        let tile_edge = self.config.tile_edge;
        tokio::task::spawn_blocking(move || TileRaster::decode(&body, tile_edge))
            .await
            .map_err(|e| FetchError::Decode(format!("decode task failed: {}", e)))?
    }
}
