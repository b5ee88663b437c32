//! Concurrent fetching of a whole tile grid.

use std::time::Instant;

use compositor::TileRaster;
use futures::stream::{self, StreamExt};
use mosaic_common::{TileFailure, TileRequest};
use tracing::info;

use crate::TileFetcher;

/// Result of fetching one tile, tied to its request.
#[derive(Debug)]
pub struct FetchOutcome {
    pub request: TileRequest,
    pub result: Result<TileRaster, TileFailure>,
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Fetch every request with bounded concurrency and wait for all of them.
///
/// One outcome per request, sorted by grid position (row-major). A failing
/// tile never cancels the others.
pub async fn fetch_all(fetcher: &TileFetcher, requests: Vec<TileRequest>) -> Vec<FetchOutcome> {
    let total = requests.len();
    let concurrency = fetcher.config().concurrency_for(total);
    let start = Instant::now();

    info!(
        tiles = total,
        concurrency = concurrency,
        "Fetching tile grid"
    );

    let mut outcomes: Vec<FetchOutcome> = stream::iter(requests)
        .map(|request| async move {
            let result = fetcher.fetch(&request).await;
            FetchOutcome { request, result }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    outcomes.sort_by_key(|o| (o.request.pos.row, o.request.pos.col));

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    info!(
        tiles = total,
        failed = failed,
        duration_ms = start.elapsed().as_millis() as u64,
        "Tile grid fetch finished"
    );

    outcomes
}
