//! End-to-end capture: region in, scaled raster out.

use std::sync::Arc;
use std::time::Instant;

use compositor::{extract_region, upscale_nearest};
use image::RgbaImage;
use mosaic_common::{
    enumerate_tiles, BoundingBox, MosaicError, MosaicResult, ScaleFactor, TileGrid,
    TileUrlTemplate,
};
use tracing::{info, instrument};

use crate::{assemble, fetch_all, gate, FetchConfig, HttpTileSource, TileFetcher, TileSource};

/// Fetches, stitches, crops and scales one region of the tile map.
#[derive(Clone)]
pub struct SnapshotPipeline {
    fetcher: TileFetcher,
    template: TileUrlTemplate,
}

impl SnapshotPipeline {
    pub fn new(config: FetchConfig, template: TileUrlTemplate, source: Arc<dyn TileSource>) -> Self {
        Self {
            fetcher: TileFetcher::new(source, config),
            template,
        }
    }

    /// Pipeline over the real HTTP tile server.
    pub fn with_http(config: FetchConfig, template: TileUrlTemplate) -> Result<Self, reqwest::Error> {
        let source = HttpTileSource::new(config.request_timeout)?;
        Ok(Self::new(config, template, Arc::new(source)))
    }

    pub fn config(&self) -> &FetchConfig {
        self.fetcher.config()
    }

    /// Capture `bbox` and upscale it by `scale`.
    ///
    /// The region is checked before any request is sent. Any tile that
    /// fails terminally makes the whole capture fail with `IncompleteGrid`.
    #[instrument(
        skip(self, bbox),
        fields(
            tl_x = bbox.top_left.tile_x,
            tl_y = bbox.top_left.tile_y,
            br_x = bbox.bottom_right.tile_x,
            br_y = bbox.bottom_right.tile_y,
            scale = scale.get()
        )
    )]
    pub async fn capture(&self, bbox: &BoundingBox, scale: ScaleFactor) -> MosaicResult<RgbaImage> {
        let start = Instant::now();
        let tile_edge = self.config().tile_edge;

        let rect = bbox.validate(tile_edge)?;
        let grid = TileGrid::covering(bbox)?;
        let requests = enumerate_tiles(bbox, &self.template)?;

        info!(
            tiles = requests.len(),
            columns = grid.columns,
            rows = grid.rows,
            template = self.template.as_str(),
            "Starting capture"
        );

        let outcomes = fetch_all(&self.fetcher, requests).await;
        let canvas = assemble(grid, tile_edge, &outcomes)?;
        let canvas = gate(canvas, &outcomes)?;
        drop(outcomes);

        let image = tokio::task::spawn_blocking(move || {
            let region = extract_region(canvas.image(), &rect)?;
            upscale_nearest(&region, scale)
        })
        .await
        .map_err(|e| MosaicError::Raster(format!("raster task failed: {}", e)))??;

        info!(
            width = image.width(),
            height = image.height(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Capture complete"
        );

        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;
    use mosaic_common::FetchError;
    use test_utils::fixtures::regions;
    use test_utils::{encode_png, solid_tile};

    struct StaticSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TileSource for StaticSource {
        async fn fetch(&self, _url: &str) -> Result<Bytes, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from(encode_png(&solid_tile(10, [7, 7, 7, 255]))))
        }
    }

    fn pipeline(source: Arc<StaticSource>) -> SnapshotPipeline {
        let config = FetchConfig {
            max_attempts: 1,
            backoff_base: Duration::from_millis(1),
            request_timeout: Duration::from_secs(5),
            tile_edge: 10,
            max_concurrent: None,
        };
        SnapshotPipeline::new(config, TileUrlTemplate::default(), source)
    }

    #[tokio::test]
    async fn test_invalid_region_sends_no_requests() {
        let source = Arc::new(StaticSource {
            calls: AtomicUsize::new(0),
        });
        let pipeline = pipeline(source.clone());

        for bbox in [regions::inverted_rows(), regions::inverted_tiles()] {
            let err = pipeline.capture(&bbox, ScaleFactor::IDENTITY).await.unwrap_err();
            assert!(matches!(err, MosaicError::InvalidRegion(_)));
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_capture_crops_and_scales() {
        let source = Arc::new(StaticSource {
            calls: AtomicUsize::new(0),
        });
        let pipeline = pipeline(source.clone());

        let bbox = BoundingBox::from_parts(10, 20, 2, 3, 11, 21, 4, 6);
        let image = pipeline
            .capture(&bbox, ScaleFactor::new(2).unwrap())
            .await
            .unwrap();

        // right = 10 + 4, lower = 10 + 6
        assert_eq!(image.dimensions(), ((14 - 2) * 2, (16 - 3) * 2));
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
        assert!(image.pixels().all(|p| p.0 == [7, 7, 7, 255]));
    }
}
