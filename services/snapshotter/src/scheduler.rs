//! Capture-and-save runs, once or on an interval.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use capture::SnapshotPipeline;
use mosaic_common::{BoundingBox, ScaleFactor};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::output::SnapshotWriter;

/// One configured capture job.
pub struct Scheduler {
    pipeline: SnapshotPipeline,
    writer: SnapshotWriter,
    region: BoundingBox,
    scale: ScaleFactor,
    interval: Duration,
}

impl Scheduler {
    pub fn new(
        pipeline: SnapshotPipeline,
        writer: SnapshotWriter,
        region: BoundingBox,
        scale: ScaleFactor,
        interval: Duration,
    ) -> Self {
        Self {
            pipeline,
            writer,
            region,
            scale,
            interval,
        }
    }

    /// Capture the region once and save it.
    pub async fn run_once(&self) -> Result<PathBuf> {
        let image = match self.pipeline.capture(&self.region, self.scale).await {
            Ok(image) => image,
            Err(e) => {
                let failed = e.failed_coords();
                if !failed.is_empty() {
                    let tiles: Vec<String> = failed.iter().map(|c| c.to_string()).collect();
                    warn!(tiles = %tiles.join(" "), "Snapshot discarded, tiles missing");
                }
                return Err(e).context("Capture failed");
            }
        };
        self.writer.write(image).await
    }

    /// Capture every `interval` until a shutdown signal arrives.
    ///
    /// Failed runs are logged and the loop carries on.
    pub async fn run_forever(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let mut runs = 0u64;
        let mut failures = 0u64;

        loop {
            let started = Instant::now();
            runs += 1;
            match self.run_once().await {
                Ok(path) => info!(run = runs, path = %path.display(), "Scheduled capture saved"),
                Err(e) => {
                    failures += 1;
                    error!(run = runs, error = format!("{:#}", e), "Scheduled capture failed");
                }
            }

            let wait = self.interval.saturating_sub(started.elapsed());
            info!(next_in_secs = wait.as_secs(), "Waiting for next capture");

            tokio::select! {
                _ = shutdown.recv() => {
                    info!(runs = runs, failures = failures, "Shutting down scheduler");
                    break;
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use bytes::Bytes;
    use capture::{FetchConfig, TileSource};
    use chrono::FixedOffset;
    use mosaic_common::{FetchError, TileUrlTemplate};
    use test_utils::{encode_png, solid_tile};

    /// Serves a solid 4px tile, or fails every call.
    struct FakeSource {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TileSource for FakeSource {
        async fn fetch(&self, _url: &str) -> Result<Bytes, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FetchError::Status(502));
            }
            Ok(Bytes::from(encode_png(&solid_tile(4, [40, 80, 120, 255]))))
        }
    }

    fn scheduler(fail: bool, root: &std::path::Path) -> (Scheduler, Arc<FakeSource>) {
        let source = Arc::new(FakeSource {
            fail,
            calls: AtomicUsize::new(0),
        });
        let config = FetchConfig {
            max_attempts: 2,
            backoff_base: Duration::from_millis(1),
            request_timeout: Duration::from_secs(5),
            tile_edge: 4,
            max_concurrent: None,
        };
        let pipeline = SnapshotPipeline::new(config, TileUrlTemplate::default(), source.clone());
        let writer = SnapshotWriter::new(root, FixedOffset::east_opt(0).unwrap(), true);
        let region = BoundingBox::from_parts(5, 5, 1, 1, 5, 5, 3, 4);
        let scheduler = Scheduler::new(
            pipeline,
            writer,
            region,
            ScaleFactor::new(2).unwrap(),
            Duration::from_secs(3600),
        );
        (scheduler, source)
    }

    #[tokio::test]
    async fn test_run_once_saves_scaled_region() {
        let dir = tempfile::tempdir().unwrap();
        let (scheduler, source) = scheduler(false, dir.path());

        let path = scheduler.run_once().await.unwrap();
        let saved = image::open(&path).unwrap().to_rgba8();
        assert_eq!(saved.dimensions(), (4, 6));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_capture_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (scheduler, source) = scheduler(true, dir.path());

        assert!(scheduler.run_once().await.is_err());
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_run_forever_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let (scheduler, source) = scheduler(true, dir.path());
        let (tx, rx) = broadcast::channel(1);

        let handle = tokio::spawn(async move { scheduler.run_forever(rx).await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(()).unwrap();

        // A failing capture does not end the loop; the signal does.
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }
}
