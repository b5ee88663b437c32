//! Snapshot persistence.
//!
//! Files land in `<dir>/<YYYYMMDD>/merged_tiles_<YYYYMMDD>_<HHMMSS>.png`,
//! timestamped in the configured offset, and optionally mirrored to
//! `<dir>/latest.png`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use compositor::png;
use flate2::Compression;
use image::RgbaImage;
use tokio::fs;
use tracing::{debug, info};

/// Name of the copy of the most recent snapshot.
pub const LATEST_FILE: &str = "latest.png";

/// Writes captured rasters to the output tree.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    root: PathBuf,
    offset: FixedOffset,
    write_latest: bool,
}

impl SnapshotWriter {
    pub fn new(root: impl Into<PathBuf>, offset: FixedOffset, write_latest: bool) -> Self {
        Self {
            root: root.into(),
            offset,
            write_latest,
        }
    }

    /// Destination path for a snapshot taken at `at`.
    pub fn snapshot_path(&self, at: DateTime<Utc>) -> PathBuf {
        let local = at.with_timezone(&self.offset);
        let day = local.format("%Y%m%d").to_string();
        let file = format!("merged_tiles_{}_{}.png", day, local.format("%H%M%S"));
        self.root.join(day).join(file)
    }

    /// Encode and write a snapshot taken now.
    pub async fn write(&self, image: RgbaImage) -> Result<PathBuf> {
        self.write_at(image, Utc::now()).await
    }

    /// Encode and write a snapshot with an explicit timestamp.
    pub async fn write_at(&self, image: RgbaImage, at: DateTime<Utc>) -> Result<PathBuf> {
        let (width, height) = image.dimensions();
        let encoded = tokio::task::spawn_blocking(move || png::encode_png(&image, Compression::best()))
            .await
            .context("PNG encoding task failed")?
            .context("Failed to encode snapshot")?;

        let path = self.snapshot_path(at);
        write_atomic(&path, &encoded).await?;

        info!(
            path = %path.display(),
            width = width,
            height = height,
            bytes = encoded.len(),
            "Snapshot saved"
        );

        if self.write_latest {
            let latest = self.root.join(LATEST_FILE);
            write_atomic(&latest, &encoded).await?;
            debug!(path = %latest.display(), "Updated latest snapshot");
        }

        Ok(path)
    }
}

/// Write through a temporary sibling file, then rename into place.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".partial");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to move snapshot into place: {}", path.display()))?;
    Ok(())
}
