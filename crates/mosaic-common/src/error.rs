//! Error types for tile-mosaic operations.

use std::time::Duration;

use thiserror::Error;

use crate::TileCoord;

/// Result type alias using MosaicError.
pub type MosaicResult<T> = Result<T, MosaicError>;

/// Failure of a single fetch attempt.
///
/// Every variant is retryable; the fetcher only gives up once its attempt
/// budget is spent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    // === Network class ===
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Unexpected HTTP status: {0}")]
    Status(u16),

    // === Decode class ===
    #[error("Failed to decode tile image: {0}")]
    Decode(String),
}

impl FetchError {
    /// True for timeouts, connection failures and non-2xx responses.
    pub fn is_network(&self) -> bool {
        !self.is_decode()
    }

    /// True when the body arrived but could not be decoded as an image.
    pub fn is_decode(&self) -> bool {
        matches!(self, FetchError::Decode(_))
    }

    /// Short class label used in log fields.
    pub fn class(&self) -> &'static str {
        if self.is_network() {
            "network"
        } else {
            "decode"
        }
    }
}

/// Terminal failure of one tile after its retries were exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Tile {coord} failed after {attempts} attempt(s): {last_error}")]
pub struct TileFailure {
    pub coord: TileCoord,
    pub attempts: u32,
    pub last_error: FetchError,
}

/// Primary error type for the capture pipeline.
#[derive(Debug, Error)]
pub enum MosaicError {
    /// Caller supplied an empty or inverted region, or a crop outside the canvas.
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    /// One or more tiles failed terminally; always carries every failure.
    #[error("Incomplete grid: {} of {total} tiles failed", .failures.len())]
    IncompleteGrid {
        failures: Vec<TileFailure>,
        total: usize,
    },

    /// A numeric setting such as the scale factor is out of range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Raster operation failed: {0}")]
    Raster(String),
}

impl MosaicError {
    /// Coordinates of the failed tiles when the grid was incomplete.
    pub fn failed_coords(&self) -> Vec<TileCoord> {
        match self {
            MosaicError::IncompleteGrid { failures, .. } => {
                failures.iter().map(|f| f.coord).collect()
            }
            _ => Vec::new(),
        }
    }
}
