//! Bounding box types and pixel rectangle resolution.

use serde::{Deserialize, Serialize};

use crate::{MosaicError, MosaicResult, TileCoord, TileGrid};

/// One corner of a region: a tile plus a pixel offset inside that tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileCorner {
    pub tile_x: u32,
    pub tile_y: u32,
    #[serde(default)]
    pub pixel_x: u32,
    #[serde(default)]
    pub pixel_y: u32,
}

impl TileCorner {
    pub fn new(tile_x: u32, tile_y: u32, pixel_x: u32, pixel_y: u32) -> Self {
        Self {
            tile_x,
            tile_y,
            pixel_x,
            pixel_y,
        }
    }

    pub fn tile(&self) -> TileCoord {
        TileCoord::new(self.tile_x, self.tile_y)
    }
}

/// A region expressed as tile coordinates plus sub-tile pixel offsets.
///
/// The top-left offset is inclusive, the bottom-right offset exclusive, so a
/// bottom-right pixel of `(1000, 1000)` covers the whole bottom-right tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub top_left: TileCorner,
    pub bottom_right: TileCorner,
}

impl BoundingBox {
    pub fn new(top_left: TileCorner, bottom_right: TileCorner) -> Self {
        Self {
            top_left,
            bottom_right,
        }
    }

    /// Build from the eight integers a caller supplies.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        tl_x: u32,
        tl_y: u32,
        tl_px: u32,
        tl_py: u32,
        br_x: u32,
        br_y: u32,
        br_px: u32,
        br_py: u32,
    ) -> Self {
        Self {
            top_left: TileCorner::new(tl_x, tl_y, tl_px, tl_py),
            bottom_right: TileCorner::new(br_x, br_y, br_px, br_py),
        }
    }

    /// Parse "tl_x,tl_y,tl_px,tl_py,br_x,br_y,br_px,br_py".
    pub fn from_csv(s: &str) -> Result<Self, RegionParseError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 8 {
            return Err(RegionParseError::InvalidFormat(s.to_string()));
        }

        let mut values = [0u32; 8];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part
                .parse()
                .map_err(|_| RegionParseError::InvalidNumber(part.to_string()))?;
        }

        let [tl_x, tl_y, tl_px, tl_py, br_x, br_y, br_px, br_py] = values;
        Ok(Self::from_parts(
            tl_x, tl_y, tl_px, tl_py, br_x, br_y, br_px, br_py,
        ))
    }

    /// Resolve the crop rectangle on a canvas whose origin is the top-left tile.
    ///
    /// No validation happens here; an inverted box yields a rectangle with a
    /// negative width or height.
    pub fn pixel_rect(&self, tile_edge: u32) -> PixelRect {
        let edge = i64::from(tile_edge);
        let tl = &self.top_left;
        let br = &self.bottom_right;

        PixelRect {
            left: i64::from(tl.pixel_x),
            upper: i64::from(tl.pixel_y),
            right: (i64::from(br.tile_x) - i64::from(tl.tile_x)) * edge + i64::from(br.pixel_x),
            lower: (i64::from(br.tile_y) - i64::from(tl.tile_y)) * edge + i64::from(br.pixel_y),
        }
    }

    /// Check tile ordering and that the resolved rectangle is non-empty and
    /// lies on the covering canvas.
    pub fn validate(&self, tile_edge: u32) -> MosaicResult<PixelRect> {
        let grid = TileGrid::covering(self)?;
        let (width, height) = grid.pixel_size(tile_edge)?;
        let rect = self.pixel_rect(tile_edge);
        rect.ensure_within(width, height)?;
        Ok(rect)
    }
}

/// Crop rectangle in canvas pixels: left/upper inclusive, right/lower exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub left: i64,
    pub upper: i64,
    pub right: i64,
    pub lower: i64,
}

impl PixelRect {
    pub fn width(&self) -> i64 {
        self.right - self.left
    }

    pub fn height(&self) -> i64 {
        self.lower - self.upper
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// Fails with `InvalidRegion` unless the rectangle is non-empty and inside
    /// a `width` x `height` raster.
    pub fn ensure_within(&self, width: u32, height: u32) -> MosaicResult<()> {
        if self.is_empty() {
            return Err(MosaicError::InvalidRegion(format!(
                "crop rectangle ({}, {}, {}, {}) is empty: {}x{}",
                self.left,
                self.upper,
                self.right,
                self.lower,
                self.width(),
                self.height()
            )));
        }

        if self.left < 0
            || self.upper < 0
            || self.right > i64::from(width)
            || self.lower > i64::from(height)
        {
            return Err(MosaicError::InvalidRegion(format!(
                "crop rectangle ({}, {}, {}, {}) exceeds canvas {}x{}",
                self.left, self.upper, self.right, self.lower, width, height
            )));
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegionParseError {
    #[error("Invalid region format: {0}. Expected 'tl_x,tl_y,tl_px,tl_py,br_x,br_y,br_px,br_py'")]
    InvalidFormat(String),

    #[error("Invalid number in region: {0}")]
    InvalidNumber(String),
}
