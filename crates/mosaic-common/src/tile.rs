//! Tile addressing for the remote raster grid.
//!
//! Tiles are addressed by integer `(x, y)` coordinates and fetched from a
//! URL template. A [`TileGrid`] describes the rectangle of tiles covered by a
//! [`BoundingBox`]; [`enumerate_tiles`] turns it into fetchable requests.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{BoundingBox, MosaicError, MosaicResult};

/// Nominal edge length of a source tile in pixels.
pub const DEFAULT_TILE_EDGE: u32 = 1000;

/// Tile endpoint of the public canvas.
pub const DEFAULT_URL_TEMPLATE: &str = "https://backend.wplace.live/files/s0/tiles/{x}/{y}.png";

/// A tile coordinate (x/y) on the remote grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    /// Column (x)
    pub x: u32,
    /// Row (y)
    pub y: u32,
}

impl TileCoord {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Zero-based position of a tile within the requested grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPos {
    pub row: u32,
    pub col: u32,
}

impl GridPos {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Pixel offset of this cell's top-left corner on the canvas.
    pub fn pixel_origin(&self, tile_edge: u32) -> (u32, u32) {
        (self.col * tile_edge, self.row * tile_edge)
    }
}

/// URL template with `{x}` and `{y}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileUrlTemplate(String);

impl TileUrlTemplate {
    /// Validate and wrap a template string.
    pub fn new(template: impl Into<String>) -> MosaicResult<Self> {
        let template = template.into();
        if !template.contains("{x}") || !template.contains("{y}") {
            return Err(MosaicError::InvalidRegion(format!(
                "URL template must contain {{x}} and {{y}}: {}",
                template
            )));
        }
        Ok(Self(template))
    }

    /// Render the URL for one tile.
    pub fn render(&self, coord: TileCoord) -> String {
        self.0
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TileUrlTemplate {
    fn default() -> Self {
        Self(DEFAULT_URL_TEMPLATE.to_string())
    }
}

/// A single tile to fetch, with its destination on the canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRequest {
    pub coord: TileCoord,
    pub url: String,
    pub pos: GridPos,
}

/// The inclusive rectangle of tiles covered by a bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    /// Top-left tile
    pub origin: TileCoord,
    /// Number of tile columns
    pub columns: u32,
    /// Number of tile rows
    pub rows: u32,
}

impl TileGrid {
    /// Grid covering the bounding box's corner tiles.
    ///
    /// Fails with `InvalidRegion` when the bottom-right tile lies left of or
    /// above the top-left tile.
    pub fn covering(bbox: &BoundingBox) -> MosaicResult<Self> {
        let tl = bbox.top_left.tile();
        let br = bbox.bottom_right.tile();

        if br.x < tl.x || br.y < tl.y {
            return Err(MosaicError::InvalidRegion(format!(
                "bottom-right tile {} is above or left of top-left tile {}",
                br, tl
            )));
        }

        let span = |from: u32, to: u32| to.checked_sub(from).and_then(|d| d.checked_add(1));
        match (span(tl.x, br.x), span(tl.y, br.y)) {
            (Some(columns), Some(rows)) => Ok(Self {
                origin: tl,
                columns,
                rows,
            }),
            _ => Err(MosaicError::InvalidRegion(format!(
                "tile range {} to {} is too large to address",
                tl, br
            ))),
        }
    }

    pub fn tile_count(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    /// Canvas size in pixels for the given tile edge.
    pub fn pixel_size(&self, tile_edge: u32) -> MosaicResult<(u32, u32)> {
        let too_large = || {
            MosaicError::InvalidRegion(format!(
                "grid of {}x{} tiles at {}px exceeds addressable canvas size",
                self.columns, self.rows, tile_edge
            ))
        };
        let width = self.columns.checked_mul(tile_edge).ok_or_else(too_large)?;
        let height = self.rows.checked_mul(tile_edge).ok_or_else(too_large)?;
        Ok((width, height))
    }

    /// Position of a coordinate inside the grid, if it is covered.
    pub fn position_of(&self, coord: TileCoord) -> Option<GridPos> {
        let col = coord.x.checked_sub(self.origin.x)?;
        let row = coord.y.checked_sub(self.origin.y)?;
        (col < self.columns && row < self.rows).then(|| GridPos::new(row, col))
    }

    /// All covered coordinates in row-major order.
    pub fn coords(&self) -> impl Iterator<Item = TileCoord> + '_ {
        (0..self.rows).flat_map(move |row| {
            (0..self.columns)
                .map(move |col| TileCoord::new(self.origin.x + col, self.origin.y + row))
        })
    }
}

/// Enumerate the tile requests needed to cover a bounding box.
pub fn enumerate_tiles(
    bbox: &BoundingBox,
    template: &TileUrlTemplate,
) -> MosaicResult<Vec<TileRequest>> {
    let grid = TileGrid::covering(bbox)?;

    Ok(grid
        .coords()
        .map(|coord| TileRequest {
            coord,
            url: template.render(coord),
            pos: GridPos::new(coord.y - grid.origin.y, coord.x - grid.origin.x),
        })
        .collect())
}
