//! Common types shared across the tile-mosaic crates.

pub mod bbox;
pub mod error;
pub mod scale;
pub mod tile;

pub use bbox::{BoundingBox, PixelRect, RegionParseError, TileCorner};
pub use error::{FetchError, MosaicError, MosaicResult, TileFailure};
pub use scale::ScaleFactor;
pub use tile::{
    enumerate_tiles, GridPos, TileCoord, TileGrid, TileRequest, TileUrlTemplate,
    DEFAULT_TILE_EDGE, DEFAULT_URL_TEMPLATE,
};
