//! Raster operations for assembling map snapshots.
//!
//! - Tile normalization (RGBA conversion, size correction)
//! - Canvas assembly from disjoint tiles
//! - Region extraction (crop)
//! - Nearest-neighbor integer upscaling
//! - Lossless PNG encoding (indexed when the palette fits)

pub mod canvas;
pub mod crop;
pub mod png;
pub mod raster;
pub mod scale;

pub use canvas::Canvas;
pub use crop::extract_region;
pub use raster::TileRaster;
pub use scale::upscale_nearest;
