//! Decoded tile rasters.
//!
//! Every tile handed to the canvas is RGBA8 and exactly `tile_edge` pixels
//! square. Tiles that decode in another pixel format are converted; tiles
//! with unexpected dimensions are resampled with a Lanczos filter.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use mosaic_common::FetchError;
use tracing::warn;

/// A decoded, normalized tile.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRaster {
    image: RgbaImage,
}

impl TileRaster {
    /// Decode an encoded tile body and normalize it.
    pub fn decode(bytes: &[u8], tile_edge: u32) -> Result<Self, FetchError> {
        let decoded =
            image::load_from_memory(bytes).map_err(|e| FetchError::Decode(e.to_string()))?;
        Ok(Self::from_dynamic(decoded, tile_edge))
    }

    /// Normalize an already-decoded image.
    pub fn from_dynamic(image: DynamicImage, tile_edge: u32) -> Self {
        let rgba = match image {
            DynamicImage::ImageRgba8(rgba) => rgba,
            other => other.to_rgba8(),
        };
        Self::from_rgba(rgba, tile_edge)
    }

    /// Wrap an RGBA image, resampling it if it is not `tile_edge` square.
    pub fn from_rgba(image: RgbaImage, tile_edge: u32) -> Self {
        if image.width() == tile_edge && image.height() == tile_edge {
            return Self { image };
        }

        warn!(
            width = image.width(),
            height = image.height(),
            tile_edge = tile_edge,
            "Unexpected tile size, resampling"
        );
        let resized = imageops::resize(&image, tile_edge, tile_edge, FilterType::Lanczos3);
        Self { image: resized }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}
