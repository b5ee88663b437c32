//! Composite canvas covering a whole tile grid.
//!
//! The buffer is allocated once, fully transparent, and never resized.
//! Each tile owns a disjoint `tile_edge` square, so a paste is a straight
//! overwrite of that square with the tile's RGBA pixels. Transparent tile
//! pixels stay transparent; nothing is blended.

use image::RgbaImage;
use mosaic_common::{GridPos, MosaicError, MosaicResult, TileGrid};
use tracing::debug;

use crate::TileRaster;

/// Canvas sized to `grid.columns * tile_edge` by `grid.rows * tile_edge`.
#[derive(Debug, Clone)]
pub struct Canvas {
    image: RgbaImage,
    grid: TileGrid,
    tile_edge: u32,
}

impl Canvas {
    /// Allocate a transparent canvas for the grid.
    pub fn new(grid: TileGrid, tile_edge: u32) -> MosaicResult<Self> {
        let (width, height) = grid.pixel_size(tile_edge)?;
        debug!(
            columns = grid.columns,
            rows = grid.rows,
            width = width,
            height = height,
            "Allocating canvas"
        );

        Ok(Self {
            image: RgbaImage::new(width, height),
            grid,
            tile_edge,
        })
    }

    /// Write a tile into its grid cell.
    pub fn paste(&mut self, pos: GridPos, tile: &TileRaster) -> MosaicResult<()> {
        if pos.col >= self.grid.columns || pos.row >= self.grid.rows {
            return Err(MosaicError::Raster(format!(
                "grid position ({}, {}) outside {}x{} grid",
                pos.row, pos.col, self.grid.rows, self.grid.columns
            )));
        }
        if tile.width() != self.tile_edge || tile.height() != self.tile_edge {
            return Err(MosaicError::Raster(format!(
                "tile is {}x{}, expected {}px square",
                tile.width(),
                tile.height(),
                self.tile_edge
            )));
        }

        let (x0, y0) = pos.pixel_origin(self.tile_edge);
        let canvas_stride = self.image.width() as usize * 4;
        let tile_stride = self.tile_edge as usize * 4;
        let dst: &mut [u8] = &mut self.image;
        let src = tile.image().as_raw();

        for (row, src_row) in src.chunks_exact(tile_stride).enumerate() {
            let start = (y0 as usize + row) * canvas_stride + x0 as usize * 4;
            dst[start..start + tile_stride].copy_from_slice(src_row);
        }

        Ok(())
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use mosaic_common::TileCoord;
    use test_utils::{patterned_tile, solid_tile};

    fn grid(columns: u32, rows: u32) -> TileGrid {
        TileGrid {
            origin: TileCoord::new(0, 0),
            columns,
            rows,
        }
    }

    #[test]
    fn test_new_canvas_is_transparent() {
        let canvas = Canvas::new(grid(2, 3), 4).unwrap();
        assert_eq!(canvas.image().dimensions(), (8, 12));
        assert!(canvas.image().pixels().all(|p| *p == Rgba([0, 0, 0, 0])));
    }

    #[test]
    fn test_paste_places_every_pixel() {
        let mut canvas = Canvas::new(grid(3, 2), 8).unwrap();
        let tile = TileRaster::from_rgba(patterned_tile(8, 7), 8);
        let pos = GridPos::new(1, 2);
        canvas.paste(pos, &tile).unwrap();

        for py in 0..8 {
            for px in 0..8 {
                assert_eq!(
                    canvas.image().get_pixel(2 * 8 + px, 8 + py),
                    tile.image().get_pixel(px, py)
                );
            }
        }
        // Neighbouring cell untouched.
        assert_eq!(*canvas.image().get_pixel(8, 8), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_paste_overwrites_without_blending() {
        let mut canvas = Canvas::new(grid(1, 1), 4).unwrap();
        canvas
            .paste(GridPos::new(0, 0), &TileRaster::from_rgba(solid_tile(4, [255, 255, 255, 255]), 4))
            .unwrap();
        canvas
            .paste(GridPos::new(0, 0), &TileRaster::from_rgba(solid_tile(4, [200, 10, 10, 128]), 4))
            .unwrap();
        assert_eq!(*canvas.image().get_pixel(1, 1), Rgba([200, 10, 10, 128]));
    }

    #[test]
    fn test_paste_outside_grid_fails() {
        let mut canvas = Canvas::new(grid(1, 1), 4).unwrap();
        let tile = TileRaster::from_rgba(solid_tile(4, [1, 2, 3, 255]), 4);
        assert!(canvas.paste(GridPos::new(0, 1), &tile).is_err());
    }
}
