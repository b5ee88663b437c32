//! Canvas -> crop -> upscale -> PNG, using small tiles.

use flate2::Compression;
use image::Rgba;

use compositor::{extract_region, png, upscale_nearest, Canvas, TileRaster};
use mosaic_common::{BoundingBox, GridPos, ScaleFactor, TileGrid};
use test_utils::fixtures::PALETTE;
use test_utils::{noisy_tile, solid_tile};

const EDGE: u32 = 10;

const CLEAR: [u8; 4] = PALETTE[0];
const RED: [u8; 4] = PALETTE[1];
const GREEN: [u8; 4] = PALETTE[3];
const BLUE: [u8; 4] = PALETTE[4];

/// 2x2 grid at tiles (100..=101, 200..=201), one solid color per cell.
fn four_color_canvas() -> (BoundingBox, Canvas) {
    let bbox = BoundingBox::from_parts(100, 200, 4, 6, 101, 201, 3, 5);
    let grid = TileGrid::covering(&bbox).unwrap();
    let mut canvas = Canvas::new(grid, EDGE).unwrap();

    for (pos, color) in [
        (GridPos::new(0, 0), RED),
        (GridPos::new(0, 1), GREEN),
        (GridPos::new(1, 0), BLUE),
        (GridPos::new(1, 1), CLEAR),
    ] {
        canvas
            .paste(pos, &TileRaster::from_rgba(solid_tile(EDGE, color), EDGE))
            .unwrap();
    }
    (bbox, canvas)
}

#[test]
fn test_crop_spans_tile_seams() {
    let (bbox, canvas) = four_color_canvas();
    let rect = bbox.validate(EDGE).unwrap();
    assert_eq!((rect.left, rect.upper, rect.right, rect.lower), (4, 6, 13, 15));

    let region = extract_region(canvas.image(), &rect).unwrap();
    assert_eq!(region.dimensions(), (9, 9));

    // Canvas x = left + rx, y = upper + ry; seam at 10 in both axes.
    assert_eq!(*region.get_pixel(0, 0), Rgba(RED));
    assert_eq!(*region.get_pixel(5, 3), Rgba(RED));
    assert_eq!(*region.get_pixel(6, 0), Rgba(GREEN));
    assert_eq!(*region.get_pixel(0, 4), Rgba(BLUE));
    assert_eq!(*region.get_pixel(8, 8), Rgba(CLEAR));
}

#[test]
fn test_scaled_region_keeps_hard_edges() {
    let (bbox, canvas) = four_color_canvas();
    let rect = bbox.validate(EDGE).unwrap();
    let region = extract_region(canvas.image(), &rect).unwrap();

    let scaled = upscale_nearest(&region, ScaleFactor::new(4).unwrap()).unwrap();
    assert_eq!(scaled.dimensions(), (36, 36));

    for (x, y) in scaled.enumerate_pixels().map(|(x, y, _)| (x, y)) {
        assert_eq!(scaled.get_pixel(x, y), region.get_pixel(x / 4, y / 4));
    }
}

#[test]
fn test_png_round_trip_indexed_and_rgba() {
    let (_, canvas) = four_color_canvas();
    let indexed = png::encode_png(canvas.image(), Compression::best()).unwrap();
    let decoded = image::load_from_memory(&indexed).unwrap().to_rgba8();
    assert_eq!(&decoded, canvas.image());

    let noisy = noisy_tile(32, 11);
    assert!(png::build_palette(&noisy).is_none());
    let encoded = png::encode_png(&noisy, Compression::default()).unwrap();
    let decoded = image::load_from_memory(&encoded).unwrap().to_rgba8();
    assert_eq!(decoded, noisy);
}
