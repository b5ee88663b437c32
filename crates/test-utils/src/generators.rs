//! Synthetic tile generators.
//!
//! These build predictable RGBA tiles so tests can check exactly where each
//! source pixel ended up.

use std::io::Cursor;

use image::{ImageOutputFormat, Rgba, RgbaImage};

/// Square tile filled with one color.
pub fn solid_tile(edge: u32, color: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(edge, edge, Rgba(color))
}

/// Square tile where each pixel encodes its own position.
///
/// Red is `x`, green is `y`, blue is `seed`, alpha is opaque, all modulo 256.
/// Pixels are unique as long as `edge <= 256`, which makes misplaced copies
/// easy to spot.
pub fn patterned_tile(edge: u32, seed: u8) -> RgbaImage {
    RgbaImage::from_fn(edge, edge, |x, y| Rgba([x as u8, y as u8, seed, 255]))
}

/// Square tile with far more than 256 distinct colors.
///
/// Deterministic for a given seed; alpha varies too.
pub fn noisy_tile(edge: u32, seed: u32) -> RgbaImage {
    RgbaImage::from_fn(edge, edge, |x, y| {
        let mut h = y.wrapping_mul(edge).wrapping_add(x) ^ seed.wrapping_mul(0x9E37_79B9);
        h = h.wrapping_mul(0x85EB_CA6B);
        h ^= h >> 13;
        h = h.wrapping_mul(0xC2B2_AE35);
        h ^= h >> 16;
        // Low byte of the index keeps neighbouring pixels distinct.
        let [a, b, c, _] = h.to_le_bytes();
        Rgba([x as u8 ^ a, y as u8 ^ b, c, 128 | (h >> 25) as u8])
    })
}

/// Encode an image as PNG bytes, the way the tile server delivers it.
pub fn encode_png(image: &RgbaImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageOutputFormat::Png)
        .expect("in-memory PNG encoding");
    buf.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_patterned_tile_is_unique() {
        let tile = patterned_tile(32, 9);
        let distinct: HashSet<_> = tile.pixels().map(|p| p.0).collect();
        assert_eq!(distinct.len(), 32 * 32);
        assert_eq!(*tile.get_pixel(3, 5), Rgba([3, 5, 9, 255]));
    }

    #[test]
    fn test_noisy_tile_has_many_colors() {
        let tile = noisy_tile(32, 1);
        let distinct: HashSet<_> = tile.pixels().map(|p| p.0).collect();
        assert!(distinct.len() > 256);
        assert_eq!(tile, noisy_tile(32, 1));
    }

    #[test]
    fn test_encode_png_decodes() {
        let tile = solid_tile(4, [9, 8, 7, 6]);
        let bytes = encode_png(&tile);
        assert_eq!(&bytes[1..4], b"PNG");
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, tile);
    }
}
