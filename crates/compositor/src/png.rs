//! Lossless PNG encoding for snapshot rasters.
//!
//! Two layouts:
//! - **Indexed (color type 3)** when the image has at most 256 distinct
//!   RGBA colors. The source map is a small fixed palette, so this is the
//!   common case. Alpha goes into a tRNS chunk.
//! - **RGBA (color type 6)** otherwise.
//!
//! Both are lossless and keep the alpha channel.

use std::collections::HashMap;
use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::RgbaImage;
use rayon::prelude::*;
use thiserror::Error;

const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Maximum colors for an indexed PNG
const MAX_PALETTE_SIZE: usize = 256;

/// Rows handled per parallel work unit when building the palette
const PALETTE_ROWS_PER_TASK: usize = 64;

#[derive(Debug, Error)]
pub enum PngError {
    #[error("IDAT compression failed: {0}")]
    Compression(#[from] std::io::Error),

    #[error("Image has zero width or height")]
    EmptyImage,
}

/// Palette form of an image: one index byte per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedPixels {
    pub palette: Vec<[u8; 4]>,
    pub indices: Vec<u8>,
}

/// Encode with automatic layout selection.
pub fn encode_png(image: &RgbaImage, level: Compression) -> Result<Vec<u8>, PngError> {
    match build_palette(image) {
        Some(indexed) => encode_indexed(image.width(), image.height(), &indexed, level),
        None => encode_rgba(image, level),
    }
}

/// Map every pixel to a palette slot, or `None` if more than 256 colors are used.
pub fn build_palette(image: &RgbaImage) -> Option<IndexedPixels> {
    let stride = image.width() as usize * 4;
    if stride == 0 {
        return None;
    }

    // Distinct colors per band of rows, bailing out as soon as any band
    // alone overflows the palette.
    let bands: Option<Vec<Vec<u32>>> = image
        .as_raw()
        .par_chunks(stride * PALETTE_ROWS_PER_TASK)
        .map(|band| {
            let mut seen: HashMap<u32, ()> = HashMap::with_capacity(MAX_PALETTE_SIZE);
            for px in band.chunks_exact(4) {
                seen.insert(pack(px), ());
                if seen.len() > MAX_PALETTE_SIZE {
                    return None;
                }
            }
            Some(seen.into_keys().collect())
        })
        .collect();

    let mut slots: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette = Vec::with_capacity(MAX_PALETTE_SIZE);
    for color in bands?.into_iter().flatten() {
        if slots.contains_key(&color) {
            continue;
        }
        if palette.len() == MAX_PALETTE_SIZE {
            return None;
        }
        slots.insert(color, palette.len() as u8);
        palette.push(color.to_le_bytes());
    }

    let indices = image
        .as_raw()
        .par_chunks(4)
        .map(|px| slots.get(&pack(px)).copied().unwrap_or(0))
        .collect();

    Some(IndexedPixels { palette, indices })
}

/// Encode a palette image (color type 3).
pub fn encode_indexed(
    width: u32,
    height: u32,
    indexed: &IndexedPixels,
    level: Compression,
) -> Result<Vec<u8>, PngError> {
    if width == 0 || height == 0 {
        return Err(PngError::EmptyImage);
    }

    let mut png = Vec::new();
    png.extend_from_slice(&SIGNATURE);
    write_chunk(&mut png, b"IHDR", &header(width, height, 3));

    let plte: Vec<u8> = indexed
        .palette
        .iter()
        .flat_map(|[r, g, b, _]| [*r, *g, *b])
        .collect();
    write_chunk(&mut png, b"PLTE", &plte);

    if indexed.palette.iter().any(|c| c[3] < 255) {
        let trns: Vec<u8> = indexed.palette.iter().map(|c| c[3]).collect();
        write_chunk(&mut png, b"tRNS", &trns);
    }

    let idat = deflate_scanlines(&indexed.indices, width as usize, level)?;
    write_chunk(&mut png, b"IDAT", &idat);
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

/// Encode full RGBA (color type 6).
pub fn encode_rgba(image: &RgbaImage, level: Compression) -> Result<Vec<u8>, PngError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(PngError::EmptyImage);
    }

    let mut png = Vec::new();
    png.extend_from_slice(&SIGNATURE);
    write_chunk(&mut png, b"IHDR", &header(width, height, 6));

    let idat = deflate_scanlines(image.as_raw(), width as usize * 4, level)?;
    write_chunk(&mut png, b"IDAT", &idat);
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

fn header(width: u32, height: u32, color_type: u8) -> [u8; 13] {
    let mut ihdr = [0u8; 13];
    ihdr[0..4].copy_from_slice(&width.to_be_bytes());
    ihdr[4..8].copy_from_slice(&height.to_be_bytes());
    ihdr[8] = 8; // bit depth
    ihdr[9] = color_type;
    // compression, filter and interlace methods stay 0
    ihdr
}

/// Prefix each scanline with filter type 0 and zlib-compress.
fn deflate_scanlines(data: &[u8], row_bytes: usize, level: Compression) -> std::io::Result<Vec<u8>> {
    let rows = data.len() / row_bytes;
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 4), level);
    for row in data.chunks_exact(row_bytes).take(rows) {
        encoder.write_all(&[0])?;
        encoder.write_all(row)?;
    }
    encoder.finish()
}

fn write_chunk(png: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(kind);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(kind);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

#[inline(always)]
fn pack(px: &[u8]) -> u32 {
    u32::from_le_bytes([px[0], px[1], px[2], px[3]])
}
