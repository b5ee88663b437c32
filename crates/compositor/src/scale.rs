//! Nearest-neighbor integer upscaling.
//!
//! The source is pixel art; every output pixel copies exactly one source
//! pixel so block edges stay hard.

use image::RgbaImage;
use mosaic_common::{MosaicError, MosaicResult, ScaleFactor};
use rayon::prelude::*;
use tracing::debug;

/// Scale both axes by `factor`, replicating each pixel into a factor x factor block.
pub fn upscale_nearest(source: &RgbaImage, factor: ScaleFactor) -> MosaicResult<RgbaImage> {
    if factor.is_identity() {
        return Ok(source.clone());
    }

    let f = factor.get();
    let out_width = source.width().checked_mul(f);
    let out_height = source.height().checked_mul(f);
    let (out_width, out_height) = match (out_width, out_height) {
        (Some(w), Some(h)) => (w, h),
        _ => {
            return Err(MosaicError::Raster(format!(
                "{}x{} scaled by {} overflows image dimensions",
                source.width(),
                source.height(),
                f
            )))
        }
    };

    debug!(
        width = out_width,
        height = out_height,
        factor = f,
        "Upscaling (nearest neighbor)"
    );

    let f = f as usize;
    let src_stride = source.width() as usize * 4;
    let out_stride = out_width as usize * 4;
    let mut out = vec![0u8; out_stride * out_height as usize];

    if src_stride > 0 {
        // One band of `f` output rows per source row.
        out.par_chunks_mut(out_stride * f)
            .zip(source.as_raw().par_chunks(src_stride))
            .for_each(|(band, src_row)| {
                let (first, rest) = band.split_at_mut(out_stride);
                for (dst, px) in first.chunks_exact_mut(4 * f).zip(src_row.chunks_exact(4)) {
                    for cell in dst.chunks_exact_mut(4) {
                        cell.copy_from_slice(px);
                    }
                }
                for row in rest.chunks_exact_mut(out_stride) {
                    row.copy_from_slice(first);
                }
            });
    }

    RgbaImage::from_raw(out_width, out_height, out)
        .ok_or_else(|| MosaicError::Raster("scaled buffer size mismatch".into()))
}
