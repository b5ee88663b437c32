//! Region extraction.

use image::{imageops, RgbaImage};
use mosaic_common::{MosaicResult, PixelRect};
use tracing::debug;

/// Crop `source` to `rect`.
///
/// Fails with `InvalidRegion` when the rectangle is empty or not fully
/// inside the source.
pub fn extract_region(source: &RgbaImage, rect: &PixelRect) -> MosaicResult<RgbaImage> {
    rect.ensure_within(source.width(), source.height())?;

    // ensure_within guarantees every bound fits in u32.
    let (x, y) = (rect.left as u32, rect.upper as u32);
    let (width, height) = (rect.width() as u32, rect.height() as u32);

    debug!(
        left = rect.left,
        upper = rect.upper,
        right = rect.right,
        lower = rect.lower,
        "Cropping canvas"
    );

    Ok(imageops::crop_imm(source, x, y, width, height).to_image())
}
