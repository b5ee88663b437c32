//! Shared test utilities for the tile-snapshot workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic tile generators (solid, patterned, noisy)
//! - In-memory PNG encoding for serving fake tiles
//! - Invalid-region fixtures and a sample palette
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{encode_png, solid_tile, fixtures};
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use generators::*;

/// Assert that every pixel of a rectangle in an image has one color.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_area_color;
///
/// // x, y, width, height
/// assert_area_color!(image, (0, 0, 10, 10), [255, 0, 0, 255]);
/// ```
#[macro_export]
macro_rules! assert_area_color {
    ($image:expr, ($x:expr, $y:expr, $w:expr, $h:expr), $color:expr) => {{
        let image: &::image::RgbaImage = &$image;
        let expected = ::image::Rgba::<u8>($color);
        for py in $y..$y + $h {
            for px in $x..$x + $w {
                let actual = *image.get_pixel(px, py);
                if actual != expected {
                    panic!(
                        "assertion failed: pixel ({}, {}) is {:?}, expected {:?}",
                        px, py, actual.0, expected.0
                    );
                }
            }
        }
    }};
}
