//! Common fixtures for snapshot tests.

/// A handful of map colors, including fully transparent.
pub const PALETTE: [[u8; 4]; 6] = [
    [0, 0, 0, 0],
    [237, 28, 36, 255],
    [255, 242, 0, 255],
    [34, 177, 76, 255],
    [0, 162, 232, 255],
    [255, 255, 255, 255],
];

/// Region fixtures in 1000px tile space.
pub mod regions {
    use mosaic_common::BoundingBox;

    /// Same tile row with the bottom offset above the top offset.
    ///
    /// Resolves to left 500, upper 500, right 1200, lower 300.
    pub fn inverted_rows() -> BoundingBox {
        BoundingBox::from_parts(10, 20, 500, 500, 11, 20, 200, 300)
    }

    /// Bottom-right tile to the left of the top-left tile.
    pub fn inverted_tiles() -> BoundingBox {
        BoundingBox::from_parts(12, 20, 0, 0, 11, 21, 10, 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_fixtures_are_invalid() {
        let rect = regions::inverted_rows().pixel_rect(1000);
        assert_eq!(rect.height(), -200);
        assert!(regions::inverted_rows().validate(1000).is_err());
        assert!(regions::inverted_tiles().validate(1000).is_err());
    }
}
