//! Integer upscaling factor.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::{MosaicError, MosaicResult};

/// Positive integer multiplier applied to both axes after cropping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ScaleFactor(NonZeroU32);

impl ScaleFactor {
    /// Pass-through factor.
    pub const IDENTITY: ScaleFactor = ScaleFactor(NonZeroU32::MIN);

    /// Fails with `InvalidParameter` for zero.
    pub fn new(factor: u32) -> MosaicResult<Self> {
        NonZeroU32::new(factor).map(Self).ok_or_else(|| {
            MosaicError::InvalidParameter("scale factor must be at least 1".into())
        })
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    pub fn is_identity(self) -> bool {
        self.get() == 1
    }
}

impl Default for ScaleFactor {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl TryFrom<u32> for ScaleFactor {
    type Error = MosaicError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ScaleFactor> for u32 {
    fn from(value: ScaleFactor) -> Self {
        value.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_rejected() {
        assert!(matches!(
            ScaleFactor::new(0),
            Err(MosaicError::InvalidParameter(_))
        ));
        assert_eq!(ScaleFactor::new(3).unwrap().get(), 3);
        assert!(ScaleFactor::IDENTITY.is_identity());
    }

    #[test]
    fn test_deserialize() {
        let factor: ScaleFactor = serde_yaml::from_str("4").unwrap();
        assert_eq!(factor.get(), 4);
        assert!(serde_yaml::from_str::<ScaleFactor>("0").is_err());
    }
}
