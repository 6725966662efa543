//! Frame analysis: region cropping, brightness and lux estimation.
//!
//! Each stage is a pure function of its input so a sampling cycle can be
//! replayed from a stored frame.

mod brightness;
mod lux;
mod region;

pub use brightness::brightness;
pub use lux::estimate_lux;
pub use region::{crop, crop_or_full, CropRegion, PixelBounds, RegionError};

use thiserror::Error;

/// Errors raised while analysing a frame.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// The crop region rounds to no pixels on this frame.
    #[error("crop region {region} is empty on a {width}x{height} frame")]
    InvalidCropRegion {
        /// Requested region.
        region: CropRegion,
        /// Frame width.
        width: u32,
        /// Frame height.
        height: u32,
    },
}
