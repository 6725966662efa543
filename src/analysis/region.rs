//! Region of interest within a captured frame.
//!
//! The region is stored normalized to `[0, 1]` so it survives changes of
//! capture resolution. Pixel bounds are derived per frame by rounding.

use super::AnalysisError;
use crate::capture::Frame;
use image::{imageops, RgbImage};
use std::fmt;
use std::str::FromStr;

/// Normalized crop rectangle `(x1, y1) .. (x2, y2)` with `x1 < x2` and `y1 < y2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRegion {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
}

/// Errors building a crop region.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegionError {
    /// A coordinate is outside `[0, 1]` or not finite.
    #[error("crop coordinates must be finite values in [0, 1]")]
    OutOfRange,
    /// The region has no area.
    #[error("crop region is empty ({x1},{y1})..({x2},{y2})")]
    Degenerate {
        /// Left edge.
        x1: f64,
        /// Top edge.
        y1: f64,
        /// Right edge.
        x2: f64,
        /// Bottom edge.
        y2: f64,
    },
    /// Not four comma separated numbers.
    #[error("crop region must be four comma separated numbers, got {0:?}")]
    Syntax(String),
}

/// Pixel rectangle produced from a [`CropRegion`] for a given frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBounds {
    /// Left column.
    pub x: u32,
    /// Top row.
    pub y: u32,
    /// Width in pixels (never zero).
    pub width: u32,
    /// Height in pixels (never zero).
    pub height: u32,
}

impl CropRegion {
    /// The whole frame. Always valid.
    pub const FULL: Self = Self {
        x1: 0.0,
        y1: 0.0,
        x2: 1.0,
        y2: 1.0,
    };

    /// Creates a region, enforcing range and ordering.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Result<Self, RegionError> {
        let in_range = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        if ![x1, y1, x2, y2].into_iter().all(in_range) {
            return Err(RegionError::OutOfRange);
        }
        if x1 >= x2 || y1 >= y2 {
            return Err(RegionError::Degenerate { x1, y1, x2, y2 });
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    /// Creates a region from two opposite corners given in any order.
    ///
    /// Both axes are normalized the same way: the smaller coordinate
    /// becomes the start and the larger the end.
    pub fn from_corners(ax: f64, ay: f64, bx: f64, by: f64) -> Result<Self, RegionError> {
        Self::new(ax.min(bx), ay.min(by), ax.max(bx), ay.max(by))
    }

    /// Creates a region from a mouse drag over a preview of `size` pixels.
    ///
    /// Positions outside the preview are clamped to its edges.
    pub fn from_drag(
        start: (f64, f64),
        end: (f64, f64),
        size: (u32, u32),
    ) -> Result<Self, RegionError> {
        let (width, height) = (f64::from(size.0.max(1)), f64::from(size.1.max(1)));
        let nx = |x: f64| (x / width).clamp(0.0, 1.0);
        let ny = |y: f64| (y / height).clamp(0.0, 1.0);
        Self::from_corners(nx(start.0), ny(start.1), nx(end.0), ny(end.1))
    }

    /// Returns the corners as `(x1, y1, x2, y2)`.
    pub fn corners(&self) -> (f64, f64, f64, f64) {
        (self.x1, self.y1, self.x2, self.y2)
    }

    /// Converts to pixel bounds by rounding (half to even) against the frame
    /// dimensions.
    pub fn pixel_bounds(&self, width: u32, height: u32) -> Result<PixelBounds, AnalysisError> {
        let scale = |v: f64, extent: u32| -> u32 {
            // v is in [0, 1] so the product is within [0, extent]
            let px = (v * f64::from(extent)).round_ties_even() as u32;
            px.min(extent)
        };

        let (left, right) = (scale(self.x1, width), scale(self.x2, width));
        let (top, bottom) = (scale(self.y1, height), scale(self.y2, height));

        if right <= left || bottom <= top {
            return Err(AnalysisError::InvalidCropRegion {
                region: *self,
                width,
                height,
            });
        }

        Ok(PixelBounds {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        })
    }
}

impl Default for CropRegion {
    fn default() -> Self {
        Self::FULL
    }
}

impl fmt::Display for CropRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x1, self.y1, self.x2, self.y2)
    }
}

impl FromStr for CropRegion {
    type Err = RegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| RegionError::Syntax(s.to_owned()))?;

        match values.as_slice() {
            &[x1, y1, x2, y2] => Self::from_corners(x1, y1, x2, y2),
            _ => Err(RegionError::Syntax(s.to_owned())),
        }
    }
}

/// Extracts `region` from `frame`.
///
/// Fails with [`AnalysisError::InvalidCropRegion`] when the rounded pixel
/// rectangle is empty.
pub fn crop(frame: &Frame, region: &CropRegion) -> Result<RgbImage, AnalysisError> {
    let bounds = region.pixel_bounds(frame.width(), frame.height())?;
    Ok(imageops::crop_imm(frame.image(), bounds.x, bounds.y, bounds.width, bounds.height).to_image())
}

/// Like [`crop`], but falls back to the full frame when the region is empty.
pub fn crop_or_full(frame: &Frame, region: &CropRegion) -> RgbImage {
    match crop(frame, region) {
        Ok(sub) => sub,
        Err(e) => {
            tracing::warn!(error = %e, "Using the full frame instead");
            frame.image().clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn frame(width: u32, height: u32) -> Frame {
        let image = RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 0]));
        Frame::new(image, 1)
    }

    #[test]
    fn test_full_region_covers_frame() {
        let bounds = CropRegion::FULL.pixel_bounds(640, 480).unwrap();
        assert_eq!(
            bounds,
            PixelBounds {
                x: 0,
                y: 0,
                width: 640,
                height: 480
            }
        );
    }

    #[test]
    fn test_bounds_are_rounded() {
        let region = CropRegion::new(0.25, 0.5, 0.75, 1.0).unwrap();
        let bounds = region.pixel_bounds(10, 10).unwrap();
        // halves go to the even neighbour: 2.5 -> 2, 7.5 -> 8
        assert_eq!(bounds.x, 2);
        assert_eq!(bounds.width, 6);
        assert_eq!(bounds.y, 5);
        assert_eq!(bounds.height, 5);
    }

    #[test]
    fn test_tiny_region_is_invalid_on_small_frame() {
        let region = CropRegion::new(0.5, 0.5, 0.51, 0.51).unwrap();
        assert!(matches!(
            region.pixel_bounds(10, 10),
            Err(AnalysisError::InvalidCropRegion { .. })
        ));
        assert!(region.pixel_bounds(1000, 1000).is_ok());
    }

    #[test]
    fn test_new_rejects_degenerate_and_out_of_range() {
        assert!(matches!(
            CropRegion::new(0.5, 0.0, 0.5, 1.0),
            Err(RegionError::Degenerate { .. })
        ));
        assert_eq!(
            CropRegion::new(-0.1, 0.0, 1.0, 1.0),
            Err(RegionError::OutOfRange)
        );
        assert_eq!(
            CropRegion::new(0.0, 0.0, f64::NAN, 1.0),
            Err(RegionError::OutOfRange)
        );
    }

    #[test]
    fn test_drag_normalizes_both_axes_symmetrically() {
        let size = (200, 100);
        let expected = CropRegion::new(0.25, 0.2, 0.75, 0.8).unwrap();

        // every drag direction yields the same region
        let drags = [
            ((50.0, 20.0), (150.0, 80.0)),
            ((150.0, 80.0), (50.0, 20.0)),
            ((50.0, 80.0), (150.0, 20.0)),
            ((150.0, 20.0), (50.0, 80.0)),
        ];
        for (start, end) in drags {
            assert_eq!(CropRegion::from_drag(start, end, size).unwrap(), expected);
        }
    }

    #[test]
    fn test_drag_outside_preview_is_clamped() {
        let region = CropRegion::from_drag((-10.0, -10.0), (500.0, 500.0), (100, 100)).unwrap();
        assert_eq!(region, CropRegion::FULL);
    }

    #[test]
    fn test_parse_and_display() {
        let region: CropRegion = "0.1, 0.2,0.9,0.8".parse().unwrap();
        assert_eq!(region.corners(), (0.1, 0.2, 0.9, 0.8));
        assert_eq!(region.to_string().parse::<CropRegion>().unwrap(), region);

        // swapped corners are normalized
        let swapped: CropRegion = "0.9,0.8,0.1,0.2".parse().unwrap();
        assert_eq!(swapped, region);

        assert!(matches!(
            "0.1,0.2,0.3".parse::<CropRegion>(),
            Err(RegionError::Syntax(_))
        ));
        assert!(matches!(
            "a,b,c,d".parse::<CropRegion>(),
            Err(RegionError::Syntax(_))
        ));
    }

    #[test]
    fn test_crop_extracts_pixels() {
        let frame = frame(10, 10);
        let region = CropRegion::new(0.2, 0.3, 0.5, 0.6).unwrap();
        let sub = crop(&frame, &region).unwrap();

        assert_eq!(sub.dimensions(), (3, 3));
        assert_eq!(sub.get_pixel(0, 0), &Rgb([2, 3, 0]));
        assert_eq!(sub.get_pixel(2, 2), &Rgb([4, 5, 0]));
    }

    #[test]
    fn test_crop_or_full_falls_back() {
        let frame = frame(4, 4);
        let region = CropRegion::new(0.0, 0.0, 0.1, 0.1).unwrap();
        let sub = crop_or_full(&frame, &region);
        assert_eq!(sub.dimensions(), (4, 4));
    }
}
