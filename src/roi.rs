//! Region of interest used for brightness sensing.

use crate::traits::{CameraError, Result};

/// Rectangle expressed as fractions of the frame dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roi {
    /// Left edge as a fraction of frame width.
    pub x: f64,
    /// Top edge as a fraction of frame height.
    pub y: f64,
    /// Width as a fraction of frame width.
    pub width: f64,
    /// Height as a fraction of frame height.
    pub height: f64,
}

/// Pixel rectangle, `left`/`top` inclusive and `right`/`bottom` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    /// First column inside the rectangle.
    pub left: u32,
    /// First row inside the rectangle.
    pub top: u32,
    /// First column past the rectangle.
    pub right: u32,
    /// First row past the rectangle.
    pub bottom: u32,
}

impl PixelRect {
    /// Number of pixels covered.
    #[must_use]
    pub const fn area(&self) -> u64 {
        (self.right.saturating_sub(self.left) as u64) * (self.bottom.saturating_sub(self.top) as u64)
    }

    /// Fails unless the rectangle is non-empty and fits in a `width` x `height` frame.
    pub fn check_within(&self, width: u32, height: u32) -> Result<()> {
        if self.area() == 0 {
            return Err(CameraError::InvalidRoi(format!("{self:?} is empty")));
        }
        if self.right > width || self.bottom > height {
            return Err(CameraError::InvalidRoi(format!(
                "{self:?} exceeds {width}x{height} frame"
            )));
        }
        Ok(())
    }
}

impl Roi {
    /// Resolve to pixel corners for a `width` x `height` frame.
    ///
    /// Offsets and sizes are each truncated separately, so the bottom-right
    /// corner is `top_left + trunc(size)` rather than `trunc(offset + size)`.
    pub fn resolve(&self, width: u32, height: u32) -> Result<PixelRect> {
        let fractions = [self.x, self.y, self.width, self.height];
        if fractions.iter().any(|f| !(0.0..=1.0).contains(f)) {
            return Err(CameraError::InvalidRoi(format!(
                "{self:?} has fractions outside [0, 1]"
            )));
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let scale = |fraction: f64, extent: u32| (f64::from(extent) * fraction) as u32;

        let left = scale(self.x, width);
        let top = scale(self.y, height);
        let rect = PixelRect {
            left,
            top,
            right: left + scale(self.width, width),
            bottom: top + scale(self.height, height),
        };
        rect.check_within(width, height)?;
        Ok(rect)
    }
}
