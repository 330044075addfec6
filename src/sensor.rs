//! ROI brightness sensing.

use crate::roi::PixelRect;
use crate::traits::{Frame, Result};

/// Signed brightness error of `frame` inside `rect`: ROI mean minus `target`.
///
/// The mean runs over every channel of every pixel in the rectangle, so
/// channel order does not matter. Negative means the scene is darker than
/// the target.
pub fn measure(frame: &Frame, rect: &PixelRect, target: f64) -> Result<f64> {
    rect.check_within(frame.width, frame.height)?;

    let row_stride = frame.width as usize * 3;
    let start = rect.left as usize * 3;
    let end = rect.right as usize * 3;

    let sum: u64 = frame
        .data
        .chunks(row_stride)
        .skip(rect.top as usize)
        .take((rect.bottom - rect.top) as usize)
        .filter_map(|row| row.get(start..end))
        .flat_map(|span| span.iter().map(|&v| u64::from(v)))
        .sum();

    #[allow(clippy::cast_precision_loss)]
    let mean = sum as f64 / (rect.area() * 3) as f64;
    Ok(mean - target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{gradient_frame, solid_frame};
    use crate::traits::CameraError;

    fn rect(left: u32, top: u32, right: u32, bottom: u32) -> PixelRect {
        PixelRect {
            left,
            top,
            right,
            bottom,
        }
    }

    #[test]
    fn test_on_target_is_zero() {
        let frame = solid_frame(64, 48, 150);
        let error = measure(&frame, &rect(10, 0, 20, 10), 150.0).expect("measure");
        assert!(error.abs() < f64::EPSILON);
    }

    #[test]
    fn test_dark_scene_is_negative() {
        let frame = solid_frame(64, 48, 100);
        let error = measure(&frame, &rect(0, 0, 8, 8), 150.0).expect("measure");
        assert!((error + 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_only_roi_pixels_count() {
        let mut frame = solid_frame(32, 32, 0);
        for y in 4..8 {
            for x in 4..8 {
                frame.put_pixel(x, y, (200, 200, 200));
            }
        }
        let error = measure(&frame, &rect(4, 4, 8, 8), 150.0).expect("measure");
        assert!((error - 50.0).abs() < f64::EPSILON);

        // one extra column of zeros dilutes the mean to 200 * 16 / 20
        let error = measure(&frame, &rect(4, 4, 9, 8), 0.0).expect("measure");
        assert!((error - 160.0).abs() < 1e-9);
    }

    #[test]
    fn test_channels_are_averaged() {
        let mut frame = solid_frame(2, 1, 0);
        frame.put_pixel(0, 0, (30, 60, 90));
        frame.put_pixel(1, 0, (30, 60, 90));
        let error = measure(&frame, &rect(0, 0, 2, 1), 0.0).expect("measure");
        assert!((error - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_gradient_roi_position_matters() {
        let frame = gradient_frame(640, 480);
        let left = measure(&frame, &rect(0, 0, 64, 48), 0.0).expect("measure");
        let right = measure(&frame, &rect(576, 0, 640, 48), 0.0).expect("measure");
        assert!(right > left);
    }

    #[test]
    fn test_roi_outside_frame_fails() {
        let frame = solid_frame(16, 16, 0);
        let result = measure(&frame, &rect(8, 8, 20, 12), 150.0);
        assert!(matches!(result, Err(CameraError::InvalidRoi(_))));
    }
}
