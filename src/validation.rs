//! Frame validation utilities.
//!
//! `validate_frame` guards the sensing path: every captured frame must match
//! the negotiated format, otherwise the resolved ROI no longer describes the
//! same pixels. The sequence and gradient checks serve the vivid integration
//! tests.

use crate::traits::{CameraError, Format, Frame, Result};

/// Validates that a frame has the dimensions and buffer size of `format`.
///
/// # Errors
///
/// Returns `FrameMismatch` if the width, height or RGB buffer length differ.
pub fn validate_frame(frame: &Frame, format: &Format) -> Result<()> {
    if frame.width != format.width || frame.height != format.height {
        return Err(CameraError::FrameMismatch(format!(
            "expected {}x{}, got {}x{}",
            format.width, format.height, frame.width, frame.height
        )));
    }

    let expected = format.width as usize * format.height as usize * 3;
    if frame.data.len() != expected {
        return Err(CameraError::FrameMismatch(format!(
            "expected {expected} RGB bytes, got {}",
            frame.data.len()
        )));
    }

    Ok(())
}

/// Validates that a frame contains a horizontal gradient pattern.
///
/// Samples the center row every 10 pixels and checks that luminance never
/// decreases from left to right and spans at least 50 levels overall.
///
/// # Errors
///
/// Returns `StreamError` if:
/// - A sample lies outside the frame
/// - The luminance doesn't increase monotonically
/// - The total luminance change is too small (solid color)
pub fn validate_gradient(frame: &Frame) -> Result<()> {
    let center_y = frame.height / 2;
    let mut first_luminance: Option<f32> = None;
    let mut prev_luminance: Option<f32> = None;

    for x in (0..frame.width).step_by(10) {
        let (r, g, b) = frame.pixel_at(x, center_y).ok_or_else(|| {
            CameraError::StreamError(format!("Failed to get pixel at ({x}, {center_y})"))
        })?;

        // Y' in Rec. 601
        let luminance = 0.114f32.mul_add(
            f32::from(b),
            0.587f32.mul_add(f32::from(g), 0.299 * f32::from(r)),
        );

        if first_luminance.is_none() {
            first_luminance = Some(luminance);
        }

        // 2.0 of slack for conversion noise
        if let Some(prev) = prev_luminance {
            if luminance < prev - 2.0 {
                return Err(CameraError::StreamError(format!(
                    "Gradient not monotonically increasing at x={x}: \
                     luminance {luminance} < previous {prev}"
                )));
            }
        }

        prev_luminance = Some(luminance);
    }

    if let (Some(first), Some(last)) = (first_luminance, prev_luminance) {
        let luminance_change = last - first;
        if luminance_change < 50.0 {
            return Err(CameraError::StreamError(format!(
                "Insufficient luminance change for gradient: {luminance_change} \
                 (expected at least 50.0)"
            )));
        }
    }

    Ok(())
}

/// Validates that a sequence of frames has incrementing sequence numbers.
///
/// # Errors
///
/// Returns `StreamError` if:
/// - The frames slice is empty
/// - Any sequence number doesn't increment by exactly 1 from the previous
pub fn validate_frame_sequence(frames: &[Frame]) -> Result<()> {
    if frames.is_empty() {
        return Err(CameraError::StreamError(
            "Cannot validate empty frame sequence".to_owned(),
        ));
    }

    for (i, pair) in frames.windows(2).enumerate() {
        if let [prev, curr] = pair {
            let expected = prev.metadata.sequence.wrapping_add(1);
            if curr.metadata.sequence != expected {
                return Err(CameraError::StreamError(format!(
                    "Frame sequence gap at index {}: expected {expected}, got {}",
                    i + 1,
                    curr.metadata.sequence
                )));
            }
        }
    }

    Ok(())
}
