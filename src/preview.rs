//! Operator preview with the ROI outlined.

use crate::roi::PixelRect;
use crate::store::write_png;
use crate::traits::{Frame, Result};
use std::fs;
use std::path::{Path, PathBuf};

const OUTER: (u8, u8, u8) = (0, 0, 0);
const INNER: (u8, u8, u8) = (255, 255, 255);

/// Outline `rect` with a light line on its edge pixels inside a dark ring
/// one pixel further out. Pixels outside the frame are skipped.
pub fn draw_roi(frame: &mut Frame, rect: &PixelRect) {
    let left = i64::from(rect.left);
    let top = i64::from(rect.top);
    let right = i64::from(rect.right) - 1;
    let bottom = i64::from(rect.bottom) - 1;

    outline(frame, left - 1, top - 1, right + 1, bottom + 1, OUTER);
    outline(frame, left, top, right, bottom, INNER);
}

fn outline(frame: &mut Frame, left: i64, top: i64, right: i64, bottom: i64, rgb: (u8, u8, u8)) {
    let mut put = |x: i64, y: i64| {
        if let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) {
            frame.put_pixel(x, y, rgb);
        }
    };
    for x in left..=right {
        put(x, top);
        put(x, bottom);
    }
    for y in top..=bottom {
        put(left, y);
        put(right, y);
    }
}

/// Keeps a PNG on disk showing the latest frame with its ROI.
#[derive(Debug, Clone)]
pub struct PreviewWriter {
    path: PathBuf,
    staging: PathBuf,
}

impl PreviewWriter {
    /// Preview written to `path`.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        let staging = path.with_extension("tmp");
        Self { path, staging }
    }

    /// Target path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Annotate a copy of `frame` and replace the preview file.
    ///
    /// The rename keeps readers from seeing a half-written image.
    pub fn show(&self, frame: &Frame, rect: &PixelRect) -> Result<()> {
        let mut annotated = frame.clone();
        draw_roi(&mut annotated, rect);
        write_png(&annotated, &self.staging)?;
        fs::rename(&self.staging, &self.path)?;
        Ok(())
    }
}
