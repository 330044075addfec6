//! Persistence of accepted frames.

use crate::traits::{CameraError, Frame, Result};
use chrono::{DateTime, Utc};
use image::{ImageFormat, RgbImage};
use std::path::{Path, PathBuf};

/// Writes frames as PNG files named `{unix_seconds}_{sequence:07}.png`.
#[derive(Debug, Clone)]
pub struct FrameStore {
    dir: PathBuf,
}

impl FrameStore {
    /// Use `dir` as the output directory. It must already exist.
    pub fn open<P: Into<PathBuf>>(dir: P) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(CameraError::OutputDirMissing(dir));
        }
        Ok(Self { dir })
    }

    /// Output directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for a frame saved at `unix_seconds` as number `sequence`.
    #[must_use]
    pub fn file_name(unix_seconds: i64, sequence: u32) -> String {
        format!("{unix_seconds}_{sequence:07}.png")
    }

    /// Encode `frame` losslessly and return the written path.
    pub fn save(&self, frame: &Frame, sequence: u32, timestamp: DateTime<Utc>) -> Result<PathBuf> {
        let path = self
            .dir
            .join(Self::file_name(timestamp.timestamp(), sequence));
        log::info!("saving image to {}", path.display());
        write_png(frame, &path)?;
        Ok(path)
    }
}

/// Encode `frame` as PNG at `path`.
pub(crate) fn write_png(frame: &Frame, path: &Path) -> Result<()> {
    let image = RgbImage::from_raw(frame.width, frame.height, frame.data.clone()).ok_or_else(
        || {
            CameraError::FrameMismatch(format!(
                "{} bytes do not fill a {}x{} RGB image",
                frame.data.len(),
                frame.width,
                frame.height
            ))
        },
    )?;
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
