//! Core traits and types for the camera abstraction.

use std::path::PathBuf;
use std::time::Duration;

/// Pixel format representation (e.g., YUYV, RGB3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// Create a new `FourCC` from a 4-byte array.
    #[must_use]
    pub const fn new(code: &[u8; 4]) -> Self {
        Self(*code)
    }

    /// YUYV pixel format (4:2:2 packed).
    pub const YUYV: Self = Self::new(b"YUYV");
    /// RGB3 pixel format (24-bit RGB).
    pub const RGB3: Self = Self::new(b"RGB3");
}

impl From<v4l::FourCC> for FourCC {
    fn from(fourcc: v4l::FourCC) -> Self {
        Self(fourcc.repr)
    }
}

impl From<FourCC> for v4l::FourCC {
    fn from(fourcc: FourCC) -> Self {
        Self::new(&fourcc.0)
    }
}

/// Video format negotiated with the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel format.
    pub fourcc: FourCC,
    /// Bytes per line (stride).
    pub stride: u32,
}

impl Format {
    /// Create a format with a tightly packed stride for `fourcc`.
    #[must_use]
    pub const fn new(width: u32, height: u32, fourcc: FourCC) -> Self {
        let bytes_per_pixel = match fourcc.0 {
            [b'R', b'G', b'B', b'3'] => 3,
            _ => 2,
        };
        Self {
            width,
            height,
            fourcc,
            stride: width * bytes_per_pixel,
        }
    }
}

/// Settings pushed to the device once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    /// Requested frame width in pixels.
    pub width: u32,
    /// Requested frame height in pixels.
    pub height: u32,
    /// Frames per second; may be below one.
    pub frame_rate: f64,
    /// Initial shutter speed in microseconds.
    pub shutter_us: u32,
}

/// Device capability flags.
#[derive(Debug, Clone, Default)]
pub struct DeviceCapabilities {
    /// Driver name.
    pub driver: String,
    /// Card/device name.
    pub card: String,
    /// Bus information.
    pub bus_info: String,
    /// Whether the device can capture video.
    pub can_capture: bool,
    /// Whether the device supports streaming.
    pub can_stream: bool,
}

/// Metadata for a captured frame.
#[derive(Debug, Clone, Default)]
pub struct FrameMetadata {
    /// Driver frame sequence number.
    pub sequence: u32,
    /// Capture timestamp.
    pub timestamp: Duration,
}

/// A captured frame as tightly packed RGB8, row-major.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `width * height * 3` bytes in R, G, B order.
    pub data: Vec<u8>,
    /// Frame metadata.
    pub metadata: FrameMetadata,
}

impl Frame {
    /// Build a frame from an `RGB3` driver buffer, dropping any row padding.
    pub fn from_rgb3(buf: &[u8], format: &Format, metadata: FrameMetadata) -> Result<Self> {
        let row_len = format.width as usize * 3;
        let stride = (format.stride as usize).max(row_len);
        let mut data = Vec::with_capacity(row_len * format.height as usize);

        for row in buf.chunks(stride).take(format.height as usize) {
            let pixels = row.get(..row_len).ok_or_else(|| short_buffer(buf.len(), format))?;
            data.extend_from_slice(pixels);
        }

        if data.len() != row_len * format.height as usize {
            return Err(short_buffer(buf.len(), format));
        }

        Ok(Self {
            width: format.width,
            height: format.height,
            data,
            metadata,
        })
    }

    /// Build a frame from a `YUYV` driver buffer, converting to RGB.
    ///
    /// Each `[Y0 U Y1 V]` group yields two pixels sharing the same chroma.
    pub fn from_yuyv(buf: &[u8], format: &Format, metadata: FrameMetadata) -> Result<Self> {
        let row_len = format.width as usize * 2;
        let stride = (format.stride as usize).max(row_len);
        let mut data = Vec::with_capacity(format.width as usize * format.height as usize * 3);

        for row in buf.chunks(stride).take(format.height as usize) {
            let pixels = row.get(..row_len).ok_or_else(|| short_buffer(buf.len(), format))?;
            for group in pixels.chunks_exact(4) {
                if let [y0, u, y1, v] = *group {
                    let (r, g, b) = yuv_to_rgb(y0, u, v);
                    data.extend_from_slice(&[r, g, b]);
                    let (r, g, b) = yuv_to_rgb(y1, u, v);
                    data.extend_from_slice(&[r, g, b]);
                }
            }
        }

        if data.len() != format.width as usize * format.height as usize * 3 {
            return Err(short_buffer(buf.len(), format));
        }

        Ok(Self {
            width: format.width,
            height: format.height,
            data,
            metadata,
        })
    }

    /// Get RGB values for a pixel, or `None` outside the frame.
    #[must_use]
    pub fn pixel_at(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 3;
        match self.data.get(offset..offset + 3)? {
            [r, g, b] => Some((*r, *g, *b)),
            _ => None,
        }
    }

    /// Overwrite one pixel; coordinates outside the frame are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, rgb: (u8, u8, u8)) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 3;
        if let Some(px) = self.data.get_mut(offset..offset + 3) {
            px.copy_from_slice(&[rgb.0, rgb.1, rgb.2]);
        }
    }
}

fn short_buffer(len: usize, format: &Format) -> CameraError {
    CameraError::FrameMismatch(format!(
        "buffer of {len} bytes too small for {}x{} {:?} (stride {})",
        format.width, format.height, format.fourcc, format.stride
    ))
}

/// Convert YUV values to RGB.
///
/// Uses the ITU-R BT.601 conversion formula. Results are clamped to 0-255.
#[must_use]
#[allow(clippy::many_single_char_names)]
pub(crate) fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y_f = f32::from(y);
    let u_f = f32::from(u) - 128.0;
    let v_f = f32::from(v) - 128.0;

    let r = 1.402f32.mul_add(v_f, y_f);
    let g = 0.714_14f32.mul_add(-v_f, 0.344_14f32.mul_add(-u_f, y_f));
    let b = 1.772f32.mul_add(u_f, y_f);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let clamp = |val: f32| -> u8 { val.clamp(0.0, 255.0) as u8 };

    (clamp(r), clamp(g), clamp(b))
}

/// Error type for capture operations.
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    /// Device with given index was not found.
    #[error("Device {0} not found")]
    DeviceNotFound(u32),
    /// Failed to open device.
    #[error("Failed to open device: {0}")]
    DeviceOpenFailed(String),
    /// Requested format is not supported.
    #[error("Format not supported: {0:?}")]
    FormatNotSupported(Format),
    /// A camera control could not be read or written.
    #[error("Control error: {0}")]
    Control(String),
    /// Error during streaming operation.
    #[error("Stream error: {0}")]
    StreamError(String),
    /// Captured frame does not match the negotiated format.
    #[error("Frame mismatch: {0}")]
    FrameMismatch(String),
    /// Region of interest is empty or leaves the frame.
    #[error("Invalid region of interest: {0}")]
    InvalidRoi(String),
    /// Output directory is absent.
    #[error("Directory {} does not exist", .0.display())]
    OutputDirMissing(PathBuf),
    /// Image encoding failed.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for capture operations.
pub type Result<T> = std::result::Result<T, CameraError>;

/// Abstraction over a single camera.
///
/// Calls block; `capture_frame` returns once the device delivers the next
/// frame at its configured rate.
pub trait CameraDevice {
    /// Get device capabilities.
    fn capabilities(&self) -> &DeviceCapabilities;

    /// Apply resolution, frame rate and initial shutter and start streaming.
    /// Returns the format actually negotiated with the driver.
    fn configure(&mut self, settings: &CaptureSettings) -> Result<Format>;

    /// Capture the next frame as RGB.
    fn capture_frame(&mut self) -> Result<Frame>;

    /// Exposure time the sensor reports it is using, in microseconds.
    fn exposure_speed(&self) -> Result<u32>;

    /// Command a new shutter speed in microseconds.
    fn set_shutter_speed(&mut self, shutter_us: u32) -> Result<()>;

    /// Stop streaming and release the device. Must be idempotent.
    fn release(&mut self);
}
