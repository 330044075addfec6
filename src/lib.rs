//! Pi-Timelapse: exposure-controlled time-lapse capture for V4L2 cameras
//!
//! Each captured frame is measured over a fixed region of interest. Frames
//! that are too dark or too bright nudge the shutter speed; well exposed
//! frames are saved as PNG once the save interval has elapsed.

pub mod cadence;
pub mod config;
pub mod device;
pub mod exposure;
pub mod preview;
pub mod roi;
pub mod sensor;
pub mod store;
pub mod timelapse;
pub mod traits;
pub mod validation;

#[cfg(test)]
pub mod mock;

pub use cadence::{Cadence, Decision};
pub use config::{Cli, ExposureConfig, TimelapseConfig};
pub use device::V4L2Device;
pub use exposure::{next_shutter, ExposureAdjustment, ExposureController};
pub use roi::{PixelRect, Roi};
pub use store::FrameStore;
pub use timelapse::{CaptureSession, Outcome, Timelapse};
pub use traits::{
    CameraDevice, CameraError, CaptureSettings, DeviceCapabilities, Format, FourCC, Frame,
    FrameMetadata,
};
