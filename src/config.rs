//! Tuning constants and command-line configuration.
//!
//! Exposure tuning is fixed at compile time. Only deployment details (device,
//! output directory, resolution, cadence) are exposed as flags.

use crate::roi::Roi;
use crate::traits::CaptureSettings;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// ROI as `[x, y, width, height]` fractions: a small patch at the top edge.
pub const DEFAULT_ROI: Roi = Roi {
    x: 0.65,
    y: 0.0,
    width: 0.1,
    height: 0.1,
};

/// Mean ROI intensity the controller steers towards.
pub const TARGET_INTENSITY: f64 = 150.0;

/// `|error|` above `TOLERANCE_FRACTION * TARGET_INTENSITY` triggers correction.
pub const TOLERANCE_FRACTION: f64 = 0.035;

/// Each correction moves the shutter by this fraction of its current value.
pub const STEP_FRACTION: f64 = 0.05;

/// Shutter values strictly above this snap back to `RESET_SHUTTER_US`.
pub const RESET_ABOVE_US: u32 = 1_990_000;

/// Shutter values strictly below this snap back to `RESET_SHUTTER_US`.
pub const RESET_BELOW_US: u32 = 16;

/// Mid-range shutter used when leaving either reset band.
pub const RESET_SHUTTER_US: u32 = 200_000;

/// Shutter commanded at startup; below the floor so the first frame resets.
pub const STARTUP_SHUTTER_US: u32 = 15;

/// Wait after a shutter change before the readback and flush capture.
pub const SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Tuning for the exposure controller and its tolerance gate.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureConfig {
    /// Target mean ROI intensity.
    pub target_intensity: f64,
    /// Tolerance as a fraction of `target_intensity`.
    pub tolerance_fraction: f64,
    /// Proportional step as a fraction of the current shutter.
    pub step_fraction: f64,
    /// Upper reset trigger (exclusive).
    pub reset_above_us: u32,
    /// Lower reset trigger (exclusive).
    pub reset_below_us: u32,
    /// Value both reset bands snap to.
    pub reset_shutter_us: u32,
    /// Initial shutter.
    pub startup_shutter_us: u32,
    /// Settle delay after each commit.
    pub settle: Duration,
}

impl Default for ExposureConfig {
    fn default() -> Self {
        Self {
            target_intensity: TARGET_INTENSITY,
            tolerance_fraction: TOLERANCE_FRACTION,
            step_fraction: STEP_FRACTION,
            reset_above_us: RESET_ABOVE_US,
            reset_below_us: RESET_BELOW_US,
            reset_shutter_us: RESET_SHUTTER_US,
            startup_shutter_us: STARTUP_SHUTTER_US,
            settle: SETTLE_DELAY,
        }
    }
}

impl ExposureConfig {
    /// Absolute error threshold; errors strictly above it need correction.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance_fraction * self.target_intensity
    }
}

/// Full runtime configuration of one capture loop.
#[derive(Debug, Clone)]
pub struct TimelapseConfig {
    /// Requested frame width.
    pub width: u32,
    /// Requested frame height.
    pub height: u32,
    /// Device frame rate in frames per second.
    pub frame_rate: f64,
    /// Sensing region.
    pub roi: Roi,
    /// Exposure tuning.
    pub exposure: ExposureConfig,
    /// Minimum time between saved frames.
    pub interval: Duration,
    /// Directory saved frames land in.
    pub output_dir: PathBuf,
    /// Optional file refreshed with the annotated frame each iteration.
    pub preview: Option<PathBuf>,
}

impl Default for TimelapseConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 960,
            frame_rate: 0.5,
            roi: DEFAULT_ROI,
            exposure: ExposureConfig::default(),
            interval: Duration::from_secs(60),
            output_dir: PathBuf::from("/home/pi/captures"),
            preview: None,
        }
    }
}

impl TimelapseConfig {
    /// Settings pushed to the device at startup.
    #[must_use]
    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            width: self.width,
            height: self.height,
            frame_rate: self.frame_rate,
            shutter_us: self.exposure.startup_shutter_us,
        }
    }
}

/// Command-line interface of the `pi-timelapse` binary.
#[derive(Debug, Parser)]
#[command(name = "pi-timelapse", version, about = "Exposure-controlled time-lapse capture")]
pub struct Cli {
    /// Existing directory for saved frames.
    #[arg(long, env = "PI_TIMELAPSE_OUTPUT_DIR", default_value = "/home/pi/captures")]
    pub output_dir: PathBuf,

    /// V4L2 device index (/dev/videoN).
    #[arg(long, env = "PI_TIMELAPSE_DEVICE", default_value_t = 0)]
    pub device: u32,

    /// Capture width in pixels.
    #[arg(long, env = "PI_TIMELAPSE_WIDTH", default_value_t = 1280)]
    pub width: u32,

    /// Capture height in pixels.
    #[arg(long, env = "PI_TIMELAPSE_HEIGHT", default_value_t = 960)]
    pub height: u32,

    /// Device frame rate in frames per second.
    #[arg(long, env = "PI_TIMELAPSE_FRAME_RATE", default_value_t = 0.5)]
    pub frame_rate: f64,

    /// Seconds between saved frames.
    #[arg(long, env = "PI_TIMELAPSE_INTERVAL", default_value_t = 60)]
    pub interval: u64,

    /// Refresh this PNG with the annotated frame every iteration.
    #[arg(long, env = "PI_TIMELAPSE_PREVIEW")]
    pub preview: Option<PathBuf>,
}

impl Cli {
    /// Build the loop configuration; exposure tuning stays at its defaults.
    #[must_use]
    pub fn into_config(self) -> TimelapseConfig {
        TimelapseConfig {
            width: self.width,
            height: self.height,
            frame_rate: self.frame_rate,
            interval: Duration::from_secs(self.interval),
            output_dir: self.output_dir,
            preview: self.preview,
            ..TimelapseConfig::default()
        }
    }
}
