//! Shutter-speed feedback controller.
//!
//! The shutter moves by a fixed fraction of its *current* value, so
//! convergence is geometric and never divides by the error. Two reset bands
//! snap a runaway shutter back to a mid-range value instead of clamping it.

use crate::config::ExposureConfig;
use crate::traits::{CameraDevice, Result};
use std::thread;

/// Next shutter value for `current` given the signed brightness `error`.
///
/// Reset bands are checked before the proportional step:
/// 1. `current > reset_above_us` resets
/// 2. `current < reset_below_us` resets
/// 3. a dark scene (`error < 0`) lengthens the exposure
/// 4. anything else shortens it
///
/// The stepped value is truncated to whole microseconds.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn next_shutter(current: u32, error: f64, config: &ExposureConfig) -> u32 {
    let step = f64::from(current) * config.step_fraction;

    if current > config.reset_above_us || current < config.reset_below_us {
        config.reset_shutter_us
    } else if error < 0.0 {
        (f64::from(current) + step) as u32
    } else {
        (f64::from(current) - step) as u32
    }
}

/// Record of one committed correction.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureAdjustment {
    /// Brightness error that triggered the correction.
    pub error: f64,
    /// Exposure the device reported after settling, in microseconds.
    pub actual_exposure_us: u32,
    /// Shutter value that was commanded.
    pub shutter_us: u32,
}

/// Owns the shutter state and pushes changes to the device.
#[derive(Debug)]
pub struct ExposureController {
    config: ExposureConfig,
    shutter_us: u32,
}

impl ExposureController {
    /// Start at the configured startup shutter.
    #[must_use]
    pub fn new(config: ExposureConfig) -> Self {
        let shutter_us = config.startup_shutter_us;
        Self { config, shutter_us }
    }

    /// Currently commanded shutter in microseconds.
    #[must_use]
    pub const fn shutter_us(&self) -> u32 {
        self.shutter_us
    }

    /// Advance the shutter state for `error` and return the new value.
    pub fn adjust(&mut self, error: f64) -> u32 {
        self.shutter_us = next_shutter(self.shutter_us, error, &self.config);
        self.shutter_us
    }

    /// Push the current shutter to `device`, wait for the sensor to settle,
    /// then discard one frame that was exposed with the old setting.
    pub fn commit<D: CameraDevice>(
        &self,
        device: &mut D,
        error: f64,
    ) -> Result<ExposureAdjustment> {
        device.set_shutter_speed(self.shutter_us)?;
        thread::sleep(self.config.settle);

        let actual_exposure_us = device.exposure_speed()?;
        log::info!(
            "diff: {error}, exposure: {actual_exposure_us} us, new_shutter_speed: {}",
            self.shutter_us
        );

        device.capture_frame()?;

        Ok(ExposureAdjustment {
            error,
            actual_exposure_us,
            shutter_us: self.shutter_us,
        })
    }

    /// `adjust` followed by `commit`.
    pub fn correct<D: CameraDevice>(
        &mut self,
        device: &mut D,
        error: f64,
    ) -> Result<ExposureAdjustment> {
        self.adjust(error);
        self.commit(device, error)
    }
}
