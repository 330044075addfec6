//! The capture loop and the device guard it runs under.

use crate::cadence::{Cadence, Decision};
use crate::config::TimelapseConfig;
use crate::exposure::{ExposureAdjustment, ExposureController};
use crate::preview::PreviewWriter;
use crate::roi::PixelRect;
use crate::sensor::measure;
use crate::store::FrameStore;
use crate::traits::{CameraDevice, Format, Result};
use crate::validation::validate_frame;
use chrono::{DateTime, Utc};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Owns a device and releases it when dropped, whichever way the owner exits.
pub struct CaptureSession<D: CameraDevice> {
    device: D,
}

impl<D: CameraDevice> CaptureSession<D> {
    /// Take ownership of `device`.
    pub const fn new(device: D) -> Self {
        Self { device }
    }
}

impl<D: CameraDevice> Deref for CaptureSession<D> {
    type Target = D;

    fn deref(&self) -> &D {
        &self.device
    }
}

impl<D: CameraDevice> DerefMut for CaptureSession<D> {
    fn deref_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

impl<D: CameraDevice> Drop for CaptureSession<D> {
    fn drop(&mut self) {
        self.device.release();
    }
}

/// Result of one loop iteration.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Exposure was corrected; nothing was saved.
    Adjusted(ExposureAdjustment),
    /// The frame was written to this path.
    Saved(PathBuf),
    /// In tolerance but the save interval has not elapsed.
    Idle,
}

/// Exposure-controlled time-lapse over one camera.
pub struct Timelapse<D: CameraDevice> {
    session: CaptureSession<D>,
    format: Format,
    roi: PixelRect,
    target: f64,
    exposure: ExposureController,
    cadence: Cadence,
    store: FrameStore,
    preview: Option<PreviewWriter>,
}

impl<D: CameraDevice> Timelapse<D> {
    /// Configure `device` and resolve the ROI against the negotiated format.
    ///
    /// The device is released again if any of this fails.
    pub fn new(device: D, config: TimelapseConfig, store: FrameStore) -> Result<Self> {
        let mut session = CaptureSession::new(device);
        let format = session.configure(&config.capture_settings())?;
        let roi = config.roi.resolve(format.width, format.height)?;
        log::info!(
            "ROI {:?} at {}x{}, target {}, save every {:?} to {}",
            roi,
            format.width,
            format.height,
            config.exposure.target_intensity,
            config.interval,
            store.dir().display()
        );

        let cadence = Cadence::new(config.exposure.tolerance(), config.interval);
        Ok(Self {
            session,
            format,
            roi,
            target: config.exposure.target_intensity,
            exposure: ExposureController::new(config.exposure),
            cadence,
            store,
            preview: config.preview.map(PreviewWriter::new),
        })
    }

    /// Resolved sensing rectangle.
    #[must_use]
    pub const fn roi(&self) -> &PixelRect {
        &self.roi
    }

    /// Currently commanded shutter in microseconds.
    #[must_use]
    pub const fn shutter_us(&self) -> u32 {
        self.exposure.shutter_us()
    }

    /// Capture one frame and act on it. `now` drives the save interval and
    /// `wall_clock` names saved files.
    pub fn step(&mut self, now: Instant, wall_clock: DateTime<Utc>) -> Result<Outcome> {
        let frame = self.session.capture_frame()?;
        validate_frame(&frame, &self.format)?;
        let error = measure(&frame, &self.roi, self.target)?;

        let outcome = match self.cadence.decide(error, now) {
            Decision::Adjust => {
                Outcome::Adjusted(self.exposure.correct(&mut *self.session, error)?)
            }
            Decision::Save { sequence } => {
                let path = self.store.save(&frame, sequence, wall_clock)?;
                self.cadence.mark_saved(now);
                Outcome::Saved(path)
            }
            Decision::Idle => Outcome::Idle,
        };

        if let Some(preview) = &self.preview {
            preview.show(&frame, &self.roi)?;
        }
        Ok(outcome)
    }

    /// Run until `stop` is set. The flag is checked once per iteration, so
    /// an in-flight capture or settle delay finishes first.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<()> {
        while !stop.load(Ordering::SeqCst) {
            self.step(Instant::now(), Utc::now())?;
        }
        log::info!(
            "stop requested after {} saved frames, shutter {} us",
            self.cadence.sequence(),
            self.exposure.shutter_us()
        );
        Ok(())
    }
}
