//! Mock device implementation for testing without hardware.

use crate::traits::{
    CameraDevice, CameraError, CaptureSettings, DeviceCapabilities, Format, FourCC, Frame,
    FrameMetadata, Result,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

/// Test pattern types for mock frame generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestPattern {
    /// Every channel of every pixel set to the same level.
    Solid(u8),
    /// Horizontal gradient from dark to light.
    Gradient,
}

/// Everything the mock observed, shared with the test after the device moves.
#[derive(Debug, Default)]
pub struct MockLog {
    /// Settings passed to `configure`.
    pub configured: Option<CaptureSettings>,
    /// Every value passed to `set_shutter_speed`, in order.
    pub shutter_history: Vec<u32>,
    /// Number of `capture_frame` calls, including flushes.
    pub captures: u32,
    /// Number of `release` calls.
    pub releases: u32,
}

/// Mock device for testing without hardware.
///
/// Frames follow a script of patterns; once the script is exhausted the last
/// pattern repeats.
pub struct MockDevice {
    capabilities: DeviceCapabilities,
    format: Format,
    script: VecDeque<TestPattern>,
    current: TestPattern,
    shutter_us: u32,
    fail_at_capture: Option<u32>,
    log: Rc<RefCell<MockLog>>,
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDevice {
    /// Create a new mock device with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            capabilities: DeviceCapabilities {
                driver: "mock".to_owned(),
                card: "Mock Camera".to_owned(),
                bus_info: "mock:0".to_owned(),
                can_capture: true,
                can_stream: true,
            },
            format: Format::new(640, 480, FourCC::RGB3),
            script: VecDeque::new(),
            current: TestPattern::Solid(150),
            shutter_us: 0,
            fail_at_capture: None,
            log: Rc::new(RefCell::new(MockLog::default())),
        }
    }

    /// Queue patterns for successive captures.
    #[must_use]
    pub fn with_script<I>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = TestPattern>,
    {
        self.script.extend(patterns);
        self
    }

    /// Make the `n`th capture (0-based) fail with a stream error.
    #[must_use]
    pub fn failing_at(mut self, n: u32) -> Self {
        self.fail_at_capture = Some(n);
        self
    }

    /// Handle to the shared call log.
    #[must_use]
    pub fn log(&self) -> Rc<RefCell<MockLog>> {
        Rc::clone(&self.log)
    }
}

impl CameraDevice for MockDevice {
    fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    fn configure(&mut self, settings: &CaptureSettings) -> Result<Format> {
        self.format = Format::new(settings.width, settings.height, FourCC::RGB3);
        self.shutter_us = settings.shutter_us;
        self.log.borrow_mut().configured = Some(settings.clone());
        Ok(self.format.clone())
    }

    fn capture_frame(&mut self) -> Result<Frame> {
        let seq = {
            let mut log = self.log.borrow_mut();
            let seq = log.captures;
            log.captures += 1;
            seq
        };

        if self.fail_at_capture == Some(seq) {
            return Err(CameraError::StreamError("mock capture failure".to_owned()));
        }

        if let Some(next) = self.script.pop_front() {
            self.current = next;
        }

        let mut frame = match self.current {
            TestPattern::Solid(level) => solid_frame(self.format.width, self.format.height, level),
            TestPattern::Gradient => gradient_frame(self.format.width, self.format.height),
        };
        frame.metadata = FrameMetadata {
            sequence: seq,
            timestamp: Duration::from_secs(u64::from(seq) * 2), // 0.5 fps
        };
        Ok(frame)
    }

    fn exposure_speed(&self) -> Result<u32> {
        Ok(self.shutter_us)
    }

    fn set_shutter_speed(&mut self, shutter_us: u32) -> Result<()> {
        self.shutter_us = shutter_us;
        self.log.borrow_mut().shutter_history.push(shutter_us);
        Ok(())
    }

    fn release(&mut self) {
        self.log.borrow_mut().releases += 1;
    }
}

/// Solid frame where every byte equals `level`.
#[must_use]
pub fn solid_frame(width: u32, height: u32, level: u8) -> Frame {
    Frame {
        width,
        height,
        data: vec![level; width as usize * height as usize * 3],
        metadata: FrameMetadata::default(),
    }
}

/// Gray horizontal gradient, black at the left edge.
#[must_use]
pub fn gradient_frame(width: u32, height: u32) -> Frame {
    let mut data = Vec::with_capacity(width as usize * height as usize * 3);
    for _ in 0..height {
        for x in 0..width {
            #[allow(clippy::cast_possible_truncation)]
            let level = ((x * 255) / width) as u8;
            data.extend_from_slice(&[level, level, level]);
        }
    }
    Frame {
        width,
        height,
        data,
        metadata: FrameMetadata::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> CaptureSettings {
        CaptureSettings {
            width: 64,
            height: 48,
            frame_rate: 0.5,
            shutter_us: 15,
        }
    }

    #[test]
    fn test_mock_device_creation() {
        let device = MockDevice::new();
        assert_eq!(device.capabilities().driver, "mock");
        assert!(device.capabilities().can_capture);
        assert!(device.capabilities().can_stream);
    }

    #[test]
    fn test_mock_configure_applies_settings() {
        let mut device = MockDevice::new();
        let format = device.configure(&settings()).expect("configure should succeed");
        assert_eq!(format.width, 64);
        assert_eq!(format.height, 48);
        assert_eq!(device.exposure_speed().expect("exposure_speed"), 15);
        assert!(device.log().borrow().configured.is_some());
    }

    #[test]
    fn test_mock_script_then_repeat() {
        let mut device =
            MockDevice::new().with_script([TestPattern::Solid(10), TestPattern::Solid(20)]);
        device.configure(&settings()).expect("configure should succeed");

        let levels: Vec<u8> = (0..4)
            .map(|_| device.capture_frame().expect("capture").data[0])
            .collect();
        assert_eq!(levels, vec![10, 20, 20, 20]);

        let frame = device.capture_frame().expect("capture");
        assert_eq!(frame.metadata.sequence, 4);
    }

    #[test]
    fn test_mock_failure_injection() {
        let mut device = MockDevice::new().failing_at(1);
        device.configure(&settings()).expect("configure should succeed");
        assert!(device.capture_frame().is_ok());
        assert!(device.capture_frame().is_err());
    }

    #[test]
    fn test_gradient_pattern() {
        let frame = gradient_frame(640, 480);
        assert_eq!(frame.data.len(), 640 * 480 * 3);

        // Left edge should be dark
        assert!(frame.data[0] < 10);

        // Right edge should be bright
        let (r, _, _) = frame.pixel_at(639, 479).expect("pixel in frame");
        assert!(r > 200);
    }

    #[test]
    fn test_shutter_history_recorded() {
        let mut device = MockDevice::new();
        device.set_shutter_speed(1000).expect("set_shutter_speed");
        device.set_shutter_speed(2000).expect("set_shutter_speed");
        assert_eq!(device.log().borrow().shutter_history, vec![1000, 2000]);
        assert_eq!(device.exposure_speed().expect("exposure_speed"), 2000);
    }
}
