//! V4L2 device implementation using the v4l crate.

use ouroboros::self_referencing;
use std::path::Path;
use std::time::Duration;
use v4l::buffer::Type;
use v4l::control::{Control, Value};
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::capture::Parameters;
use v4l::video::Capture;
use v4l::{Device, Fraction};

use crate::traits::{
    CameraDevice, CameraError, CaptureSettings, DeviceCapabilities, Format, FourCC, Frame,
    FrameMetadata, Result,
};

const V4L2_CID_EXPOSURE_AUTO: u32 = 0x009a_0901;
const V4L2_CID_EXPOSURE_ABSOLUTE: u32 = 0x009a_0902;
const V4L2_EXPOSURE_MANUAL: i64 = 1;

/// `V4L2_CID_EXPOSURE_ABSOLUTE` counts in 100 µs units.
const EXPOSURE_UNIT_US: u32 = 100;

const BUFFER_COUNT: u32 = 4;

#[self_referencing]
struct Streaming {
    device: Device,
    format: Format,
    #[borrows(device)]
    #[covariant]
    stream: Stream<'this>,
}

enum State {
    Idle(Device),
    Streaming(Streaming),
    Released,
}

/// V4L2 camera. Streaming starts in `configure`.
pub struct V4L2Device {
    index: u32,
    capabilities: DeviceCapabilities,
    state: State,
}

impl V4L2Device {
    /// Open a V4L2 device by index (e.g., 0 for /dev/video0).
    pub fn open(index: u32) -> Result<Self> {
        if !Path::new(&format!("/dev/video{index}")).exists() {
            return Err(CameraError::DeviceNotFound(index));
        }

        let device = Device::new(index as usize)
            .map_err(|err| CameraError::DeviceOpenFailed(err.to_string()))?;

        let caps = device
            .query_caps()
            .map_err(|err| CameraError::DeviceOpenFailed(err.to_string()))?;

        let capabilities = DeviceCapabilities {
            driver: caps.driver,
            card: caps.card,
            bus_info: caps.bus,
            can_capture: caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE),
            can_stream: caps.capabilities.contains(v4l::capability::Flags::STREAMING),
        };

        Ok(Self {
            index,
            capabilities,
            state: State::Idle(device),
        })
    }

    fn handle(&self) -> Result<&Device> {
        match &self.state {
            State::Idle(device) => Ok(device),
            State::Streaming(streaming) => Ok(streaming.borrow_device()),
            State::Released => Err(released()),
        }
    }
}

fn released() -> CameraError {
    CameraError::StreamError("device already released".to_owned())
}

/// Frame interval for `frame_rate` fps, in milliseconds over seconds.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn frame_interval(frame_rate: f64) -> Option<Fraction> {
    let millifps = (frame_rate * 1000.0).round();
    (millifps >= 1.0).then(|| Fraction::new(1000, millifps as u32))
}

fn set_exposure(device: &Device, shutter_us: u32) -> Result<()> {
    let units = (shutter_us / EXPOSURE_UNIT_US).max(1);
    device
        .set_control(Control {
            id: V4L2_CID_EXPOSURE_ABSOLUTE,
            value: Value::Integer(i64::from(units)),
        })
        .map_err(|err| CameraError::Control(format!("set exposure to {shutter_us} us: {err}")))
}

impl CameraDevice for V4L2Device {
    fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    fn configure(&mut self, settings: &CaptureSettings) -> Result<Format> {
        let device = match std::mem::replace(&mut self.state, State::Released) {
            State::Idle(device) => device,
            State::Streaming(streaming) => streaming.into_heads().device,
            State::Released => return Err(released()),
        };

        let mut fmt = device
            .format()
            .map_err(|err| CameraError::StreamError(err.to_string()))?;
        fmt.width = settings.width;
        fmt.height = settings.height;
        fmt.fourcc = FourCC::RGB3.into();

        let fmt = device
            .set_format(&fmt)
            .map_err(|err| CameraError::StreamError(err.to_string()))?;

        let format = Format {
            width: fmt.width,
            height: fmt.height,
            fourcc: FourCC::from(fmt.fourcc),
            stride: fmt.stride,
        };
        if format.fourcc != FourCC::RGB3 && format.fourcc != FourCC::YUYV {
            return Err(CameraError::FormatNotSupported(format));
        }
        if (format.width, format.height) != (settings.width, settings.height) {
            log::warn!(
                "/dev/video{}: requested {}x{}, driver chose {}x{}",
                self.index,
                settings.width,
                settings.height,
                format.width,
                format.height
            );
        }

        if let Some(interval) = frame_interval(settings.frame_rate) {
            if let Err(err) = device.set_params(&Parameters::new(interval)) {
                log::warn!(
                    "/dev/video{}: failed to set {} fps: {err}",
                    self.index,
                    settings.frame_rate
                );
            }
        }

        let manual = Control {
            id: V4L2_CID_EXPOSURE_AUTO,
            value: Value::Integer(V4L2_EXPOSURE_MANUAL),
        };
        if let Err(err) = device.set_control(manual) {
            log::warn!("/dev/video{}: failed to disable auto exposure: {err}", self.index);
        }
        // Later shutter writes are fatal; at startup a driver without the
        // control can still stream.
        if let Err(err) = set_exposure(&device, settings.shutter_us) {
            log::warn!("/dev/video{}: {err}", self.index);
        }

        let streaming = StreamingTryBuilder {
            device,
            format: format.clone(),
            stream_builder: |device| Stream::with_buffers(device, Type::VideoCapture, BUFFER_COUNT),
        }
        .try_build()
        .map_err(|err| CameraError::StreamError(err.to_string()))?;
        self.state = State::Streaming(streaming);

        log::info!(
            "/dev/video{} ({}) streaming {}x{} {:?}",
            self.index,
            self.capabilities.card,
            format.width,
            format.height,
            format.fourcc
        );
        Ok(format)
    }

    fn capture_frame(&mut self) -> Result<Frame> {
        let State::Streaming(streaming) = &mut self.state else {
            return Err(CameraError::StreamError("device not configured".to_owned()));
        };

        let (data, sequence, (sec, usec)) = streaming
            .with_stream_mut(|stream| {
                stream.next().map(|(buf, meta)| {
                    let used = match meta.bytesused as usize {
                        0 => buf.len(),
                        n => n.min(buf.len()),
                    };
                    let data = buf.get(..used).unwrap_or(buf).to_vec();
                    (data, meta.sequence, (meta.timestamp.sec, meta.timestamp.usec))
                })
            })
            .map_err(|err| CameraError::StreamError(err.to_string()))?;

        // V4L2 timestamps are non-negative in practice
        #[allow(clippy::cast_sign_loss)]
        let secs = sec.max(0) as u64;
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let nanos = (usec.max(0) as u32).saturating_mul(1000);
        let metadata = FrameMetadata {
            sequence,
            timestamp: Duration::new(secs, nanos),
        };

        let format = streaming.borrow_format();
        match format.fourcc {
            FourCC::RGB3 => Frame::from_rgb3(&data, format, metadata),
            FourCC::YUYV => Frame::from_yuyv(&data, format, metadata),
            _ => Err(CameraError::FormatNotSupported(format.clone())),
        }
    }

    fn exposure_speed(&self) -> Result<u32> {
        let control = self
            .handle()?
            .control(V4L2_CID_EXPOSURE_ABSOLUTE)
            .map_err(|err| CameraError::Control(format!("read exposure: {err}")))?;

        match control.value {
            Value::Integer(units) => u32::try_from(units)
                .map(|units| units.saturating_mul(EXPOSURE_UNIT_US))
                .map_err(|_| CameraError::Control(format!("exposure out of range: {units}"))),
            other => Err(CameraError::Control(format!(
                "unexpected exposure value {other:?}"
            ))),
        }
    }

    fn set_shutter_speed(&mut self, shutter_us: u32) -> Result<()> {
        set_exposure(self.handle()?, shutter_us)
    }

    fn release(&mut self) {
        if !matches!(self.state, State::Released) {
            self.state = State::Released;
            log::info!("/dev/video{} released", self.index);
        }
    }
}
