//! V4L2 device implementation using the v4l crate.

use super::decode::{decode, PixelLayout};
use super::{AutoExposureMode, CameraDevice, CameraError, CameraOpener, Frame};
use std::path::Path;
use v4l::buffer::Type;
use v4l::control::{Control, Value};
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

/// `V4L2_CID_EXPOSURE_AUTO` (camera class base + 1).
const CID_EXPOSURE_AUTO: u32 = 0x009a_0901;
/// `V4L2_CID_EXPOSURE_ABSOLUTE` (camera class base + 2).
const CID_EXPOSURE_ABSOLUTE: u32 = 0x009a_0902;

/// Opens V4L2 devices by filesystem path.
#[derive(Debug, Default, Clone, Copy)]
pub struct V4lOpener;

impl CameraOpener for V4lOpener {
    type Device = V4lCamera;

    fn open(&mut self, path: &Path) -> Result<V4lCamera, CameraError> {
        let device = Device::with_path(path).map_err(|e| CameraError::DeviceUnavailable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "V4L2 device opened");
        Ok(V4lCamera {
            device,
            sequence: 0,
        })
    }
}

/// An open V4L2 capture device. The file descriptor closes on drop.
pub struct V4lCamera {
    device: Device,
    sequence: u64,
}

impl V4lCamera {
    fn integer_control(&self, id: u32, name: &'static str) -> Result<i64, CameraError> {
        let control = self.device.control(id).map_err(|e| CameraError::Control {
            control: name,
            reason: e.to_string(),
        })?;
        match control.value {
            Value::Integer(v) => Ok(v),
            Value::Boolean(b) => Ok(i64::from(b)),
            other => Err(CameraError::Control {
                control: name,
                reason: format!("unexpected value {other:?}"),
            }),
        }
    }

    fn set_integer_control(&mut self, id: u32, name: &'static str, value: i64) -> Result<(), CameraError> {
        self.device
            .set_control(Control {
                id,
                value: Value::Integer(value),
            })
            .map_err(|e| CameraError::Control {
                control: name,
                reason: e.to_string(),
            })
    }
}

impl CameraDevice for V4lCamera {
    fn auto_exposure(&self) -> Result<AutoExposureMode, CameraError> {
        let raw = self.integer_control(CID_EXPOSURE_AUTO, "exposure_auto")?;
        AutoExposureMode::try_from(raw).map_err(|reason| CameraError::Control {
            control: "exposure_auto",
            reason,
        })
    }

    fn set_auto_exposure(&mut self, mode: AutoExposureMode) -> Result<(), CameraError> {
        self.set_integer_control(CID_EXPOSURE_AUTO, "exposure_auto", mode.raw())
    }

    fn exposure(&self) -> Result<i64, CameraError> {
        self.integer_control(CID_EXPOSURE_ABSOLUTE, "exposure_absolute")
    }

    fn set_exposure(&mut self, value: i64) -> Result<(), CameraError> {
        self.set_integer_control(CID_EXPOSURE_ABSOLUTE, "exposure_absolute", value)
    }

    fn read_frame(&mut self) -> Result<Frame, CameraError> {
        let stream_err = |e: std::io::Error| CameraError::CaptureFailed(e.to_string());

        // Prefer YUYV; the driver answers with what it can actually do
        let mut fmt = self.device.format().map_err(stream_err)?;
        fmt.fourcc = FourCC::new(b"YUYV");
        let fmt = self.device.set_format(&fmt).map_err(stream_err)?;
        let layout = PixelLayout::from_fourcc(&fmt.fourcc.repr)?;

        let mut stream = Stream::with_buffers(&self.device, Type::VideoCapture, 2).map_err(stream_err)?;
        let (buf, meta) = stream.next().map_err(stream_err)?;
        let used = (meta.bytesused as usize).min(buf.len());
        let used = if used == 0 { buf.len() } else { used };

        let image = decode(layout, &buf[..used], fmt.width, fmt.height, fmt.stride)?;
        self.sequence += 1;
        tracing::trace!(
            width = fmt.width,
            height = fmt.height,
            layout = ?layout,
            bytes = used,
            "Captured frame"
        );
        Ok(Frame::new(image, self.sequence))
    }
}
