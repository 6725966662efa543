//! Camera abstraction for frame capture.
//!
//! This module provides a trait-based abstraction over camera hardware,
//! allowing for both real camera input and mock implementations for testing.

use super::Frame;
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Errors that can occur during camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    /// The device could not be opened.
    #[error("camera device {} unavailable: {reason}", path.display())]
    DeviceUnavailable {
        /// Device node.
        path: PathBuf,
        /// Underlying failure.
        reason: String,
    },
    /// No frame could be read.
    #[error("failed to capture frame: {0}")]
    CaptureFailed(String),
    /// A device control could not be read or written.
    #[error("camera control {control} failed: {reason}")]
    Control {
        /// Control name.
        control: &'static str,
        /// Underlying failure.
        reason: String,
    },
    /// The driver delivered a pixel format that cannot be decoded.
    #[error("unsupported pixel format {0}")]
    UnsupportedFormat(String),
}

/// V4L2 auto exposure menu (`V4L2_CID_EXPOSURE_AUTO`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum AutoExposureMode {
    /// Automatic exposure time and iris.
    Auto,
    /// Manual exposure time and iris.
    Manual,
    /// Manual exposure time, automatic iris.
    ShutterPriority,
    /// Automatic exposure time, manual iris.
    AperturePriority,
}

impl AutoExposureMode {
    /// Returns the driver menu index.
    pub fn raw(self) -> i64 {
        match self {
            Self::Auto => 0,
            Self::Manual => 1,
            Self::ShutterPriority => 2,
            Self::AperturePriority => 3,
        }
    }
}

impl TryFrom<i64> for AutoExposureMode {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Auto),
            1 => Ok(Self::Manual),
            2 => Ok(Self::ShutterPriority),
            3 => Ok(Self::AperturePriority),
            other => Err(format!("unknown auto exposure mode {other} (expected 0-3)")),
        }
    }
}

impl From<AutoExposureMode> for i64 {
    fn from(mode: AutoExposureMode) -> Self {
        mode.raw()
    }
}

/// An open camera device.
///
/// Dropping the device releases it.
pub trait CameraDevice {
    /// Reads the current auto exposure mode.
    fn auto_exposure(&self) -> Result<AutoExposureMode, CameraError>;

    /// Sets the auto exposure mode.
    fn set_auto_exposure(&mut self, mode: AutoExposureMode) -> Result<(), CameraError>;

    /// Reads the current exposure time (driver units).
    fn exposure(&self) -> Result<i64, CameraError>;

    /// Sets the exposure time. Only honored outside automatic modes.
    fn set_exposure(&mut self, value: i64) -> Result<(), CameraError>;

    /// Captures a single frame.
    fn read_frame(&mut self) -> Result<Frame, CameraError>;
}

/// Opens camera devices by path.
pub trait CameraOpener {
    /// The device type produced.
    type Device: CameraDevice;

    /// Opens the device at `path`, failing with [`CameraError::DeviceUnavailable`].
    fn open(&mut self, path: &Path) -> Result<Self::Device, CameraError>;
}

/// Observable state shared by a [`MockOpener`] and the cameras it opens.
#[derive(Debug, Clone)]
pub struct MockCameraState {
    /// Current auto exposure mode.
    pub auto_exposure: AutoExposureMode,
    /// Current exposure time.
    pub exposure: i64,
    /// Gray level of synthesized frames.
    pub gray_level: u8,
    /// Successful opens.
    pub opens: u64,
    /// Releases (drops) of opened cameras.
    pub releases: u64,
    /// Frames captured.
    pub frames: u64,
    /// Fail every open.
    pub fail_open: bool,
    /// Fail every capture.
    pub fail_capture: bool,
    /// Fail reads of the auto exposure mode.
    pub fail_mode_read: bool,
    /// Fail reads of the exposure time.
    pub fail_exposure_read: bool,
    /// Every auto exposure mode set, in order.
    pub mode_history: Vec<AutoExposureMode>,
}

impl Default for MockCameraState {
    fn default() -> Self {
        Self {
            auto_exposure: AutoExposureMode::AperturePriority,
            exposure: 156,
            gray_level: 128,
            opens: 0,
            releases: 0,
            frames: 0,
            fail_open: false,
            fail_capture: false,
            fail_mode_read: false,
            fail_exposure_read: false,
            mode_history: Vec::new(),
        }
    }
}

/// Mock camera opener that synthesizes uniform gray frames.
#[derive(Debug, Clone)]
pub struct MockOpener {
    state: Arc<Mutex<MockCameraState>>,
    width: u32,
    height: u32,
}

impl MockOpener {
    /// Creates an opener producing 64x48 frames.
    pub fn new() -> Self {
        Self::with_state(MockCameraState::default())
    }

    /// Creates an opener with an initial state.
    pub fn with_state(state: MockCameraState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            width: 64,
            height: 48,
        }
    }

    /// Returns a snapshot of the shared state.
    pub fn state(&self) -> MockCameraState {
        self.lock().clone()
    }

    /// Mutates the shared state.
    pub fn update(&self, f: impl FnOnce(&mut MockCameraState)) {
        f(&mut self.lock());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockCameraState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockOpener {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraOpener for MockOpener {
    type Device = MockCamera;

    fn open(&mut self, path: &Path) -> Result<MockCamera, CameraError> {
        let mut state = self.lock();
        if state.fail_open {
            return Err(CameraError::DeviceUnavailable {
                path: path.to_path_buf(),
                reason: "mock device unplugged".to_owned(),
            });
        }
        state.opens += 1;
        tracing::debug!(path = %path.display(), "MockCamera opened");
        Ok(MockCamera {
            state: Arc::clone(&self.state),
            width: self.width,
            height: self.height,
        })
    }
}

/// Mock camera for testing that generates synthetic frames.
#[derive(Debug)]
pub struct MockCamera {
    state: Arc<Mutex<MockCameraState>>,
    width: u32,
    height: u32,
}

impl MockCamera {
    fn lock(&self) -> std::sync::MutexGuard<'_, MockCameraState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CameraDevice for MockCamera {
    fn auto_exposure(&self) -> Result<AutoExposureMode, CameraError> {
        let state = self.lock();
        if state.fail_mode_read {
            return Err(CameraError::Control {
                control: "exposure_auto",
                reason: "mock read failed".to_owned(),
            });
        }
        Ok(state.auto_exposure)
    }

    fn set_auto_exposure(&mut self, mode: AutoExposureMode) -> Result<(), CameraError> {
        let mut state = self.lock();
        state.auto_exposure = mode;
        state.mode_history.push(mode);
        Ok(())
    }

    fn exposure(&self) -> Result<i64, CameraError> {
        let state = self.lock();
        if state.fail_exposure_read {
            return Err(CameraError::Control {
                control: "exposure_absolute",
                reason: "mock read failed".to_owned(),
            });
        }
        Ok(state.exposure)
    }

    fn set_exposure(&mut self, value: i64) -> Result<(), CameraError> {
        self.lock().exposure = value;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Frame, CameraError> {
        let mut state = self.lock();
        if state.fail_capture {
            return Err(CameraError::CaptureFailed("mock read failed".to_owned()));
        }
        state.frames += 1;
        let level = state.gray_level;
        let image = RgbImage::from_pixel(self.width, self.height, Rgb([level, level, level]));
        Ok(Frame::new(image, state.frames))
    }
}

impl Drop for MockCamera {
    fn drop(&mut self) {
        self.lock().releases += 1;
        tracing::debug!("MockCamera released");
    }
}
