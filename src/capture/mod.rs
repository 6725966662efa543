//! Camera input and frame handling.
//!
//! This module provides abstractions for opening a camera, managing its
//! exposure settings for the duration of one capture, and turning driver
//! buffers into RGB frames.

mod camera;
mod decode;
mod frame;
mod sampler;
#[cfg(feature = "camera")]
mod v4l2;

pub use camera::{
    AutoExposureMode, CameraDevice, CameraError, CameraOpener, MockCamera, MockCameraState,
    MockOpener,
};
pub use decode::{decode, PixelLayout};
pub use frame::Frame;
pub use sampler::{ExposureGuard, Sampler};
#[cfg(feature = "camera")]
pub use v4l2::{V4lCamera, V4lOpener};
