//! One-shot frame sampling with scoped exposure control.
//!
//! The camera is opened, reconfigured, read and released within a single
//! call. Whatever exposure state the device had before is put back on every
//! exit path by [`ExposureGuard`].

use super::{AutoExposureMode, CameraDevice, CameraError, CameraOpener, Frame};
use crate::config::CameraSettings;

/// Holds a device with capture exposure applied; restores the original
/// exposure on drop.
pub struct ExposureGuard<'a, D: CameraDevice> {
    device: &'a mut D,
    original_mode: Option<AutoExposureMode>,
    original_exposure: Option<i64>,
    applied_mode: Option<AutoExposureMode>,
}

impl<'a, D: CameraDevice> ExposureGuard<'a, D> {
    /// Records the device's exposure state, then applies `mode` and `exposure`.
    ///
    /// Nothing is applied when the current mode cannot be read, and the
    /// exposure time is left alone when it cannot be read.
    pub fn acquire(device: &'a mut D, mode: AutoExposureMode, exposure: i64) -> Self {
        let original_mode = device
            .auto_exposure()
            .map_err(|e| tracing::warn!(error = %e, "Cannot read auto exposure mode"))
            .ok();
        let original_exposure = device
            .exposure()
            .map_err(|e| tracing::warn!(error = %e, "Cannot read exposure"))
            .ok();
        tracing::info!(
            auto_exposure = ?original_mode,
            exposure = ?original_exposure,
            "Existing camera values"
        );

        // only touch what can be put back
        let applied_mode = original_mode.map(|_| mode);
        match applied_mode {
            Some(mode) => {
                if let Err(e) = device.set_auto_exposure(mode) {
                    tracing::warn!(error = %e, ?mode, "Cannot set auto exposure mode");
                }
                if original_exposure.is_some() {
                    if let Err(e) = device.set_exposure(exposure) {
                        tracing::debug!(error = %e, exposure, "Cannot set exposure");
                    }
                }
            }
            None => tracing::warn!("Capturing with the device's current exposure"),
        }
        tracing::debug!(
            auto_exposure = ?device.auto_exposure().ok(),
            exposure = ?device.exposure().ok(),
            "New camera values"
        );

        Self {
            device,
            original_mode,
            original_exposure,
            applied_mode,
        }
    }

    /// Captures a frame with the applied exposure.
    pub fn capture(&mut self) -> Result<Frame, CameraError> {
        self.device.read_frame()
    }
}

impl<D: CameraDevice> Drop for ExposureGuard<'_, D> {
    fn drop(&mut self) {
        let (Some(mode), Some(applied)) = (self.original_mode, self.applied_mode) else {
            return;
        };
        tracing::debug!(auto_exposure = ?mode, exposure = ?self.original_exposure, "Restoring camera values");

        if let Err(e) = self.device.set_auto_exposure(mode) {
            tracing::warn!(error = %e, ?mode, "Cannot restore auto exposure mode");
        }
        // exposure is only writable when the mode actually changed away from the original
        if mode != applied {
            if let Some(exposure) = self.original_exposure {
                if let Err(e) = self.device.set_exposure(exposure) {
                    tracing::warn!(error = %e, exposure, "Cannot restore exposure");
                }
            }
        }
    }
}

/// Captures single frames from the configured device.
pub struct Sampler<O: CameraOpener> {
    opener: O,
}

impl<O: CameraOpener> Sampler<O> {
    /// Creates a sampler using `opener` to reach the device.
    pub fn new(opener: O) -> Self {
        Self { opener }
    }

    /// Returns the opener.
    pub fn opener(&self) -> &O {
        &self.opener
    }

    /// Opens the device, applies the configured exposure, captures one
    /// frame and releases the device.
    ///
    /// The device's exposure settings are restored and the device released
    /// whether or not the capture succeeds.
    pub fn sample(&mut self, camera: &CameraSettings) -> Result<Frame, CameraError> {
        let mut device = self.opener.open(&camera.device)?;
        let result = {
            let mut guard =
                ExposureGuard::acquire(&mut device, camera.auto_exposure_option, camera.manual_exposure_time);
            guard.capture()
        };
        drop(device);
        tracing::trace!(device = %camera.device.display(), "Camera released");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{MockCameraState, MockOpener};

    fn settings(mode: AutoExposureMode) -> CameraSettings {
        CameraSettings {
            auto_exposure_option: mode,
            manual_exposure_time: 64,
            ..CameraSettings::default()
        }
    }

    #[test]
    fn test_sample_restores_mode_and_exposure() {
        let opener = MockOpener::with_state(MockCameraState {
            auto_exposure: AutoExposureMode::AperturePriority,
            exposure: 156,
            ..MockCameraState::default()
        });
        let mut sampler = Sampler::new(opener);

        let frame = sampler.sample(&settings(AutoExposureMode::Manual)).unwrap();
        assert_eq!(frame.width(), 64);

        let state = sampler.opener().state();
        assert_eq!(state.auto_exposure, AutoExposureMode::AperturePriority);
        assert_eq!(state.exposure, 156);
        assert_eq!(
            state.mode_history,
            vec![AutoExposureMode::Manual, AutoExposureMode::AperturePriority]
        );
        assert_eq!(state.opens, 1);
        assert_eq!(state.releases, 1);
    }

    #[test]
    fn test_exposure_not_restored_when_mode_unchanged() {
        let opener = MockOpener::with_state(MockCameraState {
            auto_exposure: AutoExposureMode::Manual,
            exposure: 156,
            ..MockCameraState::default()
        });
        let mut sampler = Sampler::new(opener);

        sampler.sample(&settings(AutoExposureMode::Manual)).unwrap();

        let state = sampler.opener().state();
        assert_eq!(state.auto_exposure, AutoExposureMode::Manual);
        // the configured manual exposure stays in effect
        assert_eq!(state.exposure, 64);
    }

    #[test]
    fn test_capture_failure_still_restores_and_releases() {
        let opener = MockOpener::with_state(MockCameraState {
            auto_exposure: AutoExposureMode::Auto,
            exposure: 300,
            fail_capture: true,
            ..MockCameraState::default()
        });
        let mut sampler = Sampler::new(opener);

        let result = sampler.sample(&settings(AutoExposureMode::Manual));
        assert!(matches!(result, Err(CameraError::CaptureFailed(_))));

        let state = sampler.opener().state();
        assert_eq!(state.auto_exposure, AutoExposureMode::Auto);
        assert_eq!(state.exposure, 300);
        assert_eq!(state.releases, 1);
    }

    #[test]
    fn test_unreadable_mode_leaves_device_untouched() {
        let opener = MockOpener::with_state(MockCameraState {
            auto_exposure: AutoExposureMode::AperturePriority,
            exposure: 156,
            fail_mode_read: true,
            ..MockCameraState::default()
        });
        let mut sampler = Sampler::new(opener);

        sampler.sample(&settings(AutoExposureMode::Manual)).unwrap();

        let state = sampler.opener().state();
        assert_eq!(state.auto_exposure, AutoExposureMode::AperturePriority);
        assert_eq!(state.exposure, 156);
        assert!(state.mode_history.is_empty());
        assert_eq!(state.releases, 1);
    }

    #[test]
    fn test_unreadable_exposure_is_not_overwritten() {
        let opener = MockOpener::with_state(MockCameraState {
            auto_exposure: AutoExposureMode::AperturePriority,
            exposure: 156,
            fail_exposure_read: true,
            ..MockCameraState::default()
        });
        let mut sampler = Sampler::new(opener);

        sampler.sample(&settings(AutoExposureMode::Manual)).unwrap();

        let state = sampler.opener().state();
        assert_eq!(state.auto_exposure, AutoExposureMode::AperturePriority);
        assert_eq!(state.exposure, 156);
        assert_eq!(
            state.mode_history,
            vec![AutoExposureMode::Manual, AutoExposureMode::AperturePriority]
        );
    }

    #[test]
    fn test_open_failure_is_device_unavailable() {
        let opener = MockOpener::with_state(MockCameraState {
            fail_open: true,
            ..MockCameraState::default()
        });
        let mut sampler = Sampler::new(opener);

        let result = sampler.sample(&CameraSettings::default());
        assert!(matches!(result, Err(CameraError::DeviceUnavailable { .. })));
        assert_eq!(sampler.opener().state().releases, 0);
    }

    #[test]
    fn test_device_released_every_cycle() {
        let mut sampler = Sampler::new(MockOpener::new());
        for _ in 0..3 {
            sampler.sample(&CameraSettings::default()).unwrap();
        }
        let state = sampler.opener().state();
        assert_eq!(state.opens, 3);
        assert_eq!(state.releases, 3);
    }
}
