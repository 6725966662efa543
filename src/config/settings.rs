//! Meter settings and their on-disk layout.
//!
//! The file is TOML so it stays hand-editable:
//!
//! ```toml
//! [camera]
//! device = "/dev/video0"
//! auto_exposure_option = 3
//! manual_exposure_time = 64
//! crop = "0,0,1,1"
//!
//! [global]
//! fifo_path = "~/.cache/vlux_fifo"
//! dispatch_frequency_seconds = 60
//!
//! [brightness_to_lux]
//! sunlight = "250 100000"
//! daylight = "160 10000"
//! ```

use super::calibration::{CalibrationError, CalibrationTable};
use crate::analysis::CropRegion;
use crate::capture::AutoExposureMode;
use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Camera device and exposure settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Device node, e.g. `/dev/video0`.
    pub device: PathBuf,
    /// Exposure mode applied while capturing.
    pub auto_exposure_option: AutoExposureMode,
    /// Exposure time applied while capturing (driver units).
    pub manual_exposure_time: i64,
    /// Region of the frame used for brightness.
    #[serde(with = "crop_field")]
    pub crop: CropRegion,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/video0"),
            auto_exposure_option: AutoExposureMode::AperturePriority,
            manual_exposure_time: 64,
            crop: CropRegion::FULL,
        }
    }
}

/// Publishing and cadence settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalSettings {
    /// FIFO the lux value is published to. A leading `~` means the home directory.
    pub fifo_path: PathBuf,
    /// Skip publishing entirely.
    pub fifo_disabled: bool,
    /// Slow sampling interval and publishing interval, in seconds.
    pub dispatch_frequency_seconds: u64,
    /// Where to write each captured frame as a JPEG, if anywhere.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_path: Option<PathBuf>,
    /// Prometheus exporter port, 0 to disable.
    pub metrics_port: u16,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            fifo_path: PathBuf::from("~/.cache/vlux_fifo"),
            fifo_disabled: false,
            dispatch_frequency_seconds: 60,
            preview_path: None,
            metrics_port: 0,
        }
    }
}

impl GlobalSettings {
    /// FIFO path with `~` expanded.
    pub fn resolved_fifo_path(&self) -> PathBuf {
        expand_home(&self.fifo_path)
    }

    /// Dispatch interval in ticks, never zero.
    pub fn dispatch_ticks(&self) -> u64 {
        self.dispatch_frequency_seconds.max(1)
    }
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Everything the meter needs for one sampling cycle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Settings {
    /// Camera settings.
    pub camera: CameraSettings,
    /// Publishing settings.
    pub global: GlobalSettings,
    /// Brightness to lux calibration.
    pub calibration: CalibrationTable,
}

/// Bookkeeping written with every save.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// Version of the program that wrote the file.
    #[serde(default)]
    pub version: String,
    /// When the file was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<FixedOffset>>,
}

/// Raw file contents before calibration entries are validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ConfigFile {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub camera: CameraSettings,
    #[serde(default)]
    pub global: GlobalSettings,
    #[serde(default = "default_entries")]
    pub brightness_to_lux: BTreeMap<String, String>,
}

fn default_entries() -> BTreeMap<String, String> {
    CalibrationTable::default().to_entries()
}

impl ConfigFile {
    /// Snapshot of `settings` stamped with the current version and time.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            metadata: Metadata {
                version: crate::VERSION.to_owned(),
                timestamp: Some(Local::now().fixed_offset()),
            },
            camera: settings.camera.clone(),
            global: settings.global.clone(),
            brightness_to_lux: settings.calibration.to_entries(),
        }
    }

    /// Validates the calibration entries.
    ///
    /// On a malformed table the returned settings carry the built-in table
    /// and the error is handed back for reporting.
    pub fn into_settings(self) -> (Settings, Option<CalibrationError>) {
        let (calibration, error) = match CalibrationTable::from_entries(&self.brightness_to_lux) {
            Ok(table) => (table, None),
            Err(e) => (CalibrationTable::default(), Some(e)),
        };
        let settings = Settings {
            camera: self.camera,
            global: self.global,
            calibration,
        };
        (settings, error)
    }
}

/// Crop region stored as `"x1,y1,x2,y2"`; a bad value falls back to the full frame.
mod crop_field {
    use crate::analysis::CropRegion;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(region: &CropRegion, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(region)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<CropRegion, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or_else(|e| {
            tracing::warn!(crop = %raw, error = %e, "Invalid crop region, using the full frame");
            CropRegion::FULL
        }))
    }
}
