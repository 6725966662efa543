//! Configuration: calibration table, camera and publishing settings.
//!
//! Settings are loaded once at startup into a [`SharedConfig`] and only
//! change through an explicit reload or crop edit.

mod calibration;
mod settings;
mod shared;
mod store;

pub use calibration::{CalibrationError, CalibrationPoint, CalibrationTable};
pub use settings::{expand_home, CameraSettings, GlobalSettings, Metadata, Settings};
pub use shared::SharedConfig;
pub use store::{ConfigStore, CONFIG_DIR_NAME, CONFIG_FILE_NAME};

/// Configuration errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read or written.
    #[error("config file I/O failed: {0}")]
    Io(String),
    /// The file is not valid TOML for the settings layout.
    #[error("failed to parse config file: {0}")]
    Parse(String),
    /// The settings could not be rendered as TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(String),
    /// The calibration table is malformed.
    #[error("invalid calibration table: {0}")]
    Calibration(#[from] CalibrationError),
    /// The config directory could not be created or located.
    #[error("cannot create directory: {0}")]
    Directory(String),
}
