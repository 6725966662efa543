//! Durable storage for [`Settings`].

use super::settings::{ConfigFile, Settings};
use super::ConfigError;
use std::path::{Path, PathBuf};

/// Application directory under the user's config directory.
pub const CONFIG_DIR_NAME: &str = "vlux_meter";
/// Config file name.
pub const CONFIG_FILE_NAME: &str = "vlux_meter.conf";

/// Loads and saves settings at a fixed path.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Creates a store for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store at `$XDG_CONFIG_HOME/vlux_meter/vlux_meter.conf`.
    pub fn at_default_location() -> Result<Self, ConfigError> {
        let dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::Directory("no user config directory".to_owned()))?;
        Ok(Self::new(dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)))
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads settings, failing on any problem with the file.
    pub fn try_load(&self) -> Result<Settings, ConfigError> {
        let (settings, calibration_error) = self.read_file()?.into_settings();
        match calibration_error {
            Some(e) => Err(e.into()),
            None => Ok(settings),
        }
    }

    /// Loads settings, falling back to defaults instead of failing.
    ///
    /// A missing or unreadable file gives the defaults. A readable file
    /// with a malformed calibration table keeps its other sections and
    /// uses the built-in table.
    pub fn load(&self) -> Settings {
        tracing::info!(path = %self.path.display(), "Looking for config file");
        if !self.path.exists() {
            tracing::info!("No config file, using defaults");
            return Settings::default();
        }

        match self.read_file() {
            Ok(file) => {
                let (settings, calibration_error) = file.into_settings();
                if let Some(e) = calibration_error {
                    tracing::warn!(error = %e, "Using the default calibration table");
                }
                tracing::debug!(calibration = %settings.calibration, "Loaded config");
                settings
            }
            Err(e) => {
                tracing::warn!(error = %e, "Error loading config, using defaults");
                Settings::default()
            }
        }
    }

    /// Writes `settings`, creating the parent directory if needed.
    pub fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        self.ensure_directory()?;
        let text = toml::to_string_pretty(&ConfigFile::from_settings(settings))
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(&self.path, text)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", self.path.display())))?;
        tracing::info!(path = %self.path.display(), "Wrote config");
        Ok(())
    }

    /// Creates the directory holding the config file.
    pub fn ensure_directory(&self) -> Result<(), ConfigError> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() && !dir.is_dir() => {
                std::fs::create_dir_all(dir)
                    .map_err(|e| ConfigError::Directory(format!("{}: {e}", dir.display())))?;
                tracing::info!(dir = %dir.display(), "Created config directory");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn read_file(&self) -> Result<ConfigFile, ConfigError> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", self.path.display())))?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
