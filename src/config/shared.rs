//! Settings shared between the sampling loop, the dispatcher and editors.

use super::{ConfigError, ConfigStore, Settings};
use crate::analysis::CropRegion;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Read-mostly settings handle.
///
/// Readers take a [`snapshot`](Self::snapshot) once per cycle and never hold
/// on to it across cycles, so a change is picked up by the next cycle.
/// Every change bumps [`generation`](Self::generation).
#[derive(Debug, Clone)]
pub struct SharedConfig {
    settings: Arc<RwLock<Settings>>,
    generation: Arc<AtomicU64>,
}

impl SharedConfig {
    /// Wraps loaded settings.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(RwLock::new(settings)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Copy of the current settings.
    pub fn snapshot(&self) -> Settings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of changes applied since creation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Replaces all settings.
    pub fn replace(&self, settings: Settings) -> u64 {
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = settings;
        self.bump()
    }

    /// Re-reads settings from `store`, rebuilding the calibration table.
    pub fn reload(&self, store: &ConfigStore) -> u64 {
        let generation = self.replace(store.load());
        tracing::info!(generation, path = %store.path().display(), "Config reloaded");
        generation
    }

    /// Sets a new crop region and persists it to `store`.
    pub fn set_crop_region(&self, region: CropRegion, store: &ConfigStore) -> Result<u64, ConfigError> {
        let settings = {
            let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
            settings.camera.crop = region;
            settings.clone()
        };
        let generation = self.bump();
        tracing::info!(generation, crop = %region, "Crop region changed");
        store.save(&settings)?;
        Ok(generation)
    }

    fn bump(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_is_independent() {
        let shared = SharedConfig::default();
        let mut snapshot = shared.snapshot();
        snapshot.global.dispatch_frequency_seconds = 1;
        assert_eq!(shared.snapshot().global.dispatch_frequency_seconds, 60);
    }

    #[test]
    fn test_crop_change_is_visible_and_saved() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("vlux_meter.conf"));
        let shared = SharedConfig::default();
        let region = CropRegion::new(0.2, 0.2, 0.4, 0.4).unwrap();

        let generation = shared.set_crop_region(region, &store).unwrap();

        assert_eq!(generation, 1);
        assert_eq!(shared.snapshot().camera.crop, region);
        assert_eq!(store.try_load().unwrap().camera.crop, region);
    }

    #[test]
    fn test_reload_picks_up_file_changes() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("vlux_meter.conf"));
        let shared = SharedConfig::default();

        let mut edited = Settings::default();
        edited.global.dispatch_frequency_seconds = 5;
        store.save(&edited).unwrap();

        assert_eq!(shared.snapshot().global.dispatch_frequency_seconds, 60);
        assert_eq!(shared.reload(&store), 1);
        assert_eq!(shared.snapshot().global.dispatch_frequency_seconds, 5);
    }
}
