//! The sampling loop.

use super::preview::{NoPreview, PreviewSink};
use crate::analysis::{brightness, crop_or_full, estimate_lux};
use crate::capture::{CameraError, CameraOpener, Sampler};
use crate::config::SharedConfig;
use crate::control::{sleep_ticks, RefreshMode, Shutdown, DEFAULT_TICK};
use crate::dispatch::LatestLux;
use crate::metrics::MetricsRegistry;
use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of one sampling cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleResult {
    /// Capture time of the frame.
    pub timestamp: DateTime<Local>,
    /// Mean luminance of the cropped frame, 0-255.
    pub brightness: f64,
    /// Lux mapped from `brightness`.
    pub estimated_lux: u64,
}

/// Repeatedly samples the camera and publishes lux estimates.
pub struct SamplingLoop<O: CameraOpener> {
    sampler: Sampler<O>,
    config: SharedConfig,
    latest: LatestLux,
    refresh: RefreshMode,
    shutdown: Shutdown,
    preview: Box<dyn PreviewSink + Send>,
    metrics: Option<Arc<MetricsRegistry>>,
    tick: Duration,
}

impl<O: CameraOpener> SamplingLoop<O> {
    /// Creates a loop publishing into `latest`.
    pub fn new(
        sampler: Sampler<O>,
        config: SharedConfig,
        latest: LatestLux,
        refresh: RefreshMode,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            sampler,
            config,
            latest,
            refresh,
            shutdown,
            preview: Box::new(NoPreview),
            metrics: None,
            tick: DEFAULT_TICK,
        }
    }

    /// Sets the preview receiving every frame and value.
    pub fn with_preview(mut self, preview: Box<dyn PreviewSink + Send>) -> Self {
        self.preview = preview;
        self
    }

    /// Records sampling metrics in `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Sets the length of one tick.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Returns the sampler.
    pub fn sampler(&self) -> &Sampler<O> {
        &self.sampler
    }

    /// Runs one cycle: capture, crop, measure, map and publish.
    ///
    /// Configuration is read fresh, so crop or calibration edits apply
    /// from the next cycle on.
    pub fn run_cycle(&mut self) -> Result<SampleResult, CameraError> {
        let settings = self.config.snapshot();

        let frame = self.sampler.sample(&settings.camera)?;
        self.preview.new_image(&frame);

        let cropped = crop_or_full(&frame, &settings.camera.crop);
        let level = brightness(&cropped);
        let lux = estimate_lux(level, &settings.calibration);

        self.latest.publish(lux);
        self.preview.new_lux_value(lux);
        if let Some(metrics) = &self.metrics {
            metrics.record_sample(level, lux);
        }

        tracing::debug!(
            sequence = frame.sequence(),
            brightness = level,
            lux,
            "Sample complete"
        );

        Ok(SampleResult {
            timestamp: frame.timestamp(),
            brightness: level,
            estimated_lux: lux,
        })
    }

    /// Samples until shutdown.
    ///
    /// In fast refresh the loop samples every tick. Otherwise it waits the
    /// dispatch interval, cutting the wait short as soon as fast refresh is
    /// switched on. Camera failures are logged and retried after the
    /// current mode's interval.
    pub fn run(&mut self) {
        tracing::info!("Sampling loop started");
        while !self.shutdown.is_triggered() {
            let fast = self.refresh.is_fast();
            if let Some(metrics) = &self.metrics {
                metrics.set_fast_refresh(fast);
            }

            let outcome = self.run_cycle();
            let ticks = if fast {
                1
            } else {
                self.config.snapshot().global.dispatch_ticks()
            };

            if let Err(e) = outcome {
                match &e {
                    CameraError::DeviceUnavailable { .. } => {
                        tracing::warn!(error = %e, "Camera unavailable, retrying later")
                    }
                    _ => tracing::warn!(error = %e, "Sampling cycle failed"),
                }
                if let Some(metrics) = &self.metrics {
                    metrics.record_sample_failure();
                }
            }

            let refresh = self.refresh.clone();
            let shutdown = self.shutdown.clone();
            sleep_ticks(ticks, self.tick, || {
                shutdown.is_triggered() || (!fast && refresh.is_fast())
            });
        }
        tracing::info!("Sampling loop stopped");
    }
}
