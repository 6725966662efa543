//! Metrics collection and registry.

use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registration or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Prometheus metrics registry for the meter.
///
/// Every recording method takes `&self`, so one registry can be shared
/// between the sampling loop, the dispatcher and the HTTP exporter.
pub struct MetricsRegistry {
    registry: Registry,

    // Sampling
    lux_estimate: IntGauge,
    brightness: Gauge,
    samples_total: IntCounter,
    sample_failures_total: IntCounter,

    // Dispatch
    dispatch_writes_total: IntCounter,
    dispatch_failures_total: IntCounter,

    fast_refresh: IntGauge,
}

impl MetricsRegistry {
    /// Creates a new registry with all meter metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let lux_estimate = IntGauge::new("vlux_lux_estimate", "Latest estimated illuminance in lux")?;
        let brightness = Gauge::new(
            "vlux_brightness",
            "Mean luminance (0-255) of the latest cropped frame",
        )?;
        let samples_total = IntCounter::new("vlux_samples_total", "Completed sampling cycles")?;
        let sample_failures_total = IntCounter::new(
            "vlux_sample_failures_total",
            "Sampling cycles that failed to produce a frame",
        )?;

        let dispatch_writes_total = IntCounter::new(
            "vlux_dispatch_writes_total",
            "Lux values written to the FIFO",
        )?;
        let dispatch_failures_total = IntCounter::new(
            "vlux_dispatch_failures_total",
            "Failed FIFO opens or writes",
        )?;

        let fast_refresh = IntGauge::new(
            "vlux_fast_refresh",
            "Fast refresh mode (1=fast, 0=slow)",
        )?;

        registry.register(Box::new(lux_estimate.clone()))?;
        registry.register(Box::new(brightness.clone()))?;
        registry.register(Box::new(samples_total.clone()))?;
        registry.register(Box::new(sample_failures_total.clone()))?;
        registry.register(Box::new(dispatch_writes_total.clone()))?;
        registry.register(Box::new(dispatch_failures_total.clone()))?;
        registry.register(Box::new(fast_refresh.clone()))?;

        Ok(Self {
            registry,
            lux_estimate,
            brightness,
            samples_total,
            sample_failures_total,
            dispatch_writes_total,
            dispatch_failures_total,
            fast_refresh,
        })
    }

    /// Records a completed sample.
    pub fn record_sample(&self, brightness: f64, lux: u64) {
        self.brightness.set(brightness);
        self.lux_estimate.set(i64::try_from(lux).unwrap_or(i64::MAX));
        self.samples_total.inc();
    }

    /// Records a sampling cycle that produced no frame.
    pub fn record_sample_failure(&self) {
        self.sample_failures_total.inc();
    }

    /// Records the outcome of one dispatch attempt.
    pub fn record_dispatch(&self, ok: bool) {
        if ok {
            self.dispatch_writes_total.inc();
        } else {
            self.dispatch_failures_total.inc();
        }
    }

    /// Mirrors the refresh mode.
    pub fn set_fast_refresh(&self, fast: bool) {
        self.fast_refresh.set(i64::from(fast));
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
