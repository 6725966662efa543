//! Prometheus metrics for the meter.
//!
//! The registry is always compiled so the loops can record into it; the
//! HTTP exporter needs the `metrics` feature.
//!
//! # Metrics Exposed
//!
//! ## Sampling
//! - `vlux_lux_estimate` - Latest estimated illuminance
//! - `vlux_brightness` - Mean luminance of the latest cropped frame
//! - `vlux_samples_total` - Completed sampling cycles
//! - `vlux_sample_failures_total` - Cycles without a frame
//!
//! ## Dispatch
//! - `vlux_dispatch_writes_total` - Values written to the FIFO
//! - `vlux_dispatch_failures_total` - Failed FIFO opens or writes
//!
//! ## Mode
//! - `vlux_fast_refresh` - 1 while fast refresh is active
//!
//! # Example
//!
//! ```no_run
//! use vlux_meter::metrics::MetricsRegistry;
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! registry.record_sample(131.0, 280);
//! println!("{}", registry.encode().unwrap());
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, ServerError};
