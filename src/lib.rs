//! Vlux Meter Library
//!
//! Estimates ambient illuminance from a webcam and publishes it to other
//! processes through a named pipe.
//!
//! # Architecture
//!
//! Two loops run side by side and share only a single-slot cell:
//!
//! ```text
//! capture → analysis (crop → brightness → lux) → LatestLux → dispatch → FIFO
//!    ↑                                              ↑
//!    └────────────── config (SharedConfig) ─────────┘
//! ```
//!
//! - [`sampling::SamplingLoop`] opens the camera for the duration of one
//!   capture, maps the frame to lux and overwrites [`dispatch::LatestLux`].
//! - [`dispatch::Dispatcher`] writes the latest value to the FIFO once per
//!   interval and reconnects when the reader goes away.
//!
//! # Example
//!
//! ```no_run
//! use vlux_meter::{
//!     capture::{MockOpener, Sampler},
//!     config::SharedConfig,
//!     control::{RefreshMode, Shutdown},
//!     dispatch::LatestLux,
//!     sampling::SamplingLoop,
//! };
//!
//! let latest = LatestLux::new();
//! let mut sampling = SamplingLoop::new(
//!     Sampler::new(MockOpener::new()),
//!     SharedConfig::default(),
//!     latest.clone(),
//!     RefreshMode::new(),
//!     Shutdown::new(),
//! );
//!
//! let result = sampling.run_cycle().unwrap();
//! assert_eq!(latest.latest(), Some(result.estimated_lux));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod analysis;
pub mod capture;
pub mod config;
pub mod control;
pub mod dispatch;
pub mod metrics;
pub mod sampling;

// Re-export commonly used types at crate root
pub use analysis::{brightness, estimate_lux, CropRegion};
pub use capture::{CameraError, Frame, MockOpener, Sampler};
pub use config::{CalibrationTable, ConfigStore, Settings, SharedConfig};
pub use control::{RefreshMode, Shutdown};
pub use dispatch::{Dispatcher, FifoConnector, LatestLux};
pub use sampling::{SampleResult, SamplingLoop};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
