//! Sampling cadence and per-cycle orchestration.
//!
//! ```text
//! Sampler → crop → brightness → lux → LatestLux ─→ Dispatcher
//!                                      └────────→ PreviewSink
//! ```

mod preview;
mod runner;

pub use preview::{JpegPreview, LogPreview, NoPreview, PreviewSink};
pub use runner::{SampleResult, SamplingLoop};
