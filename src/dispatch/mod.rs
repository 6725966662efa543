//! Publishing of lux values to an external consumer.
//!
//! The sampling loop drops each new value into a [`LatestLux`] slot; the
//! [`Dispatcher`] picks up whatever is there at its own cadence and writes
//! it to a named pipe, one decimal line per interval.

mod dispatcher;
mod fifo;
mod slot;

pub use dispatcher::{DispatchPhase, Dispatcher};
pub use fifo::{FifoConnector, PipeConnector};
pub use slot::{LatestLux, NO_VALUE};

use std::path::PathBuf;
use thiserror::Error;

/// Errors on the publishing path. All are transient.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The FIFO could not be created or opened.
    #[error("FIFO {} unavailable: {reason}", path.display())]
    PipeUnavailable {
        /// FIFO location.
        path: PathBuf,
        /// Underlying failure.
        reason: String,
    },
    /// The reader went away or the write failed otherwise.
    #[error("FIFO write failed: {0}")]
    WriteFailed(String),
}
