//! Periodic publisher of the latest lux value.

use super::{DispatchError, LatestLux, PipeConnector, NO_VALUE};
use crate::config::SharedConfig;
use crate::control::{sleep_ticks, Shutdown, DEFAULT_TICK};
use crate::metrics::MetricsRegistry;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle of a [`Dispatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    /// Built, not started.
    Uninitialized,
    /// Started; no lux value produced yet.
    WaitingForFirstValue,
    /// Publishing. The pipe may be momentarily absent while it is reopened.
    Connected,
    /// Shut down; the pipe has been released.
    Closed,
}

/// Publishes the latest lux value to a pipe every dispatch interval.
///
/// Runs on its own thread and only ever reads the [`LatestLux`] slot, so
/// waiting for a reader or a failing pipe never holds up sampling.
pub struct Dispatcher<C: PipeConnector> {
    connector: C,
    config: SharedConfig,
    latest: LatestLux,
    shutdown: Shutdown,
    tick: Duration,
    phase: DispatchPhase,
    last_value: i64,
    pipe: Option<C::Writer>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl<C: PipeConnector> Dispatcher<C> {
    /// Creates a dispatcher reading from `latest`.
    pub fn new(connector: C, config: SharedConfig, latest: LatestLux, shutdown: Shutdown) -> Self {
        Self {
            connector,
            config,
            latest,
            shutdown,
            tick: DEFAULT_TICK,
            phase: DispatchPhase::Uninitialized,
            last_value: NO_VALUE,
            pipe: None,
            metrics: None,
        }
    }

    /// Sets the length of one tick (one "second" of configured intervals).
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Records publishing counters in `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Current phase.
    pub fn phase(&self) -> DispatchPhase {
        self.phase
    }

    /// Last value taken from the slot, −1 before the first one.
    pub fn last_value(&self) -> i64 {
        self.last_value
    }

    /// True while a pipe handle is held.
    pub fn is_pipe_open(&self) -> bool {
        self.pipe.is_some()
    }

    /// Moves from `Uninitialized` to `WaitingForFirstValue`.
    pub fn start(&mut self) {
        if self.phase == DispatchPhase::Uninitialized {
            self.phase = DispatchPhase::WaitingForFirstValue;
            tracing::info!("Dispatcher started, waiting for a lux value");
        }
    }

    /// Runs until shutdown, then releases the pipe.
    pub fn run(&mut self) {
        self.start();
        let shutdown = self.shutdown.clone();
        while !shutdown.is_triggered() {
            let ticks = self.cycle();
            tracing::trace!(ticks, "Dispatcher sleeping");
            sleep_ticks(ticks, self.tick, || shutdown.is_triggered());
        }
        self.close();
    }

    /// Performs one dispatch cycle and returns how many ticks to wait
    /// before the next one.
    pub fn cycle(&mut self) -> u64 {
        match self.phase {
            DispatchPhase::Uninitialized | DispatchPhase::Closed => return 1,
            DispatchPhase::WaitingForFirstValue => match self.latest.latest() {
                Some(lux) => {
                    tracing::info!(lux, "First lux value received");
                    self.phase = DispatchPhase::Connected;
                }
                None => return 1,
            },
            DispatchPhase::Connected => {}
        }

        if let Some(lux) = self.latest.latest() {
            self.last_value = i64::try_from(lux).unwrap_or(i64::MAX);
        }

        let settings = self.config.snapshot();
        let interval = settings.global.dispatch_ticks();

        if self.pipe.is_none() {
            let path = settings.global.resolved_fifo_path();
            match self.connector.connect(&path) {
                Ok(Some(writer)) => {
                    tracing::info!(path = %path.display(), "FIFO consumer attached");
                    self.pipe = Some(writer);
                }
                Ok(None) => {
                    tracing::debug!(path = %path.display(), "Waiting for FIFO consumer");
                    return 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Cannot open FIFO, retrying next cycle");
                    self.record(false);
                    return interval;
                }
            }
        }

        match self.write_value() {
            Ok(()) => {
                tracing::info!(lux = self.last_value, "Dispatcher wrote to FIFO");
                self.record(true);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Abandoning FIFO, reopening next cycle");
                self.pipe = None;
                self.record(false);
            }
        }
        interval
    }

    /// Releases the pipe and enters `Closed`. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(pipe) = self.pipe.take() {
            drop(pipe);
            tracing::info!("FIFO released");
        }
        if self.phase != DispatchPhase::Closed {
            self.phase = DispatchPhase::Closed;
            tracing::info!("Dispatcher stopped");
        }
    }

    fn write_value(&mut self) -> Result<(), DispatchError> {
        let value = self.last_value;
        let pipe = self
            .pipe
            .as_mut()
            .ok_or_else(|| DispatchError::WriteFailed("no pipe".to_owned()))?;
        writeln!(pipe, "{value}")
            .and_then(|()| pipe.flush())
            .map_err(|e| DispatchError::WriteFailed(e.to_string()))
    }

    fn record(&self, ok: bool) {
        if let Some(metrics) = &self.metrics {
            metrics.record_dispatch(ok);
        }
    }
}
