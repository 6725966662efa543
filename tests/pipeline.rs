//! End-to-end tests: synthetic camera through to a real FIFO reader.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::thread;
use std::time::{Duration, Instant};
use vlux_meter::{
    capture::{MockCameraState, MockOpener, Sampler},
    config::{ConfigStore, Settings, SharedConfig},
    control::{RefreshMode, Shutdown},
    dispatch::{DispatchPhase, Dispatcher, FifoConnector, LatestLux},
    estimate_lux,
    metrics::MetricsRegistry,
    sampling::SamplingLoop,
};
use std::sync::Arc;

const TICK: Duration = Duration::from_millis(5);

fn settings_with_fifo(dir: &tempfile::TempDir) -> Settings {
    let mut settings = Settings::default();
    settings.global.fifo_path = dir.path().join("vlux_fifo");
    settings.global.dispatch_frequency_seconds = 2;
    settings
}

#[test]
fn test_sample_reaches_fifo_reader() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_with_fifo(&dir);
    let fifo = settings.global.resolved_fifo_path();
    let expected = estimate_lux(200.0, &settings.calibration);
    let config = SharedConfig::new(settings);

    let opener = MockOpener::with_state(MockCameraState {
        gray_level: 200,
        ..MockCameraState::default()
    });
    let latest = LatestLux::new();
    let shutdown = Shutdown::new();

    let mut sampling = SamplingLoop::new(
        Sampler::new(opener.clone()),
        config.clone(),
        latest.clone(),
        RefreshMode::new(),
        shutdown.clone(),
    )
    .with_tick(TICK);
    let mut dispatcher = Dispatcher::new(FifoConnector, config, latest, shutdown.clone())
        .with_tick(TICK);

    let sampling_thread = thread::spawn(move || sampling.run());
    let dispatch_thread = thread::spawn(move || {
        dispatcher.run();
        dispatcher
    });

    // the dispatcher creates the FIFO on its first connection attempt
    let start = Instant::now();
    while !fifo.exists() && start.elapsed() < Duration::from_secs(5) {
        thread::sleep(TICK);
    }

    let mut line = String::new();
    BufReader::new(File::open(&fifo).unwrap())
        .read_line(&mut line)
        .unwrap();

    shutdown.trigger();
    sampling_thread.join().unwrap();
    let dispatcher = dispatch_thread.join().unwrap();

    assert_eq!(line.trim().parse::<u64>().unwrap(), expected);
    assert_eq!(dispatcher.phase(), DispatchPhase::Closed);
    assert!(!dispatcher.is_pipe_open());

    let state = opener.state();
    assert_eq!(state.opens, state.releases);
}

#[test]
fn test_fifo_without_reader_does_not_slow_sampling() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_with_fifo(&dir);
    let fifo = settings.global.resolved_fifo_path();
    let config = SharedConfig::new(settings);
    let opener = MockOpener::new();
    let latest = LatestLux::new();
    let shutdown = Shutdown::new();
    let refresh = RefreshMode::new();
    refresh.set_fast(true);
    let metrics = Arc::new(MetricsRegistry::new().unwrap());

    let mut sampling = SamplingLoop::new(
        Sampler::new(opener.clone()),
        config.clone(),
        latest.clone(),
        refresh,
        shutdown.clone(),
    )
    .with_tick(TICK);
    let mut dispatcher = Dispatcher::new(FifoConnector, config, latest.clone(), shutdown.clone())
        .with_tick(TICK)
        .with_metrics(Arc::clone(&metrics));

    let sampling_thread = thread::spawn(move || sampling.run());
    let dispatch_thread = thread::spawn(move || {
        dispatcher.run();
        dispatcher
    });

    let window = Duration::from_millis(200);
    thread::sleep(window);
    let frames = opener.state().frames;
    shutdown.trigger();
    sampling_thread.join().unwrap();
    let dispatcher = dispatch_thread.join().unwrap();

    // one frame per tick at most; allow generous scheduling slack
    let ideal = (window.as_millis() / TICK.as_millis()) as u64;
    assert!(frames >= ideal / 4, "only {frames} frames in {window:?}");
    assert!(latest.latest().is_some());
    assert!(fifo.exists());
    assert_eq!(dispatcher.phase(), DispatchPhase::Closed);
    assert!(metrics
        .encode()
        .unwrap()
        .contains("vlux_dispatch_writes_total 0"));
}

#[test]
fn test_reader_reconnect_gets_latest_value() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_with_fifo(&dir);
    let fifo = settings.global.resolved_fifo_path();
    let config = SharedConfig::new(settings);
    let latest = LatestLux::new();
    let shutdown = Shutdown::new();
    latest.publish(500);

    let mut dispatcher = Dispatcher::new(FifoConnector, config, latest.clone(), shutdown.clone())
        .with_tick(TICK);
    let dispatch_thread = thread::spawn(move || dispatcher.run());

    let start = Instant::now();
    while !fifo.exists() && start.elapsed() < Duration::from_secs(5) {
        thread::sleep(TICK);
    }

    let mut first = String::new();
    {
        let mut reader = BufReader::new(File::open(&fifo).unwrap());
        reader.read_line(&mut first).unwrap();
    }
    // the reader is gone; the next write fails and the dispatcher reconnects
    latest.publish(750);

    let mut second = String::new();
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        let mut reader = BufReader::new(File::open(&fifo).unwrap());
        second.clear();
        reader.read_line(&mut second).unwrap();
        if second.trim() == "750" {
            break;
        }
    }

    shutdown.trigger();
    dispatch_thread.join().unwrap();

    assert_eq!(first.trim(), "500");
    assert_eq!(second.trim(), "750");
}

#[test]
fn test_settings_survive_store_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let store = ConfigStore::new(dir.path().join("vlux_meter").join("vlux_meter.conf"));
    let mut settings = Settings::default();
    settings.camera.crop = "0.25,0.1,0.75,0.9".parse().unwrap();
    settings.global.dispatch_frequency_seconds = 15;

    store.save(&settings).unwrap();
    let config = SharedConfig::new(Settings::default());
    config.reload(&store);

    assert_eq!(config.snapshot(), settings);
}
