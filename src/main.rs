//! Vlux Meter CLI
//!
//! Samples the webcam, prints or publishes lux estimates, and keeps
//! running until SIGINT or SIGTERM.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use vlux_meter::{
    capture::{CameraOpener, MockOpener, Sampler},
    config::{expand_home, ConfigStore, SharedConfig},
    control::{RefreshMode, Shutdown},
    dispatch::{Dispatcher, FifoConnector, LatestLux},
    metrics::MetricsRegistry,
    sampling::{JpegPreview, LogPreview, PreviewSink, SamplingLoop},
};

/// Estimate ambient light from a webcam and publish it through a FIFO.
#[derive(Debug, Parser)]
#[command(name = "vlux-meter", version, about)]
struct Cli {
    /// Config file (default: ~/.config/vlux_meter/vlux_meter.conf)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Start in fast refresh mode (sample every second)
    #[arg(long)]
    fast: bool,

    /// Take one sample, print "<brightness> <lux>" and exit
    #[arg(long)]
    once: bool,

    /// Use a synthetic camera instead of the V4L2 device
    #[arg(long)]
    mock: bool,

    /// Do not publish to the FIFO
    #[arg(long)]
    no_fifo: bool,

    /// Write the effective settings to the config file and exit
    #[arg(long)]
    write_config: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Vlux Meter v{}", vlux_meter::VERSION);

    let store = match &cli.config {
        Some(path) => ConfigStore::new(path),
        None => match ConfigStore::at_default_location() {
            Ok(store) => store,
            Err(e) => {
                eprintln!("Failed to locate config directory: {}", e);
                std::process::exit(1);
            }
        },
    };
    if let Err(e) = store.ensure_directory() {
        eprintln!("Failed to create config directory: {}", e);
        std::process::exit(1);
    }

    let mut settings = store.load();
    if cli.no_fifo {
        settings.global.fifo_disabled = true;
    }

    if cli.write_config {
        match store.save(&settings) {
            Ok(()) => {
                println!("{}", store.path().display());
                return;
            }
            Err(e) => {
                eprintln!("Failed to write config: {}", e);
                std::process::exit(1);
            }
        }
    }

    let config = SharedConfig::new(settings);

    #[cfg(feature = "camera")]
    {
        if !cli.mock {
            run(vlux_meter::capture::V4lOpener, &cli, config);
            return;
        }
    }
    #[cfg(not(feature = "camera"))]
    if !cli.mock {
        warn!("Built without the `camera` feature, using the synthetic camera");
    }

    run(MockOpener::new(), &cli, config);
}

fn run<O>(opener: O, cli: &Cli, config: SharedConfig)
where
    O: CameraOpener + Send + 'static,
{
    let settings = config.snapshot();
    let latest = LatestLux::new();
    let shutdown = Shutdown::new();
    let refresh = RefreshMode::new();
    refresh.set_fast(cli.fast);

    let metrics = match MetricsRegistry::new() {
        Ok(registry) => Some(Arc::new(registry)),
        Err(e) => {
            warn!("Metrics disabled: {}", e);
            None
        }
    };

    let mut preview: Vec<Box<dyn PreviewSink + Send>> = vec![Box::new(LogPreview::new())];
    if let Some(path) = &settings.global.preview_path {
        preview.push(Box::new(JpegPreview::new(expand_home(path))));
    }

    let mut sampling = SamplingLoop::new(
        Sampler::new(opener),
        config.clone(),
        latest.clone(),
        refresh,
        shutdown.clone(),
    )
    .with_preview(Box::new(preview));
    if let Some(metrics) = &metrics {
        sampling = sampling.with_metrics(Arc::clone(metrics));
    }

    if cli.once {
        match sampling.run_cycle() {
            Ok(result) => println!("{:.2} {}", result.brightness, result.estimated_lux),
            Err(e) => {
                eprintln!("Sampling failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let handler_shutdown = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Shutdown requested");
        handler_shutdown.trigger();
    }) {
        warn!("Cannot install signal handler: {}", e);
    }

    #[cfg(feature = "metrics")]
    if let Some(metrics) = &metrics {
        spawn_metrics_server(settings.global.metrics_port, Arc::clone(metrics));
    }

    let dispatcher = if settings.global.fifo_disabled {
        info!("FIFO publishing disabled");
        None
    } else {
        let fifo = settings.global.resolved_fifo_path();
        if let Some(dir) = fifo.parent() {
            if let Err(e) = std::fs::create_dir_all(dir) {
                eprintln!("Failed to create FIFO directory {}: {}", dir.display(), e);
                std::process::exit(1);
            }
        }

        let mut dispatcher = Dispatcher::new(FifoConnector, config, latest, shutdown.clone());
        if let Some(metrics) = &metrics {
            dispatcher = dispatcher.with_metrics(Arc::clone(metrics));
        }
        let spawned = std::thread::Builder::new()
            .name("dispatcher".into())
            .spawn(move || dispatcher.run());
        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("Failed to start dispatcher: {}", e);
                std::process::exit(1);
            }
        }
    };

    sampling.run();

    if let Some(handle) = dispatcher {
        if handle.join().is_err() {
            error!("Dispatcher thread panicked");
        }
    }
    info!("Done");
}

#[cfg(feature = "metrics")]
fn spawn_metrics_server(port: u16, registry: Arc<MetricsRegistry>) {
    use vlux_meter::metrics::{MetricsServer, MetricsServerConfig};

    if port == 0 {
        return;
    }
    let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
    let spawned = std::thread::Builder::new()
        .name("metrics".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!("Metrics server disabled: {}", e);
                    return;
                }
            };
            if let Err(e) = runtime.block_on(server.run()) {
                warn!("Metrics server stopped: {}", e);
            }
        });
    if let Err(e) = spawned {
        warn!("Failed to start metrics server: {}", e);
    }
}
