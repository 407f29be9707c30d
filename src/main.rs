//! `filamon`: filament monitor sidecar.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                     │
//! │                                                            │
//! │  SimGpio        HostLink         JsonSettingsFile          │
//! │  (GpioPort)     (PrinterPort)    (ConfigPort)              │
//! │  LogEventSink   host_protocol (stdin → monitor)            │
//! │                                                            │
//! │  ──────────────── Port Trait Boundary ──────────────       │
//! │                                                            │
//! │  ┌──────────────────────────────────────────────────┐      │
//! │  │      SensorMonitor (underfill · overfill)        │      │
//! │  └──────────────────────────────────────────────────┘      │
//! │                                                            │
//! │  Channel workers (one thread per sensor)                   │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! stdin carries host messages, stdout carries host actions, stderr
//! carries logs.
#![deny(unused_must_use)]

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

use filamon::adapters::host_protocol;
use filamon::adapters::log_sink::LogEventSink;
use filamon::adapters::printer_link::HostLink;
use filamon::adapters::settings_file::JsonSettingsFile;
use filamon::adapters::sim_gpio::SimGpio;
use filamon::app::service::SensorMonitor;
use filamon::drivers::delay::ThreadDelay;
use filamon::drivers::worker::Workers;

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .target(env_logger::Target::Stderr)
        .init();
}

fn main() -> Result<()> {
    init_logger();
    info!("filamon {} starting", env!("CARGO_PKG_VERSION"));

    let settings = JsonSettingsFile::from_env();
    info!("Settings file: {}", settings.path().display());

    let monitor = SensorMonitor::start(
        SimGpio::new(),
        HostLink::new(io::stdout()),
        settings,
        LogEventSink::new(),
    )
    .context("starting filament monitor")?;
    let monitor = Arc::new(monitor);

    let workers = Workers::spawn(&monitor, ThreadDelay).context("spawning channel workers")?;

    let served = host_protocol::serve(&*monitor, io::stdin().lock());

    monitor.shutdown();
    workers.join();
    served.context("reading host messages")?;
    info!("filamon stopped");
    Ok(())
}
