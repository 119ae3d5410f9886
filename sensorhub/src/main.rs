use anyhow::{Context, Result};
use tokio::signal::unix::{self, SignalKind};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use sensorhub::config::Config;
use sensorhub::monitor::{self, PowerMonitor};
use sensorhub::tracing::{self, prelude::*};
use sensorhub::transport::LinuxI2c;
use sensorhub::Bus;

#[tokio::main]
async fn main() -> Result<()> {
    tracing::init_journald_or_stdout();

    let config = Config::load().context("failed to load configuration")?;
    debug!("Configuration: {:?}", config);

    let transport = LinuxI2c::open(&config.bus.device)
        .with_context(|| format!("failed to open {}", config.bus.device.display()))?;
    let bus = Bus::new(transport);

    let power = PowerMonitor::from_config(bus.clone(), &config)?;
    power.init().await.context("failed to initialize INA3221")?;

    let running = CancellationToken::new();
    let tracker = TaskTracker::new();
    tracker.spawn(monitor::task(power, running.clone()));
    tracker.close();
    info!("Started.");

    let mut sigint = unix::signal(SignalKind::interrupt())?;
    let mut sigterm = unix::signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {},
        _ = sigterm.recv() => {},
    }

    trace!("Shutting down.");
    running.cancel();

    tracker.wait().await;
    info!("Exiting.");
    Ok(())
}
