//! Power-monitor polling task run by sensorhubd.

use tokio::time::{self, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::bus::Bus;
use crate::config::Config;
use crate::error::Result;
use crate::hw_trait::BusTransport;
use crate::peripheral::{ChannelReading, Ina3221, Route, Tca9548a};
use crate::tracing::prelude::*;

/// One INA3221 channel sampled on a fixed interval.
pub struct PowerMonitor<T> {
    ina: Ina3221<T>,
    channel: u8,
    shunt_ohms: f32,
    interval: Duration,
}

impl<T: BusTransport> PowerMonitor<T> {
    /// Build the monitor described by `config` on `bus`, routed through the
    /// configured mux channel if there is one.
    pub fn from_config(bus: Bus<T>, config: &Config) -> Result<Self> {
        let pm = &config.power_monitor;
        let route = match pm.mux_channel {
            Some(channel) => {
                let mux = Tca9548a::new(config.mux.address).with_policy(config.mux.policy);
                Route::muxed(mux, channel)?
            }
            None => Route::Direct,
        };

        Ok(Self {
            ina: Ina3221::new(bus, pm.address).with_route(route),
            channel: pm.channel,
            shunt_ohms: pm.shunt_ohms,
            interval: config.poll_interval(),
        })
    }

    /// Write the INA3221 configuration. Called once before polling.
    pub async fn init(&self) -> Result<()> {
        self.ina.init().await
    }

    pub async fn sample(&self) -> Result<ChannelReading> {
        self.ina.read_channel(self.channel, self.shunt_ohms).await
    }
}

/// Poll until `running` is cancelled. Returns the number of samples taken.
///
/// A failed sample is logged and polling continues on the next tick.
pub async fn task<T: BusTransport>(monitor: PowerMonitor<T>, running: CancellationToken) -> usize {
    trace!("Task started.");

    let mut ticker = time::interval(monitor.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut samples = 0;

    loop {
        tokio::select! {
            _ = running.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match monitor.sample().await {
            Ok(reading) => {
                samples += 1;
                info!(
                    "ch{} bus {:.3} V, shunt {:.3} mV, current {:.2} mA",
                    reading.channel,
                    reading.bus_voltage_v,
                    reading.shunt_voltage_mv,
                    reading.current_ma
                );
            }
            Err(e) => warn!("Sample failed: {e}"),
        }
    }

    trace!("Task stopped.");
    samples
}
