//! Logging setup for sensorhubd.
//!
//! Call [`init_journald_or_stdout`] once, before the bus is opened. Library
//! modules log through the `tracing` macros; [`prelude`] re-exports them.

use std::env;
use time::OffsetDateTime;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt::{format::Writer, time::FormatTime},
    prelude::*,
};

/// The `tracing` macros the drivers and the daemon log with.
pub mod prelude {
    #[allow(unused_imports)]
    pub use tracing::{debug, error, info, trace, warn};
}

use prelude::*;

/// Install the subscriber for sensorhubd.
///
/// When systemd started the daemon (`JOURNAL_STREAM` is set) poll readings
/// and bus failures go to the journal with their level intact. Run from a
/// shell, or if the journal socket cannot be reached, they go to stdout.
pub fn init_journald_or_stdout() {
    let under_systemd = env::var_os("JOURNAL_STREAM").is_some();
    match under_systemd.then(tracing_journald::layer) {
        Some(Ok(journal)) => tracing_subscriber::registry().with(journal).init(),
        Some(Err(e)) => {
            use_stdout();
            warn!("Journal unavailable ({e}), logging to stdout.");
        }
        None => use_stdout(),
    }
}

// Stdout filtered by RUST_LOG, INFO when unset. Per-register traffic is at
// TRACE, so `RUST_LOG=sensorhub=trace` shows every transaction.
fn use_stdout() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var("RUST_LOG")
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_timer(LocalTimer),
        )
        .init();
}

// Local wall-clock time to the millisecond, short enough to keep poll lines
// on one row.
struct LocalTimer;

const TIMESTAMP_FORMAT: &[time::format_description::FormatItem<'static>] =
    time::macros::format_description!("[hour]:[minute]:[second].[subsecond digits:3]");

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let stamp = now
            .format(TIMESTAMP_FORMAT)
            .map_err(|_| std::fmt::Error)?;
        write!(w, "{stamp}")
    }
}
