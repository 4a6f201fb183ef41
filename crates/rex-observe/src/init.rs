use std::fmt;

use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing_subscriber::{
    fmt as subscriber_fmt,
    fmt::{format::Writer, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::{
    config::LoggerConfig,
    error::{LoggerError, LoggerResult},
    format::LogFormat,
};

/// RFC3339 UTC timestamps.
#[derive(Debug, Clone, Copy)]
struct Rfc3339Utc;

impl FormatTime for Rfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        match OffsetDateTime::now_utc().format(&Rfc3339) {
            Ok(ts) => write!(w, "{ts} "),
            Err(_) => write!(w, "<invalid-time> "),
        }
    }
}

/// Install the process-wide tracing subscriber described by `cfg`.
///
/// Can only succeed once per process; later calls report
/// [`LoggerError::AlreadyInitialized`].
pub fn init_logger(cfg: &LoggerConfig) -> LoggerResult<()> {
    let filter = cfg.level.to_env_filter();

    match cfg.format {
        LogFormat::Text => {
            let layer = subscriber_fmt::layer()
                .with_ansi(cfg.should_use_color())
                .with_target(cfg.with_targets)
                .with_timer(Rfc3339Utc);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()
                .map_err(|_| LoggerError::AlreadyInitialized)
        }
        LogFormat::Json => {
            let layer = subscriber_fmt::layer()
                .json()
                .with_ansi(false)
                .with_target(cfg.with_targets)
                .with_timer(Rfc3339Utc);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()
                .map_err(|_| LoggerError::AlreadyInitialized)
        }
    }
}
