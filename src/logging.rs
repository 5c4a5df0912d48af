//! Log subscriber bootstrap for the binary.
//!
//! `RUST_LOG` picks the filter (default `info`); `BEEATM_LOG_JSON=1` switches
//! to JSON lines. Output goes to stderr so stdout stays machine-readable.

use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_JSON: &str = "BEEATM_LOG_JSON";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match std::env::var(ENV_LOG_JSON).as_deref() {
            Ok("1") | Ok("true") => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

pub fn init_logging() {
    init_logging_with(LogFormat::from_env(), "info");
}

/// Repeat calls are no-ops: the first installed subscriber wins.
pub fn init_logging_with(format: LogFormat, default_filter: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let builder = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().with_target(false).try_init(),
    };
}
