use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use tracing::{error, warn};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{prelude::*, EnvFilter};

// A simple way to log without interrupting fluency
pub trait LogMe<T> {
    fn log_warn<C: Display + Send + Sync + 'static>(self, context_msg: C) -> anyhow::Result<T>;
    fn log_error<C: Display + Send + Sync + 'static>(self, context_msg: C) -> anyhow::Result<T>;
}

// WARN {context_msg}: {cause}
impl<T, Error: Into<anyhow::Error> + Display + Send + Sync + 'static> LogMe<T>
    for Result<T, Error>
{
    fn log_warn<C: Display + Send + Sync + 'static>(self, context_msg: C) -> anyhow::Result<T> {
        self.map_err(|e| {
            let ae = e.into().context(context_msg);
            warn!("{:#}", ae);
            ae
        })
    }

    fn log_error<C: Display + Send + Sync + 'static>(self, context_msg: C) -> anyhow::Result<T> {
        self.map_err(|e| {
            let ae = e.into().context(context_msg);
            error!("{:#}", ae);
            ae
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TracingMode {
    /// Human readable output, for a terminal
    #[default]
    Full,
    /// JSON lines, for log collectors
    Json,
}

/// Setup tracing - stderr subscriber, stdout is left to command output
/// defaults to INFO, and HTTP client internals stay at INFO even if RUST_LOG asks for
/// more (unless it names them)
pub fn setup_tracing(mode: TracingMode) -> Result<()> {
    let mut filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;

    let var = std::env::var("RUST_LOG").unwrap_or_default();
    for noisy in ["hyper", "hyper_util", "reqwest"] {
        if !var.contains(noisy) {
            filter = filter.add_directive(format!("{noisy}=info").parse()?);
        }
    }

    match mode {
        TracingMode::Full => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_filter(filter),
            )
            .try_init()?,
        TracingMode::Json => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_filter(filter),
            )
            .try_init()?,
    };

    Ok(())
}
