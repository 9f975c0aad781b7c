//! Tracing setup with a runtime-adjustable filter.
//!
//! `RUST_LOG` controls the initial verbosity (default `info`); subcommands
//! raise it to `debug` during `complete` when `--debug` is passed.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

use crate::error::{MigrateError, Result};

/// Handle to the installed filter.
#[derive(Clone)]
pub struct LogHandle {
    handle: reload::Handle<EnvFilter, Registry>,
}

impl std::fmt::Debug for LogHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogHandle").finish_non_exhaustive()
    }
}

impl LogHandle {
    /// Switch the filter to `debug`.
    pub fn enable_debug(&self) -> Result<()> {
        self.handle
            .modify(|filter| *filter = EnvFilter::new(LevelFilter::DEBUG.to_string()))
            .map_err(|e| MigrateError::Logging(e.to_string()))
    }

    /// Current filter directives, if the subscriber is still alive.
    pub fn current(&self) -> Option<String> {
        self.handle.with_current(|filter| filter.to_string()).ok()
    }
}

fn filter_layer() -> (reload::Layer<EnvFilter, Registry>, LogHandle) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let (layer, handle) = reload::Layer::new(filter);
    (layer, LogHandle { handle })
}

/// Install the global subscriber, writing to stderr.
pub fn init() -> Result<LogHandle> {
    let (filter, handle) = filter_layer();
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| MigrateError::Logging(e.to_string()))?;
    Ok(handle)
}
