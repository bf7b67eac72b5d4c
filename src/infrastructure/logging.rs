// Logging module - Logging infrastructure
use crate::domain::error::{SerComError, SerComResult};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging. The console runs raw, so diagnostics stay quiet on
/// stderr unless `RUST_LOG` or `--verbose` asks for more.
pub fn init_logging(verbose: bool) -> SerComResult<()> {
    let default_filter = if verbose { "sercom=debug" } else { "sercom=warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .try_init()
        .map_err(|e| SerComError::Config {
            message: format!("failed to initialize logging: {}", e),
        })
}
