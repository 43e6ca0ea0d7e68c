//! Logging setup for the pipeline binaries.
//!
//! These are short-lived CLI runs, so logs go to stderr. The level is
//! controlled via the `GEOSIGHT_LOG` environment variable:
//! - `GEOSIGHT_LOG=debug` for verbose output
//! - `GEOSIGHT_LOG=info` for standard output (default)
//! - `GEOSIGHT_LOG=warn` for warnings and errors only

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init() -> Result<()> {
    let env_filter =
        EnvFilter::try_from_env("GEOSIGHT_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}
