use tracing::info;
use tracing_subscriber::EnvFilter;

use super::config::{self, LoopConfig};
use super::loop_runner::AppError;

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
}

pub(crate) fn build_app() -> Result<AppWiring, AppError> {
    init_tracing();
    info!(version = env!("CARGO_PKG_VERSION"), "=== Scenes Demo Startup ===");

    let config = config::load_config()?;
    Ok(AppWiring { config })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
