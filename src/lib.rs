pub mod config;
pub mod db;
pub mod models;
pub mod store;
pub mod trends;

pub use db::DatabaseError;
pub use store::{HealthStore, StoreError};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter. Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}
