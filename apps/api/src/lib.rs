pub mod applications;
pub mod catalog;
pub mod config;
pub mod db;
pub mod errors;
pub mod interview;
pub mod llm_client;
pub mod models;
pub mod routes;
pub mod seed;
pub mod state;
pub mod storage;
pub mod uploads;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber. `RUST_LOG` wins when set; otherwise this
/// library, the calling binary and the HTTP trace layer log at `level`.
pub fn init_tracing(bin_target: &str, level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={level},{bin_target}={level},tower_http={level}",
                env!("CARGO_CRATE_NAME")
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
