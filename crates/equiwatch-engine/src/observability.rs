//! Tracing setup, grounded in `octofhir_server::observability::{init_tracing,
//! shutdown_tracing}`. This crate has no runtime-reloadable log level (no
//! config-watch component exists in this spec), so it skips the teacher's
//! `reload::Layer` machinery and initializes a plain `EnvFilter` once.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}

pub fn shutdown_tracing() {}
