//! Logging configuration for the CLI.
//!
//! Stdout-only; level defaults to INFO and can be raised with the standard
//! `RUST_LOG` environment variable (e.g. `RUST_LOG=sous_core=debug`).

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}
