//! # secondserve-client
//!
//! Workflow orchestration for the Second Serve app: listing creation, place
//! search, browsing, saves, messaging, notification settings and the
//! nearby-NGO push fan-out. Every command takes an [`App`] and talks to the
//! backend only through the collaborator traits in `secondserve-shared`.

pub mod commands;
pub mod config;
pub mod error;
pub mod notify;
pub mod places;
pub mod remote;
pub mod routing;
pub mod state;

#[cfg(test)]
mod testing;

use tracing_subscriber::{fmt, EnvFilter};

pub use config::ClientConfig;
pub use error::{Alert, ClientError, ClientResult};
pub use state::App;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter. Call once, before the first command runs.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("secondserve_client=debug,secondserve_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    tracing::info!("Second Serve client starting");
}
