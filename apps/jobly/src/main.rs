mod api;
mod config;
mod errors;
mod models;
mod routes;
mod session;
mod shell;
mod token;
mod views;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::api::{JoblyApi, JoblyBackend};
use crate::config::Config;
use crate::session::SessionController;
use crate::shell::Shell;
use crate::token::FileTokenStore;
use crate::views::ViewContext;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Logs go to stderr so they never interleave with rendered pages.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Jobly client v{}", env!("CARGO_PKG_VERSION"));

    let api: Arc<dyn JoblyBackend> =
        Arc::new(JoblyApi::new(&config.api_base_url, config.request_timeout)?);
    info!("API client initialized (base url: {})", config.api_base_url);

    let store = Arc::new(FileTokenStore::new(config.storage_path.clone()));
    info!("Token storage at {}", store.path().display());

    let session = SessionController::new(api.clone(), store);

    let mut changes = session.subscribe();
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let s = changes.borrow_and_update().clone();
            debug!(
                "Session now {:?} (user: {:?}, applied: {})",
                s.phase,
                s.username(),
                s.applied_job_ids.len()
            );
        }
    });

    // Nothing renders until the stored token has been checked.
    eprintln!("Loading...");
    session.restore().await;

    Shell::new(ViewContext::new(session, api)).run().await
}
