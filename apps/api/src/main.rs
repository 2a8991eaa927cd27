mod config;
mod document;
mod errors;
mod fill;
mod form;
mod mail;
mod routes;
mod state;
mod submission;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::mail::SmtpMailer;
use crate::routes::build_router;
use crate::state::AppState;
use crate::submission::session::SessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Exit Interview API v{}", env!("CARGO_PKG_VERSION"));

    if !config.template_path.is_file() {
        warn!(
            "Template {} not found; submissions will fail until it is in place",
            config.template_path.display()
        );
    }
    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_dir.display()
        )
    })?;
    info!("Filled forms will be written to {}", config.output_dir.display());

    let mailer = SmtpMailer::from_config(&config).context("Failed to configure SMTP transport")?;
    info!(
        "SMTP transport initialized ({}:{}, timeout {}s)",
        config.smtp_host,
        config.smtp_port,
        config.mail_timeout.as_secs()
    );

    // Build app state
    let state = AppState {
        config: config.clone(),
        mailer: Arc::new(mailer),
        sessions: SessionStore::default(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS to the form's origin once it is hosted

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
