use std::sync::Arc;

use crate::config::Config;
use crate::mail::Mailer;
use crate::submission::session::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Delivery backend. `SmtpMailer` in production, a recorder in tests.
    pub mailer: Arc<dyn Mailer>,
    /// Per-session submission state.
    pub sessions: SessionStore,
}

#[cfg(test)]
pub fn test_state(
    template_path: &std::path::Path,
    output_dir: &std::path::Path,
    mailer: Arc<dyn Mailer>,
) -> AppState {
    AppState {
        config: crate::config::test_config(template_path, output_dir),
        mailer,
        sessions: SessionStore::default(),
    }
}
