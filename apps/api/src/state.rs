use std::sync::Arc;

use crate::auth::SessionService;
use crate::config::Config;
use crate::middleware::gatekeeper::IdentityProbe;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Owns the credential store; handlers never touch the database directly.
    pub sessions: Arc<SessionService>,
    pub config: Config,
    /// How the page gatekeeper asks "is this cookie a live session?".
    /// Default: `HttpIdentityProbe` calling `config.auth_me_url`.
    pub identity_probe: Arc<dyn IdentityProbe>,
}
