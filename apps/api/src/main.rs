mod auth;
mod config;
mod db;
mod errors;
mod middleware;
mod models;
mod routes;
mod state;
mod store;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;
use std::time::Duration;

use crate::auth::cache::VerifiedTokenCache;
use crate::auth::password::PasswordHasher;
use crate::auth::sweeper::spawn_session_sweeper;
use crate::auth::token::TokenSigner;
use crate::auth::SessionService;
use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::middleware::gatekeeper::HttpIdentityProbe;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{CredentialStore, PgCredentialStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;

    let store: Arc<dyn CredentialStore> = Arc::new(PgCredentialStore::new(db));

    let cache = VerifiedTokenCache::new(chrono::Duration::seconds(i64::try_from(
        config.session_cache_ttl_secs,
    )?));
    info!(
        "Session cache {}",
        if cache.is_enabled() { "enabled" } else { "disabled" }
    );

    let sessions = SessionService::new(
        store.clone(),
        PasswordHasher::default(),
        TokenSigner::new(&config.jwt_secret),
        cache,
        config.password_change_policy,
    );
    info!("Password change policy: {:?}", config.password_change_policy);

    if config.session_sweep_interval_secs > 0 {
        spawn_session_sweeper(
            store,
            Duration::from_secs(config.session_sweep_interval_secs),
        );
        info!(
            "Expired-session sweeper running every {}s",
            config.session_sweep_interval_secs
        );
    }

    let identity_probe = Arc::new(HttpIdentityProbe::new(config.auth_me_url.clone()));

    // Build app state
    let state = AppState {
        sessions: Arc::new(sessions),
        config: config.clone(),
        identity_probe,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
