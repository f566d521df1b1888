pub mod auth;
pub mod health;

use std::path::Path;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::services::{ServeDir, ServeFile};

use crate::errors::AppError;
use crate::middleware::gatekeeper::gatekeeper;
use crate::state::AppState;

async fn api_not_found() -> AppError {
    AppError::NotFound("No such API endpoint".to_string())
}

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/auth/register", post(auth::handle_register))
        .route("/auth/login", post(auth::handle_login))
        .route("/auth/logout", post(auth::handle_logout))
        .route("/auth/me", get(auth::handle_me))
        .route("/auth/password", post(auth::handle_change_password))
        .fallback(api_not_found);

    // Built frontend; unknown paths get index.html so client-side routes resolve.
    let frontend_dir = Path::new(&state.config.frontend_dir);
    let pages = ServeDir::new(frontend_dir).fallback(ServeFile::new(frontend_dir.join("index.html")));

    Router::new()
        .route("/health", get(health::health_handler))
        .nest("/api", api)
        .fallback_service(pages)
        .layer(middleware::from_fn_with_state(state.clone(), gatekeeper))
        .with_state(state)
}
