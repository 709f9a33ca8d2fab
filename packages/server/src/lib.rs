//! PaidCaster: paid-recast boosts on Base with server-side recast verification.

pub mod chain;
pub mod client;
pub mod neynar;
pub mod routes;
pub mod state;
pub mod verify;

use std::sync::Arc;

use axum::Router;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
};

use state::AppState;

/// Assemble the HTTP application: `/api`, `/ws`, and the static UI fallback.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = routes::api_router(state.clone());

    let mut app = Router::new()
        .nest("/api", api)
        .merge(routes::ws::router().with_state(state.clone()));

    if state.ui_dir.is_dir() {
        let index = state.ui_dir.join("index.html");
        app = app.fallback_service(ServeDir::new(&state.ui_dir).fallback(ServeFile::new(index)));
    }

    // The UI may be served from another origin during development.
    app.layer(CorsLayer::very_permissive())
}
