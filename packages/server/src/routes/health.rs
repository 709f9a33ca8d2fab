use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    neynar: bool,
    boost_feed: bool,
    /// Revision of the latest boost snapshot; 0 until the first poll lands.
    #[serde(skip_serializing_if = "Option::is_none")]
    boost_revision: Option<u64>,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        neynar: state.verifier.has_lookup(),
        boost_feed: state.feed.is_some(),
        boost_revision: state.feed.as_ref().map(|f| f.snapshot().revision),
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}
