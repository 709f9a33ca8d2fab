use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::{
    chain::{abi::parse_hex_address, units::format_ether, Boost},
    client::{BoostFeed, BoostSnapshot},
    state::AppState,
};

type ApiError = (StatusCode, String);

fn feed(state: &AppState) -> Result<&Arc<BoostFeed>, ApiError> {
    state.feed.as_ref().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        "boost feed unavailable: start the server with --rpc-url".to_string(),
    ))
}

fn upstream(e: anyhow::Error) -> ApiError {
    tracing::warn!(error = %format!("{:#}", e), "contract read failed");
    (StatusCode::BAD_GATEWAY, format!("contract read failed: {:#}", e))
}

/// `GET /api/boosts`: latest snapshot of active boosts.
async fn list_boosts(State(state): State<Arc<AppState>>) -> Result<Json<BoostSnapshot>, ApiError> {
    let feed = feed(&state)?;
    let snapshot = feed.snapshot();
    if snapshot.revision > 0 {
        return Ok(Json((*snapshot).clone()));
    }
    // No poll has landed yet.
    let snapshot = feed.refresh().await.map_err(upstream)?;
    Ok(Json((*snapshot).clone()))
}

/// `GET /api/boosts/{id}`: one boost, active or not.
async fn get_boost(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Boost>, ApiError> {
    let feed = feed(&state)?;
    if let Some(boost) = feed.snapshot().find(id) {
        return Ok(Json(boost.clone()));
    }
    feed.contract()
        .boost(id)
        .await
        .map_err(upstream)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, format!("boost {} not found", id)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EarningsResponse {
    address: String,
    earnings_wei: String,
    earnings_eth: String,
}

/// `GET /api/earnings/{address}`: unclaimed rewards for an account.
async fn get_earnings(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<EarningsResponse>, ApiError> {
    let feed = feed(&state)?;
    parse_hex_address(&address)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("invalid address: {:#}", e)))?;
    let wei = feed
        .contract()
        .user_earnings(&address)
        .await
        .map_err(upstream)?;
    Ok(Json(EarningsResponse {
        address,
        earnings_wei: wei.to_string(),
        earnings_eth: format_ether(wei),
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/boosts", get(list_boosts))
        .route("/boosts/{id}", get(get_boost))
        .route("/earnings/{address}", get(get_earnings))
}
