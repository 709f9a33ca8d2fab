use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    state::AppState,
    verify::{hash::is_well_formed, Strictness, VerificationRequest, VerifyError, VerifyResponse},
};

/// `POST /api/verify-recast`: check a pasted recast against the boosted cast.
async fn verify_recast(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VerificationRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, VerifyError> {
    let Json(req) = payload.map_err(|e| match e {
        JsonRejection::BytesRejection(_) => VerifyError::Unexpected(e.body_text()),
        _ => VerifyError::MalformedRequest(e.body_text()),
    })?;

    match state.verifier.verify(&req).await {
        Ok(verdict) => {
            tracing::info!(
                recast_hash = %verdict.recast_hash,
                source = ?verdict.source,
                note = ?verdict.note,
                "recast verified"
            );
            Ok(Json(verdict.into()))
        }
        Err(e) => {
            tracing::info!(kind = e.kind(), reason = %e, "recast rejected");
            Err(e)
        }
    }
}

#[derive(Debug, Deserialize)]
struct BasicQuery {
    #[serde(rename = "castHash")]
    cast_hash: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    message: String,
    #[serde(rename = "hasNeynarAPI")]
    has_neynar_api: bool,
    #[serde(rename = "supportsShortHashes")]
    supports_short_hashes: bool,
    #[serde(rename = "fallbackEnabled")]
    fallback_enabled: bool,
    strictness: Strictness,
}

/// `GET /api/verify-recast`: capability report, or a format-only check when
/// `?castHash=` is given.
async fn verify_get(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BasicQuery>,
) -> Response {
    let Some(cast_hash) = query.cast_hash else {
        return Json(health(&state)).into_response();
    };

    let cast_hash = cast_hash.trim();
    if cast_hash.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Missing castHash parameter"})),
        )
            .into_response();
    }

    let canonical = state.verifier.canonicalize(cast_hash);
    Json(serde_json::json!({
        "success": true,
        "verified": is_well_formed(&canonical),
        "castHash": canonical,
        "message": "Basic validation only",
    }))
    .into_response()
}

fn health(state: &AppState) -> HealthResponse {
    let verifier = &state.verifier;
    let message = if verifier.has_lookup() {
        "Recast verification API (Neynar enabled)"
    } else {
        "Recast verification API (format validation only)"
    };
    HealthResponse {
        status: "ok",
        message: message.to_string(),
        has_neynar_api: verifier.has_lookup(),
        supports_short_hashes: verifier.supports_short_hashes(),
        fallback_enabled: verifier.falls_back_when_unavailable(),
        strictness: verifier.strictness(),
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/verify-recast", get(verify_get).post(verify_recast))
}
