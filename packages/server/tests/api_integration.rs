//! Integration tests for the paidcaster-server API.
//!
//! These tests start a real Axum server on a random port and hit the endpoints
//! with an HTTP client. Neynar and the JSON-RPC node are stood in for by
//! wiremock servers.

use std::{path::PathBuf, sync::Arc, time::Duration};

use paidcaster::{
    build_router,
    chain::{BoostContract, RpcClient},
    client::BoostFeed,
    neynar::NeynarClient,
    state::AppState,
    verify::{CastLookup, PaddingNormalizer, Strictness, Verifier},
};
use serde_json::{json, Value};
use tokio::sync::broadcast;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const ORIGINAL: &str = "0xdeadbeefcafef00d";
const CONTRACT: &str = "0x005FEFD5247Cbfbe230e6B2d5a71290B1861241B";

fn verifier(lookup: Option<Arc<dyn CastLookup>>, strictness: Strictness) -> Verifier {
    Verifier::new(Arc::new(PaddingNormalizer::default()), lookup, strictness)
}

fn neynar(server: &MockServer) -> Arc<dyn CastLookup> {
    Arc::new(NeynarClient::new(&server.uri(), "test-key", Duration::from_secs(5)).unwrap())
}

async fn spawn_app(verifier: Verifier, feed: Option<Arc<BoostFeed>>) -> String {
    let (event_tx, _) = broadcast::channel(16);
    let state = Arc::new(AppState {
        verifier,
        feed,
        ui_dir: PathBuf::from("/nonexistent/ui"),
        event_tx,
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn post_verify(base: &str, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{}/api/verify-recast", base))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

async fn get_json(url: String) -> (u16, Value) {
    let resp = reqwest::get(url).await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap_or(Value::Null))
}

fn padded(short: &str) -> String {
    format!("0x{}{}", "0".repeat(56), short)
}

fn rpc_result(hex_data: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": hex_data}))
}

// ---------------------------------------------------------------------------
// Verification endpoint
// ---------------------------------------------------------------------------

#[tokio::test]
async fn platform_url_is_verified_by_format() {
    let base = spawn_app(verifier(None, Strictness::Lenient), None).await;
    let (status, body) = post_verify(
        &base,
        json!({"castUrl": "https://warpcast.com/alice/0x1234abcd", "originalCastHash": ORIGINAL}),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["verified"], true);
    assert_eq!(body["recastHash"], padded("1234abcd"));
}

#[tokio::test]
async fn original_cast_is_rejected() {
    let base = spawn_app(verifier(None, Strictness::Lenient), None).await;
    let (status, body) =
        post_verify(&base, json!({"castUrl": ORIGINAL, "originalCastHash": ORIGINAL})).await;

    assert_eq!(status, 400);
    assert_eq!(body["success"], true);
    assert_eq!(body["verified"], false);
    assert!(body["error"].as_str().unwrap().contains("original"));
    assert_eq!(body["code"], "SameAsOriginal");
}

#[tokio::test]
async fn garbage_is_invalid_format() {
    let base = spawn_app(verifier(None, Strictness::Lenient), None).await;
    let (status, body) =
        post_verify(&base, json!({"castUrl": "not-a-hash", "originalCastHash": ORIGINAL})).await;

    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["verified"], false);
    assert_eq!(body["error"], "Invalid cast hash format");
}

#[tokio::test]
async fn malformed_bodies_are_rejected() {
    let base = spawn_app(verifier(None, Strictness::Lenient), None).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/verify-recast", base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "MalformedRequest");

    let (status, body) = post_verify(&base, json!({"originalCastHash": ORIGINAL})).await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "MalformedRequest");
}

#[tokio::test]
async fn health_check_reports_capabilities() {
    let base = spawn_app(verifier(None, Strictness::Lenient), None).await;
    let (status, body) = get_json(format!("{}/api/verify-recast", base)).await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["hasNeynarAPI"], false);
    assert_eq!(body["supportsShortHashes"], true);
    assert_eq!(body["fallbackEnabled"], false);
    assert_eq!(body["strictness"], "lenient");
}

#[tokio::test]
async fn strict_mode_still_reports_outage_fallback() {
    let neynar_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&neynar_server)
        .await;

    let base = spawn_app(verifier(Some(neynar(&neynar_server)), Strictness::Strict), None).await;
    let (status, body) = get_json(format!("{}/api/verify-recast", base)).await;
    assert_eq!(status, 200);
    assert_eq!(body["hasNeynarAPI"], true);
    assert_eq!(body["fallbackEnabled"], true);
    assert_eq!(body["strictness"], "strict");

    let (status, body) = post_verify(
        &base,
        json!({"castUrl": "0x1234567890abcdef", "originalCastHash": ORIGINAL}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["verified"], true);
}

#[tokio::test]
async fn cast_hash_query_does_basic_validation() {
    let base = spawn_app(verifier(None, Strictness::Strict), None).await;

    let (status, body) = get_json(format!("{}/api/verify-recast?castHash=0x1234abcd", base)).await;
    assert_eq!(status, 200);
    assert_eq!(body["verified"], true);
    assert_eq!(body["castHash"], padded("1234abcd"));
    assert_eq!(body["message"], "Basic validation only");

    let (status, body) = get_json(format!("{}/api/verify-recast?castHash=0x12", base)).await;
    assert_eq!(status, 200);
    assert_eq!(body["verified"], false);

    let (status, _) = get_json(format!("{}/api/verify-recast?castHash=", base)).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn strict_mode_rejects_unknown_cast() {
    let neynar_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/farcaster/cast"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&neynar_server)
        .await;

    let base = spawn_app(verifier(Some(neynar(&neynar_server)), Strictness::Strict), None).await;
    let (status, body) = post_verify(
        &base,
        json!({"castUrl": "0x1234567890abcdef", "originalCastHash": ORIGINAL}),
    )
    .await;

    assert_eq!(status, 404);
    assert_eq!(body["success"], true);
    assert_eq!(body["verified"], false);
    assert_eq!(body["code"], "NotFound");
}

#[tokio::test]
async fn upstream_outage_falls_back_to_format_check() {
    let neynar_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&neynar_server)
        .await;

    let base = spawn_app(verifier(Some(neynar(&neynar_server)), Strictness::Strict), None).await;
    let (status, body) = post_verify(
        &base,
        json!({"castUrl": "0x1234567890abcdef", "originalCastHash": ORIGINAL}),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["verified"], true);
    assert!(body["note"].as_str().unwrap().contains("API unavailable"));
}

#[tokio::test]
async fn upstream_confirms_reply_to_original() {
    let neynar_server = MockServer::start().await;
    let url = "https://warpcast.com/bob/0xabcdef12";
    let upstream_hash = "0xabcdef1200000000000000000000000000000000";
    Mock::given(method("GET"))
        .and(path("/v2/farcaster/cast"))
        .and(query_param("type", "url"))
        .and(query_param("identifier", url))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cast": {
                "hash": upstream_hash,
                "parent_hash": ORIGINAL,
                "author": {"fid": 7},
                "embeds": [],
                "reactions": {"recasts_count": 3}
            }
        })))
        .mount(&neynar_server)
        .await;

    let base = spawn_app(verifier(Some(neynar(&neynar_server)), Strictness::Strict), None).await;
    let (status, body) = post_verify(&base, json!({"castUrl": url, "originalCastHash": ORIGINAL})).await;

    assert_eq!(status, 200);
    assert_eq!(body["verified"], true);
    assert_eq!(
        body["recastHash"],
        format!("0x{}{}", "0".repeat(24), &upstream_hash[2..])
    );
    assert_eq!(body["message"], "Recast verified via Neynar");
    assert_eq!(body["recastCount"], 3);
}

// ---------------------------------------------------------------------------
// Boost feed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn boost_routes_need_rpc() {
    let base = spawn_app(verifier(None, Strictness::Lenient), None).await;

    let resp = reqwest::get(format!("{}/api/boosts", base)).await.unwrap();
    assert_eq!(resp.status().as_u16(), 503);

    let (status, body) = get_json(format!("{}/api/health", base)).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["boostFeed"], false);
}

#[tokio::test]
async fn boosts_are_fetched_on_first_request() {
    let rpc = MockServer::start().await;
    // Empty `Boost[]`: offset word then a zero length word.
    let empty_list = format!("0x{:064x}{:064x}", 32, 0);
    Mock::given(method("POST"))
        .respond_with(rpc_result(empty_list))
        .mount(&rpc)
        .await;

    let feed = BoostFeed::new(BoostContract::new(RpcClient::new(rpc.uri()), CONTRACT));
    let base = spawn_app(verifier(None, Strictness::Lenient), Some(feed)).await;

    let (status, body) = get_json(format!("{}/api/boosts", base)).await;
    assert_eq!(status, 200);
    assert_eq!(body["revision"], 1);
    assert_eq!(body["boosts"], json!([]));

    let (_, body) = get_json(format!("{}/api/health", base)).await;
    assert_eq!(body["boostFeed"], true);
    assert_eq!(body["boostRevision"], 1);
}

#[tokio::test]
async fn earnings_are_formatted_in_ether() {
    let rpc = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(rpc_result(format!("0x{:064x}", 2_000_000_000_000_000u128)))
        .mount(&rpc)
        .await;

    let feed = BoostFeed::new(BoostContract::new(RpcClient::new(rpc.uri()), CONTRACT));
    let base = spawn_app(verifier(None, Strictness::Lenient), Some(feed)).await;

    let account = format!("0x{}cc", "00".repeat(19));
    let (status, body) = get_json(format!("{}/api/earnings/{}", base, account)).await;
    assert_eq!(status, 200);
    assert_eq!(body["earningsWei"], "2000000000000000");
    assert_eq!(body["earningsEth"], "0.002");

    let resp = reqwest::get(format!("{}/api/earnings/not-an-address", base))
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}
