use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use tokio::{sync::broadcast, task::JoinHandle};

use crate::{
    client::{BoostFeed, BoostSnapshot},
    state::AppState,
};

/// Event pushed whenever the boost snapshot is replaced.
pub fn boost_event(snapshot: &BoostSnapshot) -> String {
    serde_json::json!({
        "type": "boosts:updated",
        "revision": snapshot.revision,
        "count": snapshot.boosts.len(),
    })
    .to_string()
}

/// Relay snapshot changes from the feed onto the WebSocket broadcast channel.
pub fn forward_boost_updates(
    feed: &Arc<BoostFeed>,
    event_tx: broadcast::Sender<String>,
) -> JoinHandle<()> {
    let mut rx = feed.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let event = boost_event(&rx.borrow_and_update());
            // No subscribers is fine.
            let _ = event_tx.send(event);
        }
    })
}

/// `GET /ws`: live boost updates.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let rx = state.event_tx.subscribe();
    let initial = state
        .feed
        .as_ref()
        .map(|f| f.snapshot())
        .filter(|s| s.revision > 0)
        .map(|s| boost_event(&s));
    ws.on_upgrade(move |socket| handle_socket(socket, rx, initial))
}

async fn handle_socket(
    mut socket: WebSocket,
    mut rx: broadcast::Receiver<String>,
    initial: Option<String>,
) {
    tracing::info!("WebSocket client connected");

    if let Some(event) = initial {
        if socket.send(Message::Text(event.into())).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    if socket.send(Message::Text(event.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "WebSocket client lagged, dropping boost events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Ping(data))) => {
                    if socket.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::info!("WebSocket client disconnected");
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(ws_handler))
}
