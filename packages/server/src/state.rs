use std::{path::PathBuf, sync::Arc};

use tokio::sync::broadcast;

use crate::{client::BoostFeed, verify::Verifier};

/// Shared application state.
pub struct AppState {
    /// Recast verification pipeline.
    pub verifier: Verifier,
    /// Polled boost snapshot (requires an RPC URL).
    pub feed: Option<Arc<BoostFeed>>,
    /// Directory containing built UI static files.
    pub ui_dir: PathBuf,
    /// Broadcast channel for server-sent events (WebSocket).
    pub event_tx: broadcast::Sender<String>,
}
