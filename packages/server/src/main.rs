use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast;

use paidcaster::{
    build_router,
    chain::{BoostContract, RpcClient, DEFAULT_CONTRACT_ADDRESS},
    client::BoostFeed,
    neynar::{self, NeynarClient},
    routes::ws::forward_boost_updates,
    state::AppState,
    verify::{
        hash::DEFAULT_SHORT_HASH_PADDING, CastLookup, PaddingNormalizer, Strictness, Verifier,
    },
};

#[derive(Debug, Parser)]
#[command(name = "paidcaster-server")]
#[command(about = "PaidCaster recast verification and boost feed server")]
struct Cli {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Neynar API key. Without one, claims are checked for format only.
    #[arg(long, env = "NEYNAR_API_KEY", hide_env_values = true)]
    neynar_api_key: Option<String>,

    #[arg(long, env = "NEYNAR_BASE_URL", default_value = neynar::DEFAULT_BASE_URL)]
    neynar_base_url: String,

    /// How upstream "not found" and "unrelated" answers are treated.
    #[arg(long, env = "VERIFY_STRICTNESS", value_enum, default_value_t = Strictness::Lenient)]
    strictness: Strictness,

    /// 56 hex chars placed before 8-char short hashes.
    #[arg(long, env = "SHORT_HASH_PADDING", default_value = DEFAULT_SHORT_HASH_PADDING)]
    short_hash_padding: String,

    /// Zero-pad short hashes instead of expanding them with the template.
    #[arg(long, env = "DISABLE_SHORT_HASHES")]
    disable_short_hashes: bool,

    /// Timeout for each Neynar request.
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value = "10")]
    upstream_timeout_secs: u64,

    /// Base JSON-RPC URL for the boost feed.
    #[arg(long, env = "RPC_URL")]
    rpc_url: Option<String>,

    /// PaidCaster contract address.
    #[arg(long, env = "CONTRACT_ADDRESS", default_value = DEFAULT_CONTRACT_ADDRESS)]
    contract_address: String,

    /// Seconds between `getActiveBoosts` polls.
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value = "15")]
    poll_interval_secs: u64,

    /// Directory containing the built UI static files.
    #[arg(long, env = "UI_DIR", default_value = "/app/ui")]
    ui_dir: PathBuf,
}

fn build_verifier(cli: &Cli) -> Result<Verifier> {
    let padding = (!cli.disable_short_hashes).then_some(cli.short_hash_padding.as_str());
    let normalizer =
        PaddingNormalizer::new(padding).context("invalid --short-hash-padding")?;

    let lookup: Option<Arc<dyn CastLookup>> =
        match neynar::usable_api_key(cli.neynar_api_key.as_deref()) {
            Some(key) => {
                let timeout = Duration::from_secs(cli.upstream_timeout_secs);
                let client: Arc<dyn CastLookup> = Arc::new(
                    NeynarClient::new(&cli.neynar_base_url, key, timeout)
                        .context("failed to build Neynar client")?,
                );
                Some(client)
            }
            None => {
                tracing::warn!("no Neynar API key configured; verifying format only");
                None
            }
        };

    Ok(Verifier::new(Arc::new(normalizer), lookup, cli.strictness))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "paidcaster=info,paidcaster_server=info,tower_http=info".into()
            }),
        )
        .init();

    let cli = Cli::parse();

    let verifier = build_verifier(&cli)?;
    tracing::info!(
        strictness = cli.strictness.as_str(),
        neynar = verifier.has_lookup(),
        short_hashes = verifier.supports_short_hashes(),
        "starting paidcaster-server"
    );

    // Broadcast channel for WebSocket events (boost snapshot updates)
    let (event_tx, _) = broadcast::channel::<String>(64);

    let feed = cli.rpc_url.as_ref().map(|url| {
        tracing::info!(rpc_url = %url, contract = %cli.contract_address, "boost feed enabled");
        let contract = BoostContract::new(RpcClient::new(url.clone()), cli.contract_address.clone());
        let feed = BoostFeed::new(contract);
        feed.spawn_polling(Duration::from_secs(cli.poll_interval_secs.max(1)));
        forward_boost_updates(&feed, event_tx.clone());
        feed
    });

    let state = Arc::new(AppState {
        verifier,
        feed,
        ui_dir: cli.ui_dir,
        event_tx,
    });

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    tracing::info!(%addr, "server listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .await
        .context("server error")?;

    Ok(())
}
