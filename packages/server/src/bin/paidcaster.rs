use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use paidcaster::{
    chain::{units::format_ether, Boost, BoostContract, RpcClient, Wallet, DEFAULT_CONTRACT_ADDRESS},
    client::{
        feed::DEFAULT_POLL_INTERVAL, likes::DEFAULT_LIKES_FILE, verify_api::DEFAULT_VERIFY_URL,
        BoostFeed, LikesStore, PaidCaster, VerifyApiClient,
    },
};

#[derive(Debug, Parser)]
#[command(name = "paidcaster")]
#[command(about = "Create, recast, and claim PaidCaster boosts")]
struct Cli {
    /// Wallet JSON-RPC endpoint (signs and sends transactions).
    #[arg(long, env = "WALLET_RPC_URL", default_value = "http://localhost:8545")]
    wallet_rpc: String,

    #[arg(long, env = "CONTRACT_ADDRESS", default_value = DEFAULT_CONTRACT_ADDRESS)]
    contract_address: String,

    /// Recast verification endpoint.
    #[arg(long, env = "VERIFY_URL", default_value = DEFAULT_VERIFY_URL)]
    verify_url: String,

    #[arg(long, env = "LIKES_FILE", default_value = DEFAULT_LIKES_FILE)]
    likes_file: PathBuf,

    /// Act as this account instead of requesting one from the wallet.
    #[arg(long, env = "ACCOUNT")]
    account: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List active boosts.
    Boosts,
    /// Poll active boosts and print each refresh.
    Watch {
        #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
        interval_secs: u64,
    },
    /// Show one boost.
    Boost { id: u64 },
    /// Fund a new boost for a cast.
    Create {
        #[arg(long)]
        cast_hash: String,
        /// Reward per recast, in ETH.
        #[arg(long)]
        reward: String,
        #[arg(long)]
        max_recasts: String,
    },
    /// Verify a recast and collect the boost's reward.
    Recast {
        id: u64,
        /// Recast URL or hash.
        url: String,
    },
    /// Withdraw accumulated rewards.
    Claim,
    /// Show unclaimed rewards.
    Earnings,
    /// Like a boost (stored locally).
    Like { id: u64 },
    /// Show local like counts.
    Likes,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paidcaster=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let rpc = RpcClient::new(cli.wallet_rpc.clone());
    let feed = BoostFeed::new(BoostContract::new(rpc.clone(), cli.contract_address.clone()));
    let mut app = PaidCaster::new(feed, VerifyApiClient::new(cli.verify_url.clone()));

    match cli.command {
        Command::Boosts => cmd_boosts(&app, &cli.likes_file).await,
        Command::Watch { interval_secs } => cmd_watch(app.feed(), interval_secs).await,
        Command::Boost { id } => cmd_boost(&app, id).await,
        Command::Create {
            cast_hash,
            reward,
            max_recasts,
        } => {
            connect(&mut app, rpc, cli.account).await?;
            cmd_create(&app, &cast_hash, &reward, &max_recasts).await
        }
        Command::Recast { id, url } => {
            connect(&mut app, rpc, cli.account).await?;
            cmd_recast(&app, id, &url).await
        }
        Command::Claim => {
            connect(&mut app, rpc, cli.account).await?;
            cmd_claim(&app).await
        }
        Command::Earnings => {
            connect(&mut app, rpc, cli.account).await?;
            cmd_earnings(&app).await
        }
        Command::Like { id } => cmd_like(&cli.likes_file, id),
        Command::Likes => cmd_likes(&cli.likes_file),
    }
}

async fn connect(app: &mut PaidCaster, rpc: RpcClient, account: Option<String>) -> Result<()> {
    match account {
        Some(account) => app.use_wallet(Wallet::from_account(rpc, account)),
        None => {
            app.connect(rpc).await?;
        }
    }
    if let Some(wallet) = app.wallet() {
        println!("Account: {}", wallet.account());
    }
    Ok(())
}

fn print_boost(boost: &Boost, likes: u64) {
    println!(
        "#{:<4} {}  {} ETH/recast  {}/{} recasts  {} likes{}",
        boost.id,
        boost.cast_hash,
        format_ether(boost.reward_per_recast),
        boost.current_recasts,
        boost.max_recasts,
        likes,
        if boost.is_active { "" } else { "  (inactive)" },
    );
}

async fn cmd_boosts(app: &PaidCaster, likes_file: &Path) -> Result<()> {
    let snapshot = app.feed().refresh().await.context("error loading boosts")?;
    let created = app.feed().contract().boost_counter().await?;
    let likes = LikesStore::load(likes_file);
    println!("{} active of {} boosts created", snapshot.boosts.len(), created);
    if snapshot.boosts.is_empty() {
        return Ok(());
    }
    for boost in &snapshot.boosts {
        print_boost(boost, likes.count(boost.id));
    }
    Ok(())
}

async fn cmd_watch(feed: &Arc<BoostFeed>, interval_secs: u64) -> Result<()> {
    let mut rx = feed.subscribe();
    let poller = feed.spawn_polling(Duration::from_secs(interval_secs.max(1)));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                println!("-- revision {} ({} active)", snapshot.revision, snapshot.boosts.len());
                for boost in &snapshot.boosts {
                    print_boost(boost, 0);
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    poller.abort();
    Ok(())
}

async fn cmd_boost(app: &PaidCaster, id: u64) -> Result<()> {
    let Some(boost) = app.feed().contract().boost(id).await? else {
        bail!("boost #{} not found", id);
    };
    println!("{}", serde_json::to_string_pretty(&boost)?);
    Ok(())
}

async fn cmd_create(app: &PaidCaster, cast_hash: &str, reward: &str, max_recasts: &str) -> Result<()> {
    let receipt = app.create_boost(cast_hash, reward, max_recasts).await?;
    println!("Boost created successfully!");
    println!("Transaction: {}", receipt.transaction_hash);
    Ok(())
}

async fn cmd_recast(app: &PaidCaster, id: u64, url: &str) -> Result<()> {
    let outcome = app.recast(id, url).await?;
    println!(
        "Recast verified! You earned {} ETH",
        format_ether(outcome.earned)
    );
    println!("Transaction: {}", outcome.receipt.transaction_hash);
    println!("Unclaimed earnings: {} ETH", format_ether(outcome.earnings));
    Ok(())
}

async fn cmd_claim(app: &PaidCaster) -> Result<()> {
    let receipt = app.claim_rewards().await?;
    println!("Rewards claimed successfully!");
    println!("Transaction: {}", receipt.transaction_hash);
    Ok(())
}

async fn cmd_earnings(app: &PaidCaster) -> Result<()> {
    let wei = app.earnings().await?;
    println!("{} ETH", format_ether(wei));
    Ok(())
}

fn cmd_like(likes_file: &Path, id: u64) -> Result<()> {
    let mut likes = LikesStore::load(likes_file);
    let count = likes.like(id)?;
    println!("Boost #{} now has {} likes", id, count);
    Ok(())
}

fn cmd_likes(likes_file: &Path) -> Result<()> {
    let likes = LikesStore::load(likes_file);
    if likes.all().is_empty() {
        println!("No likes yet ({}).", likes.path().display());
        return Ok(());
    }
    for (key, count) in likes.all() {
        println!("{:<12} {}", key, count);
    }
    Ok(())
}
