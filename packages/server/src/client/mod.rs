//! Client-side orchestration: wallet, boost snapshot, verification gate, and
//! the three paid actions.
//!
//! The verification call is advisory. The contract never sees the verdict, so
//! anyone calling `recastAndEarn` directly skips it; the checks here exist to
//! stop obviously wrong submissions before the user pays gas. Own-boost and
//! max-recast checks are likewise optimistic, run against the last snapshot,
//! and enforced for real on-chain.

pub mod feed;
pub mod likes;
pub mod verify_api;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::chain::{
    units::{format_ether, parse_ether},
    wallet::is_user_rejection,
    Boost, BoostContract, ConnectError, Receipt, RpcClient, Wallet,
};

pub use feed::{BoostFeed, BoostSnapshot};
pub use likes::LikesStore;
pub use verify_api::VerifyApiClient;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("wallet not connected")]
    NotConnected,

    #[error("another transaction is in progress")]
    Busy,

    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("insufficient balance: need {needed} ETH, have {available} ETH")]
    InsufficientBalance { needed: String, available: String },

    #[error("boost #{0} not found")]
    BoostNotFound(u64),

    #[error("cannot recast your own boost")]
    OwnBoost,

    #[error("max recasts reached")]
    MaxRecastsReached,

    #[error("please enter a valid recast URL")]
    InvalidRecastUrl,

    #[error("verification failed: {0}")]
    VerificationFailed(String),

    #[error("already recasted")]
    AlreadyRecasted,

    #[error("transaction cancelled")]
    Cancelled,

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ClientError {
    /// Classify a failed transaction by wallet code or revert reason.
    fn from_tx(err: anyhow::Error) -> Self {
        if is_user_rejection(&err) {
            return Self::Cancelled;
        }
        if format!("{:#}", err).contains("Already recasted") {
            return Self::AlreadyRecasted;
        }
        Self::Other(err)
    }
}

/// Result of a successful `recastAndEarn`.
#[derive(Debug, Clone)]
pub struct RecastOutcome {
    pub receipt: Receipt,
    pub boost: Boost,
    /// Reward credited by this recast, in wei.
    pub earned: u128,
    /// Unclaimed total after the recast, in wei.
    pub earnings: u128,
}

/// Clears the busy flag when an operation ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct PaidCaster {
    feed: Arc<BoostFeed>,
    verify_api: VerifyApiClient,
    wallet: Option<Wallet>,
    busy: AtomicBool,
}

impl PaidCaster {
    pub fn new(feed: Arc<BoostFeed>, verify_api: VerifyApiClient) -> Self {
        Self {
            feed,
            verify_api,
            wallet: None,
            busy: AtomicBool::new(false),
        }
    }

    pub fn feed(&self) -> &Arc<BoostFeed> {
        &self.feed
    }

    fn contract(&self) -> &BoostContract {
        self.feed.contract()
    }

    pub fn wallet(&self) -> Option<&Wallet> {
        self.wallet.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn begin(&self) -> Result<BusyGuard<'_>, ClientError> {
        if self.busy.swap(true, Ordering::AcqRel) {
            return Err(ClientError::Busy);
        }
        Ok(BusyGuard(&self.busy))
    }

    fn require_wallet(&self) -> Result<&Wallet, ClientError> {
        self.wallet.as_ref().ok_or(ClientError::NotConnected)
    }

    pub async fn connect(&mut self, provider: RpcClient) -> Result<&Wallet, ClientError> {
        let wallet = Wallet::connect(provider).await?;
        Ok(self.wallet.insert(wallet))
    }

    /// Use an already-authorized account without the connection handshake.
    pub fn use_wallet(&mut self, wallet: Wallet) {
        self.wallet = Some(wallet);
    }

    pub fn disconnect(&mut self) {
        self.wallet = None;
    }

    /// Unclaimed rewards of the connected account; read failures count as zero.
    pub async fn earnings(&self) -> Result<u128, ClientError> {
        let wallet = self.require_wallet()?;
        match self.contract().user_earnings(wallet.account()).await {
            Ok(wei) => Ok(wei),
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "failed to read earnings");
                Ok(0)
            }
        }
    }

    async fn refresh_after_tx(&self) {
        if let Err(e) = self.feed.refresh().await {
            tracing::warn!(error = %format!("{:#}", e), "failed to refresh boosts after transaction");
        }
    }

    /// Fund a boost paying `reward_eth` per recast for up to `max_recasts`
    /// recasts. Arguments are raw form input.
    pub async fn create_boost(
        &self,
        cast_hash: &str,
        reward_eth: &str,
        max_recasts: &str,
    ) -> Result<Receipt, ClientError> {
        let wallet = self.require_wallet()?;
        let cast_hash = cast_hash.trim();
        if cast_hash.is_empty() {
            return Err(ClientError::MissingField("cast hash"));
        }
        if reward_eth.trim().is_empty() {
            return Err(ClientError::MissingField("reward amount"));
        }
        if max_recasts.trim().is_empty() {
            return Err(ClientError::MissingField("max recasts"));
        }

        let reward_per_recast = parse_ether(reward_eth).map_err(|e| ClientError::InvalidInput {
            field: "reward amount",
            reason: e.to_string(),
        })?;
        let max_recasts: u64 = max_recasts
            .trim()
            .parse()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ClientError::InvalidInput {
                field: "max recasts",
                reason: "must be a positive whole number".to_string(),
            })?;
        let deposit = reward_per_recast
            .checked_mul(max_recasts as u128)
            .ok_or_else(|| ClientError::InvalidInput {
                field: "reward amount",
                reason: "total deposit too large".to_string(),
            })?;

        let _busy = self.begin()?;

        let balance = wallet.balance().await?;
        if balance < deposit {
            return Err(ClientError::InsufficientBalance {
                needed: format_ether(deposit),
                available: format_ether(balance),
            });
        }

        tracing::info!(cast_hash = %cast_hash, reward_per_recast, max_recasts, "creating boost");
        let receipt = self
            .contract()
            .create_boost(wallet, cast_hash, reward_per_recast, max_recasts)
            .await
            .map_err(ClientError::from_tx)?;

        self.refresh_after_tx().await;
        Ok(receipt)
    }

    /// Verify a pasted recast and claim the reward for `boost_id`.
    pub async fn recast(&self, boost_id: u64, recast_url: &str) -> Result<RecastOutcome, ClientError> {
        let wallet = self.require_wallet()?;
        let recast_url = recast_url.trim();
        if recast_url.is_empty() {
            return Err(ClientError::MissingField("recast URL"));
        }

        let _busy = self.begin()?;

        let boost = self.find_boost(boost_id).await?;
        if boost.is_created_by(wallet.account()) {
            return Err(ClientError::OwnBoost);
        }
        if boost.is_full() {
            return Err(ClientError::MaxRecastsReached);
        }

        if recast_url.len() < verify_api::MIN_RECAST_INPUT {
            return Err(ClientError::InvalidRecastUrl);
        }
        let verdict = self.verify_api.verify(recast_url, &boost.cast_hash).await?;
        if !verdict.verified {
            let reason = verdict.error.unwrap_or_else(|| "Invalid recast".to_string());
            return Err(ClientError::VerificationFailed(reason));
        }
        if let Some(ref note) = verdict.note {
            tracing::info!(note = %note, "verification passed with caveat");
        }

        let receipt = self
            .contract()
            .recast_and_earn(wallet, boost_id)
            .await
            .map_err(ClientError::from_tx)?;

        self.refresh_after_tx().await;
        let earnings = self.earnings().await?;
        Ok(RecastOutcome {
            receipt,
            earned: boost.reward_per_recast,
            boost,
            earnings,
        })
    }

    pub async fn claim_rewards(&self) -> Result<Receipt, ClientError> {
        let wallet = self.require_wallet()?;
        let _busy = self.begin()?;
        self.contract()
            .claim_rewards(wallet)
            .await
            .map_err(ClientError::from_tx)
    }

    /// Look a boost up in the snapshot, refreshing once if it is not there.
    async fn find_boost(&self, boost_id: u64) -> Result<Boost, ClientError> {
        if let Some(b) = self.feed.snapshot().find(boost_id) {
            return Ok(b.clone());
        }
        let snapshot = self.feed.refresh().await?;
        snapshot
            .find(boost_id)
            .cloned()
            .ok_or(ClientError::BoostNotFound(boost_id))
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        matchers::{body_partial_json, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::chain::{
        abi::{encode_call, Token},
        boost_contract::tests::{encode_boost_list, sample},
    };

    const ME: &str = "0x00000000000000000000000000000000000000cc";

    fn ok(result: serde_json::Value) -> serde_json::Value {
        serde_json::json!({"jsonrpc": "2.0", "id": 1, "result": result})
    }

    async fn rpc(server: &MockServer, matcher: serde_json::Value, result: serde_json::Value) {
        Mock::given(method("POST"))
            .and(body_partial_json(matcher))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok(result)))
            .mount(server)
            .await;
    }

    async fn mock_boosts(server: &MockServer, boosts: &[(Boost, u8)]) {
        let data = encode_boost_list(boosts);
        rpc(
            server,
            serde_json::json!({"method": "eth_call", "params": [{"data": encode_call("getActiveBoosts()", &[])}]}),
            serde_json::json!(format!("0x{}", hex::encode(data))),
        )
        .await;
    }

    fn client(chain: &MockServer, verify: &MockServer) -> PaidCaster {
        let contract = BoostContract::new(RpcClient::new(chain.uri()), "0x00000000000000000000000000000000000000ff");
        let mut pc = PaidCaster::new(
            BoostFeed::new(contract),
            VerifyApiClient::new(format!("{}/api/verify-recast", verify.uri())),
        );
        pc.use_wallet(Wallet::from_account(RpcClient::new(chain.uri()), ME));
        pc
    }

    #[tokio::test]
    async fn actions_require_wallet() {
        let chain = MockServer::start().await;
        let contract = BoostContract::new(RpcClient::new(chain.uri()), "0x01");
        let pc = PaidCaster::new(BoostFeed::new(contract), VerifyApiClient::new(chain.uri()));
        assert!(matches!(pc.claim_rewards().await, Err(ClientError::NotConnected)));
        assert!(matches!(pc.recast(1, "0xabc").await, Err(ClientError::NotConnected)));
    }

    #[tokio::test]
    async fn create_boost_validates_fields() {
        let chain = MockServer::start().await;
        let pc = client(&chain, &chain);
        assert!(matches!(
            pc.create_boost("", "0.001", "10").await,
            Err(ClientError::MissingField("cast hash"))
        ));
        assert!(matches!(
            pc.create_boost("0xabc", "abc", "10").await,
            Err(ClientError::InvalidInput { field: "reward amount", .. })
        ));
        assert!(matches!(
            pc.create_boost("0xabc", "0.001", "0").await,
            Err(ClientError::InvalidInput { field: "max recasts", .. })
        ));
    }

    #[tokio::test]
    async fn create_boost_checks_balance() {
        let chain = MockServer::start().await;
        rpc(&chain, serde_json::json!({"method": "eth_getBalance"}), serde_json::json!("0x1")).await;

        let pc = client(&chain, &chain);
        let err = pc.create_boost("0xabc", "0.001", "10").await.unwrap_err();
        match err {
            ClientError::InsufficientBalance { needed, .. } => assert_eq!(needed, "0.01"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!pc.is_busy());
    }

    #[tokio::test]
    async fn recast_rejects_own_and_full_boosts() {
        let chain = MockServer::start().await;
        let mut full = sample(2, 0xaa);
        full.current_recasts = full.max_recasts;
        mock_boosts(&chain, &[(sample(1, 0xcc), 0xcc), (full, 0xaa)]).await;

        let pc = client(&chain, &chain);
        assert!(matches!(
            pc.recast(1, "https://warpcast.com/me/0xabc12345").await,
            Err(ClientError::OwnBoost)
        ));
        assert!(matches!(
            pc.recast(2, "https://warpcast.com/me/0xabc12345").await,
            Err(ClientError::MaxRecastsReached)
        ));
        assert!(matches!(
            pc.recast(9, "https://warpcast.com/me/0xabc12345").await,
            Err(ClientError::BoostNotFound(9))
        ));
    }

    #[tokio::test]
    async fn recast_stops_on_failed_verification() {
        let chain = MockServer::start().await;
        mock_boosts(&chain, &[(sample(1, 0xaa), 0xaa)]).await;
        let verify = MockServer::start().await;
        Mock::given(path("/api/verify-recast"))
            .and(body_partial_json(serde_json::json!({"originalCastHash": "0xdeadbeefcafef001"})))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "success": true,
                "verified": false,
                "error": "You submitted the original cast, not your recast"
            })))
            .mount(&verify)
            .await;

        let pc = client(&chain, &verify);
        match pc.recast(1, "0xdeadbeefcafef001").await {
            Err(ClientError::VerificationFailed(reason)) => assert!(reason.contains("original")),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            pc.recast(1, "0xabc").await,
            Err(ClientError::InvalidRecastUrl)
        ));
    }

    #[tokio::test]
    async fn recast_submits_after_verification() {
        let chain = MockServer::start().await;
        mock_boosts(&chain, &[(sample(1, 0xaa), 0xaa)]).await;
        rpc(&chain, serde_json::json!({"method": "eth_estimateGas"}), serde_json::json!("0x5208")).await;
        rpc(&chain, serde_json::json!({"method": "eth_sendTransaction"}), serde_json::json!("0xtx")).await;
        rpc(
            &chain,
            serde_json::json!({"method": "eth_getTransactionReceipt"}),
            serde_json::json!({"transactionHash": "0xtx", "blockNumber": "0x2", "status": "0x1"}),
        )
        .await;
        let me = crate::chain::abi::parse_hex_address(ME).unwrap();
        rpc(
            &chain,
            serde_json::json!({"method": "eth_call", "params": [{"data": encode_call("userEarnings(address)", &[Token::Address(me)])}]}),
            serde_json::json!(format!("0x{:064x}", 1_000_000_000_000_000u128)),
        )
        .await;

        let verify = MockServer::start().await;
        Mock::given(path("/api/verify-recast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "verified": true,
                "recastHash": "0xabc"
            })))
            .mount(&verify)
            .await;

        let pc = client(&chain, &verify);
        let outcome = pc
            .recast(1, "https://warpcast.com/me/0xabc12345")
            .await
            .unwrap();
        assert_eq!(outcome.receipt.transaction_hash, "0xtx");
        assert_eq!(outcome.earned, 1_000_000_000_000_000);
        assert_eq!(outcome.earnings, 1_000_000_000_000_000);
        assert!(!pc.is_busy());
    }

    #[tokio::test]
    async fn busy_flag_blocks_reentry() {
        let chain = MockServer::start().await;
        let pc = client(&chain, &chain);
        let guard = pc.begin().unwrap();
        assert!(pc.is_busy());
        assert!(matches!(pc.claim_rewards().await, Err(ClientError::Busy)));
        drop(guard);
        assert!(!pc.is_busy());
    }

    #[test]
    fn tx_errors_are_classified() {
        let reverted = anyhow::anyhow!("execution reverted: Already recasted");
        assert!(matches!(ClientError::from_tx(reverted), ClientError::AlreadyRecasted));

        let rejected = anyhow::Error::new(crate::chain::RpcError {
            code: 4001,
            message: "denied".into(),
        });
        assert!(matches!(ClientError::from_tx(rejected), ClientError::Cancelled));
    }
}
