//! Wallet connection and transaction submission through an EIP-1193 style
//! JSON-RPC provider (browser-extension bridge, Frame, an unlocked dev node).

use std::time::Duration;

use anyhow::{bail, Context, Result};

use super::rpc::{
    Receipt, RpcClient, RpcError, TransactionRequest, CODE_UNRECOGNIZED_CHAIN, CODE_USER_REJECTED,
};

/// Base mainnet.
pub const BASE_CHAIN_ID: u64 = 8453;

const RECEIPT_POLL: Duration = Duration::from_secs(2);
const RECEIPT_TIMEOUT: Duration = Duration::from_secs(180);

/// Why a wallet could not be connected.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("connection rejected")]
    Rejected,

    #[error("no accounts found")]
    NoAccounts,

    #[error("could not switch to chain {0}; add Base Mainnet manually")]
    ChainUnavailable(u64),

    #[error(transparent)]
    Rpc(#[from] anyhow::Error),
}

fn base_chain_params() -> serde_json::Value {
    serde_json::json!({
        "chainId": format!("0x{:x}", BASE_CHAIN_ID),
        "chainName": "Base Mainnet",
        "nativeCurrency": {"name": "Ethereum", "symbol": "ETH", "decimals": 18},
        "rpcUrls": ["https://mainnet.base.org"],
        "blockExplorerUrls": ["https://basescan.org"]
    })
}

/// A connected account plus the provider that signs for it.
#[derive(Clone)]
pub struct Wallet {
    rpc: RpcClient,
    account: String,
}

impl Wallet {
    /// Connect to the provider, pick its first account, and make sure it is on
    /// Base mainnet, asking it to switch (or add the chain) if not.
    pub async fn connect(rpc: RpcClient) -> Result<Self, ConnectError> {
        let accounts = match rpc.request_accounts().await {
            Ok(accounts) => accounts,
            Err(e) if is_user_rejection(&e) => return Err(ConnectError::Rejected),
            Err(e) => return Err(e.into()),
        };
        let account = accounts.into_iter().next().ok_or(ConnectError::NoAccounts)?;

        let chain_id = rpc.chain_id().await?;
        if chain_id != BASE_CHAIN_ID {
            tracing::info!(chain_id, target = BASE_CHAIN_ID, "switching wallet chain");
            if let Err(e) = rpc.switch_chain(BASE_CHAIN_ID).await {
                match RpcError::find(&e).map(|r| r.code) {
                    Some(CODE_UNRECOGNIZED_CHAIN) => {
                        rpc.add_chain(base_chain_params()).await.map_err(|e| {
                            tracing::warn!(error = %e, "wallet refused to add Base");
                            ConnectError::ChainUnavailable(BASE_CHAIN_ID)
                        })?;
                    }
                    // Other switch failures are not fatal; the wallet may still
                    // sign on the right chain.
                    _ => tracing::warn!(error = %e, "chain switch failed"),
                }
            }
        }

        tracing::info!(account = %account, "wallet connected");
        Ok(Self { rpc, account })
    }

    /// Wrap an account without the connection handshake.
    pub fn from_account(rpc: RpcClient, account: impl Into<String>) -> Self {
        Self {
            rpc,
            account: account.into(),
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    pub async fn balance(&self) -> Result<u128> {
        self.rpc.balance(&self.account).await
    }

    /// Estimate, submit, and wait for a transaction to be mined.
    ///
    /// Reverts are reported as errors; the revert reason from gas estimation is
    /// kept in the error chain so callers can match on it.
    pub async fn transact(&self, to: &str, data: String, value: u128) -> Result<Receipt> {
        let tx = TransactionRequest {
            from: self.account.clone(),
            to: to.to_string(),
            data,
            value: (value > 0).then(|| format!("0x{:x}", value)),
        };

        self.rpc
            .estimate_gas(&tx)
            .await
            .context("transaction would revert")?;
        let tx_hash = self.rpc.send_transaction(&tx).await?;
        tracing::info!(tx_hash = %tx_hash, "transaction submitted");

        let receipt = self
            .rpc
            .wait_for_receipt(&tx_hash, RECEIPT_POLL, RECEIPT_TIMEOUT)
            .await?;
        if !receipt.success {
            bail!("transaction {} reverted", tx_hash);
        }
        tracing::info!(tx_hash = %tx_hash, block = receipt.block_number, "transaction confirmed");
        Ok(receipt)
    }
}

/// Whether an error came from the user declining in their wallet.
pub fn is_user_rejection(err: &anyhow::Error) -> bool {
    if RpcError::find(err).is_some_and(|e| e.code == CODE_USER_REJECTED) {
        return true;
    }
    format!("{:#}", err).to_ascii_lowercase().contains("user rejected")
}
