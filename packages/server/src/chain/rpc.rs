//! Ethereum JSON-RPC client, shared by contract reads and wallet-signed writes.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::abi::parse_hex_u128;

/// User rejected the request in the wallet (EIP-1193).
pub const CODE_USER_REJECTED: i64 = 4001;

/// Wallet does not know the requested chain (EIP-3085).
pub const CODE_UNRECOGNIZED_CHAIN: i64 = 4902;

/// JSON-RPC request wrapper.
#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

/// JSON-RPC response wrapper.
#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

/// Error object returned by a node or wallet.
#[derive(Debug, Clone, Deserialize, thiserror::Error)]
#[error("RPC error ({code}): {message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    /// Find an `RpcError` anywhere in an anyhow chain.
    pub fn find(err: &anyhow::Error) -> Option<&RpcError> {
        err.chain().find_map(|e| e.downcast_ref::<RpcError>())
    }
}

/// Outgoing transaction, signed by whatever account the provider controls.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRequest {
    pub from: String,
    pub to: String,
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Mined transaction outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: String,
    pub block_number: u64,
    pub success: bool,
}

#[derive(Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Perform a raw JSON-RPC call.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let req = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        let resp: RpcResponse = self
            .http
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .with_context(|| format!("RPC request to {} failed", method))?
            .json()
            .await
            .with_context(|| format!("failed to parse RPC response for {}", method))?;

        if let Some(err) = resp.error {
            return Err(err.into());
        }

        // `null` is a legitimate result (e.g. a pending receipt) and
        // deserializes the same as an absent field.
        Ok(resp.result.unwrap_or(Value::Null))
    }

    async fn call_str(&self, method: &str, params: Value) -> Result<String> {
        let result = self.call(method, params).await?;
        result
            .as_str()
            .map(str::to_string)
            .with_context(|| format!("{}: expected string result", method))
    }

    /// Perform an `eth_call` (read-only contract call) against the latest block.
    pub async fn eth_call(&self, to: &str, data: &str) -> Result<String> {
        self.call_str(
            "eth_call",
            serde_json::json!([{"to": to, "data": data}, "latest"]),
        )
        .await
    }

    pub async fn chain_id(&self) -> Result<u64> {
        let hex_str = self.call_str("eth_chainId", serde_json::json!([])).await?;
        u64::try_from(parse_hex_u128(&hex_str).context("eth_chainId: invalid hex")?)
            .context("eth_chainId: out of range")
    }

    /// Balance of `address` in wei.
    pub async fn balance(&self, address: &str) -> Result<u128> {
        let hex_balance = self
            .call_str("eth_getBalance", serde_json::json!([address, "latest"]))
            .await?;
        parse_hex_u128(&hex_balance).context("invalid balance hex")
    }

    /// Ask the provider for accounts, prompting the user if needed.
    pub async fn request_accounts(&self) -> Result<Vec<String>> {
        let result = self
            .call("eth_requestAccounts", serde_json::json!([]))
            .await?;
        serde_json::from_value(result).context("eth_requestAccounts: expected string array")
    }

    pub async fn switch_chain(&self, chain_id: u64) -> Result<()> {
        self.call(
            "wallet_switchEthereumChain",
            serde_json::json!([{"chainId": format!("0x{:x}", chain_id)}]),
        )
        .await?;
        Ok(())
    }

    pub async fn add_chain(&self, params: Value) -> Result<()> {
        self.call("wallet_addEthereumChain", serde_json::json!([params]))
            .await?;
        Ok(())
    }

    /// Estimate gas; surfaces revert reasons before anything is signed.
    pub async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u128> {
        let hex_gas = self
            .call_str("eth_estimateGas", serde_json::json!([tx]))
            .await?;
        parse_hex_u128(&hex_gas).context("invalid gas estimate")
    }

    /// Submit a transaction for signing; returns its hash.
    pub async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String> {
        self.call_str("eth_sendTransaction", serde_json::json!([tx]))
            .await
    }

    pub async fn receipt(&self, tx_hash: &str) -> Result<Option<Receipt>> {
        let result = self
            .call("eth_getTransactionReceipt", serde_json::json!([tx_hash]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }

        let block_number = u64::try_from(parse_hex_u128(receipt_field(&result, "blockNumber")?)?)
            .context("receipt block number out of range")?;
        Ok(Some(Receipt {
            transaction_hash: receipt_field(&result, "transactionHash")?.to_string(),
            block_number,
            success: parse_hex_u128(receipt_field(&result, "status")?)? == 1,
        }))
    }

    /// Poll for a receipt until the transaction is mined or `timeout` elapses.
    pub async fn wait_for_receipt(
        &self,
        tx_hash: &str,
        poll: Duration,
        timeout: Duration,
    ) -> Result<Receipt> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(receipt) = self.receipt(tx_hash).await? {
                return Ok(receipt);
            }
            if tokio::time::Instant::now() >= deadline {
                bail!("transaction {} not mined after {:?}", tx_hash, timeout);
            }
            tokio::time::sleep(poll).await;
        }
    }
}

fn receipt_field<'a>(receipt: &'a Value, key: &str) -> Result<&'a str> {
    receipt
        .get(key)
        .and_then(|v| v.as_str())
        .with_context(|| format!("receipt missing {}", key))
}
