//! Chain client interfaces and the Ethereum JSON-RPC implementation.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use color_eyre::eyre::{Result, eyre};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::config::Config;
use crate::domain::transaction::{Address, Receipt, ReceiptStatus, TransferRequest, TxHash};

/// Read and submit access to the chain.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Balance of `address` in wei.
    async fn get_balance(&self, address: &Address) -> Result<u128>;

    /// Submit a transfer signed by the provider; returns the assigned hash.
    async fn send_transaction(&self, request: &TransferRequest) -> Result<TxHash>;

    /// Receipt of a mined transaction, `None` while it is not mined.
    async fn get_transaction_receipt(&self, hash: &TxHash) -> Result<Option<Receipt>>;

    /// Current tip block number.
    async fn block_number(&self) -> Result<u64>;
}

/// Account access exposed by the wallet that signs for the user.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask the wallet for its accounts, prompting for access if it needs to.
    async fn request_accounts(&self) -> Result<Vec<Address>>;

    /// Accounts currently exposed, without prompting.
    async fn accounts(&self) -> Result<Vec<Address>>;

    async fn chain_id(&self) -> Result<u64>;
}

/// A provider seen through both of its roles.
#[derive(Clone)]
pub struct Backend {
    pub chain: Arc<dyn ChainClient>,
    pub wallet: Arc<dyn WalletProvider>,
}

impl Backend {
    pub fn new<T>(inner: Arc<T>) -> Self
    where
        T: ChainClient + WalletProvider + 'static,
    {
        Self {
            chain: inner.clone(),
            wallet: inner,
        }
    }
}

/// Error object returned by a JSON-RPC endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

impl JsonRpcError {
    pub const METHOD_NOT_FOUND: i64 = -32601;
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RPC error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcError {}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    status: Option<String>,
    block_number: Option<String>,
}

/// Ethereum JSON-RPC client over HTTP.
pub struct RpcClient {
    http: reqwest::Client,
    rpc_url: String,
    request_id: AtomicU64,
}

impl RpcClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(config.network.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            rpc_url: config.network.rpc_url.clone(),
            request_id: AtomicU64::new(1),
        })
    }

    /// Get the RPC URL.
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.request_id.fetch_add(1, Ordering::Relaxed),
        };

        let response = self
            .http
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| eyre!("{} request failed: {}", method, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(eyre!("{} returned HTTP {}: {}", method, status, body));
        }

        let body: JsonRpcResponse = response.json().await?;
        if let Some(error) = body.error {
            debug!("{} failed: {}", method, error);
            return Err(error.into());
        }

        // A null result is valid for lookups such as receipts.
        let result = body.result.unwrap_or(Value::Null);
        serde_json::from_value(result).map_err(|e| eyre!("Invalid {} response: {}", method, e))
    }
}

#[async_trait]
impl ChainClient for RpcClient {
    async fn get_balance(&self, address: &Address) -> Result<u128> {
        let quantity: String = self
            .call("eth_getBalance", json!([address.as_str(), "latest"]))
            .await?;
        parse_quantity(&quantity)
    }

    async fn send_transaction(&self, request: &TransferRequest) -> Result<TxHash> {
        let tx = json!({
            "from": request.from.as_str(),
            "to": request.to.as_str(),
            "value": to_quantity(request.value),
        });
        let hash: String = self.call("eth_sendTransaction", json!([tx])).await?;
        parse_tx_hash(&hash)
    }

    async fn get_transaction_receipt(&self, hash: &TxHash) -> Result<Option<Receipt>> {
        let raw: Option<RawReceipt> = self
            .call("eth_getTransactionReceipt", json!([hash.as_str()]))
            .await?;
        raw.map(decode_receipt).transpose().map(Option::flatten)
    }

    async fn block_number(&self) -> Result<u64> {
        let quantity: String = self.call("eth_blockNumber", json!([])).await?;
        parse_quantity_u64(&quantity)
    }
}

#[async_trait]
impl WalletProvider for RpcClient {
    async fn request_accounts(&self) -> Result<Vec<Address>> {
        match self.call::<Vec<String>>("eth_requestAccounts", json!([])).await {
            Ok(accounts) => parse_accounts(accounts),
            Err(e)
                if e.downcast_ref::<JsonRpcError>()
                    .is_some_and(|err| err.code == JsonRpcError::METHOD_NOT_FOUND) =>
            {
                // Plain nodes only expose their unlocked accounts.
                warn!("eth_requestAccounts unsupported, falling back to eth_accounts");
                self.accounts().await
            }
            Err(e) => Err(e),
        }
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        let accounts: Vec<String> = self.call("eth_accounts", json!([])).await?;
        parse_accounts(accounts)
    }

    async fn chain_id(&self) -> Result<u64> {
        let quantity: String = self.call("eth_chainId", json!([])).await?;
        parse_quantity_u64(&quantity)
    }
}

fn parse_accounts(accounts: Vec<String>) -> Result<Vec<Address>> {
    accounts.iter().map(|a| Address::parse(a)).collect()
}

/// Decode a receipt; one without a block number is not mined yet.
fn decode_receipt(raw: RawReceipt) -> Result<Option<Receipt>> {
    let Some(block_number) = raw.block_number else {
        return Ok(None);
    };
    let block_number = parse_quantity_u64(&block_number)?;
    let status = match raw.status.as_deref().map(parse_quantity).transpose()? {
        Some(1) => ReceiptStatus::Success,
        _ => ReceiptStatus::Failure,
    };
    Ok(Some(Receipt {
        status,
        block_number,
    }))
}

/// Parse a hex-encoded JSON-RPC quantity such as `0x1a`.
pub fn parse_quantity(s: &str) -> Result<u128> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| eyre!("Quantity must start with 0x: {}", s))?;
    if digits.is_empty() {
        return Err(eyre!("Empty quantity"));
    }
    u128::from_str_radix(digits, 16).map_err(|e| eyre!("Invalid quantity {}: {}", s, e))
}

pub fn parse_quantity_u64(s: &str) -> Result<u64> {
    let value = parse_quantity(s)?;
    u64::try_from(value).map_err(|_| eyre!("Quantity out of range: {}", s))
}

/// Check a provider-assigned hash is `0x` followed by 32 bytes of hex.
pub fn parse_tx_hash(hash: &str) -> Result<TxHash> {
    let body = hash
        .strip_prefix("0x")
        .ok_or_else(|| eyre!("Invalid transaction hash {:?}: missing 0x prefix", hash))?;
    if body.len() != 64 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(eyre!("Invalid transaction hash {:?}: expected 64 hex digits", hash));
    }
    Ok(TxHash::new(hash))
}

/// Encode a value as a JSON-RPC quantity (no leading zeros).
pub fn to_quantity(value: u128) -> String {
    format!("0x{:x}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_roundtrip_edges() {
        assert_eq!(to_quantity(0), "0x0");
        assert_eq!(to_quantity(255), "0xff");
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0xde0b6b3a7640000").unwrap(), 1_000_000_000_000_000_000);
    }

    #[test]
    fn test_parse_quantity_rejects_invalid() {
        assert!(parse_quantity("12").is_err());
        assert!(parse_quantity("0x").is_err());
        assert!(parse_quantity("0xzz").is_err());
        assert!(parse_quantity_u64("0x10000000000000000").is_err());
    }

    #[test]
    fn test_parse_tx_hash() {
        let hash = "0x5C504ED432CB51138BCF09AA5E8A410DD4A1E204EF84BFED1BE16DFBA1B22060";
        assert_eq!(parse_tx_hash(hash).unwrap().as_str(), hash.to_ascii_lowercase());
        assert!(parse_tx_hash("5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060").is_err());
        assert!(parse_tx_hash("0xabc").is_err());
        assert!(parse_tx_hash(&format!("0x{}", "é".repeat(32))).is_err());
    }

    #[test]
    fn test_decode_receipt() {
        let raw: RawReceipt =
            serde_json::from_value(json!({"status": "0x1", "blockNumber": "0x64"})).unwrap();
        assert_eq!(decode_receipt(raw).unwrap(), Some(Receipt::success(100)));

        let raw: RawReceipt =
            serde_json::from_value(json!({"status": "0x0", "blockNumber": "0x65"})).unwrap();
        assert_eq!(decode_receipt(raw).unwrap(), Some(Receipt::failure(101)));
    }

    #[test]
    fn test_decode_receipt_without_block_is_unmined() {
        let raw: RawReceipt =
            serde_json::from_value(json!({"status": "0x1", "blockNumber": null})).unwrap();
        assert_eq!(decode_receipt(raw).unwrap(), None);
    }

    #[test]
    fn test_rpc_error_response() {
        let body: JsonRpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32601, "message": "the method eth_requestAccounts does not exist"}
        }))
        .unwrap();
        let error = body.error.unwrap();
        assert_eq!(error.code, JsonRpcError::METHOD_NOT_FOUND);
        assert!(error.to_string().starts_with("RPC error -32601"));
    }
}
