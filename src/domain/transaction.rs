use std::fmt;
use std::str::FromStr;

use color_eyre::eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use strum::Display;

/// A 20-byte account address, stored as lowercase `0x`-prefixed hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let body = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| eyre!("Address must start with 0x"))?;
        if body.len() != 40 {
            return Err(eyre!(
                "Invalid address length: {} (expected 40 hex chars)",
                body.len()
            ));
        }
        hex::decode(body).map_err(|_| eyre!("Invalid address format (not valid hex)"))?;
        Ok(Self(format!("0x{}", body.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened form for display, e.g. `0x1234...abcd`.
    pub fn short(&self) -> String {
        // `parse` only admits 42 ASCII characters.
        format!("{}...{}", &self.0[..6], &self.0[self.0.len() - 4..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = color_eyre::eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = color_eyre::eyre::Report;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

/// Transaction hash as assigned by the chain at submission time.
///
/// Kept as the provider returned it (lowercased), so short test hashes such
/// as `0xabc` are valid identifiers too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First ten characters followed by an ellipsis, as shown in notifications.
    pub fn short(&self) -> String {
        if self.0.chars().count() <= 10 {
            self.0.clone()
        } else {
            format!("{}...", self.0.chars().take(10).collect::<String>())
        }
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TxHash {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

impl TxStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptStatus {
    Success,
    Failure,
}

/// Mined transaction receipt, as far as the tracker cares about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub status: ReceiptStatus,
    pub block_number: u64,
}

impl Receipt {
    pub fn success(block_number: u64) -> Self {
        Self {
            status: ReceiptStatus::Success,
            block_number,
        }
    }

    pub fn failure(block_number: u64) -> Self {
        Self {
            status: ReceiptStatus::Failure,
            block_number,
        }
    }

    /// Number of blocks built on top of the receipt's block, as seen from
    /// `reference_block`. A receipt ahead of the reference has zero depth.
    pub fn confirmations_at(&self, reference_block: u64) -> u64 {
        reference_block.saturating_sub(self.block_number)
    }

    /// Terminal status this receipt resolves a pending transaction to.
    pub fn terminal_status(&self) -> TxStatus {
        match self.status {
            ReceiptStatus::Success => TxStatus::Confirmed,
            ReceiptStatus::Failure => TxStatus::Failed,
        }
    }
}

/// A value transfer to submit through the wallet provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from: Address,
    pub to: Address,
    /// Amount in wei.
    pub value: u128,
}

/// A transaction submitted during this session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub hash: TxHash,
    pub status: TxStatus,
    /// Amount in wei.
    pub amount: u128,
    pub recipient: Address,
    /// Unix timestamp of submission.
    pub submitted_at: i64,
    /// Block the transaction was mined in, once resolved.
    pub block_number: Option<u64>,
}

impl TransactionRecord {
    /// Record for a transaction the network just accepted.
    pub fn pending(hash: TxHash, amount: u128, recipient: Address) -> Self {
        let submitted_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        Self {
            hash,
            status: TxStatus::Pending,
            amount,
            recipient,
            submitted_at,
            block_number: None,
        }
    }
}
