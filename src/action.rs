use serde::{Deserialize, Serialize};
use strum::Display;

use crate::domain::notification::Severity;
use crate::domain::transaction::{Address, TxHash};

/// Actions that can be triggered by user input or internal events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    Tick,
    Render,
    Resize(u16, u16),
    Suspend,
    Resume,
    Quit,
    Error(String),
    Help,

    // Tab switching
    TabDashboard,
    TabSend,
    TabHistory,
    NextTab,

    // Wallet connection
    Connect,
    Connected {
        address: Address,
        chain_id: u64,
        attempt: u64,
    },
    ConnectFailed {
        reason: String,
        attempt: u64,
    },
    Disconnect,

    // Balance
    RefreshBalance,
    BalanceLoaded(u128),
    BalanceFailed(String),

    // Transfers
    SendTransaction,
    TransactionSubmitted {
        hash: TxHash,
        amount: u128,
        recipient: Address,
    },
    TransactionRejected(String),

    Notify { message: String, severity: Severity },
}
