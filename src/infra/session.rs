use std::sync::Arc;

use color_eyre::eyre::{Result, eyre};
use tracing::info;

use crate::domain::transaction::{Address, TransferRequest, TxHash};
use crate::infra::rpc::{Backend, ChainClient};

/// A connected wallet session.
///
/// Everything that used to be ambient connection state (provider, signer
/// account, connected flag) lives here, so several sessions can exist side by
/// side.
#[derive(Clone)]
pub struct Session {
    pub address: Address,
    pub chain_id: u64,
    chain: Arc<dyn ChainClient>,
}

impl Session {
    /// Request accounts from the wallet and bind the session to the first one.
    pub async fn connect(backend: &Backend) -> Result<Self> {
        let accounts = backend.wallet.request_accounts().await?;
        let address = accounts
            .into_iter()
            .next()
            .ok_or_else(|| eyre!("Wallet exposes no accounts"))?;
        let chain_id = backend.wallet.chain_id().await?;
        info!("Connected {} on chain {}", address, chain_id);
        Ok(Self::new(backend, address, chain_id))
    }

    /// Bind a session to an account the wallet already exposed.
    pub fn new(backend: &Backend, address: Address, chain_id: u64) -> Self {
        Self {
            address,
            chain_id,
            chain: backend.chain.clone(),
        }
    }

    pub fn chain(&self) -> Arc<dyn ChainClient> {
        self.chain.clone()
    }

    pub async fn balance(&self) -> Result<u128> {
        self.chain.get_balance(&self.address).await
    }

    /// Send `value` wei from the session account to `to`.
    pub async fn transfer(&self, to: Address, value: u128) -> Result<TxHash> {
        let request = TransferRequest {
            from: self.address.clone(),
            to,
            value,
        };
        self.chain.send_transaction(&request).await
    }
}
