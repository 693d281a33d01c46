//! Background watcher for new blocks and wallet changes.
//!
//! Polls the provider on a fixed interval. New block numbers are broadcast to
//! the confirmation tracker and reported to the app; account and chain
//! changes are reported to the app, which decides how to reconnect.

use std::time::Duration;

use color_eyre::eyre::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::domain::transaction::Address;
use crate::infra::rpc::Backend;

/// Most block events emitted for a single poll; older ones are skipped.
pub const MAX_BLOCK_BACKFILL: u64 = 32;

/// Updates sent from the watcher to the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatchEvent {
    NewBlock(u64),
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
    /// The provider stopped answering, or answered again.
    ProviderReachable(bool),
}

#[derive(Debug, Default)]
struct Observed {
    tip: Option<u64>,
    accounts: Option<Vec<Address>>,
    chain_id: Option<u64>,
    reachable: Option<bool>,
}

pub struct ChainWatcher {
    backend: Backend,
    interval: Duration,
    blocks: broadcast::Sender<u64>,
    events: UnboundedSender<WatchEvent>,
    observed: Observed,
}

impl ChainWatcher {
    pub fn new(
        backend: Backend,
        interval: Duration,
        blocks: broadcast::Sender<u64>,
        events: UnboundedSender<WatchEvent>,
    ) -> Self {
        Self {
            backend,
            interval,
            blocks,
            events,
            observed: Observed::default(),
        }
    }

    /// Run the watcher until the app's event receiver is dropped.
    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Chain watcher polling every {:?}", self.interval);
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if self.events.is_closed() {
                    break;
                }
                self.poll_once().await;
            }
        })
    }

    /// Poll the provider once and publish whatever changed.
    pub async fn poll_once(&mut self) {
        match self.poll_tip().await {
            Ok(()) => self.set_reachable(true),
            Err(e) => {
                warn!("Failed to read block number: {:#}", e);
                self.set_reachable(false);
                return;
            }
        }
        if let Err(e) = self.poll_wallet().await {
            warn!("Failed to read wallet state: {:#}", e);
        }
    }

    async fn poll_tip(&mut self) -> Result<()> {
        let tip = self.backend.chain.block_number().await?;
        let Some(last) = self.observed.tip else {
            // First observation is the baseline, not a new block.
            self.observed.tip = Some(tip);
            self.send(WatchEvent::NewBlock(tip));
            return Ok(());
        };
        if tip <= last {
            return Ok(());
        }

        let first = (last + 1).max(tip.saturating_sub(MAX_BLOCK_BACKFILL - 1));
        if first > last + 1 {
            debug!("Skipping block events {}..{}", last + 1, first);
        }
        for block_number in first..=tip {
            // No receivers just means the tracker is not running.
            let _ = self.blocks.send(block_number);
        }
        self.observed.tip = Some(tip);
        self.send(WatchEvent::NewBlock(tip));
        Ok(())
    }

    async fn poll_wallet(&mut self) -> Result<()> {
        let accounts = self.backend.wallet.accounts().await?;
        if self.observed.accounts.as_ref() != Some(&accounts) {
            if self.observed.accounts.is_some() {
                info!("Wallet accounts changed ({} exposed)", accounts.len());
                self.send(WatchEvent::AccountsChanged(accounts.clone()));
            }
            self.observed.accounts = Some(accounts);
        }

        let chain_id = self.backend.wallet.chain_id().await?;
        if self.observed.chain_id != Some(chain_id) {
            if self.observed.chain_id.is_some() {
                info!("Wallet switched to chain {}", chain_id);
                self.observed.tip = None;
                self.send(WatchEvent::ChainChanged(chain_id));
            }
            self.observed.chain_id = Some(chain_id);
        }
        Ok(())
    }

    fn set_reachable(&mut self, reachable: bool) {
        if self.observed.reachable != Some(reachable) {
            self.observed.reachable = Some(reachable);
            self.send(WatchEvent::ProviderReachable(reachable));
        }
    }

    fn send(&self, event: WatchEvent) {
        if self.events.send(event).is_err() {
            debug!("Watch event dropped, app is gone");
        }
    }
}
