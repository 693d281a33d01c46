//! Integration tests for ethdash.
//!
//! Every test builds its own [`TestEnv`]: a simulated chain with a funded
//! sender account, and a confirmation tracker wired to it. Nothing is shared
//! between tests.

mod e2e_confirmation;
mod e2e_transfer_flow;
mod e2e_watcher;

use std::sync::Arc;

use ethdash::config::TrackerConfig;
use ethdash::domain::amount::WEI_PER_ETHER;
use ethdash::domain::pending::PendingSet;
use ethdash::domain::transaction::Address;
use ethdash::infra::rpc::Backend;
use ethdash::infra::session::Session;
use ethdash::infra::simulated::SimulatedChain;
use ethdash::infra::tracker::{ConfirmationTracker, TrackerUpdate};
use tokio::sync::broadcast;
use tokio::sync::mpsc::{self, UnboundedReceiver};

pub const SENDER: &str = "0x00000000000000000000000000000000000000a1";
pub const RECIPIENT: &str = "0x00000000000000000000000000000000000000b2";

/// Test environment around a [`SimulatedChain`].
pub struct TestEnv {
    pub chain: SimulatedChain,
    pub backend: Backend,
    pub sender: Address,
    pub recipient: Address,
    pub tracker: Arc<ConfirmationTracker>,
    pub updates: UnboundedReceiver<TrackerUpdate>,
    pub blocks: broadcast::Sender<u64>,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_config(&TrackerConfig::default())
    }

    pub fn with_config(config: &TrackerConfig) -> Self {
        let chain = SimulatedChain::default();
        let sender = Address::parse(SENDER).expect("valid sender");
        let recipient = Address::parse(RECIPIENT).expect("valid recipient");
        chain.add_account(sender.clone(), 10 * WEI_PER_ETHER);

        let backend = Backend::new(Arc::new(chain.clone()));
        let (tx, updates) = mpsc::unbounded_channel();
        let tracker = Arc::new(ConfirmationTracker::new(
            backend.chain.clone(),
            PendingSet::new(),
            tx,
            config,
        ));
        let (blocks, _) = broadcast::channel(64);

        Self {
            chain,
            backend,
            sender,
            recipient,
            tracker,
            updates,
            blocks,
        }
    }

    pub async fn session(&self) -> Session {
        Session::connect(&self.backend)
            .await
            .expect("sender account is exposed")
    }

    /// Take every update published so far.
    pub fn drain_updates(&mut self) -> Vec<TrackerUpdate> {
        let mut out = Vec::new();
        while let Ok(update) = self.updates.try_recv() {
            out.push(update);
        }
        out
    }
}

pub fn refreshes(updates: &[TrackerUpdate]) -> usize {
    updates
        .iter()
        .filter(|u| **u == TrackerUpdate::RefreshBalance)
        .count()
}
