//! Confirmation tracking for transactions submitted in this session.
//!
//! Two loops reconcile the [`PendingSet`] against the chain: a fixed-interval
//! poll and a handler for each announced block. The block loop gives low
//! latency, the poll loop resolves transactions even when block events are
//! missed. Both apply the same confirmation-depth gate, and a transaction is
//! published as resolved only by the loop that removes it from the set.

use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::Result;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::TrackerConfig;
use crate::domain::notification::Severity;
use crate::domain::pending::PendingSet;
use crate::domain::transaction::{Receipt, TxHash, TxStatus};
use crate::infra::rpc::ChainClient;

/// Events published to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerUpdate {
    StatusChanged {
        hash: TxHash,
        status: TxStatus,
        block_number: u64,
    },
    Notify {
        message: String,
        severity: Severity,
    },
    RefreshBalance,
}

/// Which loop is reconciling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileSource {
    Poll,
    Block,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Hashes this pass moved to a terminal status.
    pub resolved: Vec<(TxHash, TxStatus)>,
    /// Hashes without a sufficiently deep receipt yet.
    pub still_pending: usize,
    /// Receipt lookups that returned an error.
    pub failed_queries: usize,
    /// Hashes resolved by the other loop while this pass was running.
    pub skipped: usize,
}

enum Outcome {
    Pending,
    Resolved(TxStatus),
    AlreadyResolved,
}

pub struct ConfirmationTracker {
    chain: Arc<dyn ChainClient>,
    pending: PendingSet,
    updates: UnboundedSender<TrackerUpdate>,
    min_confirmations: u64,
}

impl ConfirmationTracker {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        pending: PendingSet,
        updates: UnboundedSender<TrackerUpdate>,
        config: &TrackerConfig,
    ) -> Self {
        Self {
            chain,
            pending,
            updates,
            // A receipt is never final in the block that mined it.
            min_confirmations: config.min_confirmations.max(1),
        }
    }

    pub fn pending(&self) -> &PendingSet {
        &self.pending
    }

    /// Start tracking `hash`. A hash already pending or already resolved is
    /// left alone.
    pub fn register(&self, hash: TxHash) -> bool {
        let added = self.pending.insert(hash.clone());
        if added {
            info!("Tracking transaction {}", hash);
        } else {
            debug!("Transaction {} is already tracked or resolved", hash);
        }
        added
    }

    /// One pass of the interval loop. The chain tip read at the start of the
    /// pass is the reference for confirmation depth.
    pub async fn poll_reconcile(&self) -> ReconcileReport {
        if self.pending.is_empty() {
            return ReconcileReport::default();
        }
        let tip = match self.chain.block_number().await {
            Ok(tip) => tip,
            Err(e) => {
                warn!("Skipping poll pass, failed to read chain tip: {:#}", e);
                return ReconcileReport::default();
            }
        };
        self.reconcile(tip, ReconcileSource::Poll).await
    }

    /// Reconcile against a newly announced block.
    pub async fn on_block(&self, block_number: u64) -> ReconcileReport {
        if self.pending.is_empty() {
            return ReconcileReport::default();
        }
        self.reconcile(block_number, ReconcileSource::Block).await
    }

    async fn reconcile(&self, reference_block: u64, source: ReconcileSource) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for hash in self.pending.snapshot() {
            if !self.pending.contains(&hash) {
                report.skipped += 1;
                continue;
            }
            match self.check(&hash, reference_block, source).await {
                Ok(Outcome::Resolved(status)) => report.resolved.push((hash, status)),
                Ok(Outcome::Pending) => report.still_pending += 1,
                Ok(Outcome::AlreadyResolved) => report.skipped += 1,
                Err(e) => {
                    error!("Error checking transaction {} ({:?}): {:#}", hash, source, e);
                    report.failed_queries += 1;
                }
            }
        }

        debug!(
            "{:?} pass at block {}: {} resolved, {} pending, {} errors",
            source,
            reference_block,
            report.resolved.len(),
            report.still_pending,
            report.failed_queries
        );
        report
    }

    async fn check(
        &self,
        hash: &TxHash,
        reference_block: u64,
        source: ReconcileSource,
    ) -> Result<Outcome> {
        let Some(receipt) = self.chain.get_transaction_receipt(hash).await? else {
            return Ok(Outcome::Pending);
        };
        let depth = receipt.confirmations_at(reference_block);
        if depth < self.min_confirmations {
            debug!(
                "{} mined in block {} with {} of {} confirmations",
                hash, receipt.block_number, depth, self.min_confirmations
            );
            return Ok(Outcome::Pending);
        }
        Ok(self.resolve(hash, &receipt, source))
    }

    /// Publish the terminal transition if this caller wins the removal.
    fn resolve(&self, hash: &TxHash, receipt: &Receipt, source: ReconcileSource) -> Outcome {
        if !self.pending.resolve(hash) {
            debug!("{} already resolved by the other loop", hash);
            return Outcome::AlreadyResolved;
        }

        let status = receipt.terminal_status();
        info!(
            "Transaction {} {} in block {} ({:?})",
            hash, status, receipt.block_number, source
        );
        self.emit(TrackerUpdate::StatusChanged {
            hash: hash.clone(),
            status,
            block_number: receipt.block_number,
        });

        if status == TxStatus::Confirmed {
            if source == ReconcileSource::Block {
                self.emit(TrackerUpdate::Notify {
                    message: "Transaction confirmed! Balance updated.".to_string(),
                    severity: Severity::Success,
                });
            }
            self.emit(TrackerUpdate::RefreshBalance);
        }
        Outcome::Resolved(status)
    }

    fn emit(&self, update: TrackerUpdate) {
        if self.updates.send(update).is_err() {
            debug!("Tracker update dropped, receiver is gone");
        }
    }

    /// Spawn the poll and block loops.
    pub fn start(
        self: &Arc<Self>,
        poll_interval: Duration,
        blocks: broadcast::Receiver<u64>,
    ) -> TrackerHandle {
        info!(
            "Starting confirmation tracker (poll every {:?}, {} confirmation(s))",
            poll_interval, self.min_confirmations
        );
        TrackerHandle {
            poll_task: tokio::spawn(Self::poll_loop(self.clone(), poll_interval)),
            block_task: tokio::spawn(Self::block_loop(self.clone(), blocks)),
        }
    }

    async fn poll_loop(tracker: Arc<Self>, period: Duration) {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if tracker.pending.is_empty() {
                continue;
            }
            tracker.poll_reconcile().await;
        }
    }

    async fn block_loop(tracker: Arc<Self>, mut blocks: broadcast::Receiver<u64>) {
        loop {
            match blocks.recv().await {
                Ok(block_number) => {
                    tracker.on_block(block_number).await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Block loop lagged, {} block events dropped", skipped);
                }
                Err(RecvError::Closed) => {
                    info!("Block feed closed, block loop exiting");
                    break;
                }
            }
        }
    }
}

/// Running reconciliation loops. Dropping the handle stops them.
pub struct TrackerHandle {
    poll_task: JoinHandle<()>,
    block_task: JoinHandle<()>,
}

impl TrackerHandle {
    pub fn stop(&self) {
        self.poll_task.abort();
        self.block_task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.poll_task.is_finished() || !self.block_task.is_finished()
    }
}

impl Drop for TrackerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
