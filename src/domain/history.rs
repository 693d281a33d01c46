//! Session transaction history.

use crate::domain::transaction::{TransactionRecord, TxHash, TxStatus};

/// Records submitted this session, newest first. Records are never removed;
/// only a pending record's status can change.
#[derive(Debug, Clone, Default)]
pub struct TransactionHistory {
    records: Vec<TransactionRecord>,
}

impl TransactionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a freshly submitted record. A hash already present is ignored.
    pub fn push(&mut self, record: TransactionRecord) -> bool {
        if self.get(&record.hash).is_some() {
            return false;
        }
        self.records.insert(0, record);
        true
    }

    pub fn get(&self, hash: &TxHash) -> Option<&TransactionRecord> {
        self.records.iter().find(|r| &r.hash == hash)
    }

    /// Move a pending record to a terminal status. Returns false when the
    /// record is unknown or already terminal, so status never regresses.
    pub fn apply_status(
        &mut self,
        hash: &TxHash,
        status: TxStatus,
        block_number: Option<u64>,
    ) -> bool {
        let Some(record) = self.records.iter_mut().find(|r| &r.hash == hash) else {
            return false;
        };
        if record.status.is_terminal() || !status.is_terminal() {
            return false;
        }
        record.status = status;
        record.block_number = block_number;
        true
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn pending_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.status == TxStatus::Pending)
            .count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
