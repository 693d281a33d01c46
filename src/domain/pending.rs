//! Set of transaction hashes awaiting a terminal receipt.
//!
//! The set is shared between the poll and block reconciliation loops. Removal
//! through [`PendingSet::resolve`] is the only way a hash leaves the set, and
//! the caller that wins the removal is the one allowed to publish the status
//! change. Resolved hashes are remembered so they can never be re-registered.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::transaction::TxHash;

#[derive(Debug, Default)]
struct Inner {
    pending: HashSet<TxHash>,
    resolved: HashSet<TxHash>,
}

#[derive(Debug, Clone, Default)]
pub struct PendingSet {
    inner: Arc<Mutex<Inner>>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start tracking `hash`. Returns false if it is already pending or has
    /// already been resolved.
    pub fn insert(&self, hash: TxHash) -> bool {
        let mut inner = self.lock();
        if inner.resolved.contains(&hash) {
            return false;
        }
        inner.pending.insert(hash)
    }

    pub fn contains(&self, hash: &TxHash) -> bool {
        self.lock().pending.contains(hash)
    }

    pub fn is_resolved(&self, hash: &TxHash) -> bool {
        self.lock().resolved.contains(hash)
    }

    /// Remove `hash` from the pending set. Only the first caller for a given
    /// hash gets `true`.
    pub fn resolve(&self, hash: &TxHash) -> bool {
        let mut inner = self.lock();
        if inner.pending.remove(hash) {
            inner.resolved.insert(hash.clone());
            true
        } else {
            false
        }
    }

    /// Hashes pending right now, in a stable order.
    pub fn snapshot(&self) -> Vec<TxHash> {
        let mut hashes: Vec<_> = self.lock().pending.iter().cloned().collect();
        hashes.sort();
        hashes
    }

    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }

    /// Forget everything, including resolved hashes. Used when the session is
    /// reset after a chain switch.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.pending.clear();
        inner.resolved.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_idempotent() {
        let set = PendingSet::new();
        assert!(set.insert(TxHash::from("0xabc")));
        assert!(!set.insert(TxHash::from("0xabc")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_resolve_only_once() {
        let set = PendingSet::new();
        let hash = TxHash::from("0xabc");
        set.insert(hash.clone());

        assert!(set.resolve(&hash));
        assert!(!set.resolve(&hash));
        assert!(!set.contains(&hash));
        assert!(set.is_resolved(&hash));
        assert!(set.is_empty());
    }

    #[test]
    fn test_resolved_hash_is_never_readded() {
        let set = PendingSet::new();
        let hash = TxHash::from("0xabc");
        set.insert(hash.clone());
        set.resolve(&hash);

        assert!(!set.insert(hash.clone()));
        assert!(!set.contains(&hash));
    }

    #[test]
    fn test_resolve_unknown_hash() {
        let set = PendingSet::new();
        assert!(!set.resolve(&TxHash::from("0xdead")));
        assert!(!set.is_resolved(&TxHash::from("0xdead")));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let set = PendingSet::new();
        set.insert(TxHash::from("0x2"));
        set.insert(TxHash::from("0x1"));

        let snapshot = set.snapshot();
        set.resolve(&TxHash::from("0x1"));

        assert_eq!(snapshot, vec![TxHash::from("0x1"), TxHash::from("0x2")]);
        assert_eq!(set.snapshot(), vec![TxHash::from("0x2")]);
    }

    #[test]
    fn test_clones_share_state() {
        let set = PendingSet::new();
        let other = set.clone();
        set.insert(TxHash::from("0xabc"));
        assert!(other.contains(&TxHash::from("0xabc")));

        other.clear();
        assert!(set.is_empty());
        assert!(set.insert(TxHash::from("0xabc")));
    }
}
