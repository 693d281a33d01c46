//! Confirmation scenarios driven directly through the tracker's passes.

use std::time::Duration;

use ethdash::domain::notification::Severity;
use ethdash::domain::transaction::{Receipt, TxHash, TxStatus};
use ethdash::infra::tracker::TrackerUpdate;

use super::{TestEnv, refreshes};

#[tokio::test]
async fn test_late_receipt_confirmed_by_poll() {
    let mut env = TestEnv::new();
    let hash = TxHash::from("0xabc");
    env.tracker.register(hash.clone());
    env.chain.set_tip(99);

    for _ in 0..3 {
        let report = env.tracker.poll_reconcile().await;
        assert_eq!(report.still_pending, 1);
        assert!(env.tracker.pending().contains(&hash));
    }
    assert!(env.drain_updates().is_empty());

    env.chain.set_receipt(&hash, Receipt::success(100));
    env.chain.set_tip(101);
    let report = env.tracker.poll_reconcile().await;
    assert_eq!(report.resolved, vec![(hash.clone(), TxStatus::Confirmed)]);
    assert!(!env.tracker.pending().contains(&hash));

    let updates = env.drain_updates();
    assert_eq!(
        updates[0],
        TrackerUpdate::StatusChanged {
            hash,
            status: TxStatus::Confirmed,
            block_number: 100,
        }
    );
    assert_eq!(refreshes(&updates), 1);
    assert_eq!(env.chain.receipt_queries(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_late_receipt_confirmed_by_poll_loop() {
    let mut env = TestEnv::new();
    let hash = TxHash::from("0xabc");
    env.tracker.register(hash.clone());
    let block_rx = env.blocks.subscribe();
    let handle = env.tracker.start(Duration::from_secs(10), block_rx);

    // Ticks at 10s, 20s and 30s see no receipt.
    tokio::time::sleep(Duration::from_secs(35)).await;
    assert_eq!(env.chain.receipt_queries(), 3);
    assert!(env.tracker.pending().contains(&hash));

    env.chain.set_receipt(&hash, Receipt::success(100));
    env.chain.set_tip(101);
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert!(env.tracker.pending().is_empty());
    let updates = env.drain_updates();
    assert_eq!(refreshes(&updates), 1);
    assert!(
        !updates
            .iter()
            .any(|u| matches!(u, TrackerUpdate::Notify { .. })),
        "poll confirmations are silent"
    );
    handle.stop();
}

#[tokio::test]
async fn test_failed_receipt_needs_one_confirmation() {
    let mut env = TestEnv::new();
    let hash = TxHash::from("0xdef");
    env.tracker.register(hash.clone());
    env.chain.set_receipt(&hash, Receipt::failure(101));

    let report = env.tracker.on_block(101).await;
    assert_eq!(report.still_pending, 1);
    assert!(env.drain_updates().is_empty());

    let report = env.tracker.on_block(102).await;
    assert_eq!(report.resolved, vec![(hash.clone(), TxStatus::Failed)]);
    assert_eq!(
        env.drain_updates(),
        vec![TrackerUpdate::StatusChanged {
            hash,
            status: TxStatus::Failed,
            block_number: 101,
        }]
    );
}

#[tokio::test]
async fn test_block_confirmation_notifies() {
    let mut env = TestEnv::new();
    let hash = TxHash::from("0x123");
    env.tracker.register(hash.clone());
    env.chain.set_receipt(&hash, Receipt::success(7));

    env.tracker.on_block(8).await;
    let updates = env.drain_updates();
    assert!(updates.contains(&TrackerUpdate::Notify {
        message: "Transaction confirmed! Balance updated.".to_string(),
        severity: Severity::Success,
    }));
    assert_eq!(refreshes(&updates), 1);
}

#[tokio::test]
async fn test_query_error_does_not_block_other_hashes() {
    let mut env = TestEnv::new();
    let flaky = TxHash::from("0xaaa");
    let healthy = TxHash::from("0xbbb");
    env.tracker.register(flaky.clone());
    env.tracker.register(healthy.clone());
    env.chain.set_receipt(&flaky, Receipt::success(5));
    env.chain.set_receipt(&healthy, Receipt::success(5));
    env.chain.fail_receipt_queries(&flaky, 1);
    env.chain.set_tip(6);

    let report = env.tracker.poll_reconcile().await;
    assert_eq!(report.failed_queries, 1);
    assert_eq!(report.resolved, vec![(healthy, TxStatus::Confirmed)]);
    assert!(env.tracker.pending().contains(&flaky));

    let report = env.tracker.poll_reconcile().await;
    assert_eq!(report.resolved, vec![(flaky, TxStatus::Confirmed)]);
    env.drain_updates();
}

#[tokio::test]
async fn test_concurrent_passes_emit_once() {
    let mut env = TestEnv::new();
    let hash = TxHash::from("0xccc");
    env.tracker.register(hash.clone());
    env.chain.set_receipt(&hash, Receipt::success(10));
    env.chain.set_tip(11);

    let (poll, block) = tokio::join!(env.tracker.poll_reconcile(), env.tracker.on_block(11));
    assert_eq!(poll.resolved.len() + block.resolved.len(), 1);

    let updates = env.drain_updates();
    let transitions = updates
        .iter()
        .filter(|u| matches!(u, TrackerUpdate::StatusChanged { .. }))
        .count();
    assert_eq!(transitions, 1);
    assert_eq!(refreshes(&updates), 1);

    // Resolved hashes stay resolved.
    env.chain.set_receipt(&hash, Receipt::failure(10));
    env.tracker.on_block(12).await;
    assert!(!env.tracker.register(hash));
    assert!(env.drain_updates().is_empty());
}
