//! Submit transfers through a session and follow them to a final status.

use std::time::Duration;

use ethdash::config::TrackerConfig;
use ethdash::domain::amount::{WEI_PER_ETHER, parse_ether};
use ethdash::domain::history::TransactionHistory;
use ethdash::domain::transaction::{TransactionRecord, TxStatus};
use ethdash::infra::tracker::TrackerUpdate;

use super::TestEnv;

/// Apply status changes to `history` until `count` transitions were seen.
async fn apply_transitions(env: &mut TestEnv, history: &mut TransactionHistory, count: usize) {
    let mut seen = 0;
    while seen < count {
        let update = tokio::time::timeout(Duration::from_secs(5), env.updates.recv())
            .await
            .expect("timed out waiting for tracker update")
            .expect("tracker channel closed");
        if let TrackerUpdate::StatusChanged {
            hash,
            status,
            block_number,
        } = update
        {
            assert!(history.apply_status(&hash, status, Some(block_number)));
            seen += 1;
        }
    }
}

#[tokio::test]
async fn test_transfer_confirmed_through_block_loop() {
    let mut env = TestEnv::new();
    let session = env.session().await;
    let handle = env
        .tracker
        .start(Duration::from_secs(3600), env.blocks.subscribe());

    let amount = parse_ether("2.5").unwrap();
    let hash = session.transfer(env.recipient.clone(), amount).await.unwrap();
    let mut history = TransactionHistory::new();
    history.push(TransactionRecord::pending(
        hash.clone(),
        amount,
        env.recipient.clone(),
    ));
    assert!(env.tracker.register(hash.clone()));

    let mined_in = env.chain.mine_block();
    env.blocks.send(mined_in).unwrap();
    let tip = env.chain.mine_block();
    env.blocks.send(tip).unwrap();

    apply_transitions(&mut env, &mut history, 1).await;
    let record = history.get(&hash).unwrap();
    assert_eq!(record.status, TxStatus::Confirmed);
    assert_eq!(record.block_number, Some(mined_in));
    assert_eq!(history.pending_count(), 0);
    assert_eq!(session.balance().await.unwrap(), 10 * WEI_PER_ETHER - amount);

    handle.stop();
}

#[tokio::test]
async fn test_reverted_transfer_fails_without_refresh() {
    let mut env = TestEnv::new();
    let session = env.session().await;

    let hash = session
        .transfer(env.recipient.clone(), WEI_PER_ETHER)
        .await
        .unwrap();
    env.tracker.register(hash.clone());
    env.chain.mark_reverting(&hash);
    env.chain.mine_block();
    let tip = env.chain.mine_block();

    let report = env.tracker.on_block(tip).await;
    assert_eq!(report.resolved, vec![(hash, TxStatus::Failed)]);
    assert!(
        !env.drain_updates()
            .contains(&TrackerUpdate::RefreshBalance)
    );
    assert_eq!(session.balance().await.unwrap(), 10 * WEI_PER_ETHER);
}

#[tokio::test]
async fn test_deeper_confirmation_policy() {
    let mut env = TestEnv::with_config(&TrackerConfig {
        poll_interval_secs: 10,
        min_confirmations: 3,
    });
    let session = env.session().await;
    let hash = session
        .transfer(env.recipient.clone(), WEI_PER_ETHER)
        .await
        .unwrap();
    env.tracker.register(hash.clone());

    let mined_in = env.chain.mine_block();
    for block_number in mined_in..mined_in + 3 {
        assert!(env.tracker.on_block(block_number).await.resolved.is_empty());
    }
    let report = env.tracker.on_block(mined_in + 3).await;
    assert_eq!(report.resolved, vec![(hash, TxStatus::Confirmed)]);
    env.drain_updates();
}

#[tokio::test]
async fn test_several_transfers_resolve_independently() {
    let mut env = TestEnv::new();
    let session = env.session().await;
    let handle = env
        .tracker
        .start(Duration::from_secs(3600), env.blocks.subscribe());
    let mut history = TransactionHistory::new();

    let mut hashes = Vec::new();
    for _ in 0..3 {
        let hash = session
            .transfer(env.recipient.clone(), WEI_PER_ETHER)
            .await
            .unwrap();
        history.push(TransactionRecord::pending(
            hash.clone(),
            WEI_PER_ETHER,
            env.recipient.clone(),
        ));
        env.tracker.register(hash.clone());
        hashes.push(hash);
    }
    env.chain.mark_reverting(&hashes[1]);
    env.chain.mine_block();
    let tip = env.chain.mine_block();
    env.blocks.send(tip).unwrap();

    apply_transitions(&mut env, &mut history, 3).await;
    assert_eq!(history.get(&hashes[0]).unwrap().status, TxStatus::Confirmed);
    assert_eq!(history.get(&hashes[1]).unwrap().status, TxStatus::Failed);
    assert_eq!(history.get(&hashes[2]).unwrap().status, TxStatus::Confirmed);
    assert!(env.tracker.pending().is_empty());

    handle.stop();
}

#[tokio::test]
async fn test_rejected_submission_returns_error() {
    let env = TestEnv::new();
    let session = env.session().await;
    env.chain.reject_submissions(Some("user rejected transaction"));

    let err = session
        .transfer(env.recipient.clone(), WEI_PER_ETHER)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "user rejected transaction");
    assert!(env.tracker.pending().is_empty());
}
