//! The chain watcher feeding the tracker's block loop.

use std::time::Duration;

use ethdash::domain::transaction::{Receipt, TxHash};
use ethdash::infra::watcher::{ChainWatcher, WatchEvent};
use tokio::sync::mpsc;

use super::TestEnv;

#[tokio::test]
async fn test_watched_blocks_resolve_pending_hashes() {
    let mut env = TestEnv::new();
    let (event_tx, mut events) = mpsc::unbounded_channel();
    let mut watcher = ChainWatcher::new(
        env.backend.clone(),
        Duration::from_secs(1),
        env.blocks.clone(),
        event_tx,
    );
    let handle = env
        .tracker
        .start(Duration::from_secs(3600), env.blocks.subscribe());

    env.chain.set_tip(20);
    watcher.poll_once().await;
    assert_eq!(events.recv().await, Some(WatchEvent::NewBlock(20)));

    let hash = TxHash::from("0xfeed");
    env.tracker.register(hash.clone());
    env.chain.set_receipt(&hash, Receipt::success(21));

    env.chain.set_tip(22);
    watcher.poll_once().await;

    tokio::time::timeout(Duration::from_secs(5), async {
        while env.tracker.pending().contains(&hash) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("block loop resolves the hash");
    assert!(!env.drain_updates().is_empty());

    handle.stop();
}
