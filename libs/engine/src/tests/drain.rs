use super::peer_snapshot;
use crate::{
    testonly::{ChannelHook, FailingHook, TestSnapshotStore},
    PeerSnapshot, PersistentSnapshotStore as _, QueueConfig, QueueInfo, SnapshotHook,
};
use meridian_concurrency::{ctx, scope, testonly::abort_on_panic, time};
use meridian_roles::{node, snapshot::Snapshot};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};

fn config() -> QueueConfig {
    QueueConfig {
        capacity: 16,
        retry_interval: time::Duration::milliseconds(10),
        // The drain loop has to be woken up by puts.
        poll_interval: time::Duration::hours(1),
    }
}

#[tokio::test]
async fn drains_final_snapshots_first() {
    abort_on_panic();
    let ctx = &ctx::test_root(&ctx::RealClock);
    let rng = &mut ctx.rng();
    let store = TestSnapshotStore::new(&config());
    let cache: Vec<_> = (0..4).map(|_| peer_snapshot(rng)).collect();
    let finals: Vec<_> = (0..3).map(|_| peer_snapshot(rng)).collect();
    for ps in &cache {
        store
            .store
            .queue_append_snapshot(ctx, ps.peer, ps.snapshot.clone(), false)
            .await
            .unwrap();
    }
    for ps in &finals {
        store
            .store
            .queue_append_snapshot(ctx, ps.peer, ps.snapshot.clone(), true)
            .await
            .unwrap();
    }

    let (hook, mut drained) = ChannelHook::new();
    scope::run!(ctx, |ctx, s| async {
        s.spawn_bg(store.runner.run(ctx, &hook));
        let mut got = vec![];
        for _ in 0..finals.len() + cache.len() {
            got.push(drained.recv(ctx).await?);
        }
        let want: Vec<_> = finals.iter().chain(&cache).cloned().collect();
        assert_eq!(want, got);
        assert_eq!(0, store.store.queue().len());
        anyhow::Ok(())
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn idle_loop_wakes_up_on_put() {
    abort_on_panic();
    let ctx = &ctx::test_root(&ctx::RealClock);
    let rng = &mut ctx.rng();
    let store = TestSnapshotStore::new(&config());
    let (hook, mut drained) = ChannelHook::new();
    scope::run!(ctx, |ctx, s| async {
        s.spawn_bg(store.runner.run(ctx, &hook));
        for _ in 0..3 {
            ctx.sleep(time::Duration::milliseconds(20)).await?;
            let ps = peer_snapshot(rng);
            store
                .store
                .queue_append_snapshot(ctx, ps.peer, ps.snapshot.clone(), false)
                .await?;
            assert_eq!(ps, drained.recv(ctx).await?);
        }
        anyhow::Ok(())
    })
    .await
    .unwrap();
}

/// Forwards every snapshot, but reports a failure for every other one.
struct FlakyHook {
    calls: AtomicUsize,
    inner: ChannelHook,
}

#[async_trait::async_trait]
impl SnapshotHook for FlakyHook {
    async fn process_snapshot(
        &self,
        ctx: &ctx::Ctx,
        peer: node::PublicKey,
        snapshot: Snapshot,
    ) -> ctx::Result<()> {
        self.inner.process_snapshot(ctx, peer, snapshot).await?;
        if self.calls.fetch_add(1, Ordering::Relaxed) % 2 == 0 {
            return Err(anyhow::format_err!("flaky").into());
        }
        Ok(())
    }
}

#[tokio::test]
async fn hook_failures_do_not_stop_the_loop() {
    abort_on_panic();
    let ctx = &ctx::test_root(&ctx::RealClock);
    let rng = &mut ctx.rng();
    let store = TestSnapshotStore::new(&config());
    let (inner, mut drained) = ChannelHook::new();
    let hook = FlakyHook {
        calls: AtomicUsize::new(0),
        inner,
    };
    let want: Vec<PeerSnapshot> = (0..6).map(|_| peer_snapshot(rng)).collect();
    scope::run!(ctx, |ctx, s| async {
        s.spawn_bg(store.runner.run(ctx, &hook));
        for ps in &want {
            store
                .store
                .queue_append_snapshot(ctx, ps.peer, ps.snapshot.clone(), true)
                .await?;
            assert_eq!(ps, &drained.recv(ctx).await?);
        }
        anyhow::Ok(())
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn failing_hook_still_drains() {
    abort_on_panic();
    let ctx = &ctx::test_root(&ctx::RealClock);
    let rng = &mut ctx.rng();
    let store = TestSnapshotStore::new(&config());
    scope::run!(ctx, |ctx, s| async {
        s.spawn_bg(store.runner.run(ctx, &FailingHook));
        for _ in 0..5 {
            let ps = peer_snapshot(rng);
            store
                .store
                .queue_append_snapshot(ctx, ps.peer, ps.snapshot, false)
                .await?;
        }
        while !store.store.queue().is_empty() {
            ctx.sleep(time::Duration::milliseconds(5)).await?;
        }
        anyhow::Ok(())
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn queue_info_counts_persisted_and_pending() {
    abort_on_panic();
    let ctx = &ctx::test_root(&ctx::RealClock);
    let rng = &mut ctx.rng();
    let store = TestSnapshotStore::new(&config());
    let persisted: Vec<Snapshot> = (0..3).map(|_| peer_snapshot(rng).snapshot).collect();
    for s in &persisted {
        assert!(store.store.write_snapshot(ctx, s).await.unwrap());
    }
    // Writes are idempotent.
    assert!(!store.store.write_snapshot(ctx, &persisted[0]).await.unwrap());
    for finalized in [true, false] {
        let ps = peer_snapshot(rng);
        store
            .store
            .queue_append_snapshot(ctx, ps.peer, ps.snapshot, finalized)
            .await
            .unwrap();
    }
    assert_eq!(
        QueueInfo {
            persisted: 3,
            queue_length: 2
        },
        store.store.queue_info(ctx).await.unwrap()
    );
    assert_eq!(persisted, store.im_store.dump());
    assert_eq!(
        persisted[1..],
        store.im_store.list(ctx, 1, 10).await.unwrap()[..]
    );
    let tx = persisted[2].transaction.hash();
    assert_eq!(
        Some(persisted[2].clone()),
        store.store.transaction(ctx, &tx).await.unwrap()
    );
}
