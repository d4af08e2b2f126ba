use crate::{Channel, PeerSnapshot, QueueError, SnapshotQueue};
use assert_matches::assert_matches;
use meridian_concurrency::{
    ctx, scope,
    sync::ring_buffer::Disposed,
    testonly::abort_on_panic,
    time,
};
use meridian_roles::node;
use pretty_assertions::assert_eq;
use rand::Rng;
use std::collections::HashMap;
use test_casing::test_casing;

mod drain;

const RETRY: time::Duration = time::Duration::milliseconds(10);

fn peer_snapshot(rng: &mut impl Rng) -> PeerSnapshot {
    PeerSnapshot {
        peer: rng.gen::<node::SecretKey>().public(),
        snapshot: rng.gen(),
    }
}

#[tokio::test]
async fn put_final_is_idempotent() {
    abort_on_panic();
    let ctx = &ctx::test_root(&ctx::RealClock);
    let rng = &mut ctx.rng();
    // A single slot: a blocking second put would hang the test.
    let q = SnapshotQueue::new(1, time::Duration::hours(1));
    let ps = peer_snapshot(rng);
    q.put_final(ctx, ps.clone()).await.unwrap();
    q.put_final(ctx, ps.clone()).await.unwrap();
    assert_eq!(1, q.len());
    assert_eq!(Some(ps.clone()), q.pop_final().unwrap());
    assert_eq!(None, q.pop_final().unwrap());

    // Once drained, the snapshot can be queued again.
    q.put_final(ctx, ps.clone()).await.unwrap();
    assert_eq!(1, q.len());
}

#[tokio::test]
async fn put_cache_keeps_latest_signatures() {
    abort_on_panic();
    let ctx = &ctx::test_root(&ctx::RealClock);
    let rng = &mut ctx.rng();
    let q = SnapshotQueue::new(4, RETRY);
    let keys: Vec<node::SecretKey> = (0..3).map(|_| rng.gen()).collect();

    let mut a = peer_snapshot(rng);
    a.snapshot.signatures = vec![a.snapshot.sign(&keys[0])];
    let mut b = peer_snapshot(rng);
    b.snapshot = a.snapshot.clone();
    b.snapshot.signatures = vec![b.snapshot.sign(&keys[1]), b.snapshot.sign(&keys[2])];

    q.put_cache(ctx, a.clone()).await.unwrap();
    q.put_cache(ctx, b.clone()).await.unwrap();
    assert_eq!(1, q.len());

    let got = q.pop_cache().unwrap().unwrap();
    // The slot belongs to the first delivery; the signatures to the latest one.
    assert_eq!(a.peer, got.peer);
    assert_eq!(b.snapshot, got.snapshot);
    assert_eq!(None, q.pop_cache().unwrap());

    // Signatures of a drained snapshot are forgotten.
    q.put_cache(ctx, a.clone()).await.unwrap();
    assert_eq!(Some(a), q.pop_cache().unwrap());
}

#[tokio::test]
async fn fifo_within_channel() {
    abort_on_panic();
    let ctx = &ctx::test_root(&ctx::RealClock);
    let rng = &mut ctx.rng();
    let q = SnapshotQueue::new(8, RETRY);
    let want: Vec<_> = (0..5).map(|_| peer_snapshot(rng)).collect();
    for ps in &want {
        q.put_final(ctx, ps.clone()).await.unwrap();
        q.put_cache(ctx, ps.clone()).await.unwrap();
    }
    assert_eq!(10, q.len());
    let mut finals = vec![];
    while let Some(ps) = q.pop_final().unwrap() {
        finals.push(ps);
    }
    let mut cache = vec![];
    while let Some(ps) = q.pop_cache().unwrap() {
        cache.push(ps);
    }
    assert_eq!(want, finals);
    assert_eq!(want, cache);
    assert!(q.is_empty());
}

#[tokio::test]
async fn final_before_cache() {
    abort_on_panic();
    let ctx = &ctx::test_root(&ctx::RealClock);
    let rng = &mut ctx.rng();
    let q = SnapshotQueue::new(8, RETRY);
    let cache: Vec<_> = (0..3).map(|_| peer_snapshot(rng)).collect();
    let finals: Vec<_> = (0..2).map(|_| peer_snapshot(rng)).collect();
    for ps in &cache {
        q.put_cache(ctx, ps.clone()).await.unwrap();
    }
    for ps in &finals {
        q.put_final(ctx, ps.clone()).await.unwrap();
    }
    let mut got = vec![];
    while let Some(next) = q.pop().unwrap() {
        got.push(next);
    }
    let want: Vec<_> = finals
        .into_iter()
        .map(|ps| (Channel::Final, ps))
        .chain(cache.into_iter().map(|ps| (Channel::Cache, ps)))
        .collect();
    assert_eq!(want, got);
}

#[test_casing(2, [Channel::Final, Channel::Cache])]
#[tokio::test]
async fn full_channel_blocks_until_pop(channel: Channel) {
    abort_on_panic();
    let ctx = &ctx::test_root(&ctx::RealClock);
    let rng = &mut ctx.rng();
    // Retries are effectively disabled: the blocked put has to be woken by the pop.
    let q = &SnapshotQueue::new(2, time::Duration::hours(1));
    let items: Vec<_> = (0..3).map(|_| peer_snapshot(rng)).collect();
    let pop = || match channel {
        Channel::Final => q.pop_final(),
        Channel::Cache => q.pop_cache(),
    };
    scope::run!(ctx, |ctx, s| async {
        for ps in &items[..2] {
            put_to(ctx, q, channel, ps.clone()).await?;
        }
        let blocked = s.spawn(put_to(ctx, q, channel, items[2].clone()));
        ctx.sleep(time::Duration::milliseconds(100)).await?;
        assert_eq!(2, q.len());
        // Pops are not blocked by the waiting put.
        assert_eq!(Some(items[0].clone()), pop()?);
        blocked.join(ctx).await?;
        assert_eq!(Some(items[1].clone()), pop()?);
        assert_eq!(Some(items[2].clone()), pop()?);
        anyhow::Ok(())
    })
    .await
    .unwrap();
}

async fn put_to(
    ctx: &ctx::Ctx,
    q: &SnapshotQueue,
    channel: Channel,
    ps: PeerSnapshot,
) -> anyhow::Result<()> {
    match channel {
        Channel::Final => q.put_final(ctx, ps).await?,
        Channel::Cache => q.put_cache(ctx, ps).await?,
    }
    Ok(())
}

#[tokio::test]
async fn blocked_put_is_canceled() {
    abort_on_panic();
    let ctx = &ctx::test_root(&ctx::RealClock);
    let rng = &mut ctx.rng();
    let q = SnapshotQueue::new(1, RETRY);
    let first = peer_snapshot(rng);
    q.put_final(ctx, first.clone()).await.unwrap();
    let short = &ctx.with_timeout(time::Duration::milliseconds(50));
    assert_matches!(
        q.put_final(short, peer_snapshot(rng)).await,
        Err(QueueError::Canceled(_))
    );
    // The pending snapshot was neither replaced nor duplicated.
    assert_eq!(1, q.len());
    assert_eq!(Some(first), q.pop_final().unwrap());
    assert_eq!(None, q.pop_final().unwrap());
}

#[tokio::test]
async fn disposed_queue_fails() {
    abort_on_panic();
    let ctx = &ctx::test_root(&ctx::RealClock);
    let rng = &mut ctx.rng();
    let q = &SnapshotQueue::new(1, time::Duration::hours(1));
    let ps = peer_snapshot(rng);
    q.put_final(ctx, ps.clone()).await.unwrap();
    q.put_cache(ctx, ps.clone()).await.unwrap();

    scope::run!(ctx, |ctx, s| async {
        // A put waiting for space is woken up by the disposal.
        let other = peer_snapshot(&mut ctx.rng());
        let blocked = s.spawn(async { anyhow::Ok(q.put_final(ctx, other).await) });
        ctx.sleep(time::Duration::milliseconds(50)).await?;
        q.dispose();
        assert_matches!(blocked.join(ctx).await?, Err(QueueError::Disposed(_)));
        anyhow::Ok(())
    })
    .await
    .unwrap();

    // Including puts of snapshots which were pending before the disposal.
    assert_matches!(q.put_final(ctx, ps.clone()).await, Err(QueueError::Disposed(_)));
    assert_matches!(q.put_cache(ctx, ps.clone()).await, Err(QueueError::Disposed(_)));
    assert_matches!(q.pop_final(), Err(Disposed));
    assert_matches!(q.pop_cache(), Err(Disposed));
    assert_matches!(q.pop(), Err(Disposed));
    assert_eq!(0, q.len());
}

/// Concurrent producers: every snapshot is delivered exactly once,
/// in the order of its producer.
#[test_casing(3, [1, 4, 64])]
#[tokio::test]
async fn concurrent_producers(capacity: usize) {
    abort_on_panic();
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 25;
    let ctx = &ctx::test_root(&ctx::RealClock);
    let rng = &mut ctx.rng();
    let q = &SnapshotQueue::new(capacity, RETRY);
    let batches: Vec<Vec<PeerSnapshot>> = (0..PRODUCERS)
        .map(|_| (0..PER_PRODUCER).map(|_| peer_snapshot(rng)).collect())
        .collect();
    let position: HashMap<_, _> = batches
        .iter()
        .enumerate()
        .flat_map(|(p, b)| b.iter().enumerate().map(move |(i, ps)| (ps.snapshot.hash(), (p, i))))
        .collect();

    let batches = &batches;
    let got = scope::run!(ctx, |ctx, s| async move {
        for batch in batches {
            s.spawn(async move {
                for ps in batch {
                    q.put_final(ctx, ps.clone()).await?;
                }
                anyhow::Ok(())
            });
        }
        let mut got = vec![];
        while got.len() < PRODUCERS * PER_PRODUCER {
            match q.pop_final()? {
                Some(ps) => got.push(ps),
                None => ctx.sleep(time::Duration::milliseconds(1)).await?,
            }
        }
        anyhow::Ok(got)
    })
    .await
    .unwrap();

    let mut next = vec![0; PRODUCERS];
    for ps in got {
        let (p, i) = position[&ps.snapshot.hash()];
        assert_eq!(next[p], i, "producer {p}");
        next[p] += 1;
    }
    assert_eq!(vec![PER_PRODUCER; PRODUCERS], next);
}
