use crate::{
    metrics::{self, ChannelLabels},
    Channel, PeerSnapshot, PersistentSnapshotStore, QueueError, SnapshotHook, SnapshotQueue,
};
use meridian_concurrency::{ctx, error::Wrap as _, time};
use meridian_roles::{
    node,
    snapshot::{Snapshot, SnapshotHash},
    transaction::TxHash,
};
use std::sync::Arc;

/// Queue parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Slots per channel.
    pub capacity: usize,
    /// Interval at which a put waiting for a free slot re-checks its channel.
    pub retry_interval: time::Duration,
    /// Interval at which an idle drain loop re-checks the queue.
    pub poll_interval: time::Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 1 << 20,
            retry_interval: time::Duration::milliseconds(100),
            poll_interval: time::Duration::milliseconds(100),
        }
    }
}

/// Diagnostic counters of a [`SnapshotStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueInfo {
    /// Snapshots in the persistent store.
    pub persisted: u64,
    /// Snapshots waiting in the queue.
    pub queue_length: u64,
}

/// Snapshot queue in front of the persistent store.
#[derive(Debug)]
pub struct SnapshotStore {
    persistent: Box<dyn PersistentSnapshotStore>,
    queue: SnapshotQueue,
    poll_interval: time::Duration,
}

impl SnapshotStore {
    /// Constructs a store. The queue gets drained only while the returned runner runs.
    pub fn new(
        persistent: Box<dyn PersistentSnapshotStore>,
        config: &QueueConfig,
    ) -> (Arc<Self>, SnapshotStoreRunner) {
        let this = Arc::new(Self {
            persistent,
            queue: SnapshotQueue::new(config.capacity, config.retry_interval),
            poll_interval: config.poll_interval,
        });
        (this.clone(), SnapshotStoreRunner(this))
    }

    /// Entry point for snapshots received from peers or formed locally.
    /// Finalized snapshots go to the final channel, the rest to the cache channel.
    pub async fn queue_append_snapshot(
        &self,
        ctx: &ctx::Ctx,
        peer: node::PublicKey,
        snapshot: Snapshot,
        finalized: bool,
    ) -> Result<(), QueueError> {
        let ps = PeerSnapshot { peer, snapshot };
        if finalized {
            self.queue.put_final(ctx, ps).await
        } else {
            self.queue.put_cache(ctx, ps).await
        }
    }

    /// Number of persisted snapshots and length of the queue.
    /// Counting the persisted snapshots scans the whole store.
    pub async fn queue_info(&self, ctx: &ctx::Ctx) -> ctx::Result<QueueInfo> {
        let t = metrics::PERSISTENT_STORE.count_latency.start();
        let persisted = self.persistent.count(ctx).await.wrap("count()")?;
        t.observe();
        Ok(QueueInfo {
            persisted,
            queue_length: self.queue.len(),
        })
    }

    /// The queue.
    pub fn queue(&self) -> &SnapshotQueue {
        &self.queue
    }

    /// Persists a finalized snapshot. Returns `false` if it was already persisted.
    #[tracing::instrument(skip_all, fields(snapshot = ?snapshot.hash()))]
    pub async fn write_snapshot(&self, ctx: &ctx::Ctx, snapshot: &Snapshot) -> ctx::Result<bool> {
        let t = metrics::PERSISTENT_STORE.write_latency.start();
        let new = self.persistent.write(ctx, snapshot).await.wrap("write()")?;
        t.observe();
        if new {
            tracing::debug!("persisted");
        }
        Ok(new)
    }

    /// Persisted snapshot by its hash.
    pub async fn snapshot(
        &self,
        ctx: &ctx::Ctx,
        hash: &SnapshotHash,
    ) -> ctx::Result<Option<Snapshot>> {
        self.persistent.snapshot(ctx, hash).await.wrap("snapshot()")
    }

    /// Persisted snapshot carrying the transaction `hash`.
    pub async fn transaction(&self, ctx: &ctx::Ctx, hash: &TxHash) -> ctx::Result<Option<Snapshot>> {
        self.persistent.transaction(ctx, hash).await.wrap("transaction()")
    }

    /// Persisted snapshots in the order they were written.
    pub async fn list(&self, ctx: &ctx::Ctx, offset: u64, limit: u64) -> ctx::Result<Vec<Snapshot>> {
        self.persistent.list(ctx, offset, limit).await.wrap("list()")
    }

    /// Disposes the queue. Stop the producers first.
    pub fn dispose(&self) {
        self.queue.dispose();
    }

    fn scrape_metrics(&self) -> metrics::StoreState {
        let m = metrics::StoreState::default();
        for channel in [Channel::Final, Channel::Cache] {
            m.queue_length[&ChannelLabels { channel }].set(self.queue.channel_len(channel));
        }
        m
    }
}

/// Runner of the drain loop of a [`SnapshotStore`].
#[must_use]
#[derive(Debug, Clone)]
pub struct SnapshotStoreRunner(Arc<SnapshotStore>);

impl SnapshotStoreRunner {
    /// Drains the queue into `hook` until `ctx` is canceled.
    ///
    /// Each cycle takes a finalized snapshot if there is one, a cache snapshot
    /// otherwise, and waits for the next put when both channels are empty.
    /// Errors are logged and the loop carries on: a failed pop skips the cycle
    /// and a failed hook call drops the snapshot.
    pub async fn run(self, ctx: &ctx::Ctx, hook: &dyn SnapshotHook) -> anyhow::Result<()> {
        let store_ref = Arc::downgrade(&self.0);
        let _ = metrics::STORE_STATE.before_scrape(move || Some(store_ref.upgrade()?.scrape_metrics()));

        let store = &self.0;
        while ctx.is_active() {
            let (channel, ps) = match store.queue.pop() {
                Ok(Some(next)) => next,
                Ok(None) => {
                    metrics::QUEUE.idle_cycles.inc();
                    if store.queue.wait_for_items(ctx, store.poll_interval).await.is_err() {
                        break;
                    }
                    continue;
                }
                Err(err) => {
                    tracing::warn!("pop(): {err:#}");
                    if ctx.sleep(store.poll_interval).await.is_err() {
                        break;
                    }
                    continue;
                }
            };
            metrics::QUEUE.pops[&ChannelLabels { channel }].inc();
            tracing::debug!(?channel, peer = ?ps.peer, "draining {:?}", ps.snapshot.hash());
            let t = metrics::QUEUE.hook_latency.start();
            match hook.process_snapshot(ctx, ps.peer, ps.snapshot).await {
                Ok(()) => {
                    t.observe();
                }
                Err(ctx::Error::Canceled(_)) => break,
                Err(ctx::Error::Internal(err)) => {
                    metrics::QUEUE.hook_failures.inc();
                    tracing::warn!("process_snapshot(): {err:#}");
                }
            }
        }
        Ok(())
    }
}
