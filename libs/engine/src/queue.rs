//! Dedup-aware snapshot queue.
//!
//! Two channels, each a [`RingBuffer`]:
//! - `final`: snapshots already agreed on. A snapshot is pending at most once;
//!   repeated puts are absorbed.
//! - `cache`: snapshots still collecting signatures. A snapshot takes at most one
//!   slot; a repeated put replaces the signatures recorded for it, and the pop
//!   returns the latest recorded signatures.
//!
//! The dedup maps and the rings are updated under one lock, so that a put and a
//! pop of the same snapshot are linearizable. A put which finds its ring full
//! releases the lock and waits until a slot frees up (or the retry interval
//! passes) before trying again, so pops are never starved by a blocked put.
use crate::metrics::{self, ChannelLabels, PutLabels, PutOutcome};
use meridian_concurrency::{
    ctx,
    sync::{
        ring_buffer::{Disposed, Offer},
        RingBuffer,
    },
    time,
};
use meridian_roles::{
    node,
    snapshot::{Snapshot, SnapshotHash, SnapshotSignature},
};
use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, MutexGuard, PoisonError},
};

/// A snapshot and the peer which delivered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSnapshot {
    /// Delivering peer. The node itself for locally formed snapshots.
    pub peer: node::PublicKey,
    /// The snapshot.
    pub snapshot: Snapshot,
}

/// Queue channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, vise::EncodeLabelValue)]
#[metrics(rename_all = "snake_case")]
pub enum Channel {
    /// Finalized snapshots.
    Final,
    /// Snapshots still collecting signatures.
    Cache,
}

/// Error returned by queue operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// The queue has been disposed.
    #[error(transparent)]
    Disposed(#[from] Disposed),
    /// Context was canceled while waiting for space.
    #[error(transparent)]
    Canceled(#[from] ctx::Canceled),
}

impl From<QueueError> for ctx::Error {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Canceled(err) => Self::Canceled(err),
            QueueError::Disposed(err) => Self::Internal(err.into()),
        }
    }
}

#[derive(Default)]
struct Dedup {
    /// Snapshots pending on the final channel.
    finals: HashSet<SnapshotHash>,
    /// Latest signatures of the snapshots pending on the cache channel.
    cache: HashMap<SnapshotHash, Vec<SnapshotSignature>>,
}

/// Boxed, so that the preallocated slots stay pointer-sized.
type Entry = Box<(SnapshotHash, PeerSnapshot)>;

/// Two-channel deduplicating snapshot queue.
pub struct SnapshotQueue {
    finals: RingBuffer<Entry>,
    cache: RingBuffer<Entry>,
    dedup: Mutex<Dedup>,
    retry_interval: time::Duration,
}

impl std::fmt::Debug for SnapshotQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotQueue")
            .field("final", &self.finals)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl SnapshotQueue {
    /// Empty queue with `capacity` slots per channel.
    /// A put waiting for space re-checks its channel at least every `retry_interval`.
    ///
    /// # Panics
    /// If `capacity` is 0.
    pub fn new(capacity: usize, retry_interval: time::Duration) -> Self {
        Self {
            finals: RingBuffer::new(capacity),
            cache: RingBuffer::new(capacity),
            dedup: Mutex::default(),
            retry_interval,
        }
    }

    fn dedup(&self) -> MutexGuard<'_, Dedup> {
        // Nothing panics while holding the lock.
        self.dedup.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ring(&self, channel: Channel) -> &RingBuffer<Entry> {
        match channel {
            Channel::Final => &self.finals,
            Channel::Cache => &self.cache,
        }
    }

    /// Waits until `channel` may have a free slot, for at most the retry interval.
    async fn wait_for_space(
        &self,
        ctx: &ctx::Ctx,
        writable: std::pin::Pin<&mut tokio::sync::futures::Notified<'_>>,
    ) -> ctx::OrCanceled<()> {
        tokio::select! {
            () = writable => Ok(()),
            res = ctx.sleep(self.retry_interval) => res,
        }
    }

    /// Enqueues a finalized snapshot, unless it is already pending.
    /// Waits for a free slot if the channel is full.
    pub async fn put_final(&self, ctx: &ctx::Ctx, ps: PeerSnapshot) -> Result<(), QueueError> {
        let hash = ps.snapshot.hash();
        let mut entry = Box::new((hash, ps));
        loop {
            let writable = self.finals.writable();
            tokio::pin!(writable);
            writable.as_mut().enable();
            {
                let mut dedup = self.dedup();
                if self.finals.is_disposed() {
                    return Err(Disposed.into());
                }
                if dedup.finals.contains(&hash) {
                    tracing::trace!("final {hash:?}: already pending");
                    count_put(Channel::Final, PutOutcome::Duplicate);
                    return Ok(());
                }
                match self.finals.offer(entry)? {
                    Offer::Accepted => {
                        dedup.finals.insert(hash);
                        count_put(Channel::Final, PutOutcome::Enqueued);
                        return Ok(());
                    }
                    Offer::Full(e) => entry = e,
                }
            }
            tracing::debug!("final {hash:?}: channel full, waiting");
            metrics::QUEUE.backpressure_waits[&ChannelLabels {
                channel: Channel::Final,
            }]
                .inc();
            self.wait_for_space(ctx, writable).await?;
        }
    }

    /// Takes the oldest finalized snapshot. Never blocks.
    pub fn pop_final(&self) -> Result<Option<PeerSnapshot>, Disposed> {
        let mut dedup = self.dedup();
        let Some(entry) = self.finals.poll()? else {
            return Ok(None);
        };
        let (hash, ps) = *entry;
        dedup.finals.remove(&hash);
        Ok(Some(ps))
    }

    /// Enqueues a snapshot which is still collecting signatures.
    /// If the snapshot is already pending, only its recorded signatures are
    /// replaced with the ones of `ps`. Waits for a free slot if the channel is full.
    pub async fn put_cache(&self, ctx: &ctx::Ctx, ps: PeerSnapshot) -> Result<(), QueueError> {
        let hash = ps.snapshot.hash();
        let sigs = ps.snapshot.signatures.clone();
        let mut entry = Box::new((hash, ps));
        loop {
            let writable = self.cache.writable();
            tokio::pin!(writable);
            writable.as_mut().enable();
            {
                let mut dedup = self.dedup();
                if self.cache.is_disposed() {
                    return Err(Disposed.into());
                }
                if let Some(pending) = dedup.cache.get_mut(&hash) {
                    tracing::trace!("cache {hash:?}: replacing signatures");
                    *pending = sigs;
                    count_put(Channel::Cache, PutOutcome::Merged);
                    return Ok(());
                }
                match self.cache.offer(entry)? {
                    Offer::Accepted => {
                        dedup.cache.insert(hash, sigs);
                        count_put(Channel::Cache, PutOutcome::Enqueued);
                        return Ok(());
                    }
                    Offer::Full(e) => entry = e,
                }
            }
            tracing::debug!("cache {hash:?}: channel full, waiting");
            metrics::QUEUE.backpressure_waits[&ChannelLabels {
                channel: Channel::Cache,
            }]
                .inc();
            self.wait_for_space(ctx, writable).await?;
        }
    }

    /// Takes the oldest pending cache snapshot, carrying the latest signatures
    /// recorded for it. Never blocks.
    pub fn pop_cache(&self) -> Result<Option<PeerSnapshot>, Disposed> {
        let mut dedup = self.dedup();
        let Some(entry) = self.cache.poll()? else {
            return Ok(None);
        };
        let (hash, mut ps) = *entry;
        if let Some(sigs) = dedup.cache.remove(&hash) {
            ps.snapshot.signatures = sigs;
        }
        Ok(Some(ps))
    }

    /// Takes the next snapshot to process: a finalized one if any, a cache one otherwise.
    pub fn pop(&self) -> Result<Option<(Channel, PeerSnapshot)>, Disposed> {
        if let Some(ps) = self.pop_final()? {
            return Ok(Some((Channel::Final, ps)));
        }
        Ok(self.pop_cache()?.map(|ps| (Channel::Cache, ps)))
    }

    /// Total number of pending snapshots. The channels are read one after the
    /// other, so under concurrent access the sum is approximate.
    pub fn len(&self) -> u64 {
        self.finals.len() + self.cache.len()
    }

    /// Number of snapshots pending on `channel`.
    pub fn channel_len(&self, channel: Channel) -> u64 {
        self.ring(channel).len()
    }

    /// Whether no snapshot is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits until a snapshot may be pending, for at most `timeout`.
    pub async fn wait_for_items(
        &self,
        ctx: &ctx::Ctx,
        timeout: time::Duration,
    ) -> ctx::OrCanceled<()> {
        let finals = self.finals.readable();
        let cache = self.cache.readable();
        tokio::pin!(finals, cache);
        finals.as_mut().enable();
        cache.as_mut().enable();
        if !self.is_empty() {
            return Ok(());
        }
        tokio::select! {
            () = finals => Ok(()),
            () = cache => Ok(()),
            res = ctx.sleep(timeout) => res,
        }
    }

    /// Drops all pending snapshots. Every later put and pop fails with [`Disposed`];
    /// puts waiting for space are woken up and fail as well.
    pub fn dispose(&self) {
        let mut dedup = self.dedup();
        self.finals.dispose();
        self.cache.dispose();
        *dedup = Dedup::default();
    }

    /// Whether the queue has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.finals.is_disposed()
    }
}

fn count_put(channel: Channel, outcome: PutOutcome) {
    metrics::QUEUE.puts[&PutLabels { channel, outcome }].inc();
}
