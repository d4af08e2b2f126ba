//! Test-only utilities.
use crate::{PeerSnapshot, QueueConfig, SnapshotHook, SnapshotStore, SnapshotStoreRunner};
use meridian_concurrency::ctx::{self, channel};
use meridian_roles::{node, snapshot::Snapshot};
use std::sync::Arc;

pub mod in_memory;

/// Snapshot store backed by memory.
pub struct TestSnapshotStore {
    /// The store.
    pub store: Arc<SnapshotStore>,
    /// Drain loop of the store.
    pub runner: SnapshotStoreRunner,
    /// The persistent store underneath.
    pub im_store: in_memory::Store,
}

impl TestSnapshotStore {
    /// Constructs an empty store.
    pub fn new(config: &QueueConfig) -> Self {
        let im_store = in_memory::Store::default();
        let (store, runner) = SnapshotStore::new(Box::new(im_store.clone()), config);
        Self {
            store,
            runner,
            im_store,
        }
    }
}

/// Hook forwarding every drained snapshot to a channel.
#[derive(Debug)]
pub struct ChannelHook(channel::UnboundedSender<PeerSnapshot>);

impl ChannelHook {
    /// Hook and the receiver of the forwarded snapshots.
    pub fn new() -> (Self, channel::UnboundedReceiver<PeerSnapshot>) {
        let (send, recv) = channel::unbounded();
        (Self(send), recv)
    }
}

#[async_trait::async_trait]
impl SnapshotHook for ChannelHook {
    async fn process_snapshot(
        &self,
        _ctx: &ctx::Ctx,
        peer: node::PublicKey,
        snapshot: Snapshot,
    ) -> ctx::Result<()> {
        self.0.send(PeerSnapshot { peer, snapshot });
        Ok(())
    }
}

/// Hook failing on every call.
#[derive(Debug)]
pub struct FailingHook;

#[async_trait::async_trait]
impl SnapshotHook for FailingHook {
    async fn process_snapshot(
        &self,
        _ctx: &ctx::Ctx,
        _peer: node::PublicKey,
        snapshot: Snapshot,
    ) -> ctx::Result<()> {
        Err(anyhow::format_err!("rejected {:?}", snapshot.hash()).into())
    }
}
