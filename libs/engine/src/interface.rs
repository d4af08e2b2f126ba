use meridian_concurrency::ctx;
use meridian_roles::{
    node,
    snapshot::{Snapshot, SnapshotHash},
    transaction::TxHash,
};
use std::fmt;

/// Storage of finalized snapshots.
///
/// Implementations **must** propagate context cancellation using [`ctx::Error::Canceled`].
#[async_trait::async_trait]
pub trait PersistentSnapshotStore: 'static + fmt::Debug + Send + Sync {
    /// Number of stored snapshots.
    /// Implementations may scan the whole store; keep it off the hot path.
    async fn count(&self, ctx: &ctx::Ctx) -> ctx::Result<u64>;

    /// Snapshot by its hash.
    async fn snapshot(&self, ctx: &ctx::Ctx, hash: &SnapshotHash) -> ctx::Result<Option<Snapshot>>;

    /// Snapshot carrying the transaction `hash`.
    async fn transaction(&self, ctx: &ctx::Ctx, hash: &TxHash) -> ctx::Result<Option<Snapshot>>;

    /// Up to `limit` snapshots in the order they were written, skipping the first `offset`.
    async fn list(&self, ctx: &ctx::Ctx, offset: u64, limit: u64) -> ctx::Result<Vec<Snapshot>>;

    /// Stores a snapshot. Returns `false` if a snapshot with the same hash was already stored,
    /// in which case the store is left unchanged.
    async fn write(&self, ctx: &ctx::Ctx, snapshot: &Snapshot) -> ctx::Result<bool>;
}

/// Consumer of drained snapshots, implemented by the agreement layer.
///
/// Called by [`crate::SnapshotStoreRunner`] once per drained snapshot, one call at a time.
/// Failures are logged and otherwise ignored by the caller: they neither stop
/// the drain loop nor put the snapshot back.
#[async_trait::async_trait]
pub trait SnapshotHook: Send + Sync {
    /// Applies `snapshot`, delivered by `peer`.
    async fn process_snapshot(
        &self,
        ctx: &ctx::Ctx,
        peer: node::PublicKey,
        snapshot: Snapshot,
    ) -> ctx::Result<()>;
}
