//! In-memory storage implementation.
use crate::PersistentSnapshotStore;
use meridian_concurrency::ctx;
use meridian_roles::{
    snapshot::{Snapshot, SnapshotHash},
    transaction::TxHash,
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

#[derive(Debug, Default)]
struct Inner {
    snapshots: HashMap<SnapshotHash, Snapshot>,
    transactions: HashMap<TxHash, SnapshotHash>,
    /// Write order.
    topology: Vec<SnapshotHash>,
}

/// In-memory snapshot store.
#[derive(Clone, Debug, Default)]
pub struct Store(Arc<Mutex<Inner>>);

impl Store {
    /// All stored snapshots, in write order.
    pub fn dump(&self) -> Vec<Snapshot> {
        let inner = self.0.lock().unwrap();
        inner
            .topology
            .iter()
            .map(|h| inner.snapshots[h].clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl PersistentSnapshotStore for Store {
    async fn count(&self, _ctx: &ctx::Ctx) -> ctx::Result<u64> {
        Ok(self.0.lock().unwrap().snapshots.len() as u64)
    }

    async fn snapshot(&self, _ctx: &ctx::Ctx, hash: &SnapshotHash) -> ctx::Result<Option<Snapshot>> {
        Ok(self.0.lock().unwrap().snapshots.get(hash).cloned())
    }

    async fn transaction(&self, _ctx: &ctx::Ctx, hash: &TxHash) -> ctx::Result<Option<Snapshot>> {
        let inner = self.0.lock().unwrap();
        Ok(inner
            .transactions
            .get(hash)
            .and_then(|h| inner.snapshots.get(h))
            .cloned())
    }

    async fn list(&self, _ctx: &ctx::Ctx, offset: u64, limit: u64) -> ctx::Result<Vec<Snapshot>> {
        let inner = self.0.lock().unwrap();
        Ok(inner
            .topology
            .iter()
            .skip(offset.try_into().unwrap_or(usize::MAX))
            .take(limit.try_into().unwrap_or(usize::MAX))
            .map(|h| inner.snapshots[h].clone())
            .collect())
    }

    async fn write(&self, _ctx: &ctx::Ctx, snapshot: &Snapshot) -> ctx::Result<bool> {
        let hash = snapshot.hash();
        let mut inner = self.0.lock().unwrap();
        if inner.snapshots.contains_key(&hash) {
            return Ok(false);
        }
        inner.snapshots.insert(hash, snapshot.clone());
        inner.transactions.insert(snapshot.transaction.hash(), hash);
        inner.topology.push(hash);
        Ok(true)
    }
}
