//! Reference agreement hook.
//!
//! The kernel collects committee signatures for every snapshot it drains.
//! It adds its own signature to each snapshot it sees, keeps the union of the
//! valid signatures received so far, and gossips the union whenever it knows
//! signatures the sender did not. A snapshot signed by more than two thirds of
//! the committee is persisted and gossiped as finalized. Snapshots which
//! never get there are evicted, oldest first, once too many are pending.
use crate::network::Gossip;
use meridian_concurrency::{ctx, error::Wrap as _};
use meridian_engine::{SnapshotHook, SnapshotStore};
use meridian_roles::{
    node,
    snapshot::{Committee, Snapshot, SnapshotHash, SnapshotSignature},
};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// Default bound of [`Kernel::pending_len`].
pub const MAX_PENDING: usize = 1 << 16;

/// Snapshots collecting signatures, oldest first.
#[derive(Debug, Default)]
struct Pending {
    snapshots: HashMap<SnapshotHash, (u64, Snapshot)>,
    order: BTreeMap<u64, SnapshotHash>,
    next: u64,
}

impl Pending {
    /// Entry of `snapshot`, created without signatures if missing.
    /// Creating an entry evicts the oldest ones beyond `limit`.
    fn get_or_insert(&mut self, snapshot: Snapshot, limit: usize) -> &mut Snapshot {
        let hash = snapshot.hash();
        if !self.snapshots.contains_key(&hash) {
            while self.snapshots.len() >= limit {
                let Some((_, oldest)) = self.order.pop_first() else {
                    break;
                };
                tracing::debug!("{oldest:?}: evicted before finalization");
                self.snapshots.remove(&oldest);
            }
            self.order.insert(self.next, hash);
            let snapshot = Snapshot {
                signatures: vec![],
                ..snapshot
            };
            self.snapshots.insert(hash, (self.next, snapshot));
            self.next += 1;
        }
        match self.snapshots.get_mut(&hash) {
            Some((_, snapshot)) => snapshot,
            None => unreachable!("entry inserted above"),
        }
    }

    fn remove(&mut self, hash: &SnapshotHash) {
        if let Some((seq, _)) = self.snapshots.remove(hash) {
            self.order.remove(&seq);
        }
    }
}

/// Signature collecting [`SnapshotHook`].
#[derive(Debug)]
pub struct Kernel {
    key: node::SecretKey,
    committee: Committee,
    store: Arc<SnapshotStore>,
    gossip: Box<dyn Gossip>,
    /// Snapshots collecting signatures, with the valid signatures known so far.
    pending: Mutex<Pending>,
    /// At most this many snapshots collect signatures at a time. Snapshots which
    /// never reach the threshold are dropped, oldest first.
    max_pending: usize,
}

impl Kernel {
    /// Kernel of the node `key`, persisting to `store` and gossiping through `gossip`.
    pub fn new(
        key: node::SecretKey,
        committee: Committee,
        store: Arc<SnapshotStore>,
        gossip: Box<dyn Gossip>,
    ) -> Self {
        Self {
            key,
            committee,
            store,
            gossip,
            pending: Mutex::default(),
            max_pending: MAX_PENDING,
        }
    }

    /// Sets the bound of [`Self::pending_len`].
    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending.max(1);
        self
    }

    fn pending(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of snapshots still collecting signatures.
    pub fn pending_len(&self) -> usize {
        self.pending().snapshots.len()
    }

    /// Whether `hash` is still collecting signatures.
    pub fn is_pending(&self, hash: &SnapshotHash) -> bool {
        self.pending().snapshots.contains_key(hash)
    }

    /// Signatures of `snapshot` which are valid and come from the committee.
    fn valid_signatures(&self, snapshot: &Snapshot) -> Vec<SnapshotSignature> {
        snapshot
            .signatures
            .iter()
            .filter(|sig| {
                if !self.committee.contains(&sig.signer) {
                    tracing::warn!("signature of {:?} outside of the committee", sig.signer);
                    return false;
                }
                if let Err(err) = snapshot.verify_signature(sig) {
                    tracing::warn!("signature of {:?}: {err}", sig.signer);
                    return false;
                }
                true
            })
            .copied()
            .collect()
    }
}

#[async_trait::async_trait]
impl SnapshotHook for Kernel {
    #[tracing::instrument(skip_all, fields(peer = ?peer))]
    async fn process_snapshot(
        &self,
        ctx: &ctx::Ctx,
        peer: node::PublicKey,
        snapshot: Snapshot,
    ) -> ctx::Result<()> {
        let hash = snapshot.hash();
        if self.store.snapshot(ctx, &hash).await.wrap("snapshot()")?.is_some() {
            tracing::trace!("{hash:?}: already final");
            return Ok(());
        }

        let received = self.valid_signatures(&snapshot);
        let received_len = received.len();
        let was_final = received_len >= self.committee.threshold();
        let merged = {
            let mut pending = self.pending();
            let entry = pending.get_or_insert(snapshot, self.max_pending);
            entry.merge_signatures(received);
            if !entry.is_signed_by(&self.key.public()) {
                let sig = entry.sign(&self.key);
                entry.signatures.push(sig);
            }
            entry.clone()
        };

        if merged.is_final(&self.committee) {
            self.pending().remove(&hash);
            if self.store.write_snapshot(ctx, &merged).await? {
                tracing::info!(
                    "{hash:?}: finalized with {} signatures",
                    merged.signatures.len()
                );
                // Peers get a finalized snapshot from whoever finalized it first.
                if !was_final {
                    self.gossip.broadcast(&merged, true);
                }
            }
            return Ok(());
        }
        if merged.signatures.len() > received_len {
            tracing::debug!(
                "{hash:?}: {}/{} signatures",
                merged.signatures.len(),
                self.committee.threshold()
            );
            self.gossip.broadcast(&merged, false);
        }
        Ok(())
    }
}
