//! Snapshot intake of a node.
//!
//! Snapshots received from peers or formed from locally submitted
//! transactions enter a [`SnapshotQueue`] through
//! [`SnapshotStore::queue_append_snapshot`]. A single runner drains the
//! queue, finalized snapshots first, and hands every snapshot to the
//! [`SnapshotHook`] owned by the agreement layer.
mod interface;
mod metrics;
mod queue;
mod snapshot_store;
pub mod testonly;
#[cfg(test)]
mod tests;

pub use crate::{
    interface::{PersistentSnapshotStore, SnapshotHook},
    queue::{Channel, PeerSnapshot, QueueError, SnapshotQueue},
    snapshot_store::{QueueConfig, QueueInfo, SnapshotStore, SnapshotStoreRunner},
};
