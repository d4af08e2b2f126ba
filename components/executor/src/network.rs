//! In-process gossip between the nodes of a local network.
use meridian_concurrency::ctx::channel;
use meridian_roles::{node, snapshot::Snapshot};
use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

/// Snapshot gossiped by a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GossipMessage {
    /// Sending peer.
    pub peer: node::PublicKey,
    /// The snapshot.
    pub snapshot: Snapshot,
    /// Whether the sender has finalized the snapshot.
    pub finalized: bool,
}

/// Outgoing side of the gossip transport.
pub trait Gossip: fmt::Debug + Send + Sync {
    /// Sends `snapshot` to every other node. Never blocks.
    fn broadcast(&self, snapshot: &Snapshot, finalized: bool);
}

/// Receiving side of the gossip transport.
pub type Inbox = channel::UnboundedReceiver<GossipMessage>;

/// Full mesh of nodes running in one process.
#[derive(Debug, Default)]
pub struct LocalNetwork {
    inboxes: Mutex<BTreeMap<node::PublicKey, channel::UnboundedSender<GossipMessage>>>,
}

impl LocalNetwork {
    /// Empty network.
    pub fn new() -> Arc<Self> {
        Arc::default()
    }

    /// Connects the node `key`. Messages broadcast by other nodes arrive at the returned inbox.
    pub fn join(self: &Arc<Self>, key: node::PublicKey) -> (Endpoint, Inbox) {
        let (send, recv) = channel::unbounded();
        self.inboxes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, send);
        let endpoint = Endpoint {
            key,
            network: self.clone(),
        };
        (endpoint, recv)
    }
}

/// A node's connection to a [`LocalNetwork`].
#[derive(Debug, Clone)]
pub struct Endpoint {
    key: node::PublicKey,
    network: Arc<LocalNetwork>,
}

impl Gossip for Endpoint {
    fn broadcast(&self, snapshot: &Snapshot, finalized: bool) {
        let inboxes = self
            .network
            .inboxes
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for (key, inbox) in inboxes.iter() {
            if key == &self.key {
                continue;
            }
            inbox.send(GossipMessage {
                peer: self.key,
                snapshot: snapshot.clone(),
                finalized,
            });
        }
    }
}
