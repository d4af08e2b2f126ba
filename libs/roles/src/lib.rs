//! Domain types exchanged by Meridian nodes.
//!
//! - `node`: the identity of a node in the network, which also signs snapshots.
//! - `transaction`: the value transfer wrapped by every snapshot.
//! - `snapshot`: the unit of agreement, its committee and the genesis set.

pub mod node;
pub mod proto;
mod serde_util;
pub mod snapshot;
pub mod transaction;
