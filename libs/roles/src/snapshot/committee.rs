use crate::node;
use std::collections::BTreeSet;

/// Set of nodes whose signatures finalize snapshots. All members weigh the same.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Committee {
    keys: BTreeSet<node::PublicKey>,
}

impl Committee {
    /// Committee of `keys`. Keys have to be unique and the committee non-empty.
    pub fn new(keys: impl IntoIterator<Item = node::PublicKey>) -> anyhow::Result<Self> {
        let mut set = BTreeSet::new();
        for k in keys {
            anyhow::ensure!(set.insert(k), "duplicate committee member {k:?}");
        }
        anyhow::ensure!(!set.is_empty(), "committee must contain at least one member");
        Ok(Self { keys: set })
    }

    /// Members, in key order.
    pub fn iter(&self) -> impl Iterator<Item = &node::PublicKey> {
        self.keys.iter()
    }

    /// Number of members.
    #[allow(clippy::len_without_is_empty)] // a valid `Committee` is non-empty by construction
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether `key` is a member.
    pub fn contains(&self, key: &node::PublicKey) -> bool {
        self.keys.contains(key)
    }

    /// Number of signatures which finalize a snapshot.
    pub fn threshold(&self) -> usize {
        threshold(self.len())
    }
}

/// Finalization threshold for a committee of `n` members: more than two thirds.
pub fn threshold(n: usize) -> usize {
    n * 2 / 3 + 1
}
