use rand::{
    rngs::{OsRng, StdRng},
    Rng as _, SeedableRng as _,
};
use sha3::{Digest as _, Keccak256};
use std::sync::atomic::{AtomicU64, Ordering};

/// Deterministic RNG source for tests.
///
/// Each context derives its seed from the path leading to it in the context
/// tree: the hasher state of the parent extended with the index of the child.
pub(super) struct SplitProvider {
    prefix: Keccak256,
    next: AtomicU64,
}

impl SplitProvider {
    fn branch(&self) -> Keccak256 {
        let i = self.next.fetch_add(1, Ordering::SeqCst);
        self.prefix.clone().chain_update(i.to_le_bytes())
    }
}

pub(super) enum Provider {
    Os,
    Split(Box<SplitProvider>),
}

impl Provider {
    pub(super) fn real() -> Self {
        Self::Os
    }

    pub(super) fn test() -> Self {
        Self::Split(Box::new(SplitProvider {
            prefix: Keccak256::new().chain_update(b"meridian-test-rng"),
            next: AtomicU64::new(0),
        }))
    }

    pub(super) fn split(&self) -> Self {
        match self {
            Self::Os => Self::Os,
            Self::Split(p) => Self::Split(Box::new(SplitProvider {
                prefix: p.branch(),
                next: AtomicU64::new(0),
            })),
        }
    }

    pub(super) fn rng(&self) -> StdRng {
        StdRng::from_seed(match self {
            Self::Os => OsRng.gen(),
            Self::Split(p) => p.branch().finalize().into(),
        })
    }
}
