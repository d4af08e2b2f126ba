//! Test-only utilities.
use super::{Genesis, GenesisDomain, GenesisNode, Snapshot, SnapshotSignature};
use crate::{node, transaction::Amount};
use rand::{
    distributions::{Distribution, Standard},
    Rng,
};

/// Genesis of a local network of `nodes` nodes and one domain.
/// Returns the genesis and the node keys, in genesis order.
pub fn localnet(rng: &mut impl Rng, nodes: usize) -> (Genesis, Vec<node::SecretKey>) {
    let keys: Vec<node::SecretKey> = (0..nodes).map(|_| rng.gen()).collect();
    let genesis = Genesis {
        epoch: 1_700_000_000,
        nodes: keys
            .iter()
            .map(|k| GenesisNode {
                signer: k.public(),
                payee: rng.gen::<node::SecretKey>().public(),
                balance: Amount::whole(10_000),
            })
            .collect(),
        domains: vec![GenesisDomain {
            signer: keys[0].public(),
            balance: Amount::whole(50_000),
        }],
    };
    (genesis, keys)
}

impl Distribution<SnapshotSignature> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SnapshotSignature {
        SnapshotSignature {
            signer: rng.gen::<node::SecretKey>().public(),
            sig: rng.gen(),
        }
    }
}

impl Distribution<Snapshot> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Snapshot {
        Snapshot::new(rng.gen())
    }
}
