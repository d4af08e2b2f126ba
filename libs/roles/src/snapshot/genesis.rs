//! Genesis: the initial node set and balances of a network.
use super::{Committee, Snapshot};
use crate::{
    node,
    transaction::{
        output_kind, Amount, AssetId, GenesisInput, Input, NetworkId, Output, SignedTransaction,
        Transaction,
    },
};
use meridian_crypto::{keccak256::Keccak256, ByteFmt as _};
use std::collections::BTreeSet;

/// Asset of the genesis balances.
pub fn genesis_asset() -> AssetId {
    AssetId(Keccak256::new(b"XIN"))
}

/// Node present at genesis.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GenesisNode {
    /// Key the node signs snapshots with.
    pub signer: node::PublicKey,
    /// Key receiving the node's rewards.
    pub payee: node::PublicKey,
    /// Pledged stake.
    pub balance: Amount,
}

/// Domain present at genesis.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GenesisDomain {
    /// Key of the domain.
    pub signer: node::PublicKey,
    /// Accepted balance.
    pub balance: Amount,
}

/// Network genesis, as stored in the genesis file.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Genesis {
    /// Creation time, in seconds since the unix epoch.
    pub epoch: u64,
    /// Initial nodes. They form the committee.
    pub nodes: Vec<GenesisNode>,
    /// Initial domains.
    #[serde(default)]
    pub domains: Vec<GenesisDomain>,
}

impl Genesis {
    /// Checks that the genesis defines a valid committee.
    pub fn verify(&self) -> anyhow::Result<()> {
        self.committee()?;
        let mut keys = BTreeSet::new();
        for d in &self.domains {
            anyhow::ensure!(keys.insert(d.signer), "duplicate domain {:?}", d.signer);
        }
        Ok(())
    }

    /// Identity of the network, derived from the epoch and the node keys.
    pub fn network_id(&self) -> NetworkId {
        let epoch = self.epoch.to_be_bytes();
        let keys: Vec<_> = self.nodes.iter().map(|n| n.signer.encode()).collect();
        NetworkId(Keccak256::chain(
            std::iter::once(&epoch[..]).chain(keys.iter().map(Vec::as_slice)),
        ))
    }

    /// Committee formed by the genesis nodes.
    pub fn committee(&self) -> anyhow::Result<Committee> {
        Committee::new(self.nodes.iter().map(|n| n.signer))
    }

    /// Snapshots minting the genesis balances: one per node, then one per domain.
    /// They are final by construction and carry no signatures.
    pub fn snapshots(&self) -> Vec<Snapshot> {
        let network = self.network_id();
        let nodes = self.nodes.iter().map(|n| Output {
            kind: output_kind::NODE_PLEDGE,
            amount: n.balance,
            script: vec![],
            keys: vec![n.signer, n.payee],
        });
        let domains = self.domains.iter().map(|d| Output {
            kind: output_kind::DOMAIN_ACCEPT,
            amount: d.balance,
            script: vec![],
            keys: vec![d.signer],
        });
        nodes
            .chain(domains)
            .enumerate()
            .map(|(i, output)| {
                let mut tx = Transaction::new(genesis_asset());
                tx.inputs.push(Input::Genesis(GenesisInput {
                    network,
                    index: i as u64,
                }));
                tx.outputs.push(output);
                Snapshot::new(SignedTransaction {
                    transaction: tx,
                    signatures: vec![vec![]],
                })
            })
            .collect()
    }
}
