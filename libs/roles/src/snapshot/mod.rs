//! Snapshots: the unit the committee agrees on.
//!
//! A snapshot wraps a signed transaction together with the signatures of
//! committee members who accepted it. The identity of a snapshot covers the
//! transaction only, so copies of the same snapshot carrying different
//! signature sets share one [`SnapshotHash`] and can be merged.
use crate::{
    node,
    proto::ProtoFmt as _,
    serde_util::keccak_id,
    transaction::SignedTransaction,
};
use anyhow::Context as _;
use meridian_crypto::keccak256::Keccak256;
use prost::Message as _;
use std::collections::BTreeSet;

mod committee;
mod conv;
mod genesis;
pub mod testonly;
#[cfg(test)]
mod tests;

pub use committee::*;
pub use genesis::*;

/// Current snapshot format version.
pub const VERSION: u32 = 1;

keccak_id!(
    /// Identity of a snapshot.
    SnapshotHash
);

/// Signature of a committee member over a [`SnapshotHash`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SnapshotSignature {
    /// Signing node.
    pub signer: node::PublicKey,
    /// Signature.
    pub sig: node::Signature,
}

/// A transaction and the committee signatures collected for it.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Snapshot {
    /// Format version.
    pub version: u32,
    /// Wrapped transaction.
    pub transaction: SignedTransaction,
    /// Committee signatures, at most one per signer.
    pub signatures: Vec<SnapshotSignature>,
}

impl Snapshot {
    /// Unsigned snapshot of `transaction`.
    pub fn new(transaction: SignedTransaction) -> Self {
        Self {
            version: VERSION,
            transaction,
            signatures: vec![],
        }
    }

    /// Identity: Keccak-256 of the encoding with the committee signatures left out.
    pub fn hash(&self) -> SnapshotHash {
        let mut p = self.build();
        p.signatures.clear();
        SnapshotHash(Keccak256::new(&p.encode_to_vec()))
    }

    /// Signs the snapshot identity with `key`.
    pub fn sign(&self, key: &node::SecretKey) -> SnapshotSignature {
        SnapshotSignature {
            signer: key.public(),
            sig: key.sign(&self.hash().0),
        }
    }

    /// Checks that `sig` is a valid signature of this snapshot.
    pub fn verify_signature(&self, sig: &SnapshotSignature) -> Result<(), node::InvalidSignatureError> {
        sig.signer.verify(&self.hash().0, &sig.sig)
    }

    /// Signers of the collected signatures.
    pub fn signers(&self) -> impl Iterator<Item = &node::PublicKey> {
        self.signatures.iter().map(|s| &s.signer)
    }

    /// Whether `key` has signed the snapshot.
    pub fn is_signed_by(&self, key: &node::PublicKey) -> bool {
        self.signers().any(|s| s == key)
    }

    /// Adds the signatures of signers not seen yet.
    /// Returns the number of added signatures. Signatures are not verified.
    pub fn merge_signatures(&mut self, sigs: impl IntoIterator<Item = SnapshotSignature>) -> usize {
        let mut seen: BTreeSet<_> = self.signers().copied().collect();
        let before = self.signatures.len();
        for sig in sigs {
            if seen.insert(sig.signer) {
                self.signatures.push(sig);
            }
        }
        self.signatures.len() - before
    }

    /// Verifies that every signature is a valid one from a distinct member of `committee`.
    pub fn verify(&self, committee: &Committee) -> anyhow::Result<()> {
        let hash = self.hash();
        let mut seen = BTreeSet::new();
        for sig in &self.signatures {
            anyhow::ensure!(committee.contains(&sig.signer), "{:?} is not in the committee", sig.signer);
            anyhow::ensure!(seen.insert(sig.signer), "{:?} signed twice", sig.signer);
            sig.signer
                .verify(&hash.0, &sig.sig)
                .with_context(|| format!("{:?}", sig.signer))?;
        }
        Ok(())
    }

    /// Whether enough committee members signed for the snapshot to be final.
    /// Counts distinct committee signers, without verifying the signatures.
    pub fn is_final(&self, committee: &Committee) -> bool {
        let signers: BTreeSet<_> = self.signers().filter(|s| committee.contains(s)).collect();
        signers.len() >= committee.threshold()
    }
}
