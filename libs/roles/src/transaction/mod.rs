//! Value transfers carried by snapshots.
//!
//! Transactions are validated and applied outside of the intake pipeline;
//! here they are opaque payloads with a stable identity and encoding.
use crate::{node, proto, serde_util::keccak_id};
use anyhow::Context as _;
use meridian_crypto::keccak256::Keccak256;

mod amount;
mod conv;
mod testonly;
#[cfg(test)]
mod tests;

pub use amount::*;

/// Current transaction format version.
pub const VERSION: u32 = 1;

keccak_id!(
    /// Identity of a transaction: Keccak-256 of its encoding without input signatures.
    TxHash
);

keccak_id!(
    /// Identifier of an asset.
    AssetId
);

keccak_id!(
    /// Identifier of an external chain deposits come from.
    ChainId
);

keccak_id!(
    /// Identifier of a network, derived from its genesis.
    NetworkId
);

/// Output kinds.
pub mod output_kind {
    /// Spendable by the listed keys.
    pub const SCRIPT: u8 = 0x00;
    /// Stake of a genesis node.
    pub const NODE_PLEDGE: u8 = 0xa3;
    /// Balance of a genesis domain.
    pub const DOMAIN_ACCEPT: u8 = 0xb1;
}

/// Mint of value at network creation.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GenesisInput {
    /// Network being created.
    pub network: NetworkId,
    /// Position within the genesis set.
    pub index: u64,
}

/// Value entering the network from an external chain.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DepositData {
    /// Source chain.
    pub chain: ChainId,
    /// Asset contract on the source chain.
    pub asset: String,
    /// Transaction on the source chain.
    pub transaction: String,
    /// Output index of that transaction.
    pub index: u64,
    /// Deposited amount.
    pub amount: Amount,
}

/// Reference to an output of an earlier transaction.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UtxoInput {
    /// Transaction holding the output.
    pub hash: TxHash,
    /// Index of the output.
    pub index: u64,
}

/// Transaction input.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Input {
    /// Genesis mint.
    Genesis(GenesisInput),
    /// External deposit.
    Deposit(DepositData),
    /// Spend of an unspent output.
    Utxo(UtxoInput),
}

/// Transaction output.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Output {
    /// One of [`output_kind`].
    #[serde(rename = "type")]
    pub kind: u8,
    /// Transferred amount.
    pub amount: Amount,
    /// Spending condition.
    #[serde(with = "crate::serde_util::hex_bytes")]
    pub script: Vec<u8>,
    /// Keys which control the output.
    pub keys: Vec<node::PublicKey>,
}

/// Unsigned transaction.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Transaction {
    /// Format version.
    pub version: u32,
    /// Transferred asset.
    pub asset: AssetId,
    /// Inputs.
    pub inputs: Vec<Input>,
    /// Outputs.
    pub outputs: Vec<Output>,
    /// Free form payload.
    #[serde(default, with = "crate::serde_util::hex_bytes")]
    pub extra: Vec<u8>,
}

impl Transaction {
    /// Empty transaction of `asset`.
    pub fn new(asset: AssetId) -> Self {
        Self {
            version: VERSION,
            asset,
            inputs: vec![],
            outputs: vec![],
            extra: vec![],
        }
    }

    /// Identity of the transaction.
    pub fn hash(&self) -> TxHash {
        TxHash(Keccak256::new(&proto::encode(self)))
    }

    /// Adds a script output spendable by `keys`.
    pub fn add_script_output(&mut self, keys: Vec<node::PublicKey>, script: Vec<u8>, amount: Amount) {
        self.outputs.push(Output {
            kind: output_kind::SCRIPT,
            amount,
            script,
            keys,
        });
    }
}

/// Transaction with the signatures authorizing each of its inputs.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SignedTransaction {
    /// Signed transaction.
    #[serde(flatten)]
    pub transaction: Transaction,
    /// `signatures[i]` authorize `inputs[i]`.
    pub signatures: Vec<Vec<node::Signature>>,
}

impl SignedTransaction {
    /// Signs every input with all of `keys`.
    pub fn sign(transaction: Transaction, keys: &[node::SecretKey]) -> Self {
        let hash = transaction.hash();
        let sigs: Vec<_> = keys.iter().map(|k| k.sign(&hash.0)).collect();
        Self {
            signatures: vec![sigs; transaction.inputs.len()],
            transaction,
        }
    }

    /// Identity of the underlying transaction.
    pub fn hash(&self) -> TxHash {
        self.transaction.hash()
    }

    /// Checks that input `i` carries a valid signature from each of `keys`, in order.
    pub fn verify_input(&self, i: usize, keys: &[node::PublicKey]) -> anyhow::Result<()> {
        let sigs = self.signatures.get(i).context("no such input")?;
        anyhow::ensure!(sigs.len() == keys.len(), "expected {} signatures", keys.len());
        let hash = self.hash();
        for (key, sig) in keys.iter().zip(sigs) {
            key.verify(&hash.0, sig).with_context(|| format!("{key:?}"))?;
        }
        Ok(())
    }
}
