use super::{
    Amount, AssetId, ChainId, DepositData, GenesisInput, Input, NetworkId, Output,
    SignedTransaction, Transaction, TxHash, UtxoInput,
};
use crate::{
    node,
    proto::{read_repeated, read_required, required, schema, ProtoFmt},
};
use anyhow::Context as _;
use meridian_crypto::ByteFmt;

impl ProtoFmt for Input {
    type Proto = schema::Input;
    fn read(r: &Self::Proto) -> anyhow::Result<Self> {
        use schema::input::T;
        Ok(match required(&r.t)? {
            T::Genesis(r) => Self::Genesis(GenesisInput {
                network: NetworkId(ByteFmt::decode(required(&r.network).context("network")?)?),
                index: *required(&r.index).context("index")?,
            }),
            T::Deposit(r) => Self::Deposit(DepositData {
                chain: ChainId(ByteFmt::decode(required(&r.chain).context("chain")?)?),
                asset: required(&r.asset).context("asset")?.clone(),
                transaction: required(&r.transaction).context("transaction")?.clone(),
                index: *required(&r.index).context("index")?,
                amount: Amount(*required(&r.amount).context("amount")?),
            }),
            T::Utxo(r) => Self::Utxo(UtxoInput {
                hash: TxHash(ByteFmt::decode(required(&r.hash).context("hash")?)?),
                index: *required(&r.index).context("index")?,
            }),
        })
    }
    fn build(&self) -> Self::Proto {
        use schema::input::T;
        let t = match self {
            Self::Genesis(x) => T::Genesis(schema::GenesisInput {
                network: Some(x.network.0.encode()),
                index: Some(x.index),
            }),
            Self::Deposit(x) => T::Deposit(schema::DepositInput {
                chain: Some(x.chain.0.encode()),
                asset: Some(x.asset.clone()),
                transaction: Some(x.transaction.clone()),
                index: Some(x.index),
                amount: Some(x.amount.0),
            }),
            Self::Utxo(x) => T::Utxo(schema::UtxoInput {
                hash: Some(x.hash.0.encode()),
                index: Some(x.index),
            }),
        };
        Self::Proto { t: Some(t) }
    }
}

impl ProtoFmt for Output {
    type Proto = schema::Output;
    fn read(r: &Self::Proto) -> anyhow::Result<Self> {
        let kind = *required(&r.kind).context("kind")?;
        Ok(Self {
            kind: kind.try_into().context("kind")?,
            amount: Amount(*required(&r.amount).context("amount")?),
            script: required(&r.script).context("script")?.clone(),
            keys: r
                .keys
                .iter()
                .map(|k| <node::PublicKey as ByteFmt>::decode(k))
                .collect::<Result<_, _>>()
                .context("keys")?,
        })
    }
    fn build(&self) -> Self::Proto {
        Self::Proto {
            kind: Some(self.kind.into()),
            amount: Some(self.amount.0),
            script: Some(self.script.clone()),
            keys: self.keys.iter().map(ByteFmt::encode).collect(),
        }
    }
}

impl ProtoFmt for Transaction {
    type Proto = schema::Transaction;
    fn read(r: &Self::Proto) -> anyhow::Result<Self> {
        Ok(Self {
            version: *required(&r.version).context("version")?,
            asset: AssetId(ByteFmt::decode(required(&r.asset).context("asset")?)?),
            inputs: read_repeated(&r.inputs).context("inputs")?,
            outputs: read_repeated(&r.outputs).context("outputs")?,
            extra: r.extra.clone().unwrap_or_default(),
        })
    }
    fn build(&self) -> Self::Proto {
        Self::Proto {
            version: Some(self.version),
            asset: Some(self.asset.0.encode()),
            inputs: self.inputs.iter().map(ProtoFmt::build).collect(),
            outputs: self.outputs.iter().map(ProtoFmt::build).collect(),
            extra: Some(self.extra.clone()),
        }
    }
}

impl ProtoFmt for SignedTransaction {
    type Proto = schema::SignedTransaction;
    fn read(r: &Self::Proto) -> anyhow::Result<Self> {
        let transaction: Transaction = read_required(&r.transaction).context("transaction")?;
        let signatures = r
            .signatures
            .iter()
            .map(|s| {
                s.sigs
                    .iter()
                    .map(|sig| <node::Signature as ByteFmt>::decode(sig))
                    .collect::<anyhow::Result<Vec<_>>>()
            })
            .collect::<anyhow::Result<Vec<_>>>()
            .context("signatures")?;
        anyhow::ensure!(
            signatures.len() == transaction.inputs.len(),
            "got {} signature lists for {} inputs",
            signatures.len(),
            transaction.inputs.len()
        );
        Ok(Self {
            transaction,
            signatures,
        })
    }
    fn build(&self) -> Self::Proto {
        Self::Proto {
            transaction: Some(self.transaction.build()),
            signatures: self
                .signatures
                .iter()
                .map(|sigs| schema::InputSignatures {
                    sigs: sigs.iter().map(ByteFmt::encode).collect(),
                })
                .collect(),
        }
    }
}
