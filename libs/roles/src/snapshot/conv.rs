use super::{Snapshot, SnapshotSignature};
use crate::{
    node::{read_key, read_sig},
    proto::{read_repeated, read_required, required, schema, ProtoFmt},
};
use anyhow::Context as _;
use meridian_crypto::ByteFmt;

impl ProtoFmt for SnapshotSignature {
    type Proto = schema::SnapshotSignature;
    fn read(r: &Self::Proto) -> anyhow::Result<Self> {
        Ok(Self {
            signer: read_key(&r.signer).context("signer")?,
            sig: read_sig(&r.sig).context("sig")?,
        })
    }
    fn build(&self) -> Self::Proto {
        Self::Proto {
            signer: Some(self.signer.encode()),
            sig: Some(self.sig.encode()),
        }
    }
}

impl ProtoFmt for Snapshot {
    type Proto = schema::Snapshot;
    fn read(r: &Self::Proto) -> anyhow::Result<Self> {
        Ok(Self {
            version: *required(&r.version).context("version")?,
            transaction: read_required(&r.transaction).context("transaction")?,
            signatures: read_repeated(&r.signatures).context("signatures")?,
        })
    }
    fn build(&self) -> Self::Proto {
        Self::Proto {
            version: Some(self.version),
            transaction: Some(self.transaction.build()),
            signatures: self.signatures.iter().map(ProtoFmt::build).collect(),
        }
    }
}
