//! Canonical binary encoding of the domain types.
//!
//! Messages are declared directly with `prost` derives. prost writes fields
//! in tag order and repeated fields in their given order, so for a fixed value
//! the encoding is deterministic, which hashing and signing rely on.
use anyhow::Context as _;
use prost::Message as _;

/// Conversion between a domain type and its wire message.
pub trait ProtoFmt: Sized {
    /// Wire message.
    type Proto: prost::Message + Default;
    /// Validates and converts the wire message.
    fn read(r: &Self::Proto) -> anyhow::Result<Self>;
    /// Converts to the wire message.
    fn build(&self) -> Self::Proto;
}

/// Encodes `x` to bytes.
pub fn encode<T: ProtoFmt>(x: &T) -> Vec<u8> {
    x.build().encode_to_vec()
}

/// Decodes and validates bytes produced by [`encode`].
pub fn decode<T: ProtoFmt>(bytes: &[u8]) -> anyhow::Result<T> {
    T::read(&T::Proto::decode(bytes)?)
}

/// Field which has to be set.
pub fn required<T>(field: &Option<T>) -> anyhow::Result<&T> {
    field.as_ref().context("missing field")
}

/// Message field which has to be set, converted.
pub fn read_required<T: ProtoFmt>(field: &Option<T::Proto>) -> anyhow::Result<T> {
    T::read(required(field)?)
}

/// Repeated message field, converted element-wise.
pub fn read_repeated<T: ProtoFmt>(field: &[T::Proto]) -> anyhow::Result<Vec<T>> {
    field
        .iter()
        .enumerate()
        .map(|(i, r)| T::read(r).with_context(|| i.to_string()))
        .collect()
}

/// Wire messages.
#[allow(missing_docs)]
pub mod schema {
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Transaction {
        #[prost(uint32, optional, tag = "1")]
        pub version: Option<u32>,
        #[prost(bytes = "vec", optional, tag = "2")]
        pub asset: Option<Vec<u8>>,
        #[prost(message, repeated, tag = "3")]
        pub inputs: Vec<Input>,
        #[prost(message, repeated, tag = "4")]
        pub outputs: Vec<Output>,
        #[prost(bytes = "vec", optional, tag = "5")]
        pub extra: Option<Vec<u8>>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Input {
        #[prost(oneof = "input::T", tags = "1, 2, 3")]
        pub t: Option<input::T>,
    }

    pub mod input {
        #[derive(Clone, PartialEq, prost::Oneof)]
        pub enum T {
            #[prost(message, tag = "1")]
            Genesis(super::GenesisInput),
            #[prost(message, tag = "2")]
            Deposit(super::DepositInput),
            #[prost(message, tag = "3")]
            Utxo(super::UtxoInput),
        }
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct GenesisInput {
        #[prost(bytes = "vec", optional, tag = "1")]
        pub network: Option<Vec<u8>>,
        #[prost(uint64, optional, tag = "2")]
        pub index: Option<u64>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct DepositInput {
        #[prost(bytes = "vec", optional, tag = "1")]
        pub chain: Option<Vec<u8>>,
        #[prost(string, optional, tag = "2")]
        pub asset: Option<String>,
        #[prost(string, optional, tag = "3")]
        pub transaction: Option<String>,
        #[prost(uint64, optional, tag = "4")]
        pub index: Option<u64>,
        #[prost(uint64, optional, tag = "5")]
        pub amount: Option<u64>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct UtxoInput {
        #[prost(bytes = "vec", optional, tag = "1")]
        pub hash: Option<Vec<u8>>,
        #[prost(uint64, optional, tag = "2")]
        pub index: Option<u64>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Output {
        #[prost(uint32, optional, tag = "1")]
        pub kind: Option<u32>,
        #[prost(uint64, optional, tag = "2")]
        pub amount: Option<u64>,
        #[prost(bytes = "vec", optional, tag = "3")]
        pub script: Option<Vec<u8>>,
        #[prost(bytes = "vec", repeated, tag = "4")]
        pub keys: Vec<Vec<u8>>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct InputSignatures {
        #[prost(bytes = "vec", repeated, tag = "1")]
        pub sigs: Vec<Vec<u8>>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct SignedTransaction {
        #[prost(message, optional, tag = "1")]
        pub transaction: Option<Transaction>,
        #[prost(message, repeated, tag = "2")]
        pub signatures: Vec<InputSignatures>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct SnapshotSignature {
        #[prost(bytes = "vec", optional, tag = "1")]
        pub signer: Option<Vec<u8>>,
        #[prost(bytes = "vec", optional, tag = "2")]
        pub sig: Option<Vec<u8>>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Snapshot {
        #[prost(uint32, optional, tag = "1")]
        pub version: Option<u32>,
        #[prost(message, optional, tag = "2")]
        pub transaction: Option<SignedTransaction>,
        #[prost(message, repeated, tag = "3")]
        pub signatures: Vec<SnapshotSignature>,
    }
}
