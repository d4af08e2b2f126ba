use crate::{proto::required, serde_util::serde_via_text};
pub use ed25519::InvalidSignatureError;
use meridian_crypto::{ed25519, keccak256::Keccak256, ByteFmt, Text, TextFmt};
use std::{fmt, sync::Arc};

/// A node's secret key.
#[derive(Clone)]
pub struct SecretKey(pub(super) Arc<ed25519::SecretKey>);

impl SecretKey {
    /// Fresh key from OS entropy.
    pub fn generate() -> Self {
        Self(Arc::new(ed25519::SecretKey::generate()))
    }

    /// Signs a 32 byte digest.
    pub fn sign(&self, digest: &Keccak256) -> Signature {
        Signature(self.0.sign(digest.as_bytes()))
    }

    /// Matching public key.
    pub fn public(&self) -> PublicKey {
        PublicKey(self.0.public())
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.public() == other.public()
    }
}

impl ByteFmt for SecretKey {
    fn encode(&self) -> Vec<u8> {
        ByteFmt::encode(&*self.0)
    }
    fn decode(bytes: &[u8]) -> anyhow::Result<Self> {
        ByteFmt::decode(bytes).map(|k| Self(Arc::new(k)))
    }
}

impl TextFmt for SecretKey {
    fn encode(&self) -> String {
        format!("node:secret:ed25519:{}", hex::encode(ByteFmt::encode(self)))
    }
    fn decode(text: Text) -> anyhow::Result<Self> {
        text.strip("node:secret:ed25519:")?.decode_hex()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<secret of {}>", TextFmt::encode(&self.public()))
    }
}

serde_via_text!(SecretKey);

/// A node's public key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicKey(pub(super) ed25519::PublicKey);

impl PublicKey {
    /// Checks a signature of `digest`.
    pub fn verify(&self, digest: &Keccak256, sig: &Signature) -> Result<(), InvalidSignatureError> {
        self.0.verify(digest.as_bytes(), &sig.0)
    }
}

impl ByteFmt for PublicKey {
    fn encode(&self) -> Vec<u8> {
        ByteFmt::encode(&self.0)
    }
    fn decode(bytes: &[u8]) -> anyhow::Result<Self> {
        ByteFmt::decode(bytes).map(Self)
    }
}

impl TextFmt for PublicKey {
    fn encode(&self) -> String {
        format!("node:public:ed25519:{}", hex::encode(ByteFmt::encode(self)))
    }
    fn decode(text: Text) -> anyhow::Result<Self> {
        text.strip("node:public:ed25519:")?.decode_hex()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&TextFmt::encode(self))
    }
}

serde_via_text!(PublicKey);

/// Signature of a digest by a node key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature(pub(super) ed25519::Signature);

impl ByteFmt for Signature {
    fn encode(&self) -> Vec<u8> {
        ByteFmt::encode(&self.0)
    }
    fn decode(bytes: &[u8]) -> anyhow::Result<Self> {
        ByteFmt::decode(bytes).map(Self)
    }
}

impl TextFmt for Signature {
    fn encode(&self) -> String {
        hex::encode(ByteFmt::encode(self))
    }
    fn decode(text: Text) -> anyhow::Result<Self> {
        text.decode_hex()
    }
}

serde_via_text!(Signature);

/// Reads a key stored as raw bytes in a wire message.
pub(crate) fn read_key(field: &Option<Vec<u8>>) -> anyhow::Result<PublicKey> {
    ByteFmt::decode(required(field)?)
}

/// Reads a signature stored as raw bytes in a wire message.
pub(crate) fn read_sig(field: &Option<Vec<u8>>) -> anyhow::Result<Signature> {
    ByteFmt::decode(required(field)?)
}
