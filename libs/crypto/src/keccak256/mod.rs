//! Keccak-256 digests.
use crate::{ByteFmt, Text, TextFmt};
use sha3::Digest as _;
use std::fmt;

#[cfg(test)]
mod tests;
pub mod testonly;

/// Keccak-256 digest.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Keccak256(pub(crate) [u8; 32]);

impl Keccak256 {
    /// Digest of `msg`.
    pub fn new(msg: &[u8]) -> Self {
        Self(sha3::Keccak256::digest(msg).into())
    }

    /// Digest of the concatenation of `parts`.
    pub fn chain<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut h = sha3::Keccak256::new();
        for p in parts {
            h.update(p);
        }
        Self(h.finalize().into())
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex, without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; 32]> for Keccak256 {
    fn from(raw: [u8; 32]) -> Self {
        Self(raw)
    }
}

impl ByteFmt for Keccak256 {
    fn decode(bytes: &[u8]) -> anyhow::Result<Self> {
        Ok(Self(bytes.try_into()?))
    }

    fn encode(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

/// Bare 64 char hex, the way hashes are exchanged over RPC.
impl TextFmt for Keccak256 {
    fn decode(text: Text) -> anyhow::Result<Self> {
        text.decode_hex()
    }

    fn encode(&self) -> String {
        self.to_hex()
    }
}

impl fmt::Display for Keccak256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Keccak256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is enough to tell hashes apart in logs.
        write!(f, "keccak256:{}", &self.to_hex()[..16])
    }
}
