//! ed25519 signatures, as a thin adapter over `ed25519_dalek`.
use crate::ByteFmt;
use anyhow::Context as _;
use ed::{Signer as _, Verifier as _};
use ed25519_dalek as ed;
use std::fmt;

pub mod testonly;
#[cfg(test)]
mod tests;

/// ed25519 secret key.
#[derive(Clone)]
pub struct SecretKey(ed::SigningKey);

impl SecretKey {
    /// Fresh key from OS entropy.
    pub fn generate() -> Self {
        Self(ed::SigningKey::generate(&mut rand::rngs::OsRng))
    }

    /// Signs `msg`.
    pub fn sign(&self, msg: &[u8]) -> Signature {
        Signature(self.0.sign(msg))
    }

    /// Matching public key.
    pub fn public(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material.
        f.debug_tuple("SecretKey").field(&self.public()).finish()
    }
}

impl ByteFmt for SecretKey {
    fn decode(bytes: &[u8]) -> anyhow::Result<Self> {
        let bytes: &ed::SecretKey = bytes.try_into()?;
        Ok(Self(ed::SigningKey::from_bytes(bytes)))
    }

    fn encode(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }
}

/// ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(ed::VerifyingKey);

impl PublicKey {
    /// Checks `sig` against `msg`.
    pub fn verify(&self, msg: &[u8], sig: &Signature) -> Result<(), InvalidSignatureError> {
        self.0
            .verify(msg, &sig.0)
            .map_err(|_| InvalidSignatureError)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; ed::PUBLIC_KEY_LENGTH] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ed25519:{}", hex::encode(&self.as_bytes()[..8]))
    }
}

impl ByteFmt for PublicKey {
    fn decode(bytes: &[u8]) -> anyhow::Result<Self> {
        let bytes: &[u8; ed::PUBLIC_KEY_LENGTH] = bytes.try_into()?;
        ed::VerifyingKey::from_bytes(bytes)
            .context("invalid key material")
            .map(Self)
    }

    fn encode(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl std::hash::Hash for PublicKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write(self.as_bytes());
    }
}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

/// ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(ed::Signature);

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sig:{}", hex::encode(&self.0.to_bytes()[..8]))
    }
}

impl ByteFmt for Signature {
    fn decode(bytes: &[u8]) -> anyhow::Result<Self> {
        let bytes: &[u8; ed::SIGNATURE_LENGTH] = bytes.try_into()?;
        Ok(Self(ed::Signature::from_bytes(bytes)))
    }

    fn encode(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }
}

/// Signature does not match the message and key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid signature")]
pub struct InvalidSignatureError;
