//! Byte and human readable encodings of cryptographic values.
use anyhow::Context as _;

/// Text being parsed by [`TextFmt::decode`]. Remembers the already consumed
/// prefix, so that errors can point at the failing position.
#[derive(Debug, Clone, Copy)]
pub struct Text<'a> {
    full: &'a str,
    rest: &'a str,
}

impl<'a> Text<'a> {
    /// Text to be parsed.
    pub fn new(s: &'a str) -> Self {
        Self { full: s, rest: s }
    }

    fn consumed(&self) -> &'a str {
        // `rest` is always a suffix of `full`.
        &self.full[..self.full.len() - self.rest.len()]
    }

    /// Consumes a fixed prefix.
    pub fn strip(mut self, prefix: &str) -> anyhow::Result<Self> {
        let Some(rest) = self.rest.strip_prefix(prefix) else {
            anyhow::bail!("{:?}: expected {prefix:?}, got {:?}", self.consumed(), self.rest);
        };
        self.rest = rest;
        Ok(self)
    }

    /// Decodes the remaining text as hex-encoded [`ByteFmt`].
    pub fn decode_hex<T: ByteFmt>(self) -> anyhow::Result<T> {
        let raw = hex::decode(self.rest).with_context(|| format!("{:?}", self.consumed()))?;
        ByteFmt::decode(&raw).with_context(|| format!("{:?}", self.consumed()))
    }

    /// `t.decode::<T>()` for `<T as TextFmt>::decode(t)`.
    pub fn decode<T: TextFmt>(self) -> anyhow::Result<T> {
        TextFmt::decode(self)
    }
}

/// Human readable encoding, used in configs and on the RPC surface.
///
/// `decode(encode(x)) == x` must hold, and encodings of different kinds of
/// values must not be mistaken for each other (hence the type prefixes of keys).
pub trait TextFmt: Sized {
    /// Parses the text form.
    fn decode(text: Text) -> anyhow::Result<Self>;
    /// Renders the text form.
    fn encode(&self) -> String;
}

/// Canonical byte encoding, used for hashing, signing and storage.
pub trait ByteFmt: Sized {
    /// Parses the byte form.
    fn decode(bytes: &[u8]) -> anyhow::Result<Self>;
    /// Renders the byte form.
    fn encode(&self) -> Vec<u8>;
}
