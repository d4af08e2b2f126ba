//! serde adapters for the JSON forms used in configs and RPC.
use meridian_crypto::{Text, TextFmt};
use serde::{de::Error as _, Deserialize as _, Deserializer, Serializer};

/// `Vec<u8>` as a bare hex string.
pub(crate) mod hex_bytes {
    use serde::{de::Error as _, Deserialize as _, Deserializer, Serializer};

    pub(crate) fn serialize<S: Serializer>(v: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(v))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        hex::decode(String::deserialize(d)?).map_err(D::Error::custom)
    }
}

/// Serializes a [`TextFmt`] value as its text form.
pub(crate) fn serialize_text<T: TextFmt, S: Serializer>(v: &T, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&v.encode())
}

/// Deserializes a [`TextFmt`] value from its text form.
pub(crate) fn deserialize_text<'de, T: TextFmt, D: Deserializer<'de>>(
    d: D,
) -> Result<T, D::Error> {
    let s = String::deserialize(d)?;
    Text::new(&s).decode().map_err(|err| D::Error::custom(format!("{err:#}")))
}

/// Implements `Serialize`/`Deserialize` through `TextFmt`.
macro_rules! serde_via_text {
    ($t:ty) => {
        impl serde::Serialize for $t {
            fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                $crate::serde_util::serialize_text(self, s)
            }
        }

        impl<'de> serde::Deserialize<'de> for $t {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                $crate::serde_util::deserialize_text(d)
            }
        }
    };
}

pub(crate) use serde_via_text;

/// Declares a Keccak-256 based identifier, encoded as bare hex in text and JSON.
macro_rules! keccak_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub meridian_crypto::keccak256::Keccak256);

        impl meridian_crypto::TextFmt for $name {
            fn decode(text: meridian_crypto::Text) -> anyhow::Result<Self> {
                text.decode_hex().map(Self)
            }
            fn encode(&self) -> String {
                self.0.to_hex()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}:{}", stringify!($name), &self.0.to_hex()[..16])
            }
        }

        impl rand::distributions::Distribution<$name> for rand::distributions::Standard {
            fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> $name {
                $name(rng.gen())
            }
        }

        $crate::serde_util::serde_via_text!($name);
    };
}

pub(crate) use keccak_id;
