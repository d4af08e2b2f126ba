use std::{fmt, str::FromStr};

/// Number of decimal places of an [`Amount`].
pub const DECIMALS: u32 = 8;
const UNIT: u64 = 10u64.pow(DECIMALS);

/// Non-negative fixed point amount with 8 decimal places.
/// Written as a decimal string, e.g. `"100.035"`.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(pub u64);

/// Malformed amount string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid amount {0:?}")]
pub struct ParseAmountError(String);

impl Amount {
    /// Amount of `units` whole units.
    pub const fn whole(units: u64) -> Self {
        Self(units * UNIT)
    }

    /// Sum, unless it overflows.
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }
}

impl FromStr for Amount {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseAmountError(s.to_owned());
        let (int, frac) = s.split_once('.').unwrap_or((s, ""));
        let digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
        if !digits(int) || !(frac.is_empty() || digits(frac)) || frac.len() > DECIMALS as usize {
            return Err(err());
        }
        let int: u64 = int.parse().map_err(|_| err())?;
        let frac: u64 = if frac.is_empty() {
            0
        } else {
            let scale = 10u64.pow(DECIMALS - frac.len() as u32);
            frac.parse::<u64>().map_err(|_| err())? * scale
        };
        int.checked_mul(UNIT)
            .and_then(|v| v.checked_add(frac))
            .map(Self)
            .ok_or_else(err)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:08}", self.0 / UNIT, self.0 % UNIT)
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl serde::Serialize for Amount {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Amount {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
