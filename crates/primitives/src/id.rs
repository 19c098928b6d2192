#[cfg(test)]
#[path = "tests/id.rs"]
mod tests;

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use rand::{thread_rng, RngCore};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const BYTES_LEN: usize = 16;

/// Opaque, collision-resistant identifier.
///
/// Sixteen random bytes, rendered base58. Not derivable from insertion
/// order, so issued values cannot be enumerated.
#[derive(Eq, Copy, Hash, Clone, Ord, PartialEq, PartialOrd)]
pub struct Id {
    bytes: [u8; BYTES_LEN],
}

impl Id {
    #[must_use]
    pub fn random() -> Self {
        let mut bytes = [0_u8; BYTES_LEN];
        thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; BYTES_LEN] {
        &self.bytes
    }
}

impl From<[u8; BYTES_LEN]> for Id {
    fn from(bytes: [u8; BYTES_LEN]) -> Self {
        Self { bytes }
    }
}

impl Deref for Id {
    type Target = [u8; BYTES_LEN];

    fn deref(&self) -> &Self::Target {
        &self.bytes
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&bs58::encode(&self.bytes).into_string())
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Id").field(&self.to_string()).finish()
    }
}

#[derive(Debug, Error)]
pub enum InvalidId {
    #[error("invalid base58: {0}")]
    Encoding(#[from] bs58::decode::Error),
    #[error("expected {BYTES_LEN} bytes, got {0}")]
    Length(usize),
}

impl FromStr for Id {
    type Err = InvalidId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = bs58::decode(s).into_vec()?;
        let bytes: [u8; BYTES_LEN] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| InvalidId::Length(decoded.len()))?;
        Ok(Self { bytes })
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(D::Error::custom)
    }
}
