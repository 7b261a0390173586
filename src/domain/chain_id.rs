//! Chain identifiers.
//!
//! Chain ids are decimal strings rather than integers because several
//! networks use ids beyond the 32-bit range, and the ledger only ever
//! compares them for equality.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A numeric chain id carried as a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainId(String);

/// Error returned when a chain id is not a decimal number.
#[derive(Debug, thiserror::Error)]
#[error("invalid chain id: {0}")]
pub struct ParseChainIdError(String);

impl ChainId {
    /// Parses a chain id from a decimal string.
    ///
    /// # Errors
    ///
    /// Returns [`ParseChainIdError`] if the string is empty or contains
    /// non-digit characters.
    pub fn parse(s: &str) -> Result<Self, ParseChainIdError> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseChainIdError(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Returns the decimal string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ChainId {
    type Err = ParseChainIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<u64> for ChainId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl Serialize for ChainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(D::Error::custom)
    }
}
