//! Lowercased chain addresses.
//!
//! EVM addresses are case-insensitive but arrive mixed-case (EIP-55
//! checksums, user input, RPC responses). [`ChainAddress`] lowercases at
//! the boundary so every comparison in the ledger is a plain equality.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A 20-byte EVM address, normalized to lowercase `0x`-prefixed hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainAddress(String);

/// Error returned when an address string is not 20-byte hex.
#[derive(Debug, thiserror::Error)]
#[error("invalid chain address: {0}")]
pub struct ParseAddressError(String);

impl ChainAddress {
    /// Parses and normalizes an address.
    ///
    /// # Errors
    ///
    /// Returns [`ParseAddressError`] unless the input is `0x` followed
    /// by exactly 40 hex digits (any case).
    pub fn parse(s: &str) -> Result<Self, ParseAddressError> {
        let body = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| ParseAddressError(s.to_string()))?;
        if body.len() != 40 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseAddressError(s.to_string()));
        }
        Ok(Self(format!("0x{}", body.to_ascii_lowercase())))
    }

    /// Builds an address from its 20 raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; 20]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    /// Returns the 20 raw bytes of the address.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 20] {
        let mut out = [0u8; 20];
        let decoded = hex::decode(self.0.strip_prefix("0x").unwrap_or_default()).unwrap_or_default();
        for (dst, src) in out.iter_mut().zip(decoded) {
            *dst = src;
        }
        out
    }

    /// The all-zero address, used by factory contracts to signal
    /// "no deployment".
    #[must_use]
    pub fn zero() -> Self {
        Self(format!("0x{}", "0".repeat(40)))
    }

    /// Returns `true` for the all-zero address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.bytes().skip(2).all(|b| b == b'0')
    }

    /// Returns the normalized `0x`-prefixed lowercase string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ChainAddress {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ChainAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ChainAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(D::Error::custom)
    }
}
