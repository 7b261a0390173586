//! Arbitrary-precision token amounts.
//!
//! [`TokenAmount`] wraps a 256-bit unsigned integer ([`alloy_primitives::U256`])
//! and crosses every boundary — JSON, database, chain — as a decimal
//! string. Floating point is never used for token-unit math.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::U256;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A non-negative token amount in the smallest indivisible unit (wei).
///
/// Stored and serialized as a decimal string; arithmetic is checked so
/// that overflow and underflow surface as `None` instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TokenAmount(U256);

/// Error returned when a decimal amount string cannot be parsed.
#[derive(Debug, thiserror::Error)]
#[error("invalid token amount: {0}")]
pub struct ParseAmountError(String);

impl TokenAmount {
    /// The zero amount.
    pub const ZERO: Self = Self(U256::ZERO);

    /// Parses an amount from a decimal string.
    ///
    /// # Errors
    ///
    /// Returns [`ParseAmountError`] if the string is empty, contains
    /// non-digit characters, or exceeds 256 bits.
    pub fn parse(s: &str) -> Result<Self, ParseAmountError> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseAmountError(s.to_string()));
        }
        U256::from_str_radix(s, 10)
            .map(Self)
            .map_err(|_| ParseAmountError(s.to_string()))
    }

    /// Interprets a 32-byte big-endian word as an amount.
    ///
    /// Returns `None` if the slice is longer than 32 bytes.
    #[must_use]
    pub fn from_be_word(word: &[u8]) -> Option<Self> {
        U256::try_from_be_slice(word).map(Self)
    }

    /// Wraps a raw [`U256`] value.
    #[must_use]
    pub const fn from_u256(value: U256) -> Self {
        Self(value)
    }

    /// Returns the inner [`U256`].
    #[must_use]
    pub const fn as_u256(&self) -> &U256 {
        &self.0
    }

    /// Returns `true` if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checked addition; `None` on 256-bit overflow.
    #[must_use]
    pub fn checked_add(&self, rhs: &Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Checked subtraction; `None` when `rhs` exceeds `self`.
    ///
    /// This is the primitive behind the non-negativity invariant: a
    /// cached balance can never underflow below zero.
    #[must_use]
    pub fn checked_sub(&self, rhs: &Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // U256 displays in decimal.
        write!(f, "{}", self.0)
    }
}

impl FromStr for TokenAmount {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<u64> for TokenAmount {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(D::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        let Ok(amount) = TokenAmount::parse("123456789000000000000000000") else {
            panic!("valid amount");
        };
        assert_eq!(amount.to_string(), "123456789000000000000000000");
    }

    #[test]
    fn rejects_non_decimal_input() {
        assert!(TokenAmount::parse("").is_err());
        assert!(TokenAmount::parse("-5").is_err());
        assert!(TokenAmount::parse("0x10").is_err());
        assert!(TokenAmount::parse("12.5").is_err());
    }

    #[test]
    fn checked_sub_refuses_underflow() {
        let a = TokenAmount::from(100);
        let b = TokenAmount::from(150);
        assert!(a.checked_sub(&b).is_none());
        let Some(diff) = b.checked_sub(&a) else {
            panic!("subtraction should succeed");
        };
        assert_eq!(diff, TokenAmount::from(50));
    }

    #[test]
    fn from_be_word_reads_abi_amounts() {
        let mut word = [0u8; 32];
        word[31] = 0x2a;
        let Some(amount) = TokenAmount::from_be_word(&word) else {
            panic!("valid word");
        };
        assert_eq!(amount, TokenAmount::from(42));
        assert!(TokenAmount::from_be_word(&[0u8; 33]).is_none());
    }

    #[test]
    fn serde_uses_decimal_strings() {
        let amount = TokenAmount::from(1000);
        let Ok(json) = serde_json::to_string(&amount) else {
            panic!("serialization failed");
        };
        assert_eq!(json, "\"1000\"");
        let Ok(back) = serde_json::from_str::<TokenAmount>(&json) else {
            panic!("deserialization failed");
        };
        assert_eq!(back, amount);
    }
}
