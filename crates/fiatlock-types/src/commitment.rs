//! 32-byte commitments handed to the engine instead of plaintext.
//!
//! - [`AccountLinesHash`]: binds an order to the seller's payment account
//!   without revealing it.
//! - [`TxIdHash`]: canonical hash of the fiat transaction ID. The verifier
//!   uses it as the anti-replay key.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::{FiatlockError, ids::parse_hex_array};

/// Separator byte preceding the account holder name.
const NAME_TAG: u8 = 0x14;
/// Separator byte preceding the account identifier.
const ACCOUNT_TAG: u8 = 0x15;

/// Commitment to a seller's payment account lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountLinesHash(pub [u8; 32]);

impl AccountLinesHash {
    pub const ZERO: Self = Self([0u8; 32]);

    /// `SHA-256(0x14 || account_name || 0x15 || account_id)`.
    ///
    /// Relays recompute this from the plaintext a seller submits and
    /// compare it against the hash stored on the order.
    #[must_use]
    pub fn compute(account_name: &str, account_id: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update([NAME_TAG]);
        hasher.update(account_name.as_bytes());
        hasher.update([ACCOUNT_TAG]);
        hasher.update(account_id.as_bytes());
        Self(hasher.finalize().into())
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for AccountLinesHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for AccountLinesHash {
    type Err = FiatlockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_array::<32>(s)
            .map(Self)
            .ok_or_else(|| FiatlockError::Configuration(format!("invalid 32-byte hash: {s}")))
    }
}

impl Serialize for AccountLinesHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AccountLinesHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Hash of the fiat payment's transaction ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct TxIdHash(pub [u8; 32]);

impl TxIdHash {
    /// `SHA-256(transaction_id)`.
    #[must_use]
    pub fn of(transaction_id: &str) -> Self {
        Self(Sha256::digest(transaction_id.as_bytes()).into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TxIdHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for TxIdHash {
    type Err = FiatlockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_array::<32>(s)
            .map(Self)
            .ok_or_else(|| FiatlockError::Configuration(format!("invalid 32-byte hash: {s}")))
    }
}

impl Serialize for TxIdHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TxIdHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_lines_hash_is_deterministic() {
        let a = AccountLinesHash::compute("Zhang San", "zhangsan@example.com");
        let b = AccountLinesHash::compute("Zhang San", "zhangsan@example.com");
        assert_eq!(a, b);
        assert!(!a.is_zero());
    }

    #[test]
    fn separators_prevent_field_shifting() {
        let a = AccountLinesHash::compute("ab", "c");
        let b = AccountLinesHash::compute("a", "bc");
        assert_ne!(a, b);
    }

    #[test]
    fn account_lines_hash_matches_manual_layout() {
        let mut preimage = vec![0x14];
        preimage.extend_from_slice(b"Li Si");
        preimage.push(0x15);
        preimage.extend_from_slice(b"13800000000");
        let expected: [u8; 32] = Sha256::digest(&preimage).into();
        assert_eq!(AccountLinesHash::compute("Li Si", "13800000000").0, expected);
    }

    #[test]
    fn tx_id_hash_hex_roundtrip() {
        let h = TxIdHash::of("2024011522001400001234567890");
        let parsed: TxIdHash = h.to_string().parse().unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn zero_hash_detected() {
        assert!(AccountLinesHash::ZERO.is_zero());
    }
}
