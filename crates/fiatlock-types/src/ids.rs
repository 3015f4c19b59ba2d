//! Identifiers used throughout FiatLock.
//!
//! Participants and tokens are 20-byte account addresses. Order and trade
//! IDs are derived deterministically from their creation parameters and a
//! ledger-scoped sequence number, so a replayed ledger reproduces the same
//! IDs.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::FiatlockError;

/// Decode an optionally `0x`-prefixed hex string into a fixed-size array.
pub(crate) fn parse_hex_array<const N: usize>(s: &str) -> Option<[u8; N]> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    let bytes = hex::decode(digits).ok()?;
    bytes.try_into().ok()
}

/// First 16 bytes of a SHA-256 digest as a UUID.
fn uuid_from_digest(hasher: Sha256) -> Uuid {
    let hash = hasher.finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);
    Uuid::from_bytes(bytes)
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account address (seller, buyer, admin, token contract, pool).
///
/// Serialized as a lowercase `0x`-prefixed hex string so it can be used as
/// a JSON map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Self = Self([0u8; 20]);

    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Short form for log lines: first four bytes.
    #[must_use]
    pub fn short(&self) -> String {
        format!("0x{}", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = FiatlockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_array::<20>(s)
            .map(Self)
            .ok_or_else(|| FiatlockError::Configuration(format!("invalid address: {s}")))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Address {
    /// Random address for tests.
    #[must_use]
    pub fn random() -> Self {
        Self(rand::random::<[u8; 20]>())
    }
}

// ---------------------------------------------------------------------------
// OrderId
// ---------------------------------------------------------------------------

/// Unique sell-order identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OrderId(pub Uuid);

impl OrderId {
    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Deterministic `OrderId` from the order's creation parameters.
    ///
    /// `SHA-256("fiatlock:order_id:v1:" || seller || token || amount || rate || created_at || sequence)`,
    /// truncated to 16 bytes.
    #[must_use]
    pub fn derive(
        seller: &Address,
        token: &Address,
        total_amount: u128,
        exchange_rate: u64,
        created_at: i64,
        sequence: u64,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"fiatlock:order_id:v1:");
        hasher.update(seller.as_bytes());
        hasher.update(token.as_bytes());
        hasher.update(total_amount.to_le_bytes());
        hasher.update(exchange_rate.to_le_bytes());
        hasher.update(created_at.to_le_bytes());
        hasher.update(sequence.to_le_bytes());
        Self(uuid_from_digest(hasher))
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// TradeId
// ---------------------------------------------------------------------------

/// Unique trade identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TradeId(pub Uuid);

impl TradeId {
    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Deterministic `TradeId` from the fill parameters.
    ///
    /// Two fills by the same buyer for the same amount in the same second
    /// still differ through the ledger sequence number.
    #[must_use]
    pub fn derive(
        order_id: &OrderId,
        buyer: &Address,
        fiat_amount: u64,
        created_at: i64,
        sequence: u64,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"fiatlock:trade_id:v1:");
        hasher.update(order_id.0.as_bytes());
        hasher.update(buyer.as_bytes());
        hasher.update(fiat_amount.to_le_bytes());
        hasher.update(created_at.to_le_bytes());
        hasher.update(sequence.to_le_bytes());
        Self(uuid_from_digest(hasher))
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
