//! Fiat payment rails.

use serde::{Deserialize, Serialize};

use crate::FiatlockError;

/// The fiat payment method an order is settled over.
///
/// Each rail has its own verifier, since receipt formats differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentRail {
    Alipay,
    Wechat,
}

impl PaymentRail {
    pub const ALL: [Self; 2] = [Self::Alipay, Self::Wechat];

    /// Numeric rail code used by relays (0 = Alipay, 1 = WeChat).
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Alipay => 0,
            Self::Wechat => 1,
        }
    }
}

impl TryFrom<u8> for PaymentRail {
    type Error = FiatlockError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Alipay),
            1 => Ok(Self::Wechat),
            other => Err(FiatlockError::Configuration(format!(
                "unknown payment rail code {other}"
            ))),
        }
    }
}

impl std::fmt::Display for PaymentRail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alipay => write!(f, "ALIPAY"),
            Self::Wechat => write!(f, "WECHAT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rail_codes_roundtrip() {
        for rail in PaymentRail::ALL {
            assert_eq!(PaymentRail::try_from(rail.code()).unwrap(), rail);
        }
        assert!(PaymentRail::try_from(7).is_err());
    }

    #[test]
    fn rail_serde_uses_screaming_case() {
        let json = serde_json::to_string(&PaymentRail::Wechat).unwrap();
        assert_eq!(json, "\"WECHAT\"");
    }
}
