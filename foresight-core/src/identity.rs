//! # Caller Identity
//!
//! Participant addresses and the per-operation transaction context. The
//! ledger never reads ambient state: who is calling and when the operation
//! is ordered are both handed in explicitly.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::Result, LedgerError};

/// Length in bytes of a participant address
pub const ADDRESS_LEN: usize = 20;

/// A stable participant address (`0x` followed by 40 hex characters).
///
/// Addresses are normalized to lowercase so that two spellings of the same
/// address always map to the same ledger slot.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Parse and normalize an address.
    pub fn parse(address: &str) -> Result<Self> {
        let hex_part = address
            .strip_prefix("0x")
            .or_else(|| address.strip_prefix("0X"))
            .ok_or_else(|| {
                LedgerError::InvalidAddress(format!("{address}: missing 0x prefix"))
            })?;

        let bytes = hex::decode(hex_part)
            .map_err(|e| LedgerError::InvalidAddress(format!("{address}: {e}")))?;
        if bytes.len() != ADDRESS_LEN {
            return Err(LedgerError::InvalidAddress(format!(
                "{address}: expected {ADDRESS_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        Ok(Self(format!("0x{}", hex::encode(bytes))))
    }

    /// The normalized hex form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

/// Who submitted an operation and where it sits in the ordered sequence.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TxContext {
    /// Identity of the caller
    pub caller: Address,
    /// Timestamp assigned to the operation by the ordering layer
    pub now: DateTime<Utc>,
}

impl TxContext {
    pub fn new(caller: Address, now: DateTime<Utc>) -> Self {
        Self { caller, now }
    }

    /// Context stamped with the local wall clock.
    pub fn at_wall_clock(caller: Address) -> Self {
        Self::new(caller, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_normalization() {
        let upper = Address::parse("0xABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCD").unwrap();
        let lower = Address::parse("0xabcdefabcdefabcdefabcdefabcdefabcdefabcd").unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.as_str(), "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd");
    }

    #[test]
    fn test_address_rejects_malformed() {
        assert!(Address::parse("abcdefabcdefabcdefabcdefabcdefabcdefabcd").is_err());
        assert!(Address::parse("0x1234").is_err());
        assert!(Address::parse("0xzzzzefabcdefabcdefabcdefabcdefabcdefabcd").is_err());
    }

    #[test]
    fn test_address_serde() {
        let address = Address::parse("0x00000000000000000000000000000000000000aa").unwrap();
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, "\"0x00000000000000000000000000000000000000aa\"");

        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
        assert!(serde_json::from_str::<Address>("\"0x12\"").is_err());
    }
}
