//! # Utility Functions
//!
//! Hashing, identifier generation and calendar helpers shared by the ledger
//! and its front ends.

use chrono::{DateTime, NaiveDate, Utc};
use sha2::{Digest, Sha256};

use crate::{error::Result, LedgerError};

/// Calendar format used for event deadlines
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Generate a fresh event id (UUID v4, simple form)
pub fn generate_event_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Hash a message using SHA256
pub fn sha256_hash(message: &str) -> String {
    sha256_hex(message.as_bytes())
}

/// Hex-encoded SHA256 of raw bytes
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(sha256_digest(bytes))
}

pub fn sha256_digest(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Parse a `YYYY-MM-DD` calendar date
pub fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), DATE_FORMAT)
        .map_err(|e| LedgerError::InvalidDate(format!("{date_str}: {e}")))
}

/// Parse an RFC 3339 timestamp
pub fn parse_timestamp(timestamp_str: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(timestamp_str.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LedgerError::InvalidDate(format!("{timestamp_str}: {e}")))
}

/// Format timestamp as human-readable string
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
