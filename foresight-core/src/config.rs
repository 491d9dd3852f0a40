//! Ledger configuration.
//!
//! The configuration is fixed at genesis and travels with the ledger
//! snapshot, so every replica applies the same participation rules.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{error::Result, TRACKED_EVENT_COUNT};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct LedgerConfig {
    /// Number of events the registry must hold before participation opens
    pub tracked_events: usize,

    /// Accept submissions that leave some prediction slots unset
    pub allow_partial_predictions: bool,

    /// Oracle x-only public key (hex) trusted by the attestation oracle
    pub oracle_pubkey: Option<String>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            tracked_events: TRACKED_EVENT_COUNT,
            allow_partial_predictions: false,
            oracle_pubkey: None,
        }
    }
}

impl LedgerConfig {
    /// Load a JSON config file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw)?;
        debug!(path = %path.display(), ?config, "config loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.tracked_events, 3);
        assert!(!config.allow_partial_predictions);
        assert!(config.oracle_pubkey.is_none());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foresight.json");
        fs::write(&path, r#"{ "allow_partial_predictions": true }"#).unwrap();

        let config = LedgerConfig::load(&path).unwrap();
        assert!(config.allow_partial_predictions);
        assert_eq!(config.tracked_events, 3);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = LedgerConfig::load(dir.path().join("absent.json")).unwrap();
        assert_eq!(config, LedgerConfig::default());
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "tracked_events = 3").unwrap();
        assert!(LedgerConfig::load(&path).is_err());
    }
}
