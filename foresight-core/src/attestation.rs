//! # Signed Attestation Oracle
//!
//! An [`OracleAdapter`] for deployments where a single oracle operator
//! certifies outcomes by signing them. The operator signs
//! `(event id, outcome, reason)` with a BIP-340 Schnorr key; the adapter
//! trusts exactly one x-only public key and only hands the ledger answers
//! whose signature verifies under it.
//!
//! Message format:
//!
//! ```text
//! ForesightEventId:{event_id} Outcome:{outcome} Reason:{sha256(reason)}
//! ```
//!
//! The signature covers the SHA-256 digest of that message.

use std::collections::BTreeMap;

use async_trait::async_trait;
use secp256k1::{schnorr, Keypair, Message, Secp256k1, SecretKey, XOnlyPublicKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::Result,
    oracle::{CertifiedOutcome, OracleAdapter, OracleError, OracleRequest},
    utils::{sha256_digest, sha256_hash},
    LedgerError,
};

/// Create the message an oracle signs for an outcome.
pub fn attestation_message(event_id: &str, outcome: &str, reason: &str) -> String {
    format!(
        "ForesightEventId:{} Outcome:{} Reason:{}",
        event_id,
        outcome,
        sha256_hash(reason)
    )
}

/// Parse a hex-encoded 32-byte x-only public key.
pub fn parse_oracle_pubkey(pubkey_hex: &str) -> Result<XOnlyPublicKey> {
    let bytes = hex::decode(pubkey_hex.trim())
        .map_err(|e| LedgerError::InvalidSignature(format!("Invalid oracle pubkey hex: {e}")))?;
    XOnlyPublicKey::from_slice(&bytes)
        .map_err(|e| LedgerError::InvalidSignature(format!("Invalid oracle pubkey: {e}")))
}

/// Generate a fresh oracle key pair as `(secret hex, x-only pubkey hex)`.
pub fn generate_oracle_keys() -> (String, String) {
    let secp = Secp256k1::new();
    let secret_key = SecretKey::new(&mut secp256k1::rand::thread_rng());
    let keypair = Keypair::from_secret_key(&secp, &secret_key);
    let (pubkey, _parity) = keypair.x_only_public_key();
    (
        hex::encode(secret_key.secret_bytes()),
        hex::encode(pubkey.serialize()),
    )
}

/// An outcome signed by the oracle operator.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Attestation {
    pub event_id: String,
    pub outcome: String,
    pub reason: String,
    /// Signer's x-only public key (hex)
    pub oracle_pubkey: String,
    /// 64-byte Schnorr signature (hex)
    pub signature: String,
}

impl Attestation {
    /// Sign an outcome with the oracle's 32-byte secret key (hex).
    pub fn sign(secret_key_hex: &str, event_id: &str, outcome: &str, reason: &str) -> Result<Self> {
        let secret_bytes = hex::decode(secret_key_hex.trim())
            .map_err(|e| LedgerError::InvalidSignature(format!("Invalid secret key hex: {e}")))?;
        if secret_bytes.len() != 32 {
            return Err(LedgerError::InvalidSignature(
                "Oracle secret key must be 32 bytes".to_string(),
            ));
        }

        let secp = Secp256k1::new();
        let secret_key = SecretKey::from_slice(&secret_bytes)
            .map_err(|e| LedgerError::InvalidSignature(format!("Invalid secret key: {e}")))?;
        let keypair = Keypair::from_secret_key(&secp, &secret_key);
        let (pubkey, _parity) = keypair.x_only_public_key();

        let message = Self::digest_message(event_id, outcome, reason);
        let signature = secp.sign_schnorr_no_aux_rand(&message, &keypair);

        Ok(Self {
            event_id: event_id.to_string(),
            outcome: outcome.to_string(),
            reason: reason.to_string(),
            oracle_pubkey: hex::encode(pubkey.serialize()),
            signature: hex::encode(signature.serialize()),
        })
    }

    fn digest_message(event_id: &str, outcome: &str, reason: &str) -> Message {
        let message = attestation_message(event_id, outcome, reason);
        Message::from_digest(sha256_digest(message.as_bytes()))
    }

    /// Check the signature against `oracle_pubkey`.
    pub fn verify(&self, oracle_pubkey: &XOnlyPublicKey) -> std::result::Result<(), OracleError> {
        if hex::encode(oracle_pubkey.serialize()) != self.oracle_pubkey.to_lowercase() {
            return Err(OracleError::MalformedResponse(
                "Oracle pubkey mismatch".to_string(),
            ));
        }

        let signature_bytes = hex::decode(&self.signature).map_err(|e| {
            OracleError::MalformedResponse(format!("Invalid signature hex: {e}"))
        })?;
        if signature_bytes.len() != 64 {
            return Err(OracleError::MalformedResponse(format!(
                "Invalid signature length: expected 64 bytes, got {}",
                signature_bytes.len()
            )));
        }
        let signature = schnorr::Signature::from_slice(&signature_bytes).map_err(|e| {
            OracleError::MalformedResponse(format!("Invalid signature format: {e}"))
        })?;

        let message = Self::digest_message(&self.event_id, &self.outcome, &self.reason);
        Secp256k1::verification_only()
            .verify_schnorr(&signature, &message, oracle_pubkey)
            .map_err(|_| OracleError::MalformedResponse("Invalid oracle signature".to_string()))
    }
}

/// Oracle adapter backed by pre-signed attestations.
#[derive(Clone, Debug)]
pub struct AttestationOracle {
    oracle_pubkey: XOnlyPublicKey,
    attestations: BTreeMap<String, Attestation>,
}

impl AttestationOracle {
    pub fn new(oracle_pubkey_hex: &str) -> Result<Self> {
        Ok(Self {
            oracle_pubkey: parse_oracle_pubkey(oracle_pubkey_hex)?,
            attestations: BTreeMap::new(),
        })
    }

    /// Register an attestation, replacing any earlier one for the same event.
    pub fn add_attestation(&mut self, attestation: Attestation) {
        self.attestations
            .insert(attestation.event_id.clone(), attestation);
    }

    pub fn with_attestation(mut self, attestation: Attestation) -> Self {
        self.add_attestation(attestation);
        self
    }
}

#[async_trait]
impl OracleAdapter for AttestationOracle {
    async fn resolve_event(
        &self,
        request: &OracleRequest,
    ) -> std::result::Result<CertifiedOutcome, OracleError> {
        let attestation = self.attestations.get(&request.event_id).ok_or_else(|| {
            OracleError::Unavailable(format!("no attestation for event {}", request.event_id))
        })?;

        attestation.verify(&self.oracle_pubkey)?;
        debug!(event_id = %request.event_id, outcome = %attestation.outcome, "attestation verified");

        Ok(CertifiedOutcome::new(
            attestation.outcome.clone(),
            attestation.reason.clone(),
        ))
    }
}
