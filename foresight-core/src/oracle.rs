//! # Oracle Adapter
//!
//! The seam through which the ledger asks an external oracle for a certified
//! outcome. Fetching content, interpreting it and agreeing on the answer all
//! happen behind this trait; the ledger only consumes the final
//! `(outcome, reason)` pair.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{event::Event, event::ResolutionSpec, LedgerError};

/// Inert criteria describing the event to resolve.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct OracleRequest {
    pub event_id: String,
    pub title: String,
    pub description: String,
    pub outcomes: Vec<String>,
    pub resolution: ResolutionSpec,
}

impl From<&Event> for OracleRequest {
    fn from(event: &Event) -> Self {
        Self {
            event_id: event.id.clone(),
            title: event.metadata.title.clone(),
            description: event.metadata.description.clone(),
            outcomes: event.outcomes.labels().into_iter().map(String::from).collect(),
            resolution: event.resolution.clone(),
        }
    }
}

/// The oracle's certified answer.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CertifiedOutcome {
    pub outcome: String,
    pub reason: String,
}

impl CertifiedOutcome {
    pub fn new(outcome: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            outcome: outcome.into(),
            reason: reason.into(),
        }
    }
}

/// Oracle failures. Neither is retried by the ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("oracle unavailable: {0}")]
    Unavailable(String),

    #[error("malformed oracle response: {0}")]
    MalformedResponse(String),
}

impl From<OracleError> for LedgerError {
    fn from(err: OracleError) -> Self {
        match err {
            OracleError::Unavailable(msg) => Self::OracleUnavailable(msg),
            OracleError::MalformedResponse(msg) => Self::OracleMalformedResponse(msg),
        }
    }
}

/// Resolves an event into a certified outcome.
#[async_trait]
pub trait OracleAdapter: Send + Sync {
    async fn resolve_event(
        &self,
        request: &OracleRequest,
    ) -> std::result::Result<CertifiedOutcome, OracleError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::test_utils::new_binary_event;

    #[test]
    fn test_request_carries_event_criteria() {
        let event = Event::open(new_binary_event("b0", "2025-07-10"));
        let request = OracleRequest::from(&event);

        assert_eq!(request.event_id, "b0");
        assert_eq!(request.outcomes, vec!["yes", "no"]);
        assert_eq!(request.title, event.metadata.title);
        assert_eq!(request.resolution, event.resolution);
    }

    #[test]
    fn test_error_mapping() {
        let err: LedgerError = OracleError::Unavailable("timeout".to_string()).into();
        assert!(matches!(err, LedgerError::OracleUnavailable(msg) if msg == "timeout"));

        let err: LedgerError = OracleError::MalformedResponse("not json".to_string()).into();
        assert!(matches!(err, LedgerError::OracleMalformedResponse(_)));
    }
}
