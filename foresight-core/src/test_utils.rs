//! Common test utilities for foresight-core tests.
//!
//! Deterministic addresses, transaction contexts, canned events and a
//! scripted oracle shared across module tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::config::LedgerConfig;
use crate::event::{EventMetadata, NewEvent, OutcomeSpace, ResolutionSpec};
use crate::identity::{Address, TxContext};
use crate::ledger::Ledger;
use crate::oracle::{CertifiedOutcome, OracleAdapter, OracleError, OracleRequest};
use crate::registry::EventRegistry;
use crate::utils::{parse_date, parse_timestamp};

/// Secret key used to sign test attestations
pub const TEST_ORACLE_SECRET: &str =
    "0101010101010101010101010101010101010101010101010101010101010101";

/// Deterministic participant address ending in `index`.
pub fn address(index: u8) -> Address {
    Address::parse(&format!("0x{}{:02x}", "00".repeat(19), index)).unwrap()
}

/// The ledger owner used throughout the tests
pub fn owner() -> Address {
    Address::parse("0x0000000000000000000000000000000000000a11").unwrap()
}

pub fn date(date_str: &str) -> NaiveDate {
    parse_date(date_str).unwrap()
}

pub fn ctx_at(caller: Address, timestamp: &str) -> TxContext {
    TxContext::new(caller, parse_timestamp(timestamp).unwrap())
}

pub fn new_multi_event(id: &str, deadline: &str, labels: &[&str]) -> NewEvent {
    NewEvent {
        id: id.to_string(),
        resolution_date: date(deadline),
        resolution: ResolutionSpec::url(format!("https://example.com/{id}")),
        metadata: EventMetadata {
            title: format!("Event {id}"),
            description: format!("Which outcome will {id} have?"),
            category: "Sports".to_string(),
        },
        outcomes: OutcomeSpace::multi(labels.iter().copied()),
    }
}

pub fn new_binary_event(id: &str, deadline: &str) -> NewEvent {
    NewEvent {
        id: id.to_string(),
        resolution_date: date(deadline),
        resolution: ResolutionSpec::lookup("get_tweet_data", format!("{id}-post")),
        metadata: EventMetadata {
            title: format!("Will {id} happen?"),
            description: format!("Resolves yes if {id} happens before the deadline"),
            category: "Community".to_string(),
        },
        outcomes: OutcomeSpace::binary(),
    }
}

/// The three tracked events: one multi-outcome match and two binary
/// questions.
pub fn three_events() -> Vec<NewEvent> {
    vec![
        new_multi_event("match", "2025-06-04", &["Barbados", "Aruba", "Draw"]),
        new_binary_event("ai", "2025-07-10"),
        new_binary_event("ama", "2025-06-30"),
    ]
}

pub fn three_event_registry() -> EventRegistry {
    let mut registry = EventRegistry::new();
    for event in three_events() {
        registry.create_event(event).unwrap();
    }
    registry
}

/// A ledger owned by [`owner`] holding [`three_events`].
pub fn seeded_ledger() -> Ledger {
    let mut ledger = Ledger::genesis(owner(), LedgerConfig::default());
    let ctx = ctx_at(owner(), "2025-05-01T00:00:00Z");
    for event in three_events() {
        ledger.create_event(&ctx, event).unwrap();
    }
    ledger
}

/// Oracle returning a fixed answer and counting how often it is asked.
pub struct ScriptedOracle {
    event_id: Option<String>,
    answer: Result<CertifiedOutcome, OracleError>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    pub fn answering(event_id: &str, outcome: &str, reason: &str) -> Self {
        Self {
            event_id: Some(event_id.to_string()),
            answer: Ok(CertifiedOutcome::new(outcome, reason)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: OracleError) -> Self {
        Self {
            event_id: None,
            answer: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OracleAdapter for ScriptedOracle {
    async fn resolve_event(
        &self,
        request: &OracleRequest,
    ) -> Result<CertifiedOutcome, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(expected) = &self.event_id {
            if expected != &request.event_id {
                return Err(OracleError::MalformedResponse(format!(
                    "scripted for {expected}, asked about {}",
                    request.event_id
                )));
            }
        }
        self.answer.clone()
    }
}
