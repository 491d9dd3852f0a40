//! # Betting Events
//!
//! The event record owned by the [`EventRegistry`](crate::registry::EventRegistry):
//! identity, deadline, outcome space, resolution criteria and, once resolved,
//! the certified outcome.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::Result, settlement::SettlementRecord, LedgerError, BINARY_OUTCOMES};

/// Lifecycle of an event. Transitions once, `Open` to `Resolved`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Open,
    Resolved,
}

/// Criteria handed to the oracle. The ledger never interprets them.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ResolutionSpec {
    /// A page the oracle reads to decide the outcome
    Url { url: String },
    /// An alternative lookup method with its parameter (e.g. a post id)
    Lookup { lookup: String, parameter: String },
}

impl ResolutionSpec {
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url { url: url.into() }
    }

    pub fn lookup(lookup: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self::Lookup {
            lookup: lookup.into(),
            parameter: parameter.into(),
        }
    }
}

/// Descriptive fields shown to participants and passed to the oracle.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct EventMetadata {
    pub title: String,
    pub description: String,
    pub category: String,
}

/// The closed set of labels an event can resolve to.
///
/// Persisted as `{ "kind", "labels" }` with the full label set for both
/// kinds.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(try_from = "OutcomeSpaceRecord", into = "OutcomeSpaceRecord")]
pub enum OutcomeSpace {
    /// Fixed `["yes", "no"]` pair
    Binary,
    /// Caller-supplied ordered labels, at least two
    Multi(Vec<String>),
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum OutcomeKind {
    Binary,
    Multi,
}

#[derive(Serialize, Deserialize)]
struct OutcomeSpaceRecord {
    kind: OutcomeKind,
    labels: Vec<String>,
}

impl From<OutcomeSpace> for OutcomeSpaceRecord {
    fn from(space: OutcomeSpace) -> Self {
        match space {
            OutcomeSpace::Binary => Self {
                kind: OutcomeKind::Binary,
                labels: BINARY_OUTCOMES.iter().map(|l| l.to_string()).collect(),
            },
            OutcomeSpace::Multi(labels) => Self {
                kind: OutcomeKind::Multi,
                labels,
            },
        }
    }
}

impl TryFrom<OutcomeSpaceRecord> for OutcomeSpace {
    type Error = String;

    fn try_from(record: OutcomeSpaceRecord) -> std::result::Result<Self, Self::Error> {
        match record.kind {
            OutcomeKind::Binary if record.labels == BINARY_OUTCOMES => Ok(Self::Binary),
            OutcomeKind::Binary => Err(format!(
                "binary outcome space must have labels {BINARY_OUTCOMES:?}, got {:?}",
                record.labels
            )),
            OutcomeKind::Multi => Ok(Self::Multi(record.labels)),
        }
    }
}

impl OutcomeSpace {
    pub fn binary() -> Self {
        Self::Binary
    }

    pub fn multi<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Multi(labels.into_iter().map(Into::into).collect())
    }

    /// Ordered outcome labels
    pub fn labels(&self) -> Vec<&str> {
        match self {
            Self::Binary => BINARY_OUTCOMES.to_vec(),
            Self::Multi(labels) => labels.iter().map(String::as_str).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Binary => BINARY_OUTCOMES.len(),
            Self::Multi(labels) => labels.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Label at `index`, if any
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels().get(index).copied()
    }

    /// Position of `label`, compared case-insensitively after trimming
    pub fn index_of(&self, label: &str) -> Option<usize> {
        let wanted = label.trim().to_lowercase();
        self.labels()
            .iter()
            .position(|candidate| candidate.trim().to_lowercase() == wanted)
    }

    /// Check the multi-outcome constraints. The binary space is fixed and
    /// always valid.
    pub fn validate(&self) -> Result<()> {
        let Self::Multi(labels) = self else {
            return Ok(());
        };

        if labels.len() < 2 {
            return Err(LedgerError::InvalidOutcomeSpace(
                "Event must have at least 2 possible outcomes".to_string(),
            ));
        }

        for (i, label) in labels.iter().enumerate() {
            if label.trim().is_empty() {
                return Err(LedgerError::InvalidOutcomeSpace(format!(
                    "Outcome {i} is empty"
                )));
            }
            if self.index_of(label) != Some(i) {
                return Err(LedgerError::InvalidOutcomeSpace(format!(
                    "Duplicate outcome label: {label}"
                )));
            }
        }

        Ok(())
    }
}

/// Arguments of `create_event`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NewEvent {
    pub id: String,
    pub resolution_date: NaiveDate,
    pub resolution: ResolutionSpec,
    #[serde(flatten)]
    pub metadata: EventMetadata,
    pub outcomes: OutcomeSpace,
}

/// A betable proposition with a closed outcome space.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Event {
    /// Caller-assigned unique identifier
    pub id: String,

    /// Resolution requests before this date are rejected
    pub resolution_date: NaiveDate,

    pub status: EventStatus,

    /// Passthrough criteria for the oracle
    pub resolution: ResolutionSpec,

    #[serde(flatten)]
    pub metadata: EventMetadata,

    pub outcomes: OutcomeSpace,

    /// Certified outcome label, set only on resolution
    pub certified_outcome: Option<String>,

    /// Oracle justification, empty while open
    pub reason: String,

    /// Tally progress, present once resolved
    pub settlement: Option<SettlementRecord>,
}

impl Event {
    pub(crate) fn open(new_event: NewEvent) -> Self {
        Self {
            id: new_event.id,
            resolution_date: new_event.resolution_date,
            status: EventStatus::Open,
            resolution: new_event.resolution,
            metadata: new_event.metadata,
            outcomes: new_event.outcomes,
            certified_outcome: None,
            reason: String::new(),
            settlement: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status == EventStatus::Resolved
    }

    /// Index of the certified outcome within the outcome space
    pub fn outcome_index(&self) -> Option<usize> {
        self.certified_outcome
            .as_deref()
            .and_then(|label| self.outcomes.index_of(label))
    }

    /// Earliest instant at which the event may be resolved (00:00 UTC of the
    /// resolution date).
    pub fn resolvable_from(&self) -> DateTime<Utc> {
        self.resolution_date
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc()
    }

    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        now >= self.resolvable_from()
    }
}
