//! Error types for foresight-core

use chrono::NaiveDate;
use thiserror::Error;

use crate::identity::Address;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Error types for ledger operations.
///
/// Every error aborts the operation that raised it without mutating any
/// ledger state.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// A non-owner called an owner-only operation
    #[error("Unauthorized: {caller} is not the ledger owner")]
    Unauthorized { caller: Address },

    /// An event with this id already exists
    #[error("Event with id {0} already exists")]
    DuplicateId(String),

    /// No event with this id
    #[error("Event with id {0} not found")]
    NotFound(String),

    /// The event has already been resolved
    #[error("Event {0} already resolved")]
    AlreadyResolved(String),

    /// Resolution requested before the event's deadline
    #[error("It is too soon to resolve event {id}: deadline is {deadline}")]
    TooEarly { id: String, deadline: NaiveDate },

    /// The participant already registered handles or predictions
    #[error("Participant {0} already registered predictions")]
    AlreadyParticipated(Address),

    /// The registry does not hold the tracked number of events
    #[error("There must be exactly {expected} events available, found {found}")]
    WrongEventCount { expected: usize, found: usize },

    /// Outcome space rejected at event creation
    #[error("Invalid outcome space: {0}")]
    InvalidOutcomeSpace(String),

    /// Prediction index outside the event's outcome space
    #[error("Invalid outcome index for slot {slot}: {index}")]
    InvalidOutcomeIndex { slot: usize, index: usize },

    /// Prediction label not in the event's outcome space
    #[error("Invalid outcome label for slot {slot}: {label}")]
    InvalidOutcomeLabel { slot: usize, label: String },

    /// Submission does not carry one slot per tracked event
    #[error("Expected {expected} prediction slots, got {got}")]
    SlotCountMismatch { expected: usize, got: usize },

    /// Submission leaves a slot unset while partial submissions are disabled
    #[error("Prediction slot {0} is unset")]
    IncompletePredictions(usize),

    /// The oracle could not be reached or declined to answer
    #[error("Oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// The oracle answered with something that cannot be settled
    #[error("Oracle malformed response: {0}")]
    OracleMalformedResponse(String),

    /// Address validation errors
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Oracle key or signature errors
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Calendar date parsing errors
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// The snapshot on disk moved on since it was loaded
    #[error("Stale snapshot: loaded at journal length {loaded}, now {on_disk}")]
    StaleSnapshot { loaded: usize, on_disk: usize },

    /// Journal replay errors
    #[error("Replay error: {0}")]
    Replay(String),

    /// Serde JSON errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Snapshot I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    /// Whether retrying the same operation can never succeed for this
    /// identity or event.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::DuplicateId(_) | Self::AlreadyResolved(_) | Self::AlreadyParticipated(_)
        )
    }
}
