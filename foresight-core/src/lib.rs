//! # Foresight Core
//!
//! Core Rust library for a replicated prediction ledger with oracle-certified
//! settlement.
//!
//! An owner publishes betting events, participants commit one set of
//! predictions, and an external oracle later certifies each event's outcome.
//! The ledger settles predictions against that outcome and accumulates
//! reputation points. Given the same ordered operations and the same oracle
//! answers, every replica reaches the same state.
//!
//! ## Features
//!
//! - **Event Registry**: Binary and multi-outcome events with resolution deadlines
//! - **Participation Ledger**: One atomic, write-once submission per participant
//! - **Settlement Engine**: Oracle-driven resolution crediting one point per correct prediction
//! - **Score Board**: Monotonic per-participant point totals
//! - **Journal & Replay**: Ordered operation log with a state digest for replica comparison
//! - **Attestation Oracle**: Schnorr-signed outcomes from a single trusted oracle key
//!
//! ## Examples
//!
//! ```rust
//! use foresight_core::{
//!     Address, EventMetadata, Ledger, LedgerConfig, NewEvent, OutcomeSpace, ResolutionSpec,
//!     TxContext,
//! };
//!
//! let owner = Address::parse("0x00000000000000000000000000000000000000aa")?;
//! let mut ledger = Ledger::genesis(owner.clone(), LedgerConfig::default());
//!
//! let event = ledger.create_event(
//!     &TxContext::at_wall_clock(owner),
//!     NewEvent {
//!         id: "psg_vs_atletico".to_string(),
//!         resolution_date: foresight_core::parse_date("2025-06-15")?,
//!         resolution: ResolutionSpec::url("https://www.fifa.com/en/match-centre"),
//!         metadata: EventMetadata {
//!             title: "PSG vs. Atletico Madrid".to_string(),
//!             description: "Who will win the match?".to_string(),
//!             category: "Sports".to_string(),
//!         },
//!         outcomes: OutcomeSpace::multi(["PSG", "Atletico Madrid", "Draw"]),
//!     },
//! )?;
//! assert!(!event.is_resolved());
//! Ok::<(), foresight_core::LedgerError>(())
//! ```

pub mod attestation;
pub mod config;
pub mod error;
pub mod event;
pub mod identity;
pub mod journal;
pub mod ledger;
pub mod oracle;
pub mod participation;
pub mod query;
pub mod registry;
pub mod scoreboard;
pub mod settlement;
pub mod store;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_utils;

pub use attestation::{Attestation, AttestationOracle};
pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use event::{Event, EventMetadata, EventStatus, NewEvent, OutcomeSpace, ResolutionSpec};
pub use identity::{Address, TxContext};
pub use journal::{JournalEntry, Operation};
pub use ledger::Ledger;
pub use oracle::{CertifiedOutcome, OracleAdapter, OracleError, OracleRequest};
pub use participation::{Handles, PredictionInput};
pub use query::{EventView, LeaderboardEntry, ParticipantView, ParticipationExport};
pub use settlement::Resolution;
pub use store::LedgerStore;
pub use utils::*;

/// Number of concurrent events a participant predicts on
pub const TRACKED_EVENT_COUNT: usize = 3;

/// Outcome labels of a binary event
pub const BINARY_OUTCOMES: [&str; 2] = ["yes", "no"];
