//! # Settlement Engine
//!
//! Turns a certified oracle answer into ledger state:
//!
//! ```text
//! Open --(oracle call in flight)--> Resolving --(mark_resolved + tally)--> Resolved
//! ```
//!
//! `Resolving` is never persisted. The oracle round trip happens before the
//! engine is constructed, and the engine itself is synchronous, so a failed
//! or abandoned oracle call leaves nothing behind.
//!
//! Once the outcome is persisted the tally must reach every participant.
//! The per-event [`SettlementRecord`] remembers who has been credited so an
//! interrupted tally can be resumed without crediting anyone twice.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::Result,
    identity::{Address, TxContext},
    oracle::CertifiedOutcome,
    participation::ParticipationLedger,
    registry::EventRegistry,
    scoreboard::ScoreBoard,
    LedgerError,
};

/// Tally progress for a resolved event.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SettlementRecord {
    /// Participants already credited for this event
    pub credited: BTreeSet<Address>,
    /// Whether every participant has been scanned
    pub complete: bool,
}

/// Outcome of a successful `resolve`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub event_id: String,
    pub outcome: String,
    pub outcome_index: usize,
    pub reason: String,
    /// Participants who earned a point from this event
    pub credited: Vec<Address>,
}

/// Borrowed view over the components settlement touches. The engine is the
/// only writer of the score board.
pub struct SettlementEngine<'a> {
    registry: &'a mut EventRegistry,
    participation: &'a ParticipationLedger,
    scores: &'a mut ScoreBoard,
}

impl<'a> SettlementEngine<'a> {
    pub fn new(
        registry: &'a mut EventRegistry,
        participation: &'a ParticipationLedger,
        scores: &'a mut ScoreBoard,
    ) -> Self {
        Self {
            registry,
            participation,
            scores,
        }
    }

    /// Map the oracle's label onto the event's own spelling of it.
    ///
    /// A label outside the outcome space is a malformed response.
    pub fn canonical_outcome(&self, event_id: &str, answer: &CertifiedOutcome) -> Result<String> {
        let event = self.registry.find_event(event_id)?;
        event
            .outcomes
            .index_of(&answer.outcome)
            .and_then(|index| event.outcomes.label(index))
            .map(str::to_string)
            .ok_or_else(|| {
                LedgerError::OracleMalformedResponse(format!(
                    "outcome {:?} is not one of {:?}",
                    answer.outcome,
                    event.outcomes.labels()
                ))
            })
    }

    /// Persist the certified outcome and credit every correct prediction.
    ///
    /// All checks run before the first write; once `mark_resolved` succeeds
    /// the tally runs to completion.
    pub fn settle(
        &mut self,
        ctx: &TxContext,
        event_id: &str,
        answer: &CertifiedOutcome,
    ) -> Result<Resolution> {
        self.registry.ensure_resolvable(event_id, ctx)?;
        let outcome = self.canonical_outcome(event_id, answer)?;

        let event = self
            .registry
            .mark_resolved(event_id, &outcome, &answer.reason, ctx)?;
        event.settlement = Some(SettlementRecord::default());
        info!(event_id, outcome = %outcome, "event resolved");

        let credited = self.tally(event_id)?;
        let outcome_index = self
            .registry
            .find_event(event_id)?
            .outcome_index()
            .ok_or_else(|| {
                LedgerError::OracleMalformedResponse(format!("outcome {outcome:?} vanished"))
            })?;

        Ok(Resolution {
            event_id: event_id.to_string(),
            outcome,
            outcome_index,
            reason: answer.reason.clone(),
            credited,
        })
    }

    /// Scan every participant and add one point to each whose prediction at
    /// this event's slot equals the certified outcome. Participants already
    /// in the settlement record are skipped.
    ///
    /// Returns the participants credited by this call.
    pub fn tally(&mut self, event_id: &str) -> Result<Vec<Address>> {
        let slot = self.registry.position_of(event_id)?;
        let event = self.registry.find_event_mut(event_id)?;
        let winning = event
            .outcome_index()
            .ok_or_else(|| LedgerError::NotFound(format!("certified outcome of {event_id}")))?;
        let record = event.settlement.get_or_insert_with(SettlementRecord::default);

        let mut newly_credited = Vec::new();
        for (participant, prediction) in self.participation.predictions_at(slot) {
            if prediction != winning || record.credited.contains(participant) {
                continue;
            }
            let total = self.scores.add_point(participant);
            record.credited.insert(participant.clone());
            debug!(event_id, participant = %participant, total, "point credited");
            newly_credited.push(participant.clone());
        }
        record.complete = true;

        info!(
            event_id,
            credited = newly_credited.len(),
            "settlement complete"
        );
        Ok(newly_credited)
    }
}
