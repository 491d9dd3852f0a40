//! # Participation Ledger
//!
//! Per-participant social handles and prediction slots. A participant writes
//! exactly once: handles and every slot land together or not at all.
//!
//! Slots are positional. Slot `i` holds the prediction for the `i`-th event
//! in registry creation order, and callers must submit predictions in that
//! order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    config::LedgerConfig, error::Result, identity::Address, registry::EventRegistry,
    LedgerError,
};

/// A submitted prediction, either by outcome position or by label.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum PredictionInput {
    Index(usize),
    Label(String),
}

impl From<usize> for PredictionInput {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for PredictionInput {
    fn from(label: &str) -> Self {
        Self::Label(label.to_string())
    }
}

/// Optional social identifiers, set once at first write.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Handles {
    pub discord: Option<String>,
    pub x: Option<String>,
}

impl Handles {
    pub fn new(discord: Option<String>, x: Option<String>) -> Self {
        let clean = |handle: Option<String>| {
            handle
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
        };
        Self {
            discord: clean(discord),
            x: clean(x),
        }
    }
}

/// Prediction slots of one participant; `None` is an unset slot.
pub type Slots = Vec<Option<usize>>;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ParticipationLedger {
    x_handles: BTreeMap<Address, String>,
    discord_handles: BTreeMap<Address, String>,
    predictions: BTreeMap<Address, Slots>,
}

impl ParticipationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the participant has any handle or prediction on record.
    pub fn has_participated(&self, participant: &Address) -> bool {
        self.x_handles.contains_key(participant)
            || self.discord_handles.contains_key(participant)
            || self.predictions.contains_key(participant)
    }

    /// Validate a submission against the registry and normalize every set
    /// slot to an outcome index. Nothing is written.
    pub fn validate_submission(
        &self,
        participant: &Address,
        predictions: &[Option<PredictionInput>],
        registry: &EventRegistry,
        config: &LedgerConfig,
    ) -> Result<Slots> {
        if self.has_participated(participant) {
            return Err(LedgerError::AlreadyParticipated(participant.clone()));
        }

        if registry.len() != config.tracked_events {
            return Err(LedgerError::WrongEventCount {
                expected: config.tracked_events,
                found: registry.len(),
            });
        }

        if predictions.len() != config.tracked_events {
            return Err(LedgerError::SlotCountMismatch {
                expected: config.tracked_events,
                got: predictions.len(),
            });
        }

        registry
            .events()
            .iter()
            .zip(predictions)
            .enumerate()
            .map(|(slot, (event, prediction))| match prediction {
                None if config.allow_partial_predictions => Ok(None),
                None => Err(LedgerError::IncompletePredictions(slot)),
                Some(PredictionInput::Index(index)) => {
                    if *index < event.outcomes.len() {
                        Ok(Some(*index))
                    } else {
                        Err(LedgerError::InvalidOutcomeIndex {
                            slot,
                            index: *index,
                        })
                    }
                }
                Some(PredictionInput::Label(label)) => event
                    .outcomes
                    .index_of(label)
                    .map(Some)
                    .ok_or_else(|| LedgerError::InvalidOutcomeLabel {
                        slot,
                        label: label.clone(),
                    }),
            })
            .collect()
    }

    /// Record handles and all prediction slots in one atomic write.
    pub fn record_predictions(
        &mut self,
        participant: &Address,
        handles: Handles,
        predictions: &[Option<PredictionInput>],
        registry: &EventRegistry,
        config: &LedgerConfig,
    ) -> Result<&Slots> {
        let slots = self.validate_submission(participant, predictions, registry, config)?;

        if let Some(x) = handles.x {
            self.x_handles.insert(participant.clone(), x);
        }
        if let Some(discord) = handles.discord {
            self.discord_handles.insert(participant.clone(), discord);
        }

        info!(
            participant = %participant,
            slots = slots.len(),
            set = slots.iter().flatten().count(),
            "predictions recorded"
        );
        Ok(self.predictions.entry(participant.clone()).or_insert(slots))
    }

    /// Prediction at `slot`, `None` when unset or unknown participant
    pub fn prediction_for(&self, participant: &Address, slot: usize) -> Option<usize> {
        self.predictions
            .get(participant)
            .and_then(|slots| slots.get(slot).copied().flatten())
    }

    pub fn slots_of(&self, participant: &Address) -> Option<&Slots> {
        self.predictions.get(participant)
    }

    pub fn handles_of(&self, participant: &Address) -> Handles {
        Handles {
            discord: self.discord_handles.get(participant).cloned(),
            x: self.x_handles.get(participant).cloned(),
        }
    }

    /// Participants with recorded predictions, in address order
    pub fn participants(&self) -> impl Iterator<Item = &Address> {
        self.predictions.keys()
    }

    /// `(participant, prediction)` for every participant whose `slot` is set
    pub fn predictions_at(&self, slot: usize) -> impl Iterator<Item = (&Address, usize)> {
        self.predictions
            .iter()
            .filter_map(move |(address, slots)| {
                slots.get(slot).copied().flatten().map(|p| (address, p))
            })
    }

    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }
}
