//! # Operation Journal
//!
//! The totally ordered sequence of committed mutations. Replicas that apply
//! the same journal reach the same ledger state; resolve entries carry the
//! certified answer so replay never calls the oracle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    event::NewEvent,
    identity::{Address, TxContext},
    oracle::CertifiedOutcome,
    participation::{Handles, PredictionInput},
};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    CreateEvent {
        event: NewEvent,
    },
    RecordPredictions {
        handles: Handles,
        predictions: Vec<Option<PredictionInput>>,
    },
    Resolve {
        event_id: String,
        answer: CertifiedOutcome,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct JournalEntry {
    /// Zero-based position in the ordered sequence
    pub sequence: u64,
    pub at: DateTime<Utc>,
    pub caller: Address,
    pub operation: Operation,
}

impl JournalEntry {
    pub fn context(&self) -> TxContext {
        TxContext::new(self.caller.clone(), self.at)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn next_sequence(&self) -> u64 {
        self.entries.len() as u64
    }

    pub(crate) fn record(&mut self, ctx: &TxContext, operation: Operation) -> &JournalEntry {
        let entry = JournalEntry {
            sequence: self.next_sequence(),
            at: ctx.now,
            caller: ctx.caller.clone(),
            operation,
        };
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ctx_at, owner};

    #[test]
    fn test_sequence_numbers() {
        let mut journal = Journal::default();
        let ctx = ctx_at(owner(), "2025-06-04T00:00:00Z");

        let first = journal
            .record(
                &ctx,
                Operation::Resolve {
                    event_id: "e1".to_string(),
                    answer: CertifiedOutcome::new("A", "because"),
                },
            )
            .sequence;
        assert_eq!(first, 0);
        assert_eq!(journal.next_sequence(), 1);
        assert_eq!(journal.entries()[0].context(), ctx);
    }

    #[test]
    fn test_operation_encoding() {
        let op = Operation::RecordPredictions {
            handles: Handles::default(),
            predictions: vec![Some(PredictionInput::Index(1)), None, Some("yes".into())],
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["op"], "record_predictions");
        assert_eq!(json["predictions"][0], 1);
        assert!(json["predictions"][1].is_null());
        assert_eq!(json["predictions"][2], "yes");

        let back: Operation = serde_json::from_value(json).unwrap();
        assert_eq!(back, op);
    }
}
