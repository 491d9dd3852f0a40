//! # Prediction Ledger
//!
//! The single owned state machine tying the registry, participation ledger,
//! settlement engine and score board together.
//!
//! Operations are applied one at a time. Mutating operations take `&mut self`
//! and check everything before their first write, so a failed operation
//! leaves the ledger untouched and a reader never sees a half-applied one.
//! `resolve` keeps the exclusive borrow across the oracle round trip: nothing
//! can interleave between the oracle answer and the settlement it triggers,
//! and dropping the future before the answer arrives changes nothing.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    config::LedgerConfig,
    error::Result,
    event::{Event, NewEvent},
    identity::{Address, TxContext},
    journal::{Journal, JournalEntry, Operation},
    oracle::{CertifiedOutcome, OracleAdapter, OracleRequest},
    participation::{Handles, ParticipationLedger, PredictionInput, Slots},
    registry::EventRegistry,
    scoreboard::ScoreBoard,
    settlement::{Resolution, SettlementEngine},
    utils::sha256_hex,
    LedgerError,
};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Ledger {
    /// Owner identity, fixed at genesis
    owner: Address,
    config: LedgerConfig,
    registry: EventRegistry,
    participation: ParticipationLedger,
    scores: ScoreBoard,
    journal: Journal,
}

/// Fields that define ledger state, in digest order.
#[derive(Serialize)]
struct StateView<'a> {
    owner: &'a Address,
    config: &'a LedgerConfig,
    registry: &'a EventRegistry,
    participation: &'a ParticipationLedger,
    scores: &'a ScoreBoard,
}

impl Ledger {
    /// Create an empty ledger owned by `owner`.
    pub fn genesis(owner: Address, config: LedgerConfig) -> Self {
        info!(owner = %owner, tracked_events = config.tracked_events, "ledger genesis");
        Self {
            owner,
            config,
            registry: EventRegistry::new(),
            participation: ParticipationLedger::new(),
            scores: ScoreBoard::new(),
            journal: Journal::default(),
        }
    }

    fn require_owner(&self, ctx: &TxContext) -> Result<()> {
        if ctx.caller != self.owner {
            warn!(caller = %ctx.caller, "owner-only operation rejected");
            return Err(LedgerError::Unauthorized {
                caller: ctx.caller.clone(),
            });
        }
        Ok(())
    }

    /// Register a new open event. Owner only.
    pub fn create_event(&mut self, ctx: &TxContext, new_event: NewEvent) -> Result<&Event> {
        self.require_owner(ctx)?;

        let id = new_event.id.clone();
        self.registry.create_event(new_event.clone())?;
        self.journal
            .record(ctx, Operation::CreateEvent { event: new_event });
        self.registry.find_event(&id)
    }

    /// Record the caller's one-shot submission of handles and predictions.
    pub fn record_predictions(
        &mut self,
        ctx: &TxContext,
        handles: Handles,
        predictions: Vec<Option<PredictionInput>>,
    ) -> Result<&Slots> {
        self.participation.record_predictions(
            &ctx.caller,
            handles.clone(),
            &predictions,
            &self.registry,
            &self.config,
        )?;
        self.journal.record(
            ctx,
            Operation::RecordPredictions {
                handles,
                predictions,
            },
        );
        self.participation
            .slots_of(&ctx.caller)
            .ok_or_else(|| LedgerError::NotFound(format!("predictions of {}", ctx.caller)))
    }

    /// Resolve an event through the oracle and settle it. Owner only.
    ///
    /// Ownership, existence, status and deadline are checked before the
    /// oracle is contacted. Any oracle failure leaves the event open and the
    /// ledger unchanged; the caller may retry later.
    pub async fn resolve<O>(
        &mut self,
        ctx: &TxContext,
        event_id: &str,
        oracle: &O,
    ) -> Result<Resolution>
    where
        O: OracleAdapter + ?Sized,
    {
        self.require_owner(ctx)?;
        let request = OracleRequest::from(self.registry.ensure_resolvable(event_id, ctx)?);

        let answer = oracle.resolve_event(&request).await.map_err(|e| {
            warn!(event_id, error = %e, "oracle call failed, event stays open");
            LedgerError::from(e)
        })?;

        self.commit_resolution(ctx, event_id, answer)
    }

    fn commit_resolution(
        &mut self,
        ctx: &TxContext,
        event_id: &str,
        answer: CertifiedOutcome,
    ) -> Result<Resolution> {
        let resolution = SettlementEngine::new(
            &mut self.registry,
            &self.participation,
            &mut self.scores,
        )
        .settle(ctx, event_id, &answer)?;

        self.journal.record(
            ctx,
            Operation::Resolve {
                event_id: event_id.to_string(),
                answer,
            },
        );
        Ok(resolution)
    }

    /// Finish any tally that was interrupted after its outcome was persisted.
    ///
    /// Returns `(event id, newly credited participants)` for every event
    /// that needed work.
    pub fn recover_settlements(&mut self) -> Result<Vec<(String, Vec<Address>)>> {
        let pending: Vec<String> = self
            .registry
            .events()
            .iter()
            .filter(|event| {
                event.is_resolved()
                    && !event
                        .settlement
                        .as_ref()
                        .is_some_and(|record| record.complete)
            })
            .map(|event| event.id.clone())
            .collect();

        let mut recovered = Vec::with_capacity(pending.len());
        for event_id in pending {
            warn!(event_id = %event_id, "resuming interrupted settlement");
            let credited = SettlementEngine::new(
                &mut self.registry,
                &self.participation,
                &mut self.scores,
            )
            .tally(&event_id)?;
            recovered.push((event_id, credited));
        }
        Ok(recovered)
    }

    /// Rebuild a ledger by applying journal entries in order.
    pub fn replay(owner: Address, config: LedgerConfig, entries: &[JournalEntry]) -> Result<Self> {
        let mut ledger = Self::genesis(owner, config);
        for entry in entries {
            if entry.sequence != ledger.journal.next_sequence() {
                return Err(LedgerError::Replay(format!(
                    "expected sequence {}, found {}",
                    ledger.journal.next_sequence(),
                    entry.sequence
                )));
            }

            let ctx = entry.context();
            match &entry.operation {
                Operation::CreateEvent { event } => {
                    ledger.create_event(&ctx, event.clone())?;
                }
                Operation::RecordPredictions {
                    handles,
                    predictions,
                } => {
                    ledger.record_predictions(&ctx, handles.clone(), predictions.clone())?;
                }
                Operation::Resolve { event_id, answer } => {
                    ledger.require_owner(&ctx)?;
                    ledger.commit_resolution(&ctx, event_id, answer.clone())?;
                }
            }
        }
        info!(entries = entries.len(), "journal replayed");
        Ok(ledger)
    }

    /// Hex SHA-256 of the canonical JSON encoding of the ledger state.
    ///
    /// The journal is excluded; two replicas agree on the digest exactly when
    /// they agree on events, predictions and scores.
    pub fn state_digest(&self) -> Result<String> {
        let view = StateView {
            owner: &self.owner,
            config: &self.config,
            registry: &self.registry,
            participation: &self.participation,
            scores: &self.scores,
        };
        Ok(sha256_hex(&serde_json::to_vec(&view)?))
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    pub fn participation(&self) -> &ParticipationLedger {
        &self.participation
    }

    pub fn scores(&self) -> &ScoreBoard {
        &self.scores
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventStatus, OutcomeSpace};
    use crate::oracle::OracleError;
    use crate::settlement::SettlementRecord;
    use crate::test_utils::{
        address, ctx_at, new_binary_event, new_multi_event, owner, seeded_ledger, ScriptedOracle,
    };

    const AFTER_ALL: &str = "2025-08-01T00:00:00Z";

    fn predict(ledger: &mut Ledger, who: u8, picks: [&str; 3]) {
        let ctx = ctx_at(address(who), "2025-06-01T00:00:00Z");
        ledger
            .record_predictions(
                &ctx,
                Handles::new(Some(format!("user{who}")), None),
                picks.iter().map(|p| Some((*p).into())).collect(),
            )
            .unwrap();
    }

    #[tokio::test]
    async fn test_correct_prediction_scores_one_point() {
        let mut ledger = seeded_ledger();
        predict(&mut ledger, 1, ["Draw", "yes", "no"]);
        let oracle = ScriptedOracle::answering("match", "Draw", "Ended 1-1");

        let resolution = ledger
            .resolve(&ctx_at(owner(), AFTER_ALL), "match", &oracle)
            .await
            .unwrap();

        assert_eq!(resolution.outcome, "Draw");
        let event = ledger.registry().find_event("match").unwrap();
        assert_eq!(event.status, EventStatus::Resolved);
        assert_eq!(event.certified_outcome.as_deref(), Some("Draw"));
        assert_eq!(event.reason, "Ended 1-1");
        assert_eq!(ledger.scores().points_of(&address(1)), 1);
    }

    #[tokio::test]
    async fn test_wrong_prediction_scores_nothing() {
        let mut ledger = seeded_ledger();
        predict(&mut ledger, 1, ["Draw", "yes", "no"]);
        let oracle = ScriptedOracle::answering("match", "Barbados", "Won 2-0");

        ledger
            .resolve(&ctx_at(owner(), AFTER_ALL), "match", &oracle)
            .await
            .unwrap();
        assert_eq!(ledger.scores().points_of(&address(1)), 0);
        assert!(ledger.registry().find_event("match").unwrap().is_resolved());
    }

    #[tokio::test]
    async fn test_only_owner_creates_and_resolves() {
        let mut ledger = seeded_ledger();
        let intruder = ctx_at(address(9), AFTER_ALL);

        let created = ledger.create_event(&intruder, new_binary_event("x", "2025-07-10"));
        assert!(matches!(created, Err(LedgerError::Unauthorized { .. })));

        let oracle = ScriptedOracle::answering("match", "Draw", "1-1");
        let resolved = ledger.resolve(&intruder, "match", &oracle).await;
        assert!(matches!(resolved, Err(LedgerError::Unauthorized { .. })));
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn test_resolve_failures_before_oracle() {
        let mut ledger = seeded_ledger();
        let oracle = ScriptedOracle::answering("match", "Draw", "1-1");

        let missing = ledger
            .resolve(&ctx_at(owner(), AFTER_ALL), "nope", &oracle)
            .await;
        assert!(matches!(missing, Err(LedgerError::NotFound(_))));

        let early = ledger
            .resolve(&ctx_at(owner(), "2025-06-03T23:59:59Z"), "match", &oracle)
            .await;
        assert!(matches!(early, Err(LedgerError::TooEarly { .. })));
        assert_eq!(
            ledger.registry().find_event("match").unwrap().status,
            EventStatus::Open
        );
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn test_second_resolve_is_rejected_without_rescoring() {
        let mut ledger = seeded_ledger();
        predict(&mut ledger, 1, ["Draw", "yes", "no"]);
        let oracle = ScriptedOracle::answering("match", "Draw", "1-1");
        let ctx = ctx_at(owner(), AFTER_ALL);

        ledger.resolve(&ctx, "match", &oracle).await.unwrap();
        let scores = ledger.scores().clone();

        let again = ledger.resolve(&ctx, "match", &oracle).await;
        assert!(matches!(again, Err(LedgerError::AlreadyResolved(_))));
        assert_eq!(ledger.scores(), &scores);
        assert_eq!(oracle.calls(), 1);
    }

    #[tokio::test]
    async fn test_oracle_failure_then_retry() {
        let mut ledger = seeded_ledger();
        predict(&mut ledger, 1, ["Aruba", "yes", "no"]);
        predict(&mut ledger, 2, ["Draw", "no", "no"]);
        let ctx = ctx_at(owner(), AFTER_ALL);
        let before = ledger.clone();

        let down = ScriptedOracle::failing(OracleError::Unavailable("timeout".to_string()));
        let result = ledger.resolve(&ctx, "match", &down).await;
        assert!(matches!(result, Err(LedgerError::OracleUnavailable(_))));
        assert_eq!(ledger, before);

        let garbled = ScriptedOracle::answering("match", "Cancelled", "no match");
        let result = ledger.resolve(&ctx, "match", &garbled).await;
        assert!(matches!(result, Err(LedgerError::OracleMalformedResponse(_))));
        assert_eq!(ledger, before);

        let oracle = ScriptedOracle::answering("match", "aruba", "Aruba won on penalties");
        ledger.resolve(&ctx, "match", &oracle).await.unwrap();
        assert_eq!(ledger.scores().points_of(&address(1)), 1);
        assert_eq!(ledger.scores().points_of(&address(2)), 0);
        assert_eq!(
            ledger
                .registry()
                .find_event("match")
                .unwrap()
                .certified_outcome
                .as_deref(),
            Some("Aruba")
        );
    }

    #[tokio::test]
    async fn test_points_accumulate_across_events() {
        let mut ledger = seeded_ledger();
        predict(&mut ledger, 1, ["Draw", "yes", "yes"]);
        predict(&mut ledger, 2, ["Draw", "no", "yes"]);
        let ctx = ctx_at(owner(), AFTER_ALL);

        for (id, outcome) in [("match", "Draw"), ("ai", "No"), ("ama", "YES")] {
            let oracle = ScriptedOracle::answering(id, outcome, "checked");
            ledger.resolve(&ctx, id, &oracle).await.unwrap();
        }

        assert_eq!(ledger.scores().points_of(&address(1)), 2);
        assert_eq!(ledger.scores().points_of(&address(2)), 3);
    }

    #[test]
    fn test_participation_requires_three_events() {
        let mut ledger = Ledger::genesis(owner(), LedgerConfig::default());
        let ctx = ctx_at(owner(), "2025-06-01T00:00:00Z");
        ledger
            .create_event(&ctx, new_binary_event("b0", "2025-07-10"))
            .unwrap();
        ledger
            .create_event(&ctx, new_binary_event("b1", "2025-07-10"))
            .unwrap();

        let result = ledger.record_predictions(
            &ctx_at(address(1), "2025-06-01T00:00:00Z"),
            Handles::default(),
            vec![Some("yes".into()), Some("no".into()), Some("yes".into())],
        );
        assert!(matches!(
            result,
            Err(LedgerError::WrongEventCount {
                expected: 3,
                found: 2
            })
        ));
        assert_eq!(ledger.journal().len(), 2);
    }

    #[test]
    fn test_single_event_scenario() {
        // E1 with outcomes A, B, C and one tracked event.
        let config = LedgerConfig {
            tracked_events: 1,
            ..LedgerConfig::default()
        };
        let mut ledger = Ledger::genesis(owner(), config);
        let owner_ctx = ctx_at(owner(), "2025-06-01T00:00:00Z");
        ledger
            .create_event(&owner_ctx, new_multi_event("E1", "2025-06-04", &["A", "B", "C"]))
            .unwrap();
        ledger
            .record_predictions(
                &ctx_at(address(1), "2025-06-02T00:00:00Z"),
                Handles::default(),
                vec![Some("C".into())],
            )
            .unwrap();

        let mut certified_c = ledger.clone();
        let rt = tokio::runtime::Runtime::new().unwrap();
        let resolve_ctx = ctx_at(owner(), "2025-06-04T09:00:00Z");

        rt.block_on(certified_c.resolve(
            &resolve_ctx,
            "E1",
            &ScriptedOracle::answering("E1", "C", "official"),
        ))
        .unwrap();
        assert_eq!(certified_c.scores().points_of(&address(1)), 1);

        rt.block_on(ledger.resolve(
            &resolve_ctx,
            "E1",
            &ScriptedOracle::answering("E1", "A", "official"),
        ))
        .unwrap();
        assert_eq!(ledger.scores().points_of(&address(1)), 0);
        assert_eq!(
            ledger.registry().find_event("E1").unwrap().certified_outcome.as_deref(),
            Some("A")
        );
    }

    #[tokio::test]
    async fn test_replay_reaches_same_digest() {
        let mut ledger = seeded_ledger();
        predict(&mut ledger, 1, ["Draw", "yes", "no"]);
        predict(&mut ledger, 2, ["Aruba", "no", "no"]);
        let oracle = ScriptedOracle::answering("ai", "no", "no model beat it");
        ledger
            .resolve(&ctx_at(owner(), AFTER_ALL), "ai", &oracle)
            .await
            .unwrap();

        let replica = Ledger::replay(
            owner(),
            ledger.config().clone(),
            ledger.journal().entries(),
        )
        .unwrap();

        assert_eq!(replica.state_digest().unwrap(), ledger.state_digest().unwrap());
        assert_eq!(replica, ledger);
    }

    #[test]
    fn test_replay_rejects_gaps() {
        let ledger = seeded_ledger();
        let mut entries = ledger.journal().entries().to_vec();
        entries.remove(1);

        let result = Ledger::replay(owner(), LedgerConfig::default(), &entries);
        assert!(matches!(result, Err(LedgerError::Replay(_))));
    }

    #[test]
    fn test_digest_changes_with_state() {
        let mut ledger = seeded_ledger();
        let before = ledger.state_digest().unwrap();
        predict(&mut ledger, 1, ["Draw", "yes", "no"]);
        assert_ne!(ledger.state_digest().unwrap(), before);
    }

    #[test]
    fn test_recover_interrupted_settlement() {
        let mut ledger = seeded_ledger();
        predict(&mut ledger, 1, ["Draw", "yes", "no"]);
        predict(&mut ledger, 2, ["Draw", "no", "no"]);

        // Persisted outcome with a tally that stopped after participant 1.
        let mut snapshot = serde_json::to_value(&ledger).unwrap();
        let event = &mut snapshot["registry"]["events"][0];
        event["status"] = "resolved".into();
        event["certified_outcome"] = "Draw".into();
        event["reason"] = "1-1".into();
        event["settlement"] = serde_json::to_value(SettlementRecord {
            credited: [address(1)].into_iter().collect(),
            complete: false,
        })
        .unwrap();
        let mut points = serde_json::Map::new();
        points.insert(address(1).to_string(), 1.into());
        snapshot["scores"]["points"] = points.into();
        let mut ledger: Ledger = serde_json::from_value(snapshot).unwrap();

        let recovered = ledger.recover_settlements().unwrap();
        assert_eq!(recovered, vec![("match".to_string(), vec![address(2)])]);
        assert_eq!(ledger.scores().points_of(&address(1)), 1);
        assert_eq!(ledger.scores().points_of(&address(2)), 1);
        assert!(ledger.recover_settlements().unwrap().is_empty());
    }

    #[test]
    fn test_binary_event_has_fixed_space() {
        let ledger = seeded_ledger();
        let event = ledger.registry().find_event("ai").unwrap();
        assert_eq!(event.outcomes, OutcomeSpace::Binary);
        assert_eq!(event.outcomes.labels(), vec!["yes", "no"]);
    }
}
