//! # Query Surface
//!
//! Read-only projections over the ledger for external consumers. Nothing in
//! here mutates state.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    event::{Event, EventStatus, ResolutionSpec},
    identity::Address,
    ledger::Ledger,
    participation::{Handles, Slots},
};

/// An event together with every participant's prediction on it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EventView {
    pub id: String,
    pub resolution_date: NaiveDate,
    pub has_resolved: bool,
    pub status: EventStatus,
    pub resolution: ResolutionSpec,
    pub title: String,
    pub description: String,
    pub category: String,
    pub possible_outcomes: Vec<String>,
    /// Index of the certified outcome
    pub outcome: Option<usize>,
    pub certified_outcome: Option<String>,
    pub reason: String,
    /// Prediction index per participant with this slot set
    pub users_bets: BTreeMap<Address, usize>,
    /// 1 for a correct prediction on a resolved event, 0 otherwise
    pub users_points: BTreeMap<Address, u64>,
}

/// One prediction slot as seen by its participant.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SlotView {
    pub event_id: String,
    pub prediction: Option<usize>,
    pub prediction_label: Option<String>,
    pub has_resolved: bool,
    pub correct_outcome: Option<String>,
    pub points_earned: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ParticipantView {
    pub address: Address,
    pub handles: Handles,
    pub slots: Vec<SlotView>,
    pub total_points: u64,
}

/// Full export of handles and predictions.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ParticipationExport {
    pub total_users: usize,
    pub user_addresses: Vec<Address>,
    pub user_bet_selections: BTreeMap<Address, Slots>,
    pub user_handlers: BTreeMap<Address, Handles>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub address: Address,
    pub points: u64,
}

impl Ledger {
    fn event_view(&self, slot: usize, event: &Event) -> EventView {
        let winning = event.outcome_index();
        let mut users_bets = BTreeMap::new();
        let mut users_points = BTreeMap::new();
        for (participant, prediction) in self.participation().predictions_at(slot) {
            users_bets.insert(participant.clone(), prediction);
            let point = u64::from(event.is_resolved() && winning == Some(prediction));
            users_points.insert(participant.clone(), point);
        }

        EventView {
            id: event.id.clone(),
            resolution_date: event.resolution_date,
            has_resolved: event.is_resolved(),
            status: event.status,
            resolution: event.resolution.clone(),
            title: event.metadata.title.clone(),
            description: event.metadata.description.clone(),
            category: event.metadata.category.clone(),
            possible_outcomes: event.outcomes.labels().into_iter().map(String::from).collect(),
            outcome: winning,
            certified_outcome: event.certified_outcome.clone(),
            reason: event.reason.clone(),
            users_bets,
            users_points,
        }
    }

    /// Every event in creation order
    pub fn list_events(&self) -> Vec<EventView> {
        self.registry()
            .events()
            .iter()
            .enumerate()
            .map(|(slot, event)| self.event_view(slot, event))
            .collect()
    }

    pub fn event_detail(&self, id: &str) -> Result<EventView> {
        let slot = self.registry().position_of(id)?;
        Ok(self.event_view(slot, self.registry().find_event(id)?))
    }

    pub fn score_of(&self, participant: &Address) -> u64 {
        self.scores().points_of(participant)
    }

    pub fn all_scores(&self) -> BTreeMap<Address, u64> {
        self.scores().all().clone()
    }

    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.scores()
            .leaderboard()
            .into_iter()
            .map(|(address, points)| LeaderboardEntry { address, points })
            .collect()
    }

    pub fn owner_address(&self) -> &Address {
        self.owner()
    }

    pub fn all_participation(&self) -> ParticipationExport {
        let participation = self.participation();
        let user_addresses: Vec<Address> = participation.participants().cloned().collect();

        ParticipationExport {
            total_users: user_addresses.len(),
            user_bet_selections: user_addresses
                .iter()
                .filter_map(|a| participation.slots_of(a).map(|s| (a.clone(), s.clone())))
                .collect(),
            user_handlers: user_addresses
                .iter()
                .map(|a| (a.clone(), participation.handles_of(a)))
                .collect(),
            user_addresses,
        }
    }

    /// One participant's handles, slots and points; `None` if they never
    /// participated.
    pub fn participant(&self, address: &Address) -> Option<ParticipantView> {
        let slots = self.participation().slots_of(address)?;
        let slots = self
            .registry()
            .events()
            .iter()
            .zip(slots)
            .map(|(event, prediction)| {
                let correct = event.outcome_index();
                SlotView {
                    event_id: event.id.clone(),
                    prediction: *prediction,
                    prediction_label: prediction
                        .and_then(|p| event.outcomes.label(p))
                        .map(String::from),
                    has_resolved: event.is_resolved(),
                    correct_outcome: event.certified_outcome.clone(),
                    points_earned: u64::from(
                        event.is_resolved() && prediction.is_some() && *prediction == correct,
                    ),
                }
            })
            .collect();

        Some(ParticipantView {
            address: address.clone(),
            handles: self.participation().handles_of(address),
            slots,
            total_points: self.score_of(address),
        })
    }
}
