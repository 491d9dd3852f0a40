//! # Score Board
//!
//! Cumulative integer points per participant. Points are only ever added.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::identity::Address;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ScoreBoard {
    points: BTreeMap<Address, u64>,
}

impl ScoreBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add exactly one point, creating the entry at zero first if absent.
    /// Returns the new total.
    pub(crate) fn add_point(&mut self, participant: &Address) -> u64 {
        let entry = self.points.entry(participant.clone()).or_insert(0);
        *entry = entry.saturating_add(1);
        *entry
    }

    /// Points of a participant, zero when unknown
    pub fn points_of(&self, participant: &Address) -> u64 {
        self.points.get(participant).copied().unwrap_or(0)
    }

    /// All entries in address order
    pub fn all(&self) -> &BTreeMap<Address, u64> {
        &self.points
    }

    /// Entries sorted by points descending, ties broken by address
    pub fn leaderboard(&self) -> Vec<(Address, u64)> {
        let mut entries: Vec<_> = self
            .points
            .iter()
            .map(|(address, points)| (address.clone(), *points))
            .collect();
        entries.sort_by(|(a_addr, a_pts), (b_addr, b_pts)| {
            b_pts.cmp(a_pts).then_with(|| a_addr.cmp(b_addr))
        });
        entries
    }
}
