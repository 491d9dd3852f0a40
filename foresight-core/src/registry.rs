//! # Event Registry
//!
//! Owns the ordered set of betting events and their lifecycle. Creation
//! order matters: participation slots are addressed by an event's position
//! in this registry.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::Result,
    event::{Event, EventStatus, NewEvent},
    identity::TxContext,
    LedgerError,
};

/// Events in creation order.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct EventRegistry {
    events: Vec<Event>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new open event.
    ///
    /// Fails with `DuplicateId` if the id is taken and with
    /// `InvalidOutcomeSpace` if a multi-outcome space has fewer than two
    /// labels. No existing event is touched.
    pub fn create_event(&mut self, new_event: NewEvent) -> Result<&Event> {
        if self.find_event(&new_event.id).is_ok() {
            return Err(LedgerError::DuplicateId(new_event.id));
        }
        new_event.outcomes.validate()?;

        self.events.push(Event::open(new_event));
        let event = &self.events[self.events.len() - 1];
        info!(
            event_id = %event.id,
            deadline = %event.resolution_date,
            outcomes = event.outcomes.len(),
            "event created"
        );
        Ok(event)
    }

    pub fn find_event(&self, id: &str) -> Result<&Event> {
        self.events
            .iter()
            .find(|event| event.id == id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))
    }

    pub(crate) fn find_event_mut(&mut self, id: &str) -> Result<&mut Event> {
        self.events
            .iter_mut()
            .find(|event| event.id == id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))
    }

    /// Creation-order position of an event, which is also its prediction slot
    pub fn position_of(&self, id: &str) -> Result<usize> {
        self.events
            .iter()
            .position(|event| event.id == id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))
    }

    /// Check that an event can move to `Resolved` at `ctx.now`.
    pub fn ensure_resolvable(&self, id: &str, ctx: &TxContext) -> Result<&Event> {
        let event = self.find_event(id)?;
        if event.is_resolved() {
            return Err(LedgerError::AlreadyResolved(id.to_string()));
        }
        if !event.is_past_deadline(ctx.now) {
            return Err(LedgerError::TooEarly {
                id: id.to_string(),
                deadline: event.resolution_date,
            });
        }
        Ok(event)
    }

    /// Persist the certified outcome and flip the status to `Resolved`.
    ///
    /// Only the settlement engine calls this. `outcome` must already be a
    /// member of the event's outcome space.
    pub(crate) fn mark_resolved(
        &mut self,
        id: &str,
        outcome: &str,
        reason: &str,
        ctx: &TxContext,
    ) -> Result<&mut Event> {
        self.ensure_resolvable(id, ctx)?;

        let event = self.find_event_mut(id)?;
        debug_assert!(event.outcomes.index_of(outcome).is_some());
        event.status = EventStatus::Resolved;
        event.certified_outcome = Some(outcome.to_string());
        event.reason = reason.to_string();
        Ok(event)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
