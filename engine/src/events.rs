//! # Event Bus
//!
//! Append-only, ordered log of every committed state transition.
//!
//! The bus is purely observational: replaying it is never required to
//! reconstruct ledger state (the [`LedgerStore`](crate::storage::LedgerStore)
//! remains the source of truth), but the log is sufficient to reconstruct
//! a full audit trail. Committed events are never edited, deleted, or
//! reordered, and every event carries a stable global sequence number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::AccountId;

/// Payload of a committed state transition.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// A new project was created.
    ProjectCreated {
        project_id: u64,
        creator: AccountId,
        total_amount: i128,
    },
    /// A contribution was accepted into escrow custody.
    ProjectFunded {
        project_id: u64,
        contributor: AccountId,
        amount: i128,
    },
    /// The verifier confirmed a milestone. No funds moved.
    MilestoneVerified { project_id: u64, index: u32 },
    /// A verified milestone was paid out to the recipient.
    MilestonePaid {
        project_id: u64,
        index: u32,
        amount: i128,
    },
    /// Every milestone was paid and the project was closed.
    ProjectCompleted { project_id: u64 },
    /// A completion certificate was minted for the recipient.
    ImpactTokenAwarded {
        project_id: u64,
        certificate_id: u64,
        recipient: AccountId,
    },
}

impl EventKind {
    /// The project this event belongs to.
    pub fn project_id(&self) -> u64 {
        match self {
            Self::ProjectCreated { project_id, .. }
            | Self::ProjectFunded { project_id, .. }
            | Self::MilestoneVerified { project_id, .. }
            | Self::MilestonePaid { project_id, .. }
            | Self::ProjectCompleted { project_id }
            | Self::ImpactTokenAwarded { project_id, .. } => *project_id,
        }
    }

    /// Short identifier string suitable for storage in a database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectCreated { .. } => "project_created",
            Self::ProjectFunded { .. } => "project_funded",
            Self::MilestoneVerified { .. } => "milestone_verified",
            Self::MilestonePaid { .. } => "milestone_paid",
            Self::ProjectCompleted { .. } => "project_completed",
            Self::ImpactTokenAwarded { .. } => "impact_token_awarded",
        }
    }
}

/// A committed event: payload plus its position in the global order.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Global sequence number, dense, starting at 1.
    pub seq: u64,
    /// Commit time.
    pub recorded_at: DateTime<Utc>,
    /// What happened.
    pub kind: EventKind,
}

/// Append-only event log.
#[derive(Debug, Default)]
pub struct EventBus {
    log: Vec<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one event and return its assigned sequence number.
    pub fn append(&mut self, kind: EventKind) -> u64 {
        let seq = self.log.len() as u64 + 1;
        self.log.push(Event {
            seq,
            recorded_at: Utc::now(),
            kind,
        });
        seq
    }

    /// Number of committed events.
    pub fn len(&self) -> u64 {
        self.log.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// All committed events in sequence order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.log.iter()
    }

    /// Events belonging to one project, in sequence order.
    pub fn for_project(&self, project_id: u64) -> impl Iterator<Item = &Event> {
        self.log
            .iter()
            .filter(move |e| e.kind.project_id() == project_id)
    }

    /// Events with `seq > after`, in sequence order. Cursor iteration
    /// for external recorders.
    pub fn since(&self, after: u64) -> &[Event] {
        // Sequence numbers are dense from 1, so `after` is also an index.
        let start = (after as usize).min(self.log.len());
        &self.log[start..]
    }
}
