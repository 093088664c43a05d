//! Flat event shapes for the SQLite audit trail.
//!
//! The engine's typed [`EventKind`] payloads are flattened into one row
//! shape so the log can be stored and queried uniformly: `actor` holds
//! whichever identity the event names, `amount` is stringified (i128
//! does not fit an SQLite integer column), and the index/certificate
//! columns stay NULL where the event carries neither.

use escrow_engine::events::{Event, EventKind};
use serde::{Deserialize, Serialize};

/// A decoded engine event, ready to be inserted into the database.
#[derive(Debug, Clone, Serialize)]
pub struct NewEvent {
    pub seq: i64,
    pub event_type: String,
    pub project_id: i64,
    pub actor: Option<String>,
    pub amount: Option<String>,
    pub milestone_index: Option<i64>,
    pub certificate_id: Option<i64>,
    pub recorded_at: String,
}

impl From<&Event> for NewEvent {
    fn from(event: &Event) -> Self {
        let (actor, amount, milestone_index, certificate_id) = match &event.kind {
            EventKind::ProjectCreated {
                creator,
                total_amount,
                ..
            } => (
                Some(creator.to_string()),
                Some(total_amount.to_string()),
                None,
                None,
            ),
            EventKind::ProjectFunded {
                contributor,
                amount,
                ..
            } => (
                Some(contributor.to_string()),
                Some(amount.to_string()),
                None,
                None,
            ),
            EventKind::MilestoneVerified { index, .. } => (None, None, Some(*index as i64), None),
            EventKind::MilestonePaid { index, amount, .. } => {
                (None, Some(amount.to_string()), Some(*index as i64), None)
            }
            EventKind::ProjectCompleted { .. } => (None, None, None, None),
            EventKind::ImpactTokenAwarded {
                certificate_id,
                recipient,
                ..
            } => (
                Some(recipient.to_string()),
                None,
                None,
                Some(*certificate_id as i64),
            ),
        };

        NewEvent {
            seq: event.seq as i64,
            event_type: event.kind.as_str().to_string(),
            project_id: event.kind.project_id() as i64,
            actor,
            amount,
            milestone_index,
            certificate_id,
            recorded_at: event.recorded_at.to_rfc3339(),
        }
    }
}

/// An event row as stored in / read from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventRecord {
    pub seq: i64,
    pub event_type: String,
    pub project_id: i64,
    pub actor: Option<String>,
    pub amount: Option<String>,
    pub milestone_index: Option<i64>,
    pub certificate_id: Option<i64>,
    pub recorded_at: String,
    pub created_at: i64,
}
