//! # Types
//!
//! Shared data structures used across all modules of the escrow engine.
//!
//! ## Design decisions
//!
//! ### Explicit roles
//!
//! A [`Project`] names three identities with distinct powers:
//!
//! - `creator` — the identity that defined the project.
//! - `verifier` — the identity allowed to verify milestones, release
//!   payouts, and close the project. Set to the creator at creation.
//! - `recipient` — the funded party. Receives every milestone payout and
//!   owns the completion certificate. Has no authorizing power.
//!
//! ### Milestone state as a Finite-State Machine
//!
//! [`MilestoneState`] enforces a strict forward-only lifecycle:
//!
//! ```text
//! Pending ──► Verified ──► Paid
//! ```
//!
//! No transition skips a state and no transition reverses; `Paid` is
//! terminal. Backward or skipping transitions are rejected by the engine
//! with [`Error::InvalidStateTransition`](crate::Error::InvalidStateTransition).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An opaque caller identity.
///
/// Wallet connection, key custody, and signature verification are external
/// collaborators; by the time an operation reaches the engine the caller
/// has already been authenticated and is represented by this newtype.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        AccountId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        AccountId(s.to_owned())
    }
}

/// Lifecycle state of a single milestone.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneState {
    /// Awaiting off-band confirmation.
    Pending,
    /// Confirmed by the verifier; eligible for payout.
    Verified,
    /// Payout released to the recipient. Terminal.
    Paid,
}

/// A discrete, independently verifiable and payable portion of a
/// project's total funding.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    /// Immutable description of the deliverable.
    pub description: String,
    /// Amount released to the recipient when this milestone is paid.
    pub amount: i128,
    /// Current lifecycle state.
    pub state: MilestoneState,
}

/// A funded project with its milestone schedule.
///
/// `total_amount`, `name`, `description`, the role fields, and the
/// milestone count/amounts/descriptions are fixed at creation. Only
/// `funds_raised`, `contributor`, `is_complete`, and the milestone
/// states change afterwards.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier; dense, assigned in creation order starting at 1.
    pub id: u64,
    /// Identity that defined the project.
    pub creator: AccountId,
    /// Identity authorized to verify, pay, and complete.
    pub verifier: AccountId,
    /// Funded party; receives payouts and the completion certificate.
    pub recipient: AccountId,
    /// Most recent contributor, if any. The event log carries the full
    /// contribution history.
    pub contributor: Option<AccountId>,
    /// Immutable display name.
    pub name: String,
    /// Immutable description.
    pub description: String,
    /// Sum of all milestone amounts; fixed at creation.
    pub total_amount: i128,
    /// Cumulative accepted contributions; never exceeds `total_amount`.
    pub funds_raised: i128,
    /// Set exactly once, after every milestone is paid. Irreversible.
    pub is_complete: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Index-addressed milestone schedule; count fixed at creation.
    pub milestones: Vec<Milestone>,
}

impl Project {
    /// Sum of amounts over milestones that have reached `Paid`.
    pub fn paid_total(&self) -> i128 {
        self.milestones
            .iter()
            .filter(|m| m.state == MilestoneState::Paid)
            .map(|m| m.amount)
            .sum()
    }

    /// Contributions still held in custody (raised minus released).
    pub fn escrow_held(&self) -> i128 {
        self.funds_raised - self.paid_total()
    }

    /// True once every milestone has been paid.
    pub fn all_milestones_paid(&self) -> bool {
        self.milestones
            .iter()
            .all(|m| m.state == MilestoneState::Paid)
    }
}

/// An immutable completion record minted once per finished project.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    /// Global sequence number, assigned at mint starting at 1.
    pub id: u64,
    /// Owning identity (the project's recipient).
    pub owner: AccountId,
    /// Project this certificate settles.
    pub project_id: u64,
    /// Project name at completion time.
    pub project_name: String,
    /// Project description at completion time.
    pub description: String,
    /// Measured impact, as reported at completion.
    pub impact_value: u64,
    /// URI of the impact artwork / evidence image.
    pub image_uri: String,
    /// Mint time.
    pub issued_at: DateTime<Utc>,
}
