//! # Ledger Store
//!
//! Owns all Project and Milestone state: a project table keyed by dense
//! sequential ids plus a payout ledger tracking funds released from
//! custody per recipient. Pure data access — no authorization and no
//! lifecycle rules live here — but every write re-validates the record
//! invariants, so a buggy caller cannot commit a project that violates
//! conservation of funds.
//!
//! | Table            | Key         | Value                               |
//! |------------------|-------------|-------------------------------------|
//! | projects         | `u64` id    | [`Project`] with milestones inline  |
//! | payouts          | `AccountId` | cumulative amount released          |
//!
//! Project ids are allocated by [`LedgerStore::allocate_project_id`],
//! the single counter authority: dense, starting at 1, in creation
//! order, never reused.

use std::collections::BTreeMap;

use tracing::debug;

use crate::types::{AccountId, Milestone, MilestoneState, Project};
use crate::Error;

/// In-memory project table with invariant-checked writes.
#[derive(Debug, Default)]
pub struct LedgerStore {
    projects: BTreeMap<u64, Project>,
    payouts: BTreeMap<AccountId, i128>,
    next_project_id: u64,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve and return the next project id (first call returns 1).
    pub fn allocate_project_id(&mut self) -> u64 {
        self.next_project_id += 1;
        self.next_project_id
    }

    /// Number of projects ever created.
    pub fn project_count(&self) -> u64 {
        self.projects.len() as u64
    }

    /// Load a project by id.
    pub fn load_project(&self, id: u64) -> Result<&Project, Error> {
        self.projects.get(&id).ok_or(Error::ProjectNotFound(id))
    }

    /// Load one milestone of a project by index.
    pub fn load_milestone(&self, id: u64, index: u32) -> Result<&Milestone, Error> {
        let project = self.load_project(id)?;
        project
            .milestones
            .get(index as usize)
            .ok_or(Error::MilestoneIndexOutOfRange {
                project_id: id,
                index,
            })
    }

    /// Write a project row. The record invariants are checked first and a
    /// violating write commits nothing.
    pub fn save_project(&mut self, project: Project) -> Result<(), Error> {
        check_invariants(&project)?;
        debug!(
            project_id = project.id,
            funds_raised = %project.funds_raised,
            "ledger write"
        );
        self.projects.insert(project.id, project);
        Ok(())
    }

    /// Record `amount` as released from custody to `recipient`.
    pub fn credit_payout(&mut self, recipient: &AccountId, amount: i128) {
        *self.payouts.entry(recipient.clone()).or_insert(0) += amount;
    }

    /// Cumulative amount released to `account` across all projects.
    pub fn payout_balance(&self, account: &AccountId) -> i128 {
        self.payouts.get(account).copied().unwrap_or(0)
    }
}

/// Record-level invariants enforced on every write.
///
/// The public engine operations validate before mutating and can never
/// trip these; they exist so that a violated write surfaces as an error
/// instead of silently corrupting the ledger.
fn check_invariants(project: &Project) -> Result<(), Error> {
    let milestone_sum: i128 = project.milestones.iter().map(|m| m.amount).sum();
    if milestone_sum != project.total_amount {
        return Err(Error::InvariantViolation(format!(
            "project {}: milestone sum {} != total {}",
            project.id, milestone_sum, project.total_amount
        )));
    }
    if project.funds_raised < 0 || project.funds_raised > project.total_amount {
        return Err(Error::InvariantViolation(format!(
            "project {}: funds_raised {} outside [0, {}]",
            project.id, project.funds_raised, project.total_amount
        )));
    }
    if project.paid_total() > project.funds_raised {
        return Err(Error::InvariantViolation(format!(
            "project {}: paid total {} exceeds funds_raised {}",
            project.id,
            project.paid_total(),
            project.funds_raised
        )));
    }
    if project.is_complete
        && project
            .milestones
            .iter()
            .any(|m| m.state != MilestoneState::Paid)
    {
        return Err(Error::InvariantViolation(format!(
            "project {}: complete with unpaid milestones",
            project.id
        )));
    }
    Ok(())
}
