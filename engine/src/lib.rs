//! # Escrow Engine
//!
//! Root crate of the milestone escrow core. It exposes the single
//! [`EscrowEngine`] whose operations cover the full project lifecycle:
//!
//! | Phase        | Operation(s)                                        |
//! |--------------|-----------------------------------------------------|
//! | Creation     | [`EscrowEngine::create_project`]                    |
//! | Funding      | [`EscrowEngine::contribute`]                        |
//! | Verification | [`EscrowEngine::verify_milestone`]                  |
//! | Payout       | [`EscrowEngine::pay_milestone`]                     |
//! | Settlement   | [`EscrowEngine::complete_project`]                  |
//! | Queries      | `get_project`, `get_milestone`, `project_count`, `certificate`, `certificates_of`, `events`, ... |
//!
//! ## Architecture
//!
//! Project and milestone state is fully delegated to [`storage`]; the
//! completion record to [`certificates`]; the audit trail to [`events`].
//! This file contains only the operation surface: role checks, state
//! preconditions, and the commit order.
//!
//! ## Execution model
//!
//! The engine is strictly single-writer. Every mutating operation takes
//! `&mut self` and runs to completion — validation, state mutation, fund
//! movement, event emission — before the next can begin. Validation
//! strictly precedes the first mutation, so a failed operation commits
//! nothing. A multi-threaded host must put one mutual-exclusion boundary
//! (a mutex or writer lock) around the engine; reads through `&self`
//! then always observe a fully committed snapshot.

use tracing::info;

pub mod certificates;
pub mod events;
pub mod storage;
pub mod types;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_events;

use certificates::CertificateIssuer;
use events::{Event, EventBus, EventKind};
use storage::LedgerStore;
use types::{AccountId, Certificate, Milestone, MilestoneState, Project};

/// Everything that can go wrong at the operation surface.
///
/// Every variant is detected before any mutation begins; an operation
/// that returns an error has changed no observable state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Milestone amount and description lists differ in length or are empty.
    #[error("milestone amounts ({amounts}) and descriptions ({descriptions}) must be equal-length and non-empty")]
    ArityMismatch { amounts: usize, descriptions: usize },

    /// A milestone amount or contribution was not strictly positive.
    #[error("amount must be positive, got {0}")]
    InvalidAmount(i128),

    #[error("project {0} not found")]
    ProjectNotFound(u64),

    #[error("certificate {0} not found")]
    CertificateNotFound(u64),

    #[error("project {project_id} has no milestone at index {index}")]
    MilestoneIndexOutOfRange { project_id: u64, index: u32 },

    #[error("project {0} is already complete")]
    ProjectAlreadyComplete(u64),

    #[error("contribution of {amount} exceeds the {remaining} still acceptable")]
    ContributionExceedsRemaining { amount: i128, remaining: i128 },

    /// Caller is not the project's verifying identity.
    #[error("{caller} is not authorized on project {project_id}")]
    Unauthorized { caller: AccountId, project_id: u64 },

    /// A milestone transition that skips or reverses the
    /// `Pending → Verified → Paid` machine.
    #[error(
        "milestone {index} of project {project_id} is {actual:?}, operation requires {expected:?}"
    )]
    InvalidStateTransition {
        project_id: u64,
        index: u32,
        expected: MilestoneState,
        actual: MilestoneState,
    },

    /// Paying this milestone would release more than was ever raised.
    #[error("paying milestone {index} of project {project_id} requires {required} raised, have {available}")]
    InsufficientFunds {
        project_id: u64,
        index: u32,
        required: i128,
        available: i128,
    },

    #[error("project {0} still has unpaid milestones")]
    ProjectNotComplete(u64),

    #[error("certificate mint failed: {0}")]
    MintFailure(String),

    /// A ledger write failed its record-invariant check. Unreachable
    /// through the public operations; surfaced rather than swallowed.
    #[error("ledger invariant violated: {0}")]
    InvariantViolation(String),
}

/// The fund-custody and milestone-release core.
#[derive(Debug, Default)]
pub struct EscrowEngine {
    ledger: LedgerStore,
    issuer: CertificateIssuer,
    bus: EventBus,
}

impl EscrowEngine {
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────
    // Mutating operations
    // ─────────────────────────────────────────────────────────

    /// Create a new project with a fixed milestone schedule.
    ///
    /// The caller becomes both `creator` and `verifier`; `recipient` is
    /// the payout beneficiary. `total_amount` is the sum of
    /// `milestone_amounts`, fixed for the project's lifetime. Milestones
    /// start `Pending` in the given order.
    ///
    /// Emits `ProjectCreated(id, creator, total_amount)` and returns the
    /// assigned id (dense, starting at 1).
    pub fn create_project(
        &mut self,
        caller: &AccountId,
        recipient: AccountId,
        milestone_amounts: Vec<i128>,
        milestone_descriptions: Vec<String>,
        name: String,
        description: String,
    ) -> Result<u64, Error> {
        if milestone_amounts.is_empty() || milestone_amounts.len() != milestone_descriptions.len()
        {
            return Err(Error::ArityMismatch {
                amounts: milestone_amounts.len(),
                descriptions: milestone_descriptions.len(),
            });
        }
        let mut total_amount: i128 = 0;
        for &amount in &milestone_amounts {
            if amount <= 0 {
                return Err(Error::InvalidAmount(amount));
            }
            total_amount = total_amount
                .checked_add(amount)
                .ok_or(Error::InvalidAmount(amount))?;
        }

        let id = self.ledger.allocate_project_id();
        let milestones = milestone_amounts
            .into_iter()
            .zip(milestone_descriptions)
            .map(|(amount, description)| Milestone {
                description,
                amount,
                state: MilestoneState::Pending,
            })
            .collect();

        let project = Project {
            id,
            creator: caller.clone(),
            verifier: caller.clone(),
            recipient,
            contributor: None,
            name,
            description,
            total_amount,
            funds_raised: 0,
            is_complete: false,
            created_at: chrono::Utc::now(),
            milestones,
        };
        self.ledger.save_project(project)?;
        self.bus.append(EventKind::ProjectCreated {
            project_id: id,
            creator: caller.clone(),
            total_amount,
        });

        info!(project_id = id, creator = %caller, %total_amount, "project created");
        Ok(id)
    }

    /// Accept a contribution into escrow custody.
    ///
    /// The monetary transfer into custody and the `funds_raised` update
    /// are one indivisible commit; there is no partial-credit state.
    /// Records the caller as the project's contributor and emits
    /// `ProjectFunded(id, contributor, amount)`.
    pub fn contribute(
        &mut self,
        caller: &AccountId,
        project_id: u64,
        amount: i128,
    ) -> Result<(), Error> {
        let mut project = self.ledger.load_project(project_id)?.clone();
        if project.is_complete {
            return Err(Error::ProjectAlreadyComplete(project_id));
        }
        if amount <= 0 {
            return Err(Error::InvalidAmount(amount));
        }
        let remaining = project.total_amount - project.funds_raised;
        if amount > remaining {
            return Err(Error::ContributionExceedsRemaining { amount, remaining });
        }

        project.funds_raised += amount;
        project.contributor = Some(caller.clone());
        self.ledger.save_project(project)?;
        self.bus.append(EventKind::ProjectFunded {
            project_id,
            contributor: caller.clone(),
            amount,
        });

        info!(project_id, contributor = %caller, %amount, "contribution accepted");
        Ok(())
    }

    /// Confirm a milestone as delivered. Verifier only; no funds move.
    ///
    /// Emits `MilestoneVerified(id, index)`.
    pub fn verify_milestone(
        &mut self,
        caller: &AccountId,
        project_id: u64,
        index: u32,
    ) -> Result<(), Error> {
        let mut project = self.ledger.load_project(project_id)?.clone();
        require_verifier(&project, caller)?;
        let milestone = milestone_at(&project, index)?;
        if milestone.state != MilestoneState::Pending {
            return Err(Error::InvalidStateTransition {
                project_id,
                index,
                expected: MilestoneState::Pending,
                actual: milestone.state,
            });
        }

        project.milestones[index as usize].state = MilestoneState::Verified;
        self.ledger.save_project(project)?;
        self.bus
            .append(EventKind::MilestoneVerified { project_id, index });

        info!(project_id, index, "milestone verified");
        Ok(())
    }

    /// Release a verified milestone's amount from custody to the recipient.
    ///
    /// Requires the milestone to be `Verified`, and re-checks that
    /// contributions actually cover the cumulative paid amount — the
    /// contribution cap alone would already bound total payouts, but the
    /// pay-time check keeps custody non-negative at every step.
    ///
    /// Emits `MilestonePaid(id, index, amount)`.
    pub fn pay_milestone(
        &mut self,
        caller: &AccountId,
        project_id: u64,
        index: u32,
    ) -> Result<(), Error> {
        let mut project = self.ledger.load_project(project_id)?.clone();
        require_verifier(&project, caller)?;
        let milestone = milestone_at(&project, index)?;
        if milestone.state != MilestoneState::Verified {
            return Err(Error::InvalidStateTransition {
                project_id,
                index,
                expected: MilestoneState::Verified,
                actual: milestone.state,
            });
        }
        let amount = milestone.amount;
        let required = project.paid_total() + amount;
        if required > project.funds_raised {
            return Err(Error::InsufficientFunds {
                project_id,
                index,
                required,
                available: project.funds_raised,
            });
        }

        project.milestones[index as usize].state = MilestoneState::Paid;
        let recipient = project.recipient.clone();
        self.ledger.save_project(project)?;
        self.ledger.credit_payout(&recipient, amount);
        self.bus.append(EventKind::MilestonePaid {
            project_id,
            index,
            amount,
        });

        info!(project_id, index, %amount, recipient = %recipient, "milestone paid");
        Ok(())
    }

    /// Close a fully paid project and mint its completion certificate.
    ///
    /// The certificate is minted first and the completion flag committed
    /// only afterwards, so a [`Error::MintFailure`] leaves the project
    /// untouched: flag and certificate succeed or fail as one unit.
    ///
    /// Emits `ProjectCompleted(id)` then
    /// `ImpactTokenAwarded(id, certificate_id, recipient)` and returns
    /// the certificate id.
    pub fn complete_project(
        &mut self,
        caller: &AccountId,
        project_id: u64,
        impact_value: u64,
        image_uri: String,
    ) -> Result<u64, Error> {
        let mut project = self.ledger.load_project(project_id)?.clone();
        require_verifier(&project, caller)?;
        if project.is_complete {
            return Err(Error::ProjectAlreadyComplete(project_id));
        }
        if !project.all_milestones_paid() {
            return Err(Error::ProjectNotComplete(project_id));
        }

        let certificate_id = self.issuer.mint(
            project.recipient.clone(),
            project_id,
            project.name.clone(),
            project.description.clone(),
            impact_value,
            image_uri,
        )?;

        project.is_complete = true;
        let recipient = project.recipient.clone();
        self.ledger.save_project(project)?;
        self.bus.append(EventKind::ProjectCompleted { project_id });
        self.bus.append(EventKind::ImpactTokenAwarded {
            project_id,
            certificate_id,
            recipient: recipient.clone(),
        });

        info!(project_id, certificate_id, recipient = %recipient, "project completed");
        Ok(certificate_id)
    }

    // ─────────────────────────────────────────────────────────
    // Reads — side-effect-free, latest committed state
    // ─────────────────────────────────────────────────────────

    pub fn get_project(&self, project_id: u64) -> Result<&Project, Error> {
        self.ledger.load_project(project_id)
    }

    pub fn get_milestone(&self, project_id: u64, index: u32) -> Result<&Milestone, Error> {
        self.ledger.load_milestone(project_id, index)
    }

    /// Number of projects ever created.
    pub fn project_count(&self) -> u64 {
        self.ledger.project_count()
    }

    /// Cumulative amount released from custody to `account`.
    pub fn payout_balance(&self, account: &AccountId) -> i128 {
        self.ledger.payout_balance(account)
    }

    pub fn certificate(&self, certificate_id: u64) -> Option<&Certificate> {
        self.issuer.get(certificate_id)
    }

    pub fn certificates_of(&self, owner: &AccountId) -> Vec<&Certificate> {
        self.issuer.owned_by(owner)
    }

    pub fn certificate_count(&self) -> u64 {
        self.issuer.count()
    }

    /// Full audit trail in commit order.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.bus.iter()
    }

    /// Audit trail of one project, in commit order.
    pub fn events_for_project(&self, project_id: u64) -> impl Iterator<Item = &Event> {
        self.bus.for_project(project_id)
    }

    /// Events past a sequence-number cursor, for external recorders.
    pub fn events_since(&self, after: u64) -> &[Event] {
        self.bus.since(after)
    }

    /// Sequence number of the latest committed event.
    pub fn last_event_seq(&self) -> u64 {
        self.bus.len()
    }
}

fn require_verifier(project: &Project, caller: &AccountId) -> Result<(), Error> {
    if &project.verifier != caller {
        return Err(Error::Unauthorized {
            caller: caller.clone(),
            project_id: project.id,
        });
    }
    Ok(())
}

fn milestone_at(project: &Project, index: u32) -> Result<&Milestone, Error> {
    project
        .milestones
        .get(index as usize)
        .ok_or(Error::MilestoneIndexOutOfRange {
            project_id: project.id,
            index,
        })
}
