#![allow(dead_code)]

//! Invariant assertion helpers shared by the lifecycle tests. Each
//! check corresponds to one guarantee the ledger must uphold at every
//! observable boundary.

use crate::types::{MilestoneState, Project};
use crate::EscrowEngine;

/// INV-1: the milestone amounts always sum to the project total.
pub fn assert_milestone_sum_matches_total(project: &Project) {
    let sum: i128 = project.milestones.iter().map(|m| m.amount).sum();
    assert_eq!(
        sum, project.total_amount,
        "INV-1 violated: project {} milestone sum {} != total {}",
        project.id, sum, project.total_amount
    );
}

/// INV-2: funds raised stay within `[0, total_amount]`.
pub fn assert_funds_raised_bounded(project: &Project) {
    assert!(
        project.funds_raised >= 0 && project.funds_raised <= project.total_amount,
        "INV-2 violated: project {} funds_raised {} outside [0, {}]",
        project.id,
        project.funds_raised,
        project.total_amount
    );
}

/// INV-3: no milestone is `Paid` without enough raised to cover the
/// cumulative paid amount.
pub fn assert_paid_covered_by_raised(project: &Project) {
    assert!(
        project.paid_total() <= project.funds_raised,
        "INV-3 violated: project {} paid {} exceeds raised {}",
        project.id,
        project.paid_total(),
        project.funds_raised
    );
}

/// INV-4: a complete project has every milestone `Paid`.
pub fn assert_complete_implies_all_paid(project: &Project) {
    if project.is_complete {
        assert!(
            project
                .milestones
                .iter()
                .all(|m| m.state == MilestoneState::Paid),
            "INV-4 violated: project {} complete with unpaid milestones",
            project.id
        );
    }
}

/// INV-5: milestone state transitions never reverse or skip.
pub fn assert_valid_milestone_transition(from: MilestoneState, to: MilestoneState) {
    let valid = matches!(
        (from, to),
        (MilestoneState::Pending, MilestoneState::Verified)
            | (MilestoneState::Verified, MilestoneState::Paid)
    );
    assert!(
        valid,
        "INV-5 violated: invalid milestone transition from {:?} to {:?}",
        from, to
    );
}

/// INV-6: project ids are dense, starting at 1, in creation order.
pub fn assert_dense_project_ids(engine: &EscrowEngine) {
    for id in 1..=engine.project_count() {
        let project = engine
            .get_project(id)
            .unwrap_or_else(|_| panic!("INV-6 violated: missing project id {id}"));
        assert_eq!(project.id, id, "INV-6 violated: project row id mismatch");
    }
}

/// INV-7: event sequence numbers are dense, starting at 1, in commit order.
pub fn assert_dense_event_seqs(engine: &EscrowEngine) {
    for (i, event) in engine.events().enumerate() {
        assert_eq!(
            event.seq,
            i as u64 + 1,
            "INV-7 violated: event sequence gap at position {i}"
        );
    }
}

/// Run all stateless project invariants.
pub fn assert_all_project_invariants(project: &Project) {
    assert_milestone_sum_matches_total(project);
    assert_funds_raised_bounded(project);
    assert_paid_covered_by_raised(project);
    assert_complete_implies_all_paid(project);
}
