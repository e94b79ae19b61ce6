//! Gating rules for the deposit and the per-phase milestone payments.
//!
//! Phases form a strictly sequential pipeline: the deposit unlocks
//! phase 0, and each later phase only opens once the previous phase's
//! payment has been approved. The validators return a typed refusal so
//! callers can decide whether to even issue a request.

use crate::domain::proposal::{Proposal, ProposalStatus};
use crate::errors::DomainError;

/// Customer submits the deposit payment notification.
pub fn ensure_deposit_submittable(proposal: &Proposal) -> Result<(), DomainError> {
    if proposal.status != ProposalStatus::Accepted {
        return Err(DomainError::NotAccepted { status: proposal.status });
    }
    if !proposal.customer_approvals.all_approved() {
        return Err(DomainError::ApprovalsIncomplete {
            approved: proposal.customer_approvals.approved_count(),
        });
    }
    if proposal.deposit_paid {
        return Err(DomainError::DepositAlreadyPaid);
    }
    if proposal.payment_submitted {
        return Err(DomainError::DepositAlreadySubmitted);
    }
    Ok(())
}

/// Admin/sales confirms a submitted deposit.
pub fn ensure_deposit_approvable(proposal: &Proposal) -> Result<(), DomainError> {
    if proposal.deposit_paid {
        return Err(DomainError::DepositAlreadyPaid);
    }
    if !proposal.payment_submitted {
        return Err(DomainError::DepositNotSubmitted);
    }
    Ok(())
}

/// Sales marks phase `index` as completed.
pub fn ensure_phase_completable(proposal: &Proposal, index: usize) -> Result<(), DomainError> {
    if !proposal.deposit_paid {
        return Err(DomainError::DepositUnpaid);
    }
    let phase = proposal.phase(index)?;
    if phase.completed {
        return Err(DomainError::PhaseAlreadyCompleted { index });
    }
    if index > 0 {
        // phase() above guarantees index is in range
        let previous = &proposal.phases[index - 1];
        if !previous.payment_approved {
            return Err(DomainError::PreviousPhaseUnpaid { index });
        }
    }
    Ok(())
}

/// Customer submits the payment for a completed phase.
pub fn ensure_phase_payment_submittable(
    proposal: &Proposal,
    index: usize,
) -> Result<(), DomainError> {
    let phase = proposal.phase(index)?;
    if !phase.completed {
        return Err(DomainError::PhaseNotCompleted { index });
    }
    if phase.payment_approved {
        return Err(DomainError::PhasePaymentAlreadyApproved { index });
    }
    if phase.payment_submitted {
        return Err(DomainError::PhasePaymentAlreadySubmitted { index });
    }
    Ok(())
}

/// Admin/sales approves a submitted phase payment.
pub fn ensure_phase_payment_approvable(
    proposal: &Proposal,
    index: usize,
) -> Result<(), DomainError> {
    let phase = proposal.phase(index)?;
    if phase.payment_approved {
        return Err(DomainError::PhasePaymentAlreadyApproved { index });
    }
    if !phase.payment_submitted {
        return Err(DomainError::PhasePaymentNotSubmitted { index });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::{
        ensure_deposit_approvable, ensure_deposit_submittable, ensure_phase_completable,
        ensure_phase_payment_approvable, ensure_phase_payment_submittable,
    };
    use crate::domain::project::ProjectId;
    use crate::domain::proposal::{
        ApprovalSection, CustomerApprovals, Phase, Proposal, ProposalId, ProposalStatus,
    };
    use crate::errors::DomainError;

    fn accepted_proposal() -> Proposal {
        let mut approvals = CustomerApprovals::default();
        for section in ApprovalSection::ALL {
            approvals.approve(section).expect("fresh checklist");
        }
        Proposal {
            id: ProposalId(Uuid::new_v4()),
            project_id: ProjectId(Uuid::new_v4()),
            created_by: None,
            project_analysis: Some("analysis".to_string()),
            deposit_amount: Decimal::new(500_000, 0),
            deposit_paid: false,
            deposit_paid_at: None,
            payment_submitted: false,
            payment_submitted_at: None,
            total_price: Decimal::new(10_000_000, 0),
            currency: "VND".to_string(),
            estimated_duration_days: Some(15),
            phases: vec![
                Phase::new("Giai đoạn 1", 15, Decimal::new(10_000_000, 0)),
                Phase::new("Giai đoạn 2", 10, Decimal::new(8_000_000, 0)),
            ],
            team_members: Vec::new(),
            deliverables: Vec::new(),
            status: ProposalStatus::Accepted,
            customer_notes: None,
            customer_approvals: approvals,
            accepted_at: Some(Utc::now()),
            rejected_at: None,
            rejection_reason: None,
            valid_until: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn deposit_submission_requires_accepted_status() {
        let mut proposal = accepted_proposal();
        proposal.status = ProposalStatus::Viewed;
        assert!(matches!(
            ensure_deposit_submittable(&proposal),
            Err(DomainError::NotAccepted { status: ProposalStatus::Viewed })
        ));
    }

    #[test]
    fn deposit_submission_requires_full_checklist() {
        let mut proposal = accepted_proposal();
        proposal.customer_approvals.revoke(ApprovalSection::Commitments);
        assert!(matches!(
            ensure_deposit_submittable(&proposal),
            Err(DomainError::ApprovalsIncomplete { approved: 4 })
        ));
    }

    #[test]
    fn deposit_cannot_be_submitted_twice() {
        let mut proposal = accepted_proposal();
        proposal.payment_submitted = true;
        assert!(matches!(
            ensure_deposit_submittable(&proposal),
            Err(DomainError::DepositAlreadySubmitted)
        ));

        proposal.deposit_paid = true;
        assert!(matches!(
            ensure_deposit_submittable(&proposal),
            Err(DomainError::DepositAlreadyPaid)
        ));
    }

    #[test]
    fn deposit_approval_needs_a_submission() {
        let proposal = accepted_proposal();
        assert!(matches!(
            ensure_deposit_approvable(&proposal),
            Err(DomainError::DepositNotSubmitted)
        ));
    }

    #[test]
    fn phase_completion_waits_for_deposit() {
        let proposal = accepted_proposal();
        assert!(matches!(
            ensure_phase_completable(&proposal, 0),
            Err(DomainError::DepositUnpaid)
        ));
    }

    #[test]
    fn first_phase_unlocks_once_deposit_is_paid() {
        let mut proposal = accepted_proposal();
        proposal.deposit_paid = true;
        ensure_phase_completable(&proposal, 0).expect("first phase should be completable");
    }

    #[test]
    fn later_phase_waits_for_previous_payment_approval() {
        let mut proposal = accepted_proposal();
        proposal.deposit_paid = true;
        proposal.phases[0].completed = true;

        assert!(matches!(
            ensure_phase_completable(&proposal, 1),
            Err(DomainError::PreviousPhaseUnpaid { index: 1 })
        ));

        proposal.phases[0].payment_submitted = true;
        proposal.phases[0].payment_approved = true;
        ensure_phase_completable(&proposal, 1).expect("phase 1 unlocks after phase 0 is paid");
    }

    #[test]
    fn phase_index_out_of_range_is_reported() {
        let mut proposal = accepted_proposal();
        proposal.deposit_paid = true;
        assert!(matches!(
            ensure_phase_completable(&proposal, 5),
            Err(DomainError::PhaseIndexOutOfRange { index: 5, count: 2 })
        ));
    }

    #[test]
    fn phase_payment_needs_completion_first() {
        let proposal = accepted_proposal();
        assert!(matches!(
            ensure_phase_payment_submittable(&proposal, 0),
            Err(DomainError::PhaseNotCompleted { index: 0 })
        ));
    }

    #[test]
    fn phase_payment_cannot_be_submitted_twice() {
        let mut proposal = accepted_proposal();
        proposal.phases[0].completed = true;
        proposal.phases[0].payment_submitted = true;
        assert!(matches!(
            ensure_phase_payment_submittable(&proposal, 0),
            Err(DomainError::PhasePaymentAlreadySubmitted { index: 0 })
        ));

        proposal.phases[0].payment_approved = true;
        assert!(matches!(
            ensure_phase_payment_submittable(&proposal, 0),
            Err(DomainError::PhasePaymentAlreadyApproved { index: 0 })
        ));
    }

    #[test]
    fn phase_payment_approval_requires_submission() {
        let mut proposal = accepted_proposal();
        proposal.phases[0].completed = true;
        assert!(matches!(
            ensure_phase_payment_approvable(&proposal, 0),
            Err(DomainError::PhasePaymentNotSubmitted { index: 0 })
        ));

        proposal.phases[0].payment_submitted = true;
        ensure_phase_payment_approvable(&proposal, 0).expect("submitted payment is approvable");
    }
}
