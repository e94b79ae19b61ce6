use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::proposal::{ApprovalSection, ProposalStatus};
use crate::workflow::engine::WorkflowError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("section `{section}` has already been approved and cannot change")]
    SectionAlreadyApproved { section: ApprovalSection },
    #[error("proposal must be accepted first (current status: {status:?})")]
    NotAccepted { status: ProposalStatus },
    #[error("all five sections must be approved before paying the deposit ({approved}/5)")]
    ApprovalsIncomplete { approved: usize },
    #[error("deposit payment has already been submitted")]
    DepositAlreadySubmitted,
    #[error("deposit has already been paid")]
    DepositAlreadyPaid,
    #[error("deposit payment has not been submitted yet")]
    DepositNotSubmitted,
    #[error("deposit must be paid before phase work can start")]
    DepositUnpaid,
    #[error("deposit amount {amount} is below the minimum of {minimum}")]
    DepositBelowMinimum { amount: Decimal, minimum: Decimal },
    #[error("phase index {index} is out of range ({count} phases)")]
    PhaseIndexOutOfRange { index: usize, count: usize },
    #[error("phase {index} has already been marked complete")]
    PhaseAlreadyCompleted { index: usize },
    #[error("phase {index} requires the previous phase's payment to be approved first")]
    PreviousPhaseUnpaid { index: usize },
    #[error("phase {index} has not been completed by the sales team yet")]
    PhaseNotCompleted { index: usize },
    #[error("payment for phase {index} has already been submitted")]
    PhasePaymentAlreadySubmitted { index: usize },
    #[error("payment for phase {index} has already been approved")]
    PhasePaymentAlreadyApproved { index: usize },
    #[error("payment for phase {index} has not been submitted yet")]
    PhasePaymentNotSubmitted { index: usize },
    #[error("proposal can no longer be edited (status: {status:?})")]
    EditLocked { status: ProposalStatus },
    #[error("unknown role `{0}`")]
    UnknownRole(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}
