use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::proposal::{ApprovalSection, CustomerApprovals, Proposal};

/// Content sections a proposal must fill in before it can be sent to
/// the customer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSection {
    Analysis,
    Deposit,
    Duration,
    Phases,
    Team,
}

impl ContentSection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::Deposit => "deposit",
            Self::Duration => "duration",
            Self::Phases => "phases",
            Self::Team => "team",
        }
    }
}

impl fmt::Display for ContentSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sections that are still empty, in display order. A proposal may only
/// be sent once this list is empty.
pub fn missing_content_sections(proposal: &Proposal) -> Vec<ContentSection> {
    let mut missing = Vec::new();
    if proposal.analysis_text().trim().is_empty() {
        missing.push(ContentSection::Analysis);
    }
    if proposal.deposit_amount.is_zero() {
        missing.push(ContentSection::Deposit);
    }
    if proposal.duration_days() == 0 {
        missing.push(ContentSection::Duration);
    }
    if proposal.phases.is_empty() {
        missing.push(ContentSection::Phases);
    }
    if proposal.team_members.is_empty() {
        missing.push(ContentSection::Team);
    }
    missing
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalEvent {
    /// Sales finalizes the draft and sends it to the customer.
    SendRequested,
    /// The customer opened a sent proposal.
    CustomerViewed,
    /// The customer approved one of the five sections.
    SectionApproved(ApprovalSection),
    /// The customer explicitly accepts the proposal.
    AcceptRequested,
    /// The customer asks for revisions; the reason is mandatory.
    RejectRequested { reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowAction {
    MarkSent,
    PersistApprovals,
    /// All five sections are approved: issue the acceptance call. This
    /// is the only path that turns a full checklist into `Accepted`.
    SubmitAcceptance,
    NotifySalesRevision,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowContext {
    pub missing_sections: Vec<ContentSection>,
    pub approvals: CustomerApprovals,
}

impl WorkflowContext {
    pub fn for_proposal(proposal: &Proposal) -> Self {
        Self {
            missing_sections: missing_content_sections(proposal),
            approvals: proposal.customer_approvals,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: crate::domain::proposal::ProposalStatus,
    pub to: crate::domain::proposal::ProposalStatus,
    pub event: ProposalEvent,
    pub actions: Vec<WorkflowAction>,
}
