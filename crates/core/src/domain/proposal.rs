use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::project::ProjectId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProposalId(pub Uuid);

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Draft,
    Sent,
    Viewed,
    Accepted,
    /// Present in the wire enum for compatibility; the observed reject
    /// flow lands on `Negotiating` instead.
    Rejected,
    Negotiating,
}

impl ProposalStatus {
    /// Sales-side section edits are refused once the customer has given
    /// a final answer.
    pub fn is_editable(&self) -> bool {
        !matches!(self, Self::Accepted | Self::Rejected)
    }
}

/// The five independently approvable sections of a proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalSection {
    Analysis,
    Deposit,
    Phases,
    Team,
    Commitments,
}

impl ApprovalSection {
    pub const ALL: [ApprovalSection; 5] = [
        ApprovalSection::Analysis,
        ApprovalSection::Deposit,
        ApprovalSection::Phases,
        ApprovalSection::Team,
        ApprovalSection::Commitments,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::Deposit => "deposit",
            Self::Phases => "phases",
            Self::Team => "team",
            Self::Commitments => "commitments",
        }
    }
}

impl fmt::Display for ApprovalSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-section customer approvals. Each flag can be set exactly once and
/// is never resettable through this interface; the backend persists the
/// whole map on every change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerApprovals {
    #[serde(default)]
    pub analysis: bool,
    #[serde(default)]
    pub deposit: bool,
    #[serde(default)]
    pub phases: bool,
    #[serde(default)]
    pub team: bool,
    #[serde(default)]
    pub commitments: bool,
}

impl CustomerApprovals {
    pub fn is_approved(&self, section: ApprovalSection) -> bool {
        match section {
            ApprovalSection::Analysis => self.analysis,
            ApprovalSection::Deposit => self.deposit,
            ApprovalSection::Phases => self.phases,
            ApprovalSection::Team => self.team,
            ApprovalSection::Commitments => self.commitments,
        }
    }

    /// Set a section flag. Approving a section twice is an error so the
    /// caller can skip the network round trip entirely.
    pub fn approve(&mut self, section: ApprovalSection) -> Result<(), DomainError> {
        if self.is_approved(section) {
            return Err(DomainError::SectionAlreadyApproved { section });
        }
        match section {
            ApprovalSection::Analysis => self.analysis = true,
            ApprovalSection::Deposit => self.deposit = true,
            ApprovalSection::Phases => self.phases = true,
            ApprovalSection::Team => self.team = true,
            ApprovalSection::Commitments => self.commitments = true,
        }
        Ok(())
    }

    pub fn revoke(&mut self, section: ApprovalSection) {
        match section {
            ApprovalSection::Analysis => self.analysis = false,
            ApprovalSection::Deposit => self.deposit = false,
            ApprovalSection::Phases => self.phases = false,
            ApprovalSection::Team => self.team = false,
            ApprovalSection::Commitments => self.commitments = false,
        }
    }

    pub fn all_approved(&self) -> bool {
        ApprovalSection::ALL.iter().all(|section| self.is_approved(*section))
    }

    pub fn approved_count(&self) -> usize {
        ApprovalSection::ALL.iter().filter(|section| self.is_approved(**section)).count()
    }

    pub fn pending(&self) -> Vec<ApprovalSection> {
        ApprovalSection::ALL
            .iter()
            .copied()
            .filter(|section| !self.is_approved(*section))
            .collect()
    }
}

/// A milestone within a proposal, carrying its own completion and
/// payment sub-state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    #[serde(default)]
    pub days: u32,
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default)]
    pub payment_percentage: Decimal,
    #[serde(default)]
    pub tasks: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_by: Option<String>,
    #[serde(default)]
    pub payment_submitted: bool,
    #[serde(default)]
    pub payment_submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payment_approved: bool,
    #[serde(default)]
    pub payment_approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payment_approved_by: Option<String>,
}

impl Phase {
    pub fn new(name: impl Into<String>, days: u32, amount: Decimal) -> Self {
        Self {
            name: name.into(),
            days,
            amount,
            payment_percentage: Decimal::from(100u32),
            tasks: String::new(),
            completed: false,
            completed_at: None,
            completed_by: None,
            payment_submitted: false,
            payment_submitted_at: None,
            payment_approved: false,
            payment_approved_at: None,
            payment_approved_by: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    pub role: String,
    /// 0..=5, fractional values allowed (e.g. 4.8).
    pub rating: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deliverable {
    pub description: String,
    #[serde(default)]
    pub penalty: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: String,
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// A sales offer attached to a project. Mutation is always a
/// full-section update; payment progress after acceptance lives in the
/// deposit flags and per-phase sub-state rather than in `status`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub project_id: ProjectId,
    #[serde(default)]
    pub created_by: Option<AuthorSummary>,
    #[serde(default)]
    pub project_analysis: Option<String>,
    #[serde(default)]
    pub deposit_amount: Decimal,
    #[serde(default)]
    pub deposit_paid: bool,
    #[serde(default)]
    pub deposit_paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payment_submitted: bool,
    #[serde(default)]
    pub payment_submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_price: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub estimated_duration_days: Option<u32>,
    #[serde(default)]
    pub phases: Vec<Phase>,
    #[serde(default)]
    pub team_members: Vec<TeamMember>,
    #[serde(default)]
    pub deliverables: Vec<Deliverable>,
    pub status: ProposalStatus,
    #[serde(default)]
    pub customer_notes: Option<String>,
    #[serde(default)]
    pub customer_approvals: CustomerApprovals,
    #[serde(default)]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_currency() -> String {
    "VND".to_string()
}

/// Backend minimum for the deposit amount, in VND.
pub fn min_deposit_amount() -> Decimal {
    Decimal::new(500_000, 0)
}

impl Proposal {
    pub fn analysis_text(&self) -> &str {
        self.project_analysis.as_deref().unwrap_or("")
    }

    pub fn duration_days(&self) -> u32 {
        self.estimated_duration_days.unwrap_or(0)
    }

    /// Total price is derived from the phases, never entered directly.
    pub fn total_from_phases(&self) -> Decimal {
        self.phases.iter().map(|phase| phase.amount).sum()
    }

    pub fn phase(&self, index: usize) -> Result<&Phase, DomainError> {
        self.phases
            .get(index)
            .ok_or(DomainError::PhaseIndexOutOfRange { index, count: self.phases.len() })
    }

    pub fn validate_deposit_amount(amount: Decimal) -> Result<(), DomainError> {
        if amount < min_deposit_amount() {
            return Err(DomainError::DepositBelowMinimum {
                amount,
                minimum: min_deposit_amount(),
            });
        }
        Ok(())
    }

    pub fn ensure_editable(&self) -> Result<(), DomainError> {
        if self.status.is_editable() {
            Ok(())
        } else {
            Err(DomainError::EditLocked { status: self.status })
        }
    }
}
