use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;

use operis_core::domain::project::ProjectId;
use operis_core::domain::proposal::{
    CustomerApprovals, Deliverable, Phase, Proposal, ProposalId, TeamMember,
};

use crate::client::ApiClient;
use crate::error::ApiError;

/// Create/update payload. The backend accepts the full section set on
/// every save; total price is always derived from the phases.
#[derive(Clone, Debug, Serialize)]
pub struct ProposalDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_analysis: Option<String>,
    pub deposit_amount: Decimal,
    pub total_price: Decimal,
    pub currency: String,
    pub estimated_duration_days: u32,
    pub phases: Vec<Phase>,
    pub team_members: Vec<TeamMember>,
    pub deliverables: Vec<Deliverable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_approvals: Option<CustomerApprovals>,
}

impl ProposalDraft {
    pub fn from_proposal(proposal: &Proposal) -> Self {
        Self {
            project_analysis: proposal.project_analysis.clone(),
            deposit_amount: proposal.deposit_amount,
            total_price: proposal.total_from_phases(),
            currency: proposal.currency.clone(),
            estimated_duration_days: proposal.duration_days(),
            phases: proposal.phases.clone(),
            team_members: proposal.team_members.clone(),
            deliverables: proposal.deliverables.clone(),
            customer_approvals: Some(proposal.customer_approvals),
        }
    }

    /// Recompute the derived total from the phases.
    pub fn with_derived_total(mut self) -> Self {
        self.total_price = self.phases.iter().map(|phase| phase.amount).sum();
        self
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct CustomerResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

pub async fn list(client: &ApiClient, project: ProjectId) -> Result<Vec<Proposal>, ApiError> {
    client.get_json(&format!("/projects/{project}/proposals")).await
}

pub async fn get(client: &ApiClient, id: ProposalId) -> Result<Proposal, ApiError> {
    client.get_json(&format!("/proposals/{id}")).await
}

pub async fn create(
    client: &ApiClient,
    project: ProjectId,
    draft: &ProposalDraft,
) -> Result<Proposal, ApiError> {
    client.post_json(&format!("/projects/{project}/proposals"), draft).await
}

pub async fn update(
    client: &ApiClient,
    id: ProposalId,
    draft: &ProposalDraft,
) -> Result<Proposal, ApiError> {
    client.put_json(&format!("/proposals/{id}"), draft).await
}

/// Persist only the approvals map; this is the one field customers may
/// write through the update route.
pub async fn update_approvals(
    client: &ApiClient,
    id: ProposalId,
    approvals: &CustomerApprovals,
) -> Result<Proposal, ApiError> {
    client
        .put_json(&format!("/proposals/{id}"), &json!({ "customer_approvals": approvals }))
        .await
}

pub async fn send(client: &ApiClient, id: ProposalId) -> Result<Proposal, ApiError> {
    client.post_action(&format!("/proposals/{id}/send")).await
}

pub async fn accept(
    client: &ApiClient,
    id: ProposalId,
    response: &CustomerResponse,
) -> Result<Proposal, ApiError> {
    client.post_json(&format!("/proposals/{id}/accept"), response).await
}

pub async fn reject(
    client: &ApiClient,
    id: ProposalId,
    response: &CustomerResponse,
) -> Result<Proposal, ApiError> {
    client.post_json(&format!("/proposals/{id}/reject"), response).await
}

pub async fn submit_payment(client: &ApiClient, id: ProposalId) -> Result<Proposal, ApiError> {
    client.post_action(&format!("/proposals/{id}/submit-payment")).await
}

pub async fn approve_payment(client: &ApiClient, id: ProposalId) -> Result<Proposal, ApiError> {
    client.post_action(&format!("/proposals/{id}/approve-payment")).await
}

pub async fn reject_payment(client: &ApiClient, id: ProposalId) -> Result<Proposal, ApiError> {
    client.post_action(&format!("/proposals/{id}/reject-payment")).await
}

pub async fn mark_phase_complete(
    client: &ApiClient,
    id: ProposalId,
    index: usize,
) -> Result<Proposal, ApiError> {
    client.post_action(&format!("/proposals/{id}/phases/{index}/complete")).await
}

pub async fn submit_phase_payment(
    client: &ApiClient,
    id: ProposalId,
    index: usize,
) -> Result<Proposal, ApiError> {
    client.post_action(&format!("/proposals/{id}/phases/{index}/submit-payment")).await
}

pub async fn approve_phase_payment(
    client: &ApiClient,
    id: ProposalId,
    index: usize,
) -> Result<Proposal, ApiError> {
    client.post_action(&format!("/proposals/{id}/phases/{index}/approve-payment")).await
}

pub async fn reject_phase_payment(
    client: &ApiClient,
    id: ProposalId,
    index: usize,
) -> Result<Proposal, ApiError> {
    client.post_action(&format!("/proposals/{id}/phases/{index}/reject-payment")).await
}
