//! Proposal negotiation and payment orchestration.
//!
//! This is the service behind the proposal view: it runs the domain
//! rules locally first (so a refused operation never reaches the wire),
//! then fires the endpoint call and swaps in the reloaded proposal the
//! backend returns. There are no optimistic partial updates; the one
//! exception is the approvals checklist, which is set locally, persisted,
//! and rolled back if persistence fails.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use operis_core::audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, TracingAuditSink,
};
use operis_core::domain::project::{Project, ProjectId};
use operis_core::domain::proposal::{
    ApprovalSection, Phase, Proposal, ProposalStatus, TeamMember,
};
use operis_core::errors::DomainError;
use operis_core::workflow::engine::{NegotiationFlow, WorkflowEngine};
use operis_core::workflow::payments;
use operis_core::workflow::states::{ProposalEvent, WorkflowAction, WorkflowContext};
use rust_decimal::Decimal;

use crate::client::ApiClient;
use crate::endpoints::proposals::{self, CustomerResponse, ProposalDraft};
use crate::error::ApiError;

/// What happened when the customer approved a section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SectionOutcome {
    /// The flag was already true; nothing was sent to the backend.
    AlreadyApproved,
    /// The flag was persisted; `remaining` sections are still open.
    Approved { remaining: usize },
    /// This was the fifth approval: the acceptance call was issued and
    /// the proposal is now accepted.
    Accepted,
}

pub struct ProposalWorkflow {
    client: ApiClient,
    engine: WorkflowEngine<NegotiationFlow>,
    audit: Arc<dyn AuditSink>,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl ProposalWorkflow {
    pub fn new(client: ApiClient) -> Self {
        Self::with_audit(client, Arc::new(TracingAuditSink))
    }

    pub fn with_audit(client: ApiClient, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            client,
            engine: WorkflowEngine::default(),
            audit,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// The latest proposal for a project, if any exists yet. The backend
    /// returns proposals newest-first and hides drafts from customers.
    pub async fn load_latest(&self, project: ProjectId) -> Result<Option<Proposal>, ApiError> {
        let mut listed = proposals::list(&self.client, project).await?;
        if listed.is_empty() {
            Ok(None)
        } else {
            Ok(Some(listed.remove(0)))
        }
    }

    /// Pre-fill a fresh draft from the project the way the sales view
    /// does: analysis from the description, deposit at 30% of budget,
    /// duration from estimated hours, and the standard team roster.
    pub fn prefill(project: &Project) -> ProposalDraft {
        let deposit = project
            .budget
            .map(|budget| budget * Decimal::new(3, 1))
            .unwrap_or_else(|| Decimal::new(500_000, 0));
        let duration = project.estimated_hours.map(|hours| hours.div_ceil(8)).unwrap_or(0);

        ProposalDraft {
            project_analysis: project.description.clone(),
            deposit_amount: deposit,
            total_price: Decimal::ZERO,
            currency: "VND".to_string(),
            estimated_duration_days: duration,
            phases: Vec::new(),
            team_members: default_team(),
            deliverables: Vec::new(),
            customer_approvals: None,
        }
    }

    /// Sales-side full-section save. Creates the proposal on first save,
    /// updates it afterwards; refuses once the customer has answered.
    pub async fn save_section(
        &self,
        project: ProjectId,
        existing: Option<&Proposal>,
        draft: ProposalDraft,
    ) -> Result<Proposal, ApiError> {
        let draft = draft.with_derived_total();
        Proposal::validate_deposit_amount(draft.deposit_amount)?;

        match existing {
            Some(current) => {
                current.ensure_editable()?;
                proposals::update(&self.client, current.id, &draft).await
            }
            None => proposals::create(&self.client, project, &draft).await,
        }
    }

    /// Send a draft to the customer. Content validation runs locally;
    /// on failure no request is issued and the error names every
    /// missing section.
    pub async fn send(&self, proposal: &Proposal) -> Result<Proposal, ApiError> {
        self.apply_transition(proposal, &ProposalEvent::SendRequested, "sales")?;
        let sent = proposals::send(&self.client, proposal.id).await?;
        tracing::info!(proposal_id = %proposal.id, "proposal sent to customer");
        Ok(sent)
    }

    /// Customer approves one checklist section.
    ///
    /// Already-approved sections are a warning-level no-op with no
    /// network call. Otherwise the flag is set locally, the full map is
    /// persisted, and on persistence failure the flag is rolled back.
    /// When the update leaves all five flags true and the proposal is
    /// not yet accepted, exactly one acceptance call is issued.
    pub async fn approve_section(
        &self,
        proposal: &mut Proposal,
        section: ApprovalSection,
    ) -> Result<SectionOutcome, ApiError> {
        if proposal.customer_approvals.is_approved(section) {
            tracing::warn!(%section, "section is already approved; nothing to change");
            return Ok(SectionOutcome::AlreadyApproved);
        }

        proposal.customer_approvals.approve(section).map_err(ApiError::from)?;

        let outcome =
            match self.apply_transition(proposal, &ProposalEvent::SectionApproved(section), "customer")
            {
                Ok(outcome) => outcome,
                Err(error) => {
                    proposal.customer_approvals.revoke(section);
                    return Err(error);
                }
            };

        let persisted =
            proposals::update_approvals(&self.client, proposal.id, &proposal.customer_approvals)
                .await;
        let mut latest = match persisted {
            Ok(latest) => latest,
            Err(error) => {
                proposal.customer_approvals.revoke(section);
                tracing::warn!(%section, "approval rollback after persistence failure");
                return Err(error);
            }
        };

        if outcome.actions.contains(&WorkflowAction::SubmitAcceptance) {
            latest = proposals::accept(
                &self.client,
                proposal.id,
                &CustomerResponse {
                    customer_notes: Some("Đã đồng ý tất cả các mục".to_string()),
                    rejection_reason: None,
                },
            )
            .await?;
            *proposal = latest;
            return Ok(SectionOutcome::Accepted);
        }

        *proposal = latest;
        Ok(SectionOutcome::Approved { remaining: proposal.customer_approvals.pending().len() })
    }

    /// Explicit customer acceptance.
    pub async fn accept(
        &self,
        proposal: &Proposal,
        notes: Option<String>,
    ) -> Result<Proposal, ApiError> {
        self.apply_transition(proposal, &ProposalEvent::AcceptRequested, "customer")?;
        proposals::accept(
            &self.client,
            proposal.id,
            &CustomerResponse { customer_notes: notes, rejection_reason: None },
        )
        .await
    }

    /// Customer asks for revisions; the reason is mandatory and the
    /// proposal moves to `Negotiating`.
    pub async fn reject(&self, proposal: &Proposal, reason: String) -> Result<Proposal, ApiError> {
        self.apply_transition(
            proposal,
            &ProposalEvent::RejectRequested { reason: reason.clone() },
            "customer",
        )?;
        proposals::reject(
            &self.client,
            proposal.id,
            &CustomerResponse {
                customer_notes: Some(reason.clone()),
                rejection_reason: Some(reason),
            },
        )
        .await
    }

    /// Customer submits the deposit payment notification.
    pub async fn submit_deposit(&self, proposal: &mut Proposal) -> Result<(), ApiError> {
        payments::ensure_deposit_submittable(proposal)?;
        let _guard = self.begin(format!("submit-payment:{}", proposal.id))?;

        *proposal = proposals::submit_payment(&self.client, proposal.id).await?;
        self.emit_payment_event(proposal, "payment.deposit_submitted");
        Ok(())
    }

    /// Admin/sales confirms a submitted deposit.
    pub async fn approve_deposit(&self, proposal: &mut Proposal) -> Result<(), ApiError> {
        payments::ensure_deposit_approvable(proposal)?;
        *proposal = proposals::approve_payment(&self.client, proposal.id).await?;
        self.emit_payment_event(proposal, "payment.deposit_approved");
        Ok(())
    }

    /// Admin/sales rejects a submitted deposit.
    pub async fn reject_deposit(&self, proposal: &mut Proposal) -> Result<(), ApiError> {
        payments::ensure_deposit_approvable(proposal)?;
        *proposal = proposals::reject_payment(&self.client, proposal.id).await?;
        self.emit_payment_event(proposal, "payment.deposit_rejected");
        Ok(())
    }

    /// Sales marks phase `index` as completed. Phases unlock strictly in
    /// order: deposit first, then each phase after its predecessor's
    /// payment is approved.
    pub async fn mark_phase_complete(
        &self,
        proposal: &mut Proposal,
        index: usize,
    ) -> Result<(), ApiError> {
        payments::ensure_phase_completable(proposal, index)?;
        *proposal = proposals::mark_phase_complete(&self.client, proposal.id, index).await?;
        self.emit_payment_event(proposal, "payment.phase_completed");
        Ok(())
    }

    /// Customer submits payment for a completed phase.
    pub async fn submit_phase_payment(
        &self,
        proposal: &mut Proposal,
        index: usize,
    ) -> Result<(), ApiError> {
        payments::ensure_phase_payment_submittable(proposal, index)?;
        let _guard = self.begin(format!("phase-payment:{}:{index}", proposal.id))?;

        *proposal = proposals::submit_phase_payment(&self.client, proposal.id, index).await?;
        self.emit_payment_event(proposal, "payment.phase_submitted");
        Ok(())
    }

    /// Admin/sales approves a submitted phase payment, unlocking the
    /// next phase.
    pub async fn approve_phase_payment(
        &self,
        proposal: &mut Proposal,
        index: usize,
    ) -> Result<(), ApiError> {
        payments::ensure_phase_payment_approvable(proposal, index)?;
        *proposal = proposals::approve_phase_payment(&self.client, proposal.id, index).await?;
        self.emit_payment_event(proposal, "payment.phase_approved");
        Ok(())
    }

    /// Admin/sales rejects a submitted phase payment.
    pub async fn reject_phase_payment(
        &self,
        proposal: &mut Proposal,
        index: usize,
    ) -> Result<(), ApiError> {
        payments::ensure_phase_payment_approvable(proposal, index)?;
        *proposal = proposals::reject_phase_payment(&self.client, proposal.id, index).await?;
        self.emit_payment_event(proposal, "payment.phase_rejected");
        Ok(())
    }

    fn apply_transition(
        &self,
        proposal: &Proposal,
        event: &ProposalEvent,
        actor: &str,
    ) -> Result<operis_core::workflow::states::TransitionOutcome, ApiError> {
        let context = WorkflowContext::for_proposal(proposal);
        let audit = AuditContext::new(
            Some(proposal.id),
            Some(proposal.project_id),
            Uuid::new_v4().to_string(),
            actor,
        );
        self.engine
            .apply_with_audit(&proposal.status, event, &context, self.audit.as_ref(), &audit)
            .map_err(|error| ApiError::from(DomainError::from(error)))
    }

    fn emit_payment_event(&self, proposal: &Proposal, event_type: &str) {
        self.audit.emit(
            AuditEvent::new(
                Some(proposal.id),
                Some(proposal.project_id),
                Uuid::new_v4().to_string(),
                event_type,
                AuditCategory::Payment,
                self.client
                    .session()
                    .profile()
                    .map(|profile| profile.role.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                AuditOutcome::Success,
            )
            .with_metadata("status", format!("{:?}", proposal.status)),
        );
    }

    /// Duplicate-submission guard: a second identical operation while
    /// one is still in flight is refused instead of POSTed twice.
    fn begin(&self, key: String) -> Result<InFlightGuard, ApiError> {
        let mut in_flight = match self.in_flight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !in_flight.insert(key.clone()) {
            return Err(ApiError::DuplicateSubmission { operation: key });
        }
        Ok(InFlightGuard { set: Arc::clone(&self.in_flight), key })
    }
}

#[derive(Debug)]
struct InFlightGuard {
    set: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut in_flight = match self.set.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        in_flight.remove(&self.key);
    }
}

/// The default six-member roster pre-filled into new proposals.
fn default_team() -> Vec<TeamMember> {
    [
        ("Admin User", "Giám sát dự án", Decimal::new(50, 1)),
        ("Sale User", "Chăm sóc khách hàng", Decimal::new(48, 1)),
        ("Developer User", "Dev chính", Decimal::new(49, 1)),
        ("UI/UX Designer", "Thiết kế giao diện", Decimal::new(47, 1)),
        ("Security Expert", "Chuyên viên bảo mật", Decimal::new(46, 1)),
        ("QA Tester", "Test hệ thống", Decimal::new(45, 1)),
    ]
    .into_iter()
    .map(|(name, role, rating)| TeamMember {
        name: name.to_string(),
        role: role.to_string(),
        rating,
    })
    .collect()
}

/// `true` once every phase payment is approved; the project is then
/// ready for final acceptance.
pub fn all_phases_paid(proposal: &Proposal) -> bool {
    !proposal.phases.is_empty() && proposal.phases.iter().all(|phase: &Phase| phase.payment_approved)
}

/// Customer-facing summary of where the money flow stands.
pub fn payment_stage(proposal: &Proposal) -> &'static str {
    match proposal.status {
        ProposalStatus::Accepted => {
            if all_phases_paid(proposal) {
                "completed"
            } else if proposal.deposit_paid {
                "phases"
            } else if proposal.payment_submitted {
                "deposit-submitted"
            } else {
                "deposit-due"
            }
        }
        _ => "pre-acceptance",
    }
}
