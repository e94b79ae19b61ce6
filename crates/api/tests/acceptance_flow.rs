//! End-to-end negotiation and payment pipeline over a scripted backend:
//! a customer approves all five sections (triggering a single accept),
//! pays the deposit, and then the single phase moves through
//! complete → submit → approve.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::Value;
use uuid::Uuid;

use operis_api::client::ApiClient;
use operis_api::session::SessionStore;
use operis_api::transport::{ApiRequest, ApiResponse, ApiTransport, Method, TransportError};
use operis_api::workflow::{all_phases_paid, payment_stage, ProposalWorkflow, SectionOutcome};
use operis_core::domain::project::ProjectId;
use operis_core::domain::proposal::{
    ApprovalSection, CustomerApprovals, Phase, Proposal, ProposalId, ProposalStatus, TeamMember,
};
use operis_core::domain::user::{Role, UserId, UserProfile};

fn proposal_under_review() -> Proposal {
    Proposal {
        id: ProposalId(Uuid::new_v4()),
        project_id: ProjectId(Uuid::new_v4()),
        created_by: None,
        project_analysis: Some("Xây dựng hệ thống quản lý minh bạch".to_string()),
        deposit_amount: Decimal::new(500_000, 0),
        deposit_paid: false,
        deposit_paid_at: None,
        payment_submitted: false,
        payment_submitted_at: None,
        total_price: Decimal::new(10_000_000, 0),
        currency: "VND".to_string(),
        estimated_duration_days: Some(15),
        phases: vec![Phase::new("Giai đoạn 1", 15, Decimal::new(10_000_000, 0))],
        team_members: vec![TeamMember {
            name: "Developer User".to_string(),
            role: "Dev chính".to_string(),
            rating: Decimal::new(49, 1),
        }],
        deliverables: Vec::new(),
        status: ProposalStatus::Viewed,
        customer_notes: None,
        customer_approvals: CustomerApprovals::default(),
        accepted_at: None,
        rejected_at: None,
        rejection_reason: None,
        valid_until: None,
        created_at: None,
        updated_at: None,
    }
}

/// Scripted backend that owns one proposal and mutates it the way the
/// real routers do.
struct ScriptedBackend {
    proposal: Mutex<Proposal>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new(proposal: Proposal) -> Self {
        Self { proposal: Mutex::new(proposal), requests: Mutex::new(Vec::new()) }
    }

    fn count(&self, needle: &str) -> usize {
        self.requests
            .lock()
            .expect("requests lock")
            .iter()
            .filter(|line| line.contains(needle))
            .count()
    }

    fn phase_index(path: &str) -> usize {
        path.split('/')
            .skip_while(|part| *part != "phases")
            .nth(1)
            .and_then(|part| part.parse().ok())
            .expect("phase routes carry an index")
    }
}

#[async_trait]
impl ApiTransport for ScriptedBackend {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(format!("{} {}", request.method.as_str(), request.path));

        let mut proposal = self.proposal.lock().expect("proposal lock");
        let path = request.path.clone();
        let now = Utc::now();

        match (request.method, path.as_str()) {
            (Method::Put, _) => {
                if let Some(Value::Object(body)) = &request.body {
                    if let Some(raw) = body.get("customer_approvals") {
                        proposal.customer_approvals =
                            serde_json::from_value(raw.clone()).expect("approvals shape");
                    }
                }
            }
            (Method::Post, p) if p.ends_with("/accept") => {
                proposal.status = ProposalStatus::Accepted;
                proposal.accepted_at = Some(now);
            }
            (Method::Post, p) if p.ends_with("/approve-payment") && !p.contains("/phases/") => {
                proposal.deposit_paid = true;
                proposal.deposit_paid_at = Some(now);
            }
            (Method::Post, p) if p.ends_with("/submit-payment") && !p.contains("/phases/") => {
                proposal.payment_submitted = true;
                proposal.payment_submitted_at = Some(now);
            }
            (Method::Post, p) if p.contains("/phases/") && p.ends_with("/complete") => {
                let index = Self::phase_index(p);
                proposal.phases[index].completed = true;
                proposal.phases[index].completed_at = Some(now);
            }
            (Method::Post, p) if p.contains("/phases/") && p.ends_with("/submit-payment") => {
                let index = Self::phase_index(p);
                proposal.phases[index].payment_submitted = true;
                proposal.phases[index].payment_submitted_at = Some(now);
            }
            (Method::Post, p) if p.contains("/phases/") && p.ends_with("/approve-payment") => {
                let index = Self::phase_index(p);
                proposal.phases[index].payment_approved = true;
                proposal.phases[index].payment_approved_at = Some(now);
            }
            _ => {}
        }

        Ok(ApiResponse {
            status: 200,
            body: serde_json::to_vec(&*proposal).expect("serialize proposal"),
        })
    }
}

fn workflow_as(backend: Arc<ScriptedBackend>, role: Role) -> ProposalWorkflow {
    let session = SessionStore::in_memory();
    session
        .install_login(
            SecretString::from(format!("{role}-token")),
            None,
            UserProfile {
                id: UserId(Uuid::new_v4()),
                email: format!("{role}@operis.vn"),
                full_name: role.to_string(),
                role,
                is_active: true,
            },
        )
        .expect("session install");
    ProposalWorkflow::new(ApiClient::with_transport(backend, session))
}

#[tokio::test]
async fn full_pipeline_from_review_to_final_phase_payment() {
    let mut proposal = proposal_under_review();
    let backend = Arc::new(ScriptedBackend::new(proposal.clone()));

    let customer = workflow_as(backend.clone(), Role::Customer);
    let sales = workflow_as(backend.clone(), Role::Sales);
    let admin = workflow_as(backend.clone(), Role::Admin);

    // The customer works through the checklist in an arbitrary order.
    let order = [
        ApprovalSection::Team,
        ApprovalSection::Commitments,
        ApprovalSection::Analysis,
        ApprovalSection::Phases,
        ApprovalSection::Deposit,
    ];
    for (step, section) in order.into_iter().enumerate() {
        let outcome =
            customer.approve_section(&mut proposal, section).await.expect("approval succeeds");
        if step < 4 {
            assert_eq!(outcome, SectionOutcome::Approved { remaining: 4 - step });
        } else {
            assert_eq!(outcome, SectionOutcome::Accepted);
        }
    }

    assert_eq!(proposal.status, ProposalStatus::Accepted);
    assert_eq!(backend.count("/accept"), 1, "at most one accept call for five approvals");

    // Re-approving a section after acceptance changes nothing on the wire.
    let before = backend.count("PUT");
    let outcome = customer
        .approve_section(&mut proposal, ApprovalSection::Team)
        .await
        .expect("no-op succeeds");
    assert_eq!(outcome, SectionOutcome::AlreadyApproved);
    assert_eq!(backend.count("PUT"), before);

    // Deposit: submit, then admin approval; flags come back via reload.
    assert_eq!(payment_stage(&proposal), "deposit-due");
    customer.submit_deposit(&mut proposal).await.expect("deposit submit");
    assert!(proposal.payment_submitted);
    assert_eq!(payment_stage(&proposal), "deposit-submitted");

    // The sales side cannot start phase work before the deposit clears.
    sales
        .mark_phase_complete(&mut proposal, 0)
        .await
        .expect_err("phase work is locked until the deposit is paid");

    admin.approve_deposit(&mut proposal).await.expect("deposit approval");
    assert!(proposal.deposit_paid);
    assert_eq!(payment_stage(&proposal), "phases");

    // Phase 0: complete → customer pays → admin approves.
    sales.mark_phase_complete(&mut proposal, 0).await.expect("phase complete");
    assert!(proposal.phases[0].completed);

    customer.submit_phase_payment(&mut proposal, 0).await.expect("phase payment submit");
    assert!(proposal.phases[0].payment_submitted);

    admin.approve_phase_payment(&mut proposal, 0).await.expect("phase payment approve");
    assert!(proposal.phases[0].payment_approved);

    assert!(all_phases_paid(&proposal));
    assert_eq!(payment_stage(&proposal), "completed");
}

#[tokio::test]
async fn rejection_moves_the_proposal_back_to_negotiation() {
    let proposal = proposal_under_review();
    let backend = Arc::new(ScriptedBackend::new(proposal.clone()));
    let customer = workflow_as(backend.clone(), Role::Customer);

    customer
        .reject(&proposal, String::new())
        .await
        .expect_err("a blank reason is refused before any request");
    assert_eq!(backend.count("/reject"), 0);

    customer
        .reject(&proposal, "Cần giảm thời gian giai đoạn 1".to_string())
        .await
        .expect("reject with reason");
    assert_eq!(backend.count("/reject"), 1);
}
