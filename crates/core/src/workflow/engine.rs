use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::proposal::ProposalStatus;
use crate::workflow::states::{
    ContentSection, ProposalEvent, TransitionOutcome, WorkflowAction, WorkflowContext,
};

pub trait WorkflowDefinition {
    fn initial_state(&self) -> ProposalStatus;
    fn transition(
        &self,
        current: &ProposalStatus,
        event: &ProposalEvent,
        context: &WorkflowContext,
    ) -> Result<TransitionOutcome, WorkflowError>;
}

/// The sales/customer negotiation flow every proposal goes through.
#[derive(Clone, Debug, Default)]
pub struct NegotiationFlow;

impl WorkflowDefinition for NegotiationFlow {
    fn initial_state(&self) -> ProposalStatus {
        ProposalStatus::Draft
    }

    fn transition(
        &self,
        current: &ProposalStatus,
        event: &ProposalEvent,
        context: &WorkflowContext,
    ) -> Result<TransitionOutcome, WorkflowError> {
        transition_negotiation(current, event, context)
    }
}

pub struct WorkflowEngine<F> {
    flow: F,
}

impl<F> WorkflowEngine<F>
where
    F: WorkflowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_state(&self) -> ProposalStatus {
        self.flow.initial_state()
    }

    pub fn apply(
        &self,
        current: &ProposalStatus,
        event: &ProposalEvent,
        context: &WorkflowContext,
    ) -> Result<TransitionOutcome, WorkflowError> {
        self.flow.transition(current, event, context)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: &ProposalStatus,
        event: &ProposalEvent,
        context: &WorkflowContext,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, WorkflowError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, event, context);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    AuditEvent::new(
                        audit.proposal_id,
                        audit.project_id,
                        audit.correlation_id.clone(),
                        "workflow.transition_applied",
                        AuditCategory::Workflow,
                        audit.actor.clone(),
                        AuditOutcome::Success,
                    )
                    .with_metadata("from", format!("{:?}", outcome.from))
                    .with_metadata("to", format!("{:?}", outcome.to))
                    .with_metadata("event", format!("{:?}", outcome.event)),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit.proposal_id,
                        audit.project_id,
                        audit.correlation_id.clone(),
                        "workflow.transition_rejected",
                        AuditCategory::Workflow,
                        audit.actor.clone(),
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

impl Default for WorkflowEngine<NegotiationFlow> {
    fn default() -> Self {
        Self::new(NegotiationFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("cannot send proposal from {state:?}: sections missing content: {missing:?}")]
    MissingSections { state: ProposalStatus, missing: Vec<ContentSection> },
    #[error("a revision request needs a reason")]
    EmptyRejectionReason,
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: ProposalStatus, event: ProposalEvent },
}

fn transition_negotiation(
    current: &ProposalStatus,
    event: &ProposalEvent,
    context: &WorkflowContext,
) -> Result<TransitionOutcome, WorkflowError> {
    use ProposalEvent::{
        AcceptRequested, CustomerViewed, RejectRequested, SectionApproved, SendRequested,
    };
    use ProposalStatus::{Accepted, Draft, Negotiating, Sent, Viewed};
    use WorkflowAction::{MarkSent, NotifySalesRevision, PersistApprovals, SubmitAcceptance};

    let (to, actions) = match (current, event) {
        (Draft, SendRequested) => {
            if !context.missing_sections.is_empty() {
                return Err(WorkflowError::MissingSections {
                    state: *current,
                    missing: context.missing_sections.clone(),
                });
            }
            (Sent, vec![MarkSent])
        }
        (Sent, CustomerViewed) => (Viewed, Vec::new()),
        // Section approvals never change the status by themselves; the
        // fifth one requests acceptance through the explicit path.
        (Sent | Viewed | Negotiating, SectionApproved(_)) => {
            let mut actions = vec![PersistApprovals];
            if context.approvals.all_approved() {
                actions.push(SubmitAcceptance);
            }
            (*current, actions)
        }
        (Accepted, SectionApproved(_)) => (Accepted, vec![PersistApprovals]),
        (Sent | Viewed | Negotiating, AcceptRequested) => (Accepted, Vec::new()),
        (Sent | Viewed | Negotiating, RejectRequested { reason }) => {
            if reason.trim().is_empty() {
                return Err(WorkflowError::EmptyRejectionReason);
            }
            (Negotiating, vec![NotifySalesRevision])
        }
        _ => {
            return Err(WorkflowError::InvalidTransition {
                state: *current,
                event: event.clone(),
            });
        }
    };

    Ok(TransitionOutcome { from: *current, to, event: event.clone(), actions })
}

#[cfg(test)]
mod tests {
    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::domain::proposal::{ApprovalSection, CustomerApprovals, ProposalStatus};
    use crate::workflow::engine::{WorkflowEngine, WorkflowError};
    use crate::workflow::states::{
        ContentSection, ProposalEvent, WorkflowAction, WorkflowContext,
    };

    fn complete_context() -> WorkflowContext {
        WorkflowContext::default()
    }

    fn all_approved() -> CustomerApprovals {
        let mut approvals = CustomerApprovals::default();
        for section in ApprovalSection::ALL {
            approvals.approve(section).expect("fresh checklist");
        }
        approvals
    }

    #[test]
    fn draft_sends_when_content_is_complete() {
        let engine = WorkflowEngine::default();
        let outcome = engine
            .apply(&ProposalStatus::Draft, &ProposalEvent::SendRequested, &complete_context())
            .expect("draft -> sent");

        assert_eq!(outcome.to, ProposalStatus::Sent);
        assert_eq!(outcome.actions, vec![WorkflowAction::MarkSent]);
    }

    #[test]
    fn send_is_rejected_while_sections_are_missing() {
        let engine = WorkflowEngine::default();
        let context = WorkflowContext {
            missing_sections: vec![ContentSection::Analysis, ContentSection::Phases],
            ..WorkflowContext::default()
        };

        let error = engine
            .apply(&ProposalStatus::Draft, &ProposalEvent::SendRequested, &context)
            .expect_err("send must fail with missing sections");

        assert!(matches!(
            error,
            WorkflowError::MissingSections { ref missing, .. }
                if missing == &[ContentSection::Analysis, ContentSection::Phases]
        ));
    }

    #[test]
    fn customer_view_moves_sent_to_viewed() {
        let engine = WorkflowEngine::default();
        let outcome = engine
            .apply(&ProposalStatus::Sent, &ProposalEvent::CustomerViewed, &complete_context())
            .expect("sent -> viewed");
        assert_eq!(outcome.to, ProposalStatus::Viewed);
    }

    #[test]
    fn partial_approval_only_persists() {
        let engine = WorkflowEngine::default();
        let mut approvals = CustomerApprovals::default();
        approvals.approve(ApprovalSection::Analysis).expect("fresh checklist");
        let context = WorkflowContext { approvals, ..WorkflowContext::default() };

        let outcome = engine
            .apply(
                &ProposalStatus::Viewed,
                &ProposalEvent::SectionApproved(ApprovalSection::Analysis),
                &context,
            )
            .expect("approval is always persistable");

        assert_eq!(outcome.to, ProposalStatus::Viewed);
        assert_eq!(outcome.actions, vec![WorkflowAction::PersistApprovals]);
    }

    #[test]
    fn fifth_approval_requests_acceptance_exactly_once() {
        let engine = WorkflowEngine::default();
        let context = WorkflowContext { approvals: all_approved(), ..WorkflowContext::default() };

        let outcome = engine
            .apply(
                &ProposalStatus::Viewed,
                &ProposalEvent::SectionApproved(ApprovalSection::Commitments),
                &context,
            )
            .expect("fifth approval");

        let submits = outcome
            .actions
            .iter()
            .filter(|action| **action == WorkflowAction::SubmitAcceptance)
            .count();
        assert_eq!(submits, 1);
        assert_eq!(outcome.to, ProposalStatus::Viewed, "status change happens via accept call");
    }

    #[test]
    fn approval_after_acceptance_never_resubmits() {
        let engine = WorkflowEngine::default();
        let context = WorkflowContext { approvals: all_approved(), ..WorkflowContext::default() };

        let outcome = engine
            .apply(
                &ProposalStatus::Accepted,
                &ProposalEvent::SectionApproved(ApprovalSection::Team),
                &context,
            )
            .expect("late approval is persistable");

        assert!(!outcome.actions.contains(&WorkflowAction::SubmitAcceptance));
    }

    #[test]
    fn explicit_accept_reaches_accepted_from_review_states() {
        let engine = WorkflowEngine::default();
        for state in [ProposalStatus::Sent, ProposalStatus::Viewed, ProposalStatus::Negotiating] {
            let outcome = engine
                .apply(&state, &ProposalEvent::AcceptRequested, &complete_context())
                .expect("accept from review state");
            assert_eq!(outcome.to, ProposalStatus::Accepted);
        }
    }

    #[test]
    fn reject_requires_a_reason() {
        let engine = WorkflowEngine::default();
        let error = engine
            .apply(
                &ProposalStatus::Viewed,
                &ProposalEvent::RejectRequested { reason: "  ".to_string() },
                &complete_context(),
            )
            .expect_err("blank reason must fail");
        assert_eq!(error, WorkflowError::EmptyRejectionReason);

        let outcome = engine
            .apply(
                &ProposalStatus::Viewed,
                &ProposalEvent::RejectRequested { reason: "Giảm giá giai đoạn 2".to_string() },
                &complete_context(),
            )
            .expect("reject with reason");
        assert_eq!(outcome.to, ProposalStatus::Negotiating);
        assert_eq!(outcome.actions, vec![WorkflowAction::NotifySalesRevision]);
    }

    #[test]
    fn draft_cannot_be_accepted_directly() {
        let engine = WorkflowEngine::default();
        let error = engine
            .apply(&ProposalStatus::Draft, &ProposalEvent::AcceptRequested, &complete_context())
            .expect_err("draft is invisible to the customer");
        assert!(matches!(error, WorkflowError::InvalidTransition { .. }));
    }

    #[test]
    fn transition_emits_audit_event() {
        let engine = WorkflowEngine::default();
        let sink = InMemoryAuditSink::default();

        let _ = engine
            .apply_with_audit(
                &ProposalStatus::Draft,
                &ProposalEvent::SendRequested,
                &complete_context(),
                &sink,
                &AuditContext::new(None, None, "req-17", "sales-portal"),
            )
            .expect("transition should succeed");

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "workflow.transition_applied");
        assert_eq!(events[0].correlation_id, "req-17");
    }
}
