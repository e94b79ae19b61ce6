pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod workflow;

pub use domain::message::{ChatMessage, MessageId, MessageType, SenderSummary};
pub use domain::project::{
    CustomerSummary, Project, ProjectId, ProjectPriority, ProjectStatus,
};
pub use domain::proposal::{
    ApprovalSection, AuthorSummary, CustomerApprovals, Deliverable, Phase, Proposal, ProposalId,
    ProposalStatus, TeamMember,
};
pub use domain::service::{Service, ServiceId, ServiceRequest, ServiceRequestId};
pub use domain::template::{PhaseBlueprint, ProjectTemplate, TeamSlot, TemplateId};
pub use domain::user::{AccessDecision, Role, UserId, UserProfile};
pub use errors::DomainError;
pub use workflow::engine::{NegotiationFlow, WorkflowDefinition, WorkflowEngine, WorkflowError};
pub use workflow::states::{
    ContentSection, ProposalEvent, TransitionOutcome, WorkflowAction, WorkflowContext,
};
