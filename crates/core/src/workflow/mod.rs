pub mod engine;
pub mod payments;
pub mod qr;
pub mod states;

pub use engine::{NegotiationFlow, WorkflowDefinition, WorkflowEngine, WorkflowError};
pub use states::{
    missing_content_sections, ContentSection, ProposalEvent, TransitionOutcome, WorkflowAction,
    WorkflowContext,
};
