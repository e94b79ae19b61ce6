//! REST gateway client for the Operis backend.
//!
//! This crate owns everything between the domain core and the wire:
//! - **Session** (`session`) - token + profile store with a change feed
//! - **Transport** (`transport`) - HTTP seam with the reqwest implementation
//! - **Client** (`client`) - bearer auth and the single-flight token refresh
//! - **Endpoints** (`endpoints`) - typed wrappers over the backend routes
//! - **Workflow** (`workflow`) - the proposal negotiation/payment service
//! - **Chat** (`chat`) - cancellable polling task for project messages

pub mod chat;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod session;
pub mod transport;
pub mod workflow;

pub use chat::{ChatHandle, ChatPoller};
pub use client::ApiClient;
pub use error::ApiError;
pub use session::{SessionSnapshot, SessionStore};
pub use transport::{ApiRequest, ApiResponse, ApiTransport, Method, ReqwestTransport};
pub use workflow::{ProposalWorkflow, SectionOutcome};
