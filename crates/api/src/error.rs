use operis_core::errors::DomainError;
use thiserror::Error;

use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not logged in")]
    NotAuthenticated,
    #[error("session expired, login is required again")]
    SessionExpired,
    #[error("api error ({status}): {detail}")]
    Api { status: u16, detail: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("failed to decode api response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("a `{operation}` request is already in flight")]
    DuplicateSubmission { operation: String },
    #[error("session persistence failed: {0}")]
    Session(#[from] crate::session::SessionError),
}

impl ApiError {
    /// True when retrying without user intervention cannot help.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::SessionExpired)
    }
}

/// Best-effort extraction of the human-readable error string the
/// backend puts in `detail` (or occasionally `message`).
pub(crate) fn error_detail(body: &[u8]) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        detail: Option<String>,
        message: Option<String>,
    }

    if let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body) {
        if let Some(detail) = parsed.detail.filter(|value| !value.is_empty()) {
            return detail;
        }
        if let Some(message) = parsed.message.filter(|value| !value.is_empty()) {
            return message;
        }
    }

    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        "no error detail provided".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}
