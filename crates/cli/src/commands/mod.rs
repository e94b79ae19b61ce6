pub mod auth;
pub mod chat;
pub mod config;
pub mod dashboard;
pub mod doctor;
pub mod proposal;
pub mod services;
pub mod templates;
pub mod users;

use std::env;
use std::path::PathBuf;

use serde::Serialize;

use operis_api::client::ApiClient;
use operis_api::session::SessionStore;
use operis_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use operis_core::domain::user::{authorize, AccessDecision, Role, UserProfile};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    /// Structured outcome for action commands (login, send, approve...).
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    /// Plain multi-line output for listing/reporting commands.
    pub fn listing(output: impl Into<String>) -> Self {
        Self { exit_code: 0, output: output.into() }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Everything a command needs to talk to the backend.
pub struct CliContext {
    pub config: AppConfig,
    pub client: ApiClient,
}

#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    pub config_path: Option<PathBuf>,
    pub api_url: Option<String>,
}

/// Fallback session location when neither config nor env name one.
pub fn default_session_file() -> Option<PathBuf> {
    env::var_os("HOME").map(|home| PathBuf::from(home).join(".operis").join("session.json"))
}

pub fn load_config(globals: &GlobalArgs) -> Result<AppConfig, operis_core::config::ConfigError> {
    AppConfig::load(LoadOptions {
        config_path: globals.config_path.clone(),
        require_file: false,
        overrides: ConfigOverrides {
            api_base_url: globals.api_url.clone(),
            ..ConfigOverrides::default()
        },
    })
}

pub fn build_context(globals: &GlobalArgs, command: &str) -> Result<CliContext, CommandResult> {
    let config = load_config(globals).map_err(|error| {
        CommandResult::failure(command, "config_validation", error.to_string(), 2)
    })?;

    let session = match config.session.file.clone().or_else(default_session_file) {
        Some(path) => SessionStore::with_file(path),
        None => SessionStore::in_memory(),
    };
    if let Err(error) = session.load() {
        return Err(CommandResult::failure(command, "session", error.to_string(), 2));
    }

    let client = ApiClient::new(&config.api, session).map_err(|error| {
        CommandResult::failure(command, "transport", error.to_string(), 2)
    })?;

    Ok(CliContext { config, client })
}

/// Resolve the cached profile and gate a role-restricted command before
/// any request is issued: unauthenticated users are pointed at `login`,
/// the wrong role at its own dashboard.
pub fn require_role(
    client: &ApiClient,
    allowed: &[Role],
    command: &str,
) -> Result<UserProfile, CommandResult> {
    let Some(profile) = client.session().profile() else {
        return Err(CommandResult::failure(
            command,
            "auth_required",
            "not logged in; run `operis login` first",
            3,
        ));
    };

    if let AccessDecision::RedirectTo(dashboard) = authorize(Some(&profile), allowed) {
        return Err(CommandResult::failure(
            command,
            "role_forbidden",
            format!("this surface is not available for your role; your dashboard is {dashboard}"),
            3,
        ));
    }

    Ok(profile)
}

pub fn api_failure(command: &str, error: operis_api::error::ApiError) -> CommandResult {
    let class = match &error {
        operis_api::error::ApiError::NotAuthenticated
        | operis_api::error::ApiError::SessionExpired => "auth_required",
        operis_api::error::ApiError::Api { .. } => "api",
        operis_api::error::ApiError::Transport(_) => "transport",
        operis_api::error::ApiError::Decode(_) => "decode",
        operis_api::error::ApiError::Domain(_) => "domain",
        operis_api::error::ApiError::DuplicateSubmission { .. } => "duplicate_submission",
        operis_api::error::ApiError::Session(_) => "session",
    };
    CommandResult::failure(command, class, error.to_string(), 1)
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::CommandResult;

    #[test]
    fn success_produces_parseable_outcome() {
        let result = CommandResult::success("login", "logged in as customer");
        assert_eq!(result.exit_code, 0);

        let payload: Value = serde_json::from_str(&result.output).expect("valid json");
        assert_eq!(payload["command"], "login");
        assert_eq!(payload["status"], "ok");
    }

    #[test]
    fn failure_carries_class_and_exit_code() {
        let result = CommandResult::failure("send", "domain", "sections missing", 1);
        assert_eq!(result.exit_code, 1);

        let payload: Value = serde_json::from_str(&result.output).expect("valid json");
        assert_eq!(payload["error_class"], "domain");
    }
}
