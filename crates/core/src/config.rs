use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub bank: BankConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Backend base URL including the `/api` prefix.
    pub base_url: String,
    pub timeout_secs: u64,
    pub chat_poll_interval_secs: u64,
}

/// Receiving account rendered into VietQR payment references.
#[derive(Clone, Debug)]
pub struct BankConfig {
    pub bank_code: String,
    pub account_number: String,
    pub account_name: String,
    pub qr_template: String,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Where to persist tokens and the cached profile between runs.
    /// `None` keeps the session in memory only.
    pub file: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub api_base_url: Option<String>,
    pub session_file: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8001/api".to_string(),
                timeout_secs: 30,
                chat_poll_interval_secs: 5,
            },
            bank: BankConfig {
                bank_code: "MB".to_string(),
                account_number: "6868688868888".to_string(),
                account_name: "LE TIEN HUNG".to_string(),
                qr_template: "compact".to_string(),
            },
            session: SessionConfig { file: None },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("operis.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(api) = patch.api {
            if let Some(base_url) = api.base_url {
                self.api.base_url = base_url;
            }
            if let Some(timeout_secs) = api.timeout_secs {
                self.api.timeout_secs = timeout_secs;
            }
            if let Some(poll) = api.chat_poll_interval_secs {
                self.api.chat_poll_interval_secs = poll;
            }
        }

        if let Some(bank) = patch.bank {
            if let Some(bank_code) = bank.bank_code {
                self.bank.bank_code = bank_code;
            }
            if let Some(account_number) = bank.account_number {
                self.bank.account_number = account_number;
            }
            if let Some(account_name) = bank.account_name {
                self.bank.account_name = account_name;
            }
            if let Some(qr_template) = bank.qr_template {
                self.bank.qr_template = qr_template;
            }
        }

        if let Some(session) = patch.session {
            if let Some(file) = session.file {
                self.session.file = Some(PathBuf::from(file));
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("OPERIS_API_BASE_URL") {
            self.api.base_url = value;
        }
        if let Some(value) = read_env("OPERIS_API_TIMEOUT_SECS") {
            self.api.timeout_secs = parse_u64("OPERIS_API_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("OPERIS_CHAT_POLL_INTERVAL_SECS") {
            self.api.chat_poll_interval_secs =
                parse_u64("OPERIS_CHAT_POLL_INTERVAL_SECS", &value)?;
        }

        if let Some(value) = read_env("OPERIS_BANK_CODE") {
            self.bank.bank_code = value;
        }
        if let Some(value) = read_env("OPERIS_BANK_ACCOUNT_NUMBER") {
            self.bank.account_number = value;
        }
        if let Some(value) = read_env("OPERIS_BANK_ACCOUNT_NAME") {
            self.bank.account_name = value;
        }
        if let Some(value) = read_env("OPERIS_BANK_QR_TEMPLATE") {
            self.bank.qr_template = value;
        }

        if let Some(value) = read_env("OPERIS_SESSION_FILE") {
            self.session.file = Some(PathBuf::from(value));
        }

        let log_level = read_env("OPERIS_LOGGING_LEVEL").or_else(|| read_env("OPERIS_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("OPERIS_LOGGING_FORMAT").or_else(|| read_env("OPERIS_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(api_base_url) = overrides.api_base_url {
            self.api.base_url = api_base_url;
        }
        if let Some(session_file) = overrides.session_file {
            self.session.file = Some(session_file);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_api(&self.api)?;
        validate_bank(&self.bank)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("operis.toml"), PathBuf::from("config/operis.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_api(api: &ApiConfig) -> Result<(), ConfigError> {
    let url = api.base_url.trim();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "api.base_url must start with http:// or https://".to_string(),
        ));
    }

    if api.timeout_secs == 0 || api.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "api.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if api.chat_poll_interval_secs == 0 || api.chat_poll_interval_secs > 3600 {
        return Err(ConfigError::Validation(
            "api.chat_poll_interval_secs must be in range 1..=3600".to_string(),
        ));
    }

    Ok(())
}

fn validate_bank(bank: &BankConfig) -> Result<(), ConfigError> {
    if bank.bank_code.trim().is_empty()
        || !bank.bank_code.chars().all(|ch| ch.is_ascii_alphanumeric())
    {
        return Err(ConfigError::Validation(
            "bank.bank_code must be a non-empty alphanumeric code (e.g. `MB`)".to_string(),
        ));
    }

    if bank.account_number.is_empty() || !bank.account_number.chars().all(|ch| ch.is_ascii_digit())
    {
        return Err(ConfigError::Validation(
            "bank.account_number must contain digits only".to_string(),
        ));
    }

    if bank.account_name.trim().is_empty() {
        return Err(ConfigError::Validation("bank.account_name is required".to_string()));
    }

    if bank.qr_template.trim().is_empty() {
        return Err(ConfigError::Validation("bank.qr_template is required".to_string()));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    api: Option<ApiPatch>,
    bank: Option<BankPatch>,
    session: Option<SessionPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiPatch {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    chat_poll_interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct BankPatch {
    bank_code: Option<String>,
    account_number: Option<String>,
    account_name: Option<String>,
    qr_template: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionPatch {
    file: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_validate() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("default config must load: {err}"))?;
        ensure(config.api.chat_poll_interval_secs == 5, "default poll interval should be 5s")?;
        ensure(config.bank.bank_code == "MB", "default bank should be MB")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_OPERIS_BASE_URL", "https://portal.operis.vn/api");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("operis.toml");
            fs::write(
                &path,
                r#"
[api]
base_url = "${TEST_OPERIS_BASE_URL}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.api.base_url == "https://portal.operis.vn/api",
                "base url should come from the interpolated env var",
            )
        })();

        clear_vars(&["TEST_OPERIS_BASE_URL"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("OPERIS_LOG_LEVEL", "warn");
        env::set_var("OPERIS_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "log level should come from the env alias")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "log format should come from the env alias",
            )
        })();

        clear_vars(&["OPERIS_LOG_LEVEL", "OPERIS_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("OPERIS_API_BASE_URL", "http://from-env:8001/api");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("operis.toml");
            fs::write(
                &path,
                r#"
[api]
base_url = "http://from-file:8001/api"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    session_file: Some(PathBuf::from("/tmp/operis-session.json")),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.api.base_url == "http://from-env:8001/api",
                "env base url should win over file and defaults",
            )?;
            ensure(config.logging.level == "debug", "programmatic override should win over file")?;
            ensure(config.session.file.is_some(), "session file override should apply")
        })();

        clear_vars(&["OPERIS_API_BASE_URL"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("OPERIS_API_BASE_URL", "ftp://wrong");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("api.base_url")
            );
            ensure(has_message, "validation failure should mention api.base_url")
        })();

        clear_vars(&["OPERIS_API_BASE_URL"]);
        result
    }

    #[test]
    fn bank_account_must_be_numeric() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("OPERIS_BANK_ACCOUNT_NUMBER", "12AB34");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected bank validation failure".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(
                    error,
                    ConfigError::Validation(ref message) if message.contains("bank.account_number")
                ),
                "validation failure should mention bank.account_number",
            )
        })();

        clear_vars(&["OPERIS_BANK_ACCOUNT_NUMBER"]);
        result
    }

    #[test]
    fn missing_required_file_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let missing = PathBuf::from("/nonexistent/operis.toml");
        let error = match AppConfig::load(LoadOptions {
            config_path: Some(missing.clone()),
            require_file: true,
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected missing-file failure".to_string()),
            Err(error) => error,
        };

        ensure(
            matches!(error, ConfigError::MissingConfigFile(ref path) if path == &missing),
            "missing-file error should name the expected path",
        )
    }
}
