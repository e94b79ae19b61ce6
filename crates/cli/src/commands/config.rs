use super::{load_config, CommandResult, GlobalArgs};

/// Print the effective configuration after defaults, file, env, and
/// overrides are merged. The session file path is shown; tokens never
/// appear here.
pub fn run(globals: &GlobalArgs) -> CommandResult {
    let config = match load_config(globals) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("config", "config_validation", error.to_string(), 2)
        }
    };

    let session_file = config
        .session
        .file
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "(in-memory)".to_string());

    let lines = [
        format!("api.base_url = {}", config.api.base_url),
        format!("api.timeout_secs = {}", config.api.timeout_secs),
        format!("api.chat_poll_interval_secs = {}", config.api.chat_poll_interval_secs),
        format!("bank.bank_code = {}", config.bank.bank_code),
        format!("bank.account_number = {}", config.bank.account_number),
        format!("bank.account_name = {}", config.bank.account_name),
        format!("bank.qr_template = {}", config.bank.qr_template),
        format!("session.file = {session_file}"),
        format!("logging.level = {}", config.logging.level),
        format!("logging.format = {:?}", config.logging.format).to_lowercase(),
    ];

    CommandResult::listing(lines.join("\n"))
}
