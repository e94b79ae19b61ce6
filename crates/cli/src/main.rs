use std::process::ExitCode;

use operis_core::config::{AppConfig, LoadOptions, LogFormat};

fn main() -> ExitCode {
    // Logging setup reads the config directly so a broken config still
    // leaves the command able to print its own diagnostic.
    let (level, format) = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => (config.logging.level, config.logging.format),
        Err(_) => ("info".to_string(), LogFormat::Compact),
    };
    let log_level = level.parse().unwrap_or(tracing::Level::INFO);

    match format {
        LogFormat::Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }

    operis_cli::run()
}
