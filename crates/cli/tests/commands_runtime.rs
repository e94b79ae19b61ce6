use std::env;
use std::sync::{Mutex, OnceLock};

use operis_cli::commands::{self, GlobalArgs};
use serde_json::Value;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn with_env(vars: &[(&str, &str)], run: impl FnOnce()) {
    let lock = ENV_LOCK.get_or_init(|| Mutex::new(()));
    let _guard = match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    for (key, value) in vars {
        env::set_var(key, value);
    }
    run();
    for (key, _) in vars {
        env::remove_var(key);
    }
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be JSON")
}

#[test]
fn config_command_reflects_env_overrides() {
    with_env(
        &[
            ("OPERIS_API_BASE_URL", "https://portal.operis.vn/api"),
            ("OPERIS_BANK_CODE", "VCB"),
        ],
        || {
            let result = commands::config::run(&GlobalArgs::default());
            assert_eq!(result.exit_code, 0);
            assert!(result.output.contains("api.base_url = https://portal.operis.vn/api"));
            assert!(result.output.contains("bank.bank_code = VCB"));
        },
    );
}

#[test]
fn config_command_reports_validation_failures() {
    with_env(&[("OPERIS_API_BASE_URL", "ftp://nope")], || {
        let result = commands::config::run(&GlobalArgs::default());
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "config");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn whoami_requires_a_session() {
    let home = tempfile::tempdir().expect("temp home");
    with_env(&[("HOME", home.path().to_str().expect("utf-8 path"))], || {
        let result = commands::auth::whoami(&GlobalArgs::default());
        assert_eq!(result.exit_code, 3);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "auth_required");
    });
}

#[test]
fn doctor_flags_unreachable_api() {
    let home = tempfile::tempdir().expect("temp home");
    with_env(
        &[
            ("HOME", home.path().to_str().expect("utf-8 path")),
            // Port 1 is never listening; the reachability check must fail
            // without hanging.
            ("OPERIS_API_BASE_URL", "http://127.0.0.1:1/api"),
            ("OPERIS_API_TIMEOUT_SECS", "2"),
        ],
        || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("runtime");
            let result = runtime.block_on(commands::doctor::run(&GlobalArgs::default(), true));
            assert_eq!(result.exit_code, 1);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["overall_status"], "fail");
            let checks = payload["checks"].as_array().expect("checks array");
            let reachability = checks
                .iter()
                .find(|check| check["name"] == "api_reachability")
                .expect("reachability check present");
            assert_eq!(reachability["status"], "fail");
            let config_check = checks
                .iter()
                .find(|check| check["name"] == "config_validation")
                .expect("config check present");
            assert_eq!(config_check["status"], "pass");
        },
    );
}
