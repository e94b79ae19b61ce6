use serde::Serialize;

use operis_api::session::SessionStore;
use operis_api::transport::{ApiRequest, ApiTransport, ReqwestTransport};
use operis_core::config::AppConfig;

use super::{default_session_file, load_config, CommandResult, GlobalArgs};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub async fn run(globals: &GlobalArgs, json_output: bool) -> CommandResult {
    let report = build_report(globals).await;
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

async fn build_report(globals: &GlobalArgs) -> DoctorReport {
    let mut checks = Vec::new();

    match load_config(globals) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_session(&config));
            checks.push(check_api_reachability(&config).await);
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(DoctorCheck {
                name: "session_readiness",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
            checks.push(DoctorCheck {
                name: "api_reachability",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_session(config: &AppConfig) -> DoctorCheck {
    let Some(path) = config.session.file.clone().or_else(default_session_file) else {
        return DoctorCheck {
            name: "session_readiness",
            status: CheckStatus::Pass,
            details: "no session file configured; sessions stay in memory".to_string(),
        };
    };

    let store = SessionStore::with_file(&path);
    match store.load() {
        Ok(true) => DoctorCheck {
            name: "session_readiness",
            status: CheckStatus::Pass,
            details: format!("session restored from `{}`", path.display()),
        },
        Ok(false) => DoctorCheck {
            name: "session_readiness",
            status: CheckStatus::Pass,
            details: "no stored session; `operis login` will create one".to_string(),
        },
        Err(error) => DoctorCheck {
            name: "session_readiness",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

/// Any HTTP response counts as reachable; authentication is checked by
/// actual commands, not here.
async fn check_api_reachability(config: &AppConfig) -> DoctorCheck {
    let transport = match ReqwestTransport::new(&config.api) {
        Ok(transport) => transport,
        Err(error) => {
            return DoctorCheck {
                name: "api_reachability",
                status: CheckStatus::Fail,
                details: error.to_string(),
            };
        }
    };

    match transport.execute(ApiRequest::get("/services")).await {
        Ok(response) => DoctorCheck {
            name: "api_reachability",
            status: CheckStatus::Pass,
            details: format!(
                "reached `{}` (status {})",
                config.api.base_url, response.status
            ),
        },
        Err(error) => DoctorCheck {
            name: "api_reachability",
            status: CheckStatus::Fail,
            details: format!("could not reach `{}`: {error}", config.api.base_url),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
