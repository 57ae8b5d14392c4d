use orderbot_core::config::{AppConfig, ChannelProvider, LoadOptions};
use orderbot_db::{ping, DemoSeedDataset};
use serde::Serialize;

use crate::commands::{block_on, open_pool, CommandResult, StepFailure};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
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

const CHECK_NAMES: [&str; 4] =
    ["config_validation", "channel_readiness", "database_connectivity", "demo_business"];

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Fail { 1 } else { 0 };

    let output = if json_output {
        serde_json::to_string(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let checks = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            let mut checks = vec![DoctorCheck {
                name: CHECK_NAMES[0],
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            }];
            checks.push(check_channel(&config));
            checks.extend(check_database(&config));
            checks
        }
        Err(error) => {
            let mut checks = vec![DoctorCheck {
                name: CHECK_NAMES[0],
                status: CheckStatus::Fail,
                details: error.to_string(),
            }];
            checks.extend(CHECK_NAMES[1..].iter().map(|name| DoctorCheck {
                name: *name,
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            }));
            checks
        }
    };

    let overall_status = if checks.iter().any(|check| check.status == CheckStatus::Fail) {
        CheckStatus::Fail
    } else if checks.iter().all(|check| check.status == CheckStatus::Pass) {
        CheckStatus::Pass
    } else {
        CheckStatus::Warn
    };
    let summary = match overall_status {
        CheckStatus::Pass => "doctor: all readiness checks passed",
        CheckStatus::Fail => "doctor: one or more readiness checks failed",
        CheckStatus::Warn | CheckStatus::Skipped => "doctor: ready with warnings",
    }
    .to_string();

    DoctorReport { overall_status, summary, checks }
}

fn check_channel(config: &AppConfig) -> DoctorCheck {
    match config.channel.provider {
        ChannelProvider::Log => DoctorCheck {
            name: CHECK_NAMES[1],
            status: CheckStatus::Warn,
            details: "log provider selected; replies are written to the log, not sent".to_string(),
        },
        ChannelProvider::Whatsapp => DoctorCheck {
            name: CHECK_NAMES[1],
            status: CheckStatus::Pass,
            details: format!("whatsapp delivery via {}", config.channel.api_base_url),
        },
    }
}

/// Connectivity first; the demo-business probe only runs on a reachable database.
fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let probe = block_on("doctor", async {
        let pool = open_pool(config).await?;
        let reachable = ping(&pool).await.map_err(|error| error.to_string());
        let seeded = match reachable {
            Ok(()) => Some(DemoSeedDataset::verify(&pool).await.map_err(|error| error.to_string())),
            Err(_) => None,
        };
        pool.close().await;
        Ok::<_, StepFailure>((reachable, seeded))
    });

    let (reachable, seeded) = match probe {
        Ok(probe) => probe,
        Err(failure) => (Err(failure.output), None),
    };

    let connectivity = match reachable {
        Ok(()) => DoctorCheck {
            name: CHECK_NAMES[2],
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.database.url),
        },
        Err(details) => DoctorCheck { name: CHECK_NAMES[2], status: CheckStatus::Fail, details },
    };

    let demo = match seeded {
        Some(Ok(verification)) if verification.all_present => DoctorCheck {
            name: CHECK_NAMES[3],
            status: CheckStatus::Pass,
            details: "demo business and menu present".to_string(),
        },
        Some(Ok(_)) => DoctorCheck {
            name: CHECK_NAMES[3],
            status: CheckStatus::Warn,
            details: "demo data missing; run `orderbot seed` for local testing".to_string(),
        },
        Some(Err(details)) => DoctorCheck {
            name: CHECK_NAMES[3],
            status: CheckStatus::Warn,
            details: format!("could not inspect demo data (migrations applied?): {details}"),
        },
        None => DoctorCheck {
            name: CHECK_NAMES[3],
            status: CheckStatus::Skipped,
            details: "skipped because the database is unreachable".to_string(),
        },
    };

    vec![connectivity, demo]
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];
    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{render_human, CheckStatus, DoctorCheck, DoctorReport};

    #[test]
    fn human_rendering_marks_each_check() {
        let report = DoctorReport {
            overall_status: CheckStatus::Warn,
            summary: "doctor: ready with warnings".to_string(),
            checks: vec![
                DoctorCheck {
                    name: "config_validation",
                    status: CheckStatus::Pass,
                    details: "ok".to_string(),
                },
                DoctorCheck {
                    name: "demo_business",
                    status: CheckStatus::Warn,
                    details: "missing".to_string(),
                },
            ],
        };

        let rendered = render_human(&report);
        assert!(rendered.starts_with("doctor: ready with warnings"));
        assert!(rendered.contains("- [ok] config_validation: ok"));
        assert!(rendered.contains("- [warn] demo_business: missing"));
    }
}
