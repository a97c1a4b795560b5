use serde::Serialize;

use crate::commands::CommandResult;
use clerky_core::config::{AppConfig, LlmProvider, LoadOptions};
use clerky_db::{connect_with_settings, migrations, DbPool};

/// One readiness probe. `Skipped` marks probes that were not attempted
/// because an earlier probe already failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

/// A single probe's outcome; `name` stays stable for scripting.
#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

/// Everything `doctor --json` prints; `overall_status` folds the per-check
/// statuses.
#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 6 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
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

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(passed("config_validation", "configuration loaded and validated"));
            checks.push(check_llm_readiness(&config));
            checks.extend(check_database(&config));
        }
        Err(error) => {
            checks.push(failed("config_validation", error.to_string()));
            checks.push(skipped("llm_readiness"));
            checks.push(skipped("database_connectivity"));
            checks.push(skipped("migration_status"));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let (overall_status, summary) = if all_pass {
        (CheckStatus::Pass, "doctor: all readiness checks passed")
    } else {
        (CheckStatus::Fail, "doctor: one or more readiness checks failed")
    };

    DoctorReport { overall_status, summary: summary.to_string(), checks }
}

// Config validation already guarantees the provider's credentials; this
// check restates what the agent will run with so an operator can see it.
fn check_llm_readiness(config: &AppConfig) -> DoctorCheck {
    let details = match config.llm.provider {
        LlmProvider::OpenAi => {
            format!("openai provider, model `{}`, api key present", config.llm.model)
        }
        LlmProvider::Ollama => format!(
            "ollama provider, model `{}`, base url `{}`",
            config.llm.model,
            config.llm.base_url.as_deref().unwrap_or_default()
        ),
    };
    passed("llm_readiness", details)
}

fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let probe = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map(|runtime| runtime.block_on(probe_database(config)));

    probe.unwrap_or_else(|error| {
        vec![
            failed(
                "database_connectivity",
                format!("failed to initialize async runtime: {error}"),
            ),
            skipped("migration_status"),
        ]
    })
}

async fn probe_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let pool = match connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    {
        Ok(pool) => pool,
        Err(error) => {
            return vec![
                failed("database_connectivity", format!("failed to connect to database: {error}")),
                skipped("migration_status"),
            ];
        }
    };

    let mut checks =
        vec![passed("database_connectivity", format!("connected using `{}`", config.database.url))];
    checks.push(check_migrations(&pool).await);
    pool.close().await;
    checks
}

async fn check_migrations(pool: &DbPool) -> DoctorCheck {
    match migrations::status(pool).await {
        Ok(status) if status.is_current() => passed(
            "migration_status",
            format!("{} migrations applied, none pending", status.applied),
        ),
        Ok(status) => failed(
            "migration_status",
            format!("{} migrations pending; run `clerky migrate`", status.pending),
        ),
        Err(error) => {
            failed("migration_status", format!("failed to read migration status: {error}"))
        }
    }
}

fn passed(name: &'static str, details: impl Into<String>) -> DoctorCheck {
    DoctorCheck { name, status: CheckStatus::Pass, details: details.into() }
}

fn failed(name: &'static str, details: impl Into<String>) -> DoctorCheck {
    DoctorCheck { name, status: CheckStatus::Fail, details: details.into() }
}

fn skipped(name: &'static str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: "skipped because an earlier check failed".to_string(),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];
    lines.extend(
        report
            .checks
            .iter()
            .map(|check| format!("- [{}] {}: {}", marker(check.status), check.name, check.details)),
    );
    lines.join("\n")
}

fn marker(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "ok",
        CheckStatus::Fail => "fail",
        CheckStatus::Skipped => "skip",
    }
}
