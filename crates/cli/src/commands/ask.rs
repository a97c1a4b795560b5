use std::sync::Arc;

use serde::Serialize;

use super::{
    blocking_runtime, load_config, open_migrated_pool, render_setup_failure, CommandResult,
    SetupFailure,
};
use clerky_agent::{AgentRuntime, GuardrailPolicy, QueryReport, ToolCallingAgent, ToolRegistry};
use clerky_core::config::LoadOptions;
use clerky_core::{MetricsRecorder, MetricsSnapshot};
use clerky_db::repositories::{SqlInventoryRepository, SqlOrderRepository, SqlTicketRepository};

#[derive(Debug, Serialize)]
struct AskOutput {
    report: QueryReport,
    metrics: MetricsSnapshot,
}

pub fn run(
    options: LoadOptions,
    query: &str,
    customer_id: Option<&str>,
    json_output: bool,
) -> CommandResult {
    let config = match load_config("ask", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match blocking_runtime("ask") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_migrated_pool(&config).await?;

        let registry = Arc::new(ToolRegistry::support_desk(
            Arc::new(SqlOrderRepository::new(pool.clone())),
            Arc::new(SqlInventoryRepository::new(pool.clone())),
            Arc::new(SqlTicketRepository::new(pool.clone())),
        ));
        let agent = ToolCallingAgent::from_config(&config.llm, registry)
            .map_err(|error| ("llm_configuration", error.to_string(), 2u8))?;

        let metrics = MetricsRecorder::new();
        let monitored = AgentRuntime::new(
            Arc::new(agent),
            GuardrailPolicy::from_config(&config.guardrails),
            metrics.clone(),
        );

        // The monitored lifecycle is infallible; guardrail rejections and
        // delegation failures come back as an error-outcome report, not Err.
        let report = monitored.run(query, customer_id).await;
        let snapshot = metrics.snapshot();

        pool.close().await;
        Ok::<AskOutput, SetupFailure>(AskOutput { report, metrics: snapshot })
    });

    match result {
        Ok(output) => render(&output, json_output),
        Err(failure) => render_setup_failure("ask", failure),
    }
}

fn render(output: &AskOutput, json_output: bool) -> CommandResult {
    if json_output {
        let rendered = serde_json::to_string_pretty(output).unwrap_or_else(|error| {
            format!(
                "{{\"error\":\"ask serialization failed: {}\"}}",
                error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
            )
        });
        return CommandResult { exit_code: 0, output: rendered };
    }

    let report = &output.report;
    let mut lines = vec![
        report.response.clone(),
        String::new(),
        format!(
            "outcome: {} in {:.2}s (correlation {})",
            report.outcome.as_str(),
            report.elapsed_seconds,
            report.correlation_id
        ),
    ];
    if !report.tool_invocations.is_empty() {
        let tools: Vec<&str> =
            report.tool_invocations.iter().map(|invocation| invocation.tool.as_str()).collect();
        lines.push(format!("tools used: {}", tools.join(", ")));
    }
    lines.push(String::new());
    lines.push(output.metrics.to_string());

    CommandResult { exit_code: 0, output: lines.join("\n") }
}
