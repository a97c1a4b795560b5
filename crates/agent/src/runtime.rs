//! The monitored query lifecycle: guardrail gates around delegation, outcome
//! classification, metrics, and one structured log entry per lifecycle step.
//!
//! [`AgentRuntime::run`] is deliberately infallible. Whatever happens inside
//! the lifecycle, the caller gets a [`QueryReport`] with a customer-facing
//! response and a classified outcome; failures surface as the `Error` outcome,
//! never as `Err` or a panic.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use clerky_core::{CustomerId, CustomerQuery, MetricsRecorder, QueryOutcome};

use crate::guardrails::{GuardrailDecision, GuardrailPolicy};
use crate::llm::{AgentReply, SupportAgent, ToolInvocation};

/// Tool whose invocation marks a query as escalated regardless of what the
/// response text says.
const ESCALATION_TOOL: &str = "create_support_ticket";

/// Shown when delegation itself fails. Deliberately does not claim a ticket
/// was created; nothing was persisted on this path.
const DELEGATION_FAILURE_RESPONSE: &str =
    "I apologize, but I ran into an unexpected problem while handling your request. \
     Please try again in a moment, or contact support if the issue persists.";

/// Everything one monitored invocation produced.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryReport {
    pub correlation_id: String,
    pub response: String,
    pub outcome: QueryOutcome,
    pub elapsed_seconds: f64,
    pub tool_invocations: Vec<ToolInvocation>,
}

impl QueryReport {
    pub fn resolved(&self) -> bool {
        self.outcome == QueryOutcome::Resolved
    }

    pub fn escalated(&self) -> bool {
        self.outcome == QueryOutcome::Escalated
    }
}

/// How the lifecycle ended, in more detail than the recorded outcome: the
/// two error paths log at different levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Disposition {
    Resolved,
    Escalated,
    InputRejected,
    DelegationFailed,
}

impl Disposition {
    fn outcome(self) -> QueryOutcome {
        match self {
            Self::Resolved => QueryOutcome::Resolved,
            Self::Escalated => QueryOutcome::Escalated,
            Self::InputRejected | Self::DelegationFailed => QueryOutcome::Error,
        }
    }
}

/// Wraps a [`SupportAgent`] with guardrails and metrics. Construct once at
/// startup and share; the recorder handle aggregates across clones.
pub struct AgentRuntime {
    agent: Arc<dyn SupportAgent>,
    guardrails: GuardrailPolicy,
    metrics: MetricsRecorder,
}

impl AgentRuntime {
    pub fn new(
        agent: Arc<dyn SupportAgent>,
        guardrails: GuardrailPolicy,
        metrics: MetricsRecorder,
    ) -> Self {
        Self { agent, guardrails, metrics }
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    /// Runs one query through the full monitored lifecycle: receipt, input
    /// gate, delegation, output gate, classification, metrics, report.
    pub async fn run(&self, query_text: &str, customer_id: Option<&str>) -> QueryReport {
        let started = Instant::now();
        let correlation_id = Uuid::new_v4().to_string();
        let query = CustomerQuery::new(
            query_text,
            customer_id.map(|id| CustomerId(id.to_string())),
        );

        tracing::info!(
            event_name = "query_received",
            correlation_id = %correlation_id,
            customer_id = query.customer_id_str().unwrap_or("anonymous"),
            preview = query.preview(),
            "customer query received"
        );

        let (response, disposition, tool_invocations) = match self
            .guardrails
            .validate_input(&query.text)
        {
            GuardrailDecision::Reject { reason_code, user_message } => {
                tracing::warn!(
                    event_name = "input_rejected",
                    correlation_id = %correlation_id,
                    reason_code,
                    "query rejected before delegation"
                );
                (user_message, Disposition::InputRejected, Vec::new())
            }
            GuardrailDecision::Accept => match self.agent.respond(&query).await {
                Ok(reply) => self.gate_and_classify(&correlation_id, reply),
                Err(error) => {
                    tracing::error!(
                        event_name = "delegation_failed",
                        correlation_id = %correlation_id,
                        error = %error,
                        "delegation to the support agent failed"
                    );
                    let response = DELEGATION_FAILURE_RESPONSE.to_string();
                    (response, Disposition::DelegationFailed, Vec::new())
                }
            },
        };

        let elapsed = started.elapsed();
        let outcome = disposition.outcome();
        self.metrics.record(outcome, elapsed);

        let elapsed_ms = elapsed.as_millis() as u64;
        match disposition {
            Disposition::Resolved => tracing::info!(
                event_name = "query_resolved",
                correlation_id = %correlation_id,
                elapsed_ms,
                "query resolved"
            ),
            Disposition::Escalated => tracing::warn!(
                event_name = "query_escalated",
                correlation_id = %correlation_id,
                elapsed_ms,
                "query escalated to a human"
            ),
            Disposition::InputRejected => tracing::warn!(
                event_name = "query_rejected",
                correlation_id = %correlation_id,
                elapsed_ms,
                "query rejected by input guardrails"
            ),
            Disposition::DelegationFailed => tracing::error!(
                event_name = "query_failed",
                correlation_id = %correlation_id,
                elapsed_ms,
                "query could not be delegated"
            ),
        }

        QueryReport {
            correlation_id,
            response,
            outcome,
            elapsed_seconds: elapsed.as_secs_f64(),
            tool_invocations,
        }
    }

    /// Output gate, then classification. A rejected response is replaced by
    /// the guardrail's customer-facing message and escalated; the tool trace
    /// is kept either way because those calls really happened.
    fn gate_and_classify(
        &self,
        correlation_id: &str,
        reply: AgentReply,
    ) -> (String, Disposition, Vec<ToolInvocation>) {
        match self.guardrails.validate_output(&reply.response_text) {
            GuardrailDecision::Reject { reason_code, user_message } => {
                tracing::warn!(
                    event_name = "output_rejected",
                    correlation_id = %correlation_id,
                    reason_code,
                    "agent response rejected by output guardrails"
                );
                (user_message, Disposition::Escalated, reply.tool_invocations)
            }
            GuardrailDecision::Accept => {
                let disposition = classify(&reply);
                (reply.response_text, disposition, reply.tool_invocations)
            }
        }
    }
}

/// A query escalated when a ticket was actually created, or when the agent
/// talks about one without having called the tool. Everything else resolved.
fn classify(reply: &AgentReply) -> Disposition {
    let created_ticket =
        reply.tool_invocations.iter().any(|invocation| invocation.tool == ESCALATION_TOOL);
    if created_ticket || reply.response_text.to_lowercase().contains("ticket") {
        Disposition::Escalated
    } else {
        Disposition::Resolved
    }
}
