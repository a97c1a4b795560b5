//! Delegation boundary between the monitored runtime and the language model.
//!
//! [`SupportAgent`] is the seam the runtime calls through; [`ToolCallingAgent`]
//! is the production implementation, speaking the OpenAI-compatible chat
//! completions protocol and looping on tool calls until the model produces a
//! plain answer.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use clerky_core::config::{LlmConfig, LlmProvider};
use clerky_core::CustomerQuery;

use crate::prompt::SYSTEM_PROMPT;
use crate::tools::ToolRegistry;

const OPENAI_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// One tool round-trip as it happened during delegation, recorded in the
/// order of execution. `input` is the parsed argument object the model sent,
/// `output` the JSON payload the tool returned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub tool: String,
    pub input: Value,
    pub output: Value,
}

/// What delegation produced: the model's final text plus every tool
/// round-trip that led to it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentReply {
    pub response_text: String,
    pub tool_invocations: Vec<ToolInvocation>,
}

/// Anything the runtime can delegate a customer query to. `Err` means the
/// delegation itself failed (network, protocol, exhausted iteration limit)
/// and the runtime classifies the query as an error; business-level misses
/// such as an unknown order travel inside the reply, not through `Err`.
#[async_trait]
pub trait SupportAgent: Send + Sync {
    async fn respond(&self, query: &CustomerQuery) -> Result<AgentReply>;
}

/// Chat-completions client with a bounded tool loop. Each iteration sends
/// the conversation so far; when the model answers with tool calls they are
/// executed through the registry and fed back as `tool` messages, and the
/// loop re-asks. A plain assistant message ends the loop.
pub struct ToolCallingAgent {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
    model: String,
    max_iterations: u32,
    tools: Arc<ToolRegistry>,
}

impl ToolCallingAgent {
    pub fn from_config(config: &LlmConfig, tools: Arc<ToolRegistry>) -> Result<Self> {
        let endpoint = match config.provider {
            LlmProvider::OpenAi => {
                if config.api_key.is_none() {
                    bail!("llm.api_key must be set for the openai provider");
                }
                OPENAI_CHAT_COMPLETIONS_URL.to_string()
            }
            LlmProvider::Ollama => {
                let base_url = config
                    .base_url
                    .as_deref()
                    .ok_or_else(|| anyhow!("llm.base_url must be set for the ollama provider"))?;
                format!("{}/v1/chat/completions", base_url.trim_end_matches('/'))
            }
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_iterations: config.max_iterations,
            tools,
        })
    }

    async fn request_completion(
        &self,
        messages: &[ChatMessage],
        tool_schemas: &[Value],
    ) -> Result<ChatMessage> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            temperature: 0.0,
            tools: tool_schemas.to_vec(),
        };

        let mut http_request = self.client.post(&self.endpoint).json(&request);
        if let Some(api_key) = &self.api_key {
            http_request = http_request.bearer_auth(api_key.expose_secret());
        }

        let response = http_request.send().await.context("chat completion request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("chat completion returned {status}: {body}");
        }

        let parsed: ChatResponse =
            response.json().await.context("malformed chat completion response")?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("chat completion returned no choices"))?;
        Ok(choice.message)
    }
}

#[async_trait]
impl SupportAgent for ToolCallingAgent {
    async fn respond(&self, query: &CustomerQuery) -> Result<AgentReply> {
        let mut messages =
            vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user_prompt(query))];
        let tool_schemas = self.tools.chat_schemas();
        let mut invocations = Vec::new();

        for iteration in 0..self.max_iterations {
            let assistant = self.request_completion(&messages, &tool_schemas).await?;
            let tool_calls = assistant.tool_calls.clone().unwrap_or_default();

            if tool_calls.is_empty() {
                let response_text = assistant.content.unwrap_or_default();
                tracing::debug!(
                    iterations = iteration + 1,
                    tool_invocations = invocations.len(),
                    "delegation produced a final answer"
                );
                return Ok(AgentReply { response_text, tool_invocations: invocations });
            }

            messages.push(assistant);
            for call in tool_calls {
                let input = parse_arguments(&call.function.arguments)?;
                let output = match self.tools.get(&call.function.name) {
                    Some(tool) => tool.execute(input.clone()).await?,
                    // The model asked for a tool we never offered; tell it so
                    // and let it recover on the next turn.
                    None => json!({ "error": format!("unknown tool: {}", call.function.name) }),
                };
                tracing::debug!(tool = %call.function.name, "tool call executed");
                messages.push(ChatMessage::tool(call.id.clone(), output.to_string()));
                invocations.push(ToolInvocation {
                    tool: call.function.name.clone(),
                    input,
                    output,
                });
            }
        }

        bail!("no final answer after {} tool iterations", self.max_iterations)
    }
}

/// The user message pairs the raw query text with the customer identifier
/// when one was supplied, so the model can mention it in ticket issues.
fn user_prompt(query: &CustomerQuery) -> String {
    match query.customer_id_str() {
        Some(customer_id) => format!("{}\n\nCustomer ID: {}", query.text, customer_id),
        None => query.text.clone(),
    }
}

fn parse_arguments(raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(raw).with_context(|| format!("malformed tool arguments: {raw}"))
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCallPayload>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ChatMessage {
    fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    fn tool(tool_call_id: String, content: String) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content),
            tool_calls: None,
            tool_call_id: Some(tool_call_id),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Tool call as it appears on the wire. `arguments` arrives as a JSON-encoded
/// string, not an object.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct ToolCallPayload {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: FunctionCallPayload,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct FunctionCallPayload {
    name: String,
    arguments: String,
}
