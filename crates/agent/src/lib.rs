//! The monitored support agent: guardrails around delegation, outcome
//! classification, and the tool-calling client underneath.
//!
//! A query enters through [`AgentRuntime::run`], passes the input gate,
//! is delegated to a [`SupportAgent`], has its response checked by the
//! output gate, and comes back as a [`QueryReport`] classified resolved,
//! escalated, or errored, with the shared metrics aggregate updated.
//!
//! Modules:
//! - [`guardrails`]: validation gates on either side of delegation
//! - [`llm`]: the [`SupportAgent`] seam and the chat-completions tool loop
//! - [`prompt`]: persona and rules sent as the system message
//! - [`runtime`]: the monitored lifecycle
//! - [`tools`]: the support desk toolbox offered to the model

pub mod guardrails;
pub mod llm;
pub mod prompt;
pub mod runtime;
pub mod tools;

pub use guardrails::{GuardrailDecision, GuardrailPolicy};
pub use llm::{AgentReply, SupportAgent, ToolCallingAgent, ToolInvocation};
pub use runtime::{AgentRuntime, QueryReport};
pub use tools::{Tool, ToolRegistry};
