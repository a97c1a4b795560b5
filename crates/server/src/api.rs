use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use clerky_agent::{AgentRuntime, QueryReport};
use clerky_core::MetricsSnapshot;

#[derive(Clone)]
pub struct ApiState {
    runtime: Arc<AgentRuntime>,
}

impl ApiState {
    pub fn new(runtime: Arc<AgentRuntime>) -> Self {
        Self { runtime }
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub customer_id: Option<String>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/query", post(run_query))
        .route("/metrics", get(metrics_snapshot))
        .with_state(state)
}

/// Always answers 200. Guardrail rejections and delegation failures are
/// carried in the body as an error outcome, not as transport failures.
pub async fn run_query(
    State(state): State<ApiState>,
    Json(request): Json<QueryRequest>,
) -> Json<QueryReport> {
    let report = state.runtime.run(&request.query, request.customer_id.as_deref()).await;
    Json(report)
}

pub async fn metrics_snapshot(State(state): State<ApiState>) -> Json<MetricsSnapshot> {
    Json(state.runtime.metrics().snapshot())
}
