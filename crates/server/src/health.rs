use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use sqlx::Connection;

use clerky_db::DbPool;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

/// One readiness probe. The service probe is static once the process serves
/// requests; the database probe pings a pooled connection.
#[derive(Clone, Debug, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

impl HealthCheck {
    fn ready(detail: impl Into<String>) -> Self {
        Self { status: "ready", detail: detail.into() }
    }

    fn degraded(detail: impl Into<String>) -> Self {
        Self { status: "degraded", detail: detail.into() }
    }

    fn is_ready(&self) -> bool {
        self.status == "ready"
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub database: HealthCheck,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

/// 200 with every check ready, 503 as soon as one degrades.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let service = HealthCheck::ready("clerky-server runtime initialized");
    let database = database_check(&state.db_pool).await;
    let all_ready = service.is_ready() && database.is_ready();

    let payload = HealthResponse {
        status: if all_ready { "ready" } else { "degraded" },
        service,
        database,
        checked_at: Utc::now().to_rfc3339(),
    };
    let code = if all_ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match pool.acquire().await {
        Ok(mut connection) => match connection.ping().await {
            Ok(()) => HealthCheck::ready("database connection answered ping"),
            Err(error) => HealthCheck::degraded(format!("database ping failed: {error}")),
        },
        Err(error) => {
            HealthCheck::degraded(format!("no database connection available: {error}"))
        }
    }
}
