use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use clerky_agent::{AgentRuntime, GuardrailPolicy, ToolCallingAgent, ToolRegistry};
use clerky_core::config::{AppConfig, ConfigError, LoadOptions};
use clerky_core::MetricsRecorder;
use clerky_db::repositories::{SqlInventoryRepository, SqlOrderRepository, SqlTicketRepository};
use clerky_db::{connect_with_settings, migrations, DbPool};

/// Everything a started server holds: the effective configuration, the
/// database pool, and the monitored runtime wired to the sql-backed tools.
pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not connect to the database: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("could not apply migrations: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("agent initialization failed: {0}")]
    Agent(#[source] anyhow::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Bootstraps from an already-loaded configuration, so the caller can
/// initialize logging from the same config first.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "bootstrap_started", correlation_id = "bootstrap", "bootstrap starting");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "database_connected", correlation_id = "bootstrap", "database pool ready");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "migrations_applied", correlation_id = "bootstrap", "schema is current");

    let registry = Arc::new(ToolRegistry::support_desk(
        Arc::new(SqlOrderRepository::new(db_pool.clone())),
        Arc::new(SqlInventoryRepository::new(db_pool.clone())),
        Arc::new(SqlTicketRepository::new(db_pool.clone())),
    ));
    let agent =
        ToolCallingAgent::from_config(&config.llm, registry).map_err(BootstrapError::Agent)?;
    let runtime = Arc::new(AgentRuntime::new(
        Arc::new(agent),
        GuardrailPolicy::from_config(&config.guardrails),
        MetricsRecorder::new(),
    ));
    info!(
        event_name = "agent_initialized",
        correlation_id = "bootstrap",
        provider = ?config.llm.provider,
        model = %config.llm.model,
        "monitored agent runtime initialized"
    );

    Ok(Application { config, db_pool, runtime })
}
