pub mod ask;
pub mod config;
pub mod doctor;
pub mod migrate;
pub mod seed;

use serde_json::json;

use clerky_core::config::{AppConfig, LoadOptions};
use clerky_db::{connect_with_settings, migrations, DbPool};

/// What a command hands back to the process boundary: the text to print and
/// the exit code to carry. Commands report their own failures through
/// [`CommandResult::failure`]; `Err` never reaches `main`.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self { exit_code: 0, output: envelope(command, "ok", None, &message.into()) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self {
            exit_code,
            output: envelope(command, "error", Some(error_class), &message.into()),
        }
    }
}

/// Machine-readable status line shared by every command. Rendering goes
/// through `Value`, which serializes infallibly.
fn envelope(command: &str, status: &str, error_class: Option<&str>, message: &str) -> String {
    json!({
        "command": command,
        "status": status,
        "error_class": error_class,
        "message": message,
    })
    .to_string()
}

/// Classified failure raised inside a command's async body: error class,
/// operator-facing message, process exit code.
pub(crate) type SetupFailure = (&'static str, String, u8);

pub(crate) fn render_setup_failure(
    command: &str,
    (error_class, message, exit_code): SetupFailure,
) -> CommandResult {
    CommandResult::failure(command, error_class, message, exit_code)
}

// Every data-touching command climbs the same setup ladder, and the exit
// codes name the rung that broke: 2 configuration, 3 async runtime,
// 4 database connectivity, 5 migrations.

pub(crate) fn load_config(command: &str, options: LoadOptions) -> Result<AppConfig, CommandResult> {
    AppConfig::load(options).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })
}

pub(crate) fn blocking_runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}

pub(crate) async fn open_pool(config: &AppConfig) -> Result<DbPool, SetupFailure> {
    connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(|error| ("db_connectivity", error.to_string(), 4))
}

pub(crate) async fn open_migrated_pool(config: &AppConfig) -> Result<DbPool, SetupFailure> {
    let pool = open_pool(config).await?;
    migrations::run_pending(&pool)
        .await
        .map_err(|error| ("migration", error.to_string(), 5))?;
    Ok(pool)
}
