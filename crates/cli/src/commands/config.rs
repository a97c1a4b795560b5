use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use clerky_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run(options: LoadOptions) -> String {
    let explicit_path = options.config_path.clone();
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("configuration is invalid: {error}"),
    };

    let file_path = detect_config_path(explicit_path.as_deref());
    let file_doc = read_file_doc(file_path.as_deref());
    let source = |key_path: &str, env_key: &str| {
        resolve_source(key_path, env_key, file_doc.as_ref(), file_path.as_deref())
    };

    let mut lines =
        vec!["effective configuration (env overrides file, file overrides defaults):".to_string()];

    lines.push(format_entry(
        "database.url",
        &config.database.url,
        source("database.url", "CLERKY_DATABASE_URL"),
    ));
    lines.push(format_entry(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        source("database.max_connections", "CLERKY_DATABASE_MAX_CONNECTIONS"),
    ));
    lines.push(format_entry(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        source("database.timeout_secs", "CLERKY_DATABASE_TIMEOUT_SECS"),
    ));

    lines.push(format_entry(
        "llm.provider",
        &format!("{:?}", config.llm.provider),
        source("llm.provider", "CLERKY_LLM_PROVIDER"),
    ));
    lines.push(format_entry(
        "llm.model",
        &config.llm.model,
        source("llm.model", "CLERKY_LLM_MODEL"),
    ));
    lines.push(format_entry(
        "llm.base_url",
        config.llm.base_url.as_deref().unwrap_or("<unset>"),
        source("llm.base_url", "CLERKY_LLM_BASE_URL"),
    ));
    let llm_api_key = config.llm.api_key.as_ref().map_or("<unset>", |_| "<redacted>");
    lines.push(format_entry(
        "llm.api_key",
        llm_api_key,
        source("llm.api_key", "CLERKY_LLM_API_KEY"),
    ));
    lines.push(format_entry(
        "llm.timeout_secs",
        &config.llm.timeout_secs.to_string(),
        source("llm.timeout_secs", "CLERKY_LLM_TIMEOUT_SECS"),
    ));
    lines.push(format_entry(
        "llm.max_iterations",
        &config.llm.max_iterations.to_string(),
        source("llm.max_iterations", "CLERKY_LLM_MAX_ITERATIONS"),
    ));

    lines.push(format_entry(
        "guardrails.max_query_chars",
        &config.guardrails.max_query_chars.to_string(),
        source("guardrails.max_query_chars", "CLERKY_GUARDRAILS_MAX_QUERY_CHARS"),
    ));
    lines.push(format_entry(
        "guardrails.min_response_chars",
        &config.guardrails.min_response_chars.to_string(),
        source("guardrails.min_response_chars", "CLERKY_GUARDRAILS_MIN_RESPONSE_CHARS"),
    ));

    lines.push(format_entry(
        "server.bind_address",
        &config.server.bind_address,
        source("server.bind_address", "CLERKY_SERVER_BIND_ADDRESS"),
    ));
    lines.push(format_entry(
        "server.port",
        &config.server.port.to_string(),
        source("server.port", "CLERKY_SERVER_PORT"),
    ));
    lines.push(format_entry(
        "server.graceful_shutdown_secs",
        &config.server.graceful_shutdown_secs.to_string(),
        source("server.graceful_shutdown_secs", "CLERKY_SERVER_GRACEFUL_SHUTDOWN_SECS"),
    ));

    // The short CLERKY_LOG_* aliases count as env sources too.
    let level_env = if env::var_os("CLERKY_LOG_LEVEL").is_some()
        && env::var_os("CLERKY_LOGGING_LEVEL").is_none()
    {
        "CLERKY_LOG_LEVEL"
    } else {
        "CLERKY_LOGGING_LEVEL"
    };
    let format_env = if env::var_os("CLERKY_LOG_FORMAT").is_some()
        && env::var_os("CLERKY_LOGGING_FORMAT").is_none()
    {
        "CLERKY_LOG_FORMAT"
    } else {
        "CLERKY_LOGGING_FORMAT"
    };
    lines.push(format_entry(
        "logging.level",
        &config.logging.level,
        source("logging.level", level_env),
    ));
    lines.push(format_entry(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", format_env),
    ));

    lines.join("\n")
}

fn detect_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from("clerky.toml"), PathBuf::from("config/clerky.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_file_doc(path: Option<&Path>) -> Option<Value> {
    fs::read_to_string(path?).ok()?.parse().ok()
}

fn resolve_source(
    key_path: &str,
    env_key: &str,
    file_doc: Option<&Value>,
    file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    match file_doc {
        Some(doc) if file_defines(doc, key_path) => {
            let shown =
                file_path.map_or_else(|| "config file".to_string(), |p| p.display().to_string());
            format!("file ({shown})")
        }
        _ => "default".to_string(),
    }
}

fn file_defines(root: &Value, key_path: &str) -> bool {
    key_path.split('.').try_fold(root, |table, key| table.get(key)).is_some()
}

fn format_entry(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
