use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub guardrails: GuardrailsConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_iterations: u32,
}

#[derive(Clone, Debug)]
pub struct GuardrailsConfig {
    pub max_query_chars: usize,
    pub min_response_chars: usize,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAi,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_api_key: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("failed to parse configuration file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("configuration file `{0}` does not exist")]
    MissingConfigFile(PathBuf),
    #[error("configuration references unset environment variable `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("configuration interpolation is missing its closing `}}`")]
    UnterminatedInterpolation,
    #[error("environment override `{key}` carries invalid value `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://clerky.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: Some("http://localhost:11434".to_string()),
                model: "llama3.1".to_string(),
                timeout_secs: 30,
                max_iterations: 5,
            },
            guardrails: GuardrailsConfig { max_query_chars: 2000, min_response_chars: 10 },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "llm.provider `{other}` is not supported, expected `openai` or `ollama`"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "logging.format `{other}` is not supported, expected compact, pretty, or json"
            ))),
        }
    }
}

impl AppConfig {
    /// Layered load: defaults, then the TOML file (with `${VAR}`
    /// interpolation), then `CLERKY_*` environment variables, then explicit
    /// overrides. The merged result is validated before it is returned.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        match resolve_config_path(options.config_path.as_deref()) {
            Some(path) => ConfigPatch::from_file(&path)?.merge_into(&mut config),
            None if options.require_file => {
                let expected =
                    options.config_path.unwrap_or_else(|| PathBuf::from("clerky.toml"));
                return Err(ConfigError::MissingConfigFile(expected));
            }
            None => {}
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CLERKY_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("CLERKY_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_env("CLERKY_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("CLERKY_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_env("CLERKY_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CLERKY_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("CLERKY_LLM_API_KEY") {
            self.llm.api_key = Some(SecretString::from(value));
        }
        if let Some(value) = read_env("CLERKY_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("CLERKY_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("CLERKY_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_env("CLERKY_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("CLERKY_LLM_MAX_ITERATIONS") {
            self.llm.max_iterations = parse_env("CLERKY_LLM_MAX_ITERATIONS", &value)?;
        }

        if let Some(value) = read_env("CLERKY_GUARDRAILS_MAX_QUERY_CHARS") {
            self.guardrails.max_query_chars =
                parse_env("CLERKY_GUARDRAILS_MAX_QUERY_CHARS", &value)?;
        }
        if let Some(value) = read_env("CLERKY_GUARDRAILS_MIN_RESPONSE_CHARS") {
            self.guardrails.min_response_chars =
                parse_env("CLERKY_GUARDRAILS_MIN_RESPONSE_CHARS", &value)?;
        }

        if let Some(value) = read_env("CLERKY_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("CLERKY_SERVER_PORT") {
            self.server.port = parse_env("CLERKY_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("CLERKY_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_env("CLERKY_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        // The short CLERKY_LOG_* names are accepted alongside the section
        // keys; the section key wins when both are set.
        if let Some(value) =
            read_env("CLERKY_LOGGING_LEVEL").or_else(|| read_env("CLERKY_LOG_LEVEL"))
        {
            self.logging.level = value;
        }
        if let Some(value) =
            read_env("CLERKY_LOGGING_FORMAT").or_else(|| read_env("CLERKY_LOG_FORMAT"))
        {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        overlay(&mut self.database.url, overrides.database_url);
        overlay(&mut self.logging.level, overrides.log_level);
        overlay(&mut self.llm.provider, overrides.llm_provider);
        overlay(&mut self.llm.model, overrides.llm_model);
        if let Some(base_url) = overrides.llm_base_url {
            self.llm.base_url = Some(base_url);
        }
        if let Some(api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(SecretString::from(api_key));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.llm.validate()?;
        self.guardrails.validate()?;
        self.server.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

impl DatabaseConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let url = self.url.trim();
        let sqlite =
            url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
        if !sqlite {
            return Err(invalid(
                "database.url must point at sqlite (`sqlite://...`, `sqlite::...`, or `:memory:`)",
            ));
        }
        if self.max_connections == 0 {
            return Err(invalid("database.max_connections must be at least 1"));
        }
        if !(1..=300).contains(&self.timeout_secs) {
            return Err(invalid("database.timeout_secs must be between 1 and 300"));
        }
        Ok(())
    }
}

impl LlmConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=300).contains(&self.timeout_secs) {
            return Err(invalid("llm.timeout_secs must be between 1 and 300"));
        }
        if !(1..=25).contains(&self.max_iterations) {
            return Err(invalid("llm.max_iterations must be between 1 and 25"));
        }

        match self.provider {
            LlmProvider::OpenAi => {
                let has_key = self
                    .api_key
                    .as_ref()
                    .is_some_and(|key| !key.expose_secret().trim().is_empty());
                if !has_key {
                    return Err(invalid("the openai provider requires llm.api_key"));
                }
            }
            LlmProvider::Ollama => {
                let has_base_url =
                    self.base_url.as_ref().is_some_and(|url| !url.trim().is_empty());
                if !has_base_url {
                    return Err(invalid("the ollama provider requires llm.base_url"));
                }
            }
        }
        Ok(())
    }
}

impl GuardrailsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100_000).contains(&self.max_query_chars) {
            return Err(invalid("guardrails.max_query_chars must be between 1 and 100000"));
        }
        if !(1..=1_000).contains(&self.min_response_chars) {
            return Err(invalid("guardrails.min_response_chars must be between 1 and 1000"));
        }
        Ok(())
    }
}

impl ServerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(invalid("server.port must not be 0"));
        }
        if self.graceful_shutdown_secs == 0 {
            return Err(invalid("server.graceful_shutdown_secs must be at least 1"));
        }
        Ok(())
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            _ => Err(invalid("logging.level must be trace, debug, info, warn, or error")),
        }
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Validation(message.to_string())
}

fn overlay<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("clerky.toml"), PathBuf::from("config/clerky.toml")]
        .into_iter()
        .find(|path| path.exists())
}

/// Expands every `${VAR}` in the raw file text before TOML parsing, so
/// secrets can live in the environment rather than on disk.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let var = &after[..end];
        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_string() })?;
        output.push_str(&value);
        rest = &after[end + 1..];
    }

    output.push_str(rest);
    Ok(output)
}

/// Empty and whitespace-only values count as unset.
fn read_env(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    guardrails: Option<GuardrailsPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

impl ConfigPatch {
    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
        let interpolated = interpolate_env_vars(&raw)?;
        toml::from_str(&interpolated)
            .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
    }

    fn merge_into(self, config: &mut AppConfig) {
        if let Some(database) = self.database {
            overlay(&mut config.database.url, database.url);
            overlay(&mut config.database.max_connections, database.max_connections);
            overlay(&mut config.database.timeout_secs, database.timeout_secs);
        }
        if let Some(llm) = self.llm {
            overlay(&mut config.llm.provider, llm.provider);
            overlay(&mut config.llm.model, llm.model);
            overlay(&mut config.llm.timeout_secs, llm.timeout_secs);
            overlay(&mut config.llm.max_iterations, llm.max_iterations);
            if let Some(api_key) = llm.api_key {
                config.llm.api_key = Some(SecretString::from(api_key));
            }
            if let Some(base_url) = llm.base_url {
                config.llm.base_url = Some(base_url);
            }
        }
        if let Some(guardrails) = self.guardrails {
            overlay(&mut config.guardrails.max_query_chars, guardrails.max_query_chars);
            overlay(&mut config.guardrails.min_response_chars, guardrails.min_response_chars);
        }
        if let Some(server) = self.server {
            overlay(&mut config.server.bind_address, server.bind_address);
            overlay(&mut config.server.port, server.port);
            overlay(&mut config.server.graceful_shutdown_secs, server.graceful_shutdown_secs);
        }
        if let Some(logging) = self.logging {
            overlay(&mut config.logging.level, logging.level);
            overlay(&mut config.logging.format, logging.format);
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_iterations: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct GuardrailsPatch {
    max_query_chars: Option<usize>,
    min_response_chars: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    /// Serializes environment mutation across tests and scrubs the given
    /// keys afterwards.
    fn with_env<T>(vars: &[(&str, &str)], body: impl FnOnce() -> T) -> T {
        let _guard =
            ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env lock is not poisoned");
        for (key, value) in vars {
            env::set_var(key, value);
        }
        let result = body();
        for (key, _) in vars {
            env::remove_var(key);
        }
        result
    }

    fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("clerky.toml");
        fs::write(&path, contents).expect("write config file");
        path
    }

    fn load_with_file(contents: &str) -> Result<AppConfig, ConfigError> {
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(&dir, contents);
        AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
    }

    #[test]
    fn file_load_supports_env_interpolation() {
        with_env(&[("TEST_LLM_API_KEY", "sk-from-env")], || {
            let config = load_with_file(
                "[llm]\nprovider = \"openai\"\napi_key = \"${TEST_LLM_API_KEY}\"\n",
            )
            .expect("config loads");

            let api_key = config.llm.api_key.as_ref().expect("api key present");
            assert_eq!(api_key.expose_secret(), "sk-from-env");
        });
    }

    #[test]
    fn interpolation_requires_the_variable_to_be_set() {
        with_env(&[], || {
            let error = load_with_file("[llm]\nmodel = \"${CLERKY_TEST_UNSET_VAR}\"\n")
                .expect_err("unset variable must fail the load");
            assert!(matches!(
                error,
                ConfigError::MissingEnvInterpolation { ref var } if var == "CLERKY_TEST_UNSET_VAR"
            ));
        });
    }

    #[test]
    fn unterminated_interpolation_is_rejected() {
        with_env(&[], || {
            let error = load_with_file("[llm]\nmodel = \"${NEVER_CLOSED\"\n")
                .expect_err("unterminated expression must fail the load");
            assert!(matches!(error, ConfigError::UnterminatedInterpolation));
        });
    }

    #[test]
    fn logging_env_aliases_are_supported() {
        with_env(&[("CLERKY_LOG_LEVEL", "warn"), ("CLERKY_LOG_FORMAT", "pretty")], || {
            let config = AppConfig::load(LoadOptions::default()).expect("config loads");
            assert_eq!(config.logging.level, "warn");
            assert_eq!(config.logging.format, LogFormat::Pretty);
        });
    }

    #[test]
    fn precedence_defaults_file_env_overrides() {
        with_env(
            &[
                ("CLERKY_DATABASE_URL", "sqlite://from-env.db"),
                ("CLERKY_LLM_MODEL", "llama3.1-from-env"),
            ],
            || {
                let dir = TempDir::new().expect("temp dir");
                let path = write_config(
                    &dir,
                    "[database]\nurl = \"sqlite://from-file.db\"\n\n\
                     [llm]\nmodel = \"llama3.1-from-file\"\n\n\
                     [logging]\nlevel = \"warn\"\n",
                );

                let config = AppConfig::load(LoadOptions {
                    config_path: Some(path),
                    overrides: ConfigOverrides {
                        database_url: Some("sqlite://from-override.db".to_string()),
                        log_level: Some("debug".to_string()),
                        ..ConfigOverrides::default()
                    },
                    ..LoadOptions::default()
                })
                .expect("config loads");

                assert_eq!(config.database.url, "sqlite://from-override.db");
                assert_eq!(config.logging.level, "debug");
                assert_eq!(config.llm.model, "llama3.1-from-env");
            },
        );
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() {
        with_env(&[("CLERKY_LLM_PROVIDER", "openai")], || {
            let error = AppConfig::load(LoadOptions::default())
                .expect_err("openai without a key must fail validation");
            assert!(matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("llm.api_key")
            ));
        });
    }

    #[test]
    fn invalid_numeric_env_override_is_rejected() {
        with_env(&[("CLERKY_GUARDRAILS_MAX_QUERY_CHARS", "not-a-number")], || {
            let error = AppConfig::load(LoadOptions::default())
                .expect_err("non-numeric override must fail the load");
            assert!(matches!(
                error,
                ConfigError::InvalidEnvOverride { ref key, .. }
                    if key == "CLERKY_GUARDRAILS_MAX_QUERY_CHARS"
            ));
        });
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() {
        with_env(
            &[("CLERKY_LLM_PROVIDER", "openai"), ("CLERKY_LLM_API_KEY", "sk-secret-value")],
            || {
                let config = AppConfig::load(LoadOptions::default()).expect("config loads");
                let debug = format!("{config:?}");

                assert!(!debug.contains("sk-secret-value"));
                assert_eq!(config.logging.format, LogFormat::Compact);
            },
        );
    }

    #[test]
    fn guardrail_bounds_are_validated() {
        with_env(&[("CLERKY_GUARDRAILS_MIN_RESPONSE_CHARS", "0")], || {
            let error = AppConfig::load(LoadOptions::default())
                .expect_err("zero minimum must fail validation");
            assert!(matches!(
                error,
                ConfigError::Validation(ref message)
                    if message.contains("guardrails.min_response_chars")
            ));
        });
    }
}
