//! Configuration loader for Parley.
//!
//! Reads an optional TOML file into [`RelayConfig`], falling back to
//! defaults when the file is missing or malformed, then layers environment
//! overrides on top and validates the result. The environment is read
//! through a lookup function so tests never touch the process environment.

use std::path::Path;
use std::str::FromStr;

use parley_types::config::{InferenceConfig, RelayConfig};
use parley_types::error::ConfigError;
use secrecy::SecretString;

/// Environment lookup backed by the real process environment.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Load the relay configuration.
///
/// - No `path`, or the file does not exist: start from [`RelayConfig::default()`].
/// - The file exists but fails to read or parse: log a warning and start from the default.
/// - Then apply environment overrides (an unparsable value is an error naming the variable).
/// - Finally run [`RelayConfig::validate`].
pub async fn load_config<F>(path: Option<&Path>, env: F) -> Result<RelayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => read_config_file(path).await,
        None => RelayConfig::default(),
    };

    apply_env_overrides(&mut config, &env)?;
    config.validate()?;
    Ok(config)
}

async fn read_config_file(path: &Path) -> RelayConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file found at {}, using defaults", path.display());
            return RelayConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return RelayConfig::default();
        }
    };

    match toml::from_str::<RelayConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            RelayConfig::default()
        }
    }
}

/// Apply `PARLEY_*` and provider environment variables over `config`.
pub fn apply_env_overrides<F>(config: &mut RelayConfig, env: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup(env, "PARLEY_HOST") {
        config.server.host = host;
    }
    set_parsed(env, "PARLEY_PORT", &mut config.server.port)?;
    set_parsed(env, "PARLEY_CORS_ALLOW_ANY", &mut config.server.cors_allow_any)?;
    set_parsed(
        env,
        "PARLEY_TRUST_FORWARDED_FOR",
        &mut config.server.trust_forwarded_for,
    )?;

    if let Some(url) = lookup(env, "PARLEY_DATABASE_URL").or_else(|| lookup(env, "DATABASE_URL")) {
        config.store.database_url = url;
    }
    set_parsed(env, "PARLEY_DB_MAX_READERS", &mut config.store.max_read_connections)?;
    set_parsed(env, "PARLEY_DB_TIMEOUT_SECS", &mut config.store.operation_timeout_secs)?;

    if let Some(region) = lookup(env, "AWS_REGION") {
        config.inference.region = region;
    }
    if let Some(model_id) = lookup(env, "BEDROCK_MODEL_ID") {
        config.inference.model_id = model_id;
    }
    if let Some(endpoint) = lookup(env, "BEDROCK_ENDPOINT") {
        config.inference.endpoint = Some(endpoint);
    }
    set_parsed(env, "PARLEY_INFERENCE_TIMEOUT_SECS", &mut config.inference.timeout_secs)?;

    set_parsed(env, "PARLEY_MAX_TOKENS", &mut config.generation.max_tokens)?;
    set_parsed(env, "PARLEY_TEMPERATURE", &mut config.generation.temperature)?;
    set_parsed(env, "PARLEY_TOP_P", &mut config.generation.top_p)?;

    set_parsed(env, "PARLEY_HISTORY_LIMIT", &mut config.chat.history_limit)?;
    set_parsed(env, "PARLEY_CONTEXT_TURNS", &mut config.chat.context_turns)?;
    set_parsed(env, "PARLEY_HISTORY_READ_FAILURE", &mut config.chat.history_read_failure)?;
    set_parsed(env, "PARLEY_PERSIST_FAILURE", &mut config.chat.persist_failure)?;

    set_parsed(env, "PARLEY_RATE_LIMIT_QUOTA", &mut config.rate_limit.quota)?;
    set_parsed(env, "PARLEY_RATE_LIMIT_WINDOW_SECS", &mut config.rate_limit.window_secs)?;

    Ok(())
}

/// Resolve the provider bearer token from the variable named in the config.
pub fn resolve_api_key<F>(config: &InferenceConfig, env: F) -> Result<SecretString, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(&env, &config.api_key_env)
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingSecret(config.api_key_env.clone()))
}

/// Non-empty, trimmed value of `var`.
fn lookup<F>(env: &F, var: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    env(var)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn set_parsed<F, T>(env: &F, var: &str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(env, var) {
        *target = raw.parse().map_err(|_| ConfigError::InvalidOverride {
            var: var.to_string(),
            value: raw.clone(),
        })?;
    }
    Ok(())
}
