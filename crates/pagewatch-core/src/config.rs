use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; pagewatch/0.1; +https://github.com/pagewatch/pagewatch)";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("PAGEWATCH_ENV", "development"))?;

    let bind_addr = parse_addr("PAGEWATCH_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("PAGEWATCH_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("PAGEWATCH_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("PAGEWATCH_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("PAGEWATCH_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let max_resources = or_default("PAGEWATCH_MAX_RESOURCES", "50")
        .parse::<i64>()
        .map_err(|e| invalid("PAGEWATCH_MAX_RESOURCES", e.to_string()))?;
    if max_resources < 1 {
        return Err(invalid(
            "PAGEWATCH_MAX_RESOURCES",
            "must be at least 1".to_string(),
        ));
    }

    let fetch_timeout_secs = parse_u64("PAGEWATCH_FETCH_TIMEOUT_SECS", "15")?;
    let user_agent = or_default("PAGEWATCH_USER_AGENT", DEFAULT_USER_AGENT);
    let check_budget_secs = parse_u64("PAGEWATCH_CHECK_BUDGET_SECS", "60")?;

    let summarizer_api_key = lookup("PAGEWATCH_SUMMARIZER_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty());
    let summarizer_base_url = or_default(
        "PAGEWATCH_SUMMARIZER_BASE_URL",
        "https://api.openai.com/v1/",
    );
    let summarizer_model = or_default("PAGEWATCH_SUMMARIZER_MODEL", "gpt-4o-mini");
    let summarizer_timeout_secs = parse_u64("PAGEWATCH_SUMMARIZER_TIMEOUT_SECS", "25")?;
    let summarizer_max_retries = parse_u32("PAGEWATCH_SUMMARIZER_MAX_RETRIES", "2")?;

    let check_rate_limit = parse_usize("PAGEWATCH_CHECK_RATE_LIMIT", "10")?;
    let check_rate_window_secs = parse_u64("PAGEWATCH_CHECK_RATE_WINDOW_SECS", "60")?;

    if fetch_timeout_secs.saturating_add(summarizer_timeout_secs) >= check_budget_secs {
        return Err(ConfigError::Validation(format!(
            "fetch timeout ({fetch_timeout_secs}s) plus summarizer timeout \
             ({summarizer_timeout_secs}s) must be less than the check budget \
             ({check_budget_secs}s)"
        )));
    }

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        max_resources,
        fetch_timeout_secs,
        user_agent,
        check_budget_secs,
        summarizer_api_key,
        summarizer_base_url,
        summarizer_model,
        summarizer_timeout_secs,
        summarizer_max_retries,
        check_rate_limit,
        check_rate_window_secs,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PAGEWATCH_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
