//! Environment overrides.
//!
//! `RESTPOLL_*` variables sit above every config file and below CLI flags.

use crate::error::ConfigError;

use super::Config;

pub(super) const ENV_URL: &str = "RESTPOLL_URL";
pub(super) const ENV_METHOD: &str = "RESTPOLL_METHOD";
pub(super) const ENV_SLEEP_TIME_SECS: &str = "RESTPOLL_SLEEP_TIME_SECS";
pub(super) const ENV_ERROR_SLEEP_TIME_SECS: &str = "RESTPOLL_ERROR_SLEEP_TIME_SECS";
pub(super) const ENV_REQUEST_TIMEOUT_SECS: &str = "RESTPOLL_REQUEST_TIMEOUT_SECS";
pub(super) const ENV_MAX_RETRIES: &str = "RESTPOLL_MAX_RETRIES";
pub(super) const ENV_MAX_ERRORS: &str = "RESTPOLL_MAX_ERRORS";
pub(super) const ENV_BEARER_TOKEN: &str = "RESTPOLL_BEARER_TOKEN";

pub(super) fn apply_runtime_env_overrides<FEnv>(
    config: &mut Config,
    env_lookup: &FEnv,
) -> Result<(), ConfigError>
where
    FEnv: Fn(&str) -> Option<String>,
{
    if let Some(url) = non_blank(env_lookup, ENV_URL) {
        config.endpoint.url = url;
    }
    if let Some(method) = non_blank(env_lookup, ENV_METHOD) {
        config.endpoint.method = method;
    }
    if let Some(raw) = non_blank(env_lookup, ENV_REQUEST_TIMEOUT_SECS) {
        config.endpoint.request_timeout_secs = parse_secs(ENV_REQUEST_TIMEOUT_SECS, &raw)?;
    }
    if let Some(raw) = non_blank(env_lookup, ENV_SLEEP_TIME_SECS) {
        config.retry.sleep_time_secs = parse_secs(ENV_SLEEP_TIME_SECS, &raw)?;
    }
    if let Some(raw) = non_blank(env_lookup, ENV_ERROR_SLEEP_TIME_SECS) {
        config.retry.error_sleep_time_secs = parse_secs(ENV_ERROR_SLEEP_TIME_SECS, &raw)?;
    }
    if let Some(raw) = non_blank(env_lookup, ENV_MAX_RETRIES) {
        config.retry.max_retries = parse_count(ENV_MAX_RETRIES, &raw)?;
    }
    if let Some(raw) = non_blank(env_lookup, ENV_MAX_ERRORS) {
        config.retry.max_errors = parse_count(ENV_MAX_ERRORS, &raw)?;
    }
    Ok(())
}

/// Bearer token from `RESTPOLL_BEARER_TOKEN`, if set.
pub(super) fn bearer_token_override_with<FEnv>(env_lookup: &FEnv) -> Option<String>
where
    FEnv: Fn(&str) -> Option<String>,
{
    non_blank(env_lookup, ENV_BEARER_TOKEN)
}

fn non_blank<FEnv>(env_lookup: &FEnv, name: &str) -> Option<String>
where
    FEnv: Fn(&str) -> Option<String>,
{
    env_lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

// Range checks happen when the config resolves into a RetryPolicy.
fn parse_secs(name: &str, raw: &str) -> Result<f64, ConfigError> {
    raw.parse::<f64>().map_err(|_| {
        ConfigError::Invalid(format!(
            "invalid {name} value `{raw}`: expected seconds as a number"
        ))
    })
}

fn parse_count(name: &str, raw: &str) -> Result<i64, ConfigError> {
    raw.parse::<i64>().map_err(|_| {
        ConfigError::Invalid(format!("invalid {name} value `{raw}`: expected an integer"))
    })
}
