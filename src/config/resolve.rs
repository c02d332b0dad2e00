//! Raw config to validated runtime types.

use std::time::Duration;

use crate::decode::BodyFormat;
use crate::error::ConfigError;
use crate::request::{BasicAuth, EndpointConfig, RequestOptions};
use crate::transport::RetryPolicy;

use super::{Config, ConfigDiagnostics, EndpointSection};

impl Config {
    /// Validate `[endpoint]` into an [`EndpointConfig`].
    pub fn endpoint_config(&self) -> Result<EndpointConfig, ConfigError> {
        let section = &self.endpoint;
        if section.url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "no endpoint url configured (set endpoint.url, RESTPOLL_URL or pass URL)"
                    .to_string(),
            ));
        }

        let mut builder = EndpointConfig::builder(section.url.as_str())
            .method(section.method.as_str())
            .headers(section.headers.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .request_timeout(timeout_from_secs(section.request_timeout_secs)?)
            .options(request_options(section))
            .format(if section.lines {
                BodyFormat::Lines
            } else {
                BodyFormat::Array
            })
            .accept_status_codes(section.accept_status_codes.iter().copied());
        if !section.query.is_empty() {
            builder =
                builder.query_params(section.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        builder.build()
    }

    /// Validate `[retry]` into a [`RetryPolicy`].
    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        let section = &self.retry;
        RetryPolicy::builder()
            .sleep_time_secs(section.sleep_time_secs)
            .error_sleep_time_secs(section.error_sleep_time_secs)
            .respect_retry_after(section.respect_retry_after)
            .max_retries(section.max_retries)
            .max_errors(section.max_errors)
            .build()
    }
}

fn timeout_from_secs(secs: f64) -> Result<Duration, ConfigError> {
    if secs.is_nan() || secs <= 0.0 {
        return Err(ConfigError::Invalid(format!(
            "endpoint.request_timeout_secs must be greater than zero (got {secs})"
        )));
    }
    Duration::try_from_secs_f64(secs).map_err(|_| {
        ConfigError::Invalid(format!(
            "endpoint.request_timeout_secs `{secs}` is out of range"
        ))
    })
}

fn request_options(section: &EndpointSection) -> RequestOptions {
    RequestOptions {
        body: section.body.clone(),
        bearer_token: normalized_option(&section.bearer_token),
        basic_auth: normalized_option(&section.basic_auth_user).map(|username| BasicAuth {
            username,
            password: section.basic_auth_password.clone(),
        }),
    }
}

/// Settle `endpoint.bearer_token` from its possible sources.
///
/// Order: `RESTPOLL_BEARER_TOKEN`, then `bearer_token_env`, then the inline
/// value. Inline and `bearer_token_env` are mutually exclusive.
pub(super) fn resolve_bearer_token<FEnv>(
    section: &mut EndpointSection,
    token_override: Option<String>,
    env_lookup: &FEnv,
    diagnostics: &mut ConfigDiagnostics,
) -> Result<(), ConfigError>
where
    FEnv: Fn(&str) -> Option<String>,
{
    let inline = normalized_option(&section.bearer_token);
    let env_name = normalized_option(&section.bearer_token_env);
    if inline.is_some() && env_name.is_some() {
        return Err(ConfigError::Invalid(
            "only one of endpoint.bearer_token and endpoint.bearer_token_env may be set"
                .to_string(),
        ));
    }

    if let Some(token) = token_override {
        section.bearer_token = Some(token);
        return Ok(());
    }

    if let Some(name) = env_name {
        let token = env_lookup(&name).and_then(|value| normalized_string(&value));
        if token.is_none() {
            diagnostics.warnings.push(format!(
                "endpoint.bearer_token_env names `{name}`, which is unset or empty; sending no token"
            ));
        }
        section.bearer_token = token;
        return Ok(());
    }

    if inline.is_some() {
        diagnostics.warnings.push(
            "endpoint.bearer_token is stored inline; prefer endpoint.bearer_token_env".to_string(),
        );
    }
    section.bearer_token = inline;
    Ok(())
}

pub(super) fn normalized_option(value: &Option<String>) -> Option<String> {
    value.as_deref().and_then(normalized_string)
}

pub(super) fn normalized_string(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
