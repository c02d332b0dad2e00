//! Configuration data model.
//!
//! This module holds struct definitions plus default values. Loading and
//! source precedence live in `loader`/`sources`/`env`; turning these raw
//! values into validated runtime types lives in `resolve`.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::defaults::{
    DEFAULT_ACCEPT_STATUS_CODES, DEFAULT_ERROR_SLEEP_TIME_SECS, DEFAULT_MAX_ERRORS,
    DEFAULT_MAX_RETRIES, DEFAULT_METHOD, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SLEEP_TIME_SECS,
};

/// Top-level poller configuration as read from `restpoll.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub endpoint: EndpointSection,
    pub retry: RetrySection,
}

/// `[endpoint]`: what to poll and how to read the response.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointSection {
    pub url: String,
    pub method: String,
    /// Empty means `Content-Type: application/json`.
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub request_timeout_secs: f64,
    /// Line-delimited JSON objects instead of a single array.
    pub lines: bool,
    pub accept_status_codes: Vec<u16>,
    /// Optional JSON request body.
    pub body: Option<Value>,
    pub bearer_token: Option<String>,
    /// Env var that holds the bearer token.
    pub bearer_token_env: Option<String>,
    pub basic_auth_user: Option<String>,
    pub basic_auth_password: Option<String>,
}

impl Default for EndpointSection {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: DEFAULT_METHOD.to_string(),
            headers: BTreeMap::new(),
            query: BTreeMap::new(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            lines: false,
            accept_status_codes: DEFAULT_ACCEPT_STATUS_CODES.to_vec(),
            body: None,
            bearer_token: None,
            bearer_token_env: None,
            basic_auth_user: None,
            basic_auth_password: None,
        }
    }
}

/// `[retry]`: pacing, backoff and failure tolerance.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    /// Idle delay between cycles; 0 disables pacing.
    pub sleep_time_secs: f64,
    /// Base of the exponential backoff between attempts.
    pub error_sleep_time_secs: f64,
    pub respect_retry_after: bool,
    pub max_retries: i64,
    pub max_errors: i64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            sleep_time_secs: DEFAULT_SLEEP_TIME_SECS,
            error_sleep_time_secs: DEFAULT_ERROR_SLEEP_TIME_SECS,
            respect_retry_after: true,
            max_retries: DEFAULT_MAX_RETRIES,
            max_errors: DEFAULT_MAX_ERRORS,
        }
    }
}

/// Diagnostics captured while resolving runtime configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigDiagnostics {
    /// Non-fatal problems worth surfacing to the operator.
    pub warnings: Vec<String>,
}

/// Configuration payload plus load-time diagnostics.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub diagnostics: ConfigDiagnostics,
}
