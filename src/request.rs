//! Endpoint configuration and per-cycle request assembly.
//!
//! Nothing in this module performs I/O: `EndpointConfig::build_request`
//! resolves query parameters and returns a plain [`RequestSpec`] that the
//! transport layer sends.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde_json::Value;

use crate::decode::BodyFormat;
use crate::endpoint::normalize_url;
use crate::error::{ConfigError, GeneratorError};

pub const DEFAULT_METHOD: &str = "GET";
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_ACCEPT_STATUS: u16 = 200;

/// Query parameters as sent on the wire, in insertion order.
pub type QueryPairs = Vec<(String, String)>;

/// Caller-supplied source of fresh query parameters, invoked once per cycle.
pub trait QueryParamGenerator: Send + Sync {
    fn generate(&self) -> Result<BTreeMap<String, String>, GeneratorError>;
}

impl<F> QueryParamGenerator for F
where
    F: Fn() -> Result<BTreeMap<String, String>, GeneratorError> + Send + Sync,
{
    fn generate(&self) -> Result<BTreeMap<String, String>, GeneratorError> {
        self()
    }
}

/// Where each cycle's query string comes from.
#[derive(Clone, Default)]
pub enum QueryParams {
    #[default]
    None,
    Static(QueryPairs),
    Generator(Arc<dyn QueryParamGenerator>),
}

impl fmt::Debug for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Static(pairs) => f.debug_tuple("Static").field(pairs).finish(),
            Self::Generator(_) => write!(f, "Generator(..)"),
        }
    }
}

/// HTTP basic credentials passed through to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: Option<String>,
}

/// Extra transport options applied to every request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// JSON request body (for POST-style polling endpoints).
    pub body: Option<Value>,
    pub bearer_token: Option<String>,
    pub basic_auth: Option<BasicAuth>,
}

/// One fully-resolved outbound request.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub query: QueryPairs,
    pub timeout: Duration,
    pub options: RequestOptions,
}

/// Immutable description of the polled endpoint.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    url: Url,
    method: Method,
    headers: HeaderMap,
    query: QueryParams,
    timeout: Duration,
    options: RequestOptions,
    format: BodyFormat,
    accept_status_codes: BTreeSet<u16>,
}

impl EndpointConfig {
    pub fn builder(url: impl Into<String>) -> EndpointConfigBuilder {
        EndpointConfigBuilder::new(url)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    pub fn format(&self) -> BodyFormat {
        self.format
    }

    pub fn accept_status_codes(&self) -> &BTreeSet<u16> {
        &self.accept_status_codes
    }

    /// Assemble the request for one poll cycle.
    pub fn build_request(&self) -> Result<RequestSpec, GeneratorError> {
        let query = match &self.query {
            QueryParams::None => Vec::new(),
            QueryParams::Static(pairs) => pairs.clone(),
            QueryParams::Generator(generator) => generator.generate()?.into_iter().collect(),
        };
        Ok(RequestSpec {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            query,
            timeout: self.timeout,
            options: self.options.clone(),
        })
    }
}

/// Collects raw construction input; `build` validates all of it at once.
#[derive(Debug, Clone)]
pub struct EndpointConfigBuilder {
    url: String,
    method: String,
    headers: Vec<(String, String)>,
    query: QueryParams,
    timeout: Duration,
    options: RequestOptions,
    format: BodyFormat,
    accept_status_codes: Vec<u16>,
}

impl EndpointConfigBuilder {
    fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: DEFAULT_METHOD.to_string(),
            headers: Vec::new(),
            query: QueryParams::None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            options: RequestOptions::default(),
            format: BodyFormat::default(),
            accept_status_codes: vec![DEFAULT_ACCEPT_STATUS],
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn query_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query = QueryParams::Static(
            params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn query_generator<G>(mut self, generator: G) -> Self
    where
        G: QueryParamGenerator + 'static,
    {
        self.query = QueryParams::Generator(Arc::new(generator));
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn format(mut self, format: BodyFormat) -> Self {
        self.format = format;
        self
    }

    pub fn accept_status_codes<I>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = u16>,
    {
        self.accept_status_codes = codes.into_iter().collect();
        self
    }

    pub fn build(self) -> Result<EndpointConfig, ConfigError> {
        let url = normalize_url(&self.url)?.url;

        let method = Method::from_bytes(self.method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| ConfigError::Invalid(format!("invalid HTTP method `{}`", self.method)))?;

        let headers = if self.headers.is_empty() {
            let mut defaults = HeaderMap::new();
            defaults.insert(CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
            defaults
        } else {
            build_header_map(&self.headers)?
        };

        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "request timeout must be greater than zero".to_string(),
            ));
        }

        if self.accept_status_codes.is_empty() {
            return Err(ConfigError::Invalid(
                "accept_status_codes must not be empty".to_string(),
            ));
        }
        if let Some(code) = self
            .accept_status_codes
            .iter()
            .find(|code| !(100..=599).contains(*code))
        {
            return Err(ConfigError::Invalid(format!(
                "accept status code {code} is not a valid HTTP status"
            )));
        }

        Ok(EndpointConfig {
            url,
            method,
            headers,
            query: self.query,
            timeout: self.timeout,
            options: self.options,
            format: self.format,
            accept_status_codes: self.accept_status_codes.into_iter().collect(),
        })
    }
}

fn build_header_map(pairs: &[(String, String)]) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let header_name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|_| ConfigError::Invalid(format!("invalid header name `{name}`")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| ConfigError::Invalid(format!("invalid value for header `{name}`")))?;
        headers.append(header_name, header_value);
    }
    Ok(headers)
}
