//! Unified error types for the poller.

use std::fmt;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors raised while loading or validating poller configuration.
///
/// These are construction-time failures and are never retried.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    /// The endpoint string could not be repaired into an absolute URL.
    InvalidEndpoint(String),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Toml(e) => write!(f, "toml: {e}"),
            Self::InvalidEndpoint(url) => write!(f, "invalid endpoint url: {url}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(e)
    }
}

// ---------------------------------------------------------------------------
// TransportError
// ---------------------------------------------------------------------------

/// Coarse classification of a failed send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Redirect,
    Request,
    Body,
    /// The request could not be assembled (bad method, header, ...).
    Builder,
}

/// Error from one physical send attempt.
#[derive(Debug, Clone)]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    /// Builder failures repeat identically on every attempt.
    pub fn is_retryable(&self) -> bool {
        self.kind != TransportErrorKind::Builder
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Redirect => "redirect",
            TransportErrorKind::Request => "request",
            TransportErrorKind::Body => "body",
            TransportErrorKind::Builder => "builder",
        };
        write!(f, "{label}: {}", self.message)
    }
}

impl std::error::Error for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_builder() {
            TransportErrorKind::Builder
        } else if e.is_timeout() {
            TransportErrorKind::Timeout
        } else if e.is_connect() {
            TransportErrorKind::Connect
        } else if e.is_redirect() {
            TransportErrorKind::Redirect
        } else if e.is_body() || e.is_decode() {
            TransportErrorKind::Body
        } else {
            TransportErrorKind::Request
        };
        Self::new(kind, e.to_string())
    }
}

// ---------------------------------------------------------------------------
// DecodeError
// ---------------------------------------------------------------------------

/// Malformed response content. Retrying the request will not fix it.
#[derive(Debug)]
pub enum DecodeError {
    Json(serde_json::Error),
    /// A line-delimited payload had a bad line (1-based).
    Line {
        line: usize,
        source: serde_json::Error,
    },
    NotAnArray,
    NotAnObject {
        index: usize,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(e) => write!(f, "json: {e}"),
            Self::Line { line, source } => write!(f, "json line {line}: {source}"),
            Self::NotAnArray => write!(f, "expected a JSON array of objects"),
            Self::NotAnObject { index } => write!(f, "record {index} is not a JSON object"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

// ---------------------------------------------------------------------------
// GeneratorError
// ---------------------------------------------------------------------------

/// Failure reported by a caller-supplied query-parameter generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorError(pub String);

impl GeneratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for GeneratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query generator: {}", self.0)
    }
}

impl std::error::Error for GeneratorError {}

// ---------------------------------------------------------------------------
// CycleFailure
// ---------------------------------------------------------------------------

/// Why one poll cycle produced no usable response.
#[derive(Debug)]
pub enum CycleFailure {
    /// Every attempt allowed in the cycle failed.
    Exhausted {
        attempts: u32,
        status: Option<u16>,
        reason: String,
    },
    /// The request could not be sent at all.
    Fatal(String),
    Decode(DecodeError),
    Generator(GeneratorError),
}

impl fmt::Display for CycleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted {
                attempts,
                status: Some(code),
                reason,
            } => write!(f, "gave up after {attempts} attempt(s), status {code}: {reason}"),
            Self::Exhausted {
                attempts,
                status: None,
                reason,
            } => write!(f, "gave up after {attempts} attempt(s): {reason}"),
            Self::Fatal(msg) => write!(f, "request failed: {msg}"),
            Self::Decode(e) => write!(f, "decode: {e}"),
            Self::Generator(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CycleFailure {}

impl From<DecodeError> for CycleFailure {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

impl From<GeneratorError> for CycleFailure {
    fn from(e: GeneratorError) -> Self {
        Self::Generator(e)
    }
}

// ---------------------------------------------------------------------------
// PollError
// ---------------------------------------------------------------------------

/// Terminal failure of a polling run.
#[derive(Debug)]
pub enum PollError {
    /// The consecutive-failure counter went past the configured maximum.
    MaxErrorsExceeded { failures: u32, last: CycleFailure },
    /// The poller already reached a terminal state.
    NotPolling,
}

impl fmt::Display for PollError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxErrorsExceeded { failures, last } => write!(
                f,
                "max errors exceeded after {failures} consecutive failed cycles; last: {last}"
            ),
            Self::NotPolling => write!(f, "poller is no longer polling"),
        }
    }
}

impl std::error::Error for PollError {}
