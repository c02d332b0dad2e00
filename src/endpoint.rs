//! Endpoint URL validation and repair.

use reqwest::Url;

use crate::error::ConfigError;

/// Scheme assumed when the caller leaves it off.
const DEFAULT_SCHEME: &str = "http://";

/// Schemes the transport can poll.
const SUPPORTED_SCHEMES: &[&str] = &["http", "https"];

/// A validated absolute endpoint URL.
///
/// The URL is kept in canonical WHATWG form: scheme and host are lowercased,
/// default ports and dot segments are dropped, and an empty path becomes `/`.
/// The request target is the same as the input's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    pub url: Url,
    /// True when `http://` had to be prepended to make the input parse.
    pub scheme_added: bool,
}

impl NormalizedUrl {
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

/// Accept `raw` when it has an http(s) scheme and a host, otherwise retry
/// with `http://` prepended. Other schemes with a host are rejected.
pub fn normalize_url(raw: &str) -> Result<NormalizedUrl, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidEndpoint(raw.to_string()));
    }

    if let Some(url) = parse_absolute(trimmed) {
        if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
            return Err(ConfigError::InvalidEndpoint(raw.to_string()));
        }
        return Ok(NormalizedUrl {
            url,
            scheme_added: false,
        });
    }

    // Bare `host:port` parses with the host as the scheme, so it lands here too.
    let repaired = format!("{DEFAULT_SCHEME}{trimmed}");
    match parse_absolute(&repaired) {
        Some(url) => {
            tracing::warn!(url = %url, "no protocol scheme provided in URL, using {DEFAULT_SCHEME}");
            Ok(NormalizedUrl {
                url,
                scheme_added: true,
            })
        }
        None => Err(ConfigError::InvalidEndpoint(raw.to_string())),
    }
}

fn parse_absolute(candidate: &str) -> Option<Url> {
    let url = Url::parse(candidate).ok()?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Some(url),
        _ => None,
    }
}
