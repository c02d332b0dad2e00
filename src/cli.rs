//! CLI argument parsing via clap.

use clap::Parser;
use restpoll::config::Config;

/// Poll a REST endpoint and print every returned record as one JSON line.
#[derive(Debug, Parser)]
#[command(name = "restpoll", version)]
pub struct Args {
    /// Endpoint URL. A missing scheme defaults to http://.
    pub url: Option<String>,

    /// Path to config file (default: ./restpoll.toml or ~/.config/restpoll/restpoll.toml).
    #[arg(short = 'c', long = "config")]
    pub config: Option<String>,

    /// HTTP method (default: GET).
    #[arg(long = "method")]
    pub method: Option<String>,

    /// Extra request header as `Name: value`. Repeatable.
    #[arg(long = "header", value_name = "K:V", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Static query parameter as `key=value`. Repeatable.
    #[arg(long = "query", value_name = "K=V", value_parser = parse_query)]
    pub query: Vec<(String, String)>,

    /// Expect one JSON object per line instead of a JSON array.
    #[arg(long = "lines")]
    pub lines: bool,

    /// Seconds to wait between poll cycles.
    #[arg(long = "sleep-time", value_name = "SECS")]
    pub sleep_time: Option<f64>,

    /// Base seconds for exponential backoff between attempts.
    #[arg(long = "error-sleep-time", value_name = "SECS")]
    pub error_sleep_time: Option<f64>,

    /// Retries per cycle after the first attempt.
    #[arg(long = "max-retries", value_name = "N", allow_negative_numbers = true)]
    pub max_retries: Option<i64>,

    /// Consecutive failed cycles tolerated before giving up.
    #[arg(long = "max-errors", value_name = "N", allow_negative_numbers = true)]
    pub max_errors: Option<i64>,

    /// Status code counted as success. Repeatable; replaces the default set.
    #[arg(long = "accept-status", value_name = "CODE")]
    pub accept_status: Vec<u16>,

    /// Ignore `Retry-After` and always use computed backoff.
    #[arg(long = "no-retry-after")]
    pub no_retry_after: bool,

    /// Per-request timeout in seconds.
    #[arg(long = "timeout", value_name = "SECS")]
    pub timeout: Option<f64>,
}

impl Args {
    /// Layer CLI flags over a loaded config. Flags always win.
    pub fn apply_to(&self, config: &mut Config) {
        let endpoint = &mut config.endpoint;
        if let Some(url) = &self.url {
            endpoint.url = url.clone();
        }
        if let Some(method) = &self.method {
            endpoint.method = method.clone();
        }
        endpoint.headers.extend(self.headers.iter().cloned());
        endpoint.query.extend(self.query.iter().cloned());
        if self.lines {
            endpoint.lines = true;
        }
        if !self.accept_status.is_empty() {
            endpoint.accept_status_codes = self.accept_status.clone();
        }
        if let Some(secs) = self.timeout {
            endpoint.request_timeout_secs = secs;
        }

        let retry = &mut config.retry;
        if let Some(secs) = self.sleep_time {
            retry.sleep_time_secs = secs;
        }
        if let Some(secs) = self.error_sleep_time {
            retry.error_sleep_time_secs = secs;
        }
        if let Some(n) = self.max_retries {
            retry.max_retries = n;
        }
        if let Some(n) = self.max_errors {
            retry.max_errors = n;
        }
        if self.no_retry_after {
            retry.respect_retry_after = false;
        }
    }
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected `Name: value`, got `{raw}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("header name is empty in `{raw}`"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn parse_query(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected `key=value`, got `{raw}`"))?;
    if key.is_empty() {
        return Err(format!("query key is empty in `{raw}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::Args;
    use clap::Parser;
    use restpoll::config::Config;

    #[test]
    fn url_and_repeatable_flags_parse() {
        let args = Args::parse_from([
            "restpoll",
            "example.com/api",
            "--header",
            "Accept: application/json",
            "--header",
            "X-Trace:abc",
            "--query",
            "since=0",
            "--accept-status",
            "200",
            "--accept-status",
            "204",
        ]);
        assert_eq!(args.url.as_deref(), Some("example.com/api"));
        assert_eq!(
            args.headers,
            vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("X-Trace".to_string(), "abc".to_string()),
            ]
        );
        assert_eq!(args.query, vec![("since".to_string(), "0".to_string())]);
        assert_eq!(args.accept_status, vec![200, 204]);
    }

    #[test]
    fn malformed_header_is_rejected() {
        assert!(Args::try_parse_from(["restpoll", "--header", "no-colon"]).is_err());
        assert!(Args::try_parse_from(["restpoll", "--query", "=1"]).is_err());
    }

    #[test]
    fn negative_counts_reach_validation() {
        let args = Args::parse_from(["restpoll", "--max-retries", "-1"]);
        assert_eq!(args.max_retries, Some(-1));
        let mut config = Config::default();
        config.endpoint.url = "http://example.com".into();
        args.apply_to(&mut config);
        assert!(config.retry_policy().is_err());
    }

    #[test]
    fn flags_override_loaded_config() {
        let mut config = Config::default();
        config.endpoint.url = "http://file.example/feed".into();
        config.endpoint.accept_status_codes = vec![200];
        config.retry.max_errors = 3;

        let args = Args::parse_from([
            "restpoll",
            "http://cli.example/feed",
            "--lines",
            "--sleep-time",
            "0",
            "--max-errors",
            "5",
            "--no-retry-after",
            "--accept-status",
            "202",
            "--timeout",
            "2.5",
        ]);
        args.apply_to(&mut config);

        assert_eq!(config.endpoint.url, "http://cli.example/feed");
        assert!(config.endpoint.lines);
        assert_eq!(config.endpoint.accept_status_codes, vec![202]);
        assert_eq!(config.endpoint.request_timeout_secs, 2.5);
        assert_eq!(config.retry.sleep_time_secs, 0.0);
        assert_eq!(config.retry.max_errors, 5);
        assert!(!config.retry.respect_retry_after);
    }

    #[test]
    fn absent_flags_leave_config_untouched() {
        let mut config = Config::default();
        config.endpoint.url = "http://file.example/feed".into();
        config.retry.max_errors = 3;
        Args::parse_from(["restpoll"]).apply_to(&mut config);
        assert_eq!(config.endpoint.url, "http://file.example/feed");
        assert_eq!(config.retry.max_errors, 3);
        assert!(config.retry.respect_retry_after);
    }
}
