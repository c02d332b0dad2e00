//! Retry policy and backoff state for the polling transport.

use std::time::{Duration, SystemTime};

use reqwest::header::{HeaderMap, RETRY_AFTER};

use crate::error::ConfigError;

pub const DEFAULT_SLEEP_TIME_SECS: f64 = 0.1;
pub const DEFAULT_ERROR_SLEEP_TIME_SECS: f64 = 0.1;
pub const DEFAULT_MAX_RETRIES: u32 = 10;
pub const DEFAULT_MAX_ERRORS: u32 = 10;

/// Pacing, backoff and failure-tolerance settings for one poller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Idle delay between cycles.
    sleep_time: Duration,
    /// Base delay for exponential backoff between attempts.
    error_sleep_time: Duration,
    /// Prefer the server's `Retry-After` over computed backoff.
    respect_retry_after: bool,
    /// Extra attempts per cycle after the first one.
    max_retries: u32,
    /// Consecutive failed cycles tolerated before aborting.
    max_errors: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            sleep_time: Duration::from_secs_f64(DEFAULT_SLEEP_TIME_SECS),
            error_sleep_time: Duration::from_secs_f64(DEFAULT_ERROR_SLEEP_TIME_SECS),
            respect_retry_after: true,
            max_retries: DEFAULT_MAX_RETRIES,
            max_errors: DEFAULT_MAX_ERRORS,
        }
    }
}

impl RetryPolicy {
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    pub fn sleep_time(&self) -> Duration {
        self.sleep_time
    }

    pub fn error_sleep_time(&self) -> Duration {
        self.error_sleep_time
    }

    pub fn respect_retry_after(&self) -> bool {
        self.respect_retry_after
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn max_errors(&self) -> u32 {
        self.max_errors
    }

    /// Upper bound on physical sends within one cycle.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Fresh backoff state for one cycle.
    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.error_sleep_time)
    }
}

/// Unvalidated retry settings, checked by [`RetryPolicyBuilder::build`].
#[derive(Clone, Debug)]
pub struct RetryPolicyBuilder {
    sleep_time_secs: f64,
    error_sleep_time_secs: f64,
    respect_retry_after: bool,
    max_retries: i64,
    max_errors: i64,
}

impl Default for RetryPolicyBuilder {
    fn default() -> Self {
        Self {
            sleep_time_secs: DEFAULT_SLEEP_TIME_SECS,
            error_sleep_time_secs: DEFAULT_ERROR_SLEEP_TIME_SECS,
            respect_retry_after: true,
            max_retries: i64::from(DEFAULT_MAX_RETRIES),
            max_errors: i64::from(DEFAULT_MAX_ERRORS),
        }
    }
}

impl RetryPolicyBuilder {
    pub fn sleep_time_secs(mut self, secs: f64) -> Self {
        self.sleep_time_secs = secs;
        self
    }

    pub fn sleep_time(self, delay: Duration) -> Self {
        self.sleep_time_secs(delay.as_secs_f64())
    }

    pub fn error_sleep_time_secs(mut self, secs: f64) -> Self {
        self.error_sleep_time_secs = secs;
        self
    }

    pub fn error_sleep_time(self, delay: Duration) -> Self {
        self.error_sleep_time_secs(delay.as_secs_f64())
    }

    pub fn respect_retry_after(mut self, respect: bool) -> Self {
        self.respect_retry_after = respect;
        self
    }

    pub fn max_retries(mut self, retries: i64) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn max_errors(mut self, errors: i64) -> Self {
        self.max_errors = errors;
        self
    }

    pub fn build(self) -> Result<RetryPolicy, ConfigError> {
        Ok(RetryPolicy {
            sleep_time: non_negative_secs("sleep_time", self.sleep_time_secs)?,
            error_sleep_time: non_negative_secs("error_sleep_time", self.error_sleep_time_secs)?,
            respect_retry_after: self.respect_retry_after,
            max_retries: non_negative_count("max_retries", self.max_retries)?,
            max_errors: non_negative_count("max_errors", self.max_errors)?,
        })
    }
}

fn non_negative_secs(field: &str, secs: f64) -> Result<Duration, ConfigError> {
    if secs.is_nan() || secs < 0.0 {
        return Err(ConfigError::Invalid(format!("{field} must be >= 0, got {secs}")));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|_| ConfigError::Invalid(format!("{field} is out of range: {secs}")))
}

fn non_negative_count(field: &str, value: i64) -> Result<u32, ConfigError> {
    u32::try_from(value).map_err(|_| {
        ConfigError::Invalid(format!(
            "{field} must be between 0 and {}, got {value}",
            u32::MAX
        ))
    })
}

/// Exponential backoff state for the attempts of a single cycle.
///
/// The k-th retry waits `base * 2^k`. There is no ceiling: the attempt limit
/// is what bounds the total wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    retries: u32,
}

impl Backoff {
    pub fn new(base: Duration) -> Self {
        Self { base, retries: 0 }
    }

    /// Retries scheduled so far.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Delay before the next attempt. A server hint wins over the computed
    /// value; either way the exponent advances.
    pub fn next_delay(&mut self, hint: Option<Duration>) -> Duration {
        let computed = exponential_delay(self.base, self.retries);
        self.retries = self.retries.saturating_add(1);
        hint.unwrap_or(computed)
    }
}

/// `base * 2^exponent`, saturating at `Duration::MAX`.
pub fn exponential_delay(base: Duration, exponent: u32) -> Duration {
    match 1u32.checked_shl(exponent) {
        Some(factor) => base.saturating_mul(factor),
        None if base.is_zero() => Duration::ZERO,
        None => Duration::MAX,
    }
}

/// Read a `Retry-After` header (delta-seconds or HTTP-date) relative to `now`.
pub fn retry_after_hint(headers: &HeaderMap, now: SystemTime) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(seconds) = raw.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let at = httpdate::parse_http_date(raw).ok()?;
    // A date in the past means "retry now".
    Some(at.duration_since(now).unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers_with_retry_after(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_str(value).expect("header"));
        headers
    }

    #[test]
    fn defaults_match_documented_values() {
        let policy = RetryPolicy::builder().build().expect("defaults are valid");
        assert_eq!(policy, RetryPolicy::default());
        assert_eq!(policy.sleep_time(), Duration::from_millis(100));
        assert_eq!(policy.error_sleep_time(), Duration::from_millis(100));
        assert!(policy.respect_retry_after());
        assert_eq!(policy.max_retries(), 10);
        assert_eq!(policy.max_errors(), 10);
        assert_eq!(policy.max_attempts(), 11);
    }

    #[test]
    fn builder_reflects_supplied_values() {
        let policy = RetryPolicy::builder()
            .sleep_time_secs(0.0)
            .error_sleep_time(Duration::from_millis(250))
            .respect_retry_after(false)
            .max_retries(0)
            .max_errors(3)
            .build()
            .expect("valid");
        assert_eq!(policy.sleep_time(), Duration::ZERO);
        assert_eq!(policy.error_sleep_time(), Duration::from_millis(250));
        assert!(!policy.respect_retry_after());
        assert_eq!(policy.max_attempts(), 1, "zero retries means one attempt");
        assert_eq!(policy.max_errors(), 3);
    }

    #[test]
    fn negative_or_nan_values_are_rejected() {
        assert!(RetryPolicy::builder().sleep_time_secs(-0.1).build().is_err());
        assert!(RetryPolicy::builder()
            .error_sleep_time_secs(-1.0)
            .build()
            .is_err());
        assert!(RetryPolicy::builder()
            .sleep_time_secs(f64::NAN)
            .build()
            .is_err());
        assert!(RetryPolicy::builder().max_retries(-1).build().is_err());
        assert!(RetryPolicy::builder().max_errors(-5).build().is_err());
    }

    #[test]
    fn backoff_doubles_from_base() {
        let mut backoff = RetryPolicy::default().backoff();
        let delays: Vec<Duration> = (0..4).map(|_| backoff.next_delay(None)).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(800),
            ]
        );
        assert_eq!(backoff.retries(), 4);
    }

    #[test]
    fn server_hint_overrides_computed_delay() {
        let mut backoff = Backoff::new(Duration::from_millis(100));
        assert_eq!(
            backoff.next_delay(Some(Duration::from_secs(5))),
            Duration::from_secs(5)
        );
        // The exponent still advanced past the hinted retry.
        assert_eq!(backoff.next_delay(None), Duration::from_millis(200));
    }

    #[test]
    fn zero_base_never_waits() {
        let mut backoff = Backoff::new(Duration::ZERO);
        for _ in 0..40 {
            assert_eq!(backoff.next_delay(None), Duration::ZERO);
        }
    }

    #[test]
    fn large_exponents_saturate_instead_of_overflowing() {
        assert_eq!(exponential_delay(Duration::from_secs(1), 40), Duration::MAX);
        assert_eq!(
            exponential_delay(Duration::from_secs(u64::MAX / 2), 4),
            Duration::MAX
        );
    }

    #[test]
    fn retry_after_seconds_are_parsed() {
        let headers = headers_with_retry_after("5");
        assert_eq!(
            retry_after_hint(&headers, SystemTime::now()),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn retry_after_http_date_is_relative_to_now() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let later = now + Duration::from_secs(30);
        let headers = headers_with_retry_after(&httpdate::fmt_http_date(later));
        assert_eq!(retry_after_hint(&headers, now), Some(Duration::from_secs(30)));

        let earlier = now - Duration::from_secs(30);
        let headers = headers_with_retry_after(&httpdate::fmt_http_date(earlier));
        assert_eq!(retry_after_hint(&headers, now), Some(Duration::ZERO));
    }

    #[test]
    fn garbage_retry_after_is_ignored() {
        let headers = headers_with_retry_after("soon-ish");
        assert_eq!(retry_after_hint(&headers, SystemTime::now()), None);
        assert_eq!(retry_after_hint(&HeaderMap::new(), SystemTime::now()), None);
    }

    #[cfg(feature = "fuzz-tests")]
    mod fuzz {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn each_delay_doubles_the_previous(base_ms in 1u64..1_000, steps in 1usize..20) {
                let mut backoff = Backoff::new(Duration::from_millis(base_ms));
                let mut previous = backoff.next_delay(None);
                prop_assert_eq!(previous, Duration::from_millis(base_ms));
                for _ in 0..steps {
                    let next = backoff.next_delay(None);
                    prop_assert_eq!(next, previous * 2);
                    previous = next;
                }
            }
        }
    }
}
