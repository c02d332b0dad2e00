//! Default configuration constants.
//!
//! File-config defaults mirror the library defaults so an empty
//! `restpoll.toml` behaves exactly like the builder APIs.

use crate::request::{DEFAULT_ACCEPT_STATUS, DEFAULT_METHOD as REQUEST_DEFAULT_METHOD};
use crate::transport;

/// Config file name searched locally and under the config root.
pub(super) const CONFIG_FILE_NAME: &str = "restpoll.toml";
/// Directory under `$XDG_CONFIG_HOME` holding the global config.
pub(super) const CONFIG_DIR_NAME: &str = "restpoll";

pub(super) const DEFAULT_METHOD: &str = REQUEST_DEFAULT_METHOD;
pub(super) const DEFAULT_REQUEST_TIMEOUT_SECS: f64 = 30.0;
pub(super) const DEFAULT_ACCEPT_STATUS_CODES: &[u16] = &[DEFAULT_ACCEPT_STATUS];
pub(super) const DEFAULT_SLEEP_TIME_SECS: f64 = transport::DEFAULT_SLEEP_TIME_SECS;
pub(super) const DEFAULT_ERROR_SLEEP_TIME_SECS: f64 = transport::DEFAULT_ERROR_SLEEP_TIME_SECS;
pub(super) const DEFAULT_MAX_RETRIES: i64 = transport::DEFAULT_MAX_RETRIES as i64;
pub(super) const DEFAULT_MAX_ERRORS: i64 = transport::DEFAULT_MAX_ERRORS as i64;
