//! Configuration loading from TOML files and environment variables.
//!
//! Config is loaded in this order of precedence (highest wins):
//! 1. CLI flags (applied by the binary after loading)
//! 2. Environment variables (`RESTPOLL_URL`, `RESTPOLL_MAX_ERRORS`, ...)
//! 3. TOML file specified via --config CLI flag
//! 4. ./restpoll.toml in the current directory
//! 5. $XDG_CONFIG_HOME/restpoll/restpoll.toml (or ~/.config/restpoll/restpoll.toml)
//! 6. Built-in defaults

mod defaults;
mod env;
mod loader;
mod resolve;
mod sources;
mod types;

pub use loader::load_config_with_diagnostics;
pub use sources::{config_root_dir, ConfigSource};
pub use types::{Config, ConfigDiagnostics, EndpointSection, LoadedConfig, RetrySection};
