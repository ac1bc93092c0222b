pub mod config;
pub mod decide;
pub mod run;

use escalation_core::{Config, ConfigError};
use std::path::Path;

/// Resolve configuration from `--config` if given, otherwise the environment.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::from_env(),
    }
}
