//! Connectivity configuration for the two data stores.
//!
//! Resolved once per invocation, either from the process environment
//! (the deployed path) or from a TOML file:
//!
//! ```toml
//! db_user = "escalator"
//! db_pass = "secret"
//! incidents_instance = "/var/lib/escalation/incidents"
//! customers_instance = "/var/lib/escalation/customers"
//! private_ip = true
//! ```
//!
//! Every required key must be present and non-blank; otherwise resolution
//! fails with [`ConfigError::MissingKey`] before any store is touched.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const ENV_DB_USER: &str = "DB_USER";
pub const ENV_DB_PASS: &str = "DB_PASS";
pub const ENV_INCIDENTS_INSTANCE: &str = "INSTANCE_CONNECTION_NAME_INCIDENTS";
pub const ENV_CUSTOMERS_INSTANCE: &str = "INSTANCE_CONNECTION_NAME_CUSTOMERS";
pub const ENV_PRIVATE_IP: &str = "PRIVATE_IP";
pub const ENV_INCIDENTS_DB_NAME: &str = "INCIDENTS_DB_NAME";
pub const ENV_CUSTOMERS_DB_NAME: &str = "CUSTOMERS_DB_NAME";
pub const ENV_BUSY_TIMEOUT_MS: &str = "DB_BUSY_TIMEOUT_MS";

const REDACTED: &str = "********";

/// Network addressing mode used to reach a store instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IpType {
    #[default]
    Public,
    Private,
}

/// Where one logical database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub instance: String,
    pub database: String,
    pub ip_type: IpType,
}

impl ConnectionTarget {
    /// Path of the SQLite file backing this target: `<instance>/<database>.db`.
    pub fn path(&self) -> PathBuf {
        Path::new(&self.instance).join(format!("{}.db", self.database))
    }
}

/// Validated configuration for one evaluation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub db_user: String,
    pub db_pass: String,
    pub incidents_instance: String,
    pub customers_instance: String,
    pub ip_type: IpType,
    pub incidents_db_name: String,
    pub customers_db_name: String,
    pub busy_timeout_ms: u64,
}

/// Unvalidated configuration as read from a file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    db_user: Option<String>,
    db_pass: Option<String>,
    incidents_instance: Option<String>,
    customers_instance: Option<String>,
    #[serde(default)]
    private_ip: bool,
    incidents_db_name: Option<String>,
    customers_db_name: Option<String>,
    busy_timeout_ms: Option<u64>,
}

fn default_incidents_db_name() -> String {
    "incidents".into()
}
fn default_customers_db_name() -> String {
    "customers".into()
}
fn default_busy_timeout_ms() -> u64 {
    5_000
}

/// Longest busy timeout SQLite accepts, in milliseconds.
pub const MAX_BUSY_TIMEOUT_MS: u64 = i32::MAX as u64;

/// Names a configuration source uses for each setting, for error reporting.
struct KeyNames {
    db_user: &'static str,
    db_pass: &'static str,
    incidents_instance: &'static str,
    customers_instance: &'static str,
    busy_timeout_ms: &'static str,
}

const ENV_KEYS: KeyNames = KeyNames {
    db_user: ENV_DB_USER,
    db_pass: ENV_DB_PASS,
    incidents_instance: ENV_INCIDENTS_INSTANCE,
    customers_instance: ENV_CUSTOMERS_INSTANCE,
    busy_timeout_ms: ENV_BUSY_TIMEOUT_MS,
};

const TOML_KEYS: KeyNames = KeyNames {
    db_user: "db_user",
    db_pass: "db_pass",
    incidents_instance: "incidents_instance",
    customers_instance: "customers_instance",
    busy_timeout_ms: "busy_timeout_ms",
};

fn required(value: Option<String>, key: &str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingKey(key.to_string())),
    }
}

fn busy_timeout(value: Option<u64>, key: &str) -> Result<u64, ConfigError> {
    match value {
        Some(ms) if ms > MAX_BUSY_TIMEOUT_MS => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{ms} exceeds the maximum of {MAX_BUSY_TIMEOUT_MS} ms"),
        }),
        Some(ms) => Ok(ms),
        None => Ok(default_busy_timeout_ms()),
    }
}

impl RawConfig {
    fn validate(self, keys: &KeyNames) -> Result<Config, ConfigError> {
        Ok(Config {
            db_user: required(self.db_user, keys.db_user)?,
            db_pass: required(self.db_pass, keys.db_pass)?,
            incidents_instance: required(self.incidents_instance, keys.incidents_instance)?,
            customers_instance: required(self.customers_instance, keys.customers_instance)?,
            ip_type: if self.private_ip {
                IpType::Private
            } else {
                IpType::Public
            },
            incidents_db_name: self
                .incidents_db_name
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(default_incidents_db_name),
            customers_db_name: self
                .customers_db_name
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(default_customers_db_name),
            busy_timeout_ms: busy_timeout(self.busy_timeout_ms, keys.busy_timeout_ms)?,
        })
    }
}

impl Config {
    /// Resolve configuration from the process environment.
    ///
    /// # Errors
    /// Returns an error if a required variable is unset or blank, or if
    /// `DB_BUSY_TIMEOUT_MS` is not a number of at most [`MAX_BUSY_TIMEOUT_MS`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through an arbitrary key lookup.
    ///
    /// `PRIVATE_IP` selects private addressing when set to any non-empty value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let busy_timeout_ms = match lookup(ENV_BUSY_TIMEOUT_MS) {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|e| {
                ConfigError::InvalidValue {
                    key: ENV_BUSY_TIMEOUT_MS.to_string(),
                    message: e.to_string(),
                }
            })?),
            None => None,
        };

        RawConfig {
            db_user: lookup(ENV_DB_USER),
            db_pass: lookup(ENV_DB_PASS),
            incidents_instance: lookup(ENV_INCIDENTS_INSTANCE),
            customers_instance: lookup(ENV_CUSTOMERS_INSTANCE),
            private_ip: lookup(ENV_PRIVATE_IP).is_some_and(|v| !v.is_empty()),
            incidents_db_name: lookup(ENV_INCIDENTS_DB_NAME),
            customers_db_name: lookup(ENV_CUSTOMERS_DB_NAME),
            busy_timeout_ms,
        }
        .validate(&ENV_KEYS)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;
        raw.validate(&TOML_KEYS)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, does not parse, or lacks
    /// a required key.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn incidents_target(&self) -> ConnectionTarget {
        ConnectionTarget {
            instance: self.incidents_instance.clone(),
            database: self.incidents_db_name.clone(),
            ip_type: self.ip_type,
        }
    }

    pub fn customers_target(&self) -> ConnectionTarget {
        ConnectionTarget {
            instance: self.customers_instance.clone(),
            database: self.customers_db_name.clone(),
            ip_type: self.ip_type,
        }
    }

    /// Copy of this configuration safe to print.
    pub fn redacted(&self) -> Self {
        Self {
            db_pass: REDACTED.to_string(),
            ..self.clone()
        }
    }
}
