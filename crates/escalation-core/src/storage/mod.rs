//! Store contracts, their SQLite adapters, and connectivity configuration.

mod config;
pub mod customer_db;
pub mod incident_db;
pub mod traits;

pub use config::{Config, ConnectionTarget, IpType};
pub use config::{
    ENV_BUSY_TIMEOUT_MS, ENV_CUSTOMERS_DB_NAME, ENV_CUSTOMERS_INSTANCE, ENV_DB_PASS, ENV_DB_USER,
    ENV_INCIDENTS_DB_NAME, ENV_INCIDENTS_INSTANCE, ENV_PRIVATE_IP,
};
pub use customer_db::{CustomerDb, CUSTOMERS_SCHEMA};
pub use incident_db::{IncidentDb, INCIDENTS_SCHEMA};
pub use traits::{CustomerStore, IncidentStore};

use std::time::Duration;

use crate::error::DatabaseError;

/// Open both stores described by `config`.
///
/// Credentials are only meaningful to networked stores; a local SQLite file
/// ignores them.
///
/// # Errors
/// Returns an error if either database file cannot be opened.
pub fn connect(config: &Config) -> Result<(IncidentDb, CustomerDb), DatabaseError> {
    let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
    tracing::debug!(user = %config.db_user, ip_type = ?config.ip_type, "connecting to stores");
    let incidents = IncidentDb::open(&config.incidents_target(), busy_timeout)?;
    let customers = CustomerDb::open(&config.customers_target(), busy_timeout)?;
    Ok((incidents, customers))
}
