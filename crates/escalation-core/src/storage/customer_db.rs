//! SQLite-backed customer configuration store, opened read-only.

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::time::Duration;

use super::config::ConnectionTarget;
use super::traits::CustomerStore;
use crate::error::{DatabaseError, Result};
use crate::incident::CustomerId;

/// Expected layout of the customer store. `escalation_time` is in hours.
pub const CUSTOMERS_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS customers (
    id              INTEGER PRIMARY KEY,
    escalation_time REAL
);";

pub struct CustomerDb {
    conn: Connection,
}

impl CustomerDb {
    #[cfg(test)]
    fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open an existing customer database read-only.
    ///
    /// # Errors
    /// Returns [`DatabaseError::OpenFailed`] if the file does not exist or
    /// cannot be opened.
    pub fn open(target: &ConnectionTarget, busy_timeout: Duration) -> Result<Self, DatabaseError> {
        let path = target.path();
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| DatabaseError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        conn.busy_timeout(busy_timeout)?;
        tracing::debug!(path = %path.display(), ip_type = ?target.ip_type, "opened customer store");
        Ok(Self { conn })
    }

    #[cfg(test)]
    fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    #[cfg(test)]
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CUSTOMERS_SCHEMA)?;
        Ok(Self { conn })
    }
}

impl CustomerStore for CustomerDb {
    fn escalation_hours(&self, customer_id: CustomerId) -> Result<Option<f64>> {
        let hours = self
            .conn
            .query_row(
                "SELECT escalation_time FROM customers WHERE id = ?1",
                params![customer_id],
                |row| row.get::<_, Option<f64>>(0),
            )
            .optional()?;
        Ok(hours.flatten())
    }
}
