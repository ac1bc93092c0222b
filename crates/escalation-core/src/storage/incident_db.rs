//! SQLite-backed incident store.
//!
//! Expects an `incidents` table shaped like [`INCIDENTS_SCHEMA`]. The schema
//! is owned by whoever provisions the store; this module never creates it
//! outside of tests.

use rusqlite::{params, Connection, OpenFlags};
use std::time::Duration;

use super::config::ConnectionTarget;
use super::traits::IncidentStore;
use crate::error::{DatabaseError, Result};
use crate::incident::{IncidentId, IncidentStatus, OpenIncident};

/// Expected layout of the incident store.
pub const INCIDENTS_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS incidents (
    id          INTEGER PRIMARY KEY,
    customer_id INTEGER NOT NULL,
    created_at  TEXT NOT NULL,
    status      TEXT NOT NULL DEFAULT 'open'
);

CREATE INDEX IF NOT EXISTS idx_incidents_status ON incidents(status);";

pub struct IncidentDb {
    conn: Connection,
}

impl IncidentDb {
    #[cfg(test)]
    fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open an existing incident database for reading and writing.
    ///
    /// # Errors
    /// Returns [`DatabaseError::OpenFailed`] if the file does not exist or
    /// cannot be opened.
    pub fn open(target: &ConnectionTarget, busy_timeout: Duration) -> Result<Self, DatabaseError> {
        let path = target.path();
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| DatabaseError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        conn.busy_timeout(busy_timeout)?;
        tracing::debug!(path = %path.display(), ip_type = ?target.ip_type, "opened incident store");
        Ok(Self { conn })
    }

    /// Open an in-memory database with the expected schema (for tests).
    #[cfg(test)]
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(INCIDENTS_SCHEMA)?;
        Ok(Self { conn })
    }

    /// Status of a single incident, if it exists.
    #[cfg(test)]
    fn status(&self, id: IncidentId) -> Result<Option<IncidentStatus>> {
        let mut stmt = self.conn.prepare("SELECT status FROM incidents WHERE id = ?1")?;
        let result = stmt.query_row(params![id], |row| row.get::<_, String>(0));
        let raw = match result {
            Ok(v) => v,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        raw.parse::<IncidentStatus>()
            .map(Some)
            .map_err(|message| DatabaseError::MalformedRow {
                table: "incidents",
                id,
                message,
            }
            .into())
    }
}

impl IncidentStore for IncidentDb {
    fn open_incidents(&self) -> Result<Vec<OpenIncident>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, customer_id, created_at
             FROM incidents
             WHERE status = ?1
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![IncidentStatus::Open.as_str()], |row| {
            Ok(OpenIncident {
                id: row.get(0)?,
                customer_id: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;

        let mut incidents = Vec::new();
        for row in rows {
            incidents.push(row?);
        }
        Ok(incidents)
    }

    fn mark_escalated(&self, id: IncidentId) -> Result<bool> {
        // Autocommit: each transition is durable on its own.
        let changed = self.conn.execute(
            "UPDATE incidents SET status = ?1 WHERE id = ?2 AND status = ?3",
            params![
                IncidentStatus::Escalated.as_str(),
                id,
                IncidentStatus::Open.as_str()
            ],
        )?;
        Ok(changed > 0)
    }
}
