//! Incident data model as seen by the escalation pass.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DatabaseError;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub type IncidentId = i64;
pub type CustomerId = i64;

/// Lifecycle state of an incident.
///
/// Only `Open` and `Escalated` are produced or consumed by the pass; the
/// remaining states belong to the support workflow that owns the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    Open,
    Escalated,
    Resolved,
    Closed,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Open => "open",
            IncidentStatus::Escalated => "escalated",
            IncidentStatus::Resolved => "resolved",
            IncidentStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncidentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(IncidentStatus::Open),
            "escalated" => Ok(IncidentStatus::Escalated),
            "resolved" => Ok(IncidentStatus::Resolved),
            "closed" => Ok(IncidentStatus::Closed),
            other => Err(format!("unknown incident status: {other}")),
        }
    }
}

/// An incident currently in the `Open` state.
///
/// `created_at` is kept as the store's text and parsed on use, so one bad
/// row only fails when the pass reaches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenIncident {
    pub id: IncidentId,
    pub customer_id: CustomerId,
    pub created_at: String,
}

impl OpenIncident {
    pub fn new(id: IncidentId, customer_id: CustomerId, created_on: NaiveDate) -> Self {
        Self {
            id,
            customer_id,
            created_at: created_on.format(DATE_FORMAT).to_string(),
        }
    }

    /// Creation date. A trailing time component, if any, is ignored.
    ///
    /// # Errors
    /// Returns [`DatabaseError::MalformedRow`] if `created_at` is not a date.
    pub fn created_on(&self) -> Result<NaiveDate, DatabaseError> {
        let raw = self.created_at.as_str();
        let date_part = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(date_part, DATE_FORMAT).map_err(|e| {
            DatabaseError::MalformedRow {
                table: "incidents",
                id: self.id,
                message: format!("invalid created_at '{raw}': {e}"),
            }
        })
    }
}
