//! Per-customer escalation threshold lookup.

use chrono::Duration;

use crate::decision::hours_to_duration;
use crate::error::{DatabaseError, Result};
use crate::incident::CustomerId;
use crate::storage::CustomerStore;

/// Resolves a customer's escalation threshold.
///
/// Every call reads the store; nothing is cached between calls.
pub struct ThresholdResolver<C> {
    customers: C,
}

impl<C: CustomerStore> ThresholdResolver<C> {
    pub fn new(customers: C) -> Self {
        Self { customers }
    }

    /// The customer's escalation threshold, or `None` when the customer has
    /// none configured or does not exist.
    ///
    /// # Errors
    /// Propagates store failures, and reports a stored hour count that cannot
    /// be represented as a duration as a malformed row.
    pub fn resolve(&self, customer_id: CustomerId) -> Result<Option<Duration>> {
        let Some(hours) = self.customers.escalation_hours(customer_id)? else {
            return Ok(None);
        };
        match hours_to_duration(hours) {
            Some(threshold) => Ok(Some(threshold)),
            None => Err(DatabaseError::MalformedRow {
                table: "customers",
                id: customer_id,
                message: format!("escalation_time {hours} is out of range"),
            }
            .into()),
        }
    }
}
