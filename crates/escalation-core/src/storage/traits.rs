use crate::error::Result;
use crate::incident::{CustomerId, IncidentId, OpenIncident};

/// Read/write access to the incident store.
///
/// Implementations must commit [`mark_escalated`](Self::mark_escalated)
/// durably before returning; the pass never batches transitions.
pub trait IncidentStore {
    /// All incidents whose status is currently `open`, in any order.
    fn open_incidents(&self) -> Result<Vec<OpenIncident>>;

    /// Move one incident from `open` to `escalated`.
    ///
    /// Returns `false` when the incident was no longer open, e.g. because an
    /// overlapping pass escalated it first.
    fn mark_escalated(&self, id: IncidentId) -> Result<bool>;
}

/// Read-only access to customer escalation settings.
pub trait CustomerStore {
    /// Configured escalation time in hours.
    ///
    /// `None` when the customer has no threshold or does not exist.
    fn escalation_hours(&self, customer_id: CustomerId) -> Result<Option<f64>>;
}

impl<T: IncidentStore + ?Sized> IncidentStore for &T {
    fn open_incidents(&self) -> Result<Vec<OpenIncident>> {
        (**self).open_incidents()
    }

    fn mark_escalated(&self, id: IncidentId) -> Result<bool> {
        (**self).mark_escalated(id)
    }
}

impl<T: CustomerStore + ?Sized> CustomerStore for &T {
    fn escalation_hours(&self, customer_id: CustomerId) -> Result<Option<f64>> {
        (**self).escalation_hours(customer_id)
    }
}
