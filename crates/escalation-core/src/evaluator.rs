//! The escalation pass.
//!
//! One pass reads every open incident, resolves its customer's threshold and
//! escalates the incidents that have outlived it. Incidents are handled one
//! at a time and each transition is committed on its own, so an error midway
//! leaves earlier transitions in place. The first error aborts the rest of
//! the pass; re-running it is safe because escalated incidents are no longer
//! selected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decision::{as_hours, decide, incident_age, EscalationDecision};
use crate::error::Result;
use crate::incident::IncidentId;
use crate::resolver::ThresholdResolver;
use crate::storage::{CustomerStore, IncidentStore};

/// Summary of a completed pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub evaluated_at: DateTime<Utc>,
    /// Open incidents visited.
    pub processed: usize,
    /// Incidents this pass moved to `escalated`.
    pub escalated: usize,
    /// Incidents that were due but had already left `open` when written.
    pub already_escalated: usize,
    pub within_threshold: usize,
    /// Incidents whose customer has no threshold.
    pub unconfigured: usize,
    pub escalated_ids: Vec<IncidentId>,
}

impl EvaluationReport {
    fn empty(evaluated_at: DateTime<Utc>) -> Self {
        Self {
            evaluated_at,
            processed: 0,
            escalated: 0,
            already_escalated: 0,
            within_threshold: 0,
            unconfigured: 0,
            escalated_ids: Vec::new(),
        }
    }
}

pub struct EscalationEvaluator<I, C> {
    incidents: I,
    resolver: ThresholdResolver<C>,
}

impl<I, C> EscalationEvaluator<I, C>
where
    I: IncidentStore,
    C: CustomerStore,
{
    pub fn new(incidents: I, customers: C) -> Self {
        Self {
            incidents,
            resolver: ThresholdResolver::new(customers),
        }
    }

    /// Run one pass against the current wall clock.
    pub fn run(&self) -> Result<EvaluationReport> {
        self.run_at(Utc::now())
    }

    /// Run one pass, aging every incident against `now`.
    ///
    /// # Errors
    /// Returns the first data-access error; transitions committed before it
    /// remain in the store.
    pub fn run_at(&self, now: DateTime<Utc>) -> Result<EvaluationReport> {
        let open = self.incidents.open_incidents()?;
        tracing::info!(count = open.len(), "open incidents found");

        let mut report = EvaluationReport::empty(now);
        for incident in &open {
            report.processed += 1;
            let created_on = incident.created_on()?;
            let threshold = self.resolver.resolve(incident.customer_id)?;
            let age = incident_age(now, created_on);

            match decide(now, created_on, threshold) {
                EscalationDecision::Unconfigured => {
                    tracing::debug!(
                        incident_id = incident.id,
                        customer_id = incident.customer_id,
                        "customer has no escalation time, skipping"
                    );
                    report.unconfigured += 1;
                }
                EscalationDecision::WithinThreshold => {
                    tracing::debug!(
                        incident_id = incident.id,
                        age_hours = as_hours(age),
                        "incident has not exceeded its escalation time"
                    );
                    report.within_threshold += 1;
                }
                EscalationDecision::Escalate => {
                    if self.incidents.mark_escalated(incident.id)? {
                        tracing::info!(
                            incident_id = incident.id,
                            customer_id = incident.customer_id,
                            age_hours = as_hours(age),
                            "incident escalated"
                        );
                        report.escalated += 1;
                        report.escalated_ids.push(incident.id);
                    } else {
                        tracing::warn!(
                            incident_id = incident.id,
                            "incident left the open state before it could be escalated"
                        );
                        report.already_escalated += 1;
                    }
                }
            }
        }

        tracing::info!(
            processed = report.processed,
            escalated = report.escalated,
            "escalation pass completed"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, DatabaseError};
    use crate::incident::{CustomerId, IncidentStatus, OpenIncident};
    use chrono::{NaiveDate, TimeZone};
    use std::cell::{Cell, RefCell};
    use std::collections::{BTreeMap, HashMap};

    struct Row {
        customer_id: CustomerId,
        created_at: String,
        status: IncidentStatus,
    }

    #[derive(Default)]
    struct MemoryIncidents {
        rows: RefCell<BTreeMap<IncidentId, Row>>,
        writes: RefCell<Vec<IncidentId>>,
    }

    impl MemoryIncidents {
        fn with(
            self,
            id: IncidentId,
            customer_id: CustomerId,
            created_on: NaiveDate,
            status: IncidentStatus,
        ) -> Self {
            let created_at = OpenIncident::new(id, customer_id, created_on).created_at;
            self.with_raw(id, customer_id, &created_at, status)
        }

        fn with_raw(
            self,
            id: IncidentId,
            customer_id: CustomerId,
            created_at: &str,
            status: IncidentStatus,
        ) -> Self {
            self.rows.borrow_mut().insert(
                id,
                Row {
                    customer_id,
                    created_at: created_at.to_string(),
                    status,
                },
            );
            self
        }

        fn status(&self, id: IncidentId) -> IncidentStatus {
            self.rows.borrow()[&id].status
        }

        fn set_status(&self, id: IncidentId, status: IncidentStatus) {
            if let Some(row) = self.rows.borrow_mut().get_mut(&id) {
                row.status = status;
            }
        }
    }

    impl IncidentStore for MemoryIncidents {
        fn open_incidents(&self) -> Result<Vec<OpenIncident>> {
            Ok(self
                .rows
                .borrow()
                .iter()
                .filter(|(_, r)| r.status == IncidentStatus::Open)
                .map(|(id, r)| OpenIncident {
                    id: *id,
                    customer_id: r.customer_id,
                    created_at: r.created_at.clone(),
                })
                .collect())
        }

        fn mark_escalated(&self, id: IncidentId) -> Result<bool> {
            self.writes.borrow_mut().push(id);
            let mut rows = self.rows.borrow_mut();
            match rows.get_mut(&id) {
                Some(row) if row.status == IncidentStatus::Open => {
                    row.status = IncidentStatus::Escalated;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }
    }

    #[derive(Default)]
    struct MemoryCustomers {
        thresholds: HashMap<CustomerId, Option<f64>>,
        unreachable_after: Option<usize>,
        reads: Cell<usize>,
    }

    impl CustomerStore for MemoryCustomers {
        fn escalation_hours(&self, customer_id: CustomerId) -> Result<Option<f64>> {
            let reads = self.reads.get();
            if self.unreachable_after.is_some_and(|n| reads >= n) {
                return Err(DatabaseError::QueryFailed("customer store unreachable".into()).into());
            }
            self.reads.set(reads + 1);
            Ok(self.thresholds.get(&customer_id).copied().flatten())
        }
    }

    /// Incidents are opened on 2026-10-16; `now` is `hour` o'clock that day.
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn now_at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, hour, 0, 0).unwrap()
    }

    fn customers(pairs: &[(CustomerId, Option<f64>)]) -> MemoryCustomers {
        MemoryCustomers {
            thresholds: pairs.iter().copied().collect(),
            ..Default::default()
        }
    }

    #[test]
    fn escalates_incident_older_than_threshold() {
        let incidents = MemoryIncidents::default().with(1, 10, today(), IncidentStatus::Open);
        let customers = customers(&[(10, Some(5.0))]);
        let evaluator = EscalationEvaluator::new(&incidents, &customers);

        let report = evaluator.run_at(now_at(10)).unwrap();

        assert_eq!(incidents.status(1), IncidentStatus::Escalated);
        assert_eq!(*incidents.writes.borrow(), vec![1]);
        assert_eq!(report.processed, 1);
        assert_eq!(report.escalated, 1);
        assert_eq!(report.escalated_ids, vec![1]);
    }

    #[test]
    fn leaves_incident_within_threshold_open() {
        let incidents = MemoryIncidents::default().with(1, 10, today(), IncidentStatus::Open);
        let customers = customers(&[(10, Some(5.0))]);

        let report = EscalationEvaluator::new(&incidents, &customers)
            .run_at(now_at(3))
            .unwrap();

        assert_eq!(incidents.status(1), IncidentStatus::Open);
        assert!(incidents.writes.borrow().is_empty());
        assert_eq!(report.within_threshold, 1);
    }

    #[test]
    fn unconfigured_customer_is_skipped_without_error() {
        let incidents = MemoryIncidents::default()
            .with(1, 10, today(), IncidentStatus::Open)
            .with(2, 11, today(), IncidentStatus::Open);
        let customers = customers(&[(10, None)]);

        let report = EscalationEvaluator::new(&incidents, &customers)
            .run_at(now_at(23))
            .unwrap();

        assert_eq!(incidents.status(1), IncidentStatus::Open);
        assert_eq!(incidents.status(2), IncidentStatus::Open);
        assert!(incidents.writes.borrow().is_empty());
        assert_eq!(report.unconfigured, 2);
        assert_eq!(report.processed, 2);
    }

    #[test]
    fn non_open_incidents_are_never_written() {
        let long_ago = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let incidents = MemoryIncidents::default()
            .with(1, 10, long_ago, IncidentStatus::Escalated)
            .with(2, 10, long_ago, IncidentStatus::Resolved)
            .with(3, 10, long_ago, IncidentStatus::Closed);
        let customers = customers(&[(10, Some(1.0))]);

        let report = EscalationEvaluator::new(&incidents, &customers)
            .run_at(now_at(12))
            .unwrap();

        assert_eq!(report.processed, 0);
        assert!(incidents.writes.borrow().is_empty());
        assert_eq!(incidents.status(2), IncidentStatus::Resolved);
        assert_eq!(incidents.status(3), IncidentStatus::Closed);
    }

    #[test]
    fn zero_open_incidents_reports_success() {
        let incidents = MemoryIncidents::default();
        let customers = customers(&[]);

        let report = EscalationEvaluator::new(&incidents, &customers)
            .run_at(now_at(12))
            .unwrap();

        assert_eq!(report, EvaluationReport::empty(now_at(12)));
        assert_eq!(customers.reads.get(), 0);
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let incidents = MemoryIncidents::default()
            .with(1, 10, today(), IncidentStatus::Open)
            .with(2, 11, today(), IncidentStatus::Open)
            .with(3, 12, today(), IncidentStatus::Open);
        let customers = customers(&[(10, Some(5.0)), (11, Some(20.0))]);
        let evaluator = EscalationEvaluator::new(&incidents, &customers);

        let first = evaluator.run_at(now_at(10)).unwrap();
        let second = evaluator.run_at(now_at(10)).unwrap();

        assert_eq!(first.escalated_ids, vec![1]);
        assert_eq!(second.escalated, 0);
        assert_eq!(second.processed, 2);
        assert_eq!(*incidents.writes.borrow(), vec![1]);
        assert_eq!(incidents.status(1), IncidentStatus::Escalated);
        assert_eq!(incidents.status(2), IncidentStatus::Open);
        assert_eq!(incidents.status(3), IncidentStatus::Open);
    }

    #[test]
    fn lingering_incident_is_rechecked_on_later_passes() {
        let incidents = MemoryIncidents::default().with(1, 10, today(), IncidentStatus::Open);
        let customers = customers(&[(10, Some(5.0))]);
        let evaluator = EscalationEvaluator::new(&incidents, &customers);

        assert_eq!(evaluator.run_at(now_at(4)).unwrap().escalated, 0);
        assert_eq!(evaluator.run_at(now_at(6)).unwrap().escalated, 1);
        assert_eq!(incidents.status(1), IncidentStatus::Escalated);
    }

    #[test]
    fn customer_store_failure_aborts_without_rolling_back() {
        let incidents = MemoryIncidents::default()
            .with(1, 10, today(), IncidentStatus::Open)
            .with(2, 10, today(), IncidentStatus::Open)
            .with(3, 10, today(), IncidentStatus::Open);
        let customers = MemoryCustomers {
            thresholds: HashMap::from([(10, Some(1.0))]),
            unreachable_after: Some(1),
            ..Default::default()
        };

        let err = EscalationEvaluator::new(&incidents, &customers)
            .run_at(now_at(12))
            .unwrap_err();

        assert!(matches!(err, CoreError::Database(DatabaseError::QueryFailed(_))));
        assert_eq!(incidents.status(1), IncidentStatus::Escalated);
        assert_eq!(incidents.status(2), IncidentStatus::Open);
        assert_eq!(incidents.status(3), IncidentStatus::Open);
        assert_eq!(*incidents.writes.borrow(), vec![1]);
    }

    #[test]
    fn malformed_creation_date_aborts_at_that_incident() {
        let incidents = MemoryIncidents::default()
            .with(1, 10, today(), IncidentStatus::Open)
            .with_raw(2, 10, "not a date", IncidentStatus::Open)
            .with(3, 10, today(), IncidentStatus::Open);
        let customers = customers(&[(10, Some(1.0))]);

        let err = EscalationEvaluator::new(&incidents, &customers)
            .run_at(now_at(12))
            .unwrap_err();

        assert!(matches!(
            err,
            CoreError::Database(DatabaseError::MalformedRow { id: 2, .. })
        ));
        assert_eq!(incidents.status(1), IncidentStatus::Escalated);
        assert_eq!(incidents.status(3), IncidentStatus::Open);
        assert_eq!(customers.reads.get(), 1);
    }

    #[test]
    fn unreachable_customer_store_mutates_nothing() {
        let incidents = MemoryIncidents::default().with(1, 10, today(), IncidentStatus::Open);
        let customers = MemoryCustomers {
            unreachable_after: Some(0),
            ..Default::default()
        };

        let result = EscalationEvaluator::new(&incidents, &customers).run_at(now_at(12));

        assert!(result.is_err());
        assert!(incidents.writes.borrow().is_empty());
        assert_eq!(incidents.status(1), IncidentStatus::Open);
    }

    /// Stands in for an overlapping pass that escalates the row between
    /// this pass's read and its write.
    struct RacingIncidents(MemoryIncidents);

    impl IncidentStore for RacingIncidents {
        fn open_incidents(&self) -> Result<Vec<OpenIncident>> {
            let open = self.0.open_incidents()?;
            for incident in &open {
                self.0.set_status(incident.id, IncidentStatus::Escalated);
            }
            Ok(open)
        }

        fn mark_escalated(&self, id: IncidentId) -> Result<bool> {
            self.0.mark_escalated(id)
        }
    }

    #[test]
    fn concurrent_escalation_is_counted_not_failed() {
        let incidents =
            RacingIncidents(MemoryIncidents::default().with(1, 10, today(), IncidentStatus::Open));
        let customers = customers(&[(10, Some(5.0))]);

        let report = EscalationEvaluator::new(&incidents, &customers)
            .run_at(now_at(10))
            .unwrap();

        assert_eq!(report.escalated, 0);
        assert_eq!(report.already_escalated, 1);
        assert_eq!(incidents.0.status(1), IncidentStatus::Escalated);
    }

    #[test]
    fn customer_threshold_is_read_fresh_for_every_incident() {
        let incidents = MemoryIncidents::default()
            .with(1, 10, today(), IncidentStatus::Open)
            .with(2, 10, today(), IncidentStatus::Open);
        let customers = customers(&[(10, Some(5.0))]);
        let evaluator = EscalationEvaluator::new(&incidents, &customers);

        evaluator.run_at(now_at(1)).unwrap();

        assert_eq!(customers.reads.get(), 2);
    }
}
