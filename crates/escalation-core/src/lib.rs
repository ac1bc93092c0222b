//! # Escalation Core Library
//!
//! Re-evaluates open support incidents and escalates the ones that have been
//! open longer than their customer allows. A pass is stateless: it reads the
//! incident store and the customer store afresh, decides per incident, and
//! writes each transition on its own.
//!
//! ## Key Components
//!
//! - [`EscalationEvaluator`]: runs one pass over all open incidents
//! - [`ThresholdResolver`]: per-customer escalation time lookup
//! - [`IncidentStore`] / [`CustomerStore`]: store contracts, with SQLite
//!   adapters in [`storage`]
//! - [`invoke`]: configuration, connection and error boundary for a pass

pub mod decision;
pub mod error;
pub mod evaluator;
pub mod incident;
pub mod invocation;
pub mod resolver;
pub mod storage;

pub use decision::{decide, incident_age, should_escalate, EscalationDecision};
pub use error::{ConfigError, CoreError, DatabaseError, ErrorKind};
pub use evaluator::{EscalationEvaluator, EvaluationReport};
pub use incident::{CustomerId, IncidentId, IncidentStatus, OpenIncident};
pub use invocation::{invoke, invoke_with, run_pass, PassResponse, PassStatus, ResponseBody};
pub use resolver::ThresholdResolver;
pub use storage::{Config, CustomerStore, IncidentStore, IpType};
