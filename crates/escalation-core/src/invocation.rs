//! Entry point for one externally triggered pass.
//!
//! Everything that can go wrong during a pass funnels through [`respond`],
//! which logs the error once and turns it into a failed [`PassResponse`].

use serde::Serialize;

use crate::error::{ConfigError, CoreError, ErrorKind, Result};
use crate::evaluator::{EscalationEvaluator, EvaluationReport};
use crate::storage::{self, Config};

pub const SUCCESS_MESSAGE: &str = "Incidents processed successfully";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PassStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Success {
        message: String,
        report: EvaluationReport,
    },
    Failure {
        error: String,
        kind: ErrorKind,
    },
}

/// Outcome handed back to whatever triggered the pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassResponse {
    pub status: PassStatus,
    /// HTTP-style status code: 200 on completion, 500 on failure.
    pub code: u16,
    pub body: ResponseBody,
}

impl PassResponse {
    pub fn is_success(&self) -> bool {
        self.status == PassStatus::Completed
    }
}

/// Run one pass configured from the process environment.
pub fn invoke() -> PassResponse {
    invoke_with(Config::from_env)
}

/// Run one pass with configuration supplied by `load`.
///
/// Configuration is resolved before any store is opened.
pub fn invoke_with<F>(load: F) -> PassResponse
where
    F: FnOnce() -> std::result::Result<Config, ConfigError>,
{
    let result = load()
        .map_err(CoreError::from)
        .and_then(|config| run_pass(&config));
    respond(result)
}

/// Connect to both stores and run the evaluator once.
///
/// # Errors
/// Returns a data-access error if either store cannot be opened or a read or
/// write fails during the pass.
pub fn run_pass(config: &Config) -> Result<EvaluationReport> {
    let (incidents, customers) = storage::connect(config)?;
    EscalationEvaluator::new(incidents, customers).run()
}

pub fn respond(result: Result<EvaluationReport>) -> PassResponse {
    match result {
        Ok(report) => PassResponse {
            status: PassStatus::Completed,
            code: 200,
            body: ResponseBody::Success {
                message: SUCCESS_MESSAGE.to_string(),
                report,
            },
        },
        Err(e) => {
            tracing::error!(kind = e.kind().as_str(), error = %e, "escalation pass failed");
            PassResponse {
                status: PassStatus::Failed,
                code: 500,
                body: ResponseBody::Failure {
                    error: format!("Error processing incidents: {e}"),
                    kind: e.kind(),
                },
            }
        }
    }
}
