//! Per-scenario results and their text and JSON renderings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a scenario ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportState {
    /// The scenario's promise fulfilled
    Fulfilled,
    /// The scenario's promise rejected
    Rejected,
    /// The loop ran out of work with the promise still pending
    Pending,
    /// The loop failed before the promise settled
    Error,
}

impl fmt::Display for ReportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReportState::Fulfilled => "fulfilled",
            ReportState::Rejected => "rejected",
            ReportState::Pending => "pending",
            ReportState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Result of running one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Scenario name
    pub name: String,
    /// Final state
    pub state: ReportState,
    /// Fulfillment value or rejection reason, rendered
    pub value: Option<String>,
    /// Loop clock at the end of the run
    pub elapsed_ms: u64,
    /// Loop turns taken
    pub turns: u64,
    /// Loop failure, if any
    pub error: Option<String>,
}

impl Report {
    /// True when the run counts as a failure for the exit status.
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.state)?;
        if let Some(value) = &self.value {
            write!(f, " {}", value)?;
        }
        write!(f, " ({}ms, {} turns)", self.elapsed_ms, self.turns)?;
        if let Some(error) = &self.error {
            write!(f, " - {}", error)?;
        }
        Ok(())
    }
}
