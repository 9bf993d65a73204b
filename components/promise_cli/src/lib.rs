//! Promise runtime scenario runner
//!
//! Provides the argument surface, the scenario registry and the runner that
//! drives each scenario on its own event loop.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod error;
pub mod logging;
pub mod report;
pub mod runner;
pub mod scenarios;

pub use cli::Cli;
pub use error::{CliError, CliResult};
pub use report::{Report, ReportState};
pub use runner::{execute, Runner};
pub use scenarios::{find, Scenario, SCENARIOS};
