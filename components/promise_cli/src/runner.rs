//! Scenario execution.
//!
//! Every scenario gets a fresh [`EventLoop`] built from the runner's
//! configuration. The loop is driven only until the scenario's promise
//! settles. Work still queued at that point, such as the losing timer of a
//! race, is discarded with [`EventLoop::shutdown`] so the loop and its
//! promises are freed.

use crate::cli::Cli;
use crate::error::{CliError, CliResult};
use crate::report::{Report, ReportState};
use crate::scenarios::{self, Scenario};
use async_runtime::{ClockMode, EventLoop, EventLoopConfig, Promise, PromiseState, RuntimeError};
use std::io::Write;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Runs scenarios on fresh event loops
#[derive(Debug, Clone, Default)]
pub struct Runner {
    config: EventLoopConfig,
}

impl Runner {
    /// Create a runner with the default loop configuration
    ///
    /// # Example
    /// ```
    /// use async_runtime::ClockMode;
    /// use promise_cli::{find, ReportState, Runner};
    ///
    /// let runner = Runner::new().with_clock(ClockMode::Virtual);
    /// let report = runner.run(find("timeout-chain").unwrap());
    /// assert_eq!(report.state, ReportState::Fulfilled);
    /// assert_eq!(report.elapsed_ms, 3200);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a runner with an explicit loop configuration
    pub fn with_config(config: EventLoopConfig) -> Self {
        Self { config }
    }

    /// Select the loop clock
    pub fn with_clock(mut self, clock: ClockMode) -> Self {
        self.config = self.config.with_clock(clock);
        self
    }

    /// Bound each scenario's loop turns
    pub fn with_max_turns(mut self, max_turns: u64) -> Self {
        self.config = self.config.with_max_turns(max_turns);
        self
    }

    /// Loop configuration used for each scenario
    pub fn config(&self) -> &EventLoopConfig {
        &self.config
    }

    /// Run one scenario to settlement and describe the result
    pub fn run(&self, scenario: &Scenario) -> Report {
        let event_loop = Rc::new(EventLoop::with_config(self.config.clone()));
        self.drive(scenario, &event_loop)
    }

    fn drive(&self, scenario: &Scenario, event_loop: &Rc<EventLoop>) -> Report {
        let promise = scenario.build(event_loop);
        info!(scenario = scenario.name, promise = %promise.id(), "running scenario");

        let settled = settle(event_loop, &promise);
        let discarded = event_loop.shutdown();
        if discarded > 0 {
            debug!(scenario = scenario.name, discarded, "discarded unfinished work");
        }
        let (state, value, error) = match settled {
            Ok(PromiseState::Fulfilled(value)) => {
                (ReportState::Fulfilled, Some(value.to_string()), None)
            }
            Ok(PromiseState::Rejected(reason)) => {
                (ReportState::Rejected, Some(reason.to_string()), None)
            }
            Ok(PromiseState::Pending) => (ReportState::Pending, None, None),
            Err(err @ CliError::Runtime(RuntimeError::Stalled { .. })) => {
                (ReportState::Pending, None, Some(err.to_string()))
            }
            Err(err) => (ReportState::Error, None, Some(err.to_string())),
        };

        if let Some(error) = &error {
            warn!(scenario = scenario.name, %error, "scenario failed");
        }

        Report {
            name: scenario.name.to_string(),
            state,
            value,
            elapsed_ms: event_loop.now().as_millis() as u64,
            turns: event_loop.turns(),
            error,
        }
    }
}

fn settle(event_loop: &EventLoop, promise: &Promise) -> CliResult<PromiseState> {
    Ok(event_loop.run_until_settled(promise)?)
}

/// Carry out the command described by `cli`, writing to `out`
///
/// Returns the reports of the scenarios that ran; `--list` runs none.
/// Unknown scenario names fail before anything runs.
pub fn execute(cli: &Cli, out: &mut dyn Write) -> CliResult<Vec<Report>> {
    if cli.list {
        for scenario in scenarios::SCENARIOS {
            writeln!(out, "{:<18} {}", scenario.name, scenario.description)?;
        }
        return Ok(Vec::new());
    }

    let selected = cli
        .selected()
        .into_iter()
        .map(scenarios::find)
        .collect::<CliResult<Vec<_>>>()?;

    let runner = Runner::with_config(cli.loop_config());
    let mut reports = Vec::with_capacity(selected.len());
    for scenario in selected {
        let report = runner.run(scenario);
        if !cli.json {
            writeln!(out, "{}", report)?;
        }
        reports.push(report);
    }

    if cli.json {
        serde_json::to_writer_pretty(&mut *out, &reports)?;
        writeln!(out)?;
    }
    Ok(reports)
}
