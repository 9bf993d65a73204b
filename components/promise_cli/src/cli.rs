//! Command-line arguments

use async_runtime::{ClockMode, EventLoopConfig};
use clap::{ArgAction, Parser};

/// Scenario to run when none is named
pub const DEFAULT_SCENARIO: &str = "timeout-chain";

/// Run promise scenarios on the event loop
#[derive(Parser, Debug)]
#[command(name = "corten-promises")]
#[command(about = "Run promise runtime scenarios", long_about = None)]
#[command(version)]
pub struct Cli {
    /// List the available scenarios and exit
    #[arg(short, long)]
    pub list: bool,

    /// Scenario to run (repeatable)
    #[arg(short, long = "scenario", value_name = "NAME")]
    pub scenarios: Vec<String>,

    /// Run every scenario
    #[arg(short, long, conflicts_with = "scenarios")]
    pub all: bool,

    /// Wait for timers on the wall clock instead of jumping ahead
    #[arg(long)]
    pub realtime: bool,

    /// Fail a scenario after this many loop turns
    #[arg(long, value_name = "N")]
    pub max_turns: Option<u64>,

    /// Print a JSON report instead of text
    #[arg(long)]
    pub json: bool,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Names of the scenarios to run, in order.
    pub fn selected(&self) -> Vec<&str> {
        if self.all {
            crate::scenarios::SCENARIOS.iter().map(|s| s.name).collect()
        } else if self.scenarios.is_empty() {
            vec![DEFAULT_SCENARIO]
        } else {
            self.scenarios.iter().map(String::as_str).collect()
        }
    }

    /// Event loop settings implied by the flags.
    pub fn loop_config(&self) -> EventLoopConfig {
        let clock = if self.realtime {
            ClockMode::Realtime
        } else {
            ClockMode::Virtual
        };
        let config = EventLoopConfig::default().with_clock(clock);
        match self.max_turns {
            Some(limit) => config.with_max_turns(limit),
            None => config,
        }
    }
}
