//! Corten promise scenario runner
//!
//! Entry point for the runner. Parses CLI arguments, installs logging and
//! delegates to [`promise_cli::execute`].

use clap::Parser;
use promise_cli::{execute, logging, Cli, Report};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let stdout = std::io::stdout();
    match execute(&cli, &mut stdout.lock()) {
        Ok(reports) => {
            if reports.iter().any(Report::is_failure) {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
