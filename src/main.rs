//! # Vendorize CLI
//!
//! Binary entry point for the `vendorize` command-line tool. It parses the
//! arguments, installs logging and the interrupt handler, runs the selected
//! action and turns its outcome into an exit code:
//!
//! - `0` on success,
//! - `1` on any error, or when no action was given,
//! - `130` when interrupted with Ctrl-C.
//!
//! The vendoring logic itself lives in the `vendorize` library crate.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use log::{error, info, warn};

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    cli.init_logging();

    // the cache is left as is; vendor/ is rebuilt on the next sync anyway
    if let Err(e) = ctrlc::set_handler(|| {
        info!("Interrupted by user");
        std::process::exit(130);
    }) {
        warn!("Could not install interrupt handler: {}", e);
    }

    let Some(action) = cli.action() else {
        let _ = cli::Cli::command().print_help();
        println!();
        return ExitCode::FAILURE;
    };

    match cli.execute(action) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
