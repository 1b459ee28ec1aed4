//! `fixture` command-line entry point.
//!
//! Parses arguments, installs logging, runs the generator, and maps failures
//! to exit statuses (see [`fixturegen::cli`]).

use clap::Parser;
use fixturegen::cli::{self, Cli};

fn main() {
    let cli = Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    cli.init_logging();

    if let Err(e) = cli.execute() {
        std::process::exit(cli::report_error(e));
    }
}
