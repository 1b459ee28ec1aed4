//! Command-line interface for fixturegen.
//!
//! A single command generates fixture text for one object:
//!
//! ```bash
//! # All offers, with everything they reference
//! fixture shop.Offer
//!
//! # One offer, rendered as YAML into a file
//! fixture shop.Offer --where "id = 1" --template yaml -o offer.yaml
//!
//! # Schema from the module, rows from a snapshot
//! fixture shop.Offer --dsn file:snapshots/prod.json --env ../shared
//! ```
//!
//! Flags override the configuration files described in [`crate::config`].
//! Generated text goes to stdout (or `--output`); logs and diagnostics go to
//! stderr.
//!
//! # Exit status
//!
//! | Status | Meaning |
//! |--------|---------|
//! | 0 | Fixture generated |
//! | 1 | Unexpected failure, reported with its cause chain |
//! | 2 | Expected failure (bad usage, no data, no handler, misconfigured handler) |

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::{ConfigFile, GenerateOptions};
use crate::core::{FixtureError, find_fixture_error, user_friendly_error};
use crate::generator::Generator;

/// Exit status for expected failures.
pub const EXIT_EXPECTED: i32 = 2;
/// Exit status for unexpected failures.
pub const EXIT_FAILURE: i32 = 1;

/// Generate dependency-ordered fixture definitions from stored records.
#[derive(Parser, Debug)]
#[command(
    name = "fixture",
    about = "Generate fixture definitions for stored records and everything they reference",
    version,
    long_about = "Queries the records of OBJECT_PATH (module.Model), follows every reference \
                  they hold, and prints fixture blocks ordered so that each block only refers \
                  to blocks declared before it."
)]
pub struct Cli {
    /// Object to generate fixtures for, e.g. `shop.Offer` or `data/shop.json:Offer`
    object_path: String,

    /// Connection string handed to the handler, e.g. `file:snapshot.json`
    #[arg(long, value_name = "DSN")]
    dsn: Option<String>,

    /// Filter expression, e.g. `"id = 1 and name != 'x'"`
    #[arg(short = 'w', long = "where", value_name = "EXPR")]
    filter: Option<String>,

    /// Prefix of generated class names
    #[arg(long)]
    prefix: Option<String>,

    /// Suffix of generated class names [default: Data]
    #[arg(long)]
    suffix: Option<String>,

    /// Additional directory searched for store modules (repeatable)
    #[arg(long = "env", value_name = "NAMESPACE")]
    env: Vec<PathBuf>,

    /// Handler that must be registered (repeatable)
    #[arg(long = "require-handler", value_name = "NAME")]
    require_handlers: Vec<String>,

    /// Output template: toml or yaml [default: toml]
    #[arg(long, value_name = "NAME")]
    template: Option<String>,

    /// Project configuration file used instead of ./fixturegen.toml
    #[arg(long, env = "FIXTUREGEN_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write the fixture to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    /// Log level selected by `--verbose` / `--quiet`.
    #[must_use]
    pub const fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }

    /// Install the stderr subscriber. `RUST_LOG` wins over the flags.
    pub fn init_logging(&self) {
        let filter = if std::env::var_os("RUST_LOG").is_some() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(self.log_level())
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// Merge configuration files and flags into run options.
    pub fn build_options(&self, base_dir: &Path) -> Result<GenerateOptions> {
        let global = ConfigFile::global_path();
        let config = ConfigFile::load_layered(global.as_deref(), base_dir, self.config.as_deref())?;

        let mut options = GenerateOptions::from_config(base_dir, config)
            .with_env(self.env.iter().cloned())
            .with_required_handlers(self.require_handlers.iter().cloned());

        if let Some(dsn) = &self.dsn {
            options = options.with_dsn(dsn.as_str());
        }
        if let Some(prefix) = &self.prefix {
            options = options.with_prefix(prefix.as_str());
        }
        if let Some(suffix) = &self.suffix {
            options = options.with_suffix(suffix.as_str());
        }
        if let Some(template) = &self.template {
            options = options.with_template(template.as_str());
        }
        Ok(options)
    }

    /// Run the command from the current directory.
    pub fn execute(self) -> Result<()> {
        let base_dir = std::env::current_dir().context("Failed to determine working directory")?;
        self.execute_in(&base_dir)
    }

    /// Run the command with `base_dir` as the working directory.
    pub fn execute_in(self, base_dir: &Path) -> Result<()> {
        let object_path = self.object_path.trim();
        if object_path.is_empty() {
            return Err(FixtureError::usage("object path must not be empty").into());
        }

        let options = self.build_options(base_dir)?;
        debug!("Options: {options:?}");

        let mut generator = Generator::new(options)?;
        let text = generator.resolve(object_path, self.filter.as_deref())?;
        self.write_output(&text)
    }

    fn write_output(&self, text: &str) -> Result<()> {
        match &self.output {
            Some(path) => {
                std::fs::write(path, text)
                    .map_err(|e| FixtureError::io("write output", path.display(), &e))?;
                debug!("Wrote {}", path.display());
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(text.as_bytes()).context("Failed to write to stdout")?;
                if !text.ends_with('\n') {
                    writeln!(stdout).context("Failed to write to stdout")?;
                }
            }
        }
        Ok(())
    }
}

/// Print `error` to stderr and return the process exit status.
///
/// Expected failures get one `error: <Kind>: <message>` line; anything else
/// is shown with details, suggestion and cause chain.
pub fn report_error(error: anyhow::Error) -> i32 {
    if let Some(fixture_error) = find_fixture_error(&error)
        && fixture_error.is_expected()
    {
        eprintln!("{}: {}: {}", "error".red().bold(), fixture_error.kind(), fixture_error);
        return EXIT_EXPECTED;
    }

    let chain = format!("{error:#}");
    let mut context = user_friendly_error(error);
    if context.details.is_none() && chain != context.error.to_string() {
        context = context.with_details(chain);
    }
    context.display();
    EXIT_FAILURE
}
