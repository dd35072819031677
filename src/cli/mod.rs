//! CLI for the export checker.
//!
//! Usage mirrors the original workflow: configure and build the library,
//! then run `export-check [static|shared]` from inside the CMake build
//! directory.
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros. Command
//! functions return `CliResult<T>` instead of calling `process::exit`; only
//! the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::Parser;

use crate::check::{ConsoleReporter, Runner};
use crate::cmake::CmakeCli;
use crate::component::LinkType;
use crate::scenario::{Dirs, ScenarioKind};

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Verify that find_package component resolution matches the library's
/// dependency graph, across build-tree and install discovery scenarios.
#[derive(Parser, Debug)]
#[command(name = "export-check")]
#[command(version = VERSION)]
#[command(about = "CMake export/install verification for libevent", long_about = None)]
pub struct Cli {
    /// Link type for the probe executable: "static" or "shared"
    #[arg(value_name = "LINK_TYPE")]
    pub link_type: Option<String>,

    /// Evaluate the disabled cross-component cases as well
    #[arg(long = "all-cases")]
    pub all_cases: bool,

    /// Restrict the run to specific scenarios (repeatable):
    /// build-tree, system-install, temp-install
    #[arg(long = "scenario", value_name = "NAME")]
    pub scenarios: Vec<String>,

    /// Directory containing the probe project's CMakeLists.txt
    /// (default: the directory holding this executable)
    #[arg(long = "project-dir", value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    /// Stream build-tool output instead of suppressing it
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. `execute()`
/// returns `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the check run and return its exit code.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    let link_type = parse_link_type(cli.link_type.as_deref());
    let scenarios = parse_scenarios(&cli.scenarios)?;

    let working_dir = env::current_dir()
        .map_err(|e| CliError::failure(format!("cannot determine working directory: {e}")))?;
    let project_dir = match cli.project_dir {
        Some(dir) => dir,
        None => default_project_dir()?,
    };
    let dirs = Dirs {
        working_dir,
        project_dir,
    };

    println!("[export-check] use {link_type} library");
    tracing::info!(
        %link_type,
        working_dir = %dirs.working_dir.display(),
        project_dir = %dirs.project_dir.display(),
        "starting export check"
    );

    let tool = CmakeCli::new(cli.verbose);
    let runner = Runner {
        tool: &tool,
        dirs: &dirs,
        link_type,
        all_cases: cli.all_cases,
    };
    let mut reporter = ConsoleReporter;

    let summary = runner
        .run(&scenarios, &mut reporter)
        .map_err(|e| CliError::failure(e.to_string()))?;

    if summary.failed > 0 {
        // Summary already printed; exit non-zero without extra noise.
        Err(CliError::new("", ExitCode::FAILURE))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Anything other than the exact word "static" selects shared linking,
/// matching the original checker's argument handling.
fn parse_link_type(arg: Option<&str>) -> LinkType {
    match arg {
        Some("static") => LinkType::Static,
        _ => LinkType::Shared,
    }
}

fn parse_scenarios(names: &[String]) -> CliResult<Vec<ScenarioKind>> {
    if names.is_empty() {
        return Ok(ScenarioKind::ALL.to_vec());
    }
    names
        .iter()
        .map(|name| match name.as_str() {
            "build-tree" => Ok(ScenarioKind::BuildTree),
            "system-install" => Ok(ScenarioKind::SystemInstall),
            "temp-install" => Ok(ScenarioKind::TempInstall),
            other => Err(CliError::failure(format!(
                "unknown scenario '{other}' (expected build-tree, system-install, or temp-install)"
            ))),
        })
        .collect()
}

/// The probe project ships next to the tool, so the executable's directory
/// is the analogue of the original script's directory.
fn default_project_dir() -> CliResult<PathBuf> {
    let exe = env::current_exe()
        .map_err(|e| CliError::failure(format!("cannot locate this executable: {e}")))?;
    exe.parent()
        .map(|p| p.to_path_buf())
        .ok_or_else(|| CliError::failure("cannot determine the probe project directory"))
}

// ============================================================================
// Tests
// ============================================================================
