// CLI module
// Command-line interface and the stdin/stdout chat transport

mod args;
mod repl;

pub use args::CliArgs;
pub use repl::run_repl;

use clap::Parser;

/// Parse command-line arguments using clap
///
/// If parsing fails (e.g., invalid arguments or --help flag), clap displays
/// an error message or help text and exits the process.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
