//! CLI argument parsing for baton.
//!
//! Uses clap derive macros for declarative argument definitions. The CLI
//! is only a transport: it supplies `(text, caller)` pairs and prints the
//! replies. All token logic lives in `commands`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Baton: named-token mutual exclusion driven by short text commands.
///
/// Tokens are created, acquired, released, kicked and inspected with the
/// same verbs the chat command accepts, e.g. `baton exec -u bob acquire deploy-lock`.
#[derive(Parser, Debug)]
#[command(name = "baton")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// YAML configuration file.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory of the file store (overrides config and BATON_STORE_DIR).
    #[arg(long, global = true, value_name = "DIR")]
    pub store_dir: Option<PathBuf>,

    /// Use a process-local in-memory store instead of the file store.
    #[arg(long, global = true, conflicts_with = "store_dir")]
    pub memory: bool,

    /// Print replies as chat JSON payloads.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available transports.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a single command and print its reply.
    ///
    /// Example: `baton exec --user bob -- acquire deploy-lock`
    Exec(ExecArgs),

    /// Read commands from stdin, one per line, printing one reply each.
    Shell(ShellArgs),
}

/// Arguments for the `exec` transport.
#[derive(Parser, Debug)]
pub struct ExecArgs {
    /// Caller identity.
    #[arg(short, long)]
    pub user: String,

    /// Command text: a verb followed by its arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub words: Vec<String>,
}

/// Arguments for the `shell` transport.
#[derive(Parser, Debug)]
pub struct ShellArgs {
    /// Caller identity for every line.
    #[arg(short, long)]
    pub user: String,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
