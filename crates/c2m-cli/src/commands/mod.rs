//! CLI command definitions and dispatch.

pub mod convert;
pub mod split;

use clap::{Parser, Subcommand};

/// Compose to edge deployment manifest converter.
#[derive(Parser, Debug)]
#[command(name = c2m_common::constants::BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert a docker-compose.yml into a deployment manifest or project.
    Convert(convert::ConvertArgs),
    /// Turn a deployment template into a wire-form manifest.
    Split(split::SplitArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Convert(args) => convert::execute(args),
        Command::Split(args) => split::execute(args),
    }
}
