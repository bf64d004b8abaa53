//! `c2m split` — Turn a deployment template into a wire-form manifest.

use std::path::PathBuf;

use c2m_manifest::convert::split_file;
use clap::Args;

/// Arguments for the `split` subcommand.
#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Path to the deployment template (e.g. deployment.template.json).
    pub input: PathBuf,

    /// Path of the manifest to write.
    pub output: PathBuf,
}

/// Executes the `split` command.
///
/// # Errors
///
/// Returns an error if the template cannot be read or a module's
/// create-options exceed the wire limit.
pub fn execute(args: SplitArgs) -> anyhow::Result<()> {
    split_file(&args.input, &args.output)?;
    println!("Split {} -> {}", args.input.display(), args.output.display());
    Ok(())
}
