//! `c2m convert` — Convert a docker-compose.yml into an edge deployment.

use std::path::PathBuf;

use c2m_common::config::{ConvertConfig, CredentialSyntax, NetworkPolicy};
use c2m_common::constants::DEFAULT_REGISTRY;
use c2m_manifest::convert::{ConvertReport, ConvertType, convert};
use clap::Args;

use crate::output::format_options_size;

/// Arguments for the `convert` subcommand.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Output kind: `file` (wire-form manifest) or `project` (directory).
    #[arg(short = 't', long = "type")]
    pub kind: ConvertType,

    /// Path to the docker-compose.yml file.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Manifest file (file mode) or output directory (project mode).
    #[arg(short, long)]
    pub output: PathBuf,

    /// Container registry address for module repositories.
    #[arg(short, long, env = "C2M_REGISTRY", default_value = DEFAULT_REGISTRY)]
    pub registry: String,

    /// Remove custom network settings too instead of only warning.
    #[arg(long)]
    pub strip_networks: bool,

    /// Write credential placeholders as `$VAR` instead of `${VAR}`.
    #[arg(long)]
    pub bare_credentials: bool,
}

impl ConvertArgs {
    fn config(&self) -> ConvertConfig {
        ConvertConfig {
            registry: self.registry.clone(),
            network_policy: if self.strip_networks {
                NetworkPolicy::StripAll
            } else {
                NetworkPolicy::StripDefault
            },
            credential_syntax: if self.bare_credentials {
                CredentialSyntax::Bare
            } else {
                CredentialSyntax::Braced
            },
        }
    }
}

/// Executes the `convert` command.
///
/// # Errors
///
/// Returns an error if the project cannot be resolved or the output cannot
/// be written.
pub fn execute(args: ConvertArgs) -> anyhow::Result<()> {
    let config = args.config();
    let report = convert(args.kind, &args.input, &args.output, &config)?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &ConvertReport) {
    println!(
        "Converted project {} -> {} ({})",
        report.project,
        report.manifest.display(),
        report.kind
    );
    println!("{:<24} {:<12} {:<48}", "MODULE", "OPTIONS", "IMAGE");
    for module in &report.modules {
        let image = if module.image.is_empty() {
            "-"
        } else {
            module.image.as_str()
        };
        println!(
            "{:<24} {:<12} {:<48}",
            module.name,
            format_options_size(module.create_options_size),
            image
        );
        if let Some(dir) = &module.staged {
            println!("  staged build context in {}", dir.display());
        }
    }
    for warning in &report.warnings {
        println!("warning: {warning}");
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::commands::{Cli, Command};

    fn parse(args: &[&str]) -> ConvertArgs {
        let cli = Cli::try_parse_from(args).expect("valid arguments");
        match cli.command {
            Command::Convert(args) => args,
            Command::Split(_) => unreachable!("parsed convert"),
        }
    }

    #[test]
    fn defaults_to_local_registry_and_lenient_networks() {
        let args = parse(&["c2m", "convert", "-t", "file", "-i", "dc.yml", "-o", "out.json"]);
        assert_eq!(args.kind, ConvertType::File);
        let config = args.config();
        assert_eq!(config.registry, "localhost:5000");
        assert_eq!(config.network_policy, NetworkPolicy::StripDefault);
        assert_eq!(config.credential_syntax, CredentialSyntax::Braced);
    }

    #[test]
    fn flags_select_strict_policies() {
        let args = parse(&[
            "c2m",
            "convert",
            "--type",
            "project",
            "--input",
            "dc.yml",
            "--output",
            "out",
            "-r",
            "myregistry.io",
            "--strip-networks",
            "--bare-credentials",
        ]);
        assert_eq!(args.kind, ConvertType::Project);
        let config = args.config();
        assert_eq!(config.registry, "myregistry.io");
        assert_eq!(config.network_policy, NetworkPolicy::StripAll);
        assert_eq!(config.credential_syntax, CredentialSyntax::Bare);
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(Cli::try_parse_from(["c2m", "convert", "-t", "zip", "-i", "a", "-o", "b"]).is_err());
    }
}
