//! End-to-end conversion of a Compose project.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use c2m_common::config::{ConvertConfig, NetworkPolicy};
use c2m_common::constants::{DEPLOYMENT_TEMPLATE_FILE, ENV_FILE, MODULES_DIR};
use c2m_common::error::{ConvertError, Result};
use c2m_compose::project::Project;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::build::stage_module;
use crate::emit::{create_fresh_dir, write_env_file, write_json};
use crate::mapper::{MappedModule, MappingWarning, map_service};
use crate::split;
use crate::template::{DeploymentManifest, assemble};

/// Output artifact of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvertType {
    /// A single manifest file in wire form.
    File,
    /// A project directory with template, module directories and `.env`.
    Project,
}

impl FromStr for ConvertType {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "file" => Ok(Self::File),
            "project" => Ok(Self::Project),
            other => Err(ConvertError::Config {
                message: format!("unknown convert type \"{other}\", expected \"file\" or \"project\""),
            }),
        }
    }
}

impl fmt::Display for ConvertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Project => f.write_str("project"),
        }
    }
}

/// Per-module line of a [`ConvertReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSummary {
    /// Module name.
    pub name: String,
    /// Image reference written to the manifest.
    pub image: String,
    /// Serialized create-options size in bytes.
    pub create_options_size: usize,
    /// Module directory, for staged build modules.
    pub staged: Option<PathBuf>,
}

/// What a conversion produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertReport {
    /// Artifact kind.
    pub kind: ConvertType,
    /// Project name.
    pub project: String,
    /// Manifest file written.
    pub manifest: PathBuf,
    /// One entry per module, in name order.
    pub modules: Vec<ModuleSummary>,
    /// Non-fatal anomalies.
    pub warnings: Vec<MappingWarning>,
}

/// Maps every service of `project`.
pub fn map_project(project: &Project, policy: NetworkPolicy) -> Vec<MappedModule> {
    project
        .services
        .iter()
        .map(|service| map_service(service, project.default_network(), policy))
        .collect()
}

/// Builds the deployment manifest of `project`.
pub fn build_manifest(project: &Project, config: &ConvertConfig) -> (DeploymentManifest, Vec<MappedModule>) {
    let mapped = map_project(project, config.network_policy);
    let manifest = assemble(
        mapped.iter().map(|m| (m.name.clone(), m.module.clone())),
        config.credential_syntax,
    );
    (manifest, mapped)
}

/// Converts the Compose file `input` into `output`.
///
/// File mode writes only the wire-form manifest; the `.env` credentials file
/// is a project mode output.
///
/// # Errors
///
/// Returns an error if the project cannot be resolved, a module's
/// create-options exceed the wire limit (file mode), a build context is
/// missing, an output directory collides, or a write fails. Project mode
/// may leave partial output behind on failure.
pub fn convert(kind: ConvertType, input: &Path, output: &Path, config: &ConvertConfig) -> Result<ConvertReport> {
    let project = Project::load(input)?;
    tracing::info!(
        project = %project.name,
        services = project.services.len(),
        kind = %kind,
        "converting compose project"
    );
    let (manifest, mapped) = build_manifest(&project, config);

    let mut modules: Vec<ModuleSummary> = mapped
        .iter()
        .map(|m| ModuleSummary {
            name: m.name.clone(),
            image: m.module.settings.image.clone(),
            create_options_size: m.create_options_size,
            staged: None,
        })
        .collect();
    modules.sort_by(|a, b| a.name.cmp(&b.name));
    let warnings: Vec<MappingWarning> = mapped.into_iter().flat_map(|m| m.warnings).collect();

    let manifest_path = match kind {
        ConvertType::File => {
            let wire = manifest.to_wire()?;
            write_json(output, &wire, 2, false)?;
            output.to_path_buf()
        }
        ConvertType::Project => write_project(&project, &manifest, output, config, &mut modules)?,
    };

    tracing::info!(path = %manifest_path.display(), modules = modules.len(), "conversion complete");
    Ok(ConvertReport {
        kind,
        project: project.name,
        manifest: manifest_path,
        modules,
        warnings,
    })
}

fn write_project(
    project: &Project,
    manifest: &DeploymentManifest,
    output: &Path,
    config: &ConvertConfig,
    modules: &mut [ModuleSummary],
) -> Result<PathBuf> {
    for service in &project.services {
        if let Some(build) = &service.build {
            if !build.context.is_dir() {
                return Err(ConvertError::NotFound {
                    kind: "build context",
                    id: build.context.display().to_string(),
                });
            }
        }
    }

    fs::create_dir_all(output).map_err(|e| ConvertError::io(output, e))?;
    let modules_dir = output.join(MODULES_DIR);
    create_fresh_dir(&modules_dir)?;

    let template_path = output.join(DEPLOYMENT_TEMPLATE_FILE);
    write_json(&template_path, &manifest.to_value()?, 2, false)?;

    for service in &project.services {
        let staged = stage_module(service, &modules_dir, &config.registry)?;
        if let Some(summary) = modules.iter_mut().find(|m| m.name == service.name) {
            summary.staged = staged;
        }
    }

    write_env_file(&output.join(ENV_FILE), &config.registry)?;
    Ok(template_path)
}

/// Turns the template file `input` into a wire-form manifest at `output`.
///
/// # Errors
///
/// Returns an error if the template cannot be read or parsed, a module's
/// create-options exceed the wire limit, or the output cannot be written.
pub fn split_file(input: &Path, output: &Path) -> Result<()> {
    let text = fs::read_to_string(input).map_err(|e| ConvertError::io(input, e))?;
    let template: Value = serde_json::from_str(&text)?;
    let wire = split::to_wire(template)?;
    write_json(output, &wire, 2, false)?;
    tracing::info!(input = %input.display(), output = %output.display(), "split manifest template");
    Ok(())
}
