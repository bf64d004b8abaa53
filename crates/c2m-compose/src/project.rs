//! Project loading: file, directory, name and services.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use c2m_common::constants::DEFAULT_NETWORK;
use c2m_common::error::{ConvertError, Result};

use crate::interpolate::Environment;
use crate::model::{ComposeFile, RawExternal, RawNetwork, RawVolume};
use crate::service::{ResolveContext, Service};

/// A resolved Compose project.
#[derive(Debug, Clone)]
pub struct Project {
    /// Normalized project name.
    pub name: String,
    /// Absolute project directory.
    pub directory: PathBuf,
    /// Services sorted by name.
    pub services: Vec<Service>,
    default_network: String,
}

impl Project {
    /// Loads a Compose file; its parent directory is the project directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable or malformed, or
    /// if any service fails to resolve.
    pub fn load(compose_file: &Path) -> Result<Self> {
        if !compose_file.is_file() {
            return Err(ConvertError::NotFound {
                kind: "compose file",
                id: compose_file.display().to_string(),
            });
        }
        let absolute = std::path::absolute(compose_file)
            .map_err(|e| ConvertError::io(compose_file, e))?;
        let directory = absolute
            .parent()
            .map_or_else(|| PathBuf::from("/"), Path::to_path_buf);
        tracing::info!(file = %absolute.display(), "loading compose project");

        let content =
            std::fs::read_to_string(&absolute).map_err(|e| ConvertError::io(&absolute, e))?;
        let env = Environment::capture(&directory)?;
        Self::from_yaml(&content, &directory, &env).map_err(|e| match e {
            ConvertError::Config { message } => ConvertError::Compose {
                path: absolute.clone(),
                message,
            },
            other => other,
        })
    }

    /// Resolves a project from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed YAML, failed interpolation, an empty
    /// project name, or a service that fails to resolve.
    pub fn from_yaml(content: &str, directory: &Path, env: &Environment) -> Result<Self> {
        let mut value: serde_yaml::Value = serde_yaml::from_str(content)?;
        env.interpolate_value(&mut value)?;
        let file: ComposeFile = serde_yaml::from_value(value)?;

        let name = match file.name.as_deref() {
            Some(explicit) => normalize_name(explicit),
            None => directory
                .file_name()
                .map(|n| normalize_name(&n.to_string_lossy()))
                .unwrap_or_default(),
        };
        if name.is_empty() {
            return Err(ConvertError::Config {
                message: format!(
                    "cannot derive a project name from {}; set the top-level `name`",
                    directory.display()
                ),
            });
        }

        let networks = declared_networks(&name, &file.networks);
        let volumes = declared_volumes(&file.volumes);
        let ctx = ResolveContext {
            project: &name,
            directory,
            env,
            networks: &networks,
            volumes: &volumes,
        };
        let default_network = ctx.default_network();

        let services = file
            .services
            .into_iter()
            .map(|(service_name, raw)| Service::resolve(&service_name, raw, &ctx))
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(project = %name, services = services.len(), "resolved compose project");
        Ok(Self {
            name,
            directory: directory.to_path_buf(),
            services,
            default_network,
        })
    }

    /// Engine name of the network services join when none is configured.
    #[must_use]
    pub fn default_network(&self) -> &str {
        &self.default_network
    }

    /// Looks up a service by name.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Iterates service names in project order.
    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.services.iter().map(|s| s.name.as_str())
    }
}

/// Lowercases and keeps only `[a-z0-9_-]`.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

fn declared_networks(
    project: &str,
    networks: &BTreeMap<String, Option<RawNetwork>>,
) -> BTreeMap<String, String> {
    let mut names: BTreeMap<String, String> = networks
        .iter()
        .map(|(key, def)| {
            let def = def.clone().unwrap_or_default();
            let engine = external_name(def.external.as_ref(), key)
                .or(def.name)
                .unwrap_or_else(|| format!("{project}_{key}"));
            (key.clone(), engine)
        })
        .collect();
    let _ = names
        .entry(DEFAULT_NETWORK.to_string())
        .or_insert_with(|| format!("{project}_{DEFAULT_NETWORK}"));
    names
}

fn declared_volumes(volumes: &BTreeMap<String, Option<RawVolume>>) -> BTreeMap<String, String> {
    volumes
        .iter()
        .filter_map(|(key, def)| {
            let def = def.clone().unwrap_or_default();
            let engine = external_name(def.external.as_ref(), key).or(def.name)?;
            Some((key.clone(), engine))
        })
        .collect()
}

fn external_name(external: Option<&RawExternal>, key: &str) -> Option<String> {
    match external {
        Some(RawExternal::Flag(true)) => Some(key.to_string()),
        Some(RawExternal::Named { name }) => Some(name.clone()),
        Some(RawExternal::Flag(false)) | None => None,
    }
}
