//! Raw deserialization model of a Compose file.
//!
//! These types mirror the YAML closely, including the places where Compose
//! accepts several shapes for one field. [`crate::service`] normalizes them.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

/// Root of a Compose file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComposeFile {
    /// File format version, if declared.
    pub version: Option<Scalar>,
    /// Explicit project name.
    pub name: Option<String>,
    /// Service definitions keyed by name.
    #[serde(default)]
    pub services: BTreeMap<String, RawService>,
    /// Top-level network definitions.
    #[serde(default)]
    pub networks: BTreeMap<String, Option<RawNetwork>>,
    /// Top-level named volume definitions.
    #[serde(default)]
    pub volumes: BTreeMap<String, Option<RawVolume>>,
}

/// A YAML scalar accepted where Compose allows "string or number".
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Boolean literal.
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// Floating point literal.
    Float(f64),
    /// String literal.
    Str(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

/// A string or a list of strings (`command`, `dns`, `env_file`, ...).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    /// Single string.
    Str(String),
    /// List of scalars.
    List(Vec<Scalar>),
}

impl StringOrList {
    /// Returns the entries as owned strings, one per list item.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::Str(s) => vec![s],
            Self::List(items) => items.iter().map(ToString::to_string).collect(),
        }
    }
}

/// A `KEY=value` list or a `KEY: value` mapping.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ListOrMap {
    /// Sequence form.
    List(Vec<Scalar>),
    /// Mapping form, declaration order preserved.
    Map(serde_yaml::Mapping),
}

/// The `build` section: either a context path or a full specification.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawBuild {
    /// `build: ./dir`
    Context(String),
    /// `build: { context: ..., dockerfile: ... }`
    Spec(RawBuildSpec),
}

/// Long form of the `build` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBuildSpec {
    /// Build context directory.
    pub context: Option<String>,
    /// Dockerfile name relative to the context.
    pub dockerfile: Option<String>,
    /// Build arguments.
    pub args: Option<ListOrMap>,
    /// Images used as cache sources.
    pub cache_from: Option<Vec<String>>,
    /// Image labels.
    pub labels: Option<ListOrMap>,
    /// Shared memory size for build containers.
    pub shm_size: Option<Scalar>,
    /// Build stage to stop at.
    pub target: Option<String>,
}

/// A `ports` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawPort {
    /// `"8080:80/udp"` or `80`.
    Short(Scalar),
    /// `{ target: 80, published: 8080 }`.
    Long(RawPortSpec),
}

/// Long syntax of a `ports` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPortSpec {
    /// Container port.
    pub target: u16,
    /// Host port or range.
    pub published: Option<Scalar>,
    /// `tcp` or `udp`.
    pub protocol: Option<String>,
    /// Host interface to bind.
    pub host_ip: Option<String>,
}

/// A `volumes` entry of a service.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawVolumeMount {
    /// `"./data:/data:ro"`.
    Short(String),
    /// `{ type: bind, source: ./data, target: /data }`.
    Long(RawVolumeSpec),
}

/// Long syntax of a service `volumes` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RawVolumeSpec {
    /// `bind`, `volume` or `tmpfs`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Host path or volume name.
    pub source: Option<String>,
    /// Path inside the container.
    pub target: String,
    /// Mount read-only.
    #[serde(default)]
    pub read_only: bool,
}

/// The `networks` section of a service.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawServiceNetworks {
    /// `networks: [front, back]`
    List(Vec<String>),
    /// `networks: { front: { aliases: [...] } }`
    Map(BTreeMap<String, Option<RawServiceNetwork>>),
}

/// Per-network attachment settings of a service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawServiceNetwork {
    /// Extra DNS aliases on this network.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Attachment priority; higher wins the primary slot.
    #[serde(default)]
    pub priority: i64,
}

/// A top-level network definition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawNetwork {
    /// Explicit engine name.
    pub name: Option<String>,
    /// Whether the network is managed outside the project.
    pub external: Option<RawExternal>,
}

/// A top-level volume definition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVolume {
    /// Explicit engine name.
    pub name: Option<String>,
    /// Whether the volume is managed outside the project.
    pub external: Option<RawExternal>,
}

/// `external: true` or the legacy `external: { name: ... }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawExternal {
    /// Flag form.
    Flag(bool),
    /// Named form.
    Named {
        /// Engine name of the external resource.
        name: String,
    },
}

/// A `healthcheck` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawHealthcheck {
    /// Probe command.
    pub test: Option<StringOrList>,
    /// Time between probes.
    pub interval: Option<Scalar>,
    /// Probe timeout.
    pub timeout: Option<Scalar>,
    /// Grace period after start.
    pub start_period: Option<Scalar>,
    /// Consecutive failures before unhealthy.
    pub retries: Option<u32>,
    /// Disable any image-defined healthcheck.
    #[serde(default)]
    pub disable: bool,
}

/// One service definition as written in the file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawService {
    /// Image reference.
    pub image: Option<String>,
    /// Build section.
    pub build: Option<RawBuild>,
    /// Command override.
    pub command: Option<StringOrList>,
    /// Entrypoint override.
    pub entrypoint: Option<StringOrList>,
    /// Environment variables.
    pub environment: Option<ListOrMap>,
    /// Files with additional environment variables.
    pub env_file: Option<StringOrList>,
    /// Published ports.
    #[serde(default)]
    pub ports: Vec<RawPort>,
    /// Ports exposed without publishing.
    #[serde(default)]
    pub expose: Vec<Scalar>,
    /// Volume mounts.
    #[serde(default)]
    pub volumes: Vec<RawVolumeMount>,
    /// Container labels.
    pub labels: Option<ListOrMap>,
    /// Explicit network mode.
    pub network_mode: Option<String>,
    /// Networks to attach to.
    pub networks: Option<RawServiceNetworks>,
    /// Restart policy (`no`, `always`, `on-failure[:N]`, `unless-stopped`).
    pub restart: Option<String>,
    /// Container hostname.
    pub hostname: Option<String>,
    /// Container domain name.
    pub domainname: Option<String>,
    /// User to run as.
    pub user: Option<Scalar>,
    /// Working directory.
    pub working_dir: Option<String>,
    /// MAC address.
    pub mac_address: Option<String>,
    /// Signal used to stop the container.
    pub stop_signal: Option<String>,
    /// Time to wait before killing on stop.
    pub stop_grace_period: Option<Scalar>,
    /// Container healthcheck.
    pub healthcheck: Option<RawHealthcheck>,
    /// OCI runtime name.
    pub runtime: Option<String>,
    /// Keep stdin open.
    #[serde(default)]
    pub stdin_open: bool,
    /// Allocate a TTY.
    #[serde(default)]
    pub tty: bool,
    /// Run privileged.
    #[serde(default)]
    pub privileged: bool,
    /// Run an init process.
    #[serde(default)]
    pub init: bool,
    /// Added kernel capabilities.
    #[serde(default)]
    pub cap_add: Vec<String>,
    /// Dropped kernel capabilities.
    #[serde(default)]
    pub cap_drop: Vec<String>,
    /// Device mappings.
    #[serde(default)]
    pub devices: Vec<String>,
    /// Custom DNS servers.
    pub dns: Option<StringOrList>,
    /// Extra `/etc/hosts` entries.
    pub extra_hosts: Option<ListOrMap>,
    /// Memory limit.
    pub mem_limit: Option<Scalar>,
    /// Size of `/dev/shm`.
    pub shm_size: Option<Scalar>,
}

/// Renders a YAML mapping value as Compose does for list-or-map fields.
///
/// `null` yields `None` so callers can decide how an unset value behaves.
pub fn scalar_value(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Null => None,
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        other => serde_yaml::to_string(other)
            .ok()
            .map(|s| s.trim_end().to_string()),
    }
}
