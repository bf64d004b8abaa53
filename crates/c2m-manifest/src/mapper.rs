//! Container option mapping.
//!
//! Turns one resolved service into a manifest [`Module`]: the service's
//! creation parameters are shaped like an engine create request, stripped of
//! empty values and of network settings the edge runtime cannot use, and
//! split from the image reference.

use std::fmt;

use c2m_common::config::NetworkPolicy;
use c2m_common::constants::{CREATE_OPTIONS_LIMIT, MODULE_RECORD_VERSION};
use c2m_common::types::RestartPolicy;
use c2m_compose::create_options::ContainerCreateOptions;
use c2m_compose::service::Service;
use serde_json::{Map, Value, json};

use crate::module::{Module, ModuleSettings, ModuleStatus, ModuleType, build_placeholder};
use crate::split::wire_string;
use crate::value::without_falsy;

const HOST_CONFIG: &str = "HostConfig";
const NETWORK_MODE: &str = "NetworkMode";
const NETWORKING_CONFIG: &str = "NetworkingConfig";

/// A non-fatal anomaly found while mapping a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingWarning {
    /// Custom network settings were kept although the runtime ignores them.
    CustomNetwork {
        /// Service name.
        service: String,
        /// Network mode the service asked for.
        network: String,
    },
    /// Custom network settings were removed.
    NetworkStripped {
        /// Service name.
        service: String,
        /// Network mode that was removed.
        network: String,
    },
    /// Serialized create-options reach the runtime's size limit.
    OversizedOptions {
        /// Service name.
        service: String,
        /// Serialized size in bytes.
        size: usize,
        /// Runtime limit in bytes.
        limit: usize,
    },
}

impl fmt::Display for MappingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CustomNetwork { service, network } => write!(
                f,
                "service {service}: network \"{network}\" is kept, but the edge runtime does not support custom networks"
            ),
            Self::NetworkStripped { service, network } => write!(
                f,
                "service {service}: edge runtime does not support network configuration, removed \"{network}\""
            ),
            Self::OversizedOptions {
                service,
                size,
                limit,
            } => write!(
                f,
                "service {service}: createOptions is {size} bytes, the edge runtime accepts less than {limit}"
            ),
        }
    }
}

/// Result of mapping one service.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedModule {
    /// Module name (the service name).
    pub name: String,
    /// Manifest record.
    pub module: Module,
    /// Anomalies worth reporting.
    pub warnings: Vec<MappingWarning>,
    /// Serialized create-options size in bytes.
    pub create_options_size: usize,
}

/// Maps a service onto a manifest module.
///
/// `default_network` is the engine name of the project's implicit network;
/// settings naming it are always removed.
pub fn map_service(service: &Service, default_network: &str, policy: NetworkPolicy) -> MappedModule {
    let opts = service.create_options();
    let mut config = without_falsy(engine_config(&opts));
    let mut warnings = Vec::new();

    if let Some(Value::Object(host)) = config.remove(HOST_CONFIG) {
        let _ = config.insert(HOST_CONFIG.into(), Value::Object(without_falsy(host)));
    }

    let on_default = service.network_mode.network_name() == Some(default_network);
    let network = service.network_mode.engine_value();
    let has_network = has_network_settings(&config);
    if on_default || policy == NetworkPolicy::StripAll {
        strip_network_settings(&mut config);
        if has_network && !on_default {
            tracing::warn!(service = %service.name, network = %network, "removing unsupported network configuration");
            warnings.push(MappingWarning::NetworkStripped {
                service: service.name.clone(),
                network,
            });
        }
    } else if has_network {
        tracing::warn!(service = %service.name, network = %network, "edge runtime does not support custom networks");
        warnings.push(MappingWarning::CustomNetwork {
            service: service.name.clone(),
            network,
        });
    }

    if config
        .get(HOST_CONFIG)
        .and_then(Value::as_object)
        .is_some_and(Map::is_empty)
    {
        let _ = config.remove(HOST_CONFIG);
    }

    let restart_policy = RestartPolicy::from_engine_name(
        config
            .get(HOST_CONFIG)
            .and_then(|h| h.pointer("/RestartPolicy/Name"))
            .and_then(Value::as_str),
    );

    let literal_image = config
        .remove("Image")
        .and_then(|v| v.as_str().map(ToString::to_string))
        .unwrap_or_else(|| service.image.clone());
    let image = if service.has_build() {
        build_placeholder(&service.name)
    } else {
        literal_image
    };

    let create_options = Value::Object(config);
    let create_options_size = wire_string(&create_options).map_or(0, |s| s.len());
    if create_options_size >= CREATE_OPTIONS_LIMIT {
        tracing::warn!(
            service = %service.name,
            size = create_options_size,
            limit = CREATE_OPTIONS_LIMIT,
            "createOptions exceeds the edge runtime limit"
        );
        warnings.push(MappingWarning::OversizedOptions {
            service: service.name.clone(),
            size: create_options_size,
            limit: CREATE_OPTIONS_LIMIT,
        });
    }

    tracing::debug!(service = %service.name, image = %image, policy = %restart_policy, "mapped service");
    MappedModule {
        name: service.name.clone(),
        module: Module {
            version: MODULE_RECORD_VERSION.to_string(),
            kind: ModuleType::Docker,
            status: ModuleStatus::Running,
            restart_policy,
            settings: ModuleSettings {
                image,
                create_options,
            },
        },
        warnings,
        create_options_size,
    }
}

/// Shapes creation parameters like an engine create request.
///
/// Unset values are kept as `null`/empty so the caller decides what to drop.
pub fn engine_config(opts: &ContainerCreateOptions) -> Map<String, Value> {
    let path_set = |items: &[String]| -> Value {
        Value::Object(items.iter().map(|p| (p.clone(), json!({}))).collect())
    };
    let list = |items: &[String]| -> Value {
        if items.is_empty() {
            Value::Null
        } else {
            json!(items)
        }
    };

    let mut config = Map::new();
    let mut set = |key: &str, value: Value| {
        let _ = config.insert(key.to_string(), value);
    };
    set("Hostname", json!(opts.hostname));
    set("Domainname", json!(opts.domainname));
    set("ExposedPorts", path_set(&opts.ports));
    set("User", json!(opts.user));
    set("Tty", json!(opts.tty));
    set("OpenStdin", json!(opts.stdin_open));
    set("StdinOnce", json!(opts.stdin_open));
    set("AttachStdin", json!(opts.stdin_open));
    set("AttachStdout", json!(!opts.detach));
    set("AttachStderr", json!(!opts.detach));
    set("Env", list(&opts.environment));
    set("Cmd", list(&opts.command));
    set("Image", json!(opts.image));
    set("Volumes", path_set(&opts.volumes));
    set("NetworkDisabled", json!(opts.network_disabled));
    set("Entrypoint", list(&opts.entrypoint));
    set("WorkingDir", json!(opts.working_dir));
    set(HOST_CONFIG, Value::Object(opts.host_config.clone()));
    set(NETWORKING_CONFIG, opts.networking_config.clone().unwrap_or(Value::Null));
    set("MacAddress", json!(opts.mac_address));
    set("Labels", Value::Object(opts.labels.clone()));
    set("StopSignal", json!(opts.stop_signal));
    set("Healthcheck", opts.healthcheck.clone().unwrap_or(Value::Null));
    set("StopTimeout", json!(opts.stop_timeout));
    set("Runtime", json!(opts.runtime));
    config
}

fn has_network_settings(config: &Map<String, Value>) -> bool {
    config.contains_key(NETWORKING_CONFIG)
        || config
            .get(HOST_CONFIG)
            .and_then(Value::as_object)
            .is_some_and(|h| h.contains_key(NETWORK_MODE))
}

fn strip_network_settings(config: &mut Map<String, Value>) {
    if let Some(host) = config.get_mut(HOST_CONFIG).and_then(Value::as_object_mut) {
        let _ = host.remove(NETWORK_MODE);
    }
    let _ = config.remove(NETWORKING_CONFIG);
}
