//! Deployment manifest assembly.
//!
//! [`DeploymentManifest::base`] produces a fresh template holding the two
//! system modules, the hub's store-and-forward settings and registry
//! credential placeholders. [`assemble`] fills in the user modules.

use std::collections::BTreeMap;

use c2m_common::config::CredentialSyntax;
use c2m_common::constants::{
    EDGE_AGENT_IMAGE, EDGE_HUB_IMAGE, EDGE_HUB_PORTS, HUB_TIME_TO_LIVE_SECS,
    MANIFEST_SCHEMA_VERSION, MIN_DOCKER_VERSION, REGISTRY_CREDENTIAL_KEY, SCHEMA_TEMPLATE_VERSION,
};
use c2m_common::error::Result;
use c2m_common::types::RestartPolicy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::module::{Module, ModuleSettings, ModuleStatus, ModuleType, SystemModule};
use crate::split;

/// Root of a deployment manifest in template form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentManifest {
    /// Template marker, removed in wire form.
    #[serde(rename = "$schema-template")]
    pub schema_template: String,
    /// Module twins.
    #[serde(rename = "modulesContent")]
    pub modules_content: ModulesContent,
}

/// Desired properties of the agent and hub twins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModulesContent {
    /// Edge agent twin.
    #[serde(rename = "$edgeAgent")]
    pub edge_agent: AgentTwin,
    /// Edge hub twin.
    #[serde(rename = "$edgeHub")]
    pub edge_hub: HubTwin,
}

/// Edge agent twin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTwin {
    /// Desired properties.
    #[serde(rename = "properties.desired")]
    pub desired: AgentDesired,
}

/// Desired properties of the edge agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDesired {
    /// Schema version.
    pub schema_version: String,
    /// Container runtime settings.
    pub runtime: Runtime,
    /// Agent and hub modules.
    pub system_modules: SystemModules,
    /// User modules keyed by service name.
    pub modules: BTreeMap<String, Module>,
}

/// Container runtime of the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Runtime {
    /// Runtime kind.
    #[serde(rename = "type")]
    pub kind: ModuleType,
    /// Runtime settings.
    pub settings: RuntimeSettings,
}

/// Docker runtime settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSettings {
    /// Minimum engine version.
    pub min_docker_version: String,
    /// Engine logging options.
    pub logging_options: String,
    /// Registry credentials keyed by entry name.
    pub registry_credentials: BTreeMap<String, RegistryCredential>,
}

/// One set of registry credentials, as substitution tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryCredential {
    /// User name token.
    pub username: String,
    /// Password token.
    pub password: String,
    /// Registry address token.
    pub address: String,
}

/// The fixed system modules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemModules {
    /// Edge agent.
    pub edge_agent: SystemModule,
    /// Edge hub.
    pub edge_hub: SystemModule,
}

/// Edge hub twin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubTwin {
    /// Desired properties.
    #[serde(rename = "properties.desired")]
    pub desired: HubDesired,
}

/// Desired properties of the edge hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubDesired {
    /// Schema version.
    pub schema_version: String,
    /// Message routes.
    pub routes: Map<String, Value>,
    /// Offline message retention.
    pub store_and_forward_configuration: StoreAndForward,
}

/// Offline message retention of the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreAndForward {
    /// Retention in seconds.
    pub time_to_live_secs: u64,
}

impl DeploymentManifest {
    /// Returns a fresh template without user modules.
    pub fn base(syntax: CredentialSyntax) -> Self {
        let [username, password, address] = syntax.credential_tokens();
        let mut registry_credentials = BTreeMap::new();
        let _ = registry_credentials.insert(
            REGISTRY_CREDENTIAL_KEY.to_string(),
            RegistryCredential {
                username,
                password,
                address,
            },
        );

        Self {
            schema_template: SCHEMA_TEMPLATE_VERSION.to_string(),
            modules_content: ModulesContent {
                edge_agent: AgentTwin {
                    desired: AgentDesired {
                        schema_version: MANIFEST_SCHEMA_VERSION.to_string(),
                        runtime: Runtime {
                            kind: ModuleType::Docker,
                            settings: RuntimeSettings {
                                min_docker_version: MIN_DOCKER_VERSION.to_string(),
                                logging_options: String::new(),
                                registry_credentials,
                            },
                        },
                        system_modules: SystemModules {
                            edge_agent: SystemModule {
                                kind: ModuleType::Docker,
                                status: None,
                                restart_policy: None,
                                settings: ModuleSettings {
                                    image: EDGE_AGENT_IMAGE.to_string(),
                                    create_options: json!({}),
                                },
                            },
                            edge_hub: SystemModule {
                                kind: ModuleType::Docker,
                                status: Some(ModuleStatus::Running),
                                restart_policy: Some(RestartPolicy::Always),
                                settings: ModuleSettings {
                                    image: EDGE_HUB_IMAGE.to_string(),
                                    create_options: hub_create_options(),
                                },
                            },
                        },
                        modules: BTreeMap::new(),
                    },
                },
                edge_hub: HubTwin {
                    desired: HubDesired {
                        schema_version: MANIFEST_SCHEMA_VERSION.to_string(),
                        routes: Map::new(),
                        store_and_forward_configuration: StoreAndForward {
                            time_to_live_secs: HUB_TIME_TO_LIVE_SECS,
                        },
                    },
                },
            },
        }
    }

    /// User modules keyed by service name.
    pub const fn modules(&self) -> &BTreeMap<String, Module> {
        &self.modules_content.edge_agent.desired.modules
    }

    /// Template form as a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Wire form with create-options split into string fields.
    ///
    /// # Errors
    ///
    /// Returns [`c2m_common::error::ConvertError::SizeLimit`] if a module's
    /// create-options do not fit.
    pub fn to_wire(&self) -> Result<Value> {
        split::to_wire(self.to_value()?)
    }
}

/// Builds a manifest holding `modules` as its user modules.
///
/// Every call starts from a fresh [`DeploymentManifest::base`], so the
/// result depends on the arguments only.
pub fn assemble<I>(modules: I, syntax: CredentialSyntax) -> DeploymentManifest
where
    I: IntoIterator<Item = (String, Module)>,
{
    let mut manifest = DeploymentManifest::base(syntax);
    manifest.modules_content.edge_agent.desired.modules = modules.into_iter().collect();
    tracing::debug!(modules = manifest.modules().len(), "assembled deployment manifest");
    manifest
}

fn hub_create_options() -> Value {
    let bindings: Map<String, Value> = EDGE_HUB_PORTS
        .iter()
        .map(|port| (format!("{port}/tcp"), json!([{ "HostPort": port }])))
        .collect();
    json!({ "HostConfig": { "PortBindings": bindings } })
}
