//! Module records of the deployment manifest.

use c2m_common::types::RestartPolicy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of a module; the edge agent only runs docker modules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleType {
    /// Docker container module.
    #[default]
    Docker,
}

/// Desired run status of a module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleStatus {
    /// The agent keeps the module running.
    #[default]
    Running,
}

/// Image and create-options of a module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSettings {
    /// Image reference or a `${MODULES.<name>}` build placeholder.
    pub image: String,
    /// Engine create-options document.
    pub create_options: Value,
}

/// A user module record, one per Compose service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    /// Record version.
    pub version: String,
    /// Module kind.
    #[serde(rename = "type")]
    pub kind: ModuleType,
    /// Desired status.
    pub status: ModuleStatus,
    /// Restart policy.
    pub restart_policy: RestartPolicy,
    /// Image and create-options.
    pub settings: ModuleSettings,
}

/// One of the fixed system modules (edge agent and edge hub).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemModule {
    /// Module kind.
    #[serde(rename = "type")]
    pub kind: ModuleType,
    /// Desired status; the agent module has none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ModuleStatus>,
    /// Restart policy; the agent module has none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_policy: Option<RestartPolicy>,
    /// Image and create-options.
    pub settings: ModuleSettings,
}

/// Placeholder the edge tooling replaces with the image built for `module`.
pub fn build_placeholder(module: &str) -> String {
    format!("${{MODULES.{module}}}")
}
