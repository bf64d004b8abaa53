//! System-wide constants and default names.

/// Registry used for module repositories when none is given.
pub const DEFAULT_REGISTRY: &str = "localhost:5000";

/// Size of one `createOptions*` field on the wire.
pub const CREATE_OPTIONS_BLOCK_SIZE: usize = 512;

/// Number of `createOptions*` fields the edge runtime reads per module.
pub const CREATE_OPTIONS_MAX_BLOCKS: usize = 8;

/// Serialized create-options must stay strictly below this many bytes.
pub const CREATE_OPTIONS_LIMIT: usize = CREATE_OPTIONS_BLOCK_SIZE * CREATE_OPTIONS_MAX_BLOCKS;

/// Base field name for create-options on the wire.
pub const CREATE_OPTIONS_FIELD: &str = "createOptions";

/// Version string of every user module record.
pub const MODULE_RECORD_VERSION: &str = "1.0";

/// Schema version written into manifests for both agent and hub.
pub const MANIFEST_SCHEMA_VERSION: &str = "1.0";

/// Marker identifying a manifest as a template rather than a wire manifest.
pub const SCHEMA_TEMPLATE_VERSION: &str = "2.0.0";

/// Key of the template marker at the manifest root.
pub const SCHEMA_TEMPLATE_KEY: &str = "$schema-template";

/// Schema version of `module.json` descriptors.
pub const MODULE_DESCRIPTOR_SCHEMA: &str = "0.0.1";

/// Version tag assigned to freshly converted modules.
pub const MODULE_IMAGE_VERSION: &str = "0.0.1";

/// Architecture key under which the Dockerfile is recorded.
pub const DEFAULT_PLATFORM: &str = "amd64";

/// Dockerfile name assumed when a build section omits it.
pub const DEFAULT_DOCKERFILE: &str = "Dockerfile";

/// Image of the edge agent system module.
pub const EDGE_AGENT_IMAGE: &str = "mcr.microsoft.com/azureiotedge-agent:1.0";

/// Image of the edge hub system module.
pub const EDGE_HUB_IMAGE: &str = "mcr.microsoft.com/azureiotedge-hub:1.0";

/// Ports published by the edge hub.
pub const EDGE_HUB_PORTS: [&str; 3] = ["5671", "8883", "443"];

/// Minimum docker engine version requested by the agent runtime.
pub const MIN_DOCKER_VERSION: &str = "v1.25";

/// Store-and-forward retention of the edge hub.
pub const HUB_TIME_TO_LIVE_SECS: u64 = 7200;

/// Key of the single registry credential entry.
pub const REGISTRY_CREDENTIAL_KEY: &str = "REGISTRY0";

/// Environment variable holding the registry user name.
pub const REGISTRY_USERNAME_VAR: &str = "CONTAINER_REGISTRY_USERNAME";

/// Environment variable holding the registry password.
pub const REGISTRY_PASSWORD_VAR: &str = "CONTAINER_REGISTRY_PASSWORD";

/// Environment variable holding the registry address.
pub const REGISTRY_ADDRESS_VAR: &str = "CONTAINER_REGISTRY_ADDRESS";

/// Name of the intermediate manifest written in project mode.
pub const DEPLOYMENT_TEMPLATE_FILE: &str = "deployment.template.json";

/// Name of the per-module build descriptor.
pub const MODULE_DESCRIPTOR_FILE: &str = "module.json";

/// Directory holding one subdirectory per built module.
pub const MODULES_DIR: &str = "modules";

/// Name of the credentials file written in project mode.
pub const ENV_FILE: &str = ".env";

/// Name of the implicit network Compose attaches services to.
pub const DEFAULT_NETWORK: &str = "default";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "c2m";
