//! Run configuration for a conversion.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_REGISTRY, REGISTRY_ADDRESS_VAR, REGISTRY_PASSWORD_VAR, REGISTRY_USERNAME_VAR,
};

/// Root configuration of one conversion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Registry address used for module repositories and the `.env` file.
    pub registry: String,
    /// How network settings unsupported by the edge runtime are handled.
    pub network_policy: NetworkPolicy,
    /// Placeholder syntax used for registry credentials in the manifest.
    pub credential_syntax: CredentialSyntax,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            registry: DEFAULT_REGISTRY.to_string(),
            network_policy: NetworkPolicy::default(),
            credential_syntax: CredentialSyntax::default(),
        }
    }
}

/// Treatment of `NetworkMode` and `NetworkingConfig` in create-options.
///
/// The edge runtime only knows one implicit network, so settings naming the
/// project's default network are always meaningless there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkPolicy {
    /// Strip settings naming the default network; keep custom ones and warn.
    #[default]
    StripDefault,
    /// Strip every network setting and warn when something was removed.
    StripAll,
}

/// Syntax of the registry credential placeholders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialSyntax {
    /// `${CONTAINER_REGISTRY_USERNAME}`
    #[default]
    Braced,
    /// `$CONTAINER_REGISTRY_USERNAME`
    Bare,
}

impl CredentialSyntax {
    /// Renders a substitution token for the given variable.
    pub fn token(self, var: &str) -> String {
        match self {
            Self::Braced => format!("${{{var}}}"),
            Self::Bare => format!("${var}"),
        }
    }

    /// Tokens for username, password and address, in that order.
    pub fn credential_tokens(self) -> [String; 3] {
        [
            self.token(REGISTRY_USERNAME_VAR),
            self.token(REGISTRY_PASSWORD_VAR),
            self.token(REGISTRY_ADDRESS_VAR),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_local_registry() {
        let config = ConvertConfig::default();
        assert_eq!(config.registry, "localhost:5000");
        assert_eq!(config.network_policy, NetworkPolicy::StripDefault);
        assert_eq!(config.credential_syntax, CredentialSyntax::Braced);
    }

    #[test]
    fn braced_token_wraps_variable() {
        assert_eq!(CredentialSyntax::Braced.token("FOO"), "${FOO}");
    }

    #[test]
    fn bare_token_prefixes_variable() {
        let [user, _, address] = CredentialSyntax::Bare.credential_tokens();
        assert_eq!(user, "$CONTAINER_REGISTRY_USERNAME");
        assert_eq!(address, "$CONTAINER_REGISTRY_ADDRESS");
    }
}
