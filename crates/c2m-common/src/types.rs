//! Domain primitive types shared by the resolver and the manifest builder.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A list of build arguments or labels.
///
/// Compose accepts both a mapping (`KEY: value`) and a sequence (`- KEY`)
/// for these sections. The two forms render differently as build flags, so
/// the form is kept explicit instead of being sniffed downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgList {
    /// Mapping form, in declaration order.
    KeyValue(Vec<(String, String)>),
    /// Sequence form; values are supplied at build time.
    Bare(Vec<String>),
}

impl ArgList {
    /// Returns `true` if the list holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::KeyValue(pairs) => pairs.is_empty(),
            Self::Bare(keys) => keys.is_empty(),
        }
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::KeyValue(pairs) => pairs.len(),
            Self::Bare(keys) => keys.len(),
        }
    }

    /// Renders each entry as it appears on a build command line.
    ///
    /// `KeyValue` entries become `KEY=value`, `Bare` entries stay as given.
    pub fn rendered(&self) -> Vec<String> {
        match self {
            Self::KeyValue(pairs) => pairs.iter().map(|(k, v)| format!("{k}={v}")).collect(),
            Self::Bare(keys) => keys.clone(),
        }
    }
}

impl Default for ArgList {
    fn default() -> Self {
        Self::KeyValue(Vec::new())
    }
}

/// Restart policy understood by the edge agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    /// Always restart the module.
    #[default]
    Always,
    /// Never restart the module.
    Never,
    /// Restart only after a failed exit.
    OnFailure,
    /// Restart when the module reports unhealthy.
    OnUnhealthy,
}

impl RestartPolicy {
    /// Translates an engine restart policy name.
    ///
    /// `no` becomes [`Never`](Self::Never); names the edge agent also knows
    /// pass through; anything else falls back to [`Always`](Self::Always).
    #[must_use]
    pub fn from_engine_name(name: Option<&str>) -> Self {
        match name {
            Some("no" | "never") => Self::Never,
            Some("on-failure") => Self::OnFailure,
            Some("on-unhealthy") => Self::OnUnhealthy,
            _ => Self::Always,
        }
    }
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "always"),
            Self::Never => write!(f, "never"),
            Self::OnFailure => write!(f, "on-failure"),
            Self::OnUnhealthy => write!(f, "on-unhealthy"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_value_args_render_with_equals() {
        let args = ArgList::KeyValue(vec![("A".into(), "1".into()), ("B".into(), String::new())]);
        assert_eq!(args.rendered(), vec!["A=1", "B="]);
    }

    #[test]
    fn bare_args_render_key_only() {
        let args = ArgList::Bare(vec!["TOKEN".into()]);
        assert_eq!(args.rendered(), vec!["TOKEN"]);
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn default_arg_list_is_empty() {
        assert!(ArgList::default().is_empty());
    }

    #[test]
    fn restart_no_maps_to_never() {
        assert_eq!(RestartPolicy::from_engine_name(Some("no")), RestartPolicy::Never);
    }

    #[test]
    fn restart_absent_maps_to_always() {
        assert_eq!(RestartPolicy::from_engine_name(None), RestartPolicy::Always);
    }

    #[test]
    fn restart_unknown_maps_to_always() {
        assert_eq!(
            RestartPolicy::from_engine_name(Some("unless-stopped")),
            RestartPolicy::Always
        );
    }

    #[test]
    fn restart_on_failure_passes_through() {
        assert_eq!(
            RestartPolicy::from_engine_name(Some("on-failure")),
            RestartPolicy::OnFailure
        );
    }

    #[test]
    fn restart_policy_serializes_kebab_case() {
        let json = serde_json::to_string(&RestartPolicy::OnFailure).expect("serialize");
        assert_eq!(json, "\"on-failure\"");
    }
}
