//! Unified error types for the compose-to-manifest workspace.
//!
//! Every fatal condition of a conversion run maps onto one variant here.
//! Non-fatal anomalies are not errors; they travel as warnings next to the
//! value they concern.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// The Compose project could not be resolved.
    #[error("invalid compose project {path}: {message}")]
    Compose {
        /// Compose file being resolved.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// The Compose YAML is malformed.
    #[error("YAML error: {source}")]
    Yaml {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// A module's create-options do not fit the runtime's field budget.
    #[error("createOptions of module \"{module}\" is {size} bytes, must stay below {limit} bytes")]
    SizeLimit {
        /// Offending module name.
        module: String,
        /// Serialized create-options length in bytes.
        size: usize,
        /// Hard ceiling in bytes.
        limit: usize,
    },

    /// An output directory that must be created fresh already exists.
    #[error("destination already exists: {path}")]
    DestinationExists {
        /// Colliding path.
        path: PathBuf,
    },
}

impl ConvertError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_limit_message_names_module() {
        let err = ConvertError::SizeLimit {
            module: "web".into(),
            size: 5000,
            limit: 4096,
        };
        let msg = err.to_string();
        assert!(msg.contains("\"web\""));
        assert!(msg.contains("5000"));
        assert!(msg.contains("4096"));
    }

    #[test]
    fn io_helper_keeps_path() {
        let err = ConvertError::io(
            "/tmp/missing",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, ConvertError::Io { ref path, .. } if path.ends_with("missing")));
    }
}
