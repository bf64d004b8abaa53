//! Variable substitution over Compose YAML.
//!
//! Supports `$VAR`, `${VAR}`, `${VAR:-default}`, `${VAR-default}`,
//! `${VAR:?message}`, `${VAR?message}` and the `$$` escape. Only values are
//! interpolated, never mapping keys.

use std::collections::BTreeMap;
use std::path::Path;

use c2m_common::error::{ConvertError, Result};

/// Variables available for interpolation and bare environment entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Builds an environment from explicit pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Reads `<project_dir>/.env`, then overlays the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the `.env` file exists but cannot be read.
    pub fn capture(project_dir: &Path) -> Result<Self> {
        let dotenv = project_dir.join(".env");
        let mut env = if dotenv.is_file() {
            tracing::debug!(path = %dotenv.display(), "loading .env");
            Self::from_pairs(read_env_file(&dotenv)?)
        } else {
            Self::default()
        };
        env.vars.extend(process_vars());
        Ok(env)
    }

    /// Looks up a variable.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Interpolates one string.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed `${...}` expressions or when a
    /// `${VAR?message}` variable is missing.
    pub fn interpolate(&self, input: &str) -> Result<String> {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];

            if let Some(tail) = after.strip_prefix('$') {
                out.push('$');
                rest = tail;
            } else if let Some(body) = after.strip_prefix('{') {
                let end = body.find('}').ok_or_else(|| ConvertError::Config {
                    message: format!("unterminated variable expression in \"{input}\""),
                })?;
                out.push_str(&self.expand_braced(&body[..end], input)?);
                rest = &body[end + 1..];
            } else {
                let len = identifier_len(after);
                if len == 0 {
                    out.push('$');
                } else {
                    out.push_str(&self.lookup(&after[..len]));
                }
                rest = &after[len..];
            }
        }
        out.push_str(rest);
        Ok(out)
    }

    /// Interpolates every string scalar of a YAML tree in place.
    ///
    /// # Errors
    ///
    /// Propagates the first interpolation failure.
    pub fn interpolate_value(&self, value: &mut serde_yaml::Value) -> Result<()> {
        match value {
            serde_yaml::Value::String(s) => {
                *s = self.interpolate(s)?;
            }
            serde_yaml::Value::Sequence(items) => {
                for item in items {
                    self.interpolate_value(item)?;
                }
            }
            serde_yaml::Value::Mapping(map) => {
                for (_, item) in map.iter_mut() {
                    self.interpolate_value(item)?;
                }
            }
            serde_yaml::Value::Tagged(tagged) => self.interpolate_value(&mut tagged.value)?,
            serde_yaml::Value::Null | serde_yaml::Value::Bool(_) | serde_yaml::Value::Number(_) => {}
        }
        Ok(())
    }

    fn expand_braced(&self, expr: &str, input: &str) -> Result<String> {
        let name_len = identifier_len(expr);
        if name_len == 0 {
            return Err(ConvertError::Config {
                message: format!("invalid variable expression \"${{{expr}}}\" in \"{input}\""),
            });
        }
        let (name, op) = expr.split_at(name_len);
        let value = self.get(name);

        if op.is_empty() {
            return Ok(self.lookup(name));
        }
        if let Some(default) = op.strip_prefix(":-") {
            return Ok(value.filter(|v| !v.is_empty()).unwrap_or(default).to_string());
        }
        if let Some(default) = op.strip_prefix('-') {
            return Ok(value.unwrap_or(default).to_string());
        }
        if let Some(message) = op.strip_prefix(":?") {
            return value
                .filter(|v| !v.is_empty())
                .map(ToString::to_string)
                .ok_or_else(|| missing_required(name, message));
        }
        if let Some(message) = op.strip_prefix('?') {
            return value
                .map(ToString::to_string)
                .ok_or_else(|| missing_required(name, message));
        }
        Err(ConvertError::Config {
            message: format!("invalid variable expression \"${{{expr}}}\" in \"{input}\""),
        })
    }

    fn lookup(&self, name: &str) -> String {
        self.get(name).map_or_else(
            || {
                tracing::warn!(variable = name, "variable is not set, substituting empty string");
                String::new()
            },
            ToString::to_string,
        )
    }
}

/// Process environment, skipping entries that are not valid UTF-8.
fn process_vars() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os().filter_map(|(key, value)| match (key.to_str(), value.to_str()) {
        (Some(k), Some(v)) => Some((k.to_string(), v.to_string())),
        _ => {
            tracing::warn!(variable = %key.to_string_lossy(), "skipping non UTF-8 environment variable");
            None
        }
    })
}

fn missing_required(name: &str, message: &str) -> ConvertError {
    ConvertError::Config {
        message: format!("required variable {name} is missing a value: {message}"),
    }
}

fn identifier_len(s: &str) -> usize {
    let mut len = 0;
    for (i, c) in s.char_indices() {
        let ok = if i == 0 {
            c.is_ascii_alphabetic() || c == '_'
        } else {
            c.is_ascii_alphanumeric() || c == '_'
        };
        if !ok {
            break;
        }
        len = i + c.len_utf8();
    }
    len
}

/// Reads a dotenv file into ordered `(key, value)` pairs.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a line is malformed.
pub fn read_env_file(path: &Path) -> Result<Vec<(String, String)>> {
    let lines = dotenvy::from_path_iter(path).map_err(|e| env_file_error(path, e))?;
    lines
        .map(|line| line.map_err(|e| env_file_error(path, e)))
        .collect()
}

fn env_file_error(path: &Path, err: dotenvy::Error) -> ConvertError {
    match err {
        dotenvy::Error::Io(source) => ConvertError::io(path, source),
        other => ConvertError::Compose {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    }
}
