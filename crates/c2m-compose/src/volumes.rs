//! Volume mount declarations.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use c2m_common::error::{ConvertError, Result};

use crate::model::{RawVolumeMount, RawVolumeSpec};

/// A resolved volume mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    /// Host path or engine volume name; `None` for anonymous volumes.
    pub source: Option<String>,
    /// Path inside the container.
    pub target: String,
    /// Access mode (`rw`, `ro`, ...).
    pub mode: String,
}

impl VolumeMount {
    /// Engine bind string, or `None` for anonymous volumes.
    #[must_use]
    pub fn bind(&self) -> Option<String> {
        self.source
            .as_ref()
            .map(|src| format!("{src}:{}:{}", self.target, self.mode))
    }
}

/// Context needed to turn relative paths and volume names into engine values.
#[derive(Debug, Clone, Copy)]
pub struct VolumeContext<'a> {
    /// Project name used to prefix named volumes.
    pub project: &'a str,
    /// Directory relative host paths resolve against.
    pub directory: &'a Path,
    /// Home directory for `~` expansion.
    pub home: Option<&'a str>,
    /// Engine names of volumes declared at the top level.
    pub named: &'a BTreeMap<String, String>,
}

/// Resolves one service `volumes` entry.
///
/// # Errors
///
/// Returns an error on malformed short syntax.
pub fn parse_volume(raw: &RawVolumeMount, ctx: &VolumeContext<'_>) -> Result<VolumeMount> {
    match raw {
        RawVolumeMount::Short(spec) => parse_short(spec, ctx),
        RawVolumeMount::Long(spec) => Ok(parse_long(spec, ctx)),
    }
}

fn parse_short(spec: &str, ctx: &VolumeContext<'_>) -> Result<VolumeMount> {
    let parts: Vec<&str> = spec.split(':').collect();
    let (source, target, mode) = match parts.as_slice() {
        [target] => (None, *target, "rw"),
        [source, target] => (Some(*source), *target, "rw"),
        [source, target, mode] => (Some(*source), *target, *mode),
        _ => {
            return Err(ConvertError::Config {
                message: format!("invalid volume specification: \"{spec}\""),
            });
        }
    };
    if target.is_empty() {
        return Err(ConvertError::Config {
            message: format!("volume specification has no container path: \"{spec}\""),
        });
    }
    Ok(VolumeMount {
        source: source.map(|s| resolve_source(s, ctx)),
        target: target.to_string(),
        mode: mode.to_string(),
    })
}

fn parse_long(spec: &RawVolumeSpec, ctx: &VolumeContext<'_>) -> VolumeMount {
    let source = match spec.kind.as_deref() {
        Some("tmpfs") => None,
        _ => spec.source.as_deref().map(|s| resolve_source(s, ctx)),
    };
    VolumeMount {
        source,
        target: spec.target.clone(),
        mode: if spec.read_only { "ro" } else { "rw" }.to_string(),
    }
}

fn resolve_source(source: &str, ctx: &VolumeContext<'_>) -> String {
    if let Some(rest) = source.strip_prefix('~') {
        let home = ctx.home.unwrap_or("~");
        return format!("{home}{rest}");
    }
    if is_host_path(source) {
        let path = Path::new(source);
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            ctx.directory.join(path)
        };
        return normalize(&joined).display().to_string();
    }
    ctx.named
        .get(source)
        .cloned()
        .unwrap_or_else(|| format!("{}_{source}", ctx.project))
}

fn is_host_path(source: &str) -> bool {
    source.starts_with('.') || source.starts_with('/') || source.starts_with('~')
}

/// Removes `.` and `..` components without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let _ = out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
