//! Build instructions for services with a local build context.
//!
//! Each such service becomes a module directory holding a copy of its build
//! context and a `module.json` descriptor that tells the edge tooling how to
//! build and tag the image.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use c2m_common::constants::{
    DEFAULT_PLATFORM, MODULE_DESCRIPTOR_FILE, MODULE_DESCRIPTOR_SCHEMA, MODULE_IMAGE_VERSION,
};
use c2m_common::error::{ConvertError, Result};
use c2m_compose::service::{BuildSpec, Service};
use serde::{Deserialize, Serialize};

use crate::emit::write_json;

/// Contents of a `module.json` build descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// Descriptor schema version.
    #[serde(rename = "$schema-version")]
    pub schema_version: String,
    /// Free-form description.
    pub description: String,
    /// Image build settings.
    pub image: DescriptorImage,
}

/// Image section of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptorImage {
    /// `{registry}/{module}`.
    pub repository: String,
    /// Version and per-platform Dockerfiles.
    pub tag: DescriptorTag,
    /// Build tool flags, in order.
    pub build_options: Vec<String>,
    /// Build context relative to the module directory.
    pub context_path: String,
}

/// Tag section of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorTag {
    /// Image version.
    pub version: String,
    /// Dockerfile per platform.
    pub platforms: BTreeMap<String, String>,
}

/// Translates a build section into build tool flags.
///
/// The order is fixed: build arguments, cache sources, labels, shared memory
/// size, target stage.
pub fn build_flags(spec: &BuildSpec) -> Vec<String> {
    let mut flags: Vec<String> = spec
        .args
        .rendered()
        .into_iter()
        .map(|arg| format!("--build-arg {arg}"))
        .collect();
    flags.extend(spec.cache_from.iter().map(|src| format!("--cache-from {src}")));
    flags.extend(spec.labels.rendered().into_iter().map(|label| format!("--label {label}")));
    if let Some(size) = &spec.shm_size {
        flags.push(format!("--shm-size {size}"));
    }
    if let Some(target) = &spec.target {
        flags.push(format!("--target {target}"));
    }
    flags
}

/// Derives the build descriptor of module `name`.
pub fn derive_descriptor(name: &str, spec: &BuildSpec, registry: &str) -> ModuleDescriptor {
    let mut platforms = BTreeMap::new();
    let _ = platforms.insert(DEFAULT_PLATFORM.to_string(), spec.dockerfile.clone());
    ModuleDescriptor {
        schema_version: MODULE_DESCRIPTOR_SCHEMA.to_string(),
        description: String::new(),
        image: DescriptorImage {
            repository: format!("{registry}/{name}"),
            tag: DescriptorTag {
                version: MODULE_IMAGE_VERSION.to_string(),
                platforms,
            },
            build_options: build_flags(spec),
            context_path: "./".to_string(),
        },
    }
}

/// Copies the build context and writes the descriptor of `service` into
/// `modules_dir/<name>`. Services without a build section are skipped.
///
/// # Errors
///
/// Fails if the context is missing, the module directory already exists, or
/// any copy or write fails.
pub fn stage_module(service: &Service, modules_dir: &Path, registry: &str) -> Result<Option<PathBuf>> {
    let Some(spec) = &service.build else {
        return Ok(None);
    };
    let module_dir = modules_dir.join(&service.name);
    copy_tree(&spec.context, &module_dir)?;

    let descriptor = derive_descriptor(&service.name, spec, registry);
    write_json(&module_dir.join(MODULE_DESCRIPTOR_FILE), &descriptor, 4, true)?;
    tracing::info!(
        module = %service.name,
        context = %spec.context.display(),
        flags = descriptor.image.build_options.len(),
        "staged build module"
    );
    Ok(Some(module_dir))
}

/// Copies the directory tree `src` into `dst`, which must not exist yet.
///
/// Symlinks are recreated rather than followed. When `dst` lies inside `src`
/// it is left out of the copy.
///
/// # Errors
///
/// Returns [`ConvertError::NotFound`] for a missing source,
/// [`ConvertError::DestinationExists`] for an existing destination, or an
/// I/O error.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    if !src.is_dir() {
        return Err(ConvertError::NotFound {
            kind: "build context",
            id: src.display().to_string(),
        });
    }
    if dst.symlink_metadata().is_ok() {
        return Err(ConvertError::DestinationExists {
            path: dst.to_path_buf(),
        });
    }
    let skip = fs::canonicalize(src)
        .ok()
        .zip(dst.parent().and_then(|p| fs::canonicalize(p).ok()))
        .and_then(|(root, parent)| {
            dst.file_name()
                .map(|name| parent.join(name))
                .filter(|d| d.starts_with(&root))
        });
    copy_dir(src, dst, skip.as_deref())
}

fn copy_dir(src: &Path, dst: &Path, skip: Option<&Path>) -> Result<()> {
    fs::create_dir(dst).map_err(|e| ConvertError::io(dst, e))?;
    for entry in fs::read_dir(src).map_err(|e| ConvertError::io(src, e))? {
        let entry = entry.map_err(|e| ConvertError::io(src, e))?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| ConvertError::io(&src_path, e))?;

        if file_type.is_symlink() {
            copy_symlink(&src_path, &dst_path)?;
        } else if file_type.is_dir() {
            let canonical = fs::canonicalize(&src_path).ok();
            if skip.is_some() && canonical.as_deref() == skip {
                continue;
            }
            copy_dir(&src_path, &dst_path, skip)?;
        } else {
            let _ = fs::copy(&src_path, &dst_path).map_err(|e| ConvertError::io(&src_path, e))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    let target = fs::read_link(src).map_err(|e| ConvertError::io(src, e))?;
    std::os::unix::fs::symlink(&target, dst).map_err(|e| ConvertError::io(dst, e))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    if src.is_dir() {
        copy_dir(src, dst, None)
    } else {
        let _ = fs::copy(src, dst).map_err(|e| ConvertError::io(src, e))?;
        Ok(())
    }
}
