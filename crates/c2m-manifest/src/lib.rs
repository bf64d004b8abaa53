//! # c2m-manifest
//!
//! Edge deployment manifests from resolved Compose projects.
//!
//! Handles:
//! - **Mapper**: One service to one module record, create-options filtered
//!   for the edge runtime.
//! - **Template**: The deployment manifest with its fixed system modules.
//! - **Build**: `module.json` descriptors and build context staging.
//! - **Split**: The wire form, create-options cut into 512-byte fields.
//! - **Convert**: File and project outputs.

pub mod build;
pub mod convert;
pub mod emit;
pub mod mapper;
pub mod module;
pub mod split;
pub mod template;
pub mod value;
