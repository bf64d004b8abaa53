//! # c2m-common
//!
//! Shared types, error definitions, configuration models, and constants
//! used across the compose-to-manifest workspace.
//!
//! This crate is the leaf of the dependency graph: it depends on no other
//! internal crate and provides the primitives the resolver, the manifest
//! builder and the CLI share.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
