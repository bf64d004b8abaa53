//! # c2m-compose
//!
//! Resolver for Docker Compose projects.
//!
//! Handles:
//! - **Model**: Raw deserialization of the Compose YAML, including the
//!   fields that accept several shapes.
//! - **Interpolate**: `${VAR}` substitution from `.env` and the process.
//! - **Service**: Normalization of each service (build, network, ports,
//!   volumes, environment, healthcheck).
//! - **Project**: Loading a file into a [`Project`](project::Project).
//! - **Create options**: The engine-facing creation parameters of a service.

pub mod create_options;
pub mod interpolate;
pub mod model;
pub mod ports;
pub mod project;
pub mod service;
pub mod units;
pub mod volumes;
