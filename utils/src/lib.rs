//! Shared utilities for the Gallery project.
//!
//! This crate contains helpers shared across the workspace, currently the
//! build-time version information surfaced by the service health endpoint.

pub mod version_info;
