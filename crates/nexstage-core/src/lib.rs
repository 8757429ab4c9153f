//! Core data types for nexstage.
//!
//! This crate defines the types shared by every staging goal: the build
//! description (`Nexstage.toml`), the read-only staging parameters, Maven
//! artifact coordinates, staging profile and repository identities, the
//! on-disk staging repository registry, and the reactor completion gate.
//!
//! This crate is intentionally free of network I/O.

/// Default project file name.
pub const MANIFEST_FILE: &str = "Nexstage.toml";

/// Default secrets file loaded next to the project file.
pub const ENV_FILE: &str = ".nexstage.env";

pub mod config;
pub mod coordinate;
pub mod manifest;
pub mod parameters;
pub mod properties;
pub mod reactor;
pub mod registry;
pub mod staging;
