//! Shared utilities for nexstage.
//!
//! This crate provides cross-cutting concerns used by all other nexstage
//! crates: the error taxonomy, filesystem helpers, checksum hashing, and
//! terminal progress indicators.

pub mod errors;
pub mod fs;
pub mod hash;
pub mod progress;
