//! Domain models for requirement tracking.
//!
//! This module contains the core domain types: requirement identifiers,
//! requirements, the validated requirement graph, diffs and configuration.
//! None of it touches the filesystem.

/// Requirement identifier type and parsing.
pub mod requirement_id;
pub use requirement_id::{InvalidIdError, RequirementId};

mod requirement;
pub use requirement::{Requirement, Source};

/// The validated requirement hierarchy.
pub mod graph;
pub use graph::{RequirementGraph, Summary, ValidationError};

mod diff;
pub use diff::{Change, DiffResult, FieldChange};

mod config;
pub use config::{CONFIG_FILE, Config, ConfigError};
