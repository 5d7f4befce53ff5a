//! Core configuration model for vcbuild.
//!
//! This module contains the configuration pipeline:
//! - Built-in defaults and validation rules (`schema`)
//! - Layer merging (`merge`)
//! - Profiles and `"auto"` resolution (`profile`)
//! - Typed configuration sections (`manifest`)
//! - The resolver tying them together (`resolve`)

pub mod error;
pub mod manifest;
pub mod merge;
pub mod profile;
pub mod resolve;
pub mod schema;

pub use error::{ConfigError, Violation};
pub use manifest::ProjectConfig;
pub use profile::ProfileKind;
pub use resolve::{CliOverrides, ResolvedConfig};
