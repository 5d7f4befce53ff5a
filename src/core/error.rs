//! Error types for configuration loading and validation.

use std::fmt;
use std::path::PathBuf;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// A single problem found while validating a configuration tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted path of the offending field (e.g. `compiler.warnings.level`).
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl Violation {
    /// Create a new violation.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Violation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Errors that can occur when resolving a project configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON.
    #[error("invalid JSON in {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    /// One or more fields failed validation. Every violation is collected.
    #[error("configuration errors in {} ({} problem(s))", .path.display(), .violations.len())]
    Invalid {
        path: PathBuf,
        violations: Vec<Violation>,
    },
}

impl ConfigError {
    /// The violations carried by this error (empty for I/O and parse errors).
    pub fn violations(&self) -> &[Violation] {
        match self {
            ConfigError::Invalid { violations, .. } => violations,
            _ => &[],
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ConfigError::Io { path, source } => {
                Diagnostic::error(format!("failed to read configuration: {}", source))
                    .with_location(path)
            }
            ConfigError::Parse { path, message } => {
                Diagnostic::error("invalid JSON in configuration file")
                    .with_location(path)
                    .with_context(message.clone())
            }
            ConfigError::Invalid { path, violations } => {
                let mut diag = Diagnostic::error("configuration errors").with_location(path);
                for violation in violations {
                    diag = diag.with_context(violation.to_string());
                }
                if !path.exists() {
                    diag = diag.with_suggestion(suggestions::NO_CONFIG);
                }
                diag
            }
        }
    }
}
