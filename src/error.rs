//! Error types for version synchronization.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = SyncError> = std::result::Result<T, E>;

/// Errors raised while discovering, resolving or rewriting packages.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Reading or writing a file failed.
    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A manifest is not a JSON object or lacks its `name`.
    #[error("malformed manifest {}: {reason}", path.display())]
    MalformedManifest { path: PathBuf, reason: String },

    /// Two manifests in the tree declare the same package name.
    #[error("package `{name}` is declared by both {} and {}", first.display(), second.display())]
    DuplicatePackage {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// The configuration file could not be understood.
    #[error("invalid configuration {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    #[error("invalid glob pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("failed to scan workspace: {0}")]
    Walk(#[from] walkdir::Error),

    /// Native artifacts need numeric version components.
    #[error("version `{version}` cannot be stamped into native artifacts: {source}")]
    InvalidVersion {
        version: String,
        #[source]
        source: semver::Error,
    },

    #[error("package registry failed: {0}")]
    Registry(#[source] Box<SyncError>),

    #[error("platform version setter failed for `{package}`: {source}")]
    PlatformSetter {
        package: String,
        #[source]
        source: Box<SyncError>,
    },

    #[error("task updating `{package}` did not complete: {message}")]
    TaskAborted { package: String, message: String },

    /// One or more operations of a batch failed. Siblings that succeeded stay written.
    #[error("{} of {total} updates failed: {}", .failures.len(), join_messages(.failures))]
    Batch {
        total: usize,
        failures: Vec<SyncError>,
    },
}

impl SyncError {
    pub(crate) fn io(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedManifest {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Failures carried by a batch error, or the error itself otherwise.
    pub fn failures(&self) -> Vec<&SyncError> {
        match self {
            Self::Batch { failures, .. } => failures.iter().collect(),
            other => vec![other],
        }
    }
}

fn join_messages(failures: &[SyncError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
