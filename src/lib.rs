//! Release version synchronization for JavaScript monorepos.
//!
//! This crate sets one version on every public package of a workspace and
//! rewrites the dependency constraints between them, so the package graph stays
//! consistent after a release bump.

pub mod config;
pub mod error;
pub mod manifest;
pub mod platform;
pub mod sync;
pub mod version;
pub mod workspace;

pub use config::{ArtifactSpec, SyncConfig, CONFIG_FILE};
pub use error::{Result, SyncError};
pub use manifest::{DependencyChange, ManifestChanges, PackageManifest, MANIFEST_FILE};
pub use platform::{ArtifactStamper, PlatformVersionSetter};
pub use sync::{SyncPlan, SyncReport, VersionSync};
pub use version::{VersionAssignment, VersionResolver, SENTINEL_VERSION};
pub use workspace::{
    Package, PackageQuery, PackageRegistry, PackageSet, WorkspaceScanner, WorkspaceSnapshot,
};
