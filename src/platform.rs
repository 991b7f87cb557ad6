//! Version stamping for the distinguished package.
//!
//! The distinguished package owns more than its manifest: native build files
//! and embedded template manifests carry its version too. The
//! [`PlatformVersionSetter`] writes all of them, including the package's own
//! `package.json`, which the batch driver never touches.

use async_trait::async_trait;
use semver::Version;
use std::path::{Path, PathBuf};

use crate::config::ArtifactSpec;
use crate::error::{Result, SyncError};
use crate::manifest::{PackageManifest, MANIFEST_FILE};
use crate::version::VersionAssignment;
use crate::workspace::PackageSet;

/// Stamps the distinguished package with its release version.
#[async_trait]
pub trait PlatformVersionSetter: Send + Sync {
    async fn set_distinguished_version(
        &self,
        version: &str,
        mapping: &VersionAssignment,
    ) -> Result<()>;
}

/// Writes the distinguished package's manifest and configured artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStamper {
    workspace_root: PathBuf,
    package_dir: PathBuf,
    artifacts: Vec<ArtifactSpec>,
}

impl ArtifactStamper {
    /// Create a stamper for the package in `package_dir`.
    ///
    /// Artifact paths resolve against `package_dir`, template sources against
    /// `workspace_root`.
    pub fn new(
        workspace_root: impl AsRef<Path>,
        package_dir: impl AsRef<Path>,
        artifacts: Vec<ArtifactSpec>,
    ) -> Self {
        Self {
            workspace_root: workspace_root.as_ref().to_path_buf(),
            package_dir: package_dir.as_ref().to_path_buf(),
            artifacts,
        }
    }

    /// Build a stamper for `package`, found among the workspace `packages`.
    pub fn locate(
        packages: &PackageSet,
        workspace_root: impl AsRef<Path>,
        package: &str,
        artifacts: Vec<ArtifactSpec>,
    ) -> Result<Self> {
        let found = packages.get(package).ok_or_else(|| SyncError::Config {
            path: workspace_root.as_ref().to_path_buf(),
            reason: format!("distinguished package `{package}` not found in workspace"),
        })?;

        Ok(Self::new(workspace_root, &found.dir, artifacts))
    }

    pub fn package_dir(&self) -> &Path {
        &self.package_dir
    }

    async fn stamp_manifest(&self, version: &str, mapping: &VersionAssignment) -> Result<()> {
        let path = self.package_dir.join(MANIFEST_FILE);
        let mut manifest = PackageManifest::load(&path).await?;

        manifest.set_version(version);
        manifest.update_dependencies(mapping);
        manifest.write_to(&path).await?;

        tracing::info!(path = %path.display(), version, "distinguished manifest written");
        Ok(())
    }

    async fn stamp_artifact(
        &self,
        artifact: &ArtifactSpec,
        version: &str,
        mapping: &VersionAssignment,
    ) -> Result<()> {
        let path = self.package_dir.join(artifact.path());

        match artifact {
            ArtifactSpec::Properties { key, .. } => {
                let content = read(&path).await?;
                write(&path, set_property(&content, key, version)).await?;
            }
            ArtifactSpec::Manifest { .. } => {
                let mut manifest = PackageManifest::load(&path).await?;
                manifest.update_dependencies(mapping);
                manifest.write_to(&path).await?;
            }
            ArtifactSpec::Template { template, .. } => {
                let template = read(&self.workspace_root.join(template)).await?;
                write(&path, render_template(&template, version)?).await?;
            }
        }

        tracing::info!(path = %path.display(), version, "artifact stamped");
        Ok(())
    }
}

#[async_trait]
impl PlatformVersionSetter for ArtifactStamper {
    async fn set_distinguished_version(
        &self,
        version: &str,
        mapping: &VersionAssignment,
    ) -> Result<()> {
        self.stamp_manifest(version, mapping).await?;

        for artifact in &self.artifacts {
            self.stamp_artifact(artifact, version, mapping).await?;
        }

        Ok(())
    }
}

async fn read(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SyncError::io("read", path, e))
}

async fn write(path: &Path, content: String) -> Result<()> {
    tokio::fs::write(path, content)
        .await
        .map_err(|e| SyncError::io("write", path, e))
}

/// Set `key=value` in a properties file, appending the key when it is missing.
pub fn set_property(content: &str, key: &str, value: &str) -> String {
    let mut found = false;
    let mut lines: Vec<String> = content
        .lines()
        .map(|line| {
            let matches = line
                .trim_start()
                .strip_prefix(key)
                .is_some_and(|rest| rest.trim_start().starts_with('='));
            if matches {
                found = true;
                format!("{key}={value}")
            } else {
                line.to_string()
            }
        })
        .collect();

    if !found {
        lines.push(format!("{key}={value}"));
    }

    let mut out = lines.join("\n");
    if content.ends_with('\n') || !found {
        out.push('\n');
    }
    out
}

/// Render `${version}`, `${major}`, `${minor}`, `${patch}` and `${prerelease}`.
///
/// `${prerelease}` becomes a quoted string, or `null` for a plain release.
pub fn render_template(template: &str, version: &str) -> Result<String> {
    let parsed = Version::parse(version).map_err(|source| SyncError::InvalidVersion {
        version: version.to_string(),
        source,
    })?;

    let prerelease = if parsed.pre.is_empty() {
        "null".to_string()
    } else {
        format!("\"{}\"", parsed.pre)
    };

    Ok(template
        .replace("${version}", version)
        .replace("${major}", &parsed.major.to_string())
        .replace("${minor}", &parsed.minor.to_string())
        .replace("${patch}", &parsed.patch.to_string())
        .replace("${prerelease}", &prerelease))
}

#[cfg(test)]
#[path = "platform_tests.rs"]
mod tests;
