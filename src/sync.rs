//! Batch version synchronization across the workspace.

use colored::Colorize;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::error::{Result, SyncError};
use crate::manifest::{self, ManifestChanges};
use crate::platform::PlatformVersionSetter;
use crate::version::{VersionAssignment, VersionResolver};
use crate::workspace::{PackageQuery, PackageRegistry, PackageSet};

/// Drives one release: resolve versions, stamp the distinguished package,
/// rewrite every other manifest.
pub struct VersionSync {
    registry: Arc<dyn PackageRegistry>,
    platform: Arc<dyn PlatformVersionSetter>,
    resolver: VersionResolver,
}

/// Changes a run would make, computed without writing.
#[derive(Debug, Clone, Serialize)]
pub struct SyncPlan {
    pub version: String,
    pub distinguished: String,
    pub distinguished_version: String,
    pub mapping: VersionAssignment,
    pub changes: Vec<ManifestChanges>,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub version: String,
    pub distinguished: String,
    pub distinguished_version: String,
    pub mapping: VersionAssignment,
    pub written: Vec<ManifestChanges>,
}

impl VersionSync {
    pub fn new(
        registry: Arc<dyn PackageRegistry>,
        platform: Arc<dyn PlatformVersionSetter>,
        resolver: VersionResolver,
    ) -> Self {
        Self {
            registry,
            platform,
            resolver,
        }
    }

    /// Public packages, the distinguished one included.
    async fn collect_packages(&self) -> Result<PackageSet> {
        self.registry
            .packages(PackageQuery {
                include_private: false,
                include_distinguished: true,
            })
            .await
            .map_err(|e| SyncError::Registry(Box::new(e)))
    }

    /// Compute the version mapping and every manifest change without writing.
    pub async fn plan(&self, version: &str, skip_distinguished: bool) -> Result<SyncPlan> {
        let packages = self.collect_packages().await?;
        let mapping = self
            .resolver
            .resolve(packages.keys(), version, skip_distinguished);

        let mut changes = Vec::with_capacity(packages.len());
        for package in packages.values() {
            let (_, change) = package
                .manifest
                .rewritten(&package.manifest_path(), &mapping)?;
            changes.push(change);
        }

        Ok(SyncPlan {
            version: version.to_string(),
            distinguished: self.resolver.distinguished().to_string(),
            distinguished_version: self
                .resolver
                .distinguished_version(version, skip_distinguished)
                .to_string(),
            mapping,
            changes,
        })
    }

    /// Set `version` on every public package and propagate it to dependents.
    ///
    /// The platform setter and all manifest writes run concurrently. Every task
    /// is awaited even after a failure; failures are returned together and
    /// manifests already written stay written.
    pub async fn apply(&self, version: &str, skip_distinguished: bool) -> Result<SyncReport> {
        let packages = self.collect_packages().await?;
        let distinguished = self.resolver.distinguished().to_string();
        let distinguished_version = self
            .resolver
            .distinguished_version(version, skip_distinguished)
            .to_string();
        let mapping = Arc::new(
            self.resolver
                .resolve(packages.keys(), version, skip_distinguished),
        );

        tracing::info!(
            version,
            packages = mapping.len(),
            distinguished = %distinguished,
            distinguished_version = %distinguished_version,
            "synchronizing versions"
        );

        let platform_task: JoinHandle<Result<()>> = {
            let platform = Arc::clone(&self.platform);
            let mapping = Arc::clone(&mapping);
            let version = distinguished_version.clone();
            tokio::spawn(async move {
                platform
                    .set_distinguished_version(&version, &mapping)
                    .await
            })
        };

        let mut handles: Vec<(String, JoinHandle<Result<ManifestChanges>>)> = Vec::new();
        for (name, package) in packages {
            if name == distinguished {
                continue;
            }

            let mapping = Arc::clone(&mapping);
            let handle = tokio::spawn(async move {
                manifest::rewrite(&package.dir, &package.manifest, &mapping).await
            });
            handles.push((name, handle));
        }

        let total = handles.len() + 1;
        let mut failures = Vec::new();

        match platform_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => failures.push(SyncError::PlatformSetter {
                package: distinguished.clone(),
                source: Box::new(e),
            }),
            Err(e) => failures.push(SyncError::TaskAborted {
                package: distinguished.clone(),
                message: e.to_string(),
            }),
        }

        let mut written = Vec::new();
        for (name, handle) in handles {
            match handle.await {
                Ok(Ok(changes)) => written.push(changes),
                Ok(Err(e)) => {
                    tracing::error!(package = %name, error = %e, "manifest update failed");
                    failures.push(e);
                }
                Err(e) => failures.push(SyncError::TaskAborted {
                    package: name,
                    message: e.to_string(),
                }),
            }
        }

        if !failures.is_empty() {
            return Err(SyncError::Batch { total, failures });
        }

        Ok(SyncReport {
            version: version.to_string(),
            distinguished,
            distinguished_version,
            mapping: Arc::try_unwrap(mapping).unwrap_or_else(|shared| (*shared).clone()),
            written,
        })
    }
}

impl SyncPlan {
    pub fn print(&self) {
        println!(
            "{} Dry run mode - no files will be modified\n",
            "Info:".blue().bold()
        );
        print_mapping(&self.mapping, &self.distinguished);

        let pending: Vec<&ManifestChanges> =
            self.changes.iter().filter(|c| !c.is_noop()).collect();
        if pending.is_empty() {
            println!("\n{} All manifests already up to date", "✓".green().bold());
            return;
        }

        println!("\n{}", "Pending changes:".bright_white().bold());
        for change in pending {
            print_changes(change);
        }
    }
}

impl SyncReport {
    pub fn print(&self) {
        print_mapping(&self.mapping, &self.distinguished);

        println!(
            "\n{} {} stamped at {}",
            "✓".green().bold(),
            self.distinguished.bright_white(),
            self.distinguished_version.cyan()
        );
        println!(
            "{} {} manifests written",
            "✓".green().bold(),
            self.written.len()
        );
        for change in self.written.iter().filter(|c| !c.is_noop()) {
            print_changes(change);
        }
    }
}

fn print_mapping(mapping: &VersionAssignment, distinguished: &str) {
    println!("{}", "Version assignment:".bright_white().bold());
    for (name, version) in mapping.iter() {
        let marker = if name == distinguished { " (distinguished)" } else { "" };
        println!("  {} → {}{}", name, version.cyan(), marker.dimmed());
    }
}

fn print_changes(change: &ManifestChanges) {
    println!("  {}", change.path.display().to_string().dimmed());
    if let Some(new_version) = &change.new_version {
        if change.old_version.as_ref() != Some(new_version) {
            println!(
                "    version: {} → {}",
                change.old_version.as_deref().unwrap_or("(none)"),
                new_version.green()
            );
        }
    }
    for dep in &change.dependencies {
        println!(
            "    {}.{}: {} → {}",
            dep.field,
            dep.name,
            dep.old,
            dep.new.green()
        );
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
