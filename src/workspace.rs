//! Workspace scanning and package discovery.

use async_trait::async_trait;
use glob::Pattern;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Result, SyncError};
use crate::manifest::{PackageManifest, MANIFEST_FILE};

/// A package found in the workspace.
#[derive(Debug, Clone)]
pub struct Package {
    pub name: String,
    pub dir: PathBuf,
    pub manifest: PackageManifest,
}

impl Package {
    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    pub fn is_private(&self) -> bool {
        self.manifest.is_private()
    }
}

/// Packages keyed by name.
pub type PackageSet = BTreeMap<String, Package>;

/// Which packages a registry lookup returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackageQuery {
    pub include_private: bool,
    pub include_distinguished: bool,
}

impl PackageQuery {
    /// Whether a package passes this query's visibility filters.
    pub fn admits(&self, name: &str, private: bool, distinguished: Option<&str>) -> bool {
        (self.include_private || !private)
            && (self.include_distinguished || distinguished != Some(name))
    }
}

/// Source of the packages taking part in a release.
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    async fn packages(&self, query: PackageQuery) -> Result<PackageSet>;
}

/// Scans the workspace for package manifests.
#[derive(Debug, Clone)]
pub struct WorkspaceScanner {
    root: PathBuf,
    distinguished: Option<String>,
    exclude: Vec<Pattern>,
}

impl WorkspaceScanner {
    /// Create a new workspace scanner.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            distinguished: None,
            exclude: Vec::new(),
        }
    }

    /// Name the package dropped by queries without `include_distinguished`.
    pub fn with_distinguished(mut self, name: impl Into<String>) -> Self {
        self.distinguished = Some(name.into());
        self
    }

    /// Skip package directories matching any of these root-relative globs.
    ///
    /// Fails on the first pattern that is not a valid glob.
    pub fn with_excludes<I>(mut self, patterns: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.exclude = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Pattern::new(pattern).map_err(|source| SyncError::Pattern {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .collect::<Result<_>>()?;
        Ok(self)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find every package manifest below the root.
    ///
    /// The root manifest's `workspaces` patterns decide membership when present;
    /// otherwise the whole tree is walked.
    pub fn find_manifests(&self) -> Result<Vec<PathBuf>> {
        let mut manifests = match self.workspace_patterns()? {
            Some(patterns) => self.glob_manifests(&patterns)?,
            None => self.walk_manifests()?,
        };

        manifests.retain(|path| {
            let excluded = path.parent().is_some_and(|dir| self.is_excluded(dir));
            if excluded {
                tracing::debug!(path = %path.display(), "excluded by configuration");
            }
            !excluded
        });
        manifests.sort();
        manifests.dedup();
        Ok(manifests)
    }

    /// Read the `workspaces` field of the root manifest.
    fn workspace_patterns(&self) -> Result<Option<Vec<String>>> {
        let path = self.root.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(None);
        }

        let content =
            std::fs::read_to_string(&path).map_err(|e| SyncError::io("read", &path, e))?;
        let root = PackageManifest::parse(&path, &content)?;

        // npm and yarn use an array; yarn also accepts { "packages": [...] }.
        let patterns = match root.get("workspaces") {
            Some(Value::Array(items)) => items,
            Some(Value::Object(fields)) => match fields.get("packages") {
                Some(Value::Array(items)) => items,
                _ => return Ok(None),
            },
            _ => return Ok(None),
        };

        Ok(Some(
            patterns
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        ))
    }

    fn glob_manifests(&self, patterns: &[String]) -> Result<Vec<PathBuf>> {
        let mut manifests = Vec::new();

        for pattern in patterns {
            let full_pattern = self.root.join(pattern);
            let pattern_str = full_pattern.to_string_lossy();

            let entries = glob::glob(&pattern_str).map_err(|source| SyncError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;

            for entry in entries {
                let dir = entry.map_err(|e| {
                    let path = e.path().to_path_buf();
                    SyncError::io("scan", path, e.into_error())
                })?;

                let manifest = dir.join(MANIFEST_FILE);
                if dir.is_dir() && manifest.is_file() {
                    manifests.push(manifest);
                }
            }
        }

        Ok(manifests)
    }

    /// Find all package.json files, excluding the root and dependency/build directories.
    fn walk_manifests(&self) -> Result<Vec<PathBuf>> {
        let mut manifests = Vec::new();

        for entry in WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                let name = e.file_name().to_string_lossy();
                e.depth() == 0
                    || !matches!(name.as_ref(), "node_modules" | ".git" | "target" | "build")
            })
        {
            let entry = entry?;

            if entry.depth() > 1
                && entry.file_type().is_file()
                && entry.file_name() == MANIFEST_FILE
            {
                manifests.push(entry.into_path());
            }
        }

        Ok(manifests)
    }

    fn is_excluded(&self, dir: &Path) -> bool {
        let relative = dir.strip_prefix(&self.root).unwrap_or(dir);
        let relative_str = relative.to_string_lossy();

        self.exclude
            .iter()
            .any(|pattern| pattern.matches(&relative_str))
    }

    /// Read every package once, private and distinguished included.
    pub async fn snapshot(&self) -> Result<WorkspaceSnapshot> {
        let packages = self
            .packages(PackageQuery {
                include_private: true,
                include_distinguished: true,
            })
            .await?;

        Ok(WorkspaceSnapshot {
            packages,
            distinguished: self.distinguished.clone(),
        })
    }
}

#[async_trait]
impl PackageRegistry for WorkspaceScanner {
    async fn packages(&self, query: PackageQuery) -> Result<PackageSet> {
        let scanner = self.clone();
        let manifests = tokio::task::spawn_blocking(move || scanner.find_manifests())
            .await
            .map_err(|e| SyncError::TaskAborted {
                package: self.root.display().to_string(),
                message: e.to_string(),
            })??;

        let mut packages = PackageSet::new();
        for path in manifests {
            let manifest = PackageManifest::load(&path).await?;

            let Some(name) = manifest.name().map(str::to_string) else {
                tracing::warn!(path = %path.display(), "skipping manifest without a name");
                continue;
            };
            if !query.admits(&name, manifest.is_private(), self.distinguished.as_deref()) {
                tracing::debug!(package = %name, "filtered out by query");
                continue;
            }

            let dir = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.root.clone());

            if let Some(existing) = packages.get(&name) {
                return Err(SyncError::DuplicatePackage {
                    name,
                    first: existing.manifest_path(),
                    second: path,
                });
            }

            tracing::debug!(package = %name, dir = %dir.display(), "found package");
            packages.insert(
                name.clone(),
                Package {
                    name,
                    dir,
                    manifest,
                },
            );
        }

        Ok(packages)
    }
}

/// Packages read once from the workspace; queries are answered from memory.
#[derive(Debug, Clone)]
pub struct WorkspaceSnapshot {
    packages: PackageSet,
    distinguished: Option<String>,
}

impl WorkspaceSnapshot {
    /// Every package in the workspace.
    pub fn all(&self) -> &PackageSet {
        &self.packages
    }
}

#[async_trait]
impl PackageRegistry for WorkspaceSnapshot {
    async fn packages(&self, query: PackageQuery) -> Result<PackageSet> {
        Ok(self
            .packages
            .iter()
            .filter(|(name, package)| {
                query.admits(name, package.is_private(), self.distinguished.as_deref())
            })
            .map(|(name, package)| (name.clone(), package.clone()))
            .collect())
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
