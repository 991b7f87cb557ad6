//! `package.json` parsing and rewriting.

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};
use crate::version::VersionAssignment;

/// File name of a package manifest.
pub const MANIFEST_FILE: &str = "package.json";

/// Manifest fields holding version constraints on other packages.
pub const DEPENDENCY_FIELDS: [&str; 2] = ["dependencies", "devDependencies"];

/// A package manifest kept as an ordered JSON object.
///
/// Fields this crate does not understand are carried through untouched and in
/// their original order.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageManifest {
    fields: Map<String, Value>,
}

/// One dependency constraint that a rewrite changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyChange {
    pub field: &'static str,
    pub name: String,
    pub old: String,
    pub new: String,
}

/// Everything a rewrite changed in one manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManifestChanges {
    pub package: String,
    pub path: PathBuf,
    pub old_version: Option<String>,
    pub new_version: Option<String>,
    pub dependencies: Vec<DependencyChange>,
}

impl ManifestChanges {
    /// True when the rewrite left the manifest content as it was.
    pub fn is_noop(&self) -> bool {
        self.dependencies.is_empty()
            && (self.new_version.is_none() || self.new_version == self.old_version)
    }
}

impl PackageManifest {
    /// Parse manifest text read from `path`.
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| SyncError::malformed(path, e.to_string()))?;

        match value {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(SyncError::malformed(path, "expected a JSON object")),
        }
    }

    /// Read and parse a manifest file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SyncError::io("read", path, e))?;
        Self::parse(path, &content)
    }

    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    pub fn version(&self) -> Option<&str> {
        self.fields.get("version").and_then(Value::as_str)
    }

    /// Private packages are never published and never take part in a release.
    pub fn is_private(&self) -> bool {
        self.fields
            .get("private")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Version constraint declared for `dependency` in `field`, if it is a string.
    pub fn dependency(&self, field: &str, dependency: &str) -> Option<&str> {
        self.fields
            .get(field)
            .and_then(Value::as_object)
            .and_then(|deps| deps.get(dependency))
            .and_then(Value::as_str)
    }

    /// Set the package's own version, appending the field when it is missing.
    pub fn set_version(&mut self, version: &str) {
        self.fields
            .insert("version".to_string(), Value::String(version.to_string()));
    }

    /// Overwrite every dependency constraint on a package in `mapping`.
    ///
    /// Dependency fields that are absent stay absent and entries are never added.
    pub fn update_dependencies(&mut self, mapping: &VersionAssignment) -> Vec<DependencyChange> {
        let mut changes = Vec::new();

        for field in DEPENDENCY_FIELDS {
            let Some(Value::Object(deps)) = self.fields.get_mut(field) else {
                continue;
            };

            for (name, version) in mapping.iter() {
                if let Some(constraint) = deps.get_mut(name) {
                    let old = match &*constraint {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    if old != version {
                        changes.push(DependencyChange {
                            field,
                            name: name.to_string(),
                            old,
                            new: version.to_string(),
                        });
                    }
                    *constraint = Value::String(version.to_string());
                }
            }
        }

        changes
    }

    /// Return an updated copy of this manifest and what changed in it.
    ///
    /// `path` only names the manifest in errors and in the change record.
    pub fn rewritten(
        &self,
        path: &Path,
        mapping: &VersionAssignment,
    ) -> Result<(Self, ManifestChanges)> {
        let name = self
            .name()
            .ok_or_else(|| SyncError::malformed(path, "missing string field `name`"))?
            .to_string();

        let mut updated = self.clone();
        let mut changes = ManifestChanges {
            package: name.clone(),
            path: path.to_path_buf(),
            old_version: self.version().map(str::to_string),
            ..ManifestChanges::default()
        };

        if let Some(version) = mapping.get(&name) {
            updated.set_version(version);
            changes.new_version = Some(version.to_string());
        }
        changes.dependencies = updated.update_dependencies(mapping);

        Ok((updated, changes))
    }

    /// Render as 2-space indented JSON with a single trailing newline.
    pub fn to_json_string(&self) -> serde_json::Result<String> {
        let mut out = serde_json::to_string_pretty(&self.fields)?;
        out.push('\n');
        Ok(out)
    }

    /// Replace the file at `path` with this manifest.
    pub async fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = self
            .to_json_string()
            .map_err(|e| SyncError::malformed(path, e.to_string()))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| SyncError::io("write", path, e))
    }
}

/// Rewrite the manifest of the package in `package_dir` and persist it.
///
/// The caller's manifest is not modified; the updated copy is written to
/// `<package_dir>/package.json`, replacing the whole file.
pub async fn rewrite(
    package_dir: &Path,
    manifest: &PackageManifest,
    mapping: &VersionAssignment,
) -> Result<ManifestChanges> {
    let path = package_dir.join(MANIFEST_FILE);
    let (updated, changes) = manifest.rewritten(&path, mapping)?;

    updated.write_to(&path).await?;
    tracing::info!(
        package = %changes.package,
        path = %path.display(),
        dependencies = changes.dependencies.len(),
        "manifest written"
    );

    Ok(changes)
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
