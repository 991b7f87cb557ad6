//! `version-sync.toml` configuration.
//!
//! ```toml
//! distinguished = "core"
//! sentinel = "1000.0.0"
//! exclude = ["fixtures/*"]
//!
//! [[artifacts]]
//! kind = "properties"
//! path = "android/gradle.properties"
//! key = "VERSION_NAME"
//!
//! [[artifacts]]
//! kind = "manifest"
//! path = "template/package.json"
//!
//! [[artifacts]]
//! kind = "template"
//! path = "ios/Version.h"
//! template = "scripts/templates/Version.h.template"
//! ```

use std::path::{Path, PathBuf};
use toml_edit::{DocumentMut, Item, Table};

use crate::error::{Result, SyncError};
use crate::version::SENTINEL_VERSION;

/// Default configuration file name, looked up at the workspace root.
pub const CONFIG_FILE: &str = "version-sync.toml";

/// A file belonging to the distinguished package that carries its version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSpec {
    /// A `key=value` properties file.
    Properties { path: PathBuf, key: String },
    /// An embedded `package.json` whose dependency constraints follow the release.
    Manifest { path: PathBuf },
    /// A file rendered from a template with the version components.
    Template { path: PathBuf, template: PathBuf },
}

impl ArtifactSpec {
    pub fn path(&self) -> &Path {
        match self {
            Self::Properties { path, .. }
            | Self::Manifest { path }
            | Self::Template { path, .. } => path.as_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub distinguished: Option<String>,
    pub sentinel: String,
    pub exclude: Vec<String>,
    pub artifacts: Vec<ArtifactSpec>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            distinguished: None,
            sentinel: SENTINEL_VERSION.to_string(),
            exclude: Vec::new(),
            artifacts: Vec::new(),
        }
    }
}

impl SyncConfig {
    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| SyncError::io("read", path, e))?;
        Self::parse(path, &content)
    }

    /// Load `version-sync.toml` from `root`, falling back to defaults when absent.
    pub fn discover(root: impl AsRef<Path>) -> Result<Self> {
        let path = root.as_ref().join(CONFIG_FILE);
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let invalid = |reason: String| SyncError::Config {
            path: path.to_path_buf(),
            reason,
        };

        let document: DocumentMut = content.parse().map_err(|e| invalid(format!("{e}")))?;
        let mut config = Self::default();

        if let Some(item) = document.get("distinguished") {
            let name = item
                .as_str()
                .ok_or_else(|| invalid("`distinguished` must be a string".to_string()))?;
            config.distinguished = Some(name.to_string());
        }

        if let Some(item) = document.get("sentinel") {
            config.sentinel = item
                .as_str()
                .ok_or_else(|| invalid("`sentinel` must be a string".to_string()))?
                .to_string();
        }

        if let Some(item) = document.get("exclude") {
            let array = item
                .as_array()
                .ok_or_else(|| invalid("`exclude` must be an array of strings".to_string()))?;
            for pattern in array.iter() {
                let pattern = pattern
                    .as_str()
                    .ok_or_else(|| invalid("`exclude` must be an array of strings".to_string()))?;
                glob::Pattern::new(pattern)
                    .map_err(|e| invalid(format!("invalid exclude pattern `{pattern}`: {e}")))?;
                config.exclude.push(pattern.to_string());
            }
        }

        match document.get("artifacts") {
            None => {}
            Some(Item::ArrayOfTables(tables)) => {
                for (index, table) in tables.iter().enumerate() {
                    config
                        .artifacts
                        .push(Self::parse_artifact(table).map_err(|reason| {
                            invalid(format!("artifacts[{index}]: {reason}"))
                        })?);
                }
            }
            Some(_) => return Err(invalid("`artifacts` must be an array of tables".to_string())),
        }

        Ok(config)
    }

    fn parse_artifact(table: &Table) -> std::result::Result<ArtifactSpec, String> {
        let field = |key: &str| -> std::result::Result<String, String> {
            table
                .get(key)
                .and_then(Item::as_str)
                .map(str::to_string)
                .ok_or_else(|| format!("missing string field `{key}`"))
        };

        let path = PathBuf::from(field("path")?);
        match field("kind")?.as_str() {
            "properties" => Ok(ArtifactSpec::Properties {
                path,
                key: field("key")?,
            }),
            "manifest" => Ok(ArtifactSpec::Manifest { path }),
            "template" => Ok(ArtifactSpec::Template {
                path,
                template: PathBuf::from(field("template")?),
            }),
            other => Err(format!("unknown artifact kind `{other}`")),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
