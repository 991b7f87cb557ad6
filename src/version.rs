//! Version assignment for every package taking part in a release.

use serde::Serialize;
use std::collections::BTreeMap;

/// Placeholder version for the distinguished package when it is not released.
pub const SENTINEL_VERSION: &str = "1000.0.0";

/// Immutable mapping from package name to the version it is released at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VersionAssignment {
    versions: BTreeMap<String, String>,
}

impl VersionAssignment {
    pub fn get(&self, package: &str) -> Option<&str> {
        self.versions.get(package).map(String::as_str)
    }

    pub fn contains(&self, package: &str) -> bool {
        self.versions.contains_key(package)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Iterate over `(package, version)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.versions
            .iter()
            .map(|(name, version)| (name.as_str(), version.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for VersionAssignment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            versions: iter
                .into_iter()
                .map(|(name, version)| (name.into(), version.into()))
                .collect(),
        }
    }
}

/// Computes the version every package receives for a release.
#[derive(Debug, Clone)]
pub struct VersionResolver {
    distinguished: String,
    sentinel: String,
}

impl VersionResolver {
    /// Create a resolver that special-cases the `distinguished` package.
    pub fn new(distinguished: impl Into<String>) -> Self {
        Self {
            distinguished: distinguished.into(),
            sentinel: SENTINEL_VERSION.to_string(),
        }
    }

    /// Override the placeholder used when the distinguished package is skipped.
    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinel = sentinel.into();
        self
    }

    pub fn distinguished(&self) -> &str {
        &self.distinguished
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    /// Version the distinguished package ends up with for this release.
    pub fn distinguished_version<'a>(
        &'a self,
        version: &'a str,
        skip_distinguished: bool,
    ) -> &'a str {
        if skip_distinguished {
            &self.sentinel
        } else {
            version
        }
    }

    /// Map every package name to `version`.
    ///
    /// With `skip_distinguished`, the distinguished package is pinned to the
    /// sentinel instead. The version string is not validated.
    pub fn resolve<I>(
        &self,
        packages: I,
        version: &str,
        skip_distinguished: bool,
    ) -> VersionAssignment
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        packages
            .into_iter()
            .map(|name| {
                let name = name.as_ref();
                let assigned = if name == self.distinguished {
                    self.distinguished_version(version, skip_distinguished)
                } else {
                    version
                };
                (name.to_string(), assigned.to_string())
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
