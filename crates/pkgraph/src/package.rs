//! Package descriptors: the manifest data the graph is built from.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Dependency name to raw specifier, ordered by name.
pub type DependencyMap = BTreeMap<String, String>;

/// One package's manifest data.
///
/// Descriptors are read-only to the graph. The `location` is the package's
/// directory; relative `file:` specifiers are resolved against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    /// Package name, unique within a workspace.
    pub name: String,

    /// Declared version, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Directory containing the package manifest.
    #[serde(skip)]
    pub location: PathBuf,

    /// Whether the package is excluded from publishing.
    #[serde(default)]
    pub private: bool,

    /// Production dependencies.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: DependencyMap,

    /// Development dependencies.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dev_dependencies: DependencyMap,

    /// Optional dependencies.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub optional_dependencies: DependencyMap,

    /// Peer dependencies. Never turned into graph edges.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub peer_dependencies: DependencyMap,
}

/// Which dependency map a declaration lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// `dependencies`
    Production,
    /// `devDependencies`
    Dev,
    /// `optionalDependencies`
    Optional,
    /// `peerDependencies`
    Peer,
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Production => "dependencies",
            Self::Dev => "devDependencies",
            Self::Optional => "optionalDependencies",
            Self::Peer => "peerDependencies",
        })
    }
}

/// Which declarations become graph edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GraphType {
    /// Production, optional and dev dependencies.
    #[default]
    AllDependencies,
    /// Production and optional dependencies only.
    Dependencies,
}

impl Package {
    /// Create a package with no version and no dependencies.
    #[must_use]
    pub fn new(name: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            version: None,
            location: location.into(),
            private: false,
            dependencies: DependencyMap::new(),
            dev_dependencies: DependencyMap::new(),
            optional_dependencies: DependencyMap::new(),
            peer_dependencies: DependencyMap::new(),
        }
    }

    /// Parse a `package.json` document held in memory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidManifest`] if the document is not valid JSON or
    /// lacks a `name`.
    ///
    /// # Example
    ///
    /// ```
    /// use pkgraph::Package;
    ///
    /// let pkg = Package::from_manifest(
    ///     r#"{ "name": "app", "version": "1.0.0", "dependencies": { "lib": "^1.0.0" } }"#,
    ///     "/repo/packages/app",
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(pkg.name, "app");
    /// assert_eq!(pkg.dependencies.get("lib").map(String::as_str), Some("^1.0.0"));
    /// ```
    pub fn from_manifest(json: &str, location: impl Into<PathBuf>) -> Result<Self> {
        let location = location.into();
        let mut package: Self =
            serde_json::from_str(json).map_err(|source| Error::InvalidManifest {
                location: location.clone(),
                source,
            })?;
        package.location = location;
        Ok(package)
    }

    /// Set the version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the private flag.
    #[must_use]
    pub fn with_private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    /// Declare a dependency.
    #[must_use]
    pub fn with_dependency(
        mut self,
        kind: DependencyKind,
        name: impl Into<String>,
        spec: impl Into<String>,
    ) -> Self {
        self.dependencies_mut(kind).insert(name.into(), spec.into());
        self
    }

    /// The declarations of one kind.
    #[must_use]
    pub fn dependencies_of(&self, kind: DependencyKind) -> &DependencyMap {
        match kind {
            DependencyKind::Production => &self.dependencies,
            DependencyKind::Dev => &self.dev_dependencies,
            DependencyKind::Optional => &self.optional_dependencies,
            DependencyKind::Peer => &self.peer_dependencies,
        }
    }

    fn dependencies_mut(&mut self, kind: DependencyKind) -> &mut DependencyMap {
        match kind {
            DependencyKind::Production => &mut self.dependencies,
            DependencyKind::Dev => &mut self.dev_dependencies,
            DependencyKind::Optional => &mut self.optional_dependencies,
            DependencyKind::Peer => &mut self.peer_dependencies,
        }
    }

    /// The declarations that become graph edges for `graph_type`.
    ///
    /// Later kinds override earlier ones on a name collision: production wins
    /// over optional, which wins over dev.
    #[must_use]
    pub fn graph_dependencies(&self, graph_type: GraphType) -> DependencyMap {
        let kinds: &[DependencyKind] = match graph_type {
            GraphType::Dependencies => &[DependencyKind::Optional, DependencyKind::Production],
            GraphType::AllDependencies => &[
                DependencyKind::Dev,
                DependencyKind::Optional,
                DependencyKind::Production,
            ],
        };

        let mut merged = DependencyMap::new();
        for kind in kinds {
            merged.extend(
                self.dependencies_of(*kind)
                    .iter()
                    .map(|(name, spec)| (name.clone(), spec.clone())),
            );
        }
        merged
    }

    /// The package directory.
    #[must_use]
    pub fn location(&self) -> &Path {
        &self.location
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_manifest_reads_all_maps() {
        let pkg = Package::from_manifest(
            r#"{
                "name": "app",
                "version": "1.2.3",
                "private": true,
                "dependencies": { "a": "^1.0.0" },
                "devDependencies": { "b": "^2.0.0" },
                "optionalDependencies": { "c": "^3.0.0" },
                "peerDependencies": { "d": "^4.0.0" }
            }"#,
            "/repo/app",
        )
        .unwrap();

        assert_eq!(pkg.name, "app");
        assert_eq!(pkg.version.as_deref(), Some("1.2.3"));
        assert!(pkg.private);
        assert_eq!(pkg.location, PathBuf::from("/repo/app"));
        assert_eq!(pkg.dependencies.len(), 1);
        assert_eq!(pkg.dev_dependencies.len(), 1);
        assert_eq!(pkg.optional_dependencies.len(), 1);
        assert_eq!(pkg.peer_dependencies.len(), 1);
    }

    #[test]
    fn test_from_manifest_missing_name() {
        let err = Package::from_manifest(r#"{ "version": "1.0.0" }"#, "/repo/x").unwrap_err();
        assert!(matches!(err, Error::InvalidManifest { .. }));
    }

    #[test]
    fn test_graph_dependencies_scope() {
        let pkg = Package::new("app", "/repo/app")
            .with_dependency(DependencyKind::Production, "prod", "1.0.0")
            .with_dependency(DependencyKind::Dev, "dev", "1.0.0")
            .with_dependency(DependencyKind::Optional, "opt", "1.0.0")
            .with_dependency(DependencyKind::Peer, "peer", "1.0.0");

        let all = pkg.graph_dependencies(GraphType::AllDependencies);
        assert_eq!(
            all.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["dev", "opt", "prod"]
        );

        let runtime = pkg.graph_dependencies(GraphType::Dependencies);
        assert_eq!(
            runtime.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["opt", "prod"]
        );
    }

    #[test]
    fn test_graph_dependencies_precedence() {
        let pkg = Package::new("app", "/repo/app")
            .with_dependency(DependencyKind::Dev, "shared", "dev-spec")
            .with_dependency(DependencyKind::Optional, "shared", "optional-spec")
            .with_dependency(DependencyKind::Production, "shared", "prod-spec");

        let merged = pkg.graph_dependencies(GraphType::AllDependencies);
        assert_eq!(merged.get("shared").map(String::as_str), Some("prod-spec"));
    }

    #[test]
    fn test_graph_type_deserialize() {
        let ty: GraphType = serde_json::from_str("\"dependencies\"").unwrap();
        assert_eq!(ty, GraphType::Dependencies);
        assert_eq!(GraphType::default(), GraphType::AllDependencies);
    }

    #[test]
    fn test_dependency_kind_display() {
        assert_eq!(DependencyKind::Dev.to_string(), "devDependencies");
    }
}
