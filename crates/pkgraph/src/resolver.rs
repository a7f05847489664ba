//! Dependency specifier resolution.
//!
//! Normalizes the competing specifier syntaxes a manifest may use (`link:`,
//! `file:`, `workspace:` with or without aliases, plain ranges) before the
//! remaining specifier is handed to a [`SpecifierParser`].

use crate::{Error, Result};
use pkgraph_specifier::{ParsedSpecifier, SpecifierKind, SpecifierParser};
use std::fmt;
use std::path::Path;

const WORKSPACE_PROTOCOL: &str = "workspace:";

/// The shorthand forms of the `workspace:` protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkspaceAlias {
    /// `workspace:*`, rewritten to the sibling's exact version.
    Any,
    /// `workspace:^`, rewritten to `^<version>`.
    Caret,
    /// `workspace:~`, rewritten to `~<version>`.
    Tilde,
}

impl WorkspaceAlias {
    fn parse(spec: &str) -> Option<Self> {
        match spec {
            "*" => Some(Self::Any),
            "^" => Some(Self::Caret),
            "~" => Some(Self::Tilde),
            _ => None,
        }
    }

    /// The range prefix placed in front of the sibling's version.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Any => "",
            Self::Caret => "^",
            Self::Tilde => "~",
        }
    }
}

impl fmt::Display for WorkspaceAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Any => "*",
            Self::Caret => "^",
            Self::Tilde => "~",
        })
    }
}

/// The outcome of resolving one declared dependency.
///
/// Created once per (declaring package, dependency name) pair while the
/// graph is built and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    /// Dependency name.
    pub name: String,
    /// Specifier exactly as declared in the manifest.
    pub raw_spec: String,
    /// Classification of the install target.
    pub kind: SpecifierKind,
    /// Normalized install target (path, version range, tag or URL).
    pub fetch_spec: String,
    /// Git ref, for git specifiers.
    pub git_committish: Option<String>,
    /// Git semver range, for git specifiers.
    pub git_range: Option<String>,
    /// The full `workspace:` specifier, when that protocol was used.
    pub workspace_spec: Option<String>,
    /// Which alias was used after `workspace:`, if any.
    pub workspace_alias: Option<WorkspaceAlias>,
}

impl ResolvedDependency {
    fn from_parsed(
        raw_spec: &str,
        parsed: ParsedSpecifier,
        workspace_spec: Option<String>,
        workspace_alias: Option<WorkspaceAlias>,
    ) -> Self {
        Self {
            name: parsed.name,
            raw_spec: raw_spec.to_string(),
            kind: parsed.kind,
            fetch_spec: parsed.fetch_spec,
            git_committish: parsed.git_committish,
            git_range: parsed.git_range,
            workspace_spec,
            workspace_alias,
        }
    }

    /// Whether the `workspace:` protocol was used.
    #[must_use]
    pub fn is_workspace_protocol(&self) -> bool {
        self.workspace_spec.is_some()
    }

    /// The `workspace:` specifier with the protocol stripped and any alias
    /// rewritten; the fetch spec when the protocol was not used.
    #[must_use]
    pub fn workspace_target(&self) -> &str {
        match (&self.workspace_spec, self.workspace_alias) {
            (Some(spec), None) => spec.strip_prefix(WORKSPACE_PROTOCOL).unwrap_or(spec),
            _ => &self.fetch_spec,
        }
    }

    /// The range a sibling's version is checked against: the git ref, then
    /// the git range, then the fetch spec.
    #[must_use]
    pub fn version_constraint(&self) -> &str {
        self.git_committish
            .as_deref()
            .or(self.git_range.as_deref())
            .unwrap_or(&self.fetch_spec)
    }
}

/// Resolve one dependency declaration.
///
/// `sibling_version` is `Some` when a workspace package named `name` exists
/// and declares a version; it is only consulted for `workspace:` aliases.
///
/// # Errors
///
/// Returns [`Error::MalformedSpecifier`] if the parser rejects the specifier.
///
/// # Example
///
/// ```
/// use pkgraph::{WorkspaceAlias, resolve_dependency};
/// use pkgraph_specifier::NpmSpecifierParser;
/// use std::path::Path;
///
/// let resolved = resolve_dependency(
///     &NpmSpecifierParser,
///     "app",
///     "lib",
///     "workspace:^",
///     Path::new("/repo/packages/app"),
///     Some("2.0.0"),
/// )
/// .unwrap();
///
/// assert_eq!(resolved.fetch_spec, "^2.0.0");
/// assert_eq!(resolved.workspace_alias, Some(WorkspaceAlias::Caret));
/// ```
pub fn resolve_dependency<P>(
    parser: &P,
    dependent: &str,
    name: &str,
    raw_spec: &str,
    location: &Path,
    sibling_version: Option<&str>,
) -> Result<ResolvedDependency>
where
    P: SpecifierParser + ?Sized,
{
    // Yarn writes symlinked local installs as `link:`; treat them like `file:`.
    let mut spec = match raw_spec.strip_prefix("link:") {
        Some(path) => format!("file:{path}"),
        None => raw_spec.to_string(),
    };

    let mut workspace_spec = None;
    let mut workspace_alias = None;

    if let Some(stripped) = spec.strip_prefix(WORKSPACE_PROTOCOL).map(str::to_string) {
        workspace_spec = Some(spec.clone());
        spec = stripped;

        if let Some(alias) = WorkspaceAlias::parse(&spec) {
            workspace_alias = Some(alias);
            spec = match sibling_version {
                Some(version) => format!("{}{version}", alias.prefix()),
                None => "*".to_string(),
            };
        }
    }

    let parsed = parser
        .parse(name, &spec, location)
        .map_err(|source| Error::MalformedSpecifier {
            dependent: dependent.to_string(),
            dependency: name.to_string(),
            spec: raw_spec.to_string(),
            source,
        })?;

    tracing::trace!(
        dependent,
        dependency = name,
        raw = raw_spec,
        kind = %parsed.kind,
        fetch_spec = %parsed.fetch_spec,
        "Resolved dependency specifier"
    );

    Ok(ResolvedDependency::from_parsed(
        raw_spec,
        parsed,
        workspace_spec,
        workspace_alias,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgraph_specifier::NpmSpecifierParser;

    fn resolve(spec: &str, sibling_version: Option<&str>) -> Result<ResolvedDependency> {
        resolve_dependency(
            &NpmSpecifierParser,
            "app",
            "lib",
            spec,
            Path::new("/repo/packages/app"),
            sibling_version,
        )
    }

    #[test]
    fn test_plain_range() {
        let resolved = resolve("^1.0.0", Some("1.2.0")).unwrap();
        assert_eq!(resolved.fetch_spec, "^1.0.0");
        assert_eq!(resolved.kind, SpecifierKind::Range);
        assert!(!resolved.is_workspace_protocol());
        assert!(resolved.workspace_alias.is_none());
    }

    #[test]
    fn test_link_rewritten_to_file() {
        let link = resolve("link:../lib", None).unwrap();
        let file = resolve("file:../lib", None).unwrap();

        assert_eq!(link.kind, SpecifierKind::Directory);
        assert_eq!(link.fetch_spec, file.fetch_spec);
        assert_eq!(link.fetch_spec, "/repo/packages/lib");
        assert_eq!(link.raw_spec, "link:../lib");
    }

    #[test]
    fn test_workspace_caret_alias() {
        let resolved = resolve("workspace:^", Some("2.0.0")).unwrap();
        assert_eq!(resolved.fetch_spec, "^2.0.0");
        assert_eq!(resolved.workspace_alias, Some(WorkspaceAlias::Caret));
        assert_eq!(resolved.workspace_spec.as_deref(), Some("workspace:^"));
    }

    #[test]
    fn test_workspace_star_alias_is_exact() {
        let resolved = resolve("workspace:*", Some("2.0.0")).unwrap();
        assert_eq!(resolved.fetch_spec, "2.0.0");
        assert_eq!(resolved.kind, SpecifierKind::Version);
        assert_eq!(resolved.workspace_alias, Some(WorkspaceAlias::Any));
    }

    #[test]
    fn test_workspace_tilde_alias() {
        let resolved = resolve("workspace:~", Some("2.0.0")).unwrap();
        assert_eq!(resolved.fetch_spec, "~2.0.0");
        assert_eq!(resolved.workspace_alias, Some(WorkspaceAlias::Tilde));
    }

    #[test]
    fn test_workspace_alias_without_sibling_version() {
        let resolved = resolve("workspace:^", None).unwrap();
        assert_eq!(resolved.fetch_spec, "*");
        assert_eq!(resolved.workspace_alias, Some(WorkspaceAlias::Caret));
    }

    #[test]
    fn test_workspace_explicit_range() {
        let resolved = resolve("workspace:^1.2.0", Some("1.4.0")).unwrap();
        assert_eq!(resolved.fetch_spec, "^1.2.0");
        assert!(resolved.is_workspace_protocol());
        assert!(resolved.workspace_alias.is_none());
    }

    #[test]
    fn test_workspace_target_keeps_declared_range() {
        let resolved = resolve("workspace:>=1.2.0", Some("2.0.0")).unwrap();
        assert_eq!(resolved.workspace_target(), ">=1.2.0");

        let aliased = resolve("workspace:~", Some("2.0.0")).unwrap();
        assert_eq!(aliased.workspace_target(), "~2.0.0");
    }

    #[test]
    fn test_workspace_relative_path() {
        let resolved = resolve("workspace:../lib", None).unwrap();
        assert_eq!(resolved.kind, SpecifierKind::Directory);
        assert_eq!(resolved.fetch_spec, "/repo/packages/lib");
    }

    #[test]
    fn test_malformed_specifier() {
        let err = resolve("not a tag", None).unwrap_err();
        match err {
            Error::MalformedSpecifier {
                dependent,
                dependency,
                spec,
                ..
            } => {
                assert_eq!(dependent, "app");
                assert_eq!(dependency, "lib");
                assert_eq!(spec, "not a tag");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_version_constraint_prefers_git_ref() {
        let resolved = resolve("github:user/lib#semver:^3.0.0", None).unwrap();
        assert_eq!(resolved.version_constraint(), "^3.0.0");

        let resolved = resolve("^1.0.0", None).unwrap();
        assert_eq!(resolved.version_constraint(), "^1.0.0");
    }

    #[test]
    fn test_alias_display() {
        assert_eq!(WorkspaceAlias::Any.to_string(), "*");
        assert_eq!(WorkspaceAlias::Caret.prefix(), "^");
    }
}
