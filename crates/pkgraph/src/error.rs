//! Error types for package graph operations.

use miette::Diagnostic;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for package graph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// One package name claimed by more than one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCollision {
    /// The duplicated name.
    pub name: String,
    /// Every location declaring that name, in input order.
    pub locations: Vec<PathBuf>,
}

impl fmt::Display for NameCollision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Package name \"{}\" used in multiple packages:", self.name)?;
        for location in &self.locations {
            write!(f, "\n\t{}", location.display())?;
        }
        Ok(())
    }
}

/// Errors that can occur while building or analysing a package graph.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Two or more packages share a name.
    #[error("{}", format_collisions(collisions))]
    #[diagnostic(
        code(pkgraph::duplicate_name),
        help("Rename one of the packages or remove the duplicate from the workspace")
    )]
    DuplicateName {
        /// Every duplicated name with all of its locations.
        collisions: Vec<NameCollision>,
    },

    /// A dependency declaration could not be parsed.
    #[error("Package \"{dependent}\" declares \"{dependency}\" with malformed specifier \"{spec}\"")]
    #[diagnostic(code(pkgraph::malformed_specifier))]
    MalformedSpecifier {
        /// The declaring package.
        dependent: String,
        /// The declared dependency.
        dependency: String,
        /// The raw specifier.
        spec: String,
        /// Why the parser rejected it.
        #[source]
        #[diagnostic_source]
        source: pkgraph_specifier::Error,
    },

    /// A `workspace:` dependency does not match its sibling package.
    #[error(
        "Package specification \"{dependency}@{spec}\" could not be resolved within the workspace. To reference a non-matching, remote version of a local dependency, remove the 'workspace:' prefix."
    )]
    #[diagnostic(
        code(pkgraph::unresolved_workspace_specifier),
        help("Declared by \"{dependent}\"; workspace: dependencies never fall back to the registry")
    )]
    UnresolvedWorkspaceSpecifier {
        /// The declaring package.
        dependent: String,
        /// The declared dependency.
        dependency: String,
        /// The specifier after the `workspace:` prefix and alias rewriting.
        spec: String,
    },

    /// Dependency cycles were found and the caller asked to reject them.
    #[error("Dependency cycles detected, you should fix these!\n{}", paths.join("\n"))]
    #[diagnostic(
        code(pkgraph::cycles_detected),
        help("Break each cycle by removing one of its local dependencies")
    )]
    CyclesDetected {
        /// One path per cycle, e.g. `a -> b -> c -> a`.
        paths: Vec<String>,
    },

    /// A manifest document could not be deserialized.
    #[error("Invalid package manifest at {}: {source}", location.display())]
    #[diagnostic(
        code(pkgraph::invalid_manifest),
        help("Ensure the manifest is valid JSON with a string \"name\" field")
    )]
    InvalidManifest {
        /// Location of the package.
        location: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

fn format_collisions(collisions: &[NameCollision]) -> String {
    collisions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_name_lists_every_location() {
        let error = Error::DuplicateName {
            collisions: vec![NameCollision {
                name: "pkg-x".to_string(),
                locations: vec![PathBuf::from("/repo/a"), PathBuf::from("/repo/b")],
            }],
        };

        let message = error.to_string();
        assert!(message.contains("Package name \"pkg-x\" used in multiple packages:"));
        assert!(message.contains("\n\t/repo/a"));
        assert!(message.contains("\n\t/repo/b"));
    }

    #[test]
    fn test_cycles_detected_lists_paths() {
        let error = Error::CyclesDetected {
            paths: vec!["a -> b -> a".to_string(), "c -> d -> c".to_string()],
        };

        assert_eq!(
            error.to_string(),
            "Dependency cycles detected, you should fix these!\na -> b -> a\nc -> d -> c"
        );
    }

    #[test]
    fn test_unresolved_workspace_message() {
        let error = Error::UnresolvedWorkspaceSpecifier {
            dependent: "a".to_string(),
            dependency: "b".to_string(),
            spec: "1.2.3".to_string(),
        };

        let message = error.to_string();
        assert!(message.contains("\"b@1.2.3\""));
        assert!(message.contains("remove the 'workspace:' prefix"));
    }

    #[test]
    fn test_malformed_specifier_keeps_source() {
        use std::error::Error as _;

        let error = Error::MalformedSpecifier {
            dependent: "a".to_string(),
            dependency: "b".to_string(),
            spec: "bad spec".to_string(),
            source: pkgraph_specifier::Error::InvalidTagName {
                name: "b".to_string(),
                spec: "bad spec".to_string(),
            },
        };

        assert!(error.source().is_some());
    }

    #[test]
    fn test_diagnostic_code() {
        let error = Error::CyclesDetected { paths: vec![] };
        let code = error.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("pkgraph::cycles_detected"));
    }
}
