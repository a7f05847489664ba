//! Error types for specifier parsing.

use miette::Diagnostic;
use thiserror::Error;

/// Result type for specifier operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing a dependency specifier.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum Error {
    /// The specifier could not be interpreted at all.
    #[error("Invalid specifier '{spec}' for dependency '{name}': {reason}")]
    #[diagnostic(
        code(pkgraph::specifier::invalid),
        help("Use a semver range, a dist-tag, a local path (file:), a git URL or a tarball URL")
    )]
    InvalidSpecifier {
        /// Name of the dependency being declared.
        name: String,
        /// The raw specifier.
        spec: String,
        /// Why the specifier was rejected.
        reason: String,
    },

    /// The specifier looked like a dist-tag but contains characters a tag cannot hold.
    #[error("Invalid tag name \"{spec}\" of package \"{name}\": Tags may not have any characters that encodeURIComponent encodes.")]
    #[diagnostic(
        code(pkgraph::specifier::invalid_tag),
        help("Check the specifier for stray whitespace or a mistyped range operator")
    )]
    InvalidTagName {
        /// Name of the dependency being declared.
        name: String,
        /// The raw specifier.
        spec: String,
    },

    /// A version range could not be translated.
    #[error("Invalid version range '{range}': {reason}")]
    #[diagnostic(
        code(pkgraph::specifier::invalid_range),
        help("Supported forms: 1.2.3, ^1.2.3, ~1.2, >=1 <2, 1.x, 1.0.0 - 2.0.0, and '||' alternatives")
    )]
    InvalidRange {
        /// The range text.
        range: String,
        /// Description of the parse failure.
        reason: String,
    },

    /// An `npm:` alias did not point at a registry package.
    #[error("Invalid alias '{spec}' for dependency '{name}': aliases must point at a registry version, range or tag")]
    #[diagnostic(
        code(pkgraph::specifier::invalid_alias),
        help("Write aliases as npm:<package>@<range>")
    )]
    InvalidAlias {
        /// Name of the dependency being declared.
        name: String,
        /// The raw specifier.
        spec: String,
    },
}

impl Error {
    pub(crate) fn invalid(name: &str, spec: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSpecifier {
            name: name.to_string(),
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }
}
