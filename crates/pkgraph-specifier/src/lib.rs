//! npm-style dependency specifier parsing for pkgraph.
//!
//! This crate turns the right-hand side of a manifest dependency declaration
//! (`"^1.2.0"`, `"file:../lib"`, `"github:user/repo#v1"`, ...) into a
//! [`ParsedSpecifier`] and answers whether a concrete version satisfies an
//! npm range.
//!
//! # Key Types
//!
//! - [`SpecifierParser`]: Trait implemented by specifier parsers
//! - [`NpmSpecifierParser`]: Built-in parser following npm's rules
//! - [`ParsedSpecifier`]: Normalized result with its [`SpecifierKind`] and fetch spec
//! - [`NpmRange`]: An npm range (`||` alternatives, x-ranges, hyphen ranges)
//!
//! # Example
//!
//! ```
//! use pkgraph_specifier::{NpmSpecifierParser, SpecifierKind, SpecifierParser, satisfies};
//! use std::path::Path;
//!
//! let parsed = NpmSpecifierParser
//!     .parse("lodash", "^4.17.0", Path::new("/repo/packages/app"))
//!     .unwrap();
//! assert_eq!(parsed.kind, SpecifierKind::Range);
//! assert!(satisfies("4.17.21", &parsed.fetch_spec));
//!
//! let local = NpmSpecifierParser
//!     .parse("lib", "file:../lib", Path::new("/repo/packages/app"))
//!     .unwrap();
//! assert_eq!(local.kind, SpecifierKind::Directory);
//! assert_eq!(local.fetch_spec, "/repo/packages/lib");
//! ```

mod error;
mod parse;
mod path;
mod range;

pub use error::{Error, Result};
pub use parse::{NpmSpecifierParser, ParsedSpecifier, SpecifierKind, SpecifierParser};
pub use path::normalize_path;
pub use range::{NpmRange, satisfies};
