//! Specifier classification and normalization.

use crate::path::resolve_against;
use crate::range::{NpmRange, parse_version};
use crate::{Error, Result};
use std::fmt;
use std::path::Path;

/// What kind of install target a specifier names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecifierKind {
    /// An exact registry version (`1.2.3`).
    Version,
    /// A registry version range (`^1.2.0`, `>=1 <2`, `*`).
    Range,
    /// A registry dist-tag (`latest`, `next`).
    Tag,
    /// A local directory (`file:../lib`, `./lib`).
    Directory,
    /// A local tarball (`file:../lib-1.0.0.tgz`).
    File,
    /// A remote tarball URL.
    Remote,
    /// A git repository, either a URL or a hosted shortcut.
    Git,
    /// An `npm:` alias to a different registry package.
    Alias,
}

impl SpecifierKind {
    /// Whether the specifier is resolved against a registry.
    #[must_use]
    pub fn is_registry(self) -> bool {
        matches!(self, Self::Version | Self::Range | Self::Tag | Self::Alias)
    }

    /// Whether the specifier points at the local filesystem.
    #[must_use]
    pub fn is_local(self) -> bool {
        matches!(self, Self::Directory | Self::File)
    }
}

impl fmt::Display for SpecifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Version => "version",
            Self::Range => "range",
            Self::Tag => "tag",
            Self::Directory => "directory",
            Self::File => "file",
            Self::Remote => "remote",
            Self::Git => "git",
            Self::Alias => "alias",
        };
        f.write_str(kind)
    }
}

/// A dependency specifier after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSpecifier {
    /// Name of the dependency.
    pub name: String,
    /// The specifier exactly as handed to the parser.
    pub raw_spec: String,
    /// Classification of the install target.
    pub kind: SpecifierKind,
    /// Normalized install target: an absolute path for local specifiers, a
    /// range, version or tag for registry specifiers, a URL otherwise.
    pub fetch_spec: String,
    /// Git ref (`#v1.0.0`) for git specifiers.
    pub git_committish: Option<String>,
    /// Git semver range (`#semver:^1.0.0`) for git specifiers.
    pub git_range: Option<String>,
    /// Target package of an `npm:` alias.
    pub alias_target: Option<String>,
}

/// Parses raw dependency specifiers.
///
/// The package graph calls this once per declared dependency; implement it to
/// plug in a different resolution scheme.
pub trait SpecifierParser {
    /// Parse `spec`, declared for dependency `name`, relative to the declaring
    /// package's directory `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the specifier cannot be interpreted.
    fn parse(&self, name: &str, spec: &str, base: &Path) -> Result<ParsedSpecifier>;
}

/// The built-in parser, following npm's `npm-package-arg` classification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NpmSpecifierParser;

const HOSTED_GIT_PREFIXES: &[&str] = &["github:", "gitlab:", "bitbucket:", "gist:"];
const TARBALL_SUFFIXES: &[&str] = &[".tgz", ".tar.gz", ".tar"];

impl SpecifierParser for NpmSpecifierParser {
    fn parse(&self, name: &str, spec: &str, base: &Path) -> Result<ParsedSpecifier> {
        let trimmed = spec.trim();
        let parsed = Parse { name, raw: spec };

        if let Some(path) = file_path(trimmed) {
            return Ok(parsed.local(base, path));
        }

        if is_git(trimmed) {
            return Ok(parsed.git(trimmed));
        }

        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return Ok(parsed.build(SpecifierKind::Remote, trimmed));
        }

        if let Some(alias) = trimmed.strip_prefix("npm:") {
            return parsed.alias(self, alias, base);
        }

        parsed.registry(trimmed)
    }
}

struct Parse<'a> {
    name: &'a str,
    raw: &'a str,
}

impl Parse<'_> {
    fn build(&self, kind: SpecifierKind, fetch_spec: impl Into<String>) -> ParsedSpecifier {
        ParsedSpecifier {
            name: self.name.to_string(),
            raw_spec: self.raw.to_string(),
            kind,
            fetch_spec: fetch_spec.into(),
            git_committish: None,
            git_range: None,
            alias_target: None,
        }
    }

    fn local(&self, base: &Path, path: &str) -> ParsedSpecifier {
        let resolved = resolve_against(base, path);
        let kind = if TARBALL_SUFFIXES.iter().any(|suffix| path.ends_with(suffix)) {
            SpecifierKind::File
        } else {
            SpecifierKind::Directory
        };
        self.build(kind, resolved.to_string_lossy())
    }

    fn git(&self, spec: &str) -> ParsedSpecifier {
        let (url, fragment) = match spec.split_once('#') {
            Some((url, fragment)) => (url, Some(fragment)),
            None => (spec, None),
        };

        let mut parsed = self.build(SpecifierKind::Git, url);
        if let Some(fragment) = fragment.filter(|f| !f.is_empty()) {
            match fragment.strip_prefix("semver:") {
                Some(range) => parsed.git_range = Some(range.to_string()),
                None => parsed.git_committish = Some(fragment.to_string()),
            }
        }
        parsed
    }

    fn alias(
        &self,
        parser: &NpmSpecifierParser,
        alias: &str,
        base: &Path,
    ) -> Result<ParsedSpecifier> {
        // A leading '@' belongs to the scope, not the version separator.
        let separator = alias
            .get(1..)
            .and_then(|rest| rest.rfind('@'))
            .map(|index| index + 1);
        let (target, sub_spec) = match separator {
            Some(index) => (&alias[..index], &alias[index + 1..]),
            None => (alias, ""),
        };

        if target.is_empty() {
            return Err(Error::InvalidAlias {
                name: self.name.to_string(),
                spec: self.raw.to_string(),
            });
        }

        let inner = parser.parse(target, sub_spec, base)?;
        if !matches!(
            inner.kind,
            SpecifierKind::Version | SpecifierKind::Range | SpecifierKind::Tag
        ) {
            return Err(Error::InvalidAlias {
                name: self.name.to_string(),
                spec: self.raw.to_string(),
            });
        }

        let mut parsed = self.build(SpecifierKind::Alias, inner.fetch_spec);
        parsed.alias_target = Some(target.to_string());
        Ok(parsed)
    }

    fn registry(&self, spec: &str) -> Result<ParsedSpecifier> {
        if spec.is_empty() {
            return Ok(self.build(SpecifierKind::Tag, "latest"));
        }

        if parse_version(spec).is_ok() {
            return Ok(self.build(SpecifierKind::Version, spec));
        }

        match NpmRange::parse(spec) {
            Ok(_) => return Ok(self.build(SpecifierKind::Range, spec)),
            // A tag never starts with a digit; keep the range error
            Err(err) if spec.starts_with(|c: char| c.is_ascii_digit()) => return Err(err),
            Err(_) => {}
        }

        if is_uri_safe(spec) {
            return Ok(self.build(SpecifierKind::Tag, spec));
        }

        Err(Error::InvalidTagName {
            name: self.name.to_string(),
            spec: self.raw.to_string(),
        })
    }
}

/// Extract the path of a local specifier, if `spec` is one.
fn file_path(spec: &str) -> Option<&str> {
    if let Some(rest) = spec.strip_prefix("file:") {
        return Some(rest.strip_prefix("//").unwrap_or(rest));
    }

    let looks_like_path = spec == "."
        || spec == ".."
        || spec.starts_with("./")
        || spec.starts_with("../")
        || spec.starts_with('/')
        || spec.starts_with("~/")
        || is_windows_drive(spec);

    looks_like_path.then_some(spec)
}

fn is_windows_drive(spec: &str) -> bool {
    match spec.as_bytes() {
        [drive, b':', separator, ..] => {
            drive.is_ascii_alphabetic() && matches!(separator, b'/' | b'\\')
        }
        _ => false,
    }
}

fn is_git(spec: &str) -> bool {
    if spec.starts_with("git+") || spec.starts_with("git://") || spec.starts_with("git@") {
        return true;
    }
    if HOSTED_GIT_PREFIXES.iter().any(|prefix| spec.starts_with(prefix)) {
        return true;
    }
    if (spec.starts_with("http://") || spec.starts_with("https://"))
        && spec.split('#').next().is_some_and(|url| url.ends_with(".git"))
    {
        return true;
    }
    is_github_shortcut(spec)
}

/// `user/repo` or `user/repo#ref`.
fn is_github_shortcut(spec: &str) -> bool {
    let repo = spec.split('#').next().unwrap_or(spec);
    let Some((user, project)) = repo.split_once('/') else {
        return false;
    };

    let valid_segment = |segment: &str| {
        !segment.is_empty()
            && !segment.starts_with(['.', '-'])
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    };

    valid_segment(user) && valid_segment(project)
}

/// Characters `encodeURIComponent` leaves untouched.
fn is_uri_safe(spec: &str) -> bool {
    spec.chars().all(|c| {
        c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '!' | '~' | '*' | '\'' | '(' | ')')
    })
}
