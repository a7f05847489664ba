//! npm range semantics on top of the `semver` crate.
//!
//! npm and Cargo disagree on several range forms: a bare `1.2.3` is exact in
//! npm but caret in Cargo, `1.2` is an x-range in npm, and npm allows
//! whitespace-separated comparator sets and `||` alternatives. [`NpmRange`]
//! translates each alternative into a [`VersionReq`] with npm's meaning.

use crate::{Error, Result};
use semver::{Version, VersionReq};
use std::fmt;

/// A parsed npm version range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpmRange {
    raw: String,
    alternatives: Vec<VersionReq>,
}

impl NpmRange {
    /// Parse an npm range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRange`] if any `||` alternative cannot be translated.
    pub fn parse(range: &str) -> Result<Self> {
        let alternatives = range
            .split("||")
            .map(|alternative| parse_alternative(range, alternative.trim()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            raw: range.trim().to_string(),
            alternatives,
        })
    }

    /// Whether `version` satisfies any alternative of this range.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    /// The `semver` requirements this range was translated into, one per alternative.
    #[must_use]
    pub fn alternatives(&self) -> &[VersionReq] {
        &self.alternatives
    }
}

impl fmt::Display for NpmRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Check whether `version` satisfies the npm `range`.
///
/// Unparseable versions or ranges never satisfy anything.
///
/// # Example
///
/// ```
/// use pkgraph_specifier::satisfies;
///
/// assert!(satisfies("2.0.0", "^2.0.0"));
/// assert!(satisfies("2.0.0", "2.0.0"));
/// assert!(!satisfies("2.0.1", "2.0.0"));
/// assert!(satisfies("1.4.0", "1.x || >=3"));
/// ```
#[must_use]
pub fn satisfies(version: &str, range: &str) -> bool {
    let Ok(version) = parse_version(version) else {
        return false;
    };

    match NpmRange::parse(range) {
        Ok(range) => range.matches(&version),
        Err(error) => {
            tracing::trace!(%error, "Range does not parse, treating as unsatisfied");
            false
        }
    }
}

/// Parse a version the way npm's loose mode accepts it (`v1.2.3`, `=1.2.3`).
pub(crate) fn parse_version(version: &str) -> std::result::Result<Version, semver::Error> {
    let version = version.trim();
    let version = version
        .strip_prefix('=')
        .unwrap_or(version)
        .trim_start_matches(['v', 'V']);
    Version::parse(version)
}

fn parse_alternative(full: &str, alternative: &str) -> Result<VersionReq> {
    let translated = if let Some((start, end)) = split_hyphen_range(alternative) {
        translate_hyphen(full, start, end)?
    } else {
        let comparators = group_comparators(alternative)
            .into_iter()
            .map(|comparator| translate_comparator(full, &comparator))
            .collect::<Result<Vec<_>>>()?;
        comparators
            .into_iter()
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    };

    if translated.is_empty() {
        return Ok(VersionReq::STAR);
    }

    VersionReq::parse(&translated).map_err(|e| Error::InvalidRange {
        range: full.to_string(),
        reason: e.to_string(),
    })
}

/// Split `1.0.0 - 2.0.0` into its bounds.
fn split_hyphen_range(range: &str) -> Option<(&str, &str)> {
    let (start, end) = range.split_once(" - ")?;
    let (start, end) = (start.trim(), end.trim());
    (!start.is_empty() && !end.is_empty()).then_some((start, end))
}

fn translate_hyphen(full: &str, start: &str, end: &str) -> Result<String> {
    let lower = PartialVersion::parse(full, start)?;
    let upper = PartialVersion::parse(full, end)?;

    let mut bounds = Vec::new();
    if let Some(lower) = lower.floor() {
        bounds.push(format!(">={lower}"));
    }
    match upper.exact() {
        Some(exact) => bounds.push(format!("<={exact}")),
        None => {
            if let Some(ceiling) = upper.ceiling(full)? {
                bounds.push(format!("<{ceiling}"));
            }
        }
    }
    Ok(bounds.join(", "))
}

/// Group whitespace-separated tokens into comparators, reattaching dangling
/// operators (`>= 1.2.3` is one comparator).
fn group_comparators(range: &str) -> Vec<String> {
    let mut comparators = Vec::new();
    let mut pending_operator = String::new();

    for token in range.split_whitespace() {
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
            pending_operator.push_str(token);
            continue;
        }
        comparators.push(format!("{pending_operator}{token}"));
        pending_operator.clear();
    }

    if !pending_operator.is_empty() {
        comparators.push(pending_operator);
    }

    comparators
}

fn translate_comparator(full: &str, comparator: &str) -> Result<String> {
    let (operator, rest) = split_operator(comparator);
    let version = PartialVersion::parse(full, rest)?;

    let translated = match operator {
        "" | "=" => match version.exact() {
            Some(exact) => format!("={exact}"),
            None => version.x_range(full)?,
        },
        "^" | "~" | "~>" => {
            let op = if operator == "^" { "^" } else { "~" };
            match version.as_requirement_operand() {
                Some(operand) => format!("{op}{operand}"),
                None => String::new(),
            }
        }
        ">" | ">=" | "<" | "<=" => match version.as_requirement_operand() {
            Some(operand) => format!("{operator}{operand}"),
            // `>=*` and `<=*` match everything, `>*` and `<*` match nothing
            None if operator == ">=" || operator == "<=" => String::new(),
            None => "<0.0.0-0".to_string(),
        },
        other => {
            return Err(Error::InvalidRange {
                range: full.to_string(),
                reason: format!("unknown operator '{other}'"),
            });
        }
    };

    Ok(translated)
}

fn split_operator(comparator: &str) -> (&str, &str) {
    for operator in [">=", "<=", "~>", ">", "<", "=", "~", "^"] {
        if let Some(rest) = comparator.strip_prefix(operator) {
            return (operator, rest.trim());
        }
    }
    ("", comparator)
}

/// A version with optional (wildcard) minor and patch components.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PartialVersion {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    suffix: String,
}

impl PartialVersion {
    fn parse(full: &str, text: &str) -> Result<Self> {
        let text = text.trim_start_matches(['v', 'V']);
        if text.is_empty() {
            return Ok(Self::any());
        }

        // Prerelease and build metadata hang off the patch component.
        let (core, suffix) = match text.find(['-', '+']) {
            Some(index) => text.split_at(index),
            None => (text, ""),
        };

        let mut parts = core.split('.');
        let major = Self::component(full, parts.next())?;
        let minor = Self::component(full, parts.next())?;
        let patch = Self::component(full, parts.next())?;

        if parts.next().is_some() {
            return Err(Error::InvalidRange {
                range: full.to_string(),
                reason: format!("too many version components in '{text}'"),
            });
        }

        Ok(Self {
            major,
            minor: major.and(minor),
            patch: major.and(minor).and(patch),
            suffix: suffix.to_string(),
        })
    }

    fn any() -> Self {
        Self {
            major: None,
            minor: None,
            patch: None,
            suffix: String::new(),
        }
    }

    fn component(full: &str, part: Option<&str>) -> Result<Option<u64>> {
        match part {
            None | Some("x" | "X" | "*") => Ok(None),
            Some(digits) => digits.parse().map(Some).map_err(|_| Error::InvalidRange {
                range: full.to_string(),
                reason: format!("'{digits}' is not a version number"),
            }),
        }
    }

    /// The full version if every component is present.
    fn exact(&self) -> Option<String> {
        match (self.major, self.minor, self.patch) {
            (Some(major), Some(minor), Some(patch)) => {
                Some(format!("{major}.{minor}.{patch}{}", self.suffix))
            }
            _ => None,
        }
    }

    /// Lowest version admitted by this partial version.
    fn floor(&self) -> Option<String> {
        let major = self.major?;
        Some(match self.exact() {
            Some(exact) => exact,
            None => format!("{major}.{}.0", self.minor.unwrap_or(0)),
        })
    }

    /// First version above this partial version, for partial upper bounds.
    fn ceiling(&self, full: &str) -> Result<Option<String>> {
        let Some(major) = self.major else {
            return Ok(None);
        };
        let ceiling = match self.minor {
            Some(minor) => minor.checked_add(1).map(|next| format!("{major}.{next}.0")),
            None => major.checked_add(1).map(|next| format!("{next}.0.0")),
        };
        ceiling.map(Some).ok_or_else(|| Error::InvalidRange {
            range: full.to_string(),
            reason: "version component has no successor".to_string(),
        })
    }

    fn x_range(&self, full: &str) -> Result<String> {
        Ok(match (self.floor(), self.ceiling(full)?) {
            (Some(floor), Some(ceiling)) => format!(">={floor}, <{ceiling}"),
            _ => String::new(),
        })
    }

    /// Render for use behind an operator; `semver` accepts partial versions there.
    fn as_requirement_operand(&self) -> Option<String> {
        let major = self.major?;
        Some(match (self.minor, self.patch) {
            (Some(minor), Some(patch)) => format!("{major}.{minor}.{patch}{}", self.suffix),
            (Some(minor), None) => format!("{major}.{minor}"),
            _ => format!("{major}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(text: &str) -> Version {
        Version::parse(text).unwrap()
    }

    #[test]
    fn test_bare_version_is_exact() {
        let range = NpmRange::parse("1.2.3").unwrap();
        assert!(range.matches(&v("1.2.3")));
        assert!(!range.matches(&v("1.2.4")));
    }

    #[test]
    fn test_caret_and_tilde() {
        assert!(satisfies("2.5.0", "^2.0.0"));
        assert!(!satisfies("3.0.0", "^2.0.0"));
        assert!(satisfies("2.0.9", "~2.0.0"));
        assert!(!satisfies("2.1.0", "~2.0.0"));
        assert!(satisfies("0.2.5", "^0.2.1"));
        assert!(!satisfies("0.3.0", "^0.2.1"));
    }

    #[test]
    fn test_star_and_empty() {
        assert!(satisfies("9.9.9", "*"));
        assert!(satisfies("0.0.1", ""));
        assert!(satisfies("1.0.0", "x"));
    }

    #[test]
    fn test_wildcard_comparators() {
        assert!(satisfies("1.0.0", ">=*"));
        assert!(satisfies("1.0.0", "<=*"));
        assert!(!satisfies("1.0.0", ">*"));
        assert!(!satisfies("1.0.0", "> x"));
        assert!(!satisfies("1.0.0", "<*"));
    }

    #[test]
    fn test_x_ranges() {
        assert!(satisfies("1.9.0", "1.x"));
        assert!(!satisfies("2.0.0", "1.x"));
        assert!(satisfies("1.2.7", "1.2.*"));
        assert!(!satisfies("1.3.0", "1.2.*"));
        assert!(satisfies("1.2.0", "1.2"));
        assert!(satisfies("1.0.0", "1"));
    }

    #[test]
    fn test_hyphen_range() {
        assert!(satisfies("1.5.0", "1.0.0 - 2.0.0"));
        assert!(satisfies("2.0.0", "1.0.0 - 2.0.0"));
        assert!(!satisfies("2.0.1", "1.0.0 - 2.0.0"));
        assert!(satisfies("2.9.0", "1.0 - 2"));
        assert!(!satisfies("3.0.0", "1.0 - 2"));
    }

    #[test]
    fn test_space_separated_comparators() {
        assert!(satisfies("2.5.0", ">= 2.1.2 < 3.0.0"));
        assert!(satisfies("2.5.0", ">=2.1.2 <3.0.0"));
        assert!(!satisfies("3.0.0", ">=2.1.2 <3.0.0"));
    }

    #[test]
    fn test_or_alternatives() {
        let range = NpmRange::parse("^1.0.0 || ^2.0.0").unwrap();
        assert_eq!(range.alternatives().len(), 2);
        assert!(range.matches(&v("1.3.0")));
        assert!(range.matches(&v("2.3.0")));
        assert!(!range.matches(&v("3.0.0")));
    }

    #[test]
    fn test_prerelease_exact() {
        assert!(satisfies("1.0.0-beta.1", "1.0.0-beta.1"));
        assert!(!satisfies("1.0.0-beta.2", "1.0.0-beta.1"));
    }

    #[test]
    fn test_loose_version_prefix() {
        assert!(satisfies("v1.2.3", "^1.0.0"));
        assert!(satisfies("1.2.3", "v1.2.3"));
    }

    #[test]
    fn test_invalid_inputs_never_satisfy() {
        assert!(!satisfies("not-a-version", "*"));
        assert!(!satisfies("1.0.0", "latest"));
        assert!(!satisfies("1.0.0", "/some/path"));
    }

    #[test]
    fn test_invalid_range_error() {
        let err = NpmRange::parse("1.2.3.4").unwrap_err();
        assert!(matches!(err, Error::InvalidRange { .. }));
    }

    #[test]
    fn test_component_without_successor() {
        for range in [
            "1.18446744073709551615",
            "18446744073709551615",
            "18446744073709551615.x",
            "1.0.0 - 2.18446744073709551615",
        ] {
            let err = NpmRange::parse(range).unwrap_err();
            assert!(matches!(err, Error::InvalidRange { .. }), "{range}");
            assert!(!satisfies("1.0.0", range));
        }
    }

    #[test]
    fn test_largest_exact_component_still_parses() {
        assert!(satisfies("1.18446744073709551615.0", "1.18446744073709551615.0"));
        assert!(satisfies("18446744073709551615.0.0", ">=1.0.0"));
    }

    #[test]
    fn test_display_keeps_raw_text() {
        let range = NpmRange::parse(" ^1.0.0 ").unwrap();
        assert_eq!(range.to_string(), "^1.0.0");
    }
}
