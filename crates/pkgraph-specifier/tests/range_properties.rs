//! Property-based tests for npm range translation.
//!
//! These tests verify the behavioral contracts of `satisfies`:
//! - A bare version only admits itself
//! - Caret and tilde ranges admit their own base version
//! - x-ranges agree with the equivalent comparator set

use pkgraph_specifier::{NpmSpecifierParser, SpecifierKind, SpecifierParser, satisfies};
use proptest::prelude::*;
use std::path::Path;

fn version_strategy() -> impl Strategy<Value = (u64, u64, u64)> {
    (0..20_u64, 0..20_u64, 0..20_u64)
}

proptest! {
    /// Contract: a bare npm version is exact, unlike Cargo's caret default.
    #[test]
    fn bare_version_is_exact((major, minor, patch) in version_strategy()) {
        let version = format!("{major}.{minor}.{patch}");
        let next_patch = format!("{major}.{minor}.{}", patch + 1);

        prop_assert!(satisfies(&version, &version));
        prop_assert!(!satisfies(&next_patch, &version));
    }

    /// Contract: caret and tilde ranges always admit the version they are built from.
    #[test]
    fn caret_and_tilde_admit_base((major, minor, patch) in version_strategy()) {
        let version = format!("{major}.{minor}.{patch}");

        let caret = format!("^{version}");
        let tilde = format!("~{version}");
        prop_assert!(satisfies(&version, &caret));
        prop_assert!(satisfies(&version, &tilde));
    }

    /// Contract: `M.x` is the same as `>=M.0.0 <M+1.0.0`.
    #[test]
    fn x_range_matches_comparators(
        (major, minor, patch) in version_strategy(),
        range_major in 0..20_u64,
    ) {
        let version = format!("{major}.{minor}.{patch}");
        let x_range = format!("{range_major}.x");
        let comparators = format!(">={range_major}.0.0 <{}.0.0", range_major + 1);

        prop_assert_eq!(satisfies(&version, &x_range), satisfies(&version, &comparators));
    }

    /// Contract: relative paths always classify as local directories.
    #[test]
    fn relative_paths_are_directories(segment in "[a-z][a-z0-9-]{0,12}") {
        let spec = format!("../{segment}");
        let parsed = NpmSpecifierParser
            .parse("dep", &spec, Path::new("/repo/packages/app"))
            .expect("relative path should parse");

        prop_assert_eq!(parsed.kind, SpecifierKind::Directory);
        prop_assert_eq!(parsed.fetch_spec, format!("/repo/packages/{segment}"));
    }
}
