//! Graph construction options.

use crate::GraphType;
use serde::{Deserialize, Serialize};

/// Options controlling how a [`PackageGraph`](crate::PackageGraph) is built
/// and how cycles are treated.
///
/// Deserializes from camelCase keys so it can sit inside a project
/// configuration document; every field has a default.
///
/// # Example
///
/// ```
/// use pkgraph::{GraphOptions, GraphType};
///
/// let options: GraphOptions =
///     serde_json::from_str(r#"{ "graphType": "dependencies", "rejectCycles": true }"#).unwrap();
///
/// assert_eq!(options.graph_type, GraphType::Dependencies);
/// assert!(!options.force_local);
/// assert!(options.reject_cycles);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphOptions {
    /// Which declarations become edges.
    pub graph_type: GraphType,

    /// Treat every sibling dependency as local regardless of version.
    pub force_local: bool,

    /// Fail cycle analysis instead of warning when cycles exist.
    pub reject_cycles: bool,
}

impl GraphOptions {
    /// Options with the given graph type and defaults otherwise.
    #[must_use]
    pub fn new(graph_type: GraphType) -> Self {
        Self {
            graph_type,
            ..Self::default()
        }
    }

    /// Set `force_local`.
    #[must_use]
    pub fn force_local(mut self, force_local: bool) -> Self {
        self.force_local = force_local;
        self
    }

    /// Set `reject_cycles`.
    #[must_use]
    pub fn reject_cycles(mut self, reject_cycles: bool) -> Self {
        self.reject_cycles = reject_cycles;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = GraphOptions::default();
        assert_eq!(options.graph_type, GraphType::AllDependencies);
        assert!(!options.force_local);
        assert!(!options.reject_cycles);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let options: GraphOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, GraphOptions::default());
    }

    #[test]
    fn test_round_trip_keys_are_camel_case() {
        let options = GraphOptions::new(GraphType::Dependencies)
            .force_local(true)
            .reject_cycles(true);

        let json = serde_json::to_value(options).unwrap();
        assert_eq!(json["graphType"], "dependencies");
        assert_eq!(json["forceLocal"], true);
        assert_eq!(json["rejectCycles"], true);
    }
}
