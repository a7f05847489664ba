//! Graph nodes and the edge-traversal contract shared with collapsed cycles.

use crate::graph::PackageGraph;
use crate::{Package, ResolvedDependency};
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use std::collections::BTreeMap;
use std::path::Path;

/// The data stored for one package in the graph.
///
/// Local edges live in the graph itself, so only the package descriptor and
/// the dependencies that resolved outside the workspace are kept here.
#[derive(Debug, Clone)]
pub struct PackageGraphNode {
    pub(crate) package: Package,
    pub(crate) external_dependencies: BTreeMap<String, ResolvedDependency>,
}

impl PackageGraphNode {
    pub(crate) fn new(package: Package) -> Self {
        Self {
            package,
            external_dependencies: BTreeMap::new(),
        }
    }
}

/// Traversal capability shared by plain packages and collapsed cycles.
///
/// Scheduling code walks a collapsed graph through this trait without caring
/// whether a vertex is a single package or a whole cycle.
pub trait LocalEdges {
    /// Display name of the vertex.
    fn name(&self) -> &str;

    /// Whether the vertex is a collapsed cycle.
    fn is_cycle(&self) -> bool;

    /// Names of local packages this vertex depends on, sorted.
    fn local_dependency_names(&self) -> Vec<&str>;

    /// Names of local packages depending on this vertex, sorted.
    fn local_dependent_names(&self) -> Vec<&str>;
}

/// A borrowed view of one package in a [`PackageGraph`].
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'g> {
    graph: &'g PackageGraph,
    index: NodeIndex,
}

impl<'g> NodeRef<'g> {
    pub(crate) fn new(graph: &'g PackageGraph, index: NodeIndex) -> Self {
        Self { graph, index }
    }

    fn node(&self) -> &'g PackageGraphNode {
        &self.graph.graph[self.index]
    }

    /// Package name.
    #[must_use]
    pub fn name(&self) -> &'g str {
        &self.node().package.name
    }

    /// Declared version, if any.
    #[must_use]
    pub fn version(&self) -> Option<&'g str> {
        self.node().package.version.as_deref()
    }

    /// Package directory.
    #[must_use]
    pub fn location(&self) -> &'g Path {
        &self.node().package.location
    }

    /// The underlying descriptor.
    #[must_use]
    pub fn package(&self) -> &'g Package {
        &self.node().package
    }

    /// Dependencies that point at workspace siblings, sorted by name.
    #[must_use]
    pub fn local_dependencies(&self) -> Vec<(&'g str, &'g ResolvedDependency)> {
        let graph = &self.graph.graph;
        let mut dependencies: Vec<_> = graph
            .edges_directed(self.index, Direction::Outgoing)
            .map(|edge| (graph[edge.target()].package.name.as_str(), edge.weight()))
            .collect();
        dependencies.sort_by(|a, b| a.0.cmp(b.0));
        dependencies
    }

    /// Workspace siblings that depend on this package, sorted by name.
    #[must_use]
    pub fn local_dependents(&self) -> Vec<NodeRef<'g>> {
        self.graph
            .sorted_neighbors(self.index, Direction::Incoming)
            .into_iter()
            .map(|index| NodeRef::new(self.graph, index))
            .collect()
    }

    /// The resolved specifier of the local dependency on `name`, if any.
    #[must_use]
    pub fn local_dependency(&self, name: &str) -> Option<&'g ResolvedDependency> {
        let target = self.graph.index_of(name)?;
        self.graph
            .graph
            .find_edge(self.index, target)
            .map(|edge| &self.graph.graph[edge])
    }

    /// Whether `name` depends on this package through a local edge.
    #[must_use]
    pub fn has_local_dependent(&self, name: &str) -> bool {
        self.graph
            .index_of(name)
            .is_some_and(|source| self.graph.graph.contains_edge(source, self.index))
    }

    /// Dependencies resolved outside the workspace.
    #[must_use]
    pub fn external_dependencies(&self) -> &'g BTreeMap<String, ResolvedDependency> {
        &self.node().external_dependencies
    }

    /// Whether this package's version satisfies `resolved`.
    ///
    /// The git ref wins over the git range, which wins over the fetch spec.
    /// A package without a version satisfies nothing.
    #[must_use]
    pub fn satisfies(&self, resolved: &ResolvedDependency) -> bool {
        self.version().is_some_and(|version| {
            pkgraph_specifier::satisfies(version, resolved.version_constraint())
        })
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.graph, other.graph) && self.index == other.index
    }
}

impl Eq for NodeRef<'_> {}

impl LocalEdges for NodeRef<'_> {
    fn name(&self) -> &str {
        NodeRef::name(self)
    }

    fn is_cycle(&self) -> bool {
        false
    }

    fn local_dependency_names(&self) -> Vec<&str> {
        self.local_dependencies()
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    }

    fn local_dependent_names(&self) -> Vec<&str> {
        self.local_dependents()
            .into_iter()
            .map(|node| NodeRef::name(&node))
            .collect()
    }
}
