//! Package graph builder using petgraph.
//!
//! Each workspace package becomes a node. An edge `a -> b` means `a` depends
//! on the workspace sibling `b` and carries the resolved specifier of that
//! declaration, so one edge serves both `a`'s local dependencies and `b`'s
//! local dependents.

use crate::node::{NodeRef, PackageGraphNode};
use crate::resolver::{ResolvedDependency, resolve_dependency};
use crate::{Error, GraphOptions, GraphType, NameCollision, Package, Result};
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use pkgraph_specifier::{NpmSpecifierParser, SpecifierParser, normalize_path};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use tracing::{debug, debug_span};

/// Which local edges a traversal follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Follow declared dependencies: "what does this set need".
    LocalDependencies,
    /// Follow reverse edges: "what needs this set".
    LocalDependents,
}

impl EdgeKind {
    fn direction(self) -> Direction {
        match self {
            Self::LocalDependencies => Direction::Outgoing,
            Self::LocalDependents => Direction::Incoming,
        }
    }
}

/// Where a declared dependency ended up.
enum Classified {
    Local(NodeIndex, ResolvedDependency),
    External(ResolvedDependency),
}

/// Dependency graph of the packages in one workspace.
#[derive(Debug, Clone)]
pub struct PackageGraph {
    pub(crate) graph: StableDiGraph<PackageGraphNode, ResolvedDependency>,
    name_to_node: HashMap<String, NodeIndex>,
}

impl PackageGraph {
    /// Build a graph with the built-in npm specifier parser.
    ///
    /// # Errors
    ///
    /// See [`PackageGraph::with_parser`].
    ///
    /// # Example
    ///
    /// ```
    /// use pkgraph::{DependencyKind, GraphType, Package, PackageGraph};
    ///
    /// let packages = vec![
    ///     Package::new("app", "/repo/packages/app")
    ///         .with_version("1.0.0")
    ///         .with_dependency(DependencyKind::Production, "lib", "^2.0.0"),
    ///     Package::new("lib", "/repo/packages/lib").with_version("2.1.0"),
    /// ];
    ///
    /// let graph = PackageGraph::new(packages, GraphType::AllDependencies, false).unwrap();
    /// let app = graph.get("app").unwrap();
    ///
    /// assert_eq!(app.local_dependencies()[0].0, "lib");
    /// ```
    pub fn new(
        packages: impl IntoIterator<Item = Package>,
        graph_type: GraphType,
        force_local: bool,
    ) -> Result<Self> {
        let options = GraphOptions::new(graph_type).force_local(force_local);
        Self::with_parser(packages, &options, &NpmSpecifierParser)
    }

    /// Build a graph from [`GraphOptions`] with the built-in npm specifier
    /// parser.
    ///
    /// # Errors
    ///
    /// See [`PackageGraph::with_parser`].
    pub fn with_options(
        packages: impl IntoIterator<Item = Package>,
        options: &GraphOptions,
    ) -> Result<Self> {
        Self::with_parser(packages, options, &NpmSpecifierParser)
    }

    /// Build a graph, resolving specifiers with `parser`.
    ///
    /// A dependency whose name matches a sibling package is local when
    /// `force_local` is set, when its fetch spec is the sibling's location, or
    /// when the sibling's version satisfies it. Anything else is external.
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateName`] if packages share a name; every collision is
    ///   reported.
    /// - [`Error::MalformedSpecifier`] if a specifier cannot be parsed.
    /// - [`Error::UnresolvedWorkspaceSpecifier`] if a `workspace:` dependency
    ///   does not match its sibling.
    pub fn with_parser<P>(
        packages: impl IntoIterator<Item = Package>,
        options: &GraphOptions,
        parser: &P,
    ) -> Result<Self>
    where
        P: SpecifierParser + ?Sized,
    {
        let packages: Vec<Package> = packages.into_iter().collect();
        let span = debug_span!("package_graph", packages = packages.len());
        let _guard = span.enter();

        check_unique_names(&packages)?;

        let mut graph = StableDiGraph::with_capacity(packages.len(), 0);
        let mut name_to_node = HashMap::with_capacity(packages.len());
        for package in packages {
            let name = package.name.clone();
            let index = graph.add_node(PackageGraphNode::new(package));
            name_to_node.insert(name.clone(), index);
            debug!(package = %name, "Added package node");
        }

        let mut this = Self {
            graph,
            name_to_node,
        };
        this.classify_dependencies(options, parser)?;

        debug!(
            nodes = this.graph.node_count(),
            local_edges = this.graph.edge_count(),
            "Built package graph"
        );
        Ok(this)
    }

    fn classify_dependencies<P>(&mut self, options: &GraphOptions, parser: &P) -> Result<()>
    where
        P: SpecifierParser + ?Sized,
    {
        let mut classified = Vec::new();

        for index in self.graph.node_indices() {
            let package = &self.graph[index].package;

            for (dependency, raw_spec) in package.graph_dependencies(options.graph_type) {
                let sibling = self.name_to_node.get(&dependency).copied();
                let sibling_version = sibling.and_then(|sibling| self.node(sibling).version());

                let resolved = resolve_dependency(
                    parser,
                    &package.name,
                    &dependency,
                    &raw_spec,
                    &package.location,
                    sibling_version,
                )?;

                let outcome = match sibling {
                    Some(sibling) if self.is_local(sibling, &resolved, options.force_local) => {
                        Classified::Local(sibling, resolved)
                    }
                    Some(_) if resolved.is_workspace_protocol() => {
                        return Err(Error::UnresolvedWorkspaceSpecifier {
                            dependent: package.name.clone(),
                            dependency,
                            spec: resolved.workspace_target().to_string(),
                        });
                    }
                    _ => Classified::External(resolved),
                };

                debug!(
                    dependent = %package.name,
                    dependency = %dependency,
                    local = matches!(outcome, Classified::Local(..)),
                    "Classified dependency"
                );
                classified.push((index, outcome));
            }
        }

        for (index, outcome) in classified {
            match outcome {
                Classified::Local(target, resolved) => {
                    self.graph.add_edge(index, target, resolved);
                }
                Classified::External(resolved) => {
                    self.graph[index]
                        .external_dependencies
                        .insert(resolved.name.clone(), resolved);
                }
            }
        }

        Ok(())
    }

    fn is_local(&self, sibling: NodeIndex, resolved: &ResolvedDependency, force_local: bool) -> bool {
        let sibling = self.node(sibling);
        force_local
            || Path::new(&resolved.fetch_spec) == normalize_path(sibling.location())
            || sibling.satisfies(resolved)
    }

    fn node(&self, index: NodeIndex) -> NodeRef<'_> {
        NodeRef::new(self, index)
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<NodeIndex> {
        self.name_to_node.get(name).copied()
    }

    /// Neighbours of `index` in `direction`, sorted by package name.
    pub(crate) fn sorted_neighbors(&self, index: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut neighbors: Vec<NodeIndex> =
            self.graph.neighbors_directed(index, direction).collect();
        neighbors.sort_by(|a, b| self.graph[*a].package.name.cmp(&self.graph[*b].package.name));
        neighbors.dedup();
        neighbors
    }

    /// Look up a package by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<NodeRef<'_>> {
        self.index_of(name).map(|index| self.node(index))
    }

    /// Whether a package named `name` is in the graph.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.name_to_node.contains_key(name)
    }

    /// Number of packages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Whether the graph has no packages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// All nodes, in the order their packages were supplied.
    pub fn nodes(&self) -> impl Iterator<Item = NodeRef<'_>> + '_ {
        self.graph.node_indices().map(|index| self.node(index))
    }

    /// Descriptors of every package still in the graph, in input order.
    #[must_use]
    pub fn raw_package_list(&self) -> Vec<&Package> {
        self.graph
            .node_indices()
            .map(|index| &self.graph[index].package)
            .collect()
    }

    /// The given packages plus everything they transitively depend on.
    #[must_use]
    pub fn add_dependencies<S: AsRef<str>>(&self, names: &[S]) -> Vec<&Package> {
        self.extend_list(names, EdgeKind::LocalDependencies)
    }

    /// The given packages plus everything that transitively depends on them.
    #[must_use]
    pub fn add_dependents<S: AsRef<str>>(&self, names: &[S]) -> Vec<&Package> {
        self.extend_list(names, EdgeKind::LocalDependents)
    }

    /// Breadth-first closure of `names` over `edge` edges.
    ///
    /// Every reached package appears exactly once, seeds first. Names that
    /// are not in the graph are skipped.
    #[must_use]
    pub fn extend_list<S: AsRef<str>>(&self, names: &[S], edge: EdgeKind) -> Vec<&Package> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();

        for name in names {
            let name = name.as_ref();
            match self.index_of(name) {
                Some(index) => {
                    if visited.insert(index) {
                        queue.push_back(index);
                    }
                }
                None => debug!(package = name, "Skipping unknown package in closure"),
            }
        }

        let mut result = Vec::with_capacity(queue.len());
        while let Some(index) = queue.pop_front() {
            result.push(&self.graph[index].package);

            for neighbor in self.sorted_neighbors(index, edge.direction()) {
                if visited.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }

        result
    }

    /// Remove a package and every local edge touching it.
    ///
    /// Other packages' external dependencies are left alone.
    pub fn remove(&mut self, name: &str) -> Option<Package> {
        let index = self.name_to_node.remove(name)?;
        let node = self.graph.remove_node(index)?;
        debug!(package = name, "Removed package node");
        Some(node.package)
    }

    /// Remove a batch of packages.
    pub fn prune<S: AsRef<str>>(&mut self, names: &[S]) {
        let targets: HashSet<&str> = names
            .iter()
            .map(|name| name.as_ref())
            .filter(|name| self.contains(name))
            .collect();

        if targets.len() == self.len() {
            debug!(packages = targets.len(), "Pruning entire package graph");
            self.graph.clear();
            self.name_to_node.clear();
            return;
        }

        for name in targets {
            self.remove(name);
        }
    }
}

fn check_unique_names(packages: &[Package]) -> Result<()> {
    let mut locations: HashMap<&str, Vec<&Path>> = HashMap::with_capacity(packages.len());
    let mut order = Vec::new();

    for package in packages {
        let entry = locations.entry(package.name.as_str()).or_default();
        if entry.len() == 1 {
            order.push(package.name.as_str());
        }
        entry.push(&package.location);
    }

    if order.is_empty() {
        return Ok(());
    }

    let collisions = order
        .into_iter()
        .map(|name| NameCollision {
            name: name.to_string(),
            locations: locations[name].iter().map(|path| path.to_path_buf()).collect(),
        })
        .collect();

    Err(Error::DuplicateName { collisions })
}
