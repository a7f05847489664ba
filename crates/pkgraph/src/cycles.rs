//! Cycle detection over local dependents.
//!
//! [`PackageGraph::collapse_cycles`] merges every set of mutually reachable
//! packages into a [`CyclicPackageGraphNode`] so schedulers can treat a cycle
//! as one unit. [`PackageGraph::partition_cycles`] enumerates cycle paths the
//! way older tooling did, for callers that need those exact path lists.

use crate::graph::PackageGraph;
use crate::node::{LocalEdges, NodeRef};
use crate::report::report_cycles;
use crate::{GraphOptions, Result};
use petgraph::Direction;
use petgraph::stable_graph::NodeIndex;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use tracing::debug;

/// One member of a collapsed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleMember {
    /// A single package, by name.
    Package(String),
    /// A smaller cycle that was absorbed into a larger one.
    Cycle(CyclicPackageGraphNode),
}

/// A set of packages that depend on each other, collapsed into one vertex.
///
/// The edge sets only name packages outside the cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclicPackageGraphNode {
    name: String,
    members: Vec<CycleMember>,
    local_dependencies: BTreeSet<String>,
    local_dependents: BTreeSet<String>,
}

impl CyclicPackageGraphNode {
    /// `(cycle) ` followed by the sorted package names.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Always `true`.
    #[must_use]
    pub fn is_cycle(&self) -> bool {
        true
    }

    /// Direct members, in the order the cycle was walked.
    #[must_use]
    pub fn members(&self) -> &[CycleMember] {
        &self.members
    }

    /// Whether `name` is a direct package member.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.members
            .iter()
            .any(|member| matches!(member, CycleMember::Package(member) if member == name))
    }

    /// Whether `name` is a member at any depth.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.members.iter().any(|member| match member {
            CycleMember::Package(member) => member == name,
            CycleMember::Cycle(inner) => inner.contains(name),
        })
    }

    /// Every package name in the cycle, nested cycles included.
    #[must_use]
    pub fn flatten(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        for member in &self.members {
            match member {
                CycleMember::Package(name) => names.push(name),
                CycleMember::Cycle(inner) => inner.collect_names(names),
            }
        }
    }

    /// Number of direct members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the cycle has no members. Never true for a collapsed cycle.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Packages outside the cycle that members depend on.
    #[must_use]
    pub fn local_dependencies(&self) -> &BTreeSet<String> {
        &self.local_dependencies
    }

    /// Packages outside the cycle that depend on members.
    #[must_use]
    pub fn local_dependents(&self) -> &BTreeSet<String> {
        &self.local_dependents
    }
}

impl fmt::Display for CyclicPackageGraphNode {
    /// Renders the walk in dependency order, closing back on the first
    /// member: `a -> b -> c -> a`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self
            .members
            .iter()
            .map(|member| match member {
                CycleMember::Package(name) => name.clone(),
                CycleMember::Cycle(inner) => format!("(nested cycle: {inner})"),
            })
            .collect();

        if let Some(first) = parts.first().cloned() {
            parts.push(first);
        }
        parts.reverse();

        f.write_str(&parts.join(" -> "))
    }
}

impl LocalEdges for CyclicPackageGraphNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_cycle(&self) -> bool {
        true
    }

    fn local_dependency_names(&self) -> Vec<&str> {
        self.local_dependencies.iter().map(String::as_str).collect()
    }

    fn local_dependent_names(&self) -> Vec<&str> {
        self.local_dependents.iter().map(String::as_str).collect()
    }
}

/// A vertex of the collapsed graph: a plain package or a whole cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collapsed<'a> {
    /// A package outside every cycle.
    Package(NodeRef<'a>),
    /// A collapsed cycle.
    Cycle(&'a CyclicPackageGraphNode),
}

impl LocalEdges for Collapsed<'_> {
    fn name(&self) -> &str {
        match self {
            Self::Package(node) => node.name(),
            Self::Cycle(cycle) => cycle.name(),
        }
    }

    fn is_cycle(&self) -> bool {
        matches!(self, Self::Cycle(_))
    }

    fn local_dependency_names(&self) -> Vec<&str> {
        match self {
            Self::Package(node) => node.local_dependency_names(),
            Self::Cycle(cycle) => cycle.local_dependency_names(),
        }
    }

    fn local_dependent_names(&self) -> Vec<&str> {
        match self {
            Self::Package(node) => node.local_dependent_names(),
            Self::Cycle(cycle) => cycle.local_dependent_names(),
        }
    }
}

/// The cycles found by [`PackageGraph::collapse_cycles`].
#[derive(Debug, Clone, Default)]
pub struct CollapsedCycles {
    cycles: Vec<CyclicPackageGraphNode>,
    paths: Vec<String>,
    membership: HashMap<String, usize>,
}

impl CollapsedCycles {
    /// Top-level cycles, in discovery order.
    pub fn iter(&self) -> std::slice::Iter<'_, CyclicPackageGraphNode> {
        self.cycles.iter()
    }

    /// Number of top-level cycles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    /// Whether the graph is acyclic.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    /// The top-level cycle containing `package`, if any.
    #[must_use]
    pub fn cycle_for(&self, package: &str) -> Option<&CyclicPackageGraphNode> {
        self.membership
            .get(package)
            .and_then(|&index| self.cycles.get(index))
    }

    /// The collapsed vertex standing in for `package`.
    #[must_use]
    pub fn representative<'a>(
        &'a self,
        graph: &'a PackageGraph,
        package: &str,
    ) -> Option<Collapsed<'a>> {
        match self.cycle_for(package) {
            Some(cycle) => Some(Collapsed::Cycle(cycle)),
            None => graph.get(package).map(Collapsed::Package),
        }
    }

    /// One path string per cycle formed, nested cycles included, in the
    /// order they were formed.
    #[must_use]
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Consume into the top-level cycles.
    #[must_use]
    pub fn into_vec(self) -> Vec<CyclicPackageGraphNode> {
        self.cycles
    }
}

impl<'a> IntoIterator for &'a CollapsedCycles {
    type Item = &'a CyclicPackageGraphNode;
    type IntoIter = std::slice::Iter<'a, CyclicPackageGraphNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.cycles.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Vertex {
    Package(NodeIndex),
    Cycle(usize),
}

struct FormedCycle {
    members: Vec<Vertex>,
    node: CyclicPackageGraphNode,
}

/// Working state of one `collapse_cycles` run.
struct Collapser<'g> {
    graph: &'g PackageGraph,
    formed: Vec<FormedCycle>,
    absorbed_by: HashMap<Vertex, usize>,
    live: Vec<usize>,
    walk_stack: Vec<Vertex>,
    already_visited: HashSet<(Vertex, Vertex)>,
}

impl<'g> Collapser<'g> {
    fn new(graph: &'g PackageGraph) -> Self {
        Self {
            graph,
            formed: Vec::new(),
            absorbed_by: HashMap::new(),
            live: Vec::new(),
            walk_stack: Vec::new(),
            already_visited: HashSet::new(),
        }
    }

    fn run(mut self) -> CollapsedCycles {
        for index in self.graph.graph.node_indices() {
            let vertex = Vertex::Package(index);
            self.visit_with_stack(vertex, vertex);
        }

        // Cycles formed so far may chain into larger ones; those formed while
        // re-walking are walked too.
        let mut rewalked = HashSet::new();
        while let Some(id) = self.live.iter().copied().find(|id| !rewalked.contains(id)) {
            rewalked.insert(id);
            let vertex = Vertex::Cycle(id);
            self.visit_with_stack(vertex, vertex);
        }

        self.finish()
    }

    fn visit_with_stack(&mut self, base: Vertex, current: Vertex) {
        self.walk_stack.push(current);
        for dependent in self.dependents_of(current) {
            self.visit(base, dependent);
        }
        self.walk_stack.pop();
    }

    fn visit(&mut self, base: Vertex, dependent: NodeIndex) {
        if self.absorbed_by.contains_key(&base) {
            return;
        }

        let top = self.top_level(Vertex::Package(dependent));
        if !self.already_visited.insert((base, top)) {
            return;
        }

        let closes = top == base
            || matches!(top, Vertex::Cycle(id) if self.formed[id].members.contains(&base));

        if closes {
            self.collapse_walk_stack();
        } else if !self.walk_stack.contains(&top) {
            self.visit_with_stack(base, top);
        }
    }

    fn top_level(&self, mut vertex: Vertex) -> Vertex {
        while let Some(&id) = self.absorbed_by.get(&vertex) {
            vertex = Vertex::Cycle(id);
        }
        vertex
    }

    fn dependents_of(&self, vertex: Vertex) -> Vec<NodeIndex> {
        match vertex {
            Vertex::Package(index) => self.graph.sorted_neighbors(index, Direction::Incoming),
            Vertex::Cycle(id) => self.formed[id]
                .node
                .local_dependents
                .iter()
                .filter_map(|name| self.graph.index_of(name))
                .collect(),
        }
    }

    fn collapse_walk_stack(&mut self) {
        let id = self.formed.len();
        let members = self.walk_stack.clone();

        for vertex in &members {
            self.absorbed_by.insert(*vertex, id);
            if let Vertex::Cycle(absorbed) = vertex {
                self.live.retain(|live| live != absorbed);
            }
        }

        let node = self.build_node(&members);
        debug!(cycle = %node, "Collapsed dependency cycle");

        self.formed.push(FormedCycle { members, node });
        self.live.push(id);
    }

    fn build_node(&self, members: &[Vertex]) -> CyclicPackageGraphNode {
        let mut cycle_members = Vec::with_capacity(members.len());
        let mut dependencies = BTreeSet::new();
        let mut dependents = BTreeSet::new();

        for vertex in members {
            match *vertex {
                Vertex::Package(index) => {
                    let node = NodeRef::new(self.graph, index);
                    cycle_members.push(CycleMember::Package(node.name().to_string()));
                    dependencies.extend(node.local_dependency_names().into_iter().map(str::to_string));
                    dependents.extend(node.local_dependent_names().into_iter().map(str::to_string));
                }
                Vertex::Cycle(id) => {
                    let inner = &self.formed[id].node;
                    cycle_members.push(CycleMember::Cycle(inner.clone()));
                    dependencies.extend(inner.local_dependencies.iter().cloned());
                    dependents.extend(inner.local_dependents.iter().cloned());
                }
            }
        }

        let mut node = CyclicPackageGraphNode {
            name: String::new(),
            members: cycle_members,
            local_dependencies: BTreeSet::new(),
            local_dependents: BTreeSet::new(),
        };

        let mut flattened: Vec<String> = node.flatten().into_iter().map(str::to_string).collect();
        flattened.sort();

        node.local_dependencies = dependencies
            .into_iter()
            .filter(|name| flattened.binary_search(name).is_err())
            .collect();
        node.local_dependents = dependents
            .into_iter()
            .filter(|name| flattened.binary_search(name).is_err())
            .collect();
        node.name = format!("(cycle) {}", flattened.join(", "));
        node
    }

    fn finish(self) -> CollapsedCycles {
        let paths = self.formed.iter().map(|cycle| cycle.node.to_string()).collect();
        let mut formed: Vec<Option<FormedCycle>> = self.formed.into_iter().map(Some).collect();

        let mut cycles = Vec::with_capacity(self.live.len());
        let mut membership = HashMap::new();
        for id in self.live {
            if let Some(cycle) = formed.get_mut(id).and_then(Option::take) {
                let position = cycles.len();
                for name in cycle.node.flatten() {
                    membership.insert(name.to_string(), position);
                }
                cycles.push(cycle.node);
            }
        }

        CollapsedCycles {
            cycles,
            paths,
            membership,
        }
    }
}

/// State of one outer iteration of `partition_cycles`.
struct Partition<'g, 'r> {
    graph: &'g PackageGraph,
    current: NodeIndex,
    seen: HashSet<NodeIndex>,
    paths: &'r mut Vec<Vec<String>>,
    cycle_nodes: &'r mut BTreeSet<String>,
}

impl Partition<'_, '_> {
    fn name(&self, index: NodeIndex) -> &str {
        &self.graph.graph[index].package.name
    }

    fn record(&mut self, path: Vec<String>) {
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    fn visits(&mut self, walk: &[String], sibling_dependents: &[NodeIndex], dependent: NodeIndex) {
        if !self.seen.insert(dependent) {
            return;
        }

        let mut step = walk.to_vec();
        step.push(self.name(dependent).to_string());

        if dependent == self.current {
            // Direct cycle back to the starting package.
            let name = self.name(self.current).to_string();
            self.cycle_nodes.insert(name);
            self.record(step);
            return;
        }

        if sibling_dependents.contains(&self.current) {
            // Transitive cycle: close it through the package that depends on
            // the starting package.
            let current = NodeRef::new(self.graph, self.current);
            let closing = NodeRef::new(self.graph, dependent)
                .local_dependency_names()
                .into_iter()
                .find(|name| current.has_local_dependent(name))
                .map(str::to_string);

            let mut path: Vec<String> = step.iter().rev().cloned().collect();
            path.extend(closing);

            let name = self.name(dependent).to_string();
            self.cycle_nodes.insert(name);
            self.record(path);
        }

        let next = self.graph.sorted_neighbors(dependent, Direction::Incoming);
        for grand_dependent in next.iter().copied() {
            self.visits(&step, &next, grand_dependent);
        }
    }
}

impl PackageGraph {
    /// Collapse every dependency cycle into a [`CyclicPackageGraphNode`].
    ///
    /// Cycles are reported through [`report_cycles`]: a warning per cycle, or
    /// an error when `reject_cycles` is set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CyclesDetected`](crate::Error::CyclesDetected) if
    /// cycles exist and `reject_cycles` is set.
    ///
    /// # Example
    ///
    /// ```
    /// use pkgraph::{DependencyKind, GraphType, Package, PackageGraph};
    ///
    /// let packages = vec![
    ///     Package::new("a", "/repo/a")
    ///         .with_version("1.0.0")
    ///         .with_dependency(DependencyKind::Production, "b", "^1.0.0"),
    ///     Package::new("b", "/repo/b")
    ///         .with_version("1.0.0")
    ///         .with_dependency(DependencyKind::Production, "a", "^1.0.0"),
    /// ];
    ///
    /// let graph = PackageGraph::new(packages, GraphType::AllDependencies, false).unwrap();
    /// let cycles = graph.collapse_cycles(false).unwrap();
    ///
    /// assert_eq!(cycles.len(), 1);
    /// assert_eq!(cycles.cycle_for("a").unwrap().name(), "(cycle) a, b");
    /// ```
    pub fn collapse_cycles(&self, reject_cycles: bool) -> Result<CollapsedCycles> {
        let collapsed = Collapser::new(self).run();
        report_cycles(collapsed.paths(), reject_cycles)?;
        Ok(collapsed)
    }

    /// [`PackageGraph::collapse_cycles`] driven by [`GraphOptions`].
    ///
    /// # Errors
    ///
    /// See [`PackageGraph::collapse_cycles`].
    pub fn collapse_cycles_with(&self, options: &GraphOptions) -> Result<CollapsedCycles> {
        self.collapse_cycles(options.reject_cycles)
    }

    /// Enumerate cycle paths by walking local dependents from every package.
    ///
    /// Returns the paths, each a sequence of package names, and the packages
    /// that closed a cycle. Identical paths are reported once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CyclesDetected`](crate::Error::CyclesDetected) if
    /// cycles exist and `reject_cycles` is set.
    pub fn partition_cycles(
        &self,
        reject_cycles: bool,
    ) -> Result<(Vec<Vec<String>>, BTreeSet<String>)> {
        let mut paths = Vec::new();
        let mut cycle_nodes = BTreeSet::new();

        for current in self.graph.node_indices() {
            let mut partition = Partition {
                graph: self,
                current,
                seen: HashSet::new(),
                paths: &mut paths,
                cycle_nodes: &mut cycle_nodes,
            };

            let walk = vec![partition.name(current).to_string()];
            let dependents = self.sorted_neighbors(current, Direction::Incoming);
            for dependent in dependents.iter().copied() {
                partition.visits(&walk, &dependents, dependent);
            }
        }

        let rendered: Vec<String> = paths.iter().map(|path| path.join(" -> ")).collect();
        report_cycles(&rendered, reject_cycles)?;

        Ok((paths, cycle_nodes))
    }

    /// [`PackageGraph::partition_cycles`] driven by [`GraphOptions`].
    ///
    /// # Errors
    ///
    /// See [`PackageGraph::partition_cycles`].
    pub fn partition_cycles_with(
        &self,
        options: &GraphOptions,
    ) -> Result<(Vec<Vec<String>>, BTreeSet<String>)> {
        self.partition_cycles(options.reject_cycles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DependencyKind, Error, GraphType, Package};

    fn pkg(name: &str, deps: &[&str]) -> Package {
        let mut package = Package::new(name, format!("/repo/packages/{name}")).with_version("1.0.0");
        for dep in deps {
            package = package.with_dependency(DependencyKind::Production, *dep, "^1.0.0");
        }
        package
    }

    fn build(packages: Vec<Package>) -> PackageGraph {
        PackageGraph::new(packages, GraphType::AllDependencies, false).unwrap()
    }

    fn triangle() -> PackageGraph {
        build(vec![pkg("a", &["b"]), pkg("b", &["c"]), pkg("c", &["a"])])
    }

    #[test]
    fn test_collapse_triangle() {
        let graph = triangle();
        let cycles = graph.collapse_cycles(false).unwrap();

        assert_eq!(cycles.len(), 1);
        let cycle = cycles.iter().next().unwrap();
        assert_eq!(cycle.name(), "(cycle) a, b, c");
        assert_eq!(cycle.len(), 3);
        assert!(cycle.has("a") && cycle.has("b") && cycle.has("c"));
        assert_eq!(cycle.to_string(), "a -> b -> c -> a");
        assert_eq!(cycles.paths(), ["a -> b -> c -> a".to_string()]);
        assert!(cycle.local_dependencies().is_empty());
        assert!(cycle.local_dependents().is_empty());
    }

    #[test]
    fn test_collapse_triangle_rejected() {
        let err = triangle().collapse_cycles(true).unwrap_err();

        let Error::CyclesDetected { paths } = err else {
            panic!("expected CyclesDetected");
        };
        assert_eq!(paths, vec!["a -> b -> c -> a".to_string()]);
    }

    #[test]
    fn test_acyclic_graph_has_no_cycles() {
        let graph = build(vec![pkg("a", &["b"]), pkg("b", &["c"]), pkg("c", &[])]);

        let cycles = graph.collapse_cycles(true).unwrap();
        assert!(cycles.is_empty());
        assert!(cycles.paths().is_empty());
        assert!(cycles.cycle_for("a").is_none());
    }

    #[test]
    fn test_cycle_edges_point_outside() {
        let graph = build(vec![
            pkg("a", &["b"]),
            pkg("b", &["a", "e"]),
            pkg("d", &["a"]),
            pkg("e", &[]),
        ]);

        let cycles = graph.collapse_cycles(false).unwrap();
        let cycle = cycles.cycle_for("b").unwrap();

        assert_eq!(cycle.local_dependency_names(), vec!["e"]);
        assert_eq!(cycle.local_dependent_names(), vec!["d"]);

        let rep = cycles.representative(&graph, "a").unwrap();
        assert!(rep.is_cycle());
        assert_eq!(rep.name(), "(cycle) a, b");

        let outside = cycles.representative(&graph, "d").unwrap();
        assert!(!outside.is_cycle());
        assert_eq!(outside.local_dependency_names(), vec!["a"]);
        assert!(cycles.representative(&graph, "missing").is_none());
    }

    #[test]
    fn test_disjoint_cycles() {
        let graph = build(vec![
            pkg("a", &["b"]),
            pkg("b", &["a"]),
            pkg("c", &["d"]),
            pkg("d", &["c"]),
            pkg("e", &["a", "c"]),
        ]);

        let cycles = graph.collapse_cycles(false).unwrap();
        assert_eq!(cycles.len(), 2);

        let first = cycles.cycle_for("a").unwrap();
        let second = cycles.cycle_for("c").unwrap();
        assert_ne!(first, second);
        assert!(!first.contains("c"));
        assert!(cycles.cycle_for("e").is_none());
    }

    #[test]
    fn test_chained_cycle_nests_inner_cycle() {
        let graph = build(vec![pkg("a", &["b"]), pkg("b", &["a", "c"]), pkg("c", &["a"])]);

        let cycles = graph.collapse_cycles(false).unwrap();
        assert_eq!(cycles.len(), 1);

        let outer = cycles.cycle_for("a").unwrap();
        assert_eq!(outer.name(), "(cycle) a, b, c");
        assert!(outer.has("c"));
        assert!(!outer.has("a"));
        assert!(outer.contains("a"));

        let mut flattened = outer.flatten();
        flattened.sort_unstable();
        assert_eq!(flattened, vec!["a", "b", "c"]);

        assert_eq!(
            cycles.paths(),
            [
                "a -> b -> a".to_string(),
                "c -> (nested cycle: a -> b -> a) -> c".to_string(),
            ]
        );
        assert!(matches!(outer.members()[1], CycleMember::Cycle(_)));
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let graph = build(vec![pkg("a", &["a"])]);

        let cycles = graph.collapse_cycles(false).unwrap();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles.paths(), ["a -> a".to_string()]);
    }

    #[test]
    fn test_partition_triangle() {
        let (paths, nodes) = triangle().partition_cycles(false).unwrap();

        assert_eq!(
            paths,
            vec![
                vec!["a", "c", "b", "a"],
                vec!["b", "a", "c", "b"],
                vec!["c", "b", "a", "c"],
            ]
        );
        assert_eq!(nodes.into_iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_partition_rejects() {
        let err = triangle().partition_cycles(true).unwrap_err();
        assert!(matches!(err, Error::CyclesDetected { .. }));
    }

    #[test]
    fn test_partition_acyclic() {
        let graph = build(vec![pkg("a", &["b"]), pkg("b", &[])]);
        let (paths, nodes) = graph.partition_cycles(true).unwrap();

        assert!(paths.is_empty());
        assert!(nodes.is_empty());
    }

    #[test]
    fn test_options_drive_rejection() {
        let options = GraphOptions::default().reject_cycles(true);
        assert!(triangle().collapse_cycles_with(&options).is_err());
        assert!(triangle().partition_cycles_with(&options).is_err());
    }
}
