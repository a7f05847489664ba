//! Workspace package dependency graph for pkgraph.
//!
//! Builds a directed graph of the packages in a multi-package repository,
//! classifies each declared dependency as local (a workspace sibling) or
//! external, answers transitive closure queries, and detects dependency
//! cycles, optionally collapsing each cycle into a single vertex.
//!
//! # Key Types
//!
//! - [`PackageGraph`]: The graph, built from a list of [`Package`] descriptors
//! - [`NodeRef`]: Borrowed view of one package and its edges
//! - [`ResolvedDependency`]: A declared dependency after specifier resolution
//! - [`CyclicPackageGraphNode`]: A dependency cycle collapsed into one vertex
//! - [`LocalEdges`]: Traversal trait shared by packages and collapsed cycles
//!
//! # Example
//!
//! ```
//! use pkgraph::{DependencyKind, GraphType, Package, PackageGraph};
//!
//! let packages = vec![
//!     Package::new("a", "/repo/packages/a")
//!         .with_version("1.0.0")
//!         .with_dependency(DependencyKind::Production, "b", "^1.0.0"),
//!     Package::new("b", "/repo/packages/b")
//!         .with_version("1.0.0")
//!         .with_dependency(DependencyKind::Production, "c", "^1.0.0"),
//!     Package::new("c", "/repo/packages/c").with_version("1.0.0"),
//! ];
//!
//! let graph = PackageGraph::new(packages, GraphType::AllDependencies, false).unwrap();
//!
//! let needed: Vec<&str> = graph
//!     .add_dependencies(&["a"])
//!     .into_iter()
//!     .map(|pkg| pkg.name.as_str())
//!     .collect();
//! assert_eq!(needed, vec!["a", "b", "c"]);
//!
//! assert!(graph.collapse_cycles(true).unwrap().is_empty());
//! ```

mod config;
mod cycles;
mod error;
mod graph;
mod node;
mod package;
mod report;
mod resolver;

pub use config::GraphOptions;
pub use cycles::{CollapsedCycles, Collapsed, CycleMember, CyclicPackageGraphNode};
pub use error::{Error, NameCollision, Result};
pub use graph::{EdgeKind, PackageGraph};
pub use node::{LocalEdges, NodeRef, PackageGraphNode};
pub use package::{DependencyKind, DependencyMap, GraphType, Package};
pub use report::report_cycles;
pub use resolver::{ResolvedDependency, WorkspaceAlias, resolve_dependency};
