//! Generic directed graph with transitive reduction and topological order.

use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("cycle detected: {node} -> {edges:?}")]
    Cycle { node: String, edges: Vec<String> },

    #[error("{other} is not a subgraph of {graph}")]
    NotSubgraph { graph: String, other: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge<T> {
    pub u: T,
    pub v: T,
}

/// Directed graph over ordered node values. Every edge endpoint is a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph<T: Ord + Clone> {
    nodes: BTreeSet<T>,
    edges: BTreeMap<T, BTreeSet<T>>,
}

impl<T: Ord + Clone> Default for Graph<T> {
    fn default() -> Self {
        Self {
            nodes: BTreeSet::new(),
            edges: BTreeMap::new(),
        }
    }
}

impl<T: Ord + Clone> Graph<T> {
    pub fn nodes(&self) -> &BTreeSet<T> {
        &self.nodes
    }

    pub fn edges(&self) -> &BTreeMap<T, BTreeSet<T>> {
        &self.edges
    }

    pub fn contains(&self, u: &T) -> bool {
        self.nodes.contains(u)
    }

    pub fn adjacent_nodes(&self, u: &T) -> Option<&BTreeSet<T>> {
        self.edges.get(u)
    }

    pub fn is_adjacent(&self, u: &T, v: &T) -> bool {
        self.edges.get(u).is_some_and(|adj| adj.contains(v))
    }

    pub fn edges_from(&self, u: &T) -> Vec<Edge<T>> {
        self.edges
            .get(u)
            .map(|adj| {
                adj.iter()
                    .map(|v| Edge {
                        u: u.clone(),
                        v: v.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    fn successors<'a>(&'a self, u: &T) -> impl Iterator<Item = &'a T> + 'a {
        self.edges.get(u).into_iter().flatten()
    }

    /// Transitive reduction: keeps (u, v) only when v is not reachable from
    /// u through some other path.
    pub fn reduce(&self) -> Graph<T> {
        let mut builder = GraphBuilder::new();
        for u in &self.nodes {
            builder.add_node(u.clone());
            for v in self.successors(u) {
                if !self.path_exists(u, v, false) {
                    builder.add_edge(u.clone(), v.clone());
                }
            }
        }
        builder.build()
    }

    /// Reduces this graph giving precedence to the edges of `other`, which
    /// must be a subgraph of `self`.
    ///
    /// An edge (u, v) is dropped if v is reachable from u in `other` or by
    /// another path in `self`. Edges of `other` that are also edges here are
    /// then added back and the result is reduced once more.
    pub fn reduce_against(&self, other: &Graph<T>) -> Result<Graph<T>, GraphError>
    where
        T: fmt::Display,
    {
        let subgraph = other.nodes.is_subset(&self.nodes)
            && other.edges.iter().all(|(u, adj)| {
                adj.iter().all(|v| self.is_adjacent(u, v))
            });
        if !subgraph {
            return Err(GraphError::NotSubgraph {
                graph: self.to_string(),
                other: other.to_string(),
            });
        }

        let mut builder = GraphBuilder::new();
        for u in &self.nodes {
            builder.add_node(u.clone());
            for v in self.successors(u) {
                if !other.path_exists(u, v, true) && !self.path_exists(u, v, false) {
                    builder.add_edge(u.clone(), v.clone());
                }
            }
        }
        for (u, adj) in &other.edges {
            for v in adj.iter().filter(|v| self.is_adjacent(u, v)) {
                builder.add_edge(u.clone(), v.clone());
            }
        }
        Ok(builder.build().reduce())
    }

    pub fn transpose(&self) -> Graph<T> {
        let mut builder = GraphBuilder::new();
        builder.add_nodes(self.nodes.iter().cloned());
        for (u, adj) in &self.edges {
            for v in adj {
                builder.add_edge(v.clone(), u.clone());
            }
        }
        builder.build()
    }

    /// Nodes reachable from `roots`, roots included even if not in the graph.
    pub fn dfs<'a, I>(&self, roots: I) -> BTreeSet<T>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let mut stack: Vec<T> = roots.into_iter().cloned().collect();
        let mut visited = BTreeSet::new();
        while let Some(u) = stack.pop() {
            if visited.contains(&u) {
                continue;
            }
            for v in self.successors(&u) {
                if !visited.contains(v) {
                    stack.push(v.clone());
                }
            }
            visited.insert(u);
        }
        visited
    }

    /// Whether `to` is reachable from `from`. With `include_adjacent` false
    /// the direct edge from `from` to `to` is not followed.
    pub fn path_exists(&self, from: &T, to: &T, include_adjacent: bool) -> bool {
        if !self.nodes.contains(from) || !self.nodes.contains(to) {
            return false;
        }
        let mut stack = vec![from];
        let mut visited = BTreeSet::new();
        while let Some(node) = stack.pop() {
            if node == to {
                return true;
            }
            for adj in self.successors(node) {
                if !include_adjacent && node == from && adj == to {
                    continue;
                }
                if visited.insert(adj) {
                    stack.push(adj);
                }
            }
        }
        false
    }

    /// Topological order: for every edge (u, v), u comes before v.
    pub fn ordered_nodes(&self) -> Result<Vec<T>, GraphError>
    where
        T: fmt::Display,
    {
        let mut order = self.post_order()?;
        order.reverse();
        Ok(order)
    }

    /// Dependencies first: for every edge (u, v), v comes before u.
    pub fn reverse_ordered_nodes(&self) -> Result<Vec<T>, GraphError>
    where
        T: fmt::Display,
    {
        self.post_order()
    }

    fn post_order(&self) -> Result<Vec<T>, GraphError>
    where
        T: fmt::Display,
    {
        let mut visited = BTreeSet::new();
        let mut done = BTreeSet::new();
        let mut result = Vec::with_capacity(self.nodes.len());
        for u in &self.nodes {
            if !visited.contains(u) {
                self.visit(u, &mut visited, &mut done, &mut result)?;
            }
        }
        Ok(result)
    }

    fn visit<'a>(
        &'a self,
        u: &'a T,
        visited: &mut BTreeSet<&'a T>,
        done: &mut BTreeSet<&'a T>,
        result: &mut Vec<T>,
    ) -> Result<(), GraphError>
    where
        T: fmt::Display,
    {
        visited.insert(u);
        for v in self.successors(u) {
            if !visited.contains(v) {
                self.visit(v, visited, done, result)?;
            } else if !done.contains(v) {
                return Err(GraphError::Cycle {
                    node: u.to_string(),
                    edges: self.successors(u).map(ToString::to_string).collect(),
                });
            }
        }
        done.insert(u);
        result.push(u.clone());
        Ok(())
    }

    /// Copy into a petgraph graph for collaborators that render or walk it.
    pub fn to_petgraph(&self) -> DiGraph<T, ()> {
        let mut graph = DiGraph::new();
        let mut index: BTreeMap<&T, NodeIndex> = BTreeMap::new();
        for node in &self.nodes {
            index.insert(node, graph.add_node(node.clone()));
        }
        for (u, adj) in &self.edges {
            for v in adj {
                if let (Some(&a), Some(&b)) = (index.get(u), index.get(v)) {
                    graph.add_edge(a, b, ());
                }
            }
        }
        graph
    }
}

impl<T: Ord + Clone + fmt::Display> fmt::Display for Graph<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for u in &self.nodes {
            write!(f, "{u} -> [")?;
            for (i, v) in self.successors(u).enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{v}")?;
            }
            writeln!(f, "]")?;
        }
        Ok(())
    }
}

/// Accumulates nodes and edges; edge endpoints are added as nodes.
#[derive(Debug, Clone)]
pub struct GraphBuilder<T: Ord + Clone> {
    nodes: BTreeSet<T>,
    edges: BTreeMap<T, BTreeSet<T>>,
}

impl<T: Ord + Clone> Default for GraphBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord + Clone> GraphBuilder<T> {
    pub fn new() -> Self {
        Self {
            nodes: BTreeSet::new(),
            edges: BTreeMap::new(),
        }
    }

    pub fn add_node(&mut self, node: T) -> &mut Self {
        if self.nodes.insert(node.clone()) {
            self.edges.entry(node).or_default();
        }
        self
    }

    pub fn add_nodes<I: IntoIterator<Item = T>>(&mut self, nodes: I) -> &mut Self {
        for node in nodes {
            self.add_node(node);
        }
        self
    }

    pub fn add_edge(&mut self, u: T, v: T) -> &mut Self {
        self.add_node(u.clone());
        self.add_node(v.clone());
        self.edges.entry(u).or_default().insert(v);
        self
    }

    pub fn add_edges<I: IntoIterator<Item = T>>(&mut self, u: T, targets: I) -> &mut Self {
        for v in targets {
            self.add_edge(u.clone(), v);
        }
        self
    }

    pub fn contains(&self, node: &T) -> bool {
        self.nodes.contains(node)
    }

    pub fn build(self) -> Graph<T> {
        Graph {
            nodes: self.nodes,
            edges: self.edges,
        }
    }
}
