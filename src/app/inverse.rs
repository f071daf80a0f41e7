use crate::app::deps::DepsAnalyzer;
use crate::domain::analyzer::Granularity;
use crate::domain::archive::ArchiveRef;
use crate::domain::config::JdepsConfiguration;
use crate::domain::filter::JdepsFilter;
use crate::domain::finder::DependencyFinder;
use crate::domain::graph::{Edge, Graph, GraphBuilder};
use anyhow::{Context as _, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// A path of archives, the target first and each following archive
/// depending on the one before it. When the target has end points (the
/// archives it was found to depend on) the end point comes first.
pub type InversePath = Vec<ArchiveRef>;

/// Finds the archives that depend, directly or transitively, on the
/// targets selected by the filter.
pub struct InverseDepsAnalyzer {
    deps: DepsAnalyzer,
    targets: BTreeSet<ArchiveRef>,
    end_points: BTreeMap<ArchiveRef, BTreeSet<ArchiveRef>>,
}

impl InverseDepsAnalyzer {
    pub fn new(
        config: Arc<JdepsConfiguration>,
        filter: Arc<JdepsFilter>,
        granularity: Granularity,
        api_only: bool,
    ) -> Result<Self> {
        Ok(Self {
            deps: DepsAnalyzer::new(config, filter, granularity, api_only)?,
            targets: BTreeSet::new(),
            end_points: BTreeMap::new(),
        })
    }

    /// Selects the targets. With a `requires` filter the required modules
    /// are the targets; otherwise every root archive that matched the
    /// filter is, and what it depends on becomes its end point.
    pub fn run(&mut self) -> Result<bool> {
        self.deps.parse_roots()?;
        let archives = self.deps.archives();
        let requires = self.deps.filter.requires_filter().clone();
        if requires.is_empty() {
            self.targets.extend(archives.iter().cloned());
        } else {
            self.targets
                .extend(requires.iter().filter_map(|name| self.deps.config.find_module(name)));
        }
        let found = self.deps.analyze();
        if requires.is_empty() {
            for target in &self.targets {
                let required = self.deps.analyzer.requires(target);
                if !required.is_empty() {
                    self.end_points.insert(Arc::clone(target), required);
                }
            }
        }
        tracing::debug!(
            "inverse targets: {:?}",
            self.targets.iter().map(|a| a.name()).collect::<Vec<_>>()
        );
        Ok(found)
    }

    pub fn targets(&self) -> &BTreeSet<ArchiveRef> {
        &self.targets
    }

    pub fn end_points(&self) -> &BTreeMap<ArchiveRef, BTreeSet<ArchiveRef>> {
        &self.end_points
    }

    pub fn deps_analyzer(&self) -> &DepsAnalyzer {
        &self.deps
    }

    /// Every path from a target to the archives that reach it.
    pub fn inverse_dependences(&self) -> Result<BTreeSet<InversePath>> {
        let config = &self.deps.config;
        let finder = DependencyFinder::new(Arc::clone(config), Arc::new(JdepsFilter::default_filter()))?;
        let unnamed = config.initial_archives().iter().chain(config.class_path_archives());
        if self.deps.api_only {
            finder.parse_exported_apis(unnamed)
        } else {
            finder.parse(unnamed)
        }
        .context("failed to parse archives for inverse analysis")?;

        let mut builder = GraphBuilder::new();
        builder.add_nodes(self.targets.iter().cloned());
        for module in config.modules().values() {
            builder.add_node(Arc::clone(module));
            let Some(m) = module.module() else { continue };
            for name in m.descriptor().requires_names() {
                if let Some(v) = config.find_module(name) {
                    builder.add_edge(v, Arc::clone(module));
                }
            }
        }
        for (u, targets) in finder.dependences() {
            for v in targets {
                builder.add_edge(v, Arc::clone(&u));
            }
        }
        let graph = builder.build();

        Ok(self
            .targets
            .iter()
            .flat_map(|t| self.find_paths(&graph, t))
            .collect())
    }

    /// Depth-first walk over the transposed graph from `target`. An edge is
    /// not followed back into a node already on the current path.
    fn find_paths(&self, graph: &Graph<ArchiveRef>, target: &ArchiveRef) -> Vec<InversePath> {
        let mut path: Vec<ArchiveRef> = vec![Arc::clone(target)];
        let mut stack: Vec<Edge<ArchiveRef>> = graph.edges_from(target);
        if stack.is_empty() {
            return self.make_paths(&path);
        }

        let mut paths = Vec::new();
        while let Some(edge) = stack.pop() {
            while path.last().is_some_and(|last| *last != edge.u) {
                path.pop();
            }
            path.push(Arc::clone(&edge.v));
            let next: Vec<Edge<ArchiveRef>> = graph
                .edges_from(&edge.v)
                .into_iter()
                .filter(|e| !path.contains(&e.v))
                .collect();
            if next.is_empty() {
                paths.extend(self.make_paths(&path));
            } else {
                stack.extend(next);
            }
        }
        paths
    }

    fn make_paths(&self, path: &[ArchiveRef]) -> Vec<InversePath> {
        let Some(first) = path.first() else {
            return Vec::new();
        };
        match self.end_points.get(first) {
            Some(ends) if !ends.is_empty() => ends
                .iter()
                .map(|end| {
                    let mut p = Vec::with_capacity(path.len() + 1);
                    p.push(Arc::clone(end));
                    p.extend(path.iter().cloned());
                    p
                })
                .collect(),
            _ => vec![path.to_vec()],
        }
    }
}
