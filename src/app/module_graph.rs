use crate::domain::config::JdepsConfiguration;
use crate::domain::graph::{Graph, GraphBuilder};
use std::collections::{BTreeSet, VecDeque};

/// Builds module graphs keyed by module name. [`build`](Self::build) adds
/// the `requires transitive` edges declared by each reachable module.
pub struct ModuleGraphBuilder<'a> {
    config: &'a JdepsConfiguration,
    builder: GraphBuilder<String>,
}

impl<'a> ModuleGraphBuilder<'a> {
    pub fn new(config: &'a JdepsConfiguration) -> Self {
        Self {
            config,
            builder: GraphBuilder::new(),
        }
    }

    pub fn add_module(&mut self, name: impl Into<String>) -> &mut Self {
        self.builder.add_node(name.into());
        self
    }

    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.builder.add_edge(from.into(), to.into());
        self
    }

    /// The edges added so far, without implied edges.
    pub fn build_plain(self) -> Graph<String> {
        self.builder.build()
    }

    /// The edges added so far plus, for every module reachable from them,
    /// the `requires transitive` edges of its descriptor.
    pub fn build(self) -> Graph<String> {
        let config = self.config;
        let graph = self.builder.build();

        let mut builder = GraphBuilder::new();
        let mut visited = BTreeSet::new();
        let mut queue: VecDeque<String> = graph.nodes().iter().cloned().collect();
        while let Some(module) = queue.pop_front() {
            if !visited.insert(module.clone()) {
                continue;
            }
            builder.add_node(module.clone());
            if let Some(adjacent) = graph.adjacent_nodes(&module) {
                for v in adjacent {
                    builder.add_edge(module.clone(), v.clone());
                    queue.push_back(v.clone());
                }
            }
            let Some(archive) = config.find_module(&module) else {
                continue;
            };
            let Some(m) = archive.module() else {
                continue;
            };
            for requires in m.descriptor().requires.iter().filter(|r| r.is_transitive()) {
                if config.find_module(&requires.name).is_some() {
                    builder.add_edge(module.clone(), requires.name.clone());
                    queue.push_back(requires.name.clone());
                }
            }
        }
        builder.build()
    }

    /// Transitive reduction of [`build`](Self::build).
    pub fn reduced(self) -> Graph<String> {
        self.build().reduce()
    }
}
