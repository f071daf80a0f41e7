use crate::domain::analyzer::{Analyzer, Dep, Granularity};
use crate::domain::archive::ArchiveRef;
use crate::domain::config::JdepsConfiguration;
use crate::domain::filter::JdepsFilter;
use crate::domain::finder::DependencyFinder;
use crate::domain::graph::{Graph, GraphBuilder};
use crate::domain::location::Location;
use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Classification of a dependence target, carried by graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Info {
    Requires,
    RequiresTransitive,
    ExportedApi,
    ModulePrivate,
    QualifiedExportedApi,
    InternalApi,
    JdkInternalApi,
    JdkRemovedInternalApi,
}

/// Graph node: a module, package or class name and the archive it
/// belongs to. `info` is a label and takes no part in identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub source: String,
    pub info: Info,
}

impl Node {
    pub fn new(name: impl Into<String>, source: impl Into<String>, info: Info) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            info,
        }
    }

    fn module(name: &str, info: Info) -> Self {
        Self::new(name, name, info)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.source == other.source
    }
}

impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (&self.name, &self.source).cmp(&(&other.name, &other.source))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name == self.source {
            f.write_str(&self.name)
        } else {
            write!(f, "{} ({})", self.name, self.source)
        }
    }
}

/// Parses the root archives, follows their dependences to the requested
/// depth and aggregates the result.
pub struct DepsAnalyzer {
    pub(crate) config: Arc<JdepsConfiguration>,
    pub(crate) filter: Arc<JdepsFilter>,
    pub(crate) finder: DependencyFinder,
    pub(crate) analyzer: Analyzer,
    pub(crate) api_only: bool,
    pub(crate) root_archives: Vec<ArchiveRef>,
    pub(crate) archives: BTreeSet<ArchiveRef>,
}

impl DepsAnalyzer {
    pub fn new(
        config: Arc<JdepsConfiguration>,
        filter: Arc<JdepsFilter>,
        granularity: Granularity,
        api_only: bool,
    ) -> Result<Self> {
        let finder = DependencyFinder::new(Arc::clone(&config), Arc::clone(&filter))
            .context("failed to create dependency finder")?;
        let analyzer = Analyzer::new(granularity, Arc::clone(&filter), Arc::clone(config.versions()));

        let mut root_archives: Vec<ArchiveRef> = config.initial_archives().to_vec();
        if filter.has_include_pattern() || filter.has_target_filter() {
            root_archives.extend(
                config
                    .modules()
                    .values()
                    .filter(|m| filter.include(m) && filter.matches_archive(m))
                    .cloned(),
            );
        }
        root_archives.extend(
            config
                .class_path_archives()
                .iter()
                .filter(|a| filter.matches_archive(a))
                .cloned(),
        );
        root_archives.extend(config.root_modules().iter().cloned());

        let mut seen = HashSet::new();
        root_archives.retain(|a| seen.insert(Arc::clone(a)));
        tracing::debug!(
            "root archives: {:?}",
            root_archives.iter().map(|a| a.name()).collect::<Vec<_>>()
        );

        Ok(Self {
            config,
            filter,
            finder,
            analyzer,
            api_only,
            root_archives,
            archives: BTreeSet::new(),
        })
    }

    /// Runs the analysis. `max_depth <= 0` follows dependences until no new
    /// archive is found; 1 analyzes the roots only.
    pub fn run(&mut self, compile_time_view: bool, max_depth: i32) -> Result<bool> {
        self.parse_roots()?;
        if max_depth != 1 {
            let rounds = if max_depth <= 0 {
                usize::MAX
            } else {
                (max_depth - 1) as usize
            };
            if compile_time_view {
                self.transitive_archive_deps(rounds)?;
            } else {
                self.transitive_deps(rounds)?;
            }
        }
        Ok(self.analyze())
    }

    pub(crate) fn parse_roots(&mut self) -> Result<HashSet<Location>> {
        let targets = if self.api_only {
            self.finder.parse_exported_apis(&self.root_archives)
        } else {
            self.finder.parse(&self.root_archives)
        }
        .context("failed to parse root archives")?;
        self.archives.extend(self.root_archives.iter().cloned());
        Ok(targets)
    }

    /// Aggregates the reported archives. Targets outside the parsed set
    /// are looked up in the configuration before falling back to "not found".
    pub(crate) fn analyze(&mut self) -> bool {
        let archives = self.archives();
        let mut index = self.finder.location_index();
        for target in archives.iter().flat_map(|a| a.dependencies()) {
            if let Entry::Vacant(entry) = index.entry(target) {
                if let Some(archive) = self.config.find_class(entry.key()) {
                    entry.insert(archive);
                }
            }
        }
        self.analyzer.run(&archives, index)
    }

    /// Archives not parsed yet that define some of `locations`.
    fn unresolved_archives<'a, I>(&self, locations: I) -> BTreeSet<ArchiveRef>
    where
        I: IntoIterator<Item = &'a Location>,
    {
        locations
            .into_iter()
            .filter(|l| !self.finder.is_parsed(l))
            .filter_map(|l| self.config.find_class(l))
            .collect()
    }

    /// Compile-time view: each round parses whole archives.
    fn transitive_archive_deps(&mut self, rounds: usize) -> Result<()> {
        let deps: BTreeSet<Location> = self.archives.iter().flat_map(|a| a.dependencies()).collect();
        let mut unresolved = self.unresolved_archives(&deps);
        let mut round = 0;
        while !unresolved.is_empty() && round < rounds {
            round += 1;
            tracing::debug!("expansion round {round}: {} archives", unresolved.len());
            let targets = if self.api_only {
                self.finder.parse_exported_apis(&unresolved)
            } else {
                self.finder.parse(&unresolved)
            }?;
            self.archives.extend(unresolved);
            unresolved = self.unresolved_archives(&targets);
            unresolved.retain(|a| !self.archives.contains(a));
        }
        Ok(())
    }

    /// Runtime view: each round parses only the classes reached so far.
    fn transitive_deps(&mut self, rounds: usize) -> Result<()> {
        let mut unresolved: VecDeque<Location> =
            self.archives.iter().flat_map(|a| a.dependencies()).collect();
        let mut attempted: HashSet<Location> = HashSet::new();
        let mut round = 0;
        while !unresolved.is_empty() && round < rounds {
            round += 1;
            tracing::debug!("expansion round {round}: {} classes", unresolved.len());
            let mut next = VecDeque::new();
            while let Some(target) = unresolved.pop_front() {
                if self.finder.is_parsed(&target) || !attempted.insert(target.clone()) {
                    continue;
                }
                let Some(archive) = self.config.find_class(&target) else {
                    continue;
                };
                self.archives.insert(Arc::clone(&archive));
                let targets = if self.api_only {
                    self.finder.parse_exported_api(&archive, &target)
                } else {
                    self.finder.parse_class(&archive, &target)
                }?;
                next.extend(targets.into_iter().filter(|t| !self.finder.is_parsed(t)));
            }
            unresolved = next;
        }
        Ok(())
    }

    /// Archives to report: included, with dependences. With a `requires`
    /// filter the required modules themselves are left out.
    pub fn archives(&self) -> BTreeSet<ArchiveRef> {
        let requires = self.filter.requires_filter();
        self.archives
            .iter()
            .filter(|a| self.filter.include(a))
            .filter(|a| {
                if requires.is_empty() {
                    a.has_dependences()
                } else {
                    !requires.contains(a.name())
                        && a
                            .dependencies()
                            .iter()
                            .any(|l| self.finder.location_to_archive(l) != **a)
                }
            })
            .cloned()
            .collect()
    }

    /// Every archive parsed during the run.
    pub fn parsed_archives(&self) -> &BTreeSet<ArchiveRef> {
        &self.archives
    }

    pub fn root_archives(&self) -> &[ArchiveRef] {
        &self.root_archives
    }

    pub fn dependences(&self) -> BTreeMap<ArchiveRef, BTreeSet<ArchiveRef>> {
        self.finder.dependences()
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub fn finder(&self) -> &DependencyFinder {
        &self.finder
    }

    pub fn config(&self) -> &Arc<JdepsConfiguration> {
        &self.config
    }

    /// Archive-level graph of the analyzed requires; no transitive edges.
    pub fn module_graph(&self) -> Graph<Node> {
        let mut builder = GraphBuilder::new();
        for archive in self.archives() {
            let transitive: BTreeSet<&str> = archive
                .module()
                .map(|m| {
                    m.descriptor()
                        .requires
                        .iter()
                        .filter(|r| r.is_transitive())
                        .map(|r| r.name.as_str())
                        .collect()
                })
                .unwrap_or_default();
            let u = Node::module(archive.name(), Info::Requires);
            builder.add_node(u.clone());
            for required in self.analyzer.requires(&archive) {
                let info = if transitive.contains(required.name()) {
                    Info::RequiresTransitive
                } else {
                    Info::Requires
                };
                builder.add_edge(u.clone(), Node::module(required.name(), info));
            }
        }
        builder.build()
    }

    /// Graph of the aggregated dependences, targets classified by how
    /// they are accessed.
    pub fn dependence_graph(&self) -> Graph<Node> {
        let mut builder = GraphBuilder::new();
        for archive in self.archives() {
            let Some(result) = self.analyzer.results().get(&archive) else {
                continue;
            };
            let mut deps: Vec<&Dep> = result.deps().iter().collect();
            deps.sort_by(|a, b| (&a.origin, &a.target).cmp(&(&b.origin, &b.target)));
            for dep in deps {
                let info = self.classify(dep);
                builder.add_edge(
                    Node::new(&dep.origin, dep.origin_archive.name(), info),
                    Node::new(&dep.target, dep.target_archive.name(), info),
                );
            }
        }
        builder.build()
    }

    fn classify(&self, dep: &Dep) -> Info {
        let source = &dep.origin_archive;
        let target = &dep.target_archive;
        let pn = match self.analyzer.granularity() {
            Granularity::Class | Granularity::Verbose => {
                let class = dep.target.rsplit_once('/').map_or(dep.target.as_str(), |(_, c)| c);
                class.rsplit_once('.').map_or("", |(p, _)| p).to_string()
            }
            _ => dep.target.clone(),
        };

        if source == target {
            return Info::ModulePrivate;
        }
        if target.is_removed_internals() {
            return Info::JdkRemovedInternalApi;
        }
        // module-level endpoints are archive names, not packages
        if self.analyzer.granularity() == Granularity::Module {
            return Info::Requires;
        }
        let Some(module) = target.module() else {
            return Info::ExportedApi;
        };
        if module.is_exported(&pn) && !module.is_jdk_unsupported() {
            Info::ExportedApi
        } else if module.is_exported_to(&pn, source.name()) {
            Info::QualifiedExportedApi
        } else if module.is_jdk() {
            Info::JdkInternalApi
        } else {
            Info::InternalApi
        }
    }
}
