//! Aggregation of parsed class edges into per-archive dependences at a
//! chosen granularity.

use crate::adapters::source::ReleaseVersions;
use crate::domain::archive::{Archive, ArchiveRef};
use crate::domain::filter::JdepsFilter;
use crate::domain::internals;
use crate::domain::location::Location;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

pub const UNNAMED_PACKAGE: &str = "<unnamed>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Summary,
    Module,
    Package,
    Class,
    Verbose,
}

/// One aggregated edge. Equal deps collapse.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dep {
    pub origin: String,
    pub origin_archive: ArchiveRef,
    pub target: String,
    pub target_archive: ArchiveRef,
}

pub trait Visitor {
    fn visit_dependence(
        &mut self,
        origin: &str,
        origin_archive: &ArchiveRef,
        target: &str,
        target_archive: &ArchiveRef,
    );
}

impl<F> Visitor for F
where
    F: FnMut(&str, &ArchiveRef, &str, &ArchiveRef),
{
    fn visit_dependence(
        &mut self,
        origin: &str,
        origin_archive: &ArchiveRef,
        target: &str,
        target_archive: &ArchiveRef,
    ) {
        self(origin, origin_archive, target, target_archive)
    }
}

/// Dependences of one archive at one granularity.
#[derive(Debug)]
pub struct Dependences {
    archive: ArchiveRef,
    granularity: Granularity,
    deps: HashSet<Dep>,
    requires: BTreeSet<ArchiveRef>,
    cur_dep: Option<Dep>,
}

impl Dependences {
    fn build(
        archive: &ArchiveRef,
        granularity: Granularity,
        filter: &JdepsFilter,
        versions: &ReleaseVersions,
        find_archive: &mut dyn FnMut(&Location) -> ArchiveRef,
    ) -> Self {
        let mut result = Self {
            archive: Arc::clone(archive),
            granularity,
            deps: HashSet::new(),
            requires: BTreeSet::new(),
            cur_dep: None,
        };
        archive.visit_dependences(|origin, target| {
            let target_archive = if archive.contains_class(target) || archive.contains(target.name()) {
                Arc::clone(archive)
            } else {
                find_archive(target)
            };
            if filter.accepts_archives(origin, archive, target, &target_archive) {
                result.add_dep(origin, target, target_archive, versions);
            }
        });
        result
    }

    fn location_name(
        &self,
        location: &Location,
        archive: &Archive,
        versions: &ReleaseVersions,
    ) -> String {
        match self.granularity {
            Granularity::Class | Granularity::Verbose => versions.display_name(location.name()),
            Granularity::Package | Granularity::Summary => match location.package_name() {
                "" => UNNAMED_PACKAGE.to_string(),
                pn => pn.to_string(),
            },
            Granularity::Module => archive.name().to_string(),
        }
    }

    fn add_dep(
        &mut self,
        origin: &Location,
        target: &Location,
        target_archive: ArchiveRef,
        versions: &ReleaseVersions,
    ) {
        let origin = self.location_name(origin, &self.archive, versions);
        let target = self.location_name(target, &target_archive, versions);
        if target_archive != self.archive {
            self.requires.insert(Arc::clone(&target_archive));
        }
        if self
            .cur_dep
            .as_ref()
            .is_some_and(|d| d.origin == origin && d.target == target && d.target_archive == target_archive)
        {
            return;
        }
        let dep = Dep {
            origin,
            origin_archive: Arc::clone(&self.archive),
            target,
            target_archive,
        };
        if !self.deps.contains(&dep) {
            self.deps.insert(dep.clone());
        }
        self.cur_dep = Some(dep);
    }

    pub fn archive(&self) -> &ArchiveRef {
        &self.archive
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn deps(&self) -> &HashSet<Dep> {
        &self.deps
    }

    pub fn requires(&self) -> &BTreeSet<ArchiveRef> {
        &self.requires
    }

    pub fn has_dependences(&self) -> bool {
        !self.deps.is_empty()
    }

    fn visit<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        if self.granularity == Granularity::Summary {
            if self.requires.is_empty() {
                if self.has_dependences() {
                    visitor.visit_dependence(self.archive.name(), &self.archive, self.archive.name(), &self.archive);
                }
                return;
            }
            for required in &self.requires {
                visitor.visit_dependence(self.archive.name(), &self.archive, required.name(), required);
            }
            return;
        }
        let mut deps: Vec<&Dep> = self.deps.iter().collect();
        deps.sort_by(|a, b| (&a.origin, &a.target).cmp(&(&b.origin, &b.target)));
        for dep in deps {
            visitor.visit_dependence(&dep.origin, &dep.origin_archive, &dep.target, &dep.target_archive);
        }
    }
}

pub struct Analyzer {
    granularity: Granularity,
    filter: Arc<JdepsFilter>,
    versions: Arc<ReleaseVersions>,
    results: BTreeMap<ArchiveRef, Dependences>,
    location_index: HashMap<Location, ArchiveRef>,
}

impl Analyzer {
    pub fn new(granularity: Granularity, filter: Arc<JdepsFilter>, versions: Arc<ReleaseVersions>) -> Self {
        Self {
            granularity,
            filter,
            versions,
            results: BTreeMap::new(),
            location_index: HashMap::new(),
        }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Builds the dependences of each archive. Returns whether any archive
    /// has dependences.
    pub fn run<'a, I>(&mut self, archives: I, location_index: HashMap<Location, ArchiveRef>) -> bool
    where
        I: IntoIterator<Item = &'a ArchiveRef>,
    {
        self.location_index = location_index;
        let index = &mut self.location_index;
        let mut find_archive = |target: &Location| -> ArchiveRef {
            index
                .entry(target.clone())
                .or_insert_with(|| {
                    if internals::is_removed_package(target.package_name()) {
                        Archive::removed_jdk_internals()
                    } else {
                        Archive::not_found()
                    }
                })
                .clone()
        };
        for archive in archives {
            let deps = Dependences::build(
                archive,
                self.granularity,
                &self.filter,
                &self.versions,
                &mut find_archive,
            );
            self.results.insert(Arc::clone(archive), deps);
        }
        self.results.values().any(Dependences::has_dependences)
    }

    /// Replays the dependences of `archive`, re-aggregating when
    /// `granularity` differs from the one analyzed.
    pub fn visit_dependences<V: Visitor + ?Sized>(
        &self,
        archive: &ArchiveRef,
        visitor: &mut V,
        granularity: Granularity,
    ) {
        let Some(result) = self.results.get(archive) else {
            return;
        };
        if result.granularity == granularity {
            result.visit(visitor);
            return;
        }
        let mut find_archive = |target: &Location| -> ArchiveRef {
            self.location_index.get(target).cloned().unwrap_or_else(|| {
                if internals::is_removed_package(target.package_name()) {
                    Archive::removed_jdk_internals()
                } else {
                    Archive::not_found()
                }
            })
        };
        Dependences::build(archive, granularity, &self.filter, &self.versions, &mut find_archive)
            .visit(visitor);
    }

    pub fn visit<V: Visitor + ?Sized>(&self, archive: &ArchiveRef, visitor: &mut V) {
        self.visit_dependences(archive, visitor, self.granularity);
    }

    pub fn has_dependences(&self, archive: &ArchiveRef) -> bool {
        self.results.get(archive).is_some_and(Dependences::has_dependences)
    }

    /// Target names of the dependences of `archive`.
    pub fn dependences(&self, archive: &ArchiveRef) -> BTreeSet<String> {
        self.results
            .get(archive)
            .map(|r| r.deps.iter().map(|d| d.target.clone()).collect())
            .unwrap_or_default()
    }

    pub fn requires(&self, archive: &ArchiveRef) -> BTreeSet<ArchiveRef> {
        self.results
            .get(archive)
            .map(|r| r.requires.clone())
            .unwrap_or_default()
    }

    pub fn archives(&self) -> impl Iterator<Item = &ArchiveRef> {
        self.results.keys()
    }

    pub fn results(&self) -> &BTreeMap<ArchiveRef, Dependences> {
        &self.results
    }

    pub fn location_index(&self) -> &HashMap<Location, ArchiveRef> {
        &self.location_index
    }
}
