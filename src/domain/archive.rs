//! Archives: named containers of classes and the edges parsed from them.

use crate::adapters::source::ClassSource;
use crate::domain::internals;
use crate::domain::location::Location;
use crate::domain::module::Module;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub type ArchiveRef = Arc<Archive>;

pub const NOT_FOUND_NAME: &str = "not found";
pub const REMOVED_JDK_INTERNALS_NAME: &str = "JDK removed internal API";

static NOT_FOUND: Lazy<ArchiveRef> = Lazy::new(|| {
    Arc::new(Archive::new(
        NOT_FOUND_NAME,
        format!("sentinel:{NOT_FOUND_NAME}"),
        None,
        ArchiveKind::NotFound,
        None,
    ))
});

static REMOVED_JDK_INTERNALS: Lazy<ArchiveRef> = Lazy::new(|| {
    Arc::new(Archive::new(
        REMOVED_JDK_INTERNALS_NAME,
        format!("sentinel:{REMOVED_JDK_INTERNALS_NAME}"),
        None,
        ArchiveKind::RemovedInternals,
        None,
    ))
});

#[derive(Debug)]
pub enum ArchiveKind {
    /// Input or class path entry without module identity.
    Unnamed,
    /// Explicit, automatic or system module.
    Module(Module),
    NotFound,
    RemovedInternals,
}

pub struct Archive {
    name: String,
    location: String,
    path: Option<PathBuf>,
    kind: ArchiveKind,
    source: Option<ClassSource>,
    deps: DashMap<Location, BTreeSet<Location>>,
}

impl Archive {
    pub fn new(
        name: impl Into<String>,
        location: impl Into<String>,
        path: Option<PathBuf>,
        kind: ArchiveKind,
        source: Option<ClassSource>,
    ) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            path,
            kind,
            source,
            deps: DashMap::new(),
        }
    }

    /// Unnamed archive for an input or class path entry.
    pub fn unnamed(path: &Path, source: ClassSource) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(
            name,
            canonical_location(path),
            Some(path.to_path_buf()),
            ArchiveKind::Unnamed,
            Some(source),
        )
    }

    pub fn named_module(module: Module, path: &Path, source: ClassSource) -> Self {
        Self::new(
            module.name().to_string(),
            canonical_location(path),
            Some(path.to_path_buf()),
            ArchiveKind::Module(module),
            Some(source),
        )
    }

    pub fn not_found() -> ArchiveRef {
        Arc::clone(&NOT_FOUND)
    }

    pub fn removed_jdk_internals() -> ArchiveRef {
        Arc::clone(&REMOVED_JDK_INTERNALS)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// File system path if any, otherwise the archive name.
    pub fn path_name(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| self.name.clone())
    }

    pub fn kind(&self) -> &ArchiveKind {
        &self.kind
    }

    pub fn source(&self) -> Option<&ClassSource> {
        self.source.as_ref()
    }

    pub fn module(&self) -> Option<&Module> {
        match &self.kind {
            ArchiveKind::Module(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_module(&self) -> bool {
        self.module().is_some()
    }

    pub fn is_system_module(&self) -> bool {
        self.module().is_some_and(Module::is_system)
    }

    pub fn is_jdk(&self) -> bool {
        self.module().is_some_and(Module::is_jdk)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, ArchiveKind::NotFound)
    }

    pub fn is_removed_internals(&self) -> bool {
        matches!(self.kind, ArchiveKind::RemovedInternals)
    }

    /// Whether `pn` is visible to everyone. Unnamed archives export all.
    pub fn is_exported(&self, pn: &str) -> bool {
        match &self.kind {
            ArchiveKind::Module(m) => m.is_exported(pn),
            ArchiveKind::Unnamed => true,
            ArchiveKind::NotFound | ArchiveKind::RemovedInternals => false,
        }
    }

    pub fn add_class(&self, origin: Location) {
        self.deps.entry(origin).or_default();
    }

    pub fn add_dependency(&self, origin: Location, target: Location) {
        self.deps.entry(origin).or_default().insert(target);
    }

    /// Every class parsed from this archive.
    pub fn classes(&self) -> BTreeSet<Location> {
        self.deps.iter().map(|e| e.key().clone()).collect()
    }

    pub fn contains_class(&self, loc: &Location) -> bool {
        self.deps.contains_key(loc)
    }

    /// Union of all outgoing targets.
    pub fn dependencies(&self) -> BTreeSet<Location> {
        self.deps
            .iter()
            .flat_map(|e| e.value().iter().cloned().collect::<Vec<_>>())
            .collect()
    }

    pub fn has_dependences(&self) -> bool {
        self.deps.iter().any(|e| !e.value().is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }

    /// Whether the archive holds a class with this binary name, parsed or not.
    pub fn contains(&self, binary_name: &str) -> bool {
        match &self.kind {
            ArchiveKind::RemovedInternals => {
                internals::is_removed_package(Location::new(binary_name).package_name())
            }
            ArchiveKind::NotFound => false,
            _ => {
                self.source.as_ref().is_some_and(|s| s.contains(binary_name))
                    || self.deps.contains_key(&Location::new(binary_name))
            }
        }
    }

    /// Replays every `(origin, target)` edge, ordered by origin then target.
    pub fn visit_dependences<F>(&self, mut f: F)
    where
        F: FnMut(&Location, &Location),
    {
        let mut edges: Vec<(Location, BTreeSet<Location>)> = self
            .deps
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        edges.sort_by(|a, b| a.0.cmp(&b.0));
        for (origin, targets) in &edges {
            for target in targets {
                f(origin, target);
            }
        }
    }
}

fn canonical_location(path: &Path) -> String {
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

impl PartialEq for Archive {
    fn eq(&self, other: &Self) -> bool {
        self.location == other.location
    }
}

impl Eq for Archive {}

impl Hash for Archive {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.location.hash(state);
    }
}

impl PartialOrd for Archive {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Archive {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.location == other.location {
            return Ordering::Equal;
        }
        self.name
            .cmp(&other.name)
            .then_with(|| self.location.cmp(&other.location))
    }
}

impl fmt::Debug for Archive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archive")
            .field("name", &self.name)
            .field("location", &self.location)
            .finish()
    }
}

impl fmt::Display for Archive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
