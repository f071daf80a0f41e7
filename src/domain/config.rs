//! Run configuration: which archives take part in the analysis and how a
//! class location is mapped back to the archive that defines it.

use crate::adapters::source::{ClassSource, MODULE_INFO, ReleaseVersions};
use crate::domain::archive::{Archive, ArchiveRef};
use crate::domain::error::JdepsError;
use crate::domain::location::Location;
use crate::domain::module::{Module, ModuleDescriptor};
use crate::domain::ports::{ClassReader, ModuleResolver};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_WORKERS: usize = 2;

fn version_suffix_regex() -> &'static Regex {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-(\d+(\.|$))").expect("version suffix regex"));
    &RE
}

fn non_alphanumeric_regex() -> &'static Regex {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("separator regex"));
    &RE
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    /// Archives to analyze: directories, jars or class files.
    pub inputs: Vec<PathBuf>,
    /// Class path entries; `dir/*` expands to the jars in `dir`.
    pub class_path: Vec<PathBuf>,
    /// Module path entries: modular jars, exploded modules, or directories
    /// of either.
    pub module_path: Vec<PathBuf>,
    /// Exploded runtime image with one directory per system module.
    pub system_modules: Option<PathBuf>,
    pub root_modules: Vec<String>,
    /// Resolve every system module, not only what the roots require.
    pub add_all_system_modules: bool,
    pub multi_release: Option<u32>,
    pub workers: Option<usize>,
}

impl ConfigOptions {
    pub fn build(
        self,
        reader: Arc<dyn ClassReader>,
        resolver: &dyn ModuleResolver,
    ) -> Result<JdepsConfiguration, JdepsError> {
        let versions = Arc::new(ReleaseVersions::new());
        let release = self.multi_release;
        let open = |path: &Path| ClassSource::open(path, release, &versions, reader.as_ref());

        let mut system = Vec::new();
        if let Some(image) = &self.system_modules {
            for dir in sorted_children(image)? {
                if !dir.is_dir() {
                    continue;
                }
                let source = ClassSource::module_image(&dir);
                let Some(descriptor) = source.read_module_descriptor(reader.as_ref())? else {
                    tracing::warn!("{}: no {MODULE_INFO}, ignored", dir.display());
                    continue;
                };
                let packages = packages_of(&source);
                let module = Module::new(descriptor, packages, true);
                system.push(Arc::new(Archive::named_module(module, &dir, source)));
            }
        }

        let mut application = Vec::new();
        for entry in &self.module_path {
            if !entry.exists() {
                return Err(JdepsError::PathNotFound(entry.clone()));
            }
            if entry.is_dir() && !entry.join(MODULE_INFO).is_file() {
                for child in sorted_children(entry)? {
                    application.push(open_module(&child, open(&child)?, reader.as_ref())?);
                }
            } else {
                application.push(open_module(entry, open(entry)?, reader.as_ref())?);
            }
        }

        let mut initial_archives = Vec::new();
        for input in &self.inputs {
            let source = open(input)?;
            source.entries()?;
            let archive = if source.has_module_info() {
                let module = open_module(input, source, reader.as_ref())?;
                application.push(Arc::clone(&module));
                module
            } else {
                Arc::new(Archive::unnamed(input, source))
            };
            initial_archives.push(archive);
        }

        let mut class_path = Vec::new();
        for entry in expand_class_path(&self.class_path)? {
            let source = open(&entry)?;
            source.entries()?;
            class_path.push(Arc::new(Archive::unnamed(&entry, source)));
        }

        let mut all_modules: BTreeMap<String, ArchiveRef> = BTreeMap::new();
        for archive in application.iter().chain(&system) {
            match all_modules.get(archive.name()) {
                Some(existing) if existing != archive => {
                    tracing::warn!(
                        "module {} at {} shadowed by {}",
                        archive.name(),
                        archive.path_name(),
                        existing.path_name()
                    );
                }
                Some(_) => {}
                None => {
                    all_modules.insert(archive.name().to_string(), Arc::clone(archive));
                }
            }
        }

        let descriptors: BTreeMap<String, ModuleDescriptor> = all_modules
            .iter()
            .filter_map(|(name, a)| a.module().map(|m| (name.clone(), m.descriptor().clone())))
            .collect();
        let mut roots: Vec<String> = self.root_modules.clone();
        roots.extend(application.iter().map(|a| a.name().to_string()));
        if self.add_all_system_modules || !initial_archives.iter().chain(&class_path).all(|a| a.is_module()) {
            roots.extend(system.iter().map(|a| a.name().to_string()));
        }
        roots.sort();
        roots.dedup();
        let resolved = resolver
            .resolve(&roots, &descriptors)
            .map_err(|err| match err.downcast::<JdepsError>() {
                Ok(jdeps) => jdeps,
                Err(other) => JdepsError::Resolution(format!("{other:#}")),
            })?;

        let modules: BTreeMap<String, ArchiveRef> = all_modules
            .into_iter()
            .filter(|(name, _)| resolved.contains(name))
            .collect();

        let mut root_modules = Vec::new();
        for name in &self.root_modules {
            let module = modules
                .get(name)
                .ok_or_else(|| JdepsError::ModuleNotFound(name.clone()))?;
            root_modules.push(Arc::clone(module));
        }

        let mut package_to_module: HashMap<String, ArchiveRef> = HashMap::new();
        for archive in application.iter().chain(&system) {
            if modules.get(archive.name()) != Some(archive) {
                continue;
            }
            let Some(module) = archive.module() else { continue };
            for pn in module.packages() {
                match package_to_module.get(pn) {
                    Some(owner) if owner != archive => {
                        tracing::warn!(
                            "package {pn} in both {} and {}; using {}",
                            owner.name(),
                            archive.name(),
                            owner.name()
                        );
                    }
                    Some(_) => {}
                    None => {
                        package_to_module.insert(pn.clone(), Arc::clone(archive));
                    }
                }
            }
        }

        let mut package_to_unnamed: HashMap<String, Vec<ArchiveRef>> = HashMap::new();
        for archive in initial_archives.iter().chain(&class_path) {
            if archive.is_module() {
                continue;
            }
            if let Some(source) = archive.source() {
                for pn in packages_of(source) {
                    package_to_unnamed.entry(pn).or_default().push(Arc::clone(archive));
                }
            }
        }

        tracing::debug!(
            "configuration: {} modules, {} inputs, {} class path entries",
            modules.len(),
            initial_archives.len(),
            class_path.len()
        );

        Ok(JdepsConfiguration {
            reader,
            versions,
            modules,
            root_modules,
            initial_archives,
            class_path,
            package_to_module,
            package_to_unnamed,
            workers: self.workers.filter(|w| *w > 0).unwrap_or(DEFAULT_WORKERS),
            release,
        })
    }
}

/// The archives of one run and the lookups over them. Built once by
/// [`ConfigOptions::build`] and shared by `Arc`.
pub struct JdepsConfiguration {
    reader: Arc<dyn ClassReader>,
    versions: Arc<ReleaseVersions>,
    modules: BTreeMap<String, ArchiveRef>,
    root_modules: Vec<ArchiveRef>,
    initial_archives: Vec<ArchiveRef>,
    class_path: Vec<ArchiveRef>,
    package_to_module: HashMap<String, ArchiveRef>,
    package_to_unnamed: HashMap<String, Vec<ArchiveRef>>,
    workers: usize,
    release: Option<u32>,
}

impl JdepsConfiguration {
    pub fn reader(&self) -> &dyn ClassReader {
        self.reader.as_ref()
    }

    pub fn versions(&self) -> &Arc<ReleaseVersions> {
        &self.versions
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn release(&self) -> Option<u32> {
        self.release
    }

    /// Resolved modules by name.
    pub fn modules(&self) -> &BTreeMap<String, ArchiveRef> {
        &self.modules
    }

    pub fn find_module(&self, name: &str) -> Option<ArchiveRef> {
        self.modules.get(name).cloned()
    }

    pub fn root_modules(&self) -> &[ArchiveRef] {
        &self.root_modules
    }

    pub fn initial_archives(&self) -> &[ArchiveRef] {
        &self.initial_archives
    }

    pub fn class_path_archives(&self) -> &[ArchiveRef] {
        &self.class_path
    }

    pub fn module_packages(&self, name: &str) -> BTreeSet<String> {
        self.modules
            .get(name)
            .and_then(|a| a.module())
            .map(|m| m.packages().clone())
            .unwrap_or_default()
    }

    /// Archive defining `location`: the module owning its package, else
    /// the first input or class path archive holding the class.
    pub fn find_class(&self, location: &Location) -> Option<ArchiveRef> {
        let pn = location.package_name();
        if let Some(module) = self.package_to_module.get(pn) {
            return Some(Arc::clone(module));
        }
        self.package_to_unnamed
            .get(pn)?
            .iter()
            .find(|a| a.contains(location.name()))
            .cloned()
    }
}

fn sorted_children(dir: &Path) -> Result<Vec<PathBuf>, JdepsError> {
    let io = |source| JdepsError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut children = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io)? {
        children.push(entry.map_err(io)?.path());
    }
    children.sort();
    Ok(children)
}

/// Expands `dir/*` wildcards to the jar files in `dir`, in name order.
pub fn expand_class_path(entries: &[PathBuf]) -> Result<Vec<PathBuf>, JdepsError> {
    let mut expanded = Vec::new();
    for entry in entries {
        if entry.file_name().is_some_and(|n| n == "*") {
            let dir = entry.parent().unwrap_or_else(|| Path::new("."));
            let jars = sorted_children(dir)?
                .into_iter()
                .filter(|p| p.extension().is_some_and(|e| e == "jar"));
            expanded.extend(jars);
        } else {
            expanded.push(entry.clone());
        }
    }
    Ok(expanded)
}

fn packages_of(source: &ClassSource) -> BTreeSet<String> {
    source
        .class_names()
        .iter()
        .map(|cn| Location::new(cn).package_name().to_string())
        .collect()
}

fn open_module(
    path: &Path,
    source: ClassSource,
    reader: &dyn ClassReader,
) -> Result<ArchiveRef, JdepsError> {
    source.entries()?;
    let packages = packages_of(&source);
    let descriptor = match source.read_module_descriptor(reader)? {
        Some(descriptor) => descriptor,
        None => {
            let name = source
                .manifest_attribute("Automatic-Module-Name")
                .map(|n| n.trim().to_string())
                .unwrap_or_else(|| automatic_module_name(path));
            ModuleDescriptor::automatic(name, packages.clone())
        }
    };
    let module = Module::new(descriptor, packages, false);
    Ok(Arc::new(Archive::named_module(module, path, source)))
}

/// Module name derived from a jar file name: version suffix dropped,
/// non-alphanumeric runs collapsed to dots.
pub fn automatic_module_name(path: &Path) -> String {
    let stem = if path.is_dir() {
        path.file_name()
    } else {
        path.file_stem()
    }
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_default();

    let stem = match version_suffix_regex().find(&stem) {
        Some(m) => &stem[..m.start()],
        None => stem.as_str(),
    };
    let normalized = non_alphanumeric_regex().replace_all(stem, ".");
    let parts: Vec<String> = normalized
        .split('.')
        .filter(|p| !p.is_empty())
        .map(|p| {
            if p.starts_with(|c: char| c.is_ascii_digit()) {
                format!("_{p}")
            } else {
                p.to_string()
            }
        })
        .collect();
    if parts.is_empty() {
        "_".to_string()
    } else {
        parts.join(".")
    }
}
