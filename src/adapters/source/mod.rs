//! Enumeration and reading of class entries from directories, jars, single
//! class files and modules of a runtime image.

pub mod directory;
pub mod jar;
pub mod versions;

pub use directory::DirectorySource;
pub use jar::JarSource;
pub use versions::ReleaseVersions;

use crate::domain::error::JdepsError;
use crate::domain::module::ModuleDescriptor;
use crate::domain::ports::{ClassDescriptor, ClassReader};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const MODULE_INFO: &str = "module-info.class";

/// One class entry. `name` is the logical entry path (`p/q/A.class`);
/// `path` is where the bytes live, which differs for entries taken from a
/// multi-release directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    pub name: String,
    pub path: String,
    pub version: Option<u32>,
}

impl ClassEntry {
    pub fn base(name: String) -> Self {
        Self {
            path: name.clone(),
            name,
            version: None,
        }
    }

    pub fn binary_name(&self) -> String {
        self.name
            .strip_suffix(".class")
            .unwrap_or(&self.name)
            .replace('/', ".")
    }
}

#[derive(Debug)]
pub enum SourceKind {
    /// A lone class file; `binary_name` is the class it defines.
    ClassFile { path: PathBuf, binary_name: String },
    Directory(DirectorySource),
    Jar(JarSource),
    ModuleImage(DirectorySource),
}

#[derive(Debug)]
pub struct ClassSource {
    kind: SourceKind,
    entries: OnceCell<BTreeMap<String, ClassEntry>>,
    skipped: Mutex<Vec<String>>,
}

impl ClassSource {
    fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            entries: OnceCell::new(),
            skipped: Mutex::new(Vec::new()),
        }
    }

    /// Picks the reader for `path`: directory, jar/jmod/zip, or a single
    /// class file. A single class file is read once to learn its binary name.
    pub fn open(
        path: &Path,
        release: Option<u32>,
        versions: &Arc<ReleaseVersions>,
        reader: &dyn ClassReader,
    ) -> Result<Self, JdepsError> {
        if !path.exists() {
            return Err(JdepsError::PathNotFound(path.to_path_buf()));
        }
        if path.is_dir() {
            return Ok(Self::new(SourceKind::Directory(DirectorySource::new(path))));
        }
        let is_archive = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| matches!(e, "jar" | "jmod" | "zip"));
        if is_archive {
            Ok(Self::new(SourceKind::Jar(JarSource::new(
                path,
                release,
                Arc::clone(versions),
            ))))
        } else {
            Ok(Self::new(SourceKind::ClassFile {
                path: path.to_path_buf(),
                binary_name: class_file_name(path, reader),
            }))
        }
    }

    /// One module directory of an exploded runtime image.
    pub fn module_image(root: &Path) -> Self {
        Self::new(SourceKind::ModuleImage(DirectorySource::new(root)))
    }

    pub fn kind(&self) -> &SourceKind {
        &self.kind
    }

    pub fn path(&self) -> &Path {
        match &self.kind {
            SourceKind::ClassFile { path, .. } => path,
            SourceKind::Directory(dir) | SourceKind::ModuleImage(dir) => dir.root(),
            SourceKind::Jar(jar) => jar.path(),
        }
    }

    /// Class entries, computed once.
    pub fn entries(&self) -> Result<&BTreeMap<String, ClassEntry>, JdepsError> {
        self.entries.get_or_try_init(|| match &self.kind {
            SourceKind::ClassFile { path, binary_name } => {
                let name = entry_name(binary_name);
                let mut entries = BTreeMap::new();
                entries.insert(
                    name.clone(),
                    ClassEntry {
                        name,
                        path: path.display().to_string(),
                        version: None,
                    },
                );
                Ok(entries)
            }
            SourceKind::Directory(dir) | SourceKind::ModuleImage(dir) => {
                Ok(dir.scan(&mut self.skipped.lock()))
            }
            SourceKind::Jar(jar) => jar.scan(),
        })
    }

    /// Binary names of all classes except the module descriptor.
    pub fn class_names(&self) -> Vec<String> {
        match self.entries() {
            Ok(entries) => entries
                .values()
                .filter(|e| e.name != MODULE_INFO)
                .map(ClassEntry::binary_name)
                .collect(),
            Err(err) => {
                tracing::warn!("{}: {err}", self.path().display());
                Vec::new()
            }
        }
    }

    pub fn contains(&self, binary_name: &str) -> bool {
        let Ok(entries) = self.entries() else {
            return false;
        };
        entries.contains_key(&entry_name(binary_name))
    }

    pub fn has_module_info(&self) -> bool {
        self.entries().is_ok_and(|e| e.contains_key(MODULE_INFO))
    }

    fn read_bytes(&self, entry: &ClassEntry) -> Result<Vec<u8>, JdepsError> {
        match &self.kind {
            SourceKind::ClassFile { path, .. } => std::fs::read(path).map_err(|source| JdepsError::Io {
                path: path.clone(),
                source,
            }),
            SourceKind::Directory(dir) | SourceKind::ModuleImage(dir) => dir.read(entry),
            SourceKind::Jar(jar) => jar.read(entry),
        }
    }

    /// Reads one entry; unreadable entries are recorded and skipped.
    pub fn read_class(&self, reader: &dyn ClassReader, entry: &ClassEntry) -> Option<ClassDescriptor> {
        let result = self
            .read_bytes(entry)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| reader.read_class(&bytes));
        match result {
            Ok(descriptor) => Some(descriptor),
            Err(err) => {
                let message = format!("{}: {err:#}", entry.name);
                tracing::warn!("skipping {} in {}", message, self.path().display());
                self.skipped.lock().push(message);
                None
            }
        }
    }

    /// Reads every class entry in entry order.
    pub fn for_each_class<F>(&self, reader: &dyn ClassReader, mut f: F) -> Result<(), JdepsError>
    where
        F: FnMut(ClassDescriptor),
    {
        for entry in self.entries()?.values() {
            if let Some(descriptor) = self.read_class(reader, entry) {
                f(descriptor);
            }
        }
        Ok(())
    }

    /// Reads the class with binary name `name`, retrying `a.b.C` as the
    /// nested class `a.b$C`.
    pub fn find_class(&self, reader: &dyn ClassReader, name: &str) -> Option<ClassDescriptor> {
        let entries = self.entries().ok()?;
        let entry = entries.get(&entry_name(name)).or_else(|| {
            let (outer, inner) = name.rsplit_once('.')?;
            entries.get(&format!("{}${inner}.class", outer.replace('.', "/")))
        })?;
        self.read_class(reader, entry)
    }

    pub fn read_module_descriptor(
        &self,
        reader: &dyn ClassReader,
    ) -> Result<Option<ModuleDescriptor>, JdepsError> {
        let Some(entry) = self.entries()?.get(MODULE_INFO) else {
            return Ok(None);
        };
        let bytes = self.read_bytes(entry)?;
        reader
            .read_module(&bytes)
            .map(Some)
            .map_err(|err| JdepsError::ModuleDescriptor {
                path: self.path().to_path_buf(),
                message: format!("{err:#}"),
            })
    }

    /// Manifest main attribute; only jars carry one.
    pub fn manifest_attribute(&self, key: &str) -> Option<String> {
        match &self.kind {
            SourceKind::Jar(jar) => jar.manifest().get(key).cloned(),
            _ => None,
        }
    }

    pub fn skipped_entries(&self) -> Vec<String> {
        self.skipped.lock().clone()
    }
}

fn entry_name(binary_name: &str) -> String {
    format!("{}.class", binary_name.replace('.', "/"))
}

/// Name of the class defined in `path`, or the file stem when it cannot be
/// read. An unreadable file is reported again when its class is parsed.
fn class_file_name(path: &Path, reader: &dyn ClassReader) -> String {
    let read = std::fs::read(path)
        .map_err(anyhow::Error::from)
        .and_then(|bytes| reader.read_class(&bytes));
    match read {
        Ok(descriptor) => descriptor.name.name().to_string(),
        Err(err) => {
            tracing::debug!("{}: {err:#}", path.display());
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        }
    }
}
