use super::ClassEntry;
use super::versions::{ReleaseVersions, split_versioned};
use crate::domain::error::JdepsError;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zip::ZipArchive;
use zip::result::ZipError;

const MANIFEST: &str = "META-INF/MANIFEST.MF";

/// A jar, jmod or zip file. The zip handle is opened on first use and kept
/// until the source is dropped.
pub struct JarSource {
    path: PathBuf,
    release: Option<u32>,
    versions: Arc<ReleaseVersions>,
    archive: Mutex<Option<ZipArchive<File>>>,
    manifest: OnceCell<BTreeMap<String, String>>,
}

impl std::fmt::Debug for JarSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JarSource")
            .field("path", &self.path)
            .field("release", &self.release)
            .finish()
    }
}

impl JarSource {
    pub fn new(path: impl Into<PathBuf>, release: Option<u32>, versions: Arc<ReleaseVersions>) -> Self {
        Self {
            path: path.into(),
            release,
            versions,
            archive: Mutex::new(None),
            manifest: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_archive<R>(
        &self,
        f: impl FnOnce(&mut ZipArchive<File>) -> Result<R, JdepsError>,
    ) -> Result<R, JdepsError> {
        let mut guard = self.archive.lock();
        if guard.is_none() {
            let file = File::open(&self.path).map_err(|source| JdepsError::Io {
                path: self.path.clone(),
                source,
            })?;
            let archive = ZipArchive::new(file).map_err(|source| self.zip_error(source))?;
            *guard = Some(archive);
        }
        match guard.as_mut() {
            Some(archive) => f(archive),
            None => Err(JdepsError::PathNotFound(self.path.clone())),
        }
    }

    fn zip_error(&self, source: ZipError) -> JdepsError {
        JdepsError::Zip {
            path: self.path.clone(),
            source,
        }
    }

    fn read_entry(&self, name: &str) -> Result<Option<Vec<u8>>, JdepsError> {
        self.with_archive(|archive| {
            let mut file = match archive.by_name(name) {
                Ok(file) => file,
                Err(ZipError::FileNotFound) => return Ok(None),
                Err(source) => return Err(self.zip_error(source)),
            };
            let mut bytes = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut bytes).map_err(|source| JdepsError::Io {
                path: self.path.join(name),
                source,
            })?;
            Ok(Some(bytes))
        })
    }

    /// Main-section attributes of the manifest; empty if there is none.
    pub fn manifest(&self) -> &BTreeMap<String, String> {
        self.manifest.get_or_init(|| match self.read_entry(MANIFEST) {
            Ok(Some(bytes)) => parse_manifest(&String::from_utf8_lossy(&bytes)),
            Ok(None) => BTreeMap::new(),
            Err(err) => {
                tracing::warn!("{}: cannot read manifest: {err}", self.path.display());
                BTreeMap::new()
            }
        })
    }

    pub fn is_multi_release(&self) -> bool {
        self.manifest()
            .get("Multi-Release")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }

    pub(super) fn scan(&self) -> Result<BTreeMap<String, ClassEntry>, JdepsError> {
        let names: Vec<String> =
            self.with_archive(|archive| Ok(archive.file_names().map(str::to_string).collect()))?;

        let release = if self.is_multi_release() {
            Some(self.release.ok_or_else(|| JdepsError::MultiReleaseNotSelected {
                path: self.path.clone(),
            })?)
        } else {
            None
        };

        let mut entries = BTreeMap::new();
        let mut overlays: BTreeMap<String, (u32, String)> = BTreeMap::new();
        for name in names {
            if name.ends_with('/') {
                continue;
            }
            if name.starts_with("META-INF/") {
                let Some(release) = release else { continue };
                let versioned =
                    split_versioned(&name).map_err(|entry| JdepsError::MalformedMultiRelease {
                        path: self.path.clone(),
                        entry,
                    })?;
                let Some((version, path)) = versioned else {
                    continue;
                };
                if version <= release && path.ends_with(".class") {
                    let newer = overlays.get(path).is_none_or(|(v, _)| *v < version);
                    if newer {
                        overlays.insert(path.to_string(), (version, name.clone()));
                    }
                }
                continue;
            }
            if name.ends_with(".class") {
                entries.insert(name.clone(), ClassEntry::base(name));
            }
        }

        for (logical, (version, physical)) in overlays {
            let entry = ClassEntry {
                name: logical.clone(),
                path: physical,
                version: Some(version),
            };
            if entry.name != "module-info.class" {
                self.versions.record(&entry.binary_name(), version)?;
            }
            tracing::debug!("{}: {} taken from release {version}", self.path.display(), logical);
            entries.insert(logical, entry);
        }
        Ok(entries)
    }

    pub(super) fn read(&self, entry: &ClassEntry) -> Result<Vec<u8>, JdepsError> {
        self.read_entry(&entry.path)?
            .ok_or_else(|| JdepsError::PathNotFound(self.path.join(&entry.path)))
    }
}

/// Parses the main section of a manifest, joining continuation lines.
pub fn parse_manifest(text: &str) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();
    let mut current: Option<(String, String)> = None;
    for line in text.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            break;
        }
        if let Some(continued) = line.strip_prefix(' ') {
            if let Some((_, value)) = current.as_mut() {
                value.push_str(continued);
            }
            continue;
        }
        if let Some((key, value)) = current.take() {
            attributes.insert(key, value);
        }
        if let Some((key, value)) = line.split_once(':') {
            current = Some((key.trim().to_string(), value.trim_start().to_string()));
        }
    }
    if let Some((key, value)) = current {
        attributes.insert(key, value);
    }
    attributes
}
