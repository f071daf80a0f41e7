use super::ClassEntry;
use crate::domain::error::JdepsError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Class files under a directory tree (also used for one module of an
/// exploded runtime image).
#[derive(Debug)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walks the tree; entries that cannot be visited go to `skipped`.
    pub(super) fn scan(&self, skipped: &mut Vec<String>) -> BTreeMap<String, ClassEntry> {
        let mut entries = BTreeMap::new();
        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(self.root.as_path()).display().to_string();
                    tracing::warn!("skipping {path}: {err}");
                    skipped.push(format!("{path}: {err}"));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if !name.ends_with(".class") || name.starts_with("META-INF/") {
                continue;
            }
            entries.insert(name.clone(), ClassEntry::base(name));
        }
        entries
    }

    pub(super) fn read(&self, entry: &ClassEntry) -> Result<Vec<u8>, JdepsError> {
        let path = self.root.join(&entry.path);
        std::fs::read(&path).map_err(|source| JdepsError::Io { path, source })
    }
}
