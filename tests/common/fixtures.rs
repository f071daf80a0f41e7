//! Test fixture generators for integration tests.
#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use jdeps::adapters::resolver::RequiresResolver;
use jdeps::domain::config::{ConfigOptions, JdepsConfiguration};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

use super::mock::MockClassReader;

/// `p.q.A` -> `p/q/A.class`.
pub fn entry_name(class_name: &str) -> String {
    format!("{}.class", class_name.replace('.', "/"))
}

/// Scratch directory holding class directories and jars.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Directory of classes, each given as (binary name, class text).
    pub fn class_dir(&self, name: &str, classes: &[(&str, String)]) -> PathBuf {
        let root = self.dir.path().join(name);
        for (cn, text) in classes {
            write_file(&root.join(entry_name(cn)), text.as_bytes());
        }
        std::fs::create_dir_all(&root).expect("create class dir");
        root
    }

    /// A lone class file laid out under `dir` by its package.
    pub fn class_file(&self, dir: &str, class_name: &str, text: String) -> PathBuf {
        let path = self.dir.path().join(dir).join(entry_name(class_name));
        write_file(&path, text.as_bytes());
        path
    }

    /// Exploded module: a class directory with a `module-info.class`.
    pub fn module_dir(&self, name: &str, module_text: &str, classes: &[(&str, String)]) -> PathBuf {
        let root = self.class_dir(name, classes);
        write_file(&root.join("module-info.class"), module_text.as_bytes());
        root
    }

    /// Jar with the given raw entries.
    pub fn jar(&self, name: &str, entries: &[(&str, Vec<u8>)]) -> PathBuf {
        let path = self.dir.path().join(name);
        let file = std::fs::File::create(&path).expect("create jar");
        let mut writer = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (entry, bytes) in entries {
            writer.start_file(*entry, options).expect("start entry");
            writer.write_all(bytes).expect("write entry");
        }
        writer.finish().expect("finish jar");
        path
    }

    /// Jar of classes, each given as (binary name, class text).
    pub fn class_jar(&self, name: &str, classes: &[(&str, String)]) -> PathBuf {
        let entries: Vec<(String, Vec<u8>)> = classes
            .iter()
            .map(|(cn, text)| (entry_name(cn), text.clone().into_bytes()))
            .collect();
        let borrowed: Vec<(&str, Vec<u8>)> = entries
            .iter()
            .map(|(n, b)| (n.as_str(), b.clone()))
            .collect();
        self.jar(name, &borrowed)
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

fn write_file(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    std::fs::write(path, bytes).expect("write file");
}

pub fn manifest(attributes: &[(&str, &str)]) -> Vec<u8> {
    let mut text = String::from("Manifest-Version: 1.0\r\n");
    for (key, value) in attributes {
        text.push_str(&format!("{key}: {value}\r\n"));
    }
    text.push_str("\r\n");
    text.into_bytes()
}

/// Builds a configuration over the mock reader.
pub fn configure(options: ConfigOptions, reader: Arc<MockClassReader>) -> Result<Arc<JdepsConfiguration>> {
    Ok(Arc::new(options.build(reader, &RequiresResolver)?))
}

/// Module chain m1 -> m2 -> m3 where m2 `requires transitive` m3 and
/// exposes m3 types from its API. m1 uses only m2.
pub struct ModuleChain {
    pub workspace: Workspace,
    pub m1: PathBuf,
    pub m2: PathBuf,
    pub m3: PathBuf,
}

pub fn module_chain() -> ModuleChain {
    use super::mock::class_text;

    let workspace = Workspace::new();
    let m3 = workspace.module_dir(
        "m3",
        "module m3\nexports p3\n",
        &[("p3.C", class_text("p3.C", true, &[], &[]))],
    );
    let m2 = workspace.module_dir(
        "m2",
        "module m2\nrequires m3 transitive\nexports p2\n",
        &[("p2.B", class_text("p2.B", true, &[], &["p3.C"]))],
    );
    let m1 = workspace.module_dir(
        "m1",
        "module m1\nrequires m2\nexports p1\n",
        &[("p1.A", class_text("p1.A", true, &["p2.B"], &[]))],
    );
    ModuleChain {
        workspace,
        m1,
        m2,
        m3,
    }
}
