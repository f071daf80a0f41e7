use crate::domain::finder::ParseMode;
use crate::domain::location::Location;
use crate::domain::module::ModuleDescriptor;
use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};

/// Class-file access flags the engine cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessFlags(pub u16);

impl AccessFlags {
    pub const ACC_PUBLIC: u16 = 0x0001;
    pub const ACC_INTERFACE: u16 = 0x0200;
    pub const ACC_MODULE: u16 = 0x8000;

    pub fn is_public(&self) -> bool {
        self.0 & Self::ACC_PUBLIC != 0
    }

    pub fn is_module(&self) -> bool {
        self.0 & Self::ACC_MODULE != 0
    }
}

/// What the class reader extracted from one class entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDescriptor {
    pub name: Location,
    pub access_flags: AccessFlags,
    /// Every class referenced anywhere in the class file.
    pub dependencies: Vec<Location>,
    /// Classes referenced from the public/protected surface only.
    pub api_dependencies: Vec<Location>,
}

impl ClassDescriptor {
    pub fn location(&self) -> &Location {
        &self.name
    }

    pub fn targets(&self, mode: ParseMode) -> &[Location] {
        match mode {
            ParseMode::Class => &self.dependencies,
            ParseMode::ExportedApi => &self.api_dependencies,
        }
    }

    pub fn dependencies(&self, mode: ParseMode) -> impl Iterator<Item = Dependency> + '_ {
        self.targets(mode).iter().map(move |target| Dependency {
            origin: self.name.clone(),
            target: target.clone(),
        })
    }
}

/// A raw class-level edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Dependency {
    pub origin: Location,
    pub target: Location,
}

impl Dependency {
    pub fn new(origin: impl Into<Location>, target: impl Into<Location>) -> Self {
        Self {
            origin: origin.into(),
            target: target.into(),
        }
    }
}

/// Class descriptor reader port
pub trait ClassReader: Send + Sync {
    fn read_class(&self, bytes: &[u8]) -> Result<ClassDescriptor>;

    fn read_module(&self, bytes: &[u8]) -> Result<ModuleDescriptor>;
}

/// Module resolution port: the set of modules reachable from `roots`.
pub trait ModuleResolver: Send + Sync {
    fn resolve(
        &self,
        roots: &[String],
        descriptors: &BTreeMap<String, ModuleDescriptor>,
    ) -> Result<BTreeSet<String>>;
}
