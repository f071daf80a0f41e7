//! Module descriptors and the module view of an archive.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequiresModifier {
    Transitive,
    Static,
    Synthetic,
    Mandated,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Requires {
    pub name: String,
    pub modifiers: BTreeSet<RequiresModifier>,
}

impl Requires {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modifiers: BTreeSet::new(),
        }
    }

    pub fn with_modifier(mut self, modifier: RequiresModifier) -> Self {
        self.modifiers.insert(modifier);
        self
    }

    pub fn is_transitive(&self) -> bool {
        self.modifiers.contains(&RequiresModifier::Transitive)
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.contains(&RequiresModifier::Static)
    }

    pub fn is_mandated(&self) -> bool {
        self.modifiers.contains(&RequiresModifier::Mandated)
    }
}

/// An `exports` or `opens` directive; empty `targets` means unqualified.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Exports {
    pub source: String,
    pub targets: BTreeSet<String>,
}

impl Exports {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            targets: BTreeSet::new(),
        }
    }

    pub fn to(mut self, target: impl Into<String>) -> Self {
        self.targets.insert(target.into());
        self
    }

    pub fn is_qualified(&self) -> bool {
        !self.targets.is_empty()
    }
}

pub type Opens = Exports;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Provides {
    pub service: String,
    pub providers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub name: String,
    pub is_open: bool,
    pub is_automatic: bool,
    pub requires: Vec<Requires>,
    pub exports: Vec<Exports>,
    pub opens: Vec<Opens>,
    pub uses: BTreeSet<String>,
    pub provides: Vec<Provides>,
    pub packages: BTreeSet<String>,
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Descriptor of an automatic module: no declared requires, every
    /// package exported and open.
    pub fn automatic(name: impl Into<String>, packages: BTreeSet<String>) -> Self {
        Self {
            name: name.into(),
            is_automatic: true,
            packages,
            ..Default::default()
        }
    }

    pub fn requires_names(&self) -> impl Iterator<Item = &str> {
        self.requires.iter().map(|r| r.name.as_str())
    }
}

/// The module face of an archive: descriptor, packages, and whether it was
/// loaded from the system image.
#[derive(Debug, Clone)]
pub struct Module {
    descriptor: ModuleDescriptor,
    packages: BTreeSet<String>,
    system: bool,
}

impl Module {
    pub fn new(descriptor: ModuleDescriptor, packages: BTreeSet<String>, system: bool) -> Self {
        let mut packages = packages;
        packages.extend(descriptor.packages.iter().cloned());
        Self {
            descriptor,
            packages,
            system,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    pub fn packages(&self) -> &BTreeSet<String> {
        &self.packages
    }

    pub fn is_system(&self) -> bool {
        self.system
    }

    pub fn is_automatic(&self) -> bool {
        self.descriptor.is_automatic
    }

    pub fn is_jdk(&self) -> bool {
        self.system && (self.name().starts_with("java.") || self.name().starts_with("jdk."))
    }

    pub fn is_jdk_unsupported(&self) -> bool {
        self.name() == "jdk.unsupported"
    }

    pub fn contains_package(&self, pn: &str) -> bool {
        self.packages.contains(pn)
    }

    /// Unqualified export of `pn`.
    pub fn is_exported(&self, pn: &str) -> bool {
        if self.is_automatic() {
            return self.packages.contains(pn);
        }
        self.descriptor
            .exports
            .iter()
            .any(|e| e.source == pn && !e.is_qualified())
    }

    /// Export of `pn` visible to module `target`, qualified or not.
    pub fn is_exported_to(&self, pn: &str, target: &str) -> bool {
        if self.is_automatic() {
            return self.packages.contains(pn);
        }
        self.descriptor
            .exports
            .iter()
            .any(|e| e.source == pn && (!e.is_qualified() || e.targets.contains(target)))
    }

    pub fn is_open(&self, pn: &str) -> bool {
        if self.is_automatic() || self.descriptor.is_open {
            return self.packages.contains(pn);
        }
        self.descriptor
            .opens
            .iter()
            .any(|o| o.source == pn && !o.is_qualified())
    }

    /// Package exported only to named modules.
    pub fn is_qualified_export(&self, pn: &str) -> bool {
        !self.is_exported(pn)
            && self
                .descriptor
                .exports
                .iter()
                .any(|e| e.source == pn && e.is_qualified())
    }

    /// A package of the module that no one outside the module can see.
    pub fn is_internal_package(&self, pn: &str) -> bool {
        self.packages.contains(pn) && !self.is_exported(pn)
    }

    pub fn qualified_exports(&self) -> impl Iterator<Item = &Exports> {
        self.descriptor.exports.iter().filter(|e| e.is_qualified())
    }
}
