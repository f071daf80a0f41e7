//! Analysis of named modules against their declared descriptors: which
//! modules are actually required, which must be `requires transitive`,
//! and what a reduced, minimal descriptor looks like.

use crate::app::module_graph::ModuleGraphBuilder;
use crate::domain::archive::ArchiveRef;
use crate::domain::config::JdepsConfiguration;
use crate::domain::error::JdepsError;
use crate::domain::filter::JdepsFilter;
use crate::domain::finder::{DependencyFinder, ParseMode};
use crate::domain::graph::Graph;
use crate::domain::module::{Exports, ModuleDescriptor, Requires, RequiresModifier};
use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::Arc;

pub const JAVA_BASE: &str = "java.base";

/// Requires computed for one root module.
#[derive(Debug, Clone)]
pub struct ModuleDeps {
    root: ArchiveRef,
    requires_transitive: BTreeSet<String>,
    requires: BTreeSet<String>,
    missing: BTreeSet<String>,
}

impl ModuleDeps {
    pub fn root(&self) -> &ArchiveRef {
        &self.root
    }

    pub fn name(&self) -> &str {
        self.root.name()
    }

    /// Modules referenced from the exported API, `java.base` excluded.
    pub fn requires_transitive(&self) -> &BTreeSet<String> {
        &self.requires_transitive
    }

    /// Modules referenced from any class.
    pub fn requires(&self) -> &BTreeSet<String> {
        &self.requires
    }

    /// Referenced classes no configured archive defines.
    pub fn missing(&self) -> &BTreeSet<String> {
        &self.missing
    }

    /// Descriptor with every computed requires.
    pub fn descriptor(&self) -> ModuleDescriptor {
        self.descriptor_with(&self.requires)
    }

    /// Descriptor whose plain requires are the transitive reduction of the
    /// computed module graph.
    pub fn reduced_descriptor(&self, config: &JdepsConfiguration) -> Result<ModuleDescriptor> {
        let graph = self.reduced_graph(config)?;
        let adjacent = graph
            .adjacent_nodes(&self.name().to_string())
            .cloned()
            .unwrap_or_default();
        Ok(self.descriptor_with(&adjacent))
    }

    /// Module graph of the root after transitive reduction, keeping the
    /// `requires transitive` edges the exported API needs.
    pub fn reduced_graph(&self, config: &JdepsConfiguration) -> Result<Graph<String>> {
        let root = self.name().to_string();

        let mut api = ModuleGraphBuilder::new(config);
        api.add_module(root.clone());
        for m in &self.requires_transitive {
            api.add_edge(root.clone(), m.clone());
        }
        let api_graph = api.build_plain().reduce();

        let mut full = ModuleGraphBuilder::new(config);
        full.add_module(root.clone());
        for m in &self.requires {
            full.add_edge(root.clone(), m.clone());
        }
        let graph = full
            .build()
            .reduce_against(&api_graph)
            .with_context(|| format!("failed to reduce module graph of {root}"))?;
        tracing::debug!("reduced graph of {root}:\n{graph}");
        Ok(graph)
    }

    fn descriptor_with(&self, requires: &BTreeSet<String>) -> ModuleDescriptor {
        let mut descriptor = ModuleDescriptor::new(self.name());
        if self.name() != JAVA_BASE {
            descriptor
                .requires
                .push(Requires::new(JAVA_BASE).with_modifier(RequiresModifier::Mandated));
        }
        for name in &self.requires_transitive {
            descriptor
                .requires
                .push(Requires::new(name).with_modifier(RequiresModifier::Transitive));
        }
        for name in requires {
            if name != JAVA_BASE && !self.requires_transitive.contains(name) {
                descriptor.requires.push(Requires::new(name));
            }
        }
        descriptor
    }

    /// Declared requires the analysis found no use for.
    pub fn unused_requires(&self) -> BTreeSet<String> {
        let Some(module) = self.root.module() else {
            return BTreeSet::new();
        };
        module
            .descriptor()
            .requires
            .iter()
            .filter(|r| !r.is_mandated() && r.name != JAVA_BASE)
            .filter(|r| !self.requires.contains(&r.name) && !self.requires_transitive.contains(&r.name))
            .map(|r| r.name.clone())
            .collect()
    }
}

/// Outcome of checking one module descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckReport {
    pub module: String,
    pub declared: ModuleDescriptor,
    pub suggested: ModuleDescriptor,
    pub reduced: ModuleDescriptor,
    pub unused_requires: BTreeSet<String>,
    pub missing: BTreeSet<String>,
}

impl CheckReport {
    /// Whether the declared requires already match the analysis.
    pub fn is_consistent(&self) -> bool {
        matches(&self.declared, &self.suggested)
    }

    /// Whether the declared requires equal the reduced suggestion.
    pub fn is_reduced(&self) -> bool {
        matches(&self.declared, &self.reduced)
    }
}

/// Requires as compared by [`matches`]: name and transitivity.
fn requires_key(descriptor: &ModuleDescriptor) -> BTreeSet<(&str, bool)> {
    descriptor
        .requires
        .iter()
        .filter(|r| !r.is_mandated() && r.name != JAVA_BASE)
        .map(|r| (r.name.as_str(), r.is_transitive()))
        .collect()
}

/// True when `declared` has the same transitive requires as `computed`
/// and declares nothing `computed` lacks.
fn matches(declared: &ModuleDescriptor, computed: &ModuleDescriptor) -> bool {
    let declared = requires_key(declared);
    let computed = requires_key(computed);
    let transitive = |set: &BTreeSet<(&str, bool)>| -> BTreeSet<String> {
        set.iter().filter(|(_, t)| *t).map(|(n, _)| n.to_string()).collect()
    };
    transitive(&declared) == transitive(&computed) && declared.is_subset(&computed)
}

pub struct ModuleAnalyzer {
    config: Arc<JdepsConfiguration>,
    finder: DependencyFinder,
    roots: Vec<ArchiveRef>,
}

impl ModuleAnalyzer {
    /// Analyzes the named modules, or without names the root modules of
    /// the configuration, or else every non-system module.
    pub fn new(config: Arc<JdepsConfiguration>, names: &[String]) -> Result<Self> {
        let roots: Vec<ArchiveRef> = if !names.is_empty() {
            names
                .iter()
                .map(|n| config.find_module(n).ok_or_else(|| JdepsError::ModuleNotFound(n.clone())))
                .collect::<Result<_, _>>()?
        } else if !config.root_modules().is_empty() {
            config.root_modules().to_vec()
        } else {
            config
                .modules()
                .values()
                .filter(|m| !m.is_system_module())
                .cloned()
                .collect()
        };
        let finder = DependencyFinder::new(Arc::clone(&config), Arc::new(JdepsFilter::default_filter()))?;
        Ok(Self { config, finder, roots })
    }

    pub fn roots(&self) -> &[ArchiveRef] {
        &self.roots
    }

    pub fn config(&self) -> &Arc<JdepsConfiguration> {
        &self.config
    }

    /// Computes the requires of every root. The exported API pass runs
    /// before the full pass of the same root.
    pub fn run(&self) -> Result<Vec<ModuleDeps>> {
        self.roots.iter().map(|root| self.analyze(root)).collect()
    }

    fn analyze(&self, root: &ArchiveRef) -> Result<ModuleDeps> {
        let mut missing = BTreeSet::new();
        let requires_transitive = self
            .compute_requires(root, ParseMode::ExportedApi, &mut missing)?
            .into_iter()
            .filter(|m| m != JAVA_BASE)
            .collect();
        let requires = self.compute_requires(root, ParseMode::Class, &mut missing)?;
        for cn in &missing {
            tracing::warn!("{}: {cn} not found", root.name());
        }
        Ok(ModuleDeps {
            root: Arc::clone(root),
            requires_transitive,
            requires,
            missing,
        })
    }

    fn compute_requires(
        &self,
        root: &ArchiveRef,
        mode: ParseMode,
        missing: &mut BTreeSet<String>,
    ) -> Result<BTreeSet<String>> {
        let targets = self
            .finder
            .parse_in([root], mode)
            .with_context(|| format!("failed to parse module {}", root.name()))?;
        let mut modules = BTreeSet::new();
        for location in targets {
            let archive = self.finder.location_to_archive(&location);
            if archive == *root {
                continue;
            }
            if archive.is_module() {
                modules.insert(archive.name().to_string());
            } else if archive.is_not_found() {
                missing.insert(location.name().to_string());
            } else {
                tracing::debug!("{}: {location} is in unnamed archive {}", root.name(), archive.name());
            }
        }
        Ok(modules)
    }

    pub fn check(&self, deps: &ModuleDeps) -> Result<CheckReport> {
        let declared = deps
            .root
            .module()
            .map(|m| m.descriptor().clone())
            .unwrap_or_else(|| ModuleDescriptor::new(deps.name()));
        Ok(CheckReport {
            module: deps.name().to_string(),
            declared,
            suggested: deps.descriptor(),
            reduced: deps.reduced_descriptor(&self.config)?,
            unused_requires: deps.unused_requires(),
            missing: deps.missing.clone(),
        })
    }

    /// Descriptor to write as `module-info.java`: the reduced requires plus
    /// the root's exports, opens, uses and provides. An automatic module
    /// exports every package it contains.
    pub fn generate(&self, deps: &ModuleDeps) -> Result<ModuleDescriptor> {
        let mut descriptor = deps.reduced_descriptor(&self.config)?;
        let Some(module) = deps.root.module() else {
            return Ok(descriptor);
        };
        if module.is_automatic() {
            descriptor.exports = module.packages().iter().map(Exports::new).collect();
        } else {
            let declared = module.descriptor();
            descriptor.is_open = declared.is_open;
            descriptor.exports = declared.exports.clone();
            descriptor.opens = declared.opens.clone();
            descriptor.uses = declared.uses.clone();
            descriptor.provides = declared.provides.clone();
        }
        descriptor.packages = module.packages().clone();
        Ok(descriptor)
    }
}

/// Renders `descriptor` as `module-info.java` source.
pub fn module_info_source(descriptor: &ModuleDescriptor) -> String {
    let mut out = String::new();
    let open = if descriptor.is_open { "open " } else { "" };
    let _ = writeln!(out, "{open}module {} {{", descriptor.name);

    let mut requires: Vec<&Requires> = descriptor
        .requires
        .iter()
        .filter(|r| !(r.is_mandated() && r.name == JAVA_BASE))
        .collect();
    requires.sort_by(|a, b| a.name.cmp(&b.name));
    for r in &requires {
        let mut modifiers = String::new();
        if r.is_transitive() {
            modifiers.push_str("transitive ");
        }
        if r.is_static() {
            modifiers.push_str("static ");
        }
        let _ = writeln!(out, "    requires {modifiers}{};", r.name);
    }

    let section = |out: &mut String, keyword: &str, items: &[Exports]| {
        if items.is_empty() {
            return;
        }
        out.push('\n');
        let mut items: Vec<&Exports> = items.iter().collect();
        items.sort();
        for e in items {
            if e.is_qualified() {
                let targets: Vec<&str> = e.targets.iter().map(String::as_str).collect();
                let _ = writeln!(out, "    {keyword} {} to\n        {};", e.source, targets.join(",\n        "));
            } else {
                let _ = writeln!(out, "    {keyword} {};", e.source);
            }
        }
    };
    section(&mut out, "exports", &descriptor.exports);
    if !descriptor.is_open {
        section(&mut out, "opens", &descriptor.opens);
    }

    if !descriptor.uses.is_empty() {
        out.push('\n');
        for service in &descriptor.uses {
            let _ = writeln!(out, "    uses {service};");
        }
    }

    let mut provides: Vec<_> = descriptor.provides.iter().collect();
    provides.sort();
    if !provides.is_empty() {
        out.push('\n');
        for p in provides {
            let _ = writeln!(
                out,
                "    provides {} with\n        {};",
                p.service,
                p.providers.join(",\n        ")
            );
        }
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_info_source() {
        let mut md = ModuleDescriptor::new("m");
        md.requires.push(Requires::new(JAVA_BASE).with_modifier(RequiresModifier::Mandated));
        md.requires.push(Requires::new("z"));
        md.requires.push(Requires::new("a").with_modifier(RequiresModifier::Transitive));
        md.exports.push(Exports::new("p.q"));
        md.exports.push(Exports::new("p.internal").to("friend"));
        md.uses.insert("p.Service".to_string());

        let text = module_info_source(&md);
        assert_eq!(
            text,
            "module m {\n    requires transitive a;\n    requires z;\n\n    exports p.internal to\n        friend;\n    exports p.q;\n\n    uses p.Service;\n}\n"
        );
    }

    #[test]
    fn test_matches_ignores_mandated_java_base() {
        let mut declared = ModuleDescriptor::new("m");
        declared.requires.push(Requires::new("a").with_modifier(RequiresModifier::Transitive));
        let mut computed = declared.clone();
        computed
            .requires
            .push(Requires::new(JAVA_BASE).with_modifier(RequiresModifier::Mandated));
        computed.requires.push(Requires::new("b"));
        assert!(matches(&declared, &computed));

        declared.requires.push(Requires::new("unused"));
        assert!(!matches(&declared, &computed));
    }
}
