//! Dependency filtering: which classes are analyzed and which edges are kept.

use crate::domain::archive::Archive;
use crate::domain::location::Location;
use crate::domain::module::Module;
use crate::domain::ports::Dependency;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("only one of packages, regex or requires may be used as a target filter")]
    ConflictingTargetFilters,

    #[error("JDK internals and missing dependency modes cannot be combined")]
    ConflictingModes,

    #[error("invalid pattern `{pattern}`")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Raw filter settings, validated by [`FilterOptions::build`].
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    /// Regex matched against the whole name of origin classes.
    pub include_pattern: Option<String>,
    pub include_system_modules: bool,
    /// Target package names; `p.*` also selects subpackages of `p`.
    pub packages: Vec<String>,
    /// Regex matched against the whole name of target classes.
    pub regex: Option<String>,
    /// Target modules and their packages.
    pub requires: BTreeMap<String, BTreeSet<String>>,
    pub filter_same_package: bool,
    pub filter_same_archive: bool,
    /// Regex on target package names; matching targets are dropped.
    pub filter_pattern: Option<String>,
    pub find_jdk_internals: bool,
    pub find_missing_deps: bool,
}

impl FilterOptions {
    pub fn require_module<I, S>(mut self, name: impl Into<String>, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires
            .entry(name.into())
            .or_default()
            .extend(packages.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<JdepsFilter, FilterError> {
        let target_filters = [
            !self.packages.is_empty(),
            self.regex.is_some(),
            !self.requires.is_empty(),
        ]
        .iter()
        .filter(|set| **set)
        .count();
        if target_filters > 1 {
            return Err(FilterError::ConflictingTargetFilters);
        }
        if self.find_jdk_internals && self.find_missing_deps {
            return Err(FilterError::ConflictingModes);
        }

        let target_filter = if !self.packages.is_empty() {
            Some(TargetFilter::Packages(PackageFilter::new(&self.packages)))
        } else if let Some(regex) = &self.regex {
            Some(TargetFilter::Regex(compile(regex)?))
        } else if !self.requires.is_empty() {
            let packages = self.requires.values().flatten().cloned().collect();
            Some(TargetFilter::Requires(packages))
        } else {
            None
        };

        Ok(JdepsFilter {
            include_pattern: self.include_pattern.as_deref().map(compile).transpose()?,
            include_system_modules: self.include_system_modules,
            target_filter,
            requires: self.requires.into_keys().collect(),
            filter_same_package: self.filter_same_package,
            filter_same_archive: self.filter_same_archive,
            filter_pattern: self.filter_pattern.as_deref().map(compile).transpose()?,
            find_jdk_internals: self.find_jdk_internals,
            find_missing_deps: self.find_missing_deps,
        })
    }
}

fn compile(pattern: &str) -> Result<Regex, FilterError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| FilterError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

#[derive(Debug, Clone)]
struct PackageFilter {
    exact: BTreeSet<String>,
    prefixes: Vec<String>,
}

impl PackageFilter {
    fn new(packages: &[String]) -> Self {
        let mut exact = BTreeSet::new();
        let mut prefixes = Vec::new();
        for pn in packages {
            match pn.strip_suffix(".*") {
                Some(prefix) => prefixes.push(prefix.to_string()),
                None => {
                    exact.insert(pn.clone());
                }
            }
        }
        Self { exact, prefixes }
    }

    fn matches(&self, pn: &str) -> bool {
        self.exact.contains(pn)
            || self.prefixes.iter().any(|prefix| {
                pn == prefix
                    || pn
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('.'))
            })
    }
}

#[derive(Debug, Clone)]
enum TargetFilter {
    Packages(PackageFilter),
    Regex(Regex),
    Requires(BTreeSet<String>),
}

impl TargetFilter {
    fn matches(&self, target: &Location) -> bool {
        match self {
            TargetFilter::Packages(filter) => filter.matches(target.package_name()),
            TargetFilter::Regex(regex) => regex.is_match(target.name()),
            TargetFilter::Requires(packages) => packages.contains(target.package_name()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JdepsFilter {
    include_pattern: Option<Regex>,
    include_system_modules: bool,
    target_filter: Option<TargetFilter>,
    requires: BTreeSet<String>,
    filter_same_package: bool,
    filter_same_archive: bool,
    filter_pattern: Option<Regex>,
    find_jdk_internals: bool,
    find_missing_deps: bool,
}

impl JdepsFilter {
    /// Drops same-package and same-archive edges, nothing else.
    pub fn default_filter() -> Self {
        Self {
            filter_same_package: true,
            filter_same_archive: true,
            ..Default::default()
        }
    }

    pub fn has_include_pattern(&self) -> bool {
        self.include_pattern.is_some()
    }

    pub fn has_target_filter(&self) -> bool {
        self.target_filter.is_some()
    }

    /// Module names given as the `requires` target filter.
    pub fn requires_filter(&self) -> &BTreeSet<String> {
        &self.requires
    }

    pub fn find_jdk_internals(&self) -> bool {
        self.find_jdk_internals
    }

    pub fn find_missing_deps(&self) -> bool {
        self.find_missing_deps
    }

    /// Whether an origin class is selected by the include pattern.
    pub fn matches(&self, cn: &str) -> bool {
        self.include_pattern
            .as_ref()
            .is_none_or(|pattern| pattern.is_match(cn))
    }

    /// Whether the archive holds a class selected by the include pattern;
    /// without one, whether a target filter is set.
    pub fn matches_archive(&self, archive: &Archive) -> bool {
        match &self.include_pattern {
            Some(pattern) => archive
                .source()
                .is_some_and(|s| s.class_names().iter().any(|cn| pattern.is_match(cn))),
            None => self.has_target_filter(),
        }
    }

    /// System modules are analyzed only when asked for and matching the
    /// include pattern.
    pub fn include(&self, archive: &Archive) -> bool {
        if !archive.is_system_module() {
            return true;
        }
        self.include_system_modules && self.include_pattern.is_some() && self.matches_archive(archive)
    }

    /// Edge-level filter applied while parsing.
    pub fn accepts(&self, dep: &Dependency) -> bool {
        if dep.origin == dep.target {
            return false;
        }
        let target_package = dep.target.package_name();
        if self.filter_same_package && dep.origin.package_name() == target_package {
            return false;
        }
        if self
            .filter_pattern
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(target_package))
        {
            return false;
        }
        self.target_filter
            .as_ref()
            .is_none_or(|filter| filter.matches(&dep.target))
    }

    /// Edge-level filter applied once both archives are known.
    pub fn accepts_archives(
        &self,
        _origin: &Location,
        origin_archive: &Archive,
        target: &Location,
        target_archive: &Archive,
    ) -> bool {
        if self.find_jdk_internals {
            return origin_archive != target_archive
                && is_jdk_internal_package(target_archive, target.package_name());
        }
        if self.find_missing_deps {
            return target_archive.is_not_found();
        }
        if self.filter_same_archive {
            return origin_archive != target_archive;
        }
        true
    }
}

fn is_jdk_internal_package(archive: &Archive, pn: &str) -> bool {
    if archive.is_removed_internals() {
        return true;
    }
    archive
        .module()
        .is_some_and(|m: &Module| !m.is_jdk_unsupported() && m.is_jdk() && !m.is_exported(pn))
}
