use crate::adapters::classfile::ClassFileReader;
use crate::adapters::resolver::RequiresResolver;
use crate::app::deps::DepsAnalyzer;
use crate::app::dto::{AnalysisReportDto, InverseReportDto};
use crate::app::inverse::InverseDepsAnalyzer;
use crate::app::module_analyzer::{CheckReport, ModuleAnalyzer, module_info_source};
use crate::domain::analyzer::Granularity;
use crate::domain::archive::ArchiveRef;
use crate::domain::config::{ConfigOptions, JdepsConfiguration};
use crate::domain::filter::{FilterOptions, JdepsFilter};
use anyhow::{Context as _, Result, bail};
use clap::{Parser, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const ALL_SYSTEM: &str = "ALL-SYSTEM";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FilterLevel {
    /// Keep every dependence.
    None,
    /// Drop dependences within the same package.
    Package,
    /// Drop dependences within the same archive.
    Archive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GranularityArg {
    Summary,
    Module,
    Package,
    Class,
    Verbose,
}

impl From<GranularityArg> for Granularity {
    fn from(value: GranularityArg) -> Self {
        match value {
            GranularityArg::Summary => Granularity::Summary,
            GranularityArg::Module => Granularity::Module,
            GranularityArg::Package => Granularity::Package,
            GranularityArg::Class => Granularity::Class,
            GranularityArg::Verbose => Granularity::Verbose,
        }
    }
}

/// Java class dependency analyzer.
#[derive(Debug, Clone, Parser)]
#[command(name = "jdeps", version, about)]
pub struct Args {
    /// Class files, directories or jar files to analyze.
    pub inputs: Vec<PathBuf>,

    /// Where to find class files, separated by the platform path separator.
    #[arg(long = "class-path", visible_alias = "cp", value_name = "PATH")]
    pub class_path: Vec<String>,

    /// Where to find application modules.
    #[arg(long = "module-path", value_name = "PATH")]
    pub module_path: Vec<String>,

    /// Exploded runtime image holding the system modules.
    #[arg(long, value_name = "DIR")]
    pub system: Option<PathBuf>,

    /// Root module for the analysis.
    #[arg(short = 'm', long = "module", value_name = "NAME")]
    pub modules: Vec<String>,

    /// Additional root modules; ALL-SYSTEM adds every system module.
    #[arg(long = "add-modules", value_delimiter = ',', value_name = "NAME")]
    pub add_modules: Vec<String>,

    #[arg(long, value_enum, default_value = "package")]
    pub granularity: GranularityArg,

    /// Summary output only.
    #[arg(short = 's', long, conflicts_with = "verbose")]
    pub summary: bool,

    /// Class-level output including dependences within the same package.
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Dependences on the given packages only; `p.*` includes subpackages.
    #[arg(short = 'p', long = "package", value_name = "PKG")]
    pub packages: Vec<String>,

    /// Dependences on classes matching the pattern only.
    #[arg(short = 'e', long, value_name = "REGEX")]
    pub regex: Option<String>,

    /// Dependences on the named modules only.
    #[arg(long = "require", value_name = "NAME")]
    pub requires: Vec<String>,

    /// Drop dependences on packages matching the pattern.
    #[arg(short = 'f', long = "filter", value_name = "REGEX")]
    pub filter_pattern: Option<String>,

    #[arg(long = "filter-level", value_enum, default_value = "package")]
    pub filter_level: FilterLevel,

    /// Restrict the analysis to classes matching the pattern.
    #[arg(long, value_name = "REGEX")]
    pub include: Option<String>,

    /// Also analyze matching system modules.
    #[arg(long = "include-system-modules")]
    pub include_system_modules: bool,

    /// Dependences of the exported API only.
    #[arg(long = "api-only")]
    pub api_only: bool,

    /// Dependences on JDK internal APIs only.
    #[arg(long = "jdk-internals", conflicts_with = "missing_deps")]
    pub jdk_internals: bool,

    /// Dependences that cannot be resolved only.
    #[arg(long = "missing-deps")]
    pub missing_deps: bool,

    /// Follow dependences recursively.
    #[arg(short = 'R', long)]
    pub recursive: bool,

    /// Follow dependences this many levels; 0 is unbounded.
    #[arg(long, value_name = "N", conflicts_with = "recursive")]
    pub depth: Option<i32>,

    /// Follow dependences by whole archives, as a compiler would see them.
    #[arg(long = "compile-time")]
    pub compile_time: bool,

    /// Paths from the archives matching the filter back to their dependents.
    #[arg(short = 'I', long)]
    pub inverse: bool,

    /// Check the descriptors of the named modules.
    #[arg(long, value_delimiter = ',', value_name = "NAME")]
    pub check: Vec<String>,

    /// Write module-info.java for the inputs into the directory.
    #[arg(long = "generate-module-info", value_name = "DIR")]
    pub generate_module_info: Option<PathBuf>,

    /// Release of multi-release jars to analyze.
    #[arg(long = "multi-release", value_name = "VERSION")]
    pub multi_release: Option<String>,

    /// Parser threads.
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,
}

impl Args {
    fn granularity(&self) -> Granularity {
        if self.summary {
            Granularity::Summary
        } else if self.verbose {
            Granularity::Verbose
        } else if self.jdk_internals && self.granularity == GranularityArg::Package {
            Granularity::Class
        } else {
            self.granularity.into()
        }
    }

    fn max_depth(&self) -> i32 {
        if self.recursive || self.compile_time {
            0
        } else {
            self.depth.unwrap_or(1)
        }
    }

    fn release(&self) -> Result<Option<u32>> {
        match self.multi_release.as_deref() {
            None => Ok(None),
            Some("base") => Ok(Some(8)),
            Some(v) => v
                .parse::<u32>()
                .map(Some)
                .with_context(|| format!("invalid --multi-release version: {v}")),
        }
    }

    pub fn config_options(&self) -> Result<ConfigOptions> {
        let split = |entries: &[String]| -> Vec<PathBuf> {
            entries.iter().flat_map(std::env::split_paths).collect()
        };
        let mut inputs = self.inputs.clone();
        let mut module_path = split(&self.module_path);
        if self.generate_module_info.is_some() {
            module_path.append(&mut inputs);
        }
        let mut root_modules: Vec<String> = self.modules.clone();
        root_modules.extend(self.add_modules.iter().filter(|m| *m != ALL_SYSTEM).cloned());
        root_modules.extend(self.check.iter().cloned());
        root_modules.extend(self.requires.iter().cloned());
        Ok(ConfigOptions {
            inputs,
            class_path: split(&self.class_path),
            module_path,
            system_modules: self.system.clone(),
            root_modules,
            add_all_system_modules: self.add_modules.iter().any(|m| m == ALL_SYSTEM),
            multi_release: self.release()?,
            workers: self.workers,
        })
    }

    pub fn filter(&self, config: &JdepsConfiguration) -> Result<JdepsFilter> {
        let mut options = FilterOptions {
            include_pattern: self.include.clone(),
            include_system_modules: self.include_system_modules,
            packages: self.packages.clone(),
            regex: self.regex.clone(),
            filter_same_package: self.filter_level == FilterLevel::Package && !self.verbose,
            filter_same_archive: self.filter_level == FilterLevel::Archive,
            filter_pattern: self.filter_pattern.clone(),
            find_jdk_internals: self.jdk_internals,
            find_missing_deps: self.missing_deps,
            ..FilterOptions::default()
        };
        for name in &self.requires {
            let packages = config.module_packages(name);
            options = options.require_module(name.clone(), packages);
        }
        options.build().context("invalid filter options")
    }
}

/// Runs the command and writes the result to `out`. Returns false when a
/// checked module descriptor does not match the analysis.
pub fn run<W: Write>(args: &Args, out: &mut W) -> Result<bool> {
    if args.inputs.is_empty()
        && args.modules.is_empty()
        && args.check.is_empty()
        && args.add_modules.is_empty()
    {
        bail!("no input files");
    }
    if args.inverse && args.packages.is_empty() && args.regex.is_none() && args.requires.is_empty() {
        bail!("--inverse requires --package, --regex or --require");
    }

    let config = args
        .config_options()?
        .build(Arc::new(ClassFileReader), &RequiresResolver)
        .context("failed to configure analysis")?;
    let config = Arc::new(config);

    if !args.check.is_empty() {
        return check_modules(args, config, out);
    }
    if let Some(dir) = &args.generate_module_info {
        return generate_module_info(config, dir, out);
    }

    let filter = Arc::new(args.filter(&config)?);
    if args.inverse {
        return inverse(args, config, filter, out);
    }

    let mut analyzer = DepsAnalyzer::new(config, filter, args.granularity(), args.api_only)?;
    if !analyzer.run(args.compile_time, args.max_depth())? {
        tracing::info!("no dependences found");
    }
    if args.json {
        serde_json::to_writer_pretty(&mut *out, &AnalysisReportDto::from_analysis(&analyzer))?;
        writeln!(out)?;
    } else {
        write_dependences(&analyzer, out)?;
    }
    Ok(true)
}

fn write_dependences<W: Write>(analyzer: &DepsAnalyzer, out: &mut W) -> Result<()> {
    let results = analyzer.analyzer();
    for archive in analyzer.archives() {
        let requires = results.requires(&archive);
        if requires.is_empty() {
            continue;
        }
        for required in &requires {
            writeln!(out, "{} -> {}", archive.name(), required.name())?;
        }
        if results.granularity() == Granularity::Summary {
            continue;
        }
        let mut lines = Vec::new();
        results.visit(
            &archive,
            &mut |origin: &str, _: &ArchiveRef, target: &str, target_archive: &ArchiveRef| {
                lines.push(format!("   {origin:<40} -> {target:<40} {}", describe(target_archive)));
            },
        );
        for line in lines {
            writeln!(out, "{line}")?;
        }
    }
    Ok(())
}

fn describe(archive: &ArchiveRef) -> String {
    match archive.module() {
        Some(m) if m.is_jdk() => format!("{} (JDK)", archive.name()),
        _ => archive.name().to_string(),
    }
}

fn inverse<W: Write>(
    args: &Args,
    config: Arc<JdepsConfiguration>,
    filter: Arc<JdepsFilter>,
    out: &mut W,
) -> Result<bool> {
    let mut analyzer = InverseDepsAnalyzer::new(config, filter, args.granularity(), args.api_only)?;
    analyzer.run()?;
    let paths = analyzer.inverse_dependences()?;
    if args.json {
        let dto = InverseReportDto::new(analyzer.targets(), &paths);
        serde_json::to_writer_pretty(&mut *out, &dto)?;
        writeln!(out)?;
    } else {
        for path in &paths {
            let names: Vec<&str> = path.iter().map(|a| a.name()).collect();
            writeln!(out, "{}", names.join(" <- "))?;
        }
    }
    Ok(true)
}

fn check_modules<W: Write>(args: &Args, config: Arc<JdepsConfiguration>, out: &mut W) -> Result<bool> {
    let analyzer = ModuleAnalyzer::new(config, &args.check)?;
    let reports = analyzer
        .run()?
        .iter()
        .map(|deps| analyzer.check(deps))
        .collect::<Result<Vec<CheckReport>>>()?;
    if args.json {
        serde_json::to_writer_pretty(&mut *out, &reports)?;
        writeln!(out)?;
        return Ok(reports.iter().all(|r| r.is_consistent()));
    }
    for report in &reports {
        writeln!(out, "{}", report.module)?;
        writeln!(out, "  [Module descriptor]")?;
        write_indented(out, &module_info_source(&report.declared))?;
        if !report.is_consistent() {
            writeln!(out, "  [Suggested module descriptor for {}]", report.module)?;
            write_indented(out, &module_info_source(&report.suggested))?;
        }
        if !report.is_reduced() {
            writeln!(out, "  [Transitive reduced graph for {}]", report.module)?;
            write_indented(out, &module_info_source(&report.reduced))?;
        }
        if !report.unused_requires.is_empty() {
            writeln!(out, "  [Unused requires]")?;
            for name in &report.unused_requires {
                writeln!(out, "    {name}")?;
            }
        }
        if !report.missing.is_empty() {
            writeln!(out, "  [Missing dependences]")?;
            for cn in &report.missing {
                writeln!(out, "    {cn}")?;
            }
        }
        if report.is_consistent() && report.unused_requires.is_empty() {
            writeln!(out, "  [No change needed]")?;
        }
    }
    Ok(reports.iter().all(|r| r.is_consistent()))
}

fn write_indented<W: Write>(out: &mut W, text: &str) -> Result<()> {
    for line in text.lines() {
        writeln!(out, "    {line}")?;
    }
    Ok(())
}

fn generate_module_info<W: Write>(
    config: Arc<JdepsConfiguration>,
    dir: &Path,
    out: &mut W,
) -> Result<bool> {
    let analyzer = ModuleAnalyzer::new(config, &[])?;
    let results = analyzer.run()?;
    for deps in &results {
        let descriptor = analyzer.generate(deps)?;
        let module_dir = dir.join(&descriptor.name);
        std::fs::create_dir_all(&module_dir)
            .with_context(|| format!("failed to create {}", module_dir.display()))?;
        let file = module_dir.join("module-info.java");
        std::fs::write(&file, module_info_source(&descriptor))
            .with_context(|| format!("failed to write {}", file.display()))?;
        writeln!(out, "writing to {}", file.display())?;
    }
    Ok(true)
}
