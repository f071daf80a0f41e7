use crate::app::deps::DepsAnalyzer;
use crate::app::inverse::InversePath;
use crate::domain::analyzer::Granularity;
use crate::domain::archive::ArchiveRef;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependenceDto {
    pub origin: String,
    pub origin_archive: String,
    pub target: String,
    pub target_archive: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveReportDto {
    pub name: String,
    pub path: String,
    /// Module name, absent for class path archives.
    pub module: Option<String>,
    pub requires: Vec<String>,
    pub dependences: Vec<DependenceDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReportDto {
    pub granularity: Granularity,
    pub archives: Vec<ArchiveReportDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InverseReportDto {
    pub targets: Vec<String>,
    pub paths: Vec<Vec<String>>,
}

impl AnalysisReportDto {
    pub fn from_analysis(deps: &DepsAnalyzer) -> Self {
        let analyzer = deps.analyzer();
        let archives = deps
            .archives()
            .into_iter()
            .map(|archive| {
                let mut dependences = Vec::new();
                analyzer.visit(
                    &archive,
                    &mut |origin: &str, origin_archive: &ArchiveRef, target: &str, target_archive: &ArchiveRef| {
                        dependences.push(DependenceDto {
                            origin: origin.to_string(),
                            origin_archive: origin_archive.name().to_string(),
                            target: target.to_string(),
                            target_archive: target_archive.name().to_string(),
                        });
                    },
                );
                ArchiveReportDto {
                    name: archive.name().to_string(),
                    path: archive.path_name(),
                    module: archive.module().map(|m| m.name().to_string()),
                    requires: analyzer
                        .requires(&archive)
                        .iter()
                        .map(|a| a.name().to_string())
                        .collect(),
                    dependences,
                }
            })
            .collect();
        Self {
            granularity: analyzer.granularity(),
            archives,
        }
    }
}

impl InverseReportDto {
    pub fn new<'a, I, P>(targets: I, paths: P) -> Self
    where
        I: IntoIterator<Item = &'a ArchiveRef>,
        P: IntoIterator<Item = &'a InversePath>,
    {
        Self {
            targets: targets.into_iter().map(|a| a.name().to_string()).collect(),
            paths: paths
                .into_iter()
                .map(|p| p.iter().map(|a| a.name().to_string()).collect())
                .collect(),
        }
    }
}
