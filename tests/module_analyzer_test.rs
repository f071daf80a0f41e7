mod common;

use std::sync::Arc;

use common::fixtures::{ModuleChain, configure, module_chain};
use common::mock::{MockClassReader, class_text};
use jdeps::app::module_analyzer::{JAVA_BASE, ModuleAnalyzer, module_info_source};
use jdeps::domain::config::{ConfigOptions, JdepsConfiguration};
use jdeps::domain::error::JdepsError;

fn chain_config(chain: &ModuleChain, extra: Vec<std::path::PathBuf>) -> Arc<JdepsConfiguration> {
    let mut module_path = vec![chain.m1.clone(), chain.m2.clone(), chain.m3.clone()];
    module_path.extend(extra);
    configure(
        ConfigOptions {
            module_path,
            ..Default::default()
        },
        Arc::new(MockClassReader::new()),
    )
    .unwrap()
}

fn requires_of(md: &jdeps::domain::module::ModuleDescriptor) -> Vec<(String, bool)> {
    md.requires
        .iter()
        .filter(|r| r.name != JAVA_BASE)
        .map(|r| (r.name.clone(), r.is_transitive()))
        .collect()
}

#[test]
fn test_requires_transitive_from_exported_api() {
    let chain = module_chain();
    let config = chain_config(&chain, vec![]);
    let analyzer = ModuleAnalyzer::new(config, &["m2".to_string()]).unwrap();
    let deps = analyzer.run().unwrap();

    assert_eq!(deps.len(), 1);
    assert!(deps[0].requires_transitive().contains("m3"));
    assert!(deps[0].requires().contains("m3"));

    let report = analyzer.check(&deps[0]).unwrap();
    assert!(report.is_consistent());
    assert!(report.unused_requires.is_empty());
    assert_eq!(requires_of(&report.suggested), vec![("m3".to_string(), true)]);
}

#[test]
fn test_check_consistent_descriptor() {
    let chain = module_chain();
    let config = chain_config(&chain, vec![]);
    let analyzer = ModuleAnalyzer::new(config, &["m1".to_string()]).unwrap();
    let deps = analyzer.run().unwrap();
    let report = analyzer.check(&deps[0]).unwrap();

    assert!(report.is_consistent());
    assert!(report.is_reduced());
    assert!(report.missing.is_empty());
    assert_eq!(requires_of(&report.reduced), vec![("m2".to_string(), false)]);
    // java.base is always mandated
    assert!(report.suggested.requires.iter().any(|r| r.name == JAVA_BASE && r.is_mandated()));
}

#[test]
fn test_check_reports_unused_and_missing() {
    let chain = module_chain();
    let extra = chain.workspace.module_dir(
        "m4",
        "module m4\nrequires m2\nrequires m3\nexports p4\n",
        &[("p4.D", class_text("p4.D", true, &["p2.B", "gone.Missing"], &[]))],
    );
    let config = chain_config(&chain, vec![extra]);
    let analyzer = ModuleAnalyzer::new(config, &["m4".to_string()]).unwrap();
    let deps = analyzer.run().unwrap();
    let report = analyzer.check(&deps[0]).unwrap();

    assert!(!report.is_consistent());
    assert_eq!(report.unused_requires.iter().collect::<Vec<_>>(), vec!["m3"]);
    assert_eq!(report.missing.iter().collect::<Vec<_>>(), vec!["gone.Missing"]);
}

#[test]
fn test_generate_for_automatic_module() {
    let chain = module_chain();
    let jar = chain.workspace.class_jar(
        "auto-lib-1.0.jar",
        &[("auto.p.X", class_text("auto.p.X", true, &["p2.B"], &[]))],
    );
    let config = chain_config(&chain, vec![jar]);
    assert!(config.find_module("auto.lib").unwrap().module().unwrap().is_automatic());

    let analyzer = ModuleAnalyzer::new(config, &["auto.lib".to_string()]).unwrap();
    let deps = analyzer.run().unwrap();
    let descriptor = analyzer.generate(&deps[0]).unwrap();

    assert_eq!(
        module_info_source(&descriptor),
        "module auto.lib {\n    requires m2;\n\n    exports auto.p;\n}\n"
    );
}

#[test]
fn test_unknown_module_rejected() {
    let chain = module_chain();
    let config = chain_config(&chain, vec![]);
    let err = ModuleAnalyzer::new(config, &["nope".to_string()]).err().unwrap();
    assert!(matches!(err.downcast_ref::<JdepsError>(), Some(JdepsError::ModuleNotFound(name)) if name == "nope"));
}

#[test]
fn test_default_roots_are_application_modules() {
    let chain = module_chain();
    let config = chain_config(&chain, vec![]);
    let analyzer = ModuleAnalyzer::new(config, &[]).unwrap();
    let names: Vec<&str> = analyzer.roots().iter().map(|a| a.name()).collect();
    assert_eq!(names, vec!["m1", "m2", "m3"]);
}
