mod common;

use std::sync::Arc;

use common::fixtures::{ModuleChain, configure, module_chain};
use common::mock::MockClassReader;
use jdeps::app::module_graph::ModuleGraphBuilder;
use jdeps::domain::config::{ConfigOptions, JdepsConfiguration};

fn s(name: &str) -> String {
    name.to_string()
}

fn chain_config(chain: &ModuleChain) -> Arc<JdepsConfiguration> {
    configure(
        ConfigOptions {
            inputs: vec![chain.m1.clone()],
            module_path: vec![chain.m2.clone(), chain.m3.clone()],
            ..Default::default()
        },
        Arc::new(MockClassReader::new()),
    )
    .unwrap()
}

#[test]
fn test_build_adds_requires_transitive_edges() {
    let chain = module_chain();
    let config = chain_config(&chain);
    let mut builder = ModuleGraphBuilder::new(&config);
    builder.add_edge("m1", "m2");
    let graph = builder.build();

    assert!(graph.contains(&s("m3")));
    assert!(graph.is_adjacent(&s("m1"), &s("m2")));
    assert!(graph.is_adjacent(&s("m2"), &s("m3")));
    assert!(!graph.is_adjacent(&s("m1"), &s("m3")));
}

#[test]
fn test_build_plain_has_no_implied_edges() {
    let chain = module_chain();
    let config = chain_config(&chain);
    let mut builder = ModuleGraphBuilder::new(&config);
    builder.add_edge("m1", "m2");
    let graph = builder.build_plain();

    assert!(!graph.contains(&s("m3")));
    assert_eq!(graph.edge_count(), 1);
}

#[test]
fn test_reduced_drops_edge_implied_by_transitive_requires() {
    let chain = module_chain();
    let config = chain_config(&chain);
    let mut builder = ModuleGraphBuilder::new(&config);
    builder.add_edge("m1", "m2").add_edge("m1", "m3");
    let graph = builder.reduced();

    assert!(graph.contains(&s("m3")));
    assert!(graph.is_adjacent(&s("m1"), &s("m2")));
    assert!(graph.is_adjacent(&s("m2"), &s("m3")));
    assert!(!graph.is_adjacent(&s("m1"), &s("m3")));
    assert_eq!(graph.ordered_nodes().unwrap(), vec![s("m1"), s("m2"), s("m3")]);
}

#[test]
fn test_unknown_module_is_a_leaf() {
    let chain = module_chain();
    let config = chain_config(&chain);
    let mut builder = ModuleGraphBuilder::new(&config);
    builder.add_module("m1").add_edge("m1", "elsewhere");
    let graph = builder.build();

    assert!(graph.contains(&s("elsewhere")));
    assert!(graph.adjacent_nodes(&s("elsewhere")).is_none_or(|adj| adj.is_empty()));
}
