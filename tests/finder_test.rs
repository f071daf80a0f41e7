mod common;

use std::sync::Arc;

use common::fixtures::{Workspace, configure};
use common::mock::{MockClassReader, class_text};
use jdeps::domain::archive::ArchiveRef;
use jdeps::domain::config::{ConfigOptions, JdepsConfiguration};
use jdeps::domain::filter::JdepsFilter;
use jdeps::domain::finder::{DependencyFinder, ParseMode};
use jdeps::domain::location::Location;

struct Setup {
    _workspace: Workspace,
    reader: Arc<MockClassReader>,
    config: Arc<JdepsConfiguration>,
}

fn setup() -> Setup {
    let workspace = Workspace::new();
    let app = workspace.class_dir(
        "app",
        &[
            ("a.Main", class_text("a.Main", true, &["b.Lib", "a.Helper"], &[])),
            ("a.Helper", class_text("a.Helper", false, &["java.lang.Object"], &[])),
        ],
    );
    let lib = workspace.class_jar("lib.jar", &[("b.Lib", class_text("b.Lib", true, &[], &["c.Missing"]))]);
    let reader = Arc::new(MockClassReader::new());
    let config = configure(
        ConfigOptions {
            inputs: vec![app],
            class_path: vec![lib],
            ..Default::default()
        },
        Arc::clone(&reader),
    )
    .unwrap();
    Setup {
        _workspace: workspace,
        reader,
        config,
    }
}

fn finder(config: &Arc<JdepsConfiguration>) -> DependencyFinder {
    DependencyFinder::new(Arc::clone(config), Arc::new(JdepsFilter::default_filter())).unwrap()
}

fn lib_archive(config: &JdepsConfiguration) -> ArchiveRef {
    config.class_path_archives()[0].clone()
}

#[test]
fn test_parse_collects_accepted_targets() {
    let s = setup();
    let finder = finder(&s.config);
    let targets = finder.parse(s.config.initial_archives()).unwrap();

    assert!(targets.contains(&Location::new("b.Lib")));
    assert!(targets.contains(&Location::new("java.lang.Object")));
    // same-package edge dropped by the default filter
    assert!(!targets.contains(&Location::new("a.Helper")));
    assert!(finder.is_parsed(&Location::new("a.Main")));
    assert!(finder.is_parsed(&Location::new("a.Helper")));
}

#[test]
fn test_parse_is_idempotent() {
    let s = setup();
    let finder = finder(&s.config);
    finder.parse(s.config.initial_archives()).unwrap();
    assert_eq!(s.reader.class_reads(), 2);

    let again = finder.parse(s.config.initial_archives()).unwrap();
    assert!(again.is_empty());
    assert_eq!(s.reader.class_reads(), 2);
    assert_eq!(finder.submitted(ParseMode::Class).len(), 1);
}

#[test]
fn test_modes_are_tracked_separately() {
    let s = setup();
    let finder = finder(&s.config);
    finder.parse(s.config.initial_archives()).unwrap();
    finder.parse_exported_apis(s.config.initial_archives()).unwrap();
    assert_eq!(s.reader.class_reads(), 4);
    assert_eq!(finder.parsed_archives().len(), 1);
}

#[test]
fn test_location_to_archive() {
    let s = setup();
    let finder = finder(&s.config);
    finder.parse(s.config.initial_archives()).unwrap();

    let app = &s.config.initial_archives()[0];
    assert_eq!(&finder.location_to_archive(&Location::new("a.Main")), app);
    // unparsed but defined on the class path
    assert_eq!(finder.location_to_archive(&Location::new("b.Lib")), lib_archive(&s.config));
    assert!(finder.location_to_archive(&Location::new("x.Unknown")).is_not_found());
}

#[test]
fn test_parse_single_class() {
    let s = setup();
    let finder = finder(&s.config);
    let lib = lib_archive(&s.config);

    let targets = finder.parse_class(&lib, &Location::new("b.Lib")).unwrap();
    assert_eq!(targets.len(), 1);
    assert!(targets.contains(&Location::new("c.Missing")));
    assert!(finder.is_parsed(&Location::new("b.Lib")));

    let none = finder.parse_class(&lib, &Location::new("b.Absent")).unwrap();
    assert!(none.is_empty());
}

#[test]
fn test_dependences_by_archive() {
    let s = setup();
    let finder = finder(&s.config);
    finder.parse(s.config.initial_archives()).unwrap();

    let app = &s.config.initial_archives()[0];
    let deps = finder.dependences();
    let of_app = deps.get(app).unwrap();
    assert!(of_app.contains(&lib_archive(&s.config)));
    assert!(of_app.iter().any(|a| a.is_not_found()));
    assert!(!of_app.contains(app));
}

#[test]
fn test_corrupt_class_is_skipped() {
    let workspace = Workspace::new();
    let dir = workspace.class_dir(
        "mixed",
        &[
            ("a.Good", class_text("a.Good", true, &["b.X"], &[])),
            ("a.Bad", "corrupt".to_string()),
        ],
    );
    let config = configure(
        ConfigOptions {
            inputs: vec![dir],
            ..Default::default()
        },
        Arc::new(MockClassReader::new()),
    )
    .unwrap();
    let finder = finder(&config);
    let targets = finder.parse(config.initial_archives()).unwrap();

    assert!(targets.contains(&Location::new("b.X")));
    let archive = &config.initial_archives()[0];
    assert_eq!(archive.source().unwrap().skipped_entries().len(), 1);
    assert!(!finder.is_parsed(&Location::new("a.Bad")));
}

#[test]
fn test_exported_api_mode() {
    let workspace = Workspace::new();
    let module = workspace.module_dir(
        "m",
        "module m\nexports p\n",
        &[
            ("p.Pub", class_text("p.Pub", true, &["r.Y"], &["q.X"])),
            ("p.Hidden", class_text("p.Hidden", false, &[], &["s.Z"])),
            ("i.Impl", class_text("i.Impl", true, &[], &["t.W"])),
        ],
    );
    let config = configure(
        ConfigOptions {
            inputs: vec![module],
            ..Default::default()
        },
        Arc::new(MockClassReader::new()),
    )
    .unwrap();
    let finder = finder(&config);
    let targets = finder.parse_exported_apis(config.initial_archives()).unwrap();

    assert_eq!(targets.len(), 1);
    assert!(targets.contains(&Location::new("q.X")));
}

#[test]
fn test_workers_configured() {
    let workspace = Workspace::new();
    let dir = workspace.class_dir("c", &[("a.A", class_text("a.A", true, &["b.B"], &[]))]);
    let config = configure(
        ConfigOptions {
            inputs: vec![dir],
            workers: Some(4),
            ..Default::default()
        },
        Arc::new(MockClassReader::new()),
    )
    .unwrap();
    assert_eq!(config.workers(), 4);
    let finder = finder(&config);
    assert_eq!(finder.parse(config.initial_archives()).unwrap().len(), 1);
}
