//! Concurrent extraction of class-level dependency edges from archives.

use crate::domain::archive::{Archive, ArchiveRef};
use crate::domain::config::JdepsConfiguration;
use crate::domain::error::JdepsError;
use crate::domain::filter::JdepsFilter;
use crate::domain::location::Location;
use crate::domain::ports::ClassDescriptor;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::{Arc, mpsc};

/// Which edges of a class are extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseMode {
    /// Every referenced class.
    Class,
    /// Public classes of exported packages, surface references only.
    ExportedApi,
}

type TaskResult = Result<HashSet<Location>, JdepsError>;

struct PendingTask {
    archive: ArchiveRef,
    result: mpsc::Receiver<TaskResult>,
}

/// Parses archives on a fixed-size worker pool and indexes every parsed
/// class by the archive that defines it.
///
/// Each archive is parsed at most once per [`ParseMode`]; the
/// `Location -> Archive` index is shared by both modes.
pub struct DependencyFinder {
    config: Arc<JdepsConfiguration>,
    filter: Arc<JdepsFilter>,
    parsed_classes: Arc<DashMap<Location, ArchiveRef>>,
    submitted: Mutex<HashMap<ParseMode, Vec<ArchiveRef>>>,
    tasks: Mutex<VecDeque<PendingTask>>,
    pool: rayon::ThreadPool,
}

impl DependencyFinder {
    pub fn new(config: Arc<JdepsConfiguration>, filter: Arc<JdepsFilter>) -> Result<Self, JdepsError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers())
            .thread_name(|i| format!("jdeps-parser-{i}"))
            .panic_handler(|_| tracing::error!("class parser task panicked"))
            .build()?;
        Ok(Self {
            config,
            filter,
            parsed_classes: Arc::new(DashMap::new()),
            submitted: Mutex::new(HashMap::new()),
            tasks: Mutex::new(VecDeque::new()),
            pool,
        })
    }

    pub fn config(&self) -> &Arc<JdepsConfiguration> {
        &self.config
    }

    pub fn filter(&self) -> &Arc<JdepsFilter> {
        &self.filter
    }

    /// Parses every class of `archives`; returns the accepted targets.
    pub fn parse<'a, I>(&self, archives: I) -> TaskResult
    where
        I: IntoIterator<Item = &'a ArchiveRef>,
    {
        self.parse_in(archives, ParseMode::Class)
    }

    /// Parses the exported API of `archives`.
    pub fn parse_exported_apis<'a, I>(&self, archives: I) -> TaskResult
    where
        I: IntoIterator<Item = &'a ArchiveRef>,
    {
        self.parse_in(archives, ParseMode::ExportedApi)
    }

    pub fn parse_in<'a, I>(&self, archives: I, mode: ParseMode) -> TaskResult
    where
        I: IntoIterator<Item = &'a ArchiveRef>,
    {
        for archive in archives {
            self.submit(archive, mode);
        }
        self.wait_for_tasks_completed()
    }

    fn submit(&self, archive: &ArchiveRef, mode: ParseMode) {
        {
            let mut submitted = self.submitted.lock();
            let archives = submitted.entry(mode).or_default();
            if archives.contains(archive) {
                return;
            }
            archives.push(Arc::clone(archive));
        }
        tracing::debug!("parsing {} ({:?}) {}", archive.name(), mode, archive.path_name());

        let (tx, rx) = mpsc::channel();
        let task_archive = Arc::clone(archive);
        let config = Arc::clone(&self.config);
        let filter = Arc::clone(&self.filter);
        let parsed_classes = Arc::clone(&self.parsed_classes);
        self.pool.spawn(move || {
            let result = parse_archive(&task_archive, &config, &filter, &parsed_classes, mode);
            // The receiver only goes away if the finder was dropped mid-run.
            let _ = tx.send(result);
        });
        self.tasks.lock().push_back(PendingTask {
            archive: Arc::clone(archive),
            result: rx,
        });
    }

    /// Join barrier: drains every pending task and unions their targets.
    fn wait_for_tasks_completed(&self) -> TaskResult {
        let mut targets = HashSet::new();
        let mut first_error = None;
        loop {
            let Some(task) = self.tasks.lock().pop_front() else {
                break;
            };
            let outcome = task.result.recv().unwrap_or_else(|_| {
                Err(JdepsError::TaskAborted {
                    archive: task.archive.name().to_string(),
                })
            });
            match outcome {
                Ok(found) => targets.extend(found),
                Err(err) => {
                    tracing::error!("{}: {err}", task.archive.name());
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(targets),
        }
    }

    /// Parses the single class `name` of `archive` on the calling thread.
    pub fn parse_class(&self, archive: &ArchiveRef, name: &Location) -> TaskResult {
        self.parse_one(archive, name, ParseMode::Class)
    }

    pub fn parse_exported_api(&self, archive: &ArchiveRef, name: &Location) -> TaskResult {
        self.parse_one(archive, name, ParseMode::ExportedApi)
    }

    fn parse_one(&self, archive: &ArchiveRef, name: &Location, mode: ParseMode) -> TaskResult {
        let Some(source) = archive.source() else {
            return Ok(HashSet::new());
        };
        match source.find_class(self.config.reader(), name.name()) {
            Some(descriptor) => Ok(process_class(
                archive,
                &descriptor,
                &self.filter,
                &self.parsed_classes,
                mode,
            )),
            None => {
                tracing::debug!("{} does not contain {name}", archive.name());
                Ok(HashSet::new())
            }
        }
    }

    /// Archive defining `location`; never fails, unresolved classes map to
    /// the "not found" archive.
    pub fn location_to_archive(&self, location: &Location) -> ArchiveRef {
        if let Some(archive) = self.parsed_classes.get(location) {
            return Arc::clone(archive.value());
        }
        self.config
            .find_class(location)
            .unwrap_or_else(Archive::not_found)
    }

    pub fn is_parsed(&self, location: &Location) -> bool {
        self.parsed_classes.contains_key(location)
    }

    /// Snapshot of the `Location -> Archive` index.
    pub fn location_index(&self) -> HashMap<Location, ArchiveRef> {
        self.parsed_classes
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect()
    }

    /// Archives submitted in `mode`, in submission order.
    pub fn submitted(&self, mode: ParseMode) -> Vec<ArchiveRef> {
        self.submitted.lock().get(&mode).cloned().unwrap_or_default()
    }

    /// Every archive submitted in any mode, each once.
    pub fn parsed_archives(&self) -> Vec<ArchiveRef> {
        let submitted = self.submitted.lock();
        let mut seen = HashSet::new();
        let mut archives = Vec::new();
        for mode in [ParseMode::Class, ParseMode::ExportedApi] {
            for archive in submitted.get(&mode).into_iter().flatten() {
                if seen.insert(Arc::clone(archive)) {
                    archives.push(Arc::clone(archive));
                }
            }
        }
        archives
    }

    /// Archives that the classes of `source` depend on, excluding itself.
    pub fn archive_dependences(&self, source: &ArchiveRef) -> BTreeSet<ArchiveRef> {
        source
            .dependencies()
            .iter()
            .map(|loc| self.location_to_archive(loc))
            .filter(|a| a != source)
            .collect()
    }

    /// For each parsed, non-empty archive the archives it depends on.
    pub fn dependences(&self) -> BTreeMap<ArchiveRef, BTreeSet<ArchiveRef>> {
        self.parsed_archives()
            .into_iter()
            .filter(|a| !a.is_empty())
            .filter_map(|source| {
                let deps = self.archive_dependences(&source);
                (!deps.is_empty()).then_some((source, deps))
            })
            .collect()
    }
}

fn parse_archive(
    archive: &ArchiveRef,
    config: &JdepsConfiguration,
    filter: &JdepsFilter,
    parsed_classes: &DashMap<Location, ArchiveRef>,
    mode: ParseMode,
) -> TaskResult {
    let mut targets = HashSet::new();
    let Some(source) = archive.source() else {
        return Ok(targets);
    };
    source.for_each_class(config.reader(), |descriptor| {
        targets.extend(process_class(archive, &descriptor, filter, parsed_classes, mode));
    })?;
    Ok(targets)
}

fn accepts_source(archive: &Archive, descriptor: &ClassDescriptor, mode: ParseMode) -> bool {
    match mode {
        ParseMode::Class => true,
        ParseMode::ExportedApi => {
            descriptor.access_flags.is_public()
                && archive.is_exported(descriptor.location().package_name())
        }
    }
}

fn process_class(
    archive: &ArchiveRef,
    descriptor: &ClassDescriptor,
    filter: &JdepsFilter,
    parsed_classes: &DashMap<Location, ArchiveRef>,
    mode: ParseMode,
) -> HashSet<Location> {
    let mut targets = HashSet::new();
    if descriptor.access_flags.is_module()
        || !accepts_source(archive, descriptor, mode)
        || !filter.matches(descriptor.location().name())
    {
        return targets;
    }

    let origin = descriptor.location();
    archive.add_class(origin.clone());
    parsed_classes
        .entry(origin.clone())
        .or_insert_with(|| Arc::clone(archive));
    for dep in descriptor.dependencies(mode) {
        if filter.accepts(&dep) {
            archive.add_dependency(dep.origin, dep.target.clone());
            targets.insert(dep.target);
        }
    }
    targets
}
