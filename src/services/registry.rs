use serde::Serialize;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{ProcstatError, Result};
use crate::models::{BoundPid, ConfigTable, MetricInstance, MetricType, Namespace, ProcessInfo, SourceMode};
use crate::services::catalog::NamespaceCatalog;
use crate::services::process_checker::PidSearch;
use crate::services::process_spec::ProcessSpec;
use crate::services::stats_collector::{ProcessHandle, ProcessStatsProvider};

/// A PID bound to a live stats handle.
pub struct ResolvedProcess {
    pub pid: i32,
    pub display_name: String,
    handle: Box<dyn ProcessHandle>,
}

/// A spec (or one of its PIDs) that was skipped during a collection pass.
#[derive(Debug, Clone, Serialize)]
pub struct SpecFailure {
    pub spec: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<i32>,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct Collection {
    pub metrics: Vec<MetricInstance>,
    pub failures: Vec<SpecFailure>,
}

/// Configured specs plus the cache of processes they resolved to.
pub struct ProcessRegistry {
    initialized: bool,
    default_mode: SourceMode,
    specs: Vec<ProcessSpec>,
    cache: HashMap<i32, ResolvedProcess>,
    provider: Box<dyn ProcessStatsProvider>,
    search: Box<dyn PidSearch>,
}

impl ProcessRegistry {
    pub fn new(provider: Box<dyn ProcessStatsProvider>, search: Box<dyn PidSearch>) -> Self {
        Self {
            initialized: false,
            default_mode: SourceMode::File,
            specs: Vec::new(),
            cache: HashMap::new(),
            provider,
            search,
        }
    }

    /// Mode used when the config table carries no `mode` key.
    pub fn with_default_mode(mut self, mode: SourceMode) -> Self {
        self.default_mode = mode;
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn specs(&self) -> &[ProcessSpec] {
        &self.specs
    }

    pub fn cached_pids(&self) -> Vec<i32> {
        let mut pids: Vec<i32> = self.cache.keys().copied().collect();
        pids.sort();
        pids
    }

    /// Builds the specs from the `files` option. Applied once; later calls are
    /// ignored even if the table differs.
    pub fn configure(&mut self, cfg: &ConfigTable) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        let files = cfg
            .get("files")
            .and_then(|v| v.as_str())
            .ok_or(ProcstatError::ConfigMissingFiles)?;

        let mode = match cfg.get("mode") {
            None => self.default_mode,
            Some(value) => value
                .as_str()
                .ok_or_else(|| ProcstatError::InvalidConfig(format!("mode must be a string, got {}", value)))?
                .parse::<SourceMode>()
                .map_err(ProcstatError::InvalidConfig)?,
        };

        self.specs = files
            .split(',')
            .filter_map(|entry| ProcessSpec::parse(entry, mode))
            .collect();
        self.initialized = true;

        log::info!("Configured {} process spec(s) in {:?} mode", self.specs.len(), mode);
        for spec in &self.specs {
            log::debug!("  - {} (alias: {:?})", spec.source(), spec.alias());
        }
        Ok(())
    }

    pub fn describe_metric_types(&self) -> Vec<MetricType> {
        NamespaceCatalog::metric_types()
    }

    /// Samples every configured process and answers the requested namespaces.
    ///
    /// Failures are recorded per spec and never abort the pass.
    pub fn collect(&mut self, requested: &[Namespace]) -> Collection {
        let mut collection = Collection::default();
        let Self {
            specs,
            cache,
            provider,
            search,
            ..
        } = self;

        for spec in specs.iter_mut() {
            let pids = match spec.resolve(&**search) {
                Ok(pids) => pids,
                Err(e) => {
                    spec.mark_failed();
                    record_failure(&mut collection, spec, None, e);
                    continue;
                }
            };

            for pid in pids {
                if !cache.contains_key(&pid) {
                    match provider.bind(pid) {
                        Ok(handle) => {
                            log::info!("Bound pid {} for '{}'", pid, spec.source());
                            cache.insert(
                                pid,
                                ResolvedProcess {
                                    pid,
                                    display_name: spec.display_name().to_string(),
                                    handle,
                                },
                            );
                        }
                        Err(e) => {
                            spec.mark_failed();
                            record_failure(&mut collection, spec, Some(pid), e);
                            continue;
                        }
                    }
                }
                let Some(resolved) = cache.get_mut(&pid) else {
                    continue;
                };

                let display_name = match spec.alias() {
                    Some(alias) => alias.to_string(),
                    None => match resolved.handle.name() {
                        Ok(name) => name,
                        Err(e) => {
                            spec.mark_failed();
                            cache.remove(&pid);
                            record_failure(&mut collection, spec, Some(pid), e);
                            continue;
                        }
                    },
                };
                resolved.display_name = display_name;

                let fields = match resolved.handle.sample() {
                    Ok(fields) => fields,
                    Err(e) => {
                        spec.mark_failed();
                        cache.remove(&pid);
                        record_failure(&mut collection, spec, Some(pid), e);
                        continue;
                    }
                };

                let timestamp = now_millis();
                for ns in requested {
                    if !NamespaceCatalog::matches(ns, &resolved.display_name) {
                        continue;
                    }
                    let Some(value) = fields.get(ns.field()) else {
                        continue;
                    };
                    collection.metrics.push(MetricInstance {
                        namespace: NamespaceCatalog::bind(ns, &resolved.display_name),
                        value: *value,
                        pid,
                        timestamp,
                    });
                }
            }
        }

        collection
    }

    /// Snapshot of the specs and the processes they are bound to.
    pub fn processes(&self) -> Vec<ProcessInfo> {
        self.specs
            .iter()
            .map(|spec| {
                let pids = spec
                    .cached_pids()
                    .iter()
                    .map(|&pid| BoundPid {
                        pid,
                        name: self.cache.get(&pid).map(|p| p.display_name.clone()),
                    })
                    .collect();
                ProcessInfo {
                    source: spec.source().to_string(),
                    mode: spec.source().mode(),
                    alias: spec.alias().map(str::to_string),
                    failed: spec.is_failed(),
                    pids,
                }
            })
            .collect()
    }
}

fn record_failure(collection: &mut Collection, spec: &ProcessSpec, pid: Option<i32>, err: ProcstatError) {
    match pid {
        Some(pid) => log::warn!("{}, skipping pid {} of '{}'", err, pid, spec.source()),
        None => log::warn!("{}, skipping '{}'", err, spec.source()),
    }
    collection.failures.push(SpecFailure {
        spec: spec.source().to_string(),
        pid,
        error: err.to_string(),
    });
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::stats::{FDS, FIELD_NAMES};
    use crate::models::{ConfigValue, FieldMap, MetricValue};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Clone)]
    struct StubProcess {
        name: String,
        fields: FieldMap,
    }

    fn full_fields() -> FieldMap {
        FIELD_NAMES.iter().map(|f| (*f, MetricValue::Unsigned(1))).collect()
    }

    /// Provider over an in-memory process table that tests can mutate.
    #[derive(Clone, Default)]
    struct StubProvider {
        processes: Arc<Mutex<HashMap<i32, StubProcess>>>,
        binds: Arc<Mutex<Vec<i32>>>,
    }

    impl StubProvider {
        fn spawn(&self, pid: i32, name: &str) {
            self.processes.lock().unwrap().insert(
                pid,
                StubProcess {
                    name: name.to_string(),
                    fields: full_fields(),
                },
            );
        }

        fn kill(&self, pid: i32) {
            self.processes.lock().unwrap().remove(&pid);
        }

        fn drop_field(&self, pid: i32, field: &str) {
            if let Some(p) = self.processes.lock().unwrap().get_mut(&pid) {
                p.fields.remove(field);
            }
        }

        fn binds(&self) -> Vec<i32> {
            self.binds.lock().unwrap().clone()
        }
    }

    struct StubHandle {
        pid: i32,
        processes: Arc<Mutex<HashMap<i32, StubProcess>>>,
    }

    impl ProcessStatsProvider for StubProvider {
        fn bind(&self, pid: i32) -> Result<Box<dyn ProcessHandle>> {
            if !self.processes.lock().unwrap().contains_key(&pid) {
                return Err(ProcstatError::ProcessBindFailed {
                    pid,
                    reason: "no such process".to_string(),
                });
            }
            self.binds.lock().unwrap().push(pid);
            Ok(Box::new(StubHandle {
                pid,
                processes: self.processes.clone(),
            }))
        }
    }

    impl ProcessHandle for StubHandle {
        fn name(&self) -> Result<String> {
            self.processes
                .lock()
                .unwrap()
                .get(&self.pid)
                .map(|p| p.name.clone())
                .ok_or(ProcstatError::ProcessNameUnavailable { pid: self.pid })
        }

        fn sample(&mut self) -> Result<FieldMap> {
            self.processes
                .lock()
                .unwrap()
                .get(&self.pid)
                .map(|p| p.fields.clone())
                .ok_or(ProcstatError::ProcessGone { pid: self.pid })
        }
    }

    struct NoSearch;

    impl PidSearch for NoSearch {
        fn search(&self, pattern: &str) -> Result<Vec<i32>> {
            Err(ProcstatError::PatternSearchFailed {
                pattern: pattern.to_string(),
                reason: "couldn't find pgrep binary".to_string(),
            })
        }
    }

    struct FixedSearch(Vec<i32>);

    impl PidSearch for FixedSearch {
        fn search(&self, _pattern: &str) -> Result<Vec<i32>> {
            Ok(self.0.clone())
        }
    }

    fn files_config(files: &str) -> ConfigTable {
        let mut cfg = ConfigTable::new();
        cfg.insert("files".to_string(), ConfigValue::Str(files.to_string()));
        cfg
    }

    fn write_pid(dir: &TempDir, name: &str, pid: i32) -> String {
        let path = dir.path().join(name);
        std::fs::write(&path, format!("{}\n", pid)).unwrap();
        path.display().to_string()
    }

    fn requests(process: &str) -> Vec<Namespace> {
        FIELD_NAMES.iter().map(|f| Namespace::new(process, f)).collect()
    }

    fn registry(provider: &StubProvider) -> ProcessRegistry {
        ProcessRegistry::new(Box::new(provider.clone()), Box::new(NoSearch))
    }

    #[test]
    fn test_describe_metric_types_ignores_config() {
        let provider = StubProvider::default();
        let mut reg = registry(&provider);
        assert_eq!(reg.describe_metric_types().len(), 15);

        reg.configure(&files_config("/a.pid,/b.pid,/c.pid")).unwrap();
        assert_eq!(reg.describe_metric_types().len(), 15);
    }

    #[test]
    fn test_configure_missing_files() {
        let provider = StubProvider::default();
        let mut reg = registry(&provider);
        assert!(matches!(
            reg.configure(&ConfigTable::new()),
            Err(ProcstatError::ConfigMissingFiles)
        ));
        assert!(!reg.is_initialized());
    }

    #[test]
    fn test_configure_invalid_mode() {
        let provider = StubProvider::default();
        let mut reg = registry(&provider);
        let mut cfg = files_config("/a.pid");
        cfg.insert("mode".to_string(), ConfigValue::Str("socket".to_string()));
        assert!(matches!(reg.configure(&cfg), Err(ProcstatError::InvalidConfig(_))));
    }

    #[test]
    fn test_configure_is_applied_once() {
        let provider = StubProvider::default();
        let mut reg = registry(&provider);
        reg.configure(&files_config("/run/a.pid:alpha")).unwrap();
        reg.configure(&files_config("/run/b.pid:beta,/run/c.pid")).unwrap();

        assert_eq!(reg.specs().len(), 1);
        assert_eq!(reg.specs()[0].display_name(), "alpha");
    }

    #[test]
    fn test_collect_two_aliased_specs() {
        let dir = TempDir::new().unwrap();
        let provider = StubProvider::default();
        provider.spawn(1, "psOne");
        provider.spawn(2, "psTwo");

        let files = format!("{}:alpha,{}:beta", write_pid(&dir, "one.pid", 1), write_pid(&dir, "two.pid", 2));
        let mut reg = registry(&provider);
        reg.configure(&files_config(&files)).unwrap();

        let mut requested = requests("alpha");
        requested.extend(requests("beta"));
        let collection = reg.collect(&requested);

        assert!(collection.failures.is_empty());
        assert_eq!(collection.metrics.len(), 30);

        let namespaces: Vec<String> = collection.metrics.iter().map(|m| m.namespace.to_string()).collect();
        for process in ["alpha", "beta"] {
            for field in FIELD_NAMES {
                assert!(namespaces.contains(&format!("/staples/procfs/procstat/{}/{}", process, field)));
            }
        }
        for metric in &collection.metrics {
            let expected = if metric.pid == 1 { "alpha" } else { "beta" };
            assert_eq!(metric.namespace.process(), expected);
        }

        // spec order first, then request order
        assert_eq!(collection.metrics[0].namespace.process(), "alpha");
        assert_eq!(collection.metrics[0].namespace.field(), FIELD_NAMES[0]);
        assert_eq!(collection.metrics[15].namespace.process(), "beta");
    }

    #[test]
    fn test_collect_wildcard_fans_out() {
        let dir = TempDir::new().unwrap();
        let provider = StubProvider::default();
        provider.spawn(1, "psOne");
        provider.spawn(2, "psTwo");

        let files = format!("{},{}", write_pid(&dir, "one.pid", 1), write_pid(&dir, "two.pid", 2));
        let mut reg = registry(&provider);
        reg.configure(&files_config(&files)).unwrap();

        let collection = reg.collect(&[Namespace::new("*", "memory_rss")]);
        let names: Vec<&str> = collection.metrics.iter().map(|m| m.namespace.process()).collect();
        assert_eq!(names, vec!["psOne", "psTwo"]);
    }

    #[test]
    fn test_collect_skips_unknown_process_and_field() {
        let dir = TempDir::new().unwrap();
        let provider = StubProvider::default();
        provider.spawn(1, "psOne");

        let files = format!("{}:alpha", write_pid(&dir, "one.pid", 1));
        let mut reg = registry(&provider);
        reg.configure(&files_config(&files)).unwrap();

        let collection = reg.collect(&[
            Namespace::new("gamma", "fds"),
            Namespace::new("alpha", "no_such_field"),
            Namespace::new("alpha", "fds"),
        ]);
        assert_eq!(collection.metrics.len(), 1);
        assert_eq!(collection.metrics[0].namespace.to_string(), "/staples/procfs/procstat/alpha/fds");
        assert!(collection.failures.is_empty());
    }

    #[test]
    fn test_collect_missing_field_is_absent() {
        let dir = TempDir::new().unwrap();
        let provider = StubProvider::default();
        provider.spawn(1, "psOne");
        provider.drop_field(1, FDS);

        let files = format!("{}:alpha", write_pid(&dir, "one.pid", 1));
        let mut reg = registry(&provider);
        reg.configure(&files_config(&files)).unwrap();

        let collection = reg.collect(&requests("alpha"));
        assert_eq!(collection.metrics.len(), 14);
        assert!(collection.metrics.iter().all(|m| m.namespace.field() != FDS));
        assert!(collection.failures.is_empty());
    }

    #[test]
    fn test_collect_bad_pid_file_does_not_abort() {
        let dir = TempDir::new().unwrap();
        let bad = dir.path().join("bad.pid");
        std::fs::write(&bad, "abc").unwrap();

        let provider = StubProvider::default();
        provider.spawn(2, "psTwo");
        let files = format!("{}:alpha,{}:beta", bad.display(), write_pid(&dir, "two.pid", 2));
        let mut reg = registry(&provider);
        reg.configure(&files_config(&files)).unwrap();

        let mut requested = requests("alpha");
        requested.extend(requests("beta"));
        let collection = reg.collect(&requested);

        assert_eq!(collection.metrics.len(), 15);
        assert!(collection.metrics.iter().all(|m| m.namespace.process() == "beta"));
        assert_eq!(collection.failures.len(), 1);
        assert!(collection.failures[0].error.contains("unable to read pid from file"));
        assert!(reg.specs()[0].is_failed());
    }

    #[test]
    fn test_collect_all_failed_is_empty() {
        let dir = TempDir::new().unwrap();
        let provider = StubProvider::default();
        let files = format!("{},/nonexistent/x.pid", write_pid(&dir, "one.pid", 1));
        let mut reg = registry(&provider);
        reg.configure(&files_config(&files)).unwrap();

        let collection = reg.collect(&requests("*"));
        assert!(collection.metrics.is_empty());
        assert_eq!(collection.failures.len(), 2);
        assert_eq!(collection.failures[0].pid, Some(1));
    }

    #[test]
    fn test_cached_handle_is_reused() {
        let dir = TempDir::new().unwrap();
        let provider = StubProvider::default();
        provider.spawn(1, "psOne");

        let files = write_pid(&dir, "one.pid", 1);
        let mut reg = registry(&provider);
        reg.configure(&files_config(&files)).unwrap();

        reg.collect(&requests("*"));
        reg.collect(&requests("*"));
        assert_eq!(provider.binds(), vec![1]);
        assert_eq!(reg.cached_pids(), vec![1]);
    }

    #[test]
    fn test_restart_recovery() {
        let dir = TempDir::new().unwrap();
        let provider = StubProvider::default();
        provider.spawn(1, "alpha");

        let path = write_pid(&dir, "app.pid", 1);
        let mut reg = registry(&provider);
        reg.configure(&files_config(&path)).unwrap();

        let first = reg.collect(&requests("*"));
        assert_eq!(first.metrics.len(), 15);
        assert!(first.metrics.iter().all(|m| m.namespace.process() == "alpha"));

        // process restarts under a new pid and name
        provider.kill(1);
        provider.spawn(2, "beta");
        write_pid(&dir, "app.pid", 2);

        let gone = reg.collect(&requests("*"));
        assert!(gone.metrics.is_empty());
        assert_eq!(gone.failures.len(), 1);
        assert!(reg.specs()[0].is_failed());
        assert!(reg.cached_pids().is_empty());

        let recovered = reg.collect(&requests("*"));
        assert_eq!(recovered.metrics.len(), 15);
        assert!(recovered.metrics.iter().all(|m| m.namespace.process() == "beta" && m.pid == 2));
        assert_eq!(reg.cached_pids(), vec![2]);
        assert_eq!(provider.binds(), vec![1, 2]);
    }

    #[test]
    fn test_pattern_spec_emits_per_pid() {
        let provider = StubProvider::default();
        provider.spawn(10, "worker");
        provider.spawn(11, "worker");
        provider.spawn(12, "worker");

        let mut reg = ProcessRegistry::new(Box::new(provider.clone()), Box::new(FixedSearch(vec![10, 11, 12])))
            .with_default_mode(SourceMode::Pattern);
        reg.configure(&files_config("worker --queue")).unwrap();

        let collection = reg.collect(&[Namespace::new("worker", "numThreads")]);
        let pids: Vec<i32> = collection.metrics.iter().map(|m| m.pid).collect();
        assert_eq!(pids, vec![10, 11, 12]);

        let info = reg.processes();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].mode, SourceMode::Pattern);
        let bound: Vec<(i32, Option<&str>)> = info[0].pids.iter().map(|b| (b.pid, b.name.as_deref())).collect();
        assert_eq!(
            bound,
            vec![(10, Some("worker")), (11, Some("worker")), (12, Some("worker"))]
        );
    }

    #[test]
    fn test_pattern_spec_bind_failure_skips_only_that_pid() {
        let provider = StubProvider::default();
        provider.spawn(10, "worker");
        provider.spawn(12, "worker");

        let mut reg = ProcessRegistry::new(Box::new(provider.clone()), Box::new(FixedSearch(vec![10, 11, 12])))
            .with_default_mode(SourceMode::Pattern);
        reg.configure(&files_config("worker")).unwrap();

        let collection = reg.collect(&[Namespace::new("*", "numThreads")]);
        let pids: Vec<i32> = collection.metrics.iter().map(|m| m.pid).collect();
        assert_eq!(pids, vec![10, 12]);
        assert_eq!(collection.failures.len(), 1);
        assert_eq!(collection.failures[0].pid, Some(11));
        assert_eq!(collection.failures[0].spec, "worker");
        assert!(reg.specs()[0].is_failed());
        assert_eq!(reg.cached_pids(), vec![10, 12]);

        // the listing keeps one entry per resolved pid, unbound ones without a name
        let info = reg.processes();
        let bound: Vec<(i32, Option<&str>)> = info[0].pids.iter().map(|b| (b.pid, b.name.as_deref())).collect();
        assert_eq!(bound, vec![(10, Some("worker")), (11, None), (12, Some("worker"))]);
        assert!(info[0].failed);
    }

    #[test]
    fn test_pattern_search_failure_is_recorded() {
        let provider = StubProvider::default();
        let mut reg = registry(&provider);
        let mut cfg = files_config("nginx: master");
        cfg.insert("mode".to_string(), ConfigValue::Str("pattern".to_string()));
        reg.configure(&cfg).unwrap();

        let collection = reg.collect(&requests("*"));
        assert!(collection.metrics.is_empty());
        assert_eq!(collection.failures.len(), 1);
        assert!(collection.failures[0].error.contains("pattern 'nginx'"));
    }
}
