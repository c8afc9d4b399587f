//! Suite runner: fans test units out over concurrent execution contexts
//!
//! ```text
//! SuiteStart
//!   ├─ unit 1 ─► permit ─► ExecutionContext ─┐
//!   ├─ unit 2 ─► permit ─► ExecutionContext ─┤  at most `degree`
//!   └─ unit n ─► permit ─► ExecutionContext ─┘  running at once
//! SuiteFinish (aggregate counts)
//! ```
//!
//! Contexts are spawned on the runtime, so on a multi-thread runtime they run
//! in parallel. Each one finishes its own teardown before its permit is
//! released.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::artifact::{ArtifactStore, SavedArtifact};
use crate::config::HarnessConfig;
use crate::context::{ContextEnv, ContextReport, ExecutionContext};
use crate::dispatch::{LifecycleDispatcher, Observer};
use crate::events::{LifecycleEvent, SuiteCounts};
use crate::log::{LogSink, TracingSink};
use crate::observers::{FailureCaptureObserver, LogObserver};
use crate::registry::ResourceRegistry;
use crate::session::SessionFactory;
use crate::types::{ContextId, ContextIdAllocator, Outcome};
use crate::unit::TestUnitRef;
use crate::{Error, Result};

/// Result of running a whole suite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub run_id: Uuid,
    pub suite: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub counts: SuiteCounts,
    pub peak_running: usize,
    pub contexts: Vec<ContextReport>,
    pub artifacts: Vec<SavedArtifact>,
    pub errors: Vec<String>,
}

impl SuiteReport {
    /// No context failed and the harness itself reported no errors.
    pub fn is_success(&self) -> bool {
        self.counts.failed == 0 && self.errors.is_empty()
    }

    /// Write the report to `{dir}/suite-report.json`
    pub fn write_json(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;

        let path = dir.join("suite-report.json");
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

#[derive(Default)]
struct RunningGauge {
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl RunningGauge {
    fn enter(self: &Arc<Self>) -> RunningGuard {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        RunningGuard(self.clone())
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct RunningGuard(Arc<RunningGauge>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.running.fetch_sub(1, Ordering::SeqCst);
    }
}

enum PendingObserver {
    Log,
    Capture(Arc<dyn ArtifactStore>),
    Custom(Arc<dyn Observer>),
}

/// Builder for [`SuiteRunner`]
pub struct SuiteRunnerBuilder {
    config: HarnessConfig,
    factory: Option<Arc<dyn SessionFactory>>,
    sink: Arc<dyn LogSink>,
    observers: Vec<PendingObserver>,
}

impl SuiteRunnerBuilder {
    pub fn with_session_factory(mut self, factory: Arc<dyn SessionFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Sink used by the built-in observers. Defaults to [`TracingSink`].
    pub fn with_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_log_observer(mut self) -> Self {
        self.observers.push(PendingObserver::Log);
        self
    }

    /// Snapshot failing contexts into `store`.
    pub fn with_failure_capture(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.observers.push(PendingObserver::Capture(store));
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(PendingObserver::Custom(observer));
        self
    }

    pub fn build(self) -> Result<SuiteRunner> {
        self.config.validate()?;
        let factory = self
            .factory
            .ok_or_else(|| Error::InvalidConfig("no session factory configured".to_string()))?;

        let registry = Arc::new(ResourceRegistry::new());
        let mut dispatcher = LifecycleDispatcher::new();
        let mut stores = Vec::new();

        for pending in self.observers {
            match pending {
                PendingObserver::Log => {
                    dispatcher.register(Arc::new(LogObserver::new(self.sink.clone())));
                }
                PendingObserver::Capture(store) => {
                    dispatcher.register(Arc::new(FailureCaptureObserver::new(
                        registry.clone(),
                        store.clone(),
                        self.sink.clone(),
                    )));
                    stores.push(store);
                }
                PendingObserver::Custom(observer) => dispatcher.register(observer),
            }
        }

        Ok(SuiteRunner {
            config: self.config,
            registry,
            dispatcher: Arc::new(dispatcher),
            factory,
            stores,
            ids: Arc::new(ContextIdAllocator::new()),
        })
    }
}

/// Runs test units concurrently, each in its own execution context.
pub struct SuiteRunner {
    config: HarnessConfig,
    registry: Arc<ResourceRegistry>,
    dispatcher: Arc<LifecycleDispatcher>,
    factory: Arc<dyn SessionFactory>,
    stores: Vec<Arc<dyn ArtifactStore>>,
    ids: Arc<ContextIdAllocator>,
}

impl SuiteRunner {
    pub fn builder(config: HarnessConfig) -> SuiteRunnerBuilder {
        SuiteRunnerBuilder {
            config,
            factory: None,
            sink: Arc::new(TracingSink),
            observers: Vec::new(),
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.registry
    }

    /// Run with the configured concurrency degree.
    pub async fn run_configured(&self, units: Vec<TestUnitRef>) -> Result<SuiteReport> {
        self.run(units, self.config.concurrency).await
    }

    /// Run every unit, at most `degree` at a time.
    pub async fn run(&self, units: Vec<TestUnitRef>, degree: usize) -> Result<SuiteReport> {
        if degree == 0 {
            return Err(Error::InvalidConcurrency(degree));
        }

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();
        let suite = self.config.suite_name.clone();
        let total = units.len();
        let mut errors = Vec::new();

        info!(%run_id, suite = %suite, units = total, degree, "Starting suite");

        if let Err(e) = self
            .dispatcher
            .dispatch(&LifecycleEvent::suite_start(suite.as_str()))
            .await
        {
            errors.push(e.to_string());
        }

        let env = Arc::new(ContextEnv {
            registry: self.registry.clone(),
            dispatcher: self.dispatcher.clone(),
            factory: self.factory.clone(),
            session_config: self.config.session.clone(),
            unit_timeout: self.config.unit_timeout(),
        });
        let semaphore = Arc::new(Semaphore::new(degree));
        let gauge = Arc::new(RunningGauge::default());
        let mut set = JoinSet::new();
        let mut allocated = Vec::with_capacity(total);

        for (index, unit) in units.into_iter().enumerate() {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    errors.push(format!("concurrency limiter closed: {}", e));
                    break;
                }
            };

            let id = self.ids.next_id();
            allocated.push(id);
            let env = env.clone();
            let gauge = gauge.clone();
            let stores = self.stores.clone();

            set.spawn(async move {
                let _permit = permit;
                let _running = gauge.enter();

                let mut report = ExecutionContext::new(id, unit, env).run().await;
                for store in &stores {
                    report.artifacts.extend(store.take_saved(id));
                }
                (index, report)
            });
        }

        let mut finished = Vec::with_capacity(total);
        let mut counts = SuiteCounts::default();

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, report)) => {
                    counts.record(report.state.outcome().unwrap_or(Outcome::Failed));
                    finished.push((index, report));
                }
                Err(e) => {
                    error!("Context task failed: {}", e);
                    counts.record(Outcome::Failed);
                    errors.push(format!("context task failed: {}", e));
                }
            }
        }
        finished.sort_by_key(|(index, _)| *index);
        let contexts: Vec<ContextReport> = finished.into_iter().map(|(_, r)| r).collect();

        self.reclaim_leaks(&allocated, &mut errors).await;

        if let Err(e) = self
            .dispatcher
            .dispatch(&LifecycleEvent::suite_finish(suite.as_str(), counts))
            .await
        {
            errors.push(e.to_string());
        }

        let artifacts = contexts
            .iter()
            .flat_map(|c| c.artifacts.iter().cloned())
            .collect();
        let duration_ms = clock.elapsed().as_millis() as u64;

        info!(
            "Suite {}: {} passed, {} failed, {} skipped ({} ms, peak {} running)",
            suite,
            counts.succeeded,
            counts.failed,
            counts.skipped,
            duration_ms,
            gauge.peak()
        );

        Ok(SuiteReport {
            run_id,
            suite,
            started_at,
            duration_ms,
            counts,
            peak_running: gauge.peak(),
            contexts,
            artifacts,
            errors,
        })
    }

    /// Close and unbind sessions this run's contexts left registered.
    ///
    /// The registry is shared by overlapping runs, so only ids allocated by
    /// this run are swept.
    async fn reclaim_leaks(&self, allocated: &[ContextId], errors: &mut Vec<String>) {
        for &id in allocated.iter().filter(|id| self.registry.contains(**id)) {
            warn!(context = %id, "Session still bound after suite");
            errors.push(format!("session leaked by context {}", id));
            if let Some(session) = self.registry.unbind(id) {
                if let Err(e) = session.close().await {
                    warn!(context = %id, "Closing leaked session failed: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observers::RecordingObserver;
    use crate::test_support::FakeFactory;
    use crate::types::ContextState;
    use crate::unit::{UnitContext, UnitError, UnitFn};
    use crate::events::EventKind;
    use tempfile::TempDir;

    fn runner(factory: Arc<FakeFactory>, recorder: Arc<RecordingObserver>) -> SuiteRunner {
        let mut config = HarnessConfig::default();
        config.suite_name = "unit".to_string();
        SuiteRunner::builder(config)
            .with_session_factory(factory)
            .with_observer(recorder)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_zero_degree_rejected() {
        let runner = runner(Arc::new(FakeFactory::new()), Arc::new(RecordingObserver::new()));
        assert!(matches!(
            runner.run(Vec::new(), 0).await,
            Err(Error::InvalidConcurrency(0))
        ));
    }

    #[tokio::test]
    async fn test_build_requires_factory() {
        let result = SuiteRunner::builder(HarnessConfig::default()).build();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_empty_suite_still_fires_suite_events() {
        let recorder = Arc::new(RecordingObserver::new());
        let runner = runner(Arc::new(FakeFactory::new()), recorder.clone());

        let report = runner.run(Vec::new(), 3).await.unwrap();

        assert_eq!(report.counts, SuiteCounts::default());
        assert!(report.contexts.is_empty());
        assert!(report.is_success());
        let kinds: Vec<EventKind> = recorder.events().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::SuiteStart, EventKind::SuiteFinish]);
    }

    #[tokio::test]
    async fn test_reports_keep_input_order() {
        let recorder = Arc::new(RecordingObserver::new());
        let factory = Arc::new(FakeFactory::new());
        let runner = runner(factory.clone(), recorder);

        let units: Vec<TestUnitRef> = vec![
            UnitFn::arc("a", |_ctx: UnitContext| async move { Ok(()) }),
            UnitFn::arc("b", |_ctx: UnitContext| async move {
                Err(UnitError::failed("nope"))
            }),
            UnitFn::arc("c", |_ctx: UnitContext| async move {
                Err(UnitError::skipped("later"))
            }),
        ];
        let report = runner.run_configured(units).await.unwrap();

        let names: Vec<&str> = report.contexts.iter().map(|c| c.unit.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(report.contexts[1].state, ContextState::Failed);
        assert_eq!(report.counts.total, 3);
        assert_eq!(report.counts.skipped, 1);
        assert!(!report.is_success());
        assert_eq!(factory.opened(), 3);
        assert_eq!(factory.closed(), 3);
        assert!(runner.registry().is_empty());
    }

    #[tokio::test]
    async fn test_bindings_outside_the_run_are_not_reclaimed() {
        use crate::test_support::FakeSession;

        let runner = runner(Arc::new(FakeFactory::new()), Arc::new(RecordingObserver::new()));
        let outsider = Arc::new(FakeSession::new("outsider"));
        let foreign = ContextId::new(9_000);
        runner.registry().bind(foreign, outsider.clone()).unwrap();

        let units: Vec<TestUnitRef> =
            vec![UnitFn::arc("a", |_ctx: UnitContext| async move { Ok(()) })];
        let report = runner.run(units, 1).await.unwrap();

        assert!(report.errors.is_empty(), "{:?}", report.errors);
        assert!(!outsider.is_closed());
        assert!(runner.registry().contains(foreign));
    }

    #[tokio::test]
    async fn test_write_json() {
        let tmp = TempDir::new().unwrap();
        let runner = runner(Arc::new(FakeFactory::new()), Arc::new(RecordingObserver::new()));
        let units: Vec<TestUnitRef> =
            vec![UnitFn::arc("a", |_ctx: UnitContext| async move { Ok(()) })];

        let report = runner.run(units, 1).await.unwrap();
        let path = report.write_json(tmp.path()).unwrap();

        let parsed: SuiteReport =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed.run_id, report.run_id);
        assert_eq!(parsed.counts.succeeded, 1);
    }
}
