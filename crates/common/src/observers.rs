//! Built-in observers
//!
//! - [`LogObserver`]: one log record per lifecycle event.
//! - [`FailureCaptureObserver`]: snapshots the failing context's session and
//!   persists it through an [`ArtifactStore`].
//! - [`RecordingObserver`]: keeps the raw event trail in memory.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::artifact::{Artifact, ArtifactStore};
use crate::dispatch::Observer;
use crate::events::{EventKind, LifecycleEvent};
use crate::log::{LogLevel, LogRecord, LogSink};
use crate::registry::ResourceRegistry;
use crate::types::ContextId;
use crate::{Error, Result};

/// Writes every event to a [`LogSink`].
pub struct LogObserver {
    sink: Arc<dyn LogSink>,
}

impl LogObserver {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    fn record(event: &LifecycleEvent) -> LogRecord {
        let unit = event.unit_name();
        let elapsed = event
            .result
            .as_ref()
            .map(|r| r.elapsed.as_millis())
            .unwrap_or_default();

        let (level, message) = match event.kind {
            EventKind::SuiteStart => (
                LogLevel::Info,
                format!("[suite-start] suite={}", event.suite.as_deref().unwrap_or("-")),
            ),
            EventKind::SuiteFinish => {
                let counts = event.counts.unwrap_or_default();
                (
                    LogLevel::Info,
                    format!(
                        "[suite-finish] suite={} total={} succeeded={} failed={} skipped={}",
                        event.suite.as_deref().unwrap_or("-"),
                        counts.total,
                        counts.succeeded,
                        counts.failed,
                        counts.skipped
                    ),
                )
            }
            EventKind::BeforeMethod => (LogLevel::Info, format!("[before] unit={}", unit)),
            EventKind::TestSuccess => (
                LogLevel::Info,
                format!("[passed] unit={} elapsed={}ms", unit, elapsed),
            ),
            EventKind::TestFailure => (
                LogLevel::Error,
                format!(
                    "[failed] unit={} elapsed={}ms err={}",
                    unit,
                    elapsed,
                    event.error().unwrap_or("unknown")
                ),
            ),
            EventKind::TestSkipped => (
                LogLevel::Warn,
                format!(
                    "[skipped] unit={} reason={}",
                    unit,
                    event.error().unwrap_or("-")
                ),
            ),
            EventKind::AfterMethod => (
                LogLevel::Info,
                format!(
                    "[after] unit={} outcome={}",
                    unit,
                    event
                        .result
                        .as_ref()
                        .map(|r| r.outcome.to_string())
                        .unwrap_or_else(|| "-".to_string())
                ),
            ),
        };

        LogRecord {
            level,
            at: event.at,
            context: event.context,
            message,
        }
    }
}

#[async_trait]
impl Observer for LogObserver {
    async fn on_event(&self, event: &LifecycleEvent) -> Result<()> {
        self.sink.emit(Self::record(event));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Captures a snapshot of the failing context's session.
///
/// Reacts to `TestFailure` only. A missing binding is logged and skipped;
/// snapshot and save errors are logged and returned so the dispatcher can
/// report them, without stopping the rest of the chain.
pub struct FailureCaptureObserver {
    registry: Arc<ResourceRegistry>,
    store: Arc<dyn ArtifactStore>,
    sink: Arc<dyn LogSink>,
    logical_name: String,
}

impl FailureCaptureObserver {
    pub fn new(
        registry: Arc<ResourceRegistry>,
        store: Arc<dyn ArtifactStore>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            registry,
            store,
            sink,
            logical_name: "failure".to_string(),
        }
    }

    pub fn with_logical_name(mut self, name: impl Into<String>) -> Self {
        self.logical_name = name.into();
        self
    }

    fn log(&self, level: LogLevel, context: ContextId, message: String) {
        self.sink.emit(LogRecord::new(level, Some(context), message));
    }

    async fn capture(&self, context: ContextId, unit: &str, owns_session: bool) -> Result<()> {
        if !owns_session {
            self.log(
                LogLevel::Warn,
                context,
                format!("[capture-skipped] unit={} reason=no session bound", unit),
            );
            return Ok(());
        }

        let session = match self.registry.lookup(context) {
            Ok(session) => session,
            Err(Error::NoResourceBound { .. }) => {
                self.log(
                    LogLevel::Warn,
                    context,
                    format!("[capture-skipped] unit={} reason=no session bound", unit),
                );
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let data = session.snapshot().await.map_err(|e| {
            self.log(
                LogLevel::Error,
                context,
                format!("[capture-failed] unit={} stage=snapshot err={}", unit, e),
            );
            e
        })?;

        let name = format!("{}-{}", self.logical_name, unit);
        let saved = self
            .store
            .save(Artifact::new(name, context, data))
            .await
            .map_err(|e| {
                self.log(
                    LogLevel::Error,
                    context,
                    format!("[capture-failed] unit={} stage=save err={}", unit, e),
                );
                e
            })?;

        self.log(
            LogLevel::Info,
            context,
            format!(
                "[captured] unit={} path={} bytes={}",
                unit,
                saved.path.display(),
                saved.size
            ),
        );
        Ok(())
    }
}

#[async_trait]
impl Observer for FailureCaptureObserver {
    async fn on_event(&self, event: &LifecycleEvent) -> Result<()> {
        if event.kind != EventKind::TestFailure {
            return Ok(());
        }
        match event.context {
            Some(context) => {
                let owns_session = event.result.as_ref().map_or(true, |r| r.session_bound);
                self.capture(context, event.unit_name(), owns_session).await
            }
            None => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "failure-capture"
    }
}

/// Keeps a copy of every event it receives.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().clone()
    }

    /// Event kinds seen for `context`, in emission order.
    pub fn kinds_for(&self, context: ContextId) -> Vec<EventKind> {
        let mut events: Vec<LifecycleEvent> = self
            .events
            .lock()
            .iter()
            .filter(|e| e.context == Some(context))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.seq);
        events.into_iter().map(|e| e.kind).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[async_trait]
impl Observer for RecordingObserver {
    async fn on_event(&self, event: &LifecycleEvent) -> Result<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
