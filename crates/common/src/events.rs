//! Lifecycle events dispatched to observers
//!
//! One tagged event type covers every transition; observers switch on
//! [`EventKind`]. Per-context order is always
//! `BeforeMethod → (TestSuccess | TestFailure | TestSkipped) → AfterMethod`,
//! bracketed by `SuiteStart` / `SuiteFinish`.
//!
//! Every event carries a process-global sequence number (`seq`) so a merged
//! trail from many contexts can be put back in emission order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ContextId, Outcome};

static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Lifecycle transition classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SuiteStart,
    SuiteFinish,
    BeforeMethod,
    AfterMethod,
    TestSuccess,
    TestFailure,
    TestSkipped,
}

impl EventKind {
    pub fn is_suite_level(&self) -> bool {
        matches!(self, EventKind::SuiteStart | EventKind::SuiteFinish)
    }

    /// The outcome event matching a terminal outcome.
    pub fn for_outcome(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Succeeded => EventKind::TestSuccess,
            Outcome::Failed => EventKind::TestFailure,
            Outcome::Skipped => EventKind::TestSkipped,
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::SuiteStart => "suite_start",
            EventKind::SuiteFinish => "suite_finish",
            EventKind::BeforeMethod => "before_method",
            EventKind::AfterMethod => "after_method",
            EventKind::TestSuccess => "test_success",
            EventKind::TestFailure => "test_failure",
            EventKind::TestSkipped => "test_skipped",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Result payload attached to outcome and teardown events
#[derive(Debug, Clone, PartialEq)]
pub struct EventResult {
    pub outcome: Outcome,
    pub elapsed: Duration,
    pub error: Option<Arc<str>>,
    /// Whether the context holds its own registry binding. False when
    /// acquisition failed, so nothing under this id belongs to the context.
    pub session_bound: bool,
}

/// Per-state totals for a suite
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteCounts {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl SuiteCounts {
    pub fn record(&mut self, outcome: Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Succeeded => self.succeeded += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }
}

/// A lifecycle notification
#[derive(Debug, Clone)]
pub struct LifecycleEvent {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: DateTime<Utc>,
    pub kind: EventKind,
    /// Suite name.
    pub suite: Option<Arc<str>>,
    /// Context id; `None` for suite-level events.
    pub context: Option<ContextId>,
    /// Test unit name; `None` for suite-level events.
    pub unit: Option<Arc<str>>,
    pub result: Option<EventResult>,
    /// Totals, set on `SuiteFinish` only.
    pub counts: Option<SuiteCounts>,
}

impl LifecycleEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, Ordering::Relaxed),
            at: Utc::now(),
            kind,
            suite: None,
            context: None,
            unit: None,
            result: None,
            counts: None,
        }
    }

    pub fn suite_start(suite: impl Into<Arc<str>>) -> Self {
        Self::new(EventKind::SuiteStart).with_suite(suite)
    }

    pub fn suite_finish(suite: impl Into<Arc<str>>, counts: SuiteCounts) -> Self {
        Self::new(EventKind::SuiteFinish)
            .with_suite(suite)
            .with_counts(counts)
    }

    pub fn for_context(kind: EventKind, context: ContextId, unit: impl Into<Arc<str>>) -> Self {
        Self::new(kind).with_context(context).with_unit(unit)
    }

    #[inline]
    pub fn with_suite(mut self, suite: impl Into<Arc<str>>) -> Self {
        self.suite = Some(suite.into());
        self
    }

    #[inline]
    pub fn with_context(mut self, context: ContextId) -> Self {
        self.context = Some(context);
        self
    }

    #[inline]
    pub fn with_unit(mut self, unit: impl Into<Arc<str>>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    #[inline]
    pub fn with_result(mut self, result: EventResult) -> Self {
        self.result = Some(result);
        self
    }

    #[inline]
    pub fn with_counts(mut self, counts: SuiteCounts) -> Self {
        self.counts = Some(counts);
        self
    }

    /// Captured error message, if the result carries one.
    pub fn error(&self) -> Option<&str> {
        self.result.as_ref().and_then(|r| r.error.as_deref())
    }

    pub fn unit_name(&self) -> &str {
        self.unit.as_deref().unwrap_or("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_seq() {
        let first = LifecycleEvent::suite_start("smoke");
        let ev = LifecycleEvent::for_context(EventKind::TestFailure, ContextId::new(3), "login")
            .with_result(EventResult {
                outcome: Outcome::Failed,
                elapsed: Duration::from_millis(12),
                error: Some("boom".into()),
                session_bound: true,
            });

        assert!(ev.seq > first.seq);
        assert_eq!(ev.context, Some(ContextId::new(3)));
        assert_eq!(ev.unit_name(), "login");
        assert_eq!(ev.error(), Some("boom"));
        assert!(first.kind.is_suite_level());
        assert!(first.context.is_none());
    }

    #[test]
    fn test_counts_record() {
        let mut counts = SuiteCounts::default();
        counts.record(Outcome::Succeeded);
        counts.record(Outcome::Failed);
        counts.record(Outcome::Failed);
        assert_eq!(counts.total, 3);
        assert_eq!(counts.failed, 2);
        assert_eq!(EventKind::for_outcome(Outcome::Skipped), EventKind::TestSkipped);
    }
}
