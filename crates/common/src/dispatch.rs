//! Lifecycle dispatcher
//!
//! Holds an ordered list of [`Observer`]s and invokes all of them for each
//! event, in registration order, on the caller's own task. Nothing is queued
//! or handed to another task: when `dispatch` returns, every observer has
//! seen the event.
//!
//! ```text
//!   dispatch(&event)
//!       ├─► observer[0].on_event()   (Err / panic recorded, continue)
//!       ├─► observer[1].on_event()
//!       └─► observer[N].on_event()
//!   └─► Ok(()) | Err(ObserverError { failures })
//! ```
//!
//! Registration needs `&mut self`; once the dispatcher is shared behind an
//! `Arc` the list cannot change, so it is never mutated during dispatch.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use thiserror::Error;
use tracing::warn;

use crate::events::{EventKind, LifecycleEvent};
use crate::Result;

/// Handler for lifecycle events.
///
/// Invoked concurrently from many contexts, so implementations must be
/// thread-safe internally.
#[async_trait]
pub trait Observer: Send + Sync + 'static {
    async fn on_event(&self, event: &LifecycleEvent) -> Result<()>;

    /// Human-readable name (for logs and failure reports).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// One observer's failure during a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverFailure {
    pub observer: &'static str,
    pub message: String,
}

/// All observer failures from one dispatch.
#[derive(Error, Debug, Clone)]
#[error("{} observer(s) failed on {event}: {}", .failures.len(), summarize(.failures))]
pub struct ObserverError {
    pub event: EventKind,
    pub failures: Vec<ObserverFailure>,
}

fn summarize(failures: &[ObserverFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.observer, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Ordered observer chain.
#[derive(Default)]
pub struct LifecycleDispatcher {
    observers: Vec<Arc<dyn Observer>>,
}

impl LifecycleDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observer; it will be invoked after every observer registered before it.
    pub fn register(&mut self, observer: Arc<dyn Observer>) {
        self.observers.push(observer);
    }

    /// Invoke every observer for `event`, in order, collecting failures.
    pub async fn dispatch(&self, event: &LifecycleEvent) -> std::result::Result<(), ObserverError> {
        let mut failures = Vec::new();

        for observer in &self.observers {
            let fut = observer.on_event(event);
            let failure = match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(panic) => Some(format!("panicked: {}", panic_message(&*panic))),
            };

            if let Some(message) = failure {
                warn!(
                    observer = observer.name(),
                    event = %event.kind,
                    "Observer failed: {}",
                    message
                );
                failures.push(ObserverFailure {
                    observer: observer.name(),
                    message,
                });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ObserverError {
                event: event.kind,
                failures,
            })
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn observer_names(&self) -> Vec<&'static str> {
        self.observers.iter().map(|o| o.name()).collect()
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
