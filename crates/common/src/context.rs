//! # ExecutionContext: one running test unit
//!
//! Drives a single [`TestUnit`] through its lifecycle and owns the unit's
//! registry entry for exactly that long.
//!
//! ## State machine
//! ```text
//! Created ──► Running ──► Succeeded | Failed | Skipped
//!   │            │                  │
//!   │ open+bind  │ body             │ teardown
//!   │ BeforeMethod                  ├─► AfterMethod
//!                                   ├─► session.close()
//!                                   └─► registry.unbind()
//! ```
//!
//! ## Rules
//! - Exactly one of `TestSuccess` / `TestFailure` / `TestSkipped` is
//!   dispatched, always after `BeforeMethod` and before `AfterMethod`.
//! - `unbind` happens only after `AfterMethod` has been dispatched, so the
//!   failure-capture observer (run during `TestFailure`) always finds the
//!   session still bound.
//! - The registry entry is removed even when the session fails to close.
//! - A context only closes and unbinds a session it bound itself. After a
//!   failed `bind` the id may belong to someone else; it is left alone.
//! - Observer failures are recorded but never change the state transition.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::artifact::SavedArtifact;
use crate::dispatch::{panic_message, LifecycleDispatcher, ObserverError};
use crate::events::{EventKind, EventResult, LifecycleEvent};
use crate::registry::ResourceRegistry;
use crate::session::SessionFactory;
use crate::types::{ContextId, ContextState, Outcome, SessionConfig};
use crate::unit::{TestUnitRef, UnitContext, UnitError};
use crate::{Error, Result};

/// Collaborators shared by every context of a suite.
pub struct ContextEnv {
    pub registry: Arc<ResourceRegistry>,
    pub dispatcher: Arc<LifecycleDispatcher>,
    pub factory: Arc<dyn SessionFactory>,
    pub session_config: SessionConfig,
    /// Optional per-unit body timeout (`None` = no timeout).
    pub unit_timeout: Option<Duration>,
}

/// Final record of one context's run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextReport {
    pub id: ContextId,
    pub unit: String,
    pub state: ContextState,
    pub elapsed_ms: u64,
    pub error: Option<String>,
    pub observer_errors: Vec<String>,
    pub teardown_error: Option<String>,
    pub artifacts: Vec<SavedArtifact>,
}

/// One test unit's run, bound to one session.
pub struct ExecutionContext {
    id: ContextId,
    unit: TestUnitRef,
    env: Arc<ContextEnv>,
    state: ContextState,
    observer_errors: Vec<ObserverError>,
    teardown_error: Option<Error>,
    bound: bool,
}

impl ExecutionContext {
    pub fn new(id: ContextId, unit: TestUnitRef, env: Arc<ContextEnv>) -> Self {
        Self {
            id,
            unit,
            env,
            state: ContextState::Created,
            observer_errors: Vec::new(),
            teardown_error: None,
            bound: false,
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Run the unit to a terminal state and tear down.
    pub async fn run(self) -> ContextReport {
        let span = info_span!("context", id = %self.id, unit = %self.unit.name());
        self.run_inner().instrument(span).await
    }

    async fn run_inner(mut self) -> ContextReport {
        let started = Instant::now();

        let (outcome, error) = match self.start().await {
            Ok(()) => self.execute_body().await,
            Err(e) => {
                warn!("Session acquisition failed: {}", e);
                (
                    Outcome::Failed,
                    Some(format!("session acquisition failed: {}", e)),
                )
            }
        };

        let result = EventResult {
            outcome,
            elapsed: started.elapsed(),
            error: error.as_deref().map(Arc::from),
            session_bound: self.bound,
        };

        self.finish(result.clone()).await;
        self.teardown(result).await;

        ContextReport {
            id: self.id,
            unit: self.unit.name().to_string(),
            state: self.state,
            elapsed_ms: started.elapsed().as_millis() as u64,
            error,
            observer_errors: self.observer_errors.iter().map(|e| e.to_string()).collect(),
            teardown_error: self.teardown_error.as_ref().map(|e| e.to_string()),
            artifacts: Vec::new(),
        }
    }

    fn transition(&mut self, to: ContextState) -> Result<()> {
        let allowed = match (self.state, to) {
            (ContextState::Created, ContextState::Running) => true,
            (ContextState::Running, next) => next.is_terminal(),
            _ => false,
        };
        if !allowed {
            return Err(Error::InvalidStateTransition {
                from: self.state,
                to,
            });
        }
        debug!("{} -> {}", self.state, to);
        self.state = to;
        Ok(())
    }

    async fn dispatch(&mut self, event: LifecycleEvent) {
        if let Err(e) = self.env.dispatcher.dispatch(&event).await {
            self.observer_errors.push(e);
        }
    }

    fn event(&self, kind: EventKind) -> LifecycleEvent {
        LifecycleEvent::for_context(kind, self.id, self.unit.name())
    }

    /// `Created → Running`: open a session, bind it, dispatch `BeforeMethod`.
    ///
    /// `BeforeMethod` is dispatched even when acquisition fails, so the
    /// per-context event order holds on every path.
    async fn start(&mut self) -> Result<()> {
        self.transition(ContextState::Running)?;

        let acquired = self.acquire().await;
        self.dispatch(self.event(EventKind::BeforeMethod)).await;
        acquired
    }

    async fn acquire(&mut self) -> Result<()> {
        let session = self.env.factory.open(&self.env.session_config).await?;
        debug!("Opened session {}", session.describe());

        if let Err(e) = self.env.registry.bind(self.id, session.clone()) {
            if let Err(close_err) = session.close().await {
                warn!("Closing unbound session failed: {}", close_err);
            }
            return Err(e);
        }
        self.bound = true;
        Ok(())
    }

    async fn execute_body(&self) -> (Outcome, Option<String>) {
        let ctx = UnitContext::new(self.id, self.env.registry.clone());
        let body = AssertUnwindSafe(self.unit.run(ctx)).catch_unwind();

        let res = match self.env.unit_timeout {
            Some(limit) => match tokio::time::timeout(limit, body).await {
                Ok(res) => res,
                Err(_elapsed) => Ok(Err(UnitError::Timeout(limit))),
            },
            None => body.await,
        };

        match res {
            Ok(Ok(())) => (Outcome::Succeeded, None),
            Ok(Err(UnitError::Skipped(reason))) => (Outcome::Skipped, Some(reason)),
            Ok(Err(e)) => (Outcome::Failed, Some(e.reason())),
            Err(panic) => (
                Outcome::Failed,
                Some(format!("panicked: {}", panic_message(&*panic))),
            ),
        }
    }

    /// `Running → terminal`: dispatch the outcome event.
    async fn finish(&mut self, result: EventResult) {
        let to = ContextState::from(result.outcome);
        if let Err(e) = self.transition(to) {
            warn!("{}", e);
            return;
        }

        match result.outcome {
            Outcome::Succeeded => info!("Passed in {:?}", result.elapsed),
            Outcome::Failed => warn!(
                "Failed in {:?}: {}",
                result.elapsed,
                result.error.as_deref().unwrap_or("unknown")
            ),
            Outcome::Skipped => info!(
                "Skipped: {}",
                result.error.as_deref().unwrap_or("no reason given")
            ),
        }

        let event = self
            .event(EventKind::for_outcome(result.outcome))
            .with_result(result);
        self.dispatch(event).await;
    }

    /// `AfterMethod`, then close the session, then unbind.
    async fn teardown(&mut self, result: EventResult) {
        self.dispatch(self.event(EventKind::AfterMethod).with_result(result))
            .await;

        if !self.bound {
            debug!("No session of our own to release");
            return;
        }

        if let Ok(session) = self.env.registry.lookup(self.id) {
            if let Err(e) = session.close().await {
                warn!("Session close failed: {}", e);
                self.teardown_error = Some(Error::ResourceTeardown {
                    context: self.id,
                    reason: e.to_string(),
                });
            }
        }

        self.env.registry.unbind(self.id);
        self.bound = false;
    }
}
