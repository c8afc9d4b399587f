//! Test units: the bodies executed by execution contexts
//!
//! [`TestUnit`] is the extension point; [`UnitFn`] wraps a closure and
//! produces a fresh future per run. A body receives a [`UnitContext`] that
//! resolves its own session explicitly through the registry.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use thiserror::Error;

use crate::registry::ResourceRegistry;
use crate::session::SessionRef;
use crate::types::ContextId;
use crate::Result;

/// How a test unit body ended, other than success.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitError {
    #[error("failed: {0}")]
    Failed(String),

    #[error("skipped: {0}")]
    Skipped(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl UnitError {
    pub fn failed(reason: impl Into<String>) -> Self {
        UnitError::Failed(reason.into())
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        UnitError::Skipped(reason.into())
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            UnitError::Failed(_) => "unit_failed",
            UnitError::Skipped(_) => "unit_skipped",
            UnitError::Timeout(_) => "unit_timeout",
        }
    }

    /// Message without the variant prefix.
    pub fn reason(&self) -> String {
        match self {
            UnitError::Failed(r) | UnitError::Skipped(r) => r.clone(),
            UnitError::Timeout(d) => format!("timed out after {:?}", d),
        }
    }
}

impl From<crate::Error> for UnitError {
    fn from(e: crate::Error) -> Self {
        UnitError::Failed(e.to_string())
    }
}

/// Handle given to a running body.
#[derive(Clone)]
pub struct UnitContext {
    id: ContextId,
    registry: Arc<ResourceRegistry>,
}

impl UnitContext {
    pub fn new(id: ContextId, registry: Arc<ResourceRegistry>) -> Self {
        Self { id, registry }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    /// This context's own session.
    pub fn session(&self) -> Result<SessionRef> {
        self.registry.lookup(self.id)
    }
}

/// One independently runnable test.
#[async_trait]
pub trait TestUnit: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn run(&self, ctx: UnitContext) -> std::result::Result<(), UnitError>;
}

pub type TestUnitRef = Arc<dyn TestUnit>;

/// Closure-backed test unit.
pub struct UnitFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> UnitFn<F> {
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, Fut> UnitFn<F>
where
    F: Fn(UnitContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<(), UnitError>> + Send + 'static,
{
    fn spawn(&self, ctx: UnitContext) -> BoxFuture<'static, std::result::Result<(), UnitError>> {
        Box::pin((self.f)(ctx))
    }
}

#[async_trait]
impl<F, Fut> TestUnit for UnitFn<F>
where
    F: Fn(UnitContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<(), UnitError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: UnitContext) -> std::result::Result<(), UnitError> {
        self.spawn(ctx).await
    }
}
