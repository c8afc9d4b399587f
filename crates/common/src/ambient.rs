//! Task-scoped access to the current execution context
//!
//! Convenience layer for test bodies that prefer not to thread a
//! [`UnitContext`] through every helper. The value lives in a
//! `tokio::task_local!`, so it is visible only to the future passed to
//! [`scope`] and never leaks into sibling contexts, even on the same worker
//! thread. Engine modules always pass ids explicitly and do not use this.

use std::future::Future;

use crate::session::SessionRef;
use crate::types::ContextId;
use crate::unit::UnitContext;
use crate::{Error, Result};

tokio::task_local! {
    static CURRENT: UnitContext;
}

/// Run `fut` with `ctx` as the ambient context.
pub async fn scope<F>(ctx: UnitContext, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT.scope(ctx, fut).await
}

/// The ambient context, if inside [`scope`].
pub fn current() -> Result<UnitContext> {
    CURRENT.try_with(Clone::clone).map_err(|_| Error::NoAmbientContext)
}

pub fn current_id() -> Result<ContextId> {
    CURRENT.try_with(|ctx| ctx.id()).map_err(|_| Error::NoAmbientContext)
}

/// Session bound to the ambient context.
pub fn current_session() -> Result<SessionRef> {
    current()?.session()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ResourceRegistry;
    use crate::test_support::FakeSession;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_outside_scope_is_error() {
        assert!(matches!(current_id(), Err(Error::NoAmbientContext)));
        assert!(matches!(current_session(), Err(Error::NoAmbientContext)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_scopes_do_not_leak_between_tasks() {
        let registry = Arc::new(ResourceRegistry::new());
        let mut handles = Vec::new();

        for raw in 1..=8u64 {
            let id = ContextId::new(raw);
            registry
                .bind(id, Arc::new(FakeSession::new(format!("s{}", raw))))
                .unwrap();
            let ctx = UnitContext::new(id, registry.clone());

            handles.push(tokio::spawn(scope(ctx, async move {
                tokio::time::sleep(Duration::from_millis(8 - raw)).await;
                let seen = current_id().unwrap();
                let session = current_session().unwrap();
                (id, seen, session.describe())
            })));
        }

        for handle in handles {
            let (id, seen, described) = handle.await.unwrap();
            assert_eq!(id, seen);
            assert_eq!(described, format!("fake:s{}", id.get()));
        }
    }
}
