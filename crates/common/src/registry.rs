//! Per-context session registry
//!
//! Binds at most one [`SessionRef`] to each [`ContextId`]. The map is sharded
//! (`DashMap`), so operations on different ids do not contend on a single
//! lock, and `bind` is a single entry-API call so the existence check and
//! the insert are atomic.
//!
//! Operations on the *same* id are expected to come from that context's own
//! lifecycle, which is sequential.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::session::SessionRef;
use crate::types::ContextId;
use crate::{Error, Result};

/// Mapping from execution context id to its session.
#[derive(Default)]
pub struct ResourceRegistry {
    sessions: DashMap<ContextId, SessionRef>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `session` to `context`.
    ///
    /// Fails with [`Error::DuplicateBinding`] if the context already has a
    /// live session; the existing binding is left untouched.
    pub fn bind(&self, context: ContextId, session: SessionRef) -> Result<()> {
        match self.sessions.entry(context) {
            Entry::Occupied(_) => Err(Error::DuplicateBinding { context }),
            Entry::Vacant(slot) => {
                slot.insert(session);
                debug!(%context, "Session bound");
                Ok(())
            }
        }
    }

    /// Session bound to `context`.
    pub fn lookup(&self, context: ContextId) -> Result<SessionRef> {
        self.sessions
            .get(&context)
            .map(|entry| entry.value().clone())
            .ok_or(Error::NoResourceBound { context })
    }

    /// Remove the binding for `context`, returning the session if there was one.
    ///
    /// Removing an absent binding is a no-op.
    pub fn unbind(&self, context: ContextId) -> Option<SessionRef> {
        let removed = self.sessions.remove(&context).map(|(_, session)| session);
        if removed.is_some() {
            debug!(%context, "Session unbound");
        }
        removed
    }

    pub fn contains(&self, context: ContextId) -> bool {
        self.sessions.contains_key(&context)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Ids that currently hold a session, sorted.
    pub fn bound_ids(&self) -> Vec<ContextId> {
        let mut ids: Vec<ContextId> = self.sessions.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeSession;
    use std::sync::Arc;

    #[test]
    fn test_bind_lookup_unbind() {
        let registry = ResourceRegistry::new();
        let id = ContextId::new(1);
        let session: SessionRef = Arc::new(FakeSession::new("one"));

        registry.bind(id, session.clone()).unwrap();
        let found = registry.lookup(id).unwrap();
        assert!(Arc::ptr_eq(&found, &session));

        assert!(registry.unbind(id).is_some());
        assert!(matches!(
            registry.lookup(id),
            Err(Error::NoResourceBound { context }) if context == id
        ));
    }

    #[test]
    fn test_duplicate_binding_keeps_original() {
        let registry = ResourceRegistry::new();
        let id = ContextId::new(7);
        let first: SessionRef = Arc::new(FakeSession::new("first"));
        let second: SessionRef = Arc::new(FakeSession::new("second"));

        registry.bind(id, first.clone()).unwrap();
        let err = registry.bind(id, second).unwrap_err();
        assert!(matches!(err, Error::DuplicateBinding { context } if context == id));
        assert!(Arc::ptr_eq(&registry.lookup(id).unwrap(), &first));
    }

    #[test]
    fn test_unbind_absent_is_noop() {
        let registry = ResourceRegistry::new();
        assert!(registry.unbind(ContextId::new(42)).is_none());
        assert!(registry.unbind(ContextId::new(42)).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_bound_ids_sorted() {
        let registry = ResourceRegistry::new();
        for raw in [3, 1, 2] {
            registry
                .bind(ContextId::new(raw), Arc::new(FakeSession::new("s")))
                .unwrap();
        }
        assert_eq!(
            registry.bound_ids(),
            vec![ContextId::new(1), ContextId::new(2), ContextId::new(3)]
        );
        assert_eq!(registry.len(), 3);
    }
}
