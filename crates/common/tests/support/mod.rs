//! Shared fixtures for the engine integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use parasuite_common::{Error, Result, Session, SessionConfig, SessionFactory, SessionRef};

pub const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nintegration";

/// Shared journal of `label:operation` entries across every session.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub struct JournalSession {
    label: String,
    journal: Journal,
}

impl JournalSession {
    fn note(&self, op: &str) {
        self.journal.lock().push(format!("{}:{}", self.label, op));
    }
}

#[async_trait]
impl Session for JournalSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.note(&format!("navigate {}", url));
        Ok(())
    }

    async fn snapshot(&self) -> Result<Vec<u8>> {
        self.note("snapshot");
        Ok(FAKE_PNG.to_vec())
    }

    async fn evaluate(&self, _script: &str) -> Result<()> {
        self.note("evaluate");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.note("close");
        Ok(())
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// Factory whose sessions all write to one journal.
#[derive(Default)]
pub struct JournalFactory {
    opened: AtomicUsize,
    journal: Journal,
}

impl JournalFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().clone()
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Position of `entry` in the journal.
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.journal.lock().iter().position(|e| e == entry)
    }
}

#[async_trait]
impl SessionFactory for JournalFactory {
    async fn open(&self, _config: &SessionConfig) -> Result<SessionRef> {
        let n = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Arc::new(JournalSession {
            label: format!("session-{}", n),
            journal: self.journal.clone(),
        }))
    }
}

/// Observer that always fails.
pub struct BrokenObserver;

#[async_trait]
impl parasuite_common::Observer for BrokenObserver {
    async fn on_event(&self, _event: &parasuite_common::LifecycleEvent) -> Result<()> {
        Err(Error::Session("observer backend unavailable".to_string()))
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

/// Observer that panics on every event.
pub struct PanickingObserver;

#[async_trait]
impl parasuite_common::Observer for PanickingObserver {
    async fn on_event(&self, _event: &parasuite_common::LifecycleEvent) -> Result<()> {
        panic!("observer blew up");
    }

    fn name(&self) -> &'static str {
        "panicking"
    }
}
