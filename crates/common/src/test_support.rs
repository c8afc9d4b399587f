//! In-memory sessions for unit tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::session::{Session, SessionFactory, SessionRef};
use crate::types::SessionConfig;
use crate::{Error, Result};

pub const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

/// Session that records navigation and counts closes.
pub struct FakeSession {
    label: String,
    visited: Mutex<Vec<String>>,
    fail_snapshot: bool,
    fail_close: bool,
    closed: AtomicBool,
    close_counter: Arc<AtomicUsize>,
}

impl FakeSession {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            visited: Mutex::new(Vec::new()),
            fail_snapshot: false,
            fail_close: false,
            closed: AtomicBool::new(false),
            close_counter: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing_snapshot(mut self) -> Self {
        self.fail_snapshot = true;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    fn counting_closes(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.close_counter = counter;
        self
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Session(format!("{} is closed", self.label)));
        }
        self.visited.lock().push(url.to_string());
        Ok(())
    }

    async fn snapshot(&self) -> Result<Vec<u8>> {
        if self.fail_snapshot {
            return Err(Error::Session(format!("{} cannot take screenshots", self.label)));
        }
        Ok(FAKE_PNG.to_vec())
    }

    async fn evaluate(&self, _script: &str) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(Error::Session(format!("{} already closed", self.label)));
        }
        self.close_counter.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(Error::Session(format!("{} driver crashed", self.label)));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("fake:{}", self.label)
    }
}

/// Factory for [`FakeSession`]s.
#[derive(Default)]
pub struct FakeFactory {
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
    fail_open: bool,
    fail_close: bool,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn with_failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for FakeFactory {
    async fn open(&self, config: &SessionConfig) -> Result<SessionRef> {
        if self.fail_open {
            return Err(Error::Session("browser binary not found".to_string()));
        }
        let n = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        let mut session = FakeSession::new(format!("{}-{}", config.browser.as_str(), n))
            .counting_closes(self.closed.clone());
        if self.fail_close {
            session = session.failing_close();
        }
        Ok(Arc::new(session))
    }
}
