//! Core types for Parasuite

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of one execution context.
///
/// Issued by [`ContextIdAllocator`], never derived from the scheduler's
/// thread or task ids, so a value is never reused while a context is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(u64);

impl ContextId {
    /// Build an id from a raw value. Intended for tests and synthetic ids.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{:04}", self.0)
    }
}

/// Monotonic issuer of [`ContextId`]s.
#[derive(Debug)]
pub struct ContextIdAllocator {
    next: AtomicU64,
}

impl ContextIdAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> ContextId {
        ContextId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ContextIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Execution context state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextState {
    Created,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl ContextState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ContextState::Succeeded | ContextState::Failed | ContextState::Skipped
        )
    }

    /// Outcome for a terminal state.
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            ContextState::Succeeded => Some(Outcome::Succeeded),
            ContextState::Failed => Some(Outcome::Failed),
            ContextState::Skipped => Some(Outcome::Skipped),
            ContextState::Created | ContextState::Running => None,
        }
    }
}

impl Default for ContextState {
    fn default() -> Self {
        Self::Created
    }
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextState::Created => write!(f, "created"),
            ContextState::Running => write!(f, "running"),
            ContextState::Succeeded => write!(f, "succeeded"),
            ContextState::Failed => write!(f, "failed"),
            ContextState::Skipped => write!(f, "skipped"),
        }
    }
}

/// Terminal outcome of a test unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    Failed,
    Skipped,
}

impl From<Outcome> for ContextState {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Succeeded => ContextState::Succeeded,
            Outcome::Failed => ContextState::Failed,
            Outcome::Skipped => ContextState::Skipped,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ContextState::from(*self).fmt(f)
    }
}

/// Browser engine driven by a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for BrowserKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(BrowserKind::Chromium),
            "firefox" => Ok(BrowserKind::Firefox),
            "webkit" | "safari" => Ok(BrowserKind::Webkit),
            other => Err(crate::Error::InvalidConfig(format!(
                "unknown browser kind: {}",
                other
            ))),
        }
    }
}

/// Initial browser window state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowState {
    Maximized,
    #[default]
    Default,
}

/// Options passed to a session factory when a context opens its session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub browser: BrowserKind,
    pub implicit_wait_ms: u64,
    pub window_state: WindowState,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            browser: BrowserKind::Chromium,
            implicit_wait_ms: 0,
            window_state: WindowState::Default,
        }
    }
}
